use std::time::Duration;

/// Immutable configuration shared by every session of a [`crate::Reader`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Delay the host should wait before polling again, after a tag was not engaged.
    pub retry_interval: Duration,

    /// Maximum octets to request in a single `READ BINARY` command.
    pub max_read_chunk: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
            max_read_chunk: 0xFF,
        }
    }
}
