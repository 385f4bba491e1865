//! Logging facade.
//! Re-exports `tracing` macros when the `tracing` feature is on, no-ops otherwise.
//!
//! `warning` stands for `tracing::warn`, as a local `warn` would clash with the built-in attribute.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, info, warn as warning};

// Arguments are type-checked but never evaluated, so they still count as used.
#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($t: tt)*) => {
        if false {
            let _ = format_args!($($t)*);
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($t: tt)*) => {
        if false {
            let _ = format_args!($($t)*);
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warning {
    ($($t: tt)*) => {
        if false {
            let _ = format_args!($($t)*);
        }
    };
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {debug, info, warning};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros() {
        let octets: [u8; 2] = [0x90, 0x00];

        debug!("TX: {}", hex::encode(octets));
        info!("{} tries remaining", 3);
        warning!("Session failed: {:?}", octets);

        match octets[0] {
            0x90 => debug!("success"),
            _ => warning!("failure"),
        }
    }
}
