use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::nfc::ChannelError;

/// Errors that can occur while talking to the card.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("PIN must be empty or exactly 4 characters of 0-9 and *")]
    InvalidPinFormat,

    #[error("Error occurred while communicating with the tag: {0}")]
    Channel(#[from] ChannelError),

    #[error("The card returned a malformed response of {0} octet(s)")]
    MalformedResponse(usize),

    #[error("PIN verification failed, {remaining_tries} tries remaining")]
    VerificationFailed { remaining_tries: u8 },

    #[error("The PIN or the referenced key is blocked")]
    Blocked,

    #[error("The file or record was not found on the card")]
    NotFound,

    #[error("The card returned an error ({sw1:#04X}, {sw2:#04X})")]
    Other { sw1: u8, sw2: u8 },

    #[error("Application {0} is not supported")]
    UnsupportedAid(String),

    #[error("The card returned data that could not be decoded: {0}")]
    InvalidData(String),

    #[error("No application or file is selected for the command")]
    NotSelected,

    #[error("The session has already been closed")]
    SessionClosed,

    #[error("The session was canceled")]
    Canceled,

    #[error("{0}")]
    Retry(RetryRequest),
}

impl Error {
    /// Determines whether the error only asks the caller to try again with another tag.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Determines whether the error ended a session.
    /// Retries and local validation failures never start one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Retry(_) | Self::InvalidPinFormat)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a detected tag was not engaged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RetryReason {
    NoTag,
    MultipleTags(usize),

    /// The tag is not an ISO 7816 tag, or its initial AID is not on the whitelist.
    UnsupportedTag(Option<String>),
}

/// A request to the host NFC stack to restart polling after a short delay.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryRequest {
    pub reason: RetryReason,
    pub after: Duration,
}

impl Display for RetryRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RetryReason::NoTag => write!(f, "No tag was detected")?,
            RetryReason::MultipleTags(n) => write!(f, "{} tags were detected at once", n)?,
            RetryReason::UnsupportedTag(Some(aid)) => {
                write!(f, "The tag has an unsupported application {}", aid)?
            }
            RetryReason::UnsupportedTag(None) => write!(f, "The tag is not an ISO 7816 tag")?,
        }

        write!(f, ", retry after {} ms", self.after.as_millis())
    }
}
