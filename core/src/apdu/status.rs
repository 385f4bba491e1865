//! Interpretation of the status words (SW1, SW2) trailing every response.

use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};

/// Semantic outcome of an exchange, classified from the status words.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandOutcome {
    Success,

    /// `63 Cn`: the PIN did not match, `n` tries remain.
    /// Zero remaining tries means the PIN is blocked from now on.
    VerificationFailed {
        remaining_tries: u8,
    },

    Blocked,
    NotFound,

    /// Any status word without a dedicated meaning, surfaced verbatim.
    Other {
        sw1: u8,
        sw2: u8,
    },
}

const COUNTER_SW1: u8 = 0x63;
const COUNTER_MASK: u8 = 0xF0;
const COUNTER_TAG: u8 = 0xC0;

const TABLE: &[(u8, u8, CommandOutcome)] = &[
    (0x90, 0x00, CommandOutcome::Success),
    (0x69, 0x83, CommandOutcome::Blocked),
    (0x69, 0x84, CommandOutcome::Blocked),
    (0x6A, 0x82, CommandOutcome::NotFound),
    (0x6A, 0x83, CommandOutcome::NotFound),
];

impl CommandOutcome {
    /// Classifies the status words. Total over every pair.
    pub fn classify(sw1: u8, sw2: u8) -> Self {
        if sw1 == COUNTER_SW1 && sw2 & COUNTER_MASK == COUNTER_TAG {
            return Self::VerificationFailed {
                remaining_tries: sw2 & !COUNTER_MASK,
            };
        }

        TABLE
            .iter()
            .find(|(a, b, _)| (*a, *b) == (sw1, sw2))
            .map(|(_, _, outcome)| *outcome)
            .unwrap_or(Self::Other { sw1, sw2 })
    }

    /// Converts a non-success outcome into the corresponding error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::VerificationFailed { remaining_tries } => {
                Err(Error::VerificationFailed { remaining_tries })
            }
            Self::Blocked => Err(Error::Blocked),
            Self::NotFound => Err(Error::NotFound),
            Self::Other { sw1, sw2 } => Err(Error::Other { sw1, sw2 }),
        }
    }
}

impl Display for CommandOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::VerificationFailed { remaining_tries } => {
                write!(f, "Verification failed, {} tries remaining", remaining_tries)
            }
            Self::Blocked => write!(f, "Blocked"),
            Self::NotFound => write!(f, "Not found"),
            Self::Other { sw1, sw2 } => {
                write!(f, "{:02X}{:02X}: {}", sw1, sw2, describe(*sw1, *sw2))
            }
        }
    }
}

/// Describes the status words as defined in ISO/IEC 7816-4 section 5.6.
#[allow(clippy::match_overlapping_arm)]
pub fn describe(sw1: u8, sw2: u8) -> &'static str {
    match u16::from_be_bytes([sw1, sw2]) {
        0x9000 => "Success",
        0x6100..=0x61FF => "Success, data remaining",

        0x6281 => "Part of returned data may be corrupted",
        0x6282 => "End of file reached before reading Le bytes",
        0x6283 => "Selected file invalidated",
        0x6200..=0x62FF => "Warning, state of non-volatile memory unchanged",
        0x63C0..=0x63CF => "Verification failed, counter provided",
        0x6300..=0x63FF => "Warning, state of non-volatile memory changed",

        0x6400..=0x64FF => "Execution error, state of non-volatile memory unchanged",
        0x6581 => "Memory failure",
        0x6500..=0x65FF => "Execution error, state of non-volatile memory changed",

        0x6700 => "Wrong length",
        0x6881 => "Logical channel not supported",
        0x6882 => "Secure messaging not supported",
        0x6981 => "Command incompatible with file structure",
        0x6982 => "Security status not satisfied",
        0x6983 => "Authentication method blocked",
        0x6984 => "Reference data not usable",
        0x6985 => "Conditions of use not satisfied",
        0x6986 => "Command not allowed, no current EF",
        0x6A80 => "Incorrect parameters in the data field",
        0x6A81 => "Function not supported",
        0x6A82 => "File or application not found",
        0x6A83 => "Record not found",
        0x6A84 => "Not enough memory space in the file",
        0x6A86 => "Incorrect parameters P1-P2",
        0x6A88 => "Referenced data not found",
        0x6B00 => "Wrong parameters P1-P2",
        0x6C00..=0x6CFF => "Wrong Le field",
        0x6D00 => "Instruction code not supported or invalid",
        0x6E00 => "Class not supported",
        0x6F00 => "No precise diagnosis",

        0x6700..=0x6FFF => "Checking error",
        _ => "Unknown status",
    }
}
