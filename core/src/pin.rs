//! PIN encoding for VERIFY commands.

use std::fmt::{Debug, Formatter};

use crate::aid::{Aid, FileId};
use crate::error::{Error, Result};

const PIN_LEN: usize = 4;
const WILDCARD: u8 = 0x2A;

/// A PIN encoded in the JIS X 0201 subset accepted by the card.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Pin([u8; PIN_LEN]);

impl Pin {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Pin {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Pin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Encodes the PIN string into octets.
///
/// An empty string is encoded into four `*` placeholders.
/// Otherwise the string must consist of exactly 4 characters of `0`-`9` or `*`.
pub fn encode_pin(s: &str) -> Result<Pin> {
    if s.is_empty() {
        return Ok(Pin([WILDCARD; PIN_LEN]));
    }

    let mut buf = [0u8; PIN_LEN];
    let mut chars = s.chars();
    for b in buf.iter_mut() {
        *b = chars.next().and_then(encode_char).ok_or(Error::InvalidPinFormat)?;
    }

    match chars.next() {
        Some(_) => Err(Error::InvalidPinFormat),
        None => Ok(Pin(buf)),
    }
}

fn encode_char(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8),
        '*' => Some(WILDCARD),
        _ => None,
    }
}

/// Type of the PIN to look up its remaining tries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PinType {
    /// PIN for the key-pair to sign documents (6-16 alphanumerics).
    DigitalSignature,

    /// PIN for the key-pair to authenticate the user (4 digits).
    UserAuthentication,

    /// PIN for the Card Info Input Support AP (4 digits).
    CardInfoInputSupport,

    /// PIN for the Individual Number AP (4 digits).
    IndividualNumber,
}

impl PinType {
    /// DF and EF that hold the PIN.
    pub fn location(self) -> (Aid, FileId) {
        match self {
            Self::DigitalSignature => (Aid::Jpki, FileId([0x00, 0x1B])),
            Self::UserAuthentication => (Aid::Jpki, FileId([0x00, 0x18])),
            Self::CardInfoInputSupport => (Aid::CardInfoInputSupport, FileId([0x00, 0x11])),
            Self::IndividualNumber => (Aid::IndividualNumber, FileId([0x00, 0x1C])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty() {
        assert_eq!([0x2A, 0x2A, 0x2A, 0x2A], encode_pin("").unwrap().as_bytes());
    }

    #[test]
    fn test_encode_mapping() {
        assert_eq!([0x31, 0x32, 0x33, 0x34], encode_pin("1234").unwrap().as_bytes());
        assert_eq!([0x30, 0x39, 0x2A, 0x35], encode_pin("09*5").unwrap().as_bytes());
        assert_eq!([0x2A; 4], encode_pin("****").unwrap().as_bytes());
    }

    #[test]
    fn test_encode_every_symbol() {
        for (i, c) in "0123456789*".chars().enumerate() {
            let s: String = std::iter::repeat(c).take(4).collect();
            let expected = if c == '*' { 0x2A } else { 0x30 + i as u8 };

            assert_eq!([expected; 4], encode_pin(&s).unwrap().as_bytes());
        }
    }

    #[test]
    fn test_encode_invalid() {
        for s in ["1", "123", "12345", "12a4", "12 4", "１２３４", "123\u{0}"] {
            assert_eq!(Err(Error::InvalidPinFormat), encode_pin(s), "{:?}", s);
        }
    }

    #[test]
    fn test_debug_redacts() {
        assert_eq!("Pin(****)", format!("{:?}", encode_pin("1234").unwrap()));
    }
}
