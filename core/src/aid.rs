//! Application identifiers of the DFs (Dedicated Files) on the card.

use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};

/// One of the applications this crate is able to talk to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Aid {
    /// JPKI AP: certificates and key-pairs issued by J-LIS.
    Jpki,

    /// Card Info Input Support AP: My Number and the text attributes.
    CardInfoInputSupport,

    /// Individual Number AP.
    IndividualNumber,

    /// Accepted as an initial AID of the tag, but not selected by any task.
    Auxiliary,
}

impl Aid {
    pub const ALL: [Aid; 4] = [
        Aid::Jpki,
        Aid::CardInfoInputSupport,
        Aid::IndividualNumber,
        Aid::Auxiliary,
    ];

    /// DF name to be sent in a `SELECT FILE` command.
    pub const fn df_name(self) -> [u8; 10] {
        match self {
            Self::Jpki => [0xD3, 0x92, 0xF0, 0x00, 0x26, 0x01, 0x00, 0x00, 0x00, 0x01],
            Self::CardInfoInputSupport => {
                [0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x04, 0x08]
            }
            Self::IndividualNumber => [0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x01, 0x00],
            Self::Auxiliary => [0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x04, 0x01],
        }
    }

    /// Parses the AID from its hex representation, as reported by NFC stacks.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::UnsupportedAid(s.to_owned()))?;

        Self::try_from(bytes.as_slice())
    }
}

impl<'a> TryFrom<&'a [u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|aid| aid.df_name() == bytes)
            .ok_or_else(|| Error::UnsupportedAid(hex::encode_upper(bytes)))
    }
}

impl Display for Aid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_upper(self.df_name()))
    }
}

/// Identifier of an EF (Elementary File) in the selected DF.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FileId(pub [u8; 2]);

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}
