//! Data read from the card.

use crate::error::{Error, Result};

/// Items that can be requested on reading the card info.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Item {
    /// Token information of the JPKI AP, available without any PIN.
    TokenInfo,

    /// My Number (12 digits), unlocked by the Card Info Input Support PIN.
    IndividualNumber,

    /// Name, address, date of birth and sex, unlocked by the Card Info Input Support PIN.
    Attributes,
}

/// Type of the certificate to fetch without a PIN.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CertType {
    /// Certificate for user authentication
    #[default]
    UserAuthentication,

    /// Certificate of CA (Certificate Authority) that issued the user authentication certificate
    UserAuthenticationCa,

    /// Certificate of CA (Certificate Authority) that issued the digital signature certificate
    DigitalSignatureCa,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Sex {
    Male,
    Female,
    NotApplicable,
    Unknown,
}

impl From<&str> for Sex {
    fn from(code: &str) -> Self {
        match code {
            "1" => Self::Male,
            "2" => Self::Female,
            "9" => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }
}

/// Text attributes printed on the card surface.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Attributes {
    pub name: String,
    pub address: String,
    pub date_of_birth: String,
    pub sex: Sex,
}

impl<'a> TryFrom<&'a [u8]> for Attributes {
    type Error = Error;

    fn try_from(buf: &'a [u8]) -> Result<Self> {
        crate::der::Reader::new(buf).in_sequence(|reader| {
            // Header: offsets of the following fields.
            reader.read_auto()?;

            Ok(Self {
                name: reader.read_string()?,
                address: reader.read_string()?,
                date_of_birth: reader.read_string()?,
                sex: Sex::from(reader.read_str()?.as_ref()),
            })
        })
    }
}

/// A signature computed with the key-pair for user authentication.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Signature {
    pub value: Vec<u8>,

    /// DER-encoded certificate of the key-pair, to verify the signature with.
    pub certificate: Vec<u8>,
}

impl TryFrom<CardData> for Signature {
    type Error = Error;

    fn try_from(data: CardData) -> Result<Self> {
        match (data.signature, data.certificate) {
            (Some(value), Some(certificate)) => Ok(Self { value, certificate }),
            _ => Err(Error::InvalidData(
                "no signature was computed in the session".to_owned(),
            )),
        }
    }
}

/// Data collected during a session.
/// Fields are filled only for the items the task has read.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CardData {
    pub token_info: Option<String>,
    pub individual_number: Option<String>,
    pub attributes: Option<Attributes>,
    pub certificate: Option<Vec<u8>>,
    pub signature: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlv(tag: [u8; 2], value: &[u8]) -> Vec<u8> {
        let mut buf = vec![tag[0], tag[1], value.len() as u8];
        buf.extend_from_slice(value);
        buf
    }

    #[test]
    fn test_attributes() {
        let mut inner = tlv([0xDF, 0x21], &[0x00; 8]);
        inner.append(&mut tlv([0xDF, 0x22], "番号 花子".as_bytes()));
        inner.append(&mut tlv([0xDF, 0x23], "東京都千代田区".as_bytes()));
        inner.append(&mut tlv([0xDF, 0x24], b"19900101"));
        inner.append(&mut tlv([0xDF, 0x25], b"2"));

        let buf = tlv([0xFF, 0x20], &inner);

        assert_eq!(
            Attributes {
                name: "番号 花子".to_owned(),
                address: "東京都千代田区".to_owned(),
                date_of_birth: "19900101".to_owned(),
                sex: Sex::Female,
            },
            Attributes::try_from(buf.as_slice()).unwrap(),
        );
    }

    #[test]
    fn test_attributes_truncated() {
        let buf = tlv([0xFF, 0x20], &tlv([0xDF, 0x21], &[0x00; 8]));

        assert!(matches!(
            Attributes::try_from(buf.as_slice()),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn test_sex() {
        assert_eq!(Sex::Male, Sex::from("1"));
        assert_eq!(Sex::NotApplicable, Sex::from("9"));
        assert_eq!(Sex::Unknown, Sex::from("3"));
    }
}
