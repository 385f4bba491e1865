//! Card Info Input Support AP: Application to read the My Number and the text attributes.

use crate::aid::{Aid, FileId};
use crate::data::Attributes;
use crate::der::Reader;
use crate::error::{Error, Result};
use crate::nfc::TagChannel;
use crate::pin::Pin;
use crate::session::CardSession;

const EF_MY_NUMBER: FileId = FileId([0x00, 0x01]);
const EF_ATTRIBUTES: FileId = FileId([0x00, 0x02]);
const EF_PIN: FileId = FileId([0x00, 0x11]);

const MY_NUMBER_EF_LEN: usize = 17;
const MY_NUMBER_LEN: usize = 12;

pub struct SupportAp<'s, T>
where
    T: TagChannel,
{
    session: &'s mut CardSession<T>,
}

impl<'s, T> SupportAp<'s, T>
where
    T: TagChannel,
{
    /// Opens the AP in the card by selecting the DF.
    pub fn open(session: &'s mut CardSession<T>) -> Result<Self> {
        session.select_df(Aid::CardInfoInputSupport)?;

        Ok(Self { session })
    }

    /// Reads the "My Number" from the card as DER-encoded ASN.1 data.
    pub fn read_my_number_raw(&mut self, pin: &Pin) -> Result<Vec<u8>> {
        self.session.verify_pin(EF_PIN, pin)?;
        self.session.select_ef(EF_MY_NUMBER)?;
        self.session.read(Some(MY_NUMBER_EF_LEN))
    }

    /// Reads the "My Number" from the card as a string.
    pub fn read_my_number(&mut self, pin: &Pin) -> Result<String> {
        let buf = self.read_my_number_raw(pin)?;

        self.session.check(decode_my_number(&buf))
    }

    /// Reads the text attributes from the card as DER-encoded ASN.1 data.
    pub fn read_attributes_raw(&mut self, pin: &Pin) -> Result<Vec<u8>> {
        self.session.verify_pin(EF_PIN, pin)?;
        self.session.select_ef(EF_ATTRIBUTES)?;
        self.session.read_der()
    }

    /// Reads the text attributes from the card as decoded data.
    pub fn read_attributes(&mut self, pin: &Pin) -> Result<Attributes> {
        let buf = self.read_attributes_raw(pin)?;

        self.session.check(Attributes::try_from(buf.as_slice()))
    }
}

fn decode_my_number(buf: &[u8]) -> Result<String> {
    let number = Reader::new(buf).read_auto()?;

    // The digits must not leak into the error, as it is logged.
    if number.len() != MY_NUMBER_LEN {
        return Err(Error::InvalidData(format!(
            "My Number has {} octets, not {}",
            number.len(),
            MY_NUMBER_LEN
        )));
    }

    match number.iter().position(|b| !b.is_ascii_digit()) {
        Some(i) => Err(Error::InvalidData(format!(
            "My Number has a non-digit octet at {}",
            i
        ))),
        None => Ok(String::from_utf8_lossy(number).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_my_number() {
        let mut buf = vec![0xFF, 0x40, 0x0C];
        buf.extend_from_slice(b"123456789012");
        buf.extend_from_slice(&[0x00, 0x00]);

        assert_eq!(Ok("123456789012".to_owned()), decode_my_number(&buf));
    }

    #[test]
    fn test_decode_my_number_invalid() {
        assert!(decode_my_number(&[0xFF, 0x40, 0x0C, 0x31]).is_err());
        assert!(decode_my_number(&[0xFF, 0x40, 0x02, 0x31, 0x32]).is_err());
        assert!(decode_my_number(b"\xFF\x40\x0C12345678901X").is_err());
    }

    #[test]
    fn test_decode_my_number_error_hides_digits() {
        let e = decode_my_number(b"\xFF\x40\x0C98765432101X").unwrap_err();

        assert_eq!(
            Error::InvalidData("My Number has a non-digit octet at 11".to_owned()),
            e,
        );
        assert!(!e.to_string().contains("9876"));

        let e = decode_my_number(&[0xFF, 0x40, 0x02, 0x39, 0x38]).unwrap_err();
        assert!(!e.to_string().contains("98"));
    }
}
