//! JPKI AP: Application to sign with the key-pairs and read the certificates issued by J-LIS.

use crate::aid::{Aid, FileId};
use crate::data::CertType;
use crate::error::{Error, Result};
use crate::nfc::TagChannel;
use crate::pin::Pin;
use crate::session::CardSession;

const EF_TOKEN_INFO: FileId = FileId([0x00, 0x06]);
const EF_AUTH_KEY: FileId = FileId([0x00, 0x17]);
const EF_AUTH_PIN: FileId = FileId([0x00, 0x18]);

const TOKEN_INFO_LEN: usize = 0x20;

impl CertType {
    /// Converts the variant into the identifier to select a EF
    /// that corresponds with the selected certificate.
    pub fn into_efid(self) -> FileId {
        match self {
            Self::UserAuthentication => FileId([0x00, 0x0A]),
            Self::UserAuthenticationCa => FileId([0x00, 0x0B]),
            Self::DigitalSignatureCa => FileId([0x00, 0x02]),
        }
    }
}

/// An AP to sign messages using a key-pair issued by JPKI
pub struct JpkiAp<'s, T>
where
    T: TagChannel,
{
    session: &'s mut CardSession<T>,
}

impl<'s, T> JpkiAp<'s, T>
where
    T: TagChannel,
{
    /// Opens the AP in the card by selecting the DF.
    pub fn open(session: &'s mut CardSession<T>) -> Result<Self> {
        session.select_df(Aid::Jpki)?;

        Ok(Self { session })
    }

    /// Reads the token information, such as `JPKIAPICCTOKEN2`.
    pub fn read_token_info(&mut self) -> Result<String> {
        self.session.select_ef(EF_TOKEN_INFO)?;

        let buf = self.session.read(Some(TOKEN_INFO_LEN))?;
        let token = decode_token_info(&buf);

        self.session.check(token)
    }

    /// Reads a certificate of the type as DER-encoded X.509 data.
    pub fn read_certificate(&mut self, ty: CertType) -> Result<Vec<u8>> {
        self.session.select_ef(ty.into_efid())?;
        self.session.read_der()
    }

    /// Computes a signature using the key-pair for user authentication.
    pub fn auth(&mut self, pin: &Pin, data: &[u8]) -> Result<Vec<u8>> {
        self.session.verify_pin(EF_AUTH_PIN, pin)?;
        self.session.select_ef(EF_AUTH_KEY)?;
        self.session.compute_signature(data)
    }
}

fn decode_token_info(buf: &[u8]) -> Result<String> {
    let token = String::from_utf8_lossy(buf);
    let token = token.trim_end_matches(|c: char| c == ' ' || c == '\0');

    match token.is_empty() {
        true => Err(Error::InvalidData("token information is empty".to_owned())),
        _ => Ok(token.to_owned()),
    }
}
