use std::fmt::{Debug, Formatter};

use ::apdu::command;

use super::{ins, CLA_DEFAULT, CLA_PROPRIETARY};
use crate::aid::{Aid, FileId};
use crate::error::{Error, Result};

const SELECT_P1_DF: u8 = 0x04;
const SELECT_P1_EF: u8 = 0x02;
const SELECT_P2: u8 = 0x0C;

const VERIFY_P1: u8 = 0x00;
const VERIFY_P2: u8 = 0x80;

const SIGN_P1: u8 = 0x00;
const SIGN_P2: u8 = 0x80;

/// Longest payload a short Lc can carry.
pub const MAX_PAYLOAD_LEN: usize = 0xFF;

/// An APDU command, serialized and ready to be transmitted.
#[derive(Clone, Eq, PartialEq)]
pub struct Command {
    bytes: Vec<u8>,
    sensitive: bool,
}

impl Command {
    fn new<'a>(command: impl Into<::apdu::Command<'a>>) -> Self {
        Self {
            bytes: Vec::from(command.into()),
            sensitive: false,
        }
    }

    /// Builds a `SELECT FILE` command for a DF name.
    /// Names that are not on the whitelist are rejected.
    pub fn select(aid: &[u8]) -> Result<Self> {
        Aid::try_from(aid).map(Self::select_df)
    }

    /// Builds a `SELECT FILE` command for one of the known DFs.
    pub fn select_df(aid: Aid) -> Self {
        Self::new(command::select_file(
            SELECT_P1_DF,
            SELECT_P2,
            &aid.df_name(),
        ))
    }

    /// Builds a `SELECT FILE` command for an EF in the current DF.
    pub fn select_ef(id: FileId) -> Self {
        Self::new(command::select_file(SELECT_P1_EF, SELECT_P2, &id.0))
    }

    /// Builds a `VERIFY` command carrying the PIN.
    /// Without a PIN, the command only asks for the remaining tries.
    pub fn verify(pin: &[u8]) -> Self {
        if pin.is_empty() {
            return Self::new(::apdu::Command::new(
                CLA_DEFAULT,
                ins::VERIFY,
                VERIFY_P1,
                VERIFY_P2,
            ));
        }

        Self {
            sensitive: true,
            ..Self::new(command::verify(VERIFY_P2, pin))
        }
    }

    /// Builds a `READ BINARY` command for `length` octets at `offset`.
    /// Length 0 means 256 octets.
    pub fn read_binary(offset: u16, length: u8) -> Self {
        let [p1, p2] = offset.to_be_bytes();

        Self::new(command::read_binary(p1, p2, length))
    }

    /// Builds a `COMPUTE DIGITAL SIGNATURE` command for the selected key.
    /// Data longer than a short Lc can describe is rejected.
    pub fn compute_signature(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidData(format!(
                "{} octets to sign exceed {} octets",
                data.len(),
                MAX_PAYLOAD_LEN
            )));
        }

        Ok(Self::new(::apdu::Command::new_with_payload_le(
            CLA_PROPRIETARY,
            ins::COMPUTE_DIGITAL_SIGNATURE,
            SIGN_P1,
            SIGN_P2,
            0,
            data,
        )))
    }

    /// Determines whether the command carries a PIN, so its data must not be logged.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.sensitive {
            true => write!(f, "Command({} ..)", hex::encode(&self.bytes[..4])),
            _ => write!(f, "Command({})", hex::encode(&self.bytes)),
        }
    }
}

impl From<Command> for Vec<u8> {
    fn from(command: Command) -> Self {
        command.into_bytes()
    }
}
