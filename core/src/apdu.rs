//! APDU (Application Protocol Data Unit) codec

mod command;
mod response;
pub mod status;

pub use command::{Command, MAX_PAYLOAD_LEN};
pub use response::Response;
pub use status::CommandOutcome;

pub const CLA_DEFAULT: u8 = 0x00;
pub const CLA_PROPRIETARY: u8 = 0x80;

/// Instruction codes used with the card.
pub mod ins {
    pub const SELECT_FILE: u8 = 0xA4;
    pub const VERIFY: u8 = 0x20;
    pub const READ_BINARY: u8 = 0xB0;
    pub const COMPUTE_DIGITAL_SIGNATURE: u8 = 0x2A;
}
