//! A crate to read Japanese Individual Number cards through a tag channel provided by the host.
//!
//! The host NFC stack owns the radio: it discovers tags, connects to them, and implements
//! [`nfc::TagChannel`] to transmit APDU commands. This crate builds the commands, interprets the
//! status words, and sequences the exchanges for each task in a [`session::CardSession`].
//!
//! ## Usage
//! ```rust,no_run
//! use jpcard::data::Item;
//! use jpcard::nfc::{ChannelError, TagChannel};
//! use jpcard::Reader;
//!
//! struct HostTag;
//!
//! impl TagChannel for HostTag {
//!     fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, ChannelError> {
//!         // Hand the command over to the NFC stack here.
//!         Err(ChannelError::Transport(format!("{} octets not sent", command.len())))
//!     }
//!
//!     fn current_aid(&self) -> Option<&str> {
//!         Some("D392F000260100000001")
//!     }
//! }
//!
//! let reader = Reader::default();
//! let data = reader
//!     .read_card_info(vec![HostTag], &[Item::TokenInfo, Item::IndividualNumber], "1234")
//!     .unwrap();
//!
//! println!("{:?}", data.individual_number);
//! ```

mod log;

pub mod aid;
pub mod ap;
pub mod apdu;
pub mod config;
pub mod data;
pub mod der;
pub mod error;
pub mod nfc;
pub mod pin;
pub mod reader;
pub mod session;

pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::pin::encode_pin;
pub use self::reader::{Reader, Reply, Request};
