use crate::apdu::CommandOutcome;
use crate::error::{Error, Result};

const TRAILER_LEN: usize = 2;

/// A response received from the card, split into the payload and SW1/SW2.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    payload: Vec<u8>,
    sw1: u8,
    sw2: u8,
}

impl Response {
    /// Parses a response from the octets.
    /// The last two octets are the trailer (SW1 and SW2), the rest is the payload.
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < TRAILER_LEN {
            return Err(Error::MalformedResponse(bytes.len()));
        }

        let response = ::apdu::Response::from(bytes.as_slice());
        let (sw1, sw2) = response.trailer;

        Ok(Self {
            payload: response.payload.to_vec(),
            sw1,
            sw2,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn trailer(&self) -> (u8, u8) {
        (self.sw1, self.sw2)
    }

    /// Classifies the trailer.
    pub fn outcome(&self) -> CommandOutcome {
        CommandOutcome::classify(self.sw1, self.sw2)
    }

    /// Converts the response to a result of octets.
    pub fn into_result(self) -> Result<Vec<u8>> {
        self.outcome().into_result().map(|_| self.payload)
    }
}
