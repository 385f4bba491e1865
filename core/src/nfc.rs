//! Communicating with the card using NFC technology

/// Errors reported by the host NFC stack while exchanging with a tag.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("The tag was removed from the reader")]
    TagLost,

    #[error("The tag did not respond in time")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

/// A connected ISO 7816 tag, owned by the host NFC stack.
pub trait TagChannel {
    /// Transmits the command octets to the tag, then receives the response octets including SW1/SW2.
    /// Implementations block until the response arrives or the exchange fails.
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, ChannelError>;

    /// AID that was selected when the tag was discovered.
    /// `None` if the tag is not an ISO 7816 tag.
    fn current_aid(&self) -> Option<&str>;

    /// Determines whether the user or the host has canceled the session.
    fn is_canceled(&self) -> bool {
        false
    }

    /// Called exactly once when a session on this tag is over.
    fn invalidate(&mut self) {}
}

impl<T> TagChannel for &mut T
where
    T: TagChannel + ?Sized,
{
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, ChannelError> {
        (**self).transmit(command)
    }

    fn current_aid(&self) -> Option<&str> {
        (**self).current_aid()
    }

    fn is_canceled(&self) -> bool {
        (**self).is_canceled()
    }

    fn invalidate(&mut self) {
        (**self).invalidate()
    }
}
