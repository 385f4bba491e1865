//! A session on a single tag, from the first SELECT to the end of the task.

use std::mem;

use crate::aid::{Aid, FileId};
use crate::apdu::status::describe;
use crate::apdu::{Command, CommandOutcome, Response};
use crate::config::Config;
use crate::data::CardData;
use crate::der::entire_size_from_partial;
use crate::error::{Error, Result};
use crate::log::{debug, warning};
use crate::nfc::TagChannel;
use crate::pin::Pin;

const DER_HEADER_LEN: usize = 7;
const MAX_OFFSET: usize = 0x7FFF;

/// State of a session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
    Idle,
    AidSelected(Aid),
    Authenticated(Aid),
    DataCollecting(Aid),
    Done,

    /// The session was aborted. Not resumable.
    Failed(Error),
}

impl State {
    fn aid(&self) -> Option<Aid> {
        match self {
            Self::AidSelected(aid) | Self::Authenticated(aid) | Self::DataCollecting(aid) => {
                Some(*aid)
            }
            _ => None,
        }
    }

    fn is_closed(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Drives the exchanges with a tag, one at a time, and tracks what has been selected.
/// The tag is invalidated when the session is dropped.
pub struct CardSession<T>
where
    T: TagChannel,
{
    channel: T,
    config: Config,
    state: State,
    ef: Option<FileId>,
    data: CardData,
}

impl<T> CardSession<T>
where
    T: TagChannel,
{
    /// Starts a session on the tag.
    pub fn new(channel: T, config: Config) -> Self {
        Self {
            channel,
            config,
            state: State::Idle,
            ef: None,
            data: CardData::default(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn data(&self) -> &CardData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut CardData {
        &mut self.data
    }

    /// Selects a DF with their name.
    pub fn select_df(&mut self, aid: Aid) -> Result<()> {
        self.handle(Command::select_df(aid))?;
        self.ef = None;
        self.transition(State::AidSelected(aid));

        Ok(())
    }

    /// Selects a EF in the selected DF.
    pub fn select_ef(&mut self, id: FileId) -> Result<()> {
        self.selected_aid()?;
        self.handle(Command::select_ef(id))?;
        self.ef = Some(id);

        Ok(())
    }

    /// Verifies the PIN against the selected EF.
    pub fn verify(&mut self, pin: &Pin) -> Result<()> {
        let aid = self.selected_ef()?;
        self.handle(Command::verify(pin.as_bytes()))?;
        self.transition(State::Authenticated(aid));

        Ok(())
    }

    /// Selects a EF then verifies the pin using the EF.
    pub fn verify_pin(&mut self, ef: FileId, pin: &Pin) -> Result<()> {
        self.select_ef(ef)?;
        self.verify(pin)
    }

    /// Asks the remaining tries of the PIN in the selected EF, without verifying it.
    /// A counter of zero is returned as is.
    pub fn probe(&mut self) -> Result<u8> {
        self.selected_ef()?;

        match self.exchange(Command::verify(&[]))?.outcome() {
            CommandOutcome::VerificationFailed { remaining_tries } => Ok(remaining_tries),
            CommandOutcome::Success => self.fail(Error::Other {
                sw1: 0x90,
                sw2: 0x00,
            }),
            outcome => {
                let result = outcome.into_result().map(|_| 0);
                self.check(result)
            }
        }
    }

    /// Selects a EF then asks the remaining tries of the PIN.
    pub fn pin_status(&mut self, ef: FileId) -> Result<u8> {
        self.select_ef(ef)?;
        self.probe()
    }

    /// Reads binary from the selected file for `len` octets max.
    /// Without `len`, reads until the card returns a short chunk.
    pub fn read(&mut self, len: Option<usize>) -> Result<Vec<u8>> {
        let aid = self.selected_ef()?;
        self.transition(State::DataCollecting(aid));

        let chunk = self.config.max_read_chunk.max(1) as usize;
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let pos = buf.len();
            let le = match len {
                Some(l) if pos >= l => break,
                Some(l) => (l - pos).min(chunk),
                None => chunk,
            };

            if pos > MAX_OFFSET {
                return self.fail(Error::InvalidData(format!(
                    "offset {:#06X} exceeds the addressable range",
                    pos
                )));
            }

            let mut fragment = self.handle(Command::read_binary(pos as u16, le as u8))?;
            let length = fragment.len();

            buf.append(&mut fragment);

            if length < le {
                break;
            }
        }

        Ok(buf)
    }

    /// Reads the whole selected file, sized by its DER-encoded ASN.1 header.
    pub fn read_der(&mut self) -> Result<Vec<u8>> {
        let header = self.read(Some(DER_HEADER_LEN))?;
        let size = entire_size_from_partial(&header);
        let size = self.check(size)?;

        self.read(Some(size))
    }

    /// Computes a signature using the key in the selected EF.
    pub fn compute_signature(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let aid = self.selected_ef()?;
        self.transition(State::DataCollecting(aid));

        let command = self.check(Command::compute_signature(data))?;

        self.handle(command)
    }

    /// Completes the session, handing out the collected data.
    pub fn finish(&mut self) -> Result<CardData> {
        self.ensure_open()?;
        self.transition(State::Done);

        Ok(mem::take(&mut self.data))
    }

    /// Fails the session if the result is an error.
    pub(crate) fn check<R>(&mut self, result: Result<R>) -> Result<R> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => self.fail(e),
        }
    }

    fn handle(&mut self, command: Command) -> Result<Vec<u8>> {
        let result = self.exchange(command)?.into_result();

        self.check(result)
    }

    fn exchange(&mut self, command: Command) -> Result<Response> {
        self.ensure_open()?;

        if self.channel.is_canceled() {
            return self.fail(Error::Canceled);
        }

        let sensitive = command.is_sensitive();
        let tx = command.into_bytes();
        if sensitive {
            debug!("TX: {} (data redacted)", hex::encode(&tx[..4]));
        } else {
            debug!("TX: {}", hex::encode(&tx));
        }

        let rx = self.channel.transmit(&tx).map_err(Error::from);
        let response = self.check(rx.and_then(Response::parse))?;

        let (sw1, sw2) = response.trailer();
        debug!(
            "RX: {} {:02X}{:02X} ({})",
            hex::encode(response.payload()),
            sw1,
            sw2,
            describe(sw1, sw2)
        );

        Ok(response)
    }

    fn selected_aid(&self) -> Result<Aid> {
        self.ensure_open()?;
        self.state.aid().ok_or(Error::NotSelected)
    }

    fn selected_ef(&self) -> Result<Aid> {
        let aid = self.selected_aid()?;
        self.ef.map(|_| aid).ok_or(Error::NotSelected)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.is_closed() {
            true => Err(Error::SessionClosed),
            _ => Ok(()),
        }
    }

    fn fail<R>(&mut self, e: Error) -> Result<R> {
        warning!("Session failed: {}", e);
        self.transition(State::Failed(e.clone()));

        Err(e)
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            debug!("Session state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl<T> Drop for CardSession<T>
where
    T: TagChannel,
{
    fn drop(&mut self) {
        self.channel.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::nfc::ChannelError;
    use crate::pin::encode_pin;

    #[derive(Default)]
    struct Script {
        sent: Vec<Vec<u8>>,
        replies: VecDeque<std::result::Result<Vec<u8>, ChannelError>>,
        canceled: bool,
        invalidated: usize,
    }

    impl Script {
        fn reply(mut self, rx: &[u8]) -> Self {
            self.replies.push_back(Ok(rx.to_vec()));
            self
        }
    }

    impl TagChannel for Script {
        fn transmit(&mut self, command: &[u8]) -> std::result::Result<Vec<u8>, ChannelError> {
            self.sent.push(command.to_vec());
            self.replies.pop_front().unwrap_or(Err(ChannelError::TagLost))
        }

        fn current_aid(&self) -> Option<&str> {
            Some("D392F000260100000001")
        }

        fn is_canceled(&self) -> bool {
            self.canceled
        }

        fn invalidate(&mut self) {
            self.invalidated += 1;
        }
    }

    #[test]
    fn test_select_ef_requires_df() {
        let mut script = Script::default();
        let mut session = CardSession::new(&mut script, Config::default());

        assert_eq!(Err(Error::NotSelected), session.select_ef(FileId([0x00, 0x06])));
        assert_eq!(Err(Error::NotSelected), session.read(Some(4)));
        assert_eq!(&State::Idle, session.state());
        drop(session);

        assert!(script.sent.is_empty());
        assert_eq!(1, script.invalidated);
    }

    #[test]
    fn test_read_requires_ef() {
        let mut script = Script::default().reply(&[0x90, 0x00]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();
        assert_eq!(Err(Error::NotSelected), session.read(Some(4)));
        assert_eq!(&State::AidSelected(Aid::Jpki), session.state());
    }

    #[test]
    fn test_read_in_chunks() {
        let config = Config {
            max_read_chunk: 4,
            ..Default::default()
        };
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[1, 2, 3, 4, 0x90, 0x00])
            .reply(&[5, 6, 0x90, 0x00]);
        let mut session = CardSession::new(&mut script, config);

        session.select_df(Aid::Jpki).unwrap();
        session.select_ef(FileId([0x00, 0x0A])).unwrap();

        assert_eq!(vec![1, 2, 3, 4, 5, 6], session.read(Some(6)).unwrap());
        assert_eq!(&State::DataCollecting(Aid::Jpki), session.state());
        drop(session);

        assert_eq!(vec![0x00, 0xB0, 0x00, 0x00, 0x04], script.sent[2]);
        assert_eq!(vec![0x00, 0xB0, 0x00, 0x04, 0x02], script.sent[3]);
    }

    #[test]
    fn test_read_stops_on_short_chunk() {
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[1, 2, 0x90, 0x00]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();
        session.select_ef(FileId([0x00, 0x06])).unwrap();

        assert_eq!(vec![1, 2], session.read(None).unwrap());
    }

    #[test]
    fn test_read_der() {
        let mut file = vec![0x30, 0x82, 0x01, 0x00];
        file.extend((0..0x100).map(|i| i as u8));

        let mut script = Script::default().reply(&[0x90, 0x00]).reply(&[0x90, 0x00]);
        script = script.reply(&[&file[..7], &[0x90, 0x00][..]].concat());
        script = script.reply(&[&file[..0xFF], &[0x90, 0x00][..]].concat());
        script = script.reply(&[&file[0xFF..], &[0x90, 0x00][..]].concat());

        let mut session = CardSession::new(&mut script, Config::default());
        session.select_df(Aid::Jpki).unwrap();
        session.select_ef(FileId([0x00, 0x0A])).unwrap();

        assert_eq!(file, session.read_der().unwrap());
    }

    #[test]
    fn test_verify_failure_closes_session() {
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[0x63, 0xC1]);
        let mut session = CardSession::new(&mut script, Config::default());
        let pin = encode_pin("1234").unwrap();

        session.select_df(Aid::CardInfoInputSupport).unwrap();

        let err = Error::VerificationFailed { remaining_tries: 1 };
        assert_eq!(Err(err.clone()), session.verify_pin(FileId([0x00, 0x11]), &pin));
        assert_eq!(&State::Failed(err), session.state());
        assert_eq!(Err(Error::SessionClosed), session.select_df(Aid::Jpki));
        assert_eq!(Err(Error::SessionClosed), session.finish());
        drop(session);

        assert_eq!(3, script.sent.len());
    }

    #[test]
    fn test_verify_authenticates() {
        let mut script = Script::default().reply(&[0x90, 0x00]).reply(&[0x90, 0x00]);
        script = script.reply(&[0x90, 0x00]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();
        session
            .verify_pin(FileId([0x00, 0x18]), &encode_pin("0000").unwrap())
            .unwrap();

        assert_eq!(&State::Authenticated(Aid::Jpki), session.state());
    }

    #[test]
    fn test_probe() {
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[0x63, 0xC0]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();

        // Zero tries left is still an answer, not a blocked session.
        assert_eq!(Ok(0), session.pin_status(FileId([0x00, 0x18])));
        assert_eq!(&State::AidSelected(Aid::Jpki), session.state());
        drop(session);

        assert_eq!(vec![0x00, 0x20, 0x00, 0x80], script.sent[2]);
    }

    #[test]
    fn test_probe_unexpected_success() {
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();

        assert_eq!(
            Err(Error::Other {
                sw1: 0x90,
                sw2: 0x00
            }),
            session.pin_status(FileId([0x00, 0x18])),
        );
    }

    #[test]
    fn test_probe_blocked() {
        let mut script = Script::default()
            .reply(&[0x90, 0x00])
            .reply(&[0x90, 0x00])
            .reply(&[0x69, 0x84]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();

        assert_eq!(Err(Error::Blocked), session.pin_status(FileId([0x00, 0x1B])));
        assert_eq!(&State::Failed(Error::Blocked), session.state());
    }

    #[test]
    fn test_malformed_response() {
        let mut script = Script::default().reply(&[0x90]);
        let mut session = CardSession::new(&mut script, Config::default());

        assert_eq!(Err(Error::MalformedResponse(1)), session.select_df(Aid::Jpki));
        assert_eq!(&State::Failed(Error::MalformedResponse(1)), session.state());
    }

    #[test]
    fn test_channel_error() {
        let mut script = Script::default();
        let mut session = CardSession::new(&mut script, Config::default());

        assert_eq!(
            Err(Error::Channel(ChannelError::TagLost)),
            session.select_df(Aid::Jpki),
        );
    }

    #[test]
    fn test_canceled() {
        let mut script = Script {
            canceled: true,
            ..Default::default()
        };
        let mut session = CardSession::new(&mut script, Config::default());

        assert_eq!(Err(Error::Canceled), session.select_df(Aid::Jpki));
        assert_eq!(&State::Failed(Error::Canceled), session.state());
        drop(session);

        assert!(script.sent.is_empty());
        assert_eq!(1, script.invalidated);
    }

    #[test]
    fn test_finish() {
        let mut script = Script::default().reply(&[0x90, 0x00]);
        let mut session = CardSession::new(&mut script, Config::default());

        session.select_df(Aid::Jpki).unwrap();
        session.data_mut().token_info = Some("JPKIAPICCTOKEN2".to_owned());

        let data = session.finish().unwrap();
        assert_eq!(Some("JPKIAPICCTOKEN2"), data.token_info.as_deref());
        assert_eq!(&State::Done, session.state());
    }
}
