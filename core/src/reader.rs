//! Task orchestration: one request, one tag, one session.

use std::io;
use std::thread::{self, JoinHandle};

use crate::aid::Aid;
use crate::ap::{JpkiAp, SupportAp};
use crate::apdu::MAX_PAYLOAD_LEN;
use crate::config::Config;
use crate::data::{CardData, CertType, Item, Signature};
use crate::error::{Error, Result, RetryReason, RetryRequest};
use crate::log::{debug, info};
use crate::nfc::TagChannel;
use crate::pin::{encode_pin, PinType};
use crate::session::CardSession;

const WORKER_NAME: &str = "jpcard-session";

/// A task to perform on the card, constructed once per call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    ReadCardInfo {
        items: Vec<Item>,
        support_app_pin: String,
    },
    LookupRemainingPin(PinType),
    ComputeDigitalSignature {
        user_pin: String,
        data: Vec<u8>,
    },
    GetCertificate(CertType),
}

/// Result of a [`Request`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    CardData(CardData),
    RemainingTries(u8),
    Signature(Signature),
    Certificate(Vec<u8>),
}

/// Entry point to perform tasks on the tags detected by the host NFC stack.
///
/// Each operation takes every tag detected at once. If they are not exactly one supported tag,
/// nothing is transmitted and [`Error::Retry`] asks the host to poll again.
#[derive(Clone, Debug, Default)]
pub struct Reader {
    config: Config,
}

impl Reader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads the requested items from the card.
    /// The PIN of Card Info Input Support AP is required for items except the token info.
    pub fn read_card_info<T, I>(
        &self,
        tags: I,
        items: &[Item],
        support_app_pin: &str,
    ) -> Result<CardData>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        let pin = encode_pin(support_app_pin)?;
        let mut session = self.engage(tags)?;

        let mut done: Vec<Item> = Vec::with_capacity(items.len());
        for item in items.iter().copied() {
            if done.contains(&item) {
                continue;
            }

            debug!("Reading {:?}", item);
            match item {
                Item::TokenInfo => {
                    let token = JpkiAp::open(&mut session)?.read_token_info()?;
                    session.data_mut().token_info = Some(token);
                }
                Item::IndividualNumber => {
                    let number = SupportAp::open(&mut session)?.read_my_number(&pin)?;
                    session.data_mut().individual_number = Some(number);
                }
                Item::Attributes => {
                    let attributes = SupportAp::open(&mut session)?.read_attributes(&pin)?;
                    session.data_mut().attributes = Some(attributes);
                }
            }

            done.push(item);
        }

        session.finish()
    }

    /// Looks up the remaining tries of the PIN, without consuming any of them.
    /// Zero tries is returned as a value, not as [`Error::Blocked`].
    pub fn lookup_remaining_pin<T, I>(&self, tags: I, pin_type: PinType) -> Result<u8>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        let (aid, ef) = pin_type.location();
        let mut session = self.engage(tags)?;

        session.select_df(aid)?;
        let remaining = session.pin_status(ef)?;
        session.finish()?;

        info!("{:?} PIN has {} tries remaining", pin_type, remaining);
        Ok(remaining)
    }

    /// Computes a signature for the data using the key-pair for user authentication.
    /// The certificate of the key-pair is read before verifying the PIN.
    /// Data longer than [`MAX_PAYLOAD_LEN`] octets is rejected before engaging the tag.
    pub fn compute_digital_signature<T, I>(
        &self,
        tags: I,
        user_pin: &str,
        data: &[u8],
    ) -> Result<Signature>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        let pin = encode_pin(user_pin)?;
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidData(format!(
                "{} octets to sign exceed {} octets",
                data.len(),
                MAX_PAYLOAD_LEN
            )));
        }

        let mut session = self.engage(tags)?;

        let mut ap = JpkiAp::open(&mut session)?;
        let certificate = ap.read_certificate(CertType::UserAuthentication)?;
        let value = ap.auth(&pin, data)?;

        session.data_mut().certificate = Some(certificate);
        session.data_mut().signature = Some(value);
        session.finish().and_then(Signature::try_from)
    }

    /// Reads the certificate for user authentication.
    pub fn get_certificate<T, I>(&self, tags: I) -> Result<Vec<u8>>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        self.get_certificate_of(tags, CertType::UserAuthentication)
    }

    /// Reads a certificate of the type.
    pub fn get_certificate_of<T, I>(&self, tags: I, ty: CertType) -> Result<Vec<u8>>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        let mut session = self.engage(tags)?;

        let certificate = JpkiAp::open(&mut session)?.read_certificate(ty)?;
        session.data_mut().certificate = Some(certificate);

        session
            .finish()?
            .certificate
            .ok_or_else(|| Error::InvalidData("no certificate was read".to_owned()))
    }

    /// Performs the request.
    pub fn execute<T, I>(&self, tags: I, request: Request) -> Result<Reply>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        match request {
            Request::ReadCardInfo {
                items,
                support_app_pin,
            } => self
                .read_card_info(tags, &items, &support_app_pin)
                .map(Reply::CardData),
            Request::LookupRemainingPin(pin_type) => self
                .lookup_remaining_pin(tags, pin_type)
                .map(Reply::RemainingTries),
            Request::ComputeDigitalSignature { user_pin, data } => self
                .compute_digital_signature(tags, &user_pin, &data)
                .map(Reply::Signature),
            Request::GetCertificate(ty) => self
                .get_certificate_of(tags, ty)
                .map(Reply::Certificate),
        }
    }

    /// Performs the request on a dedicated worker thread.
    /// The completion is called exactly once, with either the reply or the error.
    pub fn spawn<T, F>(
        &self,
        tags: Vec<T>,
        request: Request,
        completion: F,
    ) -> io::Result<JoinHandle<()>>
    where
        T: TagChannel + Send + 'static,
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        let reader = self.clone();

        thread::Builder::new()
            .name(WORKER_NAME.to_owned())
            .spawn(move || completion(reader.execute(tags, request)))
    }

    /// Accepts exactly one tag with a supported AID, starting a session on it.
    fn engage<T, I>(&self, tags: I) -> Result<CardSession<T>>
    where
        T: TagChannel,
        I: IntoIterator<Item = T>,
    {
        let mut tags = tags.into_iter();
        let tag = match tags.next() {
            Some(tag) => tag,
            None => return self.retry(RetryReason::NoTag),
        };

        let rest = tags.count();
        if rest > 0 {
            return self.retry(RetryReason::MultipleTags(rest + 1));
        }

        match tag.current_aid().map(|s| (s, Aid::from_hex(s))) {
            Some((_, Ok(aid))) => {
                debug!("Detected a tag on {}", aid);
            }
            Some((s, Err(_))) => {
                return self.retry(RetryReason::UnsupportedTag(Some(s.to_owned())))
            }
            None => return self.retry(RetryReason::UnsupportedTag(None)),
        }

        Ok(CardSession::new(tag, self.config))
    }

    fn retry<R>(&self, reason: RetryReason) -> Result<R> {
        let request = RetryRequest {
            reason,
            after: self.config.retry_interval,
        };

        info!("{}", request);
        Err(Error::Retry(request))
    }
}
