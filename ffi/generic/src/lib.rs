#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr::{null_mut, slice_from_raw_parts_mut};
use std::slice;

use jpcard::data::{CertType, Item};
use jpcard::nfc::{ChannelError, TagChannel};
use jpcard::pin::PinType;
use jpcard::{Error, Reader};

pub const JPCARD_PIN_DIGITAL_SIGNATURE: u8 = 0;
pub const JPCARD_PIN_USER_AUTHENTICATION: u8 = 1;
pub const JPCARD_PIN_CARD_INFO_INPUT_SUPPORT: u8 = 2;
pub const JPCARD_PIN_INDIVIDUAL_NUMBER: u8 = 3;

pub const JPCARD_CERT_USER_AUTHENTICATION: u8 = 0;
pub const JPCARD_CERT_USER_AUTHENTICATION_CA: u8 = 1;
pub const JPCARD_CERT_DIGITAL_SIGNATURE_CA: u8 = 2;

thread_local! {
    static LAST_ERROR: RefCell<Option<Error>> = const { RefCell::new(None) };
}

fn unwrap_or<T>(result: Result<T, Error>, default: T) -> T {
    // If result is an error, sets it to LAST_ERROR.
    // Clears the last error otherwise.
    let (value, error) = match result {
        Ok(value) => (value, None),
        Err(e) => (default, Some(e)),
    };

    LAST_ERROR.with(|last| *last.borrow_mut() = error);
    value
}

fn unwrap<T>(result: Result<T, Error>) -> T
where
    T: Default,
{
    unwrap_or(result, T::default())
}

/// A struct represents a byte array.
/// Dependents can read it from ptr to ptr+len.
/// ptr can be null pointer, so dependents must check the ptr is not null.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ByteArray {
    ptr: *mut u8,
    len: usize,
}

impl Default for ByteArray {
    fn default() -> Self {
        Self {
            ptr: null_mut(),
            len: 0,
        }
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        let ptr = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;

        Self { ptr, len }
    }
}

impl ByteArray {
    /// Borrows the octets. The array must be valid for the returned lifetime.
    unsafe fn as_slice<'a>(&self) -> Option<&'a [u8]> {
        match self.ptr.is_null() {
            true => None,
            false => Some(slice::from_raw_parts(self.ptr, self.len)),
        }
    }

    /// Releases an array allocated by this library.
    unsafe fn drain(self) {
        if !self.ptr.is_null() {
            let _ = Box::from_raw(slice_from_raw_parts_mut(self.ptr, self.len));
        }
    }
}

/// A signature and the certificate to verify it with.
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct SignatureBytes {
    value: ByteArray,
    certificate: ByteArray,
}

/// Transmits a command to the tag, returning the response including SW1/SW2.
/// The response stays owned by the host, and must be valid until the next call on the tag or
/// until the tag is closed. A null pointer in the response reports the tag as lost.
pub type TransmitFn = extern "C" fn(ctx: *mut c_void, command: ByteArray) -> ByteArray;

/// Determines whether the user or the host has canceled the session on the tag.
pub type IsCanceledFn = extern "C" fn(ctx: *mut c_void) -> bool;

/// A tag discovered by the host NFC stack.
pub struct JpcardTag {
    transmit: TransmitFn,
    is_canceled: Option<IsCanceledFn>,
    ctx: *mut c_void,
    aid: Option<String>,
}

impl TagChannel for JpcardTag {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let command = ByteArray {
            ptr: command.as_ptr() as *mut u8,
            len: command.len(),
        };

        let response = (self.transmit)(self.ctx, command);

        unsafe { response.as_slice() }
            .map(|r| r.to_vec())
            .ok_or(ChannelError::TagLost)
    }

    fn current_aid(&self) -> Option<&str> {
        self.aid.as_deref()
    }

    fn is_canceled(&self) -> bool {
        self.is_canceled.map_or(false, |f| f(self.ctx))
    }

    fn invalidate(&mut self) {
        // A tag used by a session must be discovered again before the next one.
        self.aid = None;
    }
}

fn pin_type(value: u8) -> Result<PinType, Error> {
    match value {
        JPCARD_PIN_DIGITAL_SIGNATURE => Ok(PinType::DigitalSignature),
        JPCARD_PIN_USER_AUTHENTICATION => Ok(PinType::UserAuthentication),
        JPCARD_PIN_CARD_INFO_INPUT_SUPPORT => Ok(PinType::CardInfoInputSupport),
        JPCARD_PIN_INDIVIDUAL_NUMBER => Ok(PinType::IndividualNumber),
        _ => Err(Error::InvalidData(format!("unknown PIN type {}", value))),
    }
}

fn cert_type(value: u8) -> Result<CertType, Error> {
    match value {
        JPCARD_CERT_USER_AUTHENTICATION => Ok(CertType::UserAuthentication),
        JPCARD_CERT_USER_AUTHENTICATION_CA => Ok(CertType::UserAuthenticationCa),
        JPCARD_CERT_DIGITAL_SIGNATURE_CA => Ok(CertType::DigitalSignatureCa),
        _ => Err(Error::InvalidData(format!("unknown certificate type {}", value))),
    }
}

unsafe fn read_str<'a>(s: *const c_char) -> Result<&'a str, Error> {
    match s.is_null() {
        true => Ok(""),
        false => CStr::from_ptr(s)
            .to_str()
            .map_err(|_| Error::InvalidPinFormat),
    }
}

fn into_c_string(s: String) -> Result<*mut c_char, Error> {
    CString::new(s)
        .map(CString::into_raw)
        .map_err(|e| Error::InvalidData(e.to_string()))
}

/// Returns the latest error occurred on this thread before calling this function.
/// If no error occurred, returns null pointer. Free the string with `jpcard_string_free`.
#[no_mangle]
pub extern "C" fn jpcard_last_error() -> *mut c_char {
    LAST_ERROR
        .with(|last| last.borrow().as_ref().map(|e| e.to_string()))
        .and_then(|e| CString::new(e).ok())
        .map_or(null_mut(), CString::into_raw)
}

/// Returns milliseconds to wait before polling the tags again, if the latest error asks to retry.
/// Returns 0 otherwise.
#[no_mangle]
pub extern "C" fn jpcard_last_error_retry_after_ms() -> u64 {
    LAST_ERROR.with(|last| match last.borrow().as_ref() {
        Some(Error::Retry(request)) => request.after.as_millis() as u64,
        _ => 0,
    })
}

/// Creates a new tag from the function pointers.
/// transmit will be called with ctx on transmitting APDU commands into the tag.
/// is_canceled is optional. It is called with ctx before each command, and a true return
/// aborts the session.
/// aid is the hex string of the AID selected on the discovery, or null if the tag is not ISO 7816.
#[no_mangle]
pub unsafe extern "C" fn jpcard_new_tag(
    transmit: TransmitFn,
    is_canceled: Option<IsCanceledFn>,
    ctx: *mut c_void,
    aid: *const c_char,
) -> *mut JpcardTag {
    let aid = match aid.is_null() {
        true => None,
        false => Some(CStr::from_ptr(aid).to_string_lossy().into_owned()),
    };

    Box::into_raw(Box::new(JpcardTag {
        transmit,
        is_canceled,
        ctx,
        aid,
    }))
}

/// Closes the tag.
#[no_mangle]
pub unsafe extern "C" fn jpcard_tag_close(tag: *mut JpcardTag) {
    if !tag.is_null() {
        let _ = Box::from_raw(tag);
    }
}

/// Looks up the remaining tries of the PIN without consuming any of them.
/// Returns -1 on errors.
#[no_mangle]
pub unsafe extern "C" fn jpcard_lookup_remaining_pin(tag: *mut JpcardTag, pin: u8) -> i32 {
    unwrap_or(
        pin_type(pin).and_then(|ty| {
            Reader::default()
                .lookup_remaining_pin(tag.as_mut(), ty)
                .map(i32::from)
        }),
        -1,
    )
}

/// Reads a certificate of the type. No PIN is required.
#[no_mangle]
pub unsafe extern "C" fn jpcard_get_certificate(tag: *mut JpcardTag, ty: u8) -> ByteArray {
    unwrap(cert_type(ty).and_then(|ty| {
        Reader::default()
            .get_certificate_of(tag.as_mut(), ty)
            .map(ByteArray::from)
    }))
}

/// Signs the data using the key-pair for user authentication.
/// The certificate of the key-pair is returned together.
#[no_mangle]
pub unsafe extern "C" fn jpcard_compute_digital_signature(
    tag: *mut JpcardTag,
    pin: *const c_char,
    data: ByteArray,
) -> SignatureBytes {
    unwrap(read_str(pin).and_then(|pin| {
        let data = data.as_slice().unwrap_or_default();

        Reader::default()
            .compute_digital_signature(tag.as_mut(), pin, data)
            .map(|signature| SignatureBytes {
                value: signature.value.into(),
                certificate: signature.certificate.into(),
            })
    }))
}

/// Reads the token info of the JPKI AP.
#[no_mangle]
pub unsafe extern "C" fn jpcard_read_token_info(tag: *mut JpcardTag) -> *mut c_char {
    let result = Reader::default()
        .read_card_info(tag.as_mut(), &[Item::TokenInfo], "")
        .and_then(|data| {
            data.token_info
                .ok_or_else(|| Error::InvalidData("no token info was read".to_owned()))
        });

    unwrap_or(result.and_then(into_c_string), null_mut())
}

/// Reads My Number using the PIN of Card Info Input Support AP.
#[no_mangle]
pub unsafe extern "C" fn jpcard_read_individual_number(
    tag: *mut JpcardTag,
    pin: *const c_char,
) -> *mut c_char {
    let result = read_str(pin).and_then(|pin| {
        Reader::default()
            .read_card_info(tag.as_mut(), &[Item::IndividualNumber], pin)
            .and_then(|data| {
                data.individual_number
                    .ok_or_else(|| Error::InvalidData("no individual number was read".to_owned()))
            })
    });

    unwrap_or(result.and_then(into_c_string), null_mut())
}

/// Frees an array returned by this library.
#[no_mangle]
pub unsafe extern "C" fn jpcard_byte_array_free(array: ByteArray) {
    array.drain();
}

/// Frees the arrays in a signature returned by this library.
#[no_mangle]
pub unsafe extern "C" fn jpcard_signature_free(signature: SignatureBytes) {
    signature.value.drain();
    signature.certificate.drain();
}

/// Frees a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn jpcard_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Host {
        sent: Vec<Vec<u8>>,
        response: Vec<u8>,
        cancel_after: Option<usize>,
    }

    extern "C" fn is_canceled(ctx: *mut c_void) -> bool {
        let host = unsafe { &*(ctx as *mut Host) };

        host.cancel_after.map_or(false, |n| host.sent.len() >= n)
    }

    extern "C" fn transmit(ctx: *mut c_void, command: ByteArray) -> ByteArray {
        let host = unsafe { &mut *(ctx as *mut Host) };
        let command = unsafe { command.as_slice() }.unwrap().to_vec();

        host.response = match command.as_slice() {
            [0x00, 0x20, 0x00, 0x80] => vec![0x63, 0xC3],
            _ => vec![0x90, 0x00],
        };
        host.sent.push(command);

        ByteArray {
            ptr: host.response.as_mut_ptr(),
            len: host.response.len(),
        }
    }

    #[test]
    fn test_lookup_remaining_pin() {
        let mut host = Host::default();
        let aid = CString::new("D392F000260100000001").unwrap();

        unsafe {
            let ctx = &mut host as *mut Host as *mut c_void;
            let tag = jpcard_new_tag(transmit, None, ctx, aid.as_ptr());

            assert_eq!(
                3,
                jpcard_lookup_remaining_pin(tag, JPCARD_PIN_USER_AUTHENTICATION)
            );
            assert!(jpcard_last_error().is_null());

            // Invalidated by the session.
            assert_eq!(
                -1,
                jpcard_lookup_remaining_pin(tag, JPCARD_PIN_USER_AUTHENTICATION)
            );
            assert!(jpcard_last_error_retry_after_ms() > 0);

            jpcard_tag_close(tag);
        }

        assert_eq!(3, host.sent.len());
    }

    #[test]
    fn test_canceled() {
        let mut host = Host {
            cancel_after: Some(1),
            ..Default::default()
        };
        let aid = CString::new("D392F000260100000001").unwrap();

        unsafe {
            let ctx = &mut host as *mut Host as *mut c_void;
            let tag = jpcard_new_tag(transmit, Some(is_canceled), ctx, aid.as_ptr());

            assert!(jpcard_read_token_info(tag).is_null());
            assert_eq!(
                Some(Error::Canceled.to_string()),
                CString::from_raw(jpcard_last_error()).into_string().ok(),
            );

            jpcard_tag_close(tag);
        }

        assert_eq!(1, host.sent.len());
    }

    #[test]
    fn test_null_tag() {
        unsafe {
            assert!(jpcard_read_token_info(null_mut()).is_null());

            let message = jpcard_last_error();
            assert!(!message.is_null());
            jpcard_string_free(message);
        }

        assert_eq!(1000, jpcard_last_error_retry_after_ms());
    }

    #[test]
    fn test_unknown_pin_type() {
        unsafe {
            assert_eq!(-1, jpcard_lookup_remaining_pin(null_mut(), 9));
        }

        assert_eq!(0, jpcard_last_error_retry_after_ms());
    }

    #[test]
    fn test_byte_array() {
        let array = ByteArray::from(vec![0x01, 0x02]);

        unsafe {
            assert_eq!(Some(&[0x01, 0x02][..]), array.as_slice());
            jpcard_byte_array_free(array);
            jpcard_byte_array_free(ByteArray::default());
        }
    }
}
