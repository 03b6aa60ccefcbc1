//! Unified error type and the process-wide last-error register.
//!
//! The original C implementation threads failures through scalar return
//! codes and a single mutable global holding the last error message. We keep
//! that behavior - the origin of an error sets the message, callers never
//! stomp it on the way up - but realize it as a closed [`Error`] enum
//! propagated with `?`, plus a [`LastError`] register that is a `Mutex`
//! rather than an unsynchronized global.

use std::io;
use std::sync::Mutex;

use snafu::Snafu;

/// The crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("unknown function {name:?}"))]
    UnknownFunction { name: String },

    #[snafu(display("not enough parameters"))]
    NotEnoughParameters,

    #[snafu(display("unexpected argc value in reqlist"))]
    BadReqlistArity,

    #[snafu(display("unexpected error with reqlist"))]
    MalformedReqlist,

    #[snafu(display("{function} requires {expected}"))]
    InvalidArgument { function: &'static str, expected: &'static str },

    #[snafu(display("host-path must be set for file-resource {title:?}"))]
    MissingHostPath { title: String },

    #[snafu(display("can't open path {path:?} in file-resource {title:?}: {source}"))]
    CantOpenResourcePath { title: String, path: String, source: io::Error },

    #[snafu(display("can't find uboot-environment reference {name:?}"))]
    MissingUbootEnvironment { name: String },

    #[snafu(display("file-resource {title:?} is {actual} bytes, expected at most {limit} bytes"))]
    SizeAssertionExceeded { title: String, actual: u64, limit: u64 },

    #[snafu(display("file-resource {title:?} is {actual} bytes, expected at least {limit} bytes"))]
    SizeAssertionUnmet { title: String, actual: u64, limit: u64 },

    #[snafu(display("short write: wrote {wrote} of {expected} bytes"))]
    ShortWrite { wrote: usize, expected: usize },

    #[snafu(display("failed to allocate the bounce buffer"))]
    OutOfMemory,

    #[snafu(display("corrupt u-boot environment: crc mismatch"))]
    UbootEnvCrcMismatch,

    #[snafu(display("i/o error: {source}"))]
    Io { source: io::Error },

    #[snafu(display("malformed meta-config: {source}"))]
    ConfigParse { source: serde_json::Error },

    #[snafu(display("archive error: {source}"))]
    Archive { source: zip::result::ZipError },

    #[snafu(display("signing key rejected: {source}"))]
    BadSigningKey { source: ed25519_dalek::SignatureError },

    #[snafu(display("signature entry is not a 64-byte ed25519 signature"))]
    MalformedSignature,
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(source: zip::result::ZipError) -> Self {
        Error::Archive { source }
    }
}

/// Process-wide "last error" register, mirroring the C original's global
/// error string without reintroducing unsynchronized global state.
static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Records `message` as the most recent error, overwriting whatever was
/// there before.
pub fn set_last_error(message: impl Into<String>) {
    let mut slot = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    *slot = Some(message.into());
}

/// Returns the most recently recorded error message, if any.
pub fn last_error() -> Option<String> {
    LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Records `err`'s display string as the last error and returns it unchanged,
/// so call sites can write `foo().map_err(record)?`.
pub fn record(err: Error) -> Error {
    set_last_error(err.to_string());
    err
}
