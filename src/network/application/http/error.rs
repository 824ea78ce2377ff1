//! Errors raised by the HTTP client.

use crate::network::NetworkError;
use crate::network::error::Error as NetError;
use core::fmt;

/// An error raised while issuing a request or consuming its response.
///
/// Variants group into configuration errors (raised before any I/O),
/// transport failures, protocol violations by the server, accessor misuse
/// and content decoding failures.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The URL scheme is neither `http` nor `https`.
    UnsupportedScheme,
    /// The URL has no host or carries an unparsable port.
    InvalidUrl,
    /// An `https` URL was requested from a session without a TLS context.
    TlsUnavailable,
    /// A transport call failed.
    Transport(NetError),
    /// Both transport attempts failed to produce a live connection.
    OutOfRetries,
    /// The server closed the connection before sending a status line.
    EmptyResponse,
    /// The status code is not a number.
    InvalidStatus,
    /// A header line is malformed or carries an unusable value.
    InvalidHeader,
    /// A chunk-size line is not valid hexadecimal.
    InvalidChunk,
    /// The content was already taken through a different accessor.
    ContentConsumed,
    /// The response was closed, drained, or superseded by a newer one.
    Closed,
    /// The body is gzip encoded; only the raw bytes are available.
    GzipUnsupported,
    /// The body is not valid in the declared charset.
    InvalidText,
    /// The body is not valid JSON for the requested type.
    Json,
    /// The request JSON body could not be serialized.
    JsonEncode,
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Error::Transport(e)
    }
}

/// Lets a response body stand in wherever a transport [`Read`] is expected.
///
/// [`Read`]: crate::network::Read
impl NetworkError for Error {
    fn kind(&self) -> NetError {
        match self {
            Error::Transport(e) => *e,
            Error::Closed => NetError::NotOpen,
            _ => NetError::ProtocolError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedScheme => f.write_str("unsupported protocol"),
            Error::InvalidUrl => f.write_str("invalid url"),
            Error::TlsUnavailable => f.write_str("a TLS context is required for https"),
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::OutOfRetries => f.write_str("repeated socket failures"),
            Error::EmptyResponse => f.write_str("unable to read HTTP response"),
            Error::InvalidStatus => f.write_str("invalid status code"),
            Error::InvalidHeader => f.write_str("invalid header"),
            Error::InvalidChunk => f.write_str("invalid chunk size"),
            Error::ContentConsumed => {
                f.write_str("content already accessed through another accessor")
            }
            Error::Closed => f.write_str("response closed; use responses immediately"),
            Error::GzipUnsupported => {
                f.write_str("content-encoding is gzip; use content to access raw bytes")
            }
            Error::InvalidText => f.write_str("content is not valid text"),
            Error::Json => f.write_str("content is not valid json"),
            Error::JsonEncode => f.write_str("unable to serialize json body"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::UnsupportedScheme => defmt::write!(f, "UnsupportedScheme"),
            Error::InvalidUrl => defmt::write!(f, "InvalidUrl"),
            Error::TlsUnavailable => defmt::write!(f, "TlsUnavailable"),
            Error::Transport(e) => defmt::write!(f, "Transport({})", e),
            Error::OutOfRetries => defmt::write!(f, "OutOfRetries"),
            Error::EmptyResponse => defmt::write!(f, "EmptyResponse"),
            Error::InvalidStatus => defmt::write!(f, "InvalidStatus"),
            Error::InvalidHeader => defmt::write!(f, "InvalidHeader"),
            Error::InvalidChunk => defmt::write!(f, "InvalidChunk"),
            Error::ContentConsumed => defmt::write!(f, "ContentConsumed"),
            Error::Closed => defmt::write!(f, "Closed"),
            Error::GzipUnsupported => defmt::write!(f, "GzipUnsupported"),
            Error::InvalidText => defmt::write!(f, "InvalidText"),
            Error::Json => defmt::write!(f, "Json"),
            Error::JsonEncode => defmt::write!(f, "JsonEncode"),
        }
    }
}
