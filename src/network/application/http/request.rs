//! Request model and wire serialization.

use super::error::Error;
use super::url::Url;
use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;
use base64ct::{Base64, Encoding};
use core::fmt::Write;
use core::time::Duration;
use heapless::String;
use serde::Serialize;

/// Most headers a single request may carry.
pub const MAX_HEADERS: usize = 16;
const MAX_HEADER_NAME_LEN: usize = 64;
const MAX_HEADER_VALUE_LEN: usize = 256;

/// Credentials longer than this do not fit a header value once encoded.
const MAX_CREDENTIALS_LEN: usize = (MAX_HEADER_VALUE_LEN - 6) / 4 * 3;

const JSON_INITIAL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String<MAX_HEADER_NAME_LEN>,
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

impl Header {
    /// Builds a header, failing if either part exceeds its fixed capacity.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            name: String::try_from(name).map_err(|_| Error::InvalidHeader)?,
            value: String::try_from(value).map_err(|_| Error::InvalidHeader)?,
        })
    }

    /// An `Authorization: Basic` header for `user` and `password`.
    pub fn basic_auth(user: &str, password: &str) -> Result<Self, Error> {
        let mut credentials: heapless::Vec<u8, MAX_CREDENTIALS_LEN> = heapless::Vec::new();
        credentials
            .extend_from_slice(user.as_bytes())
            .map_err(|()| Error::InvalidHeader)?;
        credentials.push(b':').map_err(|_| Error::InvalidHeader)?;
        credentials
            .extend_from_slice(password.as_bytes())
            .map_err(|()| Error::InvalidHeader)?;

        let mut encoded = [0u8; MAX_HEADER_VALUE_LEN];
        let encoded =
            Base64::encode(&credentials, &mut encoded).map_err(|_| Error::InvalidHeader)?;

        let mut value: String<MAX_HEADER_VALUE_LEN> = String::new();
        value.push_str("Basic ").map_err(|()| Error::InvalidHeader)?;
        value.push_str(encoded).map_err(|()| Error::InvalidHeader)?;
        Ok(Self {
            name: String::try_from("Authorization").map_err(|_| Error::InvalidHeader)?,
            value,
        })
    }
}

/// A request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Body<'a> {
    /// No body and no `Content-Length`.
    #[default]
    Empty,
    Bytes(&'a [u8]),
    Text(&'a str),
    /// Sent as `k=v&k2=v2` with a form content type. Pairs are not escaped.
    Form(&'a [(&'a str, &'a str)]),
    /// Serialized JSON, sent with a JSON content type. See [`Body::json`].
    Json(Vec<u8>),
}

impl Body<'_> {
    /// Serializes `value` into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Body<'static>, Error> {
        let mut buf = vec![0u8; JSON_INITIAL_CAPACITY];
        loop {
            match serde_json_core::to_slice(value, &mut buf) {
                Ok(len) => {
                    buf.truncate(len);
                    return Ok(Body::Json(buf));
                }
                Err(serde_json_core::ser::Error::BufferFull) => {
                    let grown = buf.len() * 2;
                    buf.resize(grown, 0);
                }
                Err(_) => return Err(Error::JsonEncode),
            }
        }
    }

    fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Form(_) => Some("application/x-www-form-urlencoded"),
            Body::Json(_) => Some("application/json"),
            _ => None,
        }
    }

    fn bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Body::Empty => None,
            Body::Bytes(bytes) => Some(Cow::Borrowed(bytes)),
            Body::Text(text) => Some(Cow::Borrowed(text.as_bytes())),
            Body::Json(json) => Some(Cow::Borrowed(json)),
            Body::Form(pairs) => {
                let mut form = Vec::new();
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        form.push(b'&');
                    }
                    form.extend_from_slice(key.as_bytes());
                    form.push(b'=');
                    form.extend_from_slice(value.as_bytes());
                }
                Some(Cow::Owned(form))
            }
        }
    }
}

/// An HTTP request issued through a session.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: heapless::Vec<Header, MAX_HEADERS>,
    pub body: Body<'a>,
    /// Overrides the session timeout for connections opened by this request.
    pub timeout: Option<Duration>,
    /// Follow `3xx` responses carrying a `location` header.
    pub allow_redirects: bool,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            headers: heapless::Vec::new(),
            body: Body::Empty,
            timeout: None,
            allow_redirects: true,
        }
    }

    /// Adds a header, failing when it does not fit.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        self.headers
            .push(Header::new(name, value)?)
            .map_err(|_| Error::InvalidHeader)?;
        Ok(self)
    }

    pub fn body(mut self, body: Body<'a>) -> Self {
        self.body = body;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = allow;
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.name.eq_ignore_ascii_case(name))
    }
}

/// A serialized request: the head and the body bytes to follow it.
pub(crate) struct Encoded<'r> {
    pub head: Vec<u8>,
    pub body: Option<Cow<'r, [u8]>>,
}

impl Encoded<'_> {
    /// The byte runs to write, in order.
    pub(crate) fn parts(&self) -> impl Iterator<Item = &[u8]> {
        core::iter::once(self.head.as_slice()).chain(self.body.as_deref())
    }
}

/// Serializes the request line and headers for `url`.
///
/// `Host` and `User-Agent` are added unless the caller supplied them; the
/// body's content type likewise yields to a caller `Content-Type`.
pub(crate) fn encode<'r>(
    request: &'r Request<'_>,
    url: &Url,
    user_agent: &str,
) -> Result<Encoded<'r>, Error> {
    let mut head = Vec::new();
    let mut line = |parts: &[&[u8]]| {
        for part in parts {
            head.extend_from_slice(part);
        }
        head.extend_from_slice(b"\r\n");
    };

    line(&[
        request.method.as_str().as_bytes(),
        b" ",
        url.path.as_bytes(),
        b" HTTP/1.1",
    ]);
    if !request.has_header("Host") {
        line(&[b"Host: ", url.authority().as_bytes()]);
    }
    if !request.has_header("User-Agent") {
        line(&[b"User-Agent: ", user_agent.as_bytes()]);
    }
    for header in &request.headers {
        line(&[header.name.as_bytes(), b": ", header.value.as_bytes()]);
    }

    let body = request.body.bytes();
    if let Some(content_type) = request.body.content_type() {
        if !request.has_header("Content-Type") {
            line(&[b"Content-Type: ", content_type.as_bytes()]);
        }
    }
    if let Some(body) = &body {
        let mut len: String<20> = String::new();
        write!(len, "{}", body.len()).map_err(|_| Error::InvalidHeader)?;
        line(&[b"Content-Length: ", len.as_bytes()]);
    }
    line(&[]);

    Ok(Encoded { head, body })
}
