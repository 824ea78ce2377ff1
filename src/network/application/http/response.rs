//! Responses and their content accessors.
//!
//! A response holds its reader behind a shared handle so the session can
//! force it closed when a newer request supersedes it. The body can be taken
//! once, through exactly one of [`Response::content`], [`Response::text`] or
//! [`Response::json`]; repeated calls to the same accessor return the cached
//! value, while mixing accessors is an error.

use super::buffer::DEFAULT_GROWTH;
use super::error::Error;
use super::headers::Headers;
use super::pool::Owner;
use super::reader::Reader;
use crate::network::{Connection, Read};
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use serde::Deserialize;

/// Read size used when buffering a whole body.
const CONTENT_CHUNK: usize = 32;

#[derive(Debug)]
enum Cached {
    Bytes(Vec<u8>),
    /// Bytes [`Response::text`] could not decode.
    Undecodable(Vec<u8>),
    Text(String),
    Json(Vec<u8>),
}

pub(crate) type ReaderHandle<T> = Weak<RefCell<Reader<T>>>;

/// One HTTP exchange.
///
/// Dropping a response closes it, draining any unread body first so the
/// transport can be reused.
#[derive(Debug)]
pub struct Response<T: Connection> {
    status_code: u16,
    reason: String,
    headers: Headers,
    reader: Rc<RefCell<Reader<T>>>,
    cached: Option<Cached>,
    charset: Option<String>,
}

impl<T: Connection> Response<T> {
    /// Reads a response from a bare transport.
    ///
    /// The transport is closed once the body has been consumed or the
    /// response is closed.
    pub fn new(transport: T) -> Result<Self, Error> {
        Self::start(transport, Owner::Standalone, DEFAULT_GROWTH, false)
    }

    pub(crate) fn start(
        transport: T,
        owner: Owner<T>,
        growth: usize,
        bodyless: bool,
    ) -> Result<Self, Error> {
        let mut headers = Headers::new();
        let (reader, status) = Reader::start(transport, owner, growth, bodyless, &mut headers)?;
        Ok(Self {
            status_code: status.code,
            reason: status.reason,
            headers,
            reader: Rc::new(RefCell::new(reader)),
            cached: None,
            charset: None,
        })
    }

    pub(crate) fn handle(&self) -> ReaderHandle<T> {
        Rc::downgrade(&self.reader)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The response headers.
    ///
    /// Trailers of a chunked body show up here only once the body has been
    /// read to the end.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Overrides the charset [`Response::text`] decodes with.
    pub fn set_charset(&mut self, charset: &str) {
        self.charset = Some(String::from(charset));
    }

    /// Reads body bytes into `buf`; `Ok(0)` means the body is complete and
    /// the response is closed, so later reads and accessors fail with
    /// [`Error::Closed`].
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.reader.borrow_mut().read_into(buf, &mut self.headers)
    }

    /// The whole body as bytes.
    pub fn content(&mut self) -> Result<&[u8], Error> {
        if self.cached.is_none() {
            let body = self.drain()?;
            self.cached = Some(Cached::Bytes(body));
        }
        match &self.cached {
            Some(Cached::Bytes(bytes) | Cached::Undecodable(bytes)) => Ok(bytes),
            _ => Err(Error::ContentConsumed),
        }
    }

    /// The whole body decoded as text.
    ///
    /// The charset comes from [`Response::set_charset`], else the
    /// `Content-Type` header, else UTF-8. If decoding fails the raw bytes
    /// stay available through [`Response::content`] and every later call
    /// fails with [`Error::InvalidText`] again.
    pub fn text(&mut self) -> Result<&str, Error> {
        if self.cached.is_none() {
            self.reject_compressed()?;
            let body = self.drain()?;
            match decode(body, self.charset()) {
                Ok(text) => self.cached = Some(Cached::Text(text)),
                Err(body) => self.cached = Some(Cached::Undecodable(body)),
            }
        }
        match &self.cached {
            Some(Cached::Text(text)) => Ok(text),
            Some(Cached::Undecodable(_)) => Err(Error::InvalidText),
            _ => Err(Error::ContentConsumed),
        }
    }

    /// The whole body parsed as JSON.
    ///
    /// The body bytes are cached, so `D` may borrow strings from them and
    /// later calls parse again without touching the transport.
    pub fn json<'a, D: Deserialize<'a>>(&'a mut self) -> Result<D, Error> {
        if self.cached.is_none() {
            self.reject_compressed()?;
            let body = self.drain()?;
            self.cached = Some(Cached::Json(body));
        }
        match &self.cached {
            Some(Cached::Json(bytes)) => serde_json_core::from_slice(bytes)
                .map(|(value, _)| value)
                .map_err(|_| Error::Json),
            _ => Err(Error::ContentConsumed),
        }
    }

    /// Iterates over the body in pieces of `chunk_size` bytes; only the last
    /// piece may be shorter. Running the iterator to the end releases the
    /// transport and closes the response.
    pub fn iter_content(&mut self, chunk_size: usize) -> Chunks<'_, T> {
        Chunks {
            response: self,
            chunk_size: chunk_size.max(1),
            finished: false,
        }
    }

    /// The body as a transport-like byte stream, for decoders that pull
    /// their input.
    pub fn raw(&mut self) -> Raw<'_, T> {
        Raw { response: self }
    }

    /// Drains the body and releases the transport. Further reads fail with
    /// [`Error::Closed`]; closing again does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        self.reader.borrow_mut().close(&mut self.headers)
    }

    fn drain(&mut self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        let mut chunk = [0u8; CONTENT_CHUNK];
        loop {
            match self.read_into(&mut chunk)? {
                0 => break,
                read => body.extend_from_slice(&chunk[..read]),
            }
        }
        self.close()?;
        Ok(body)
    }

    fn reject_compressed(&self) -> Result<(), Error> {
        match self.headers.get("content-encoding") {
            Some(encoding) if encoding.eq_ignore_ascii_case("gzip") => Err(Error::GzipUnsupported),
            _ => Ok(()),
        }
    }

    fn charset(&self) -> &str {
        if let Some(charset) = &self.charset {
            return charset;
        }
        self.headers
            .get("content-type")
            .and_then(|content_type| {
                content_type.split(';').skip(1).find_map(|param| {
                    let (name, value) = param.split_once('=')?;
                    name.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| value.trim().trim_matches('"'))
                })
            })
            .unwrap_or("utf-8")
    }
}

impl<T: Connection> Drop for Response<T> {
    fn drop(&mut self) {
        if let Ok(mut reader) = self.reader.try_borrow_mut() {
            if let Err(e) = reader.close(&mut self.headers) {
                warn!("closing response failed: {:?}", e);
            }
        }
    }
}

/// Decodes `body`, handing it back untouched when it is not valid in
/// `charset`.
fn decode(body: Vec<u8>, charset: &str) -> Result<String, Vec<u8>> {
    let charset = charset.to_ascii_lowercase();
    match charset.as_str() {
        "iso-8859-1" | "latin1" | "latin-1" => Ok(body.iter().map(|&b| char::from(b)).collect()),
        "us-ascii" | "ascii" if !body.is_ascii() => Err(body),
        "utf-8" | "utf8" | "us-ascii" | "ascii" => {
            String::from_utf8(body).map_err(|e| e.into_bytes())
        }
        _ => {
            warn!("unknown charset, decoding as utf-8");
            String::from_utf8(body).map_err(|e| e.into_bytes())
        }
    }
}

/// Iterator returned by [`Response::iter_content`].
#[derive(Debug)]
pub struct Chunks<'r, T: Connection> {
    response: &'r mut Response<T>,
    chunk_size: usize,
    finished: bool,
}

impl<T: Connection> Iterator for Chunks<'_, T> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.response.cached.is_some() {
            self.finished = true;
            return Some(Err(Error::ContentConsumed));
        }

        let mut chunk = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < chunk.len() {
            match self.response.read_into(&mut chunk[filled..]) {
                Ok(0) => {
                    self.finished = true;
                    break;
                }
                Ok(read) => filled += read,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        if filled == 0 {
            return None;
        }
        chunk.truncate(filled);
        Some(Ok(chunk))
    }
}

/// Streaming view returned by [`Response::raw`].
#[derive(Debug)]
pub struct Raw<'r, T: Connection> {
    response: &'r mut Response<T>,
}

impl<T: Connection> Read for Raw<'_, T> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.response.read_into(buf)
    }
}
