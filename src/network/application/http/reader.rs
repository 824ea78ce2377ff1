//! Incremental response reader.
//!
//! Parses the status line and headers straight off the transport, then
//! hands out the body according to its framing: a fixed `Content-Length`,
//! chunked transfer coding, or everything until the peer closes. The
//! transport is given back to its owner exactly once, either when the body
//! is exhausted or when the reader is closed, and never before the body has
//! been drained from it.

use super::buffer::{Delimiter, ReceiveBuffer};
use super::error::Error;
use super::headers::Headers;
use super::pool::Owner;
use crate::network::error::Error as NetError;
use crate::network::{Connection, NetworkError};
use alloc::string::String;

/// Size of the stack buffer used to throw away unread body bytes.
const DRAIN_CHUNK: usize = 32;

/// How the end of the body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Framing {
    /// This many body bytes are left.
    Length(usize),
    /// Chunked coding; `remaining` bytes are left in the current chunk and
    /// `started` is set once the first size line has been read.
    Chunked { remaining: usize, started: bool },
    /// The body ends when the peer closes the connection.
    UntilClose,
    /// Nothing more to read.
    Done,
}

/// Status line of a response.
#[derive(Debug)]
pub(crate) struct Status {
    pub code: u16,
    pub reason: String,
}

#[derive(Debug)]
pub(crate) struct Reader<T: Connection> {
    transport: Option<T>,
    owner: Owner<T>,
    buffer: ReceiveBuffer,
    framing: Framing,
    keep_alive: bool,
    closed: bool,
}

impl<T: Connection> Reader<T> {
    /// Reads the status line and headers from `transport`.
    ///
    /// `bodyless` marks responses that carry no body whatever their headers
    /// say (answers to `HEAD`). On a protocol error the transport is closed
    /// before the error is returned.
    pub(crate) fn start(
        transport: T,
        owner: Owner<T>,
        growth: usize,
        bodyless: bool,
        headers: &mut Headers,
    ) -> Result<(Self, Status), Error> {
        let mut reader = Self {
            transport: Some(transport),
            owner,
            buffer: ReceiveBuffer::new(growth),
            framing: Framing::Done,
            keep_alive: true,
            closed: false,
        };
        match reader.read_head(bodyless, headers) {
            Ok(status) => {
                if reader.framing == Framing::Done {
                    reader.release();
                }
                Ok((reader, status))
            }
            Err(e) => Err(reader.fail(e)),
        }
    }

    fn read_head(&mut self, bodyless: bool, headers: &mut Headers) -> Result<Status, Error> {
        let transport = self.transport.as_mut().ok_or(Error::Closed)?;
        let buffer = &mut self.buffer;

        if buffer.read_to(transport, b" ", None)?.is_empty() {
            return Err(Error::EmptyResponse);
        }
        let code = core::str::from_utf8(buffer.read_to(transport, b" ", None)?)
            .ok()
            .and_then(|code| code.trim().parse::<u16>().ok())
            .ok_or(Error::InvalidStatus)?;
        let reason = String::from_utf8_lossy(buffer.read_to(transport, b"\r\n", None)?).into_owned();

        let fields = parse_headers(buffer, transport, headers)?;
        let bodyless = bodyless || (100..200).contains(&code) || code == 204 || code == 304;
        self.framing = if bodyless {
            Framing::Done
        } else if fields.chunked {
            Framing::Chunked {
                remaining: 0,
                started: false,
            }
        } else {
            match fields.content_length {
                Some(0) => Framing::Done,
                Some(len) => Framing::Length(len),
                None => Framing::UntilClose,
            }
        };
        self.keep_alive = !fields.close && self.framing != Framing::UntilClose;
        debug!("status {}, framing {:?}", code, self.framing);

        Ok(Status { code, reason })
    }

    /// Reads body bytes into `buf`, returning how many were read; `0` means
    /// the body is complete and closes the reader, so later reads fail with
    /// [`Error::Closed`]. Chunked trailers are merged into `headers` when the
    /// last chunk is reached.
    pub(crate) fn read_into(&mut self, buf: &mut [u8], headers: &mut Headers) -> Result<usize, Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        match self.read_body(buf, headers) {
            Ok(read) => {
                if self.framing == Framing::Done {
                    self.release();
                    if read == 0 {
                        self.closed = true;
                    }
                }
                Ok(read)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn read_body(&mut self, buf: &mut [u8], headers: &mut Headers) -> Result<usize, Error> {
        match self.framing {
            Framing::Done => Ok(0),
            Framing::Length(remaining) => {
                let want = remaining.min(buf.len());
                let read = self.fill(&mut buf[..want])?;
                if read == 0 {
                    return Err(Error::Transport(NetError::ConnectionClosed));
                }
                self.framing = match remaining - read {
                    0 => Framing::Done,
                    left => Framing::Length(left),
                };
                Ok(read)
            }
            Framing::Chunked {
                mut remaining,
                started,
            } => {
                if remaining == 0 {
                    if started {
                        self.skip(2)?;
                    }
                    remaining = self.chunk_size()?;
                    if remaining == 0 {
                        let transport = self.transport.as_mut().ok_or(Error::Closed)?;
                        parse_headers(&mut self.buffer, transport, headers)?;
                        self.framing = Framing::Done;
                        return Ok(0);
                    }
                }
                let want = remaining.min(buf.len());
                let read = self.fill(&mut buf[..want])?;
                if read == 0 {
                    return Err(Error::Transport(NetError::ConnectionClosed));
                }
                self.framing = Framing::Chunked {
                    remaining: remaining - read,
                    started: true,
                };
                Ok(read)
            }
            Framing::UntilClose => {
                let read = self.fill(buf)?;
                if read == 0 {
                    self.framing = Framing::Done;
                }
                Ok(read)
            }
        }
    }

    /// Drains whatever is left of the body and gives the transport back.
    ///
    /// A body that only ends when the peer closes cannot be drained; its
    /// transport is closed instead. Closing twice is a no-op.
    pub(crate) fn close(&mut self, headers: &mut Headers) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        if self.framing == Framing::UntilClose {
            self.keep_alive = false;
            self.framing = Framing::Done;
        }
        let mut scratch = [0u8; DRAIN_CHUNK];
        while self.framing != Framing::Done {
            self.read_into(&mut scratch, headers)?;
        }
        self.release();
        self.closed = true;
        Ok(())
    }

    /// Hands out buffered bytes first, then reads the transport directly.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let taken = self.buffer.take(buf);
        if taken > 0 {
            return Ok(taken);
        }
        let transport = self.transport.as_mut().ok_or(Error::Closed)?;
        transport.read(buf).map_err(|e| Error::Transport(e.kind()))
    }

    fn skip(&mut self, mut n: usize) -> Result<(), Error> {
        let mut scratch = [0u8; DRAIN_CHUNK];
        while n > 0 {
            let want = n.min(scratch.len());
            match self.fill(&mut scratch[..want])? {
                0 => return Err(Error::Transport(NetError::ConnectionClosed)),
                read => n -= read,
            }
        }
        Ok(())
    }

    /// Reads a chunk-size line, ignoring chunk extensions.
    fn chunk_size(&mut self) -> Result<usize, Error> {
        let transport = self.transport.as_mut().ok_or(Error::Closed)?;
        let line = self.buffer.read_to(transport, b"\r\n", None)?;
        let size = line.split(|&b| b == b';').next().unwrap_or_default();
        core::str::from_utf8(size)
            .ok()
            .and_then(|size| usize::from_str_radix(size.trim(), 16).ok())
            .ok_or(Error::InvalidChunk)
    }

    fn release(&mut self) {
        if let Some(transport) = self.transport.take() {
            self.owner.release(transport, self.keep_alive);
        }
    }

    /// Tears the exchange down after an error; the transport cannot be
    /// trusted to be in sync any more.
    fn fail(&mut self, e: Error) -> Error {
        warn!("response failed: {:?}", e);
        self.keep_alive = false;
        self.framing = Framing::Done;
        self.closed = true;
        self.release();
        e
    }
}

#[derive(Debug, Default)]
struct Fields {
    content_length: Option<usize>,
    chunked: bool,
    close: bool,
}

/// Reads header lines up to the empty line that ends them.
///
/// Each line is scanned for the name up to `:` or the line end, whichever
/// comes first; a line without a colon is only valid when it is empty.
/// Whitespace around names and values is trimmed.
fn parse_headers<T: Connection>(
    buffer: &mut ReceiveBuffer,
    transport: &mut T,
    headers: &mut Headers,
) -> Result<Fields, Error> {
    let mut fields = Fields::default();
    loop {
        let (name, ended_by) = buffer.read_delimited(transport, b":", Some(b"\r\n"))?;
        match ended_by {
            Delimiter::Stop => {}
            _ if name.is_empty() => return Ok(fields),
            _ => return Err(Error::InvalidHeader),
        }
        let name = String::from_utf8_lossy(name).into_owned();
        let value = String::from_utf8_lossy(buffer.read_to(transport, b"\r\n", None)?);
        let (name, value) = (name.trim(), value.trim());

        if name.eq_ignore_ascii_case("content-length") {
            fields.content_length = Some(value.parse().map_err(|_| Error::InvalidHeader)?);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            fields.chunked = value.eq_ignore_ascii_case("chunked");
        } else if name.eq_ignore_ascii_case("connection") {
            fields.close = value.eq_ignore_ascii_case("close");
        }
        headers.insert(name, value);
    }
}
