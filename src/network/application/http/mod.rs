//! HTTP/1.x client for memory-constrained devices.
//!
//! Responses are parsed incrementally straight off the transport: only a
//! small receive buffer is held unless the caller asks for the whole body.
//! Transports are pooled per host, port and scheme and verified with a
//! one-byte probe before a response is parsed, so a socket the server has
//! silently dropped is replaced instead of surfacing as a parse error.
//!
//! # Features
//!
//! - `Content-Length`, chunked and read-until-close bodies
//! - Body access as bytes, text, JSON or fixed-size pieces
//! - Connection reuse with drain-before-reuse
//! - Redirect following
//! - A cooperative [`AsyncSession`] whose sends yield on would-block
//!
//! # Usage
//!
//! A [`Session`] works with any [`Connect`](crate::network::Connect)
//! implementation supplied by the platform.
//!
//! ```rust,no_run
//! use librequests::network::application::http::{Config, Session};
//! # use core::time::Duration;
//! # use librequests::network::error::Error;
//! # use librequests::network::{Close, Connect, Connection, Read, Write};
//! # struct Socket;
//! # impl Connection for Socket {}
//! # impl Read for Socket {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Ok(0) }
//! # }
//! # impl Write for Socket {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Close for Socket {
//! #     type Error = Error;
//! #     fn close(self) -> Result<(), Error> { Ok(()) }
//! # }
//! # struct Radio;
//! # impl Connect for Radio {
//! #     type Connection = Socket;
//! #     type Error = Error;
//! #     fn connect(&mut self, _: &str, _: u16, _: Option<Duration>) -> Result<Socket, Error> {
//! #         Ok(Socket)
//! #     }
//! # }
//!
//! let mut session = Session::new(Radio, Config::default());
//! let mut response = session.get("http://example.com/status")?;
//! if response.status_code() == 200 {
//!     let _status = response.text()?;
//! }
//! # Ok::<(), librequests::network::application::http::Error>(())
//! ```

#[cfg(feature = "async")]
mod async_session;
mod buffer;
mod error;
mod headers;
mod pool;
mod reader;
mod redirect;
mod request;
mod response;
mod session;
mod url;

#[cfg(feature = "async")]
pub use async_session::AsyncSession;
pub use buffer::DEFAULT_GROWTH;
pub use error::Error;
pub use headers::Headers;
pub use redirect::resolve;
pub use request::{Body, Header, MAX_HEADERS, Method, Request};
pub use response::{Chunks, Raw, Response};
pub use session::{Config, Session, SessionResponse, SessionTransport};
pub use url::{Scheme, Url};
