//! A network abstraction layer for embedded systems
//!
//! This module defines the small capability set every transport handed to the
//! HTTP client must provide: reading into a caller buffer, writing from one,
//! and closing. Opening a connection is the job of a [`Connect`]
//! implementation and wrapping it in TLS the job of a [`Tls`] context; both
//! are supplied by the platform (a Wi-Fi co-processor, an Ethernet driver,
//! `std::net` in tests).
//!
//! Transport error types stay platform specific, but each one reports its
//! portable [`Error`](error::Error) kind through [`NetworkError`], which is
//! how the client tells a "would block" or an out-of-memory condition apart
//! from a hard failure.

#![deny(unsafe_code)]

use core::time::Duration;

/// Common error types for network operations
pub mod error;

/// Protocol-specific client implementations
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, NetworkError, Read, Tls, Write};
}

/// Classifies a platform error into a portable [`error::Error`] kind.
pub trait NetworkError: core::fmt::Debug {
    /// The portable kind of this error.
    fn kind(&self) -> error::Error;
}

impl NetworkError for error::Error {
    fn kind(&self) -> error::Error {
        *self
    }
}

pub trait Read {
    /// Associated error type
    type Error: NetworkError;
    /// Read data from the connection.
    ///
    /// Returns the number of bytes placed in `buf`; `Ok(0)` signals an
    /// orderly close by the peer.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: NetworkError;
    /// Write data to the connection, returning how many bytes were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: NetworkError;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: NetworkError;
    /// Open a connection to `host:port`.
    ///
    /// `timeout` is forwarded to the socket as its connect/read timeout.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self::Connection, Self::Error>;
}

/// A TLS context able to secure an already opened connection.
pub trait Tls<C: Connection> {
    /// The secured connection type
    type Connection: Connection;
    /// Associated error type
    type Error: NetworkError;
    /// Wrap `connection`, verifying the peer as `server_name`
    fn wrap(&mut self, connection: C, server_name: &str) -> Result<Self::Connection, Self::Error>;
}

/// The TLS context of a session that only speaks plain HTTP.
///
/// It has no values, so a session typed with it can never hold one.
#[derive(Debug)]
pub enum NoTls {}

impl<C: Connection> Tls<C> for NoTls {
    type Connection = C;
    type Error = error::Error;

    fn wrap(&mut self, _connection: C, _server_name: &str) -> Result<C, error::Error> {
        match *self {}
    }
}

/// A pooled connection, either plain or secured by a [`Tls`] context.
#[derive(Debug)]
pub enum Transport<P, S> {
    /// A plain TCP connection
    Plain(P),
    /// A TLS-wrapped connection
    Secure(S),
}

impl<P: Connection, S: Connection> Read for Transport<P, S> {
    type Error = error::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            Transport::Plain(c) => c.read(buf).map_err(|e| e.kind()),
            Transport::Secure(c) => c.read(buf).map_err(|e| e.kind()),
        }
    }
}

impl<P: Connection, S: Connection> Write for Transport<P, S> {
    type Error = error::Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self {
            Transport::Plain(c) => c.write(buf).map_err(|e| e.kind()),
            Transport::Secure(c) => c.write(buf).map_err(|e| e.kind()),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self {
            Transport::Plain(c) => Write::flush(c).map_err(|e| e.kind()),
            Transport::Secure(c) => Write::flush(c).map_err(|e| e.kind()),
        }
    }
}

impl<P: Connection, S: Connection> Close for Transport<P, S> {
    type Error = error::Error;

    fn close(self) -> Result<(), Self::Error> {
        match self {
            Transport::Plain(c) => c.close().map_err(|e| e.kind()),
            Transport::Secure(c) => c.close().map_err(|e| e.kind()),
        }
    }
}

impl<P: Connection, S: Connection> Connection for Transport<P, S> {}
