//! Sessions: transport reuse, liveness probing and redirects.

use super::buffer::DEFAULT_GROWTH;
use super::error::Error;
use super::pool::{self, Key, Owner, Pool, SharedPool};
use super::redirect;
use super::request::{Body, Encoded, Method, Request, encode};
use super::response::{ReaderHandle, Response};
use super::url::{Scheme, Url};
use crate::network::error::Error as NetError;
use crate::network::{Connect, NetworkError, NoTls, Read, Tls, Transport, Write};
use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;
use core::time::Duration;

/// Transport attempts per request before giving up.
pub(crate) const ATTEMPTS: usize = 2;

/// The transport type pooled by a session over connector `C` and TLS
/// context `S`.
pub type SessionTransport<C, S> =
    Transport<<C as Connect>::Connection, <S as Tls<<C as Connect>::Connection>>::Connection>;

/// A response obtained through a session.
pub type SessionResponse<C, S> = Response<SessionTransport<C, S>>;

/// Session settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sent as `User-Agent` unless the request carries its own.
    pub user_agent: String,
    /// Receive buffer size, and the step it grows by when a header line
    /// does not fit.
    pub buffer_growth: usize,
    /// Handed to the connector for new transports. Enforcing it is up to
    /// the transport.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: String::from("librequests"),
            buffer_growth: DEFAULT_GROWTH,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// State shared by the blocking and the cooperative session.
pub(crate) struct Inner<C: Connect, S: Tls<C::Connection>> {
    connector: C,
    tls: Option<S>,
    pub(crate) config: Config,
    pool: SharedPool<SessionTransport<C, S>>,
    last: Option<ReaderHandle<SessionTransport<C, S>>>,
}

impl<C: Connect, S: Tls<C::Connection>> fmt::Debug for Inner<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("transports", &self.pool.try_borrow().map(|pool| pool.len()).ok())
            .finish_non_exhaustive()
    }
}

impl<C: Connect, S: Tls<C::Connection>> Inner<C, S> {
    pub(crate) fn new(connector: C, tls: Option<S>, config: Config) -> Self {
        Self {
            connector,
            tls,
            config,
            pool: Pool::shared(),
            last: None,
        }
    }

    /// Parses `url` and checks it can be served, before any I/O.
    pub(crate) fn target(&self, url: &str) -> Result<Url, Error> {
        let url = Url::parse(url)?;
        if url.scheme == Scheme::Https && self.tls.is_none() {
            return Err(Error::TlsUnavailable);
        }
        Ok(url)
    }

    /// Force-closes the previous response if the caller left it open.
    pub(crate) fn supersede(&mut self) {
        let Some(reader) = self.last.take().and_then(|last| last.upgrade()) else {
            return;
        };
        let Ok(mut reader) = reader.try_borrow_mut() else {
            return;
        };
        debug!("closing superseded response");
        if let Err(e) = reader.close(&mut Default::default()) {
            warn!("draining superseded response failed: {:?}", e);
        }
    }

    /// Takes a free pooled transport for `url` or opens a new one.
    pub(crate) fn acquire(
        &mut self,
        url: &Url,
        timeout: Option<Duration>,
    ) -> Result<(u32, SessionTransport<C, S>), Error> {
        let key = Key {
            host: url.host.clone(),
            port: url.port,
            scheme: url.scheme,
        };
        if let Some((id, transport)) = self.pool.borrow_mut().checkout(&key) {
            trace!("reusing transport {}", id);
            return Ok((id, transport));
        }

        let timeout = timeout.or(self.config.timeout);
        let connection = match self.connector.connect(&url.host, url.port, timeout) {
            Ok(connection) => connection,
            Err(e) if e.kind() == NetError::OutOfMemory => {
                let reclaimed = self.pool.borrow_mut().close_free();
                if reclaimed == 0 {
                    return Err(Error::Transport(NetError::OutOfMemory));
                }
                debug!("out of memory, closed {} idle transports", reclaimed);
                self.connector
                    .connect(&url.host, url.port, timeout)
                    .map_err(|e| Error::Transport(e.kind()))?
            }
            Err(e) => return Err(Error::Transport(e.kind())),
        };

        let transport = match url.scheme {
            Scheme::Http => Transport::Plain(connection),
            Scheme::Https => {
                let tls = self.tls.as_mut().ok_or(Error::TlsUnavailable)?;
                let secured = tls
                    .wrap(connection, &url.host)
                    .map_err(|e| Error::Transport(e.kind()))?;
                Transport::Secure(secured)
            }
        };
        let id = self.pool.borrow_mut().register(key);
        debug!("opened transport {}", id);
        Ok((id, transport))
    }

    /// Drops a transport that failed mid-request.
    pub(crate) fn retire(&mut self, id: u32, transport: SessionTransport<C, S>) {
        self.pool.borrow_mut().discard(id);
        pool::close(transport);
    }

    /// Starts reading the response on a transport that passed the probe.
    pub(crate) fn respond(
        &mut self,
        id: u32,
        transport: SessionTransport<C, S>,
        method: Method,
    ) -> Result<SessionResponse<C, S>, Error> {
        let owner = Owner::Pool {
            pool: Rc::downgrade(&self.pool),
            id,
        };
        Response::start(
            transport,
            owner,
            self.config.buffer_growth,
            method == Method::Head,
        )
    }

    /// Records `response` as the one to supersede on the next request.
    pub(crate) fn remember(&mut self, response: &SessionResponse<C, S>) {
        self.last = Some(response.handle());
    }

    /// Where `response` redirects to, if it does and `request` follows
    /// redirects.
    pub(crate) fn redirect_target(
        &self,
        request: &Request<'_>,
        url: &Url,
        response: &SessionResponse<C, S>,
    ) -> Option<String> {
        if !request.allow_redirects || !redirect::is_redirect(response.status_code()) {
            return None;
        }
        let location = response.headers().get("location")?;
        let target = redirect::resolve(url, location);
        debug!("redirected to {}", target.as_str());
        Some(target)
    }

    pub(crate) fn open_transports(&self) -> usize {
        self.pool.borrow().len()
    }

    pub(crate) fn close_idle(&mut self) -> usize {
        self.pool.borrow_mut().close_free()
    }
}

/// Checks that the server started answering: the first byte of a status
/// line is always `H`. A stale pooled socket typically yields end of stream
/// or an error here instead.
pub(crate) fn probe<T: Read>(transport: &mut T) -> Result<(), Error> {
    let mut first = [0u8; 1];
    match transport.read(&mut first) {
        Ok(1) if first[0] == b'H' => Ok(()),
        Ok(_) => Err(Error::EmptyResponse),
        Err(e) => Err(Error::Transport(e.kind())),
    }
}

/// Sends the request head and body, spinning while the transport would
/// block.
fn send<T: Write>(transport: &mut T, encoded: &Encoded<'_>) -> Result<(), Error> {
    for mut buf in encoded.parts() {
        while !buf.is_empty() {
            match transport.write(buf) {
                Ok(0) => return Err(Error::Transport(NetError::WriteError)),
                Ok(written) => buf = &buf[written..],
                Err(e) if e.kind() == NetError::WouldBlock => {}
                Err(e) => return Err(Error::Transport(e.kind())),
            }
        }
    }
    transport.flush().map_err(|e| Error::Transport(e.kind()))
}

/// A blocking HTTP session.
///
/// Transports are pooled per host, port and scheme and reused across
/// requests. At most one response is live at a time: issuing a request
/// closes the previous response, draining whatever the caller left unread.
pub struct Session<C: Connect, S: Tls<C::Connection> = NoTls> {
    inner: Inner<C, S>,
}

impl<C: Connect, S: Tls<C::Connection>> fmt::Debug for Session<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<C: Connect> Session<C, NoTls> {
    /// A session for plain `http` URLs only.
    pub fn new(connector: C, config: Config) -> Self {
        Self {
            inner: Inner::new(connector, None, config),
        }
    }
}

impl<C: Connect, S: Tls<C::Connection>> Session<C, S> {
    /// A session that secures `https` transports with `tls`.
    pub fn with_tls(connector: C, tls: S, config: Config) -> Self {
        Self {
            inner: Inner::new(connector, Some(tls), config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Issues `request`, following redirects unless it opts out.
    pub fn request(&mut self, request: &Request<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.send_to(request, request.url)
    }

    fn send_to(&mut self, request: &Request<'_>, url: &str) -> Result<SessionResponse<C, S>, Error> {
        let url = self.inner.target(url)?;
        self.inner.supersede();
        let encoded = encode(request, &url, &self.inner.config.user_agent)?;

        for attempt in 1..=ATTEMPTS {
            let (id, mut transport) = self.inner.acquire(&url, request.timeout)?;
            let sent = send(&mut transport, &encoded).and_then(|()| probe(&mut transport));
            if let Err(e) = sent {
                warn!("attempt {} on transport {} failed: {:?}", attempt, id, e);
                self.inner.retire(id, transport);
                continue;
            }

            let response = self.inner.respond(id, transport, request.method)?;
            self.inner.remember(&response);
            if let Some(target) = self.inner.redirect_target(request, &url, &response) {
                return self.send_to(request, &target);
            }
            return Ok(response);
        }
        Err(Error::OutOfRetries)
    }

    pub fn get(&mut self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Get, url))
    }

    pub fn head(&mut self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Head, url))
    }

    pub fn post(&mut self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Post, url).body(body))
    }

    pub fn put(&mut self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Put, url).body(body))
    }

    pub fn patch(&mut self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Patch, url).body(body))
    }

    pub fn delete(&mut self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Delete, url))
    }

    /// Transports currently tracked by the pool, busy or free.
    pub fn open_transports(&self) -> usize {
        self.inner.open_transports()
    }

    /// Closes every idle pooled transport, returning how many were closed.
    pub fn close_idle(&mut self) -> usize {
        self.inner.close_idle()
    }
}
