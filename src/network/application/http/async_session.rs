//! Cooperative session.
//!
//! Sending yields to the executor whenever the transport reports that it
//! would block, so several requests can be in flight on one session and
//! complete in whatever order their transports become writable. That is the
//! only suspension point: the liveness probe and every response read still
//! block the task.

use super::error::Error;
use super::request::{Body, Encoded, Method, Request, encode};
use super::session::{Config, Inner, SessionResponse, probe};
use crate::network::error::Error as NetError;
use crate::network::{Connect, NetworkError, NoTls, Tls, Write};
use alloc::boxed::Box;
use core::cell::RefCell;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

/// Returns `Pending` once, asking to be polled again right away.
#[derive(Debug, Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

async fn send<T: Write>(transport: &mut T, encoded: &Encoded<'_>) -> Result<(), Error> {
    for mut buf in encoded.parts() {
        while !buf.is_empty() {
            match transport.write(buf) {
                Ok(0) => return Err(Error::Transport(NetError::WriteError)),
                Ok(written) => buf = &buf[written..],
                Err(e) if e.kind() == NetError::WouldBlock => YieldNow::default().await,
                Err(e) => return Err(Error::Transport(e.kind())),
            }
        }
    }
    transport.flush().map_err(|e| Error::Transport(e.kind()))
}

/// A session whose requests may overlap.
///
/// Methods take `&self`, so requests can be issued from several futures
/// joined on one single-threaded executor. Each in-flight request holds its
/// own transport; a second request to a host whose pooled transport is busy
/// opens another one.
pub struct AsyncSession<C: Connect, S: Tls<C::Connection> = NoTls> {
    inner: RefCell<Inner<C, S>>,
}

impl<C: Connect, S: Tls<C::Connection>> fmt::Debug for AsyncSession<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => fmt::Debug::fmt(&*inner, f),
            Err(_) => f.write_str("AsyncSession { .. }"),
        }
    }
}

impl<C: Connect> AsyncSession<C, NoTls> {
    /// A session for plain `http` URLs only.
    pub fn new(connector: C, config: Config) -> Self {
        Self {
            inner: RefCell::new(Inner::new(connector, None, config)),
        }
    }
}

impl<C: Connect, S: Tls<C::Connection>> AsyncSession<C, S> {
    /// A session that secures `https` transports with `tls`.
    pub fn with_tls(connector: C, tls: S, config: Config) -> Self {
        Self {
            inner: RefCell::new(Inner::new(connector, Some(tls), config)),
        }
    }

    /// Issues `request`, following redirects unless it opts out.
    pub async fn request(&self, request: &Request<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.send_to(request, request.url).await
    }

    async fn send_to(
        &self,
        request: &Request<'_>,
        url: &str,
    ) -> Result<SessionResponse<C, S>, Error> {
        let (url, encoded) = {
            let mut inner = self.inner.borrow_mut();
            let url = inner.target(url)?;
            inner.supersede();
            let encoded = encode(request, &url, &inner.config.user_agent)?;
            (url, encoded)
        };

        for attempt in 1..=super::session::ATTEMPTS {
            let (id, mut transport) = self.inner.borrow_mut().acquire(&url, request.timeout)?;
            let sent = match send(&mut transport, &encoded).await {
                Ok(()) => probe(&mut transport),
                Err(e) => Err(e),
            };
            let mut inner = self.inner.borrow_mut();
            if let Err(e) = sent {
                warn!("attempt {} on transport {} failed: {:?}", attempt, id, e);
                inner.retire(id, transport);
                continue;
            }

            let response = inner.respond(id, transport, request.method)?;
            inner.remember(&response);
            let target = inner.redirect_target(request, &url, &response);
            drop(inner);
            if let Some(target) = target {
                return Box::pin(self.send_to(request, &target)).await;
            }
            return Ok(response);
        }
        Err(Error::OutOfRetries)
    }

    pub async fn get(&self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Get, url)).await
    }

    pub async fn head(&self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Head, url)).await
    }

    pub async fn post(&self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Post, url).body(body)).await
    }

    pub async fn put(&self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Put, url).body(body)).await
    }

    pub async fn patch(&self, url: &str, body: Body<'_>) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Patch, url).body(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<SessionResponse<C, S>, Error> {
        self.request(&Request::new(Method::Delete, url)).await
    }

    /// Transports currently tracked by the pool, busy or free.
    pub fn open_transports(&self) -> usize {
        self.inner.borrow().open_transports()
    }

    /// Closes every idle pooled transport, returning how many were closed.
    pub fn close_idle(&self) -> usize {
        self.inner.borrow_mut().close_idle()
    }
}
