//! Reusable transports keyed by destination.
//!
//! An entry whose transport is present is free; a busy entry has lent its
//! transport to a live response, which hands it back through
//! [`Owner::release`] once the body is drained.

use super::url::Scheme;
use crate::network::{Connection, NetworkError};
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Key {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

#[derive(Debug)]
struct Entry<T> {
    id: u32,
    key: Key,
    transport: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Pool<T> {
    entries: Vec<Entry<T>>,
    next_id: u32,
}

pub(crate) type SharedPool<T> = Rc<RefCell<Pool<T>>>;

impl<T: Connection> Pool<T> {
    pub(crate) fn shared() -> SharedPool<T> {
        Rc::new(RefCell::new(Self {
            entries: Vec::new(),
            next_id: 0,
        }))
    }

    /// Takes a free transport for `key`, marking its entry busy.
    pub(crate) fn checkout(&mut self, key: &Key) -> Option<(u32, T)> {
        self.entries
            .iter_mut()
            .filter(|e| e.key == *key)
            .find_map(|e| e.transport.take().map(|t| (e.id, t)))
    }

    /// Registers a freshly opened transport as busy.
    pub(crate) fn register(&mut self, key: Key) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Entry {
            id,
            key,
            transport: None,
        });
        id
    }

    /// Returns a drained transport to its entry. A transport whose entry is
    /// gone is closed.
    pub(crate) fn release(&mut self, id: u32, transport: T) {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                trace!("transport {} free", id);
                entry.transport = Some(transport);
            }
            None => close(transport),
        }
    }

    /// Forgets a busy entry; its transport is closed by whoever holds it.
    pub(crate) fn discard(&mut self, id: u32) {
        self.entries.retain(|e| e.id != id);
    }

    /// Closes and forgets every free transport, returning how many there were.
    pub(crate) fn close_free(&mut self) -> usize {
        let mut closed = 0;
        self.entries.retain_mut(|e| match e.transport.take() {
            Some(transport) => {
                close(transport);
                closed += 1;
                false
            }
            None => true,
        });
        closed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn free(&self) -> usize {
        self.entries.iter().filter(|e| e.transport.is_some()).count()
    }
}

/// Closes a transport that will not be used again. Failing to close a socket
/// that is being thrown away is not worth surfacing.
pub(crate) fn close<T: Connection>(transport: T) {
    if let Err(e) = transport.close() {
        warn!("close failed: {:?}", e.kind());
    }
}

/// Where a response's transport goes once the response is done with it.
#[derive(Debug)]
pub(crate) enum Owner<T> {
    /// Back to the session pool entry `id`.
    Pool { pool: Weak<RefCell<Pool<T>>>, id: u32 },
    /// Closed; the response was read from a bare transport.
    Standalone,
}

impl<T: Connection> Owner<T> {
    pub(crate) fn release(&self, transport: T, reusable: bool) {
        match self {
            Owner::Pool { pool, id } => match pool.upgrade() {
                Some(pool) if reusable => pool.borrow_mut().release(*id, transport),
                Some(pool) => {
                    debug!("transport {} not reusable, closing", id);
                    pool.borrow_mut().discard(*id);
                    close(transport);
                }
                None => close(transport),
            },
            Owner::Standalone => close(transport),
        }
    }
}
