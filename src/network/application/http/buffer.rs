//! Receive buffer with delimiter scanning.
//!
//! The buffer holds bytes read from the transport that have not been handed
//! out yet (`start..end`) followed by free space (`end..capacity`). It only
//! grows, in fixed increments, when a scan fills it without finding the
//! delimiter.

use super::error::Error;
use crate::network::{NetworkError, Read};
use alloc::vec;
use alloc::vec::Vec;

/// Default growth step, also the initial capacity.
pub const DEFAULT_GROWTH: usize = 32;

/// Longest delimiter [`ReceiveBuffer::read_to`] accepts.
const MAX_DELIMITER: usize = 2;

/// What ended a [`ReceiveBuffer::read_delimited`] scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    Stop,
    Alt,
    /// The transport reached end of stream first.
    End,
}

enum Scan {
    /// A delimiter starts at the given index.
    Found(usize, Delimiter),
    /// No delimiter before this index; scanning resumes here after a fill.
    Pending(usize),
}

enum Prefix {
    Full,
    Partial,
    None,
}

fn match_at(haystack: &[u8], pattern: &[u8]) -> Prefix {
    if haystack.len() >= pattern.len() {
        if haystack.starts_with(pattern) {
            Prefix::Full
        } else {
            Prefix::None
        }
    } else if pattern.starts_with(haystack) {
        Prefix::Partial
    } else {
        Prefix::None
    }
}

#[derive(Debug)]
pub(crate) struct ReceiveBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
    growth: usize,
}

impl ReceiveBuffer {
    pub(crate) fn new(growth: usize) -> Self {
        let growth = growth.max(MAX_DELIMITER);
        Self {
            buf: vec![0; growth],
            start: 0,
            end: 0,
            growth,
        }
    }

    /// Bytes received but not yet handed out.
    pub(crate) fn buffered(&self) -> usize {
        self.end - self.start
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns everything before the first `stop` or `alt`, whichever starts
    /// first, and consumes the delimiter. When both start at the same index
    /// `alt` wins. See [`ReceiveBuffer::read_delimited`] to learn which one
    /// matched.
    ///
    /// A delimiter split across two fills is found because scanning resumes
    /// at the first partial match rather than at the end of the previous
    /// fill. If the transport reports end of stream first, the bytes
    /// accumulated so far are returned, possibly none.
    ///
    /// # Panics
    ///
    /// Panics if a delimiter is empty or longer than two bytes.
    pub(crate) fn read_to<R: Read>(
        &mut self,
        src: &mut R,
        stop: &[u8],
        alt: Option<&[u8]>,
    ) -> Result<&[u8], Error> {
        self.read_delimited(src, stop, alt).map(|(bytes, _)| bytes)
    }

    /// Like [`ReceiveBuffer::read_to`], also telling which delimiter ended
    /// the bytes.
    pub(crate) fn read_delimited<R: Read>(
        &mut self,
        src: &mut R,
        stop: &[u8],
        alt: Option<&[u8]>,
    ) -> Result<(&[u8], Delimiter), Error> {
        assert!(
            (1..=MAX_DELIMITER).contains(&stop.len())
                && alt.is_none_or(|a| (1..=MAX_DELIMITER).contains(&a.len())),
            "delimiters must be one or two bytes"
        );

        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }

        let mut from = self.start;
        loop {
            match self.scan(from, stop, alt, false) {
                Scan::Found(at, found) => return Ok(self.split_at(at, found, stop, alt)),
                Scan::Pending(resume) => from = resume,
            }

            if self.end == self.buf.len() {
                let shift = self.start;
                self.make_room();
                from -= shift;
            }

            let read = src
                .read(&mut self.buf[self.end..])
                .map_err(|e| Error::Transport(e.kind()))?;
            if read == 0 {
                if let Scan::Found(at, found) = self.scan(from, stop, alt, true) {
                    return Ok(self.split_at(at, found, stop, alt));
                }
                let rest = self.start..self.end;
                self.start = self.end;
                return Ok((&self.buf[rest], Delimiter::End));
            }
            self.end += read;
        }
    }

    /// Copies buffered bytes into `out`, returning how many were copied.
    pub(crate) fn take(&mut self, out: &mut [u8]) -> usize {
        let n = self.buffered().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        n
    }

    fn scan(&self, from: usize, stop: &[u8], alt: Option<&[u8]>, eof: bool) -> Scan {
        for at in from..self.end {
            let rest = &self.buf[at..self.end];
            let patterns = alt
                .map(|alt| (alt, Delimiter::Alt))
                .into_iter()
                .chain(Some((stop, Delimiter::Stop)));
            for (pattern, which) in patterns {
                match match_at(rest, pattern) {
                    Prefix::Full => return Scan::Found(at, which),
                    // The rest of this delimiter may arrive with the next fill.
                    Prefix::Partial if !eof => return Scan::Pending(at),
                    _ => {}
                }
            }
        }
        Scan::Pending(self.end)
    }

    fn split_at(
        &mut self,
        at: usize,
        which: Delimiter,
        stop: &[u8],
        alt: Option<&[u8]>,
    ) -> (&[u8], Delimiter) {
        let len = match (which, alt) {
            (Delimiter::Alt, Some(alt)) => alt.len(),
            _ => stop.len(),
        };
        let found = self.start..at;
        self.start = at + len;
        (&self.buf[found], which)
    }

    /// Moves pending bytes to the front, growing the buffer when that frees
    /// nothing.
    fn make_room(&mut self) {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        } else {
            let grown = self.buf.len() + self.growth;
            self.buf.resize(grown, 0);
        }
    }
}
