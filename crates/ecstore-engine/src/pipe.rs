//! Bounded byte pipe
//!
//! Single-producer/single-consumer pipe between the caller's write handle and
//! the pipeline thread. The writer blocks once `capacity` bytes are buffered,
//! so the caller's write rate is back-pressured by the pipeline's consumption
//! rate and memory stays bounded.
//!
//! Either side can fail the pipe with an error; the other side observes that
//! same error on its next operation, and keeps observing it. Dropping the
//! writer without `close` is treated as a failure, not as end-of-stream, so
//! an abandoned handle aborts the transaction instead of committing a
//! truncated object.

use ecstore_common::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

struct PipeState {
    buf: VecDeque<u8>,
    capacity: usize,
    write_closed: bool,
    read_closed: bool,
    error: Option<Error>,
}

struct PipeShared {
    state: Mutex<PipeState>,
    readable: Condvar,
    writable: Condvar,
}

/// Create a bounded byte pipe with the given buffer capacity
pub(crate) fn byte_pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    assert!(capacity > 0, "pipe capacity must be positive");
    let shared = Arc::new(PipeShared {
        state: Mutex::new(PipeState {
            buf: VecDeque::new(),
            capacity,
            write_closed: false,
            read_closed: false,
            error: None,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });
    (
        PipeWriter {
            shared: Arc::clone(&shared),
            closed: false,
        },
        PipeReader { shared },
    )
}

/// Caller side of the pipe
pub(crate) struct PipeWriter {
    shared: Arc<PipeShared>,
    closed: bool,
}

impl PipeWriter {
    /// Write the whole buffer, blocking on back-pressure
    pub(crate) fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let mut state = self.shared.state.lock();
            if state.read_closed {
                return Err(state.error.clone().unwrap_or(Error::PipeClosed));
            }
            let space = state.capacity - state.buf.len();
            if space == 0 {
                self.shared.writable.wait(&mut state);
                continue;
            }
            let take = space.min(buf.len());
            state.buf.extend(buf[..take].iter().copied());
            buf = &buf[take..];
            self.shared.readable.notify_one();
        }
        Ok(())
    }

    /// Signal clean end-of-stream to the reader
    pub(crate) fn close(&mut self) {
        self.closed = true;
        let mut state = self.shared.state.lock();
        state.write_closed = true;
        self.shared.readable.notify_one();
    }

    /// The error the read side failed the pipe with, if any
    pub(crate) fn abort_error(&self) -> Option<Error> {
        self.shared.state.lock().error.clone()
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Dropped without close: fail the stream rather than fake an EOF.
        let mut state = self.shared.state.lock();
        state.write_closed = true;
        if state.error.is_none() {
            state.error = Some(Error::PipeClosed);
        }
        self.shared.readable.notify_one();
    }
}

/// Pipeline side of the pipe
pub(crate) struct PipeReader {
    shared: Arc<PipeShared>,
}

impl PipeReader {
    /// Read up to `out.len()` bytes; `Ok(0)` is clean end-of-stream
    pub(crate) fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        loop {
            let mut state = self.shared.state.lock();
            if let Some(err) = &state.error {
                return Err(err.clone());
            }
            if !state.buf.is_empty() {
                let take = out.len().min(state.buf.len());
                for slot in out.iter_mut().take(take) {
                    *slot = state.buf.pop_front().unwrap_or_default();
                }
                self.shared.writable.notify_one();
                return Ok(take);
            }
            if state.write_closed {
                return Ok(0);
            }
            self.shared.readable.wait(&mut state);
        }
    }

    /// Read exactly `out.len()` bytes unless the stream ends first
    ///
    /// Returns the number of bytes read and whether end-of-stream was hit.
    pub(crate) fn read_full(&mut self, out: &mut [u8]) -> Result<(usize, bool)> {
        let mut filled = 0;
        while filled < out.len() {
            match self.read(&mut out[filled..])? {
                0 => return Ok((filled, true)),
                n => filled += n,
            }
        }
        Ok((filled, false))
    }

    /// Fail the pipe; the writer observes `err` on every later operation
    pub(crate) fn fail(&mut self, err: Error) {
        let mut state = self.shared.state.lock();
        state.read_closed = true;
        if state.error.is_none() {
            state.error = Some(err);
        }
        self.shared.readable.notify_one();
        self.shared.writable.notify_one();
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.read_closed = true;
        self.shared.writable.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_transfer_across_threads() {
        let (mut tx, mut rx) = byte_pipe(8);
        let producer = thread::spawn(move || {
            let mut collected = Vec::new();
            let mut buf = [0u8; 5];
            loop {
                let n = rx.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                collected.extend_from_slice(&buf[..n]);
            }
            collected
        });

        // 64 bytes through an 8 byte buffer exercises back-pressure.
        let payload: Vec<u8> = (0..64).collect();
        tx.write_all(&payload).unwrap();
        tx.close();

        assert_eq!(producer.join().unwrap(), payload);
    }

    #[test]
    fn test_read_full_short_at_eof() {
        let (mut tx, mut rx) = byte_pipe(16);
        tx.write_all(b"abc").unwrap();
        tx.close();

        let mut buf = [0u8; 8];
        let (n, eof) = rx.read_full(&mut buf).unwrap();
        assert_eq!((n, eof), (3, true));
        assert_eq!(&buf[..3], b"abc");

        let (n, eof) = rx.read_full(&mut buf).unwrap();
        assert_eq!((n, eof), (0, true));
    }

    #[test]
    fn test_fail_reaches_writer_and_close() {
        let (mut tx, mut rx) = byte_pipe(4);
        rx.fail(Error::WriteQuorum {
            failed: 2,
            quorum: 3,
        });

        let err = tx.write_all(b"data").unwrap_err();
        assert!(matches!(err, Error::WriteQuorum { .. }));

        // The error is replayed, not consumed.
        assert!(matches!(
            tx.abort_error(),
            Some(Error::WriteQuorum { .. })
        ));
    }

    #[test]
    fn test_writer_drop_without_close_fails_reader() {
        let (tx, mut rx) = byte_pipe(4);
        drop(tx);

        let mut buf = [0u8; 4];
        assert!(matches!(rx.read(&mut buf), Err(Error::PipeClosed)));
    }

    #[test]
    fn test_reader_drop_unblocks_writer() {
        let (mut tx, rx) = byte_pipe(2);
        tx.write_all(b"xy").unwrap();

        let unblocker = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            drop(rx);
        });

        // Buffer is full; this blocks until the reader goes away.
        assert!(matches!(tx.write_all(b"z"), Err(Error::PipeClosed)));
        unblocker.join().unwrap();
    }
}
