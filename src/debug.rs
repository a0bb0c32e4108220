//! Audio-thread logging for the tone mixer.
//!
//! `sf_log!` formats into a fixed-size slot of a preallocated ring, so it is
//! safe (with caution) inside `process()`. A control thread calls
//! `logger::drain_to_log()` to forward queued lines to the `log` facade.
//! Without the `debug` feature the macro compiles to nothing.

use std::fmt;

#[cfg(feature = "debug")]
pub mod logger {
    use once_cell::sync::OnceCell;
    use std::cell::UnsafeCell;
    use std::fmt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const LOG_CAP: usize = 256;
    const LOG_MSG_MAX: usize = 256;

    #[derive(Copy, Clone)]
    struct LogEntry {
        len: u16,
        bytes: [u8; LOG_MSG_MAX],
    }

    impl Default for LogEntry {
        fn default() -> Self {
            Self {
                len: 0,
                bytes: [0; LOG_MSG_MAX],
            }
        }
    }

    /// Single-producer single-consumer ring of log lines.
    struct LogRing {
        head: AtomicUsize,
        tail: AtomicUsize,
        buf: Box<[UnsafeCell<LogEntry>]>,
    }

    // Slots are only written by the producer before publishing `head`,
    // and only read by the consumer before publishing `tail`.
    unsafe impl Sync for LogRing {}

    impl LogRing {
        fn new() -> Self {
            let buf = (0..LOG_CAP)
                .map(|_| UnsafeCell::new(LogEntry::default()))
                .collect::<Vec<_>>()
                .into_boxed_slice();
            Self {
                head: AtomicUsize::new(0),
                tail: AtomicUsize::new(0),
                buf,
            }
        }

        fn push(&self, entry: LogEntry) -> bool {
            let cap = self.buf.len();
            let head = self.head.load(Ordering::Relaxed);
            let next = (head + 1) % cap;
            if next == self.tail.load(Ordering::Acquire) {
                return false;
            }
            unsafe {
                *self.buf[head].get() = entry;
            }
            self.head.store(next, Ordering::Release);
            true
        }

        fn pop(&self) -> Option<LogEntry> {
            let cap = self.buf.len();
            let tail = self.tail.load(Ordering::Relaxed);
            if tail == self.head.load(Ordering::Acquire) {
                return None;
            }
            let entry = unsafe { *self.buf[tail].get() };
            self.tail.store((tail + 1) % cap, Ordering::Release);
            Some(entry)
        }
    }

    static LOGGER: OnceCell<LogRing> = OnceCell::new();
    static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
    static DROPPED: AtomicUsize = AtomicUsize::new(0);

    /// Allocate the ring. Call from a non-audio thread before processing.
    pub fn init_logger() {
        let _ = LOGGER.get_or_init(LogRing::new);
        LOG_ENABLED.store(true, Ordering::Relaxed);
    }

    struct FixedBuf {
        entry: LogEntry,
        len: usize,
    }

    impl fmt::Write for FixedBuf {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let avail = LOG_MSG_MAX - self.len;
            // Truncate on a char boundary so the drained line stays valid UTF-8
            let mut n = s.len().min(avail);
            while !s.is_char_boundary(n) {
                n -= 1;
            }
            self.entry.bytes[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
            self.len += n;
            Ok(())
        }
    }

    pub fn log_args(args: fmt::Arguments) {
        if !LOG_ENABLED.load(Ordering::Relaxed) {
            return;
        }
        let Some(logger) = LOGGER.get() else {
            return;
        };

        let mut buf = FixedBuf {
            entry: LogEntry::default(),
            len: 0,
        };
        let _ = fmt::write(&mut buf, args);
        buf.entry.len = buf.len as u16;
        if !logger.push(buf.entry) {
            DROPPED.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Forward queued lines to `log::debug!`. Returns the number forwarded.
    pub fn drain_to_log() -> usize {
        let Some(logger) = LOGGER.get() else {
            return 0;
        };
        let mut count = 0;
        while let Some(entry) = logger.pop() {
            let len = entry.len as usize;
            if len == 0 {
                continue;
            }
            let msg = std::str::from_utf8(&entry.bytes[..len]).unwrap_or("<invalid>");
            log::debug!(target: "solfeggio::rt", "{}", msg);
            count += 1;
        }
        let dropped = DROPPED.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::warn!(target: "solfeggio::rt", "{} audio-thread log lines dropped", dropped);
        }
        count
    }

}

#[cfg(feature = "debug")]
pub fn sf_log_inner(args: fmt::Arguments) {
    logger::log_args(args);
}

#[cfg(not(feature = "debug"))]
#[inline(always)]
pub fn sf_log_inner(_args: fmt::Arguments) {}

#[macro_export]
macro_rules! sf_log {
    ($($arg:tt)*) => {
        $crate::debug::sf_log_inner(format_args!($($arg)*))
    };
}
