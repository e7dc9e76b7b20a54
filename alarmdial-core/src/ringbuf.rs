//! Byte ring between the UART ingest path and the control loop.
//!
//! Strictly single-producer / single-consumer: the ingest side owns the
//! [`RingWriter`], the control loop owns the [`RingReader`]. Publication is
//! by monotonic counters with release/acquire ordering; the wrapped
//! positions are each written from one side only. There is no overflow
//! check — capacity is sized to vastly exceed any credible modem burst, and
//! an overflow would corrupt at most the oldest unread line.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

const LF: u8 = b'\n';
const CR: u8 = b'\r';

pub struct RxRing<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    /// Next write position, wrapped to `0..N`. Producer-written.
    wr: AtomicUsize,
    /// Next read position, wrapped to `0..N`. Consumer-written.
    rd: AtomicUsize,
    /// Total bytes ever pushed. Producer-written.
    pushed: AtomicU32,
    /// Total bytes ever popped. Consumer-written.
    popped: AtomicU32,
    /// Total line feeds ever pushed. Producer-written.
    lf_pushed: AtomicU32,
    /// Total line feeds ever popped. Consumer-written.
    lf_popped: AtomicU32,
    taken: AtomicBool,
}

unsafe impl<const N: usize> Sync for RxRing<N> {}

impl<const N: usize> RxRing<N> {
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; N]),
            wr: AtomicUsize::new(0),
            rd: AtomicUsize::new(0),
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            lf_pushed: AtomicU32::new(0),
            lf_popped: AtomicU32::new(0),
            taken: AtomicBool::new(false),
        }
    }

    /// Hands out the two endpoints. Panics if called twice.
    pub fn split(&'static self) -> (RingWriter<N>, RingReader<N>) {
        assert!(!self.taken.swap(true, Ordering::AcqRel));
        (RingWriter { ring: self }, RingReader { ring: self })
    }

    /// Unread bytes.
    fn entries(&self) -> u32 {
        self.pushed
            .load(Ordering::Acquire)
            .wrapping_sub(self.popped.load(Ordering::Relaxed))
    }
}

pub struct RingWriter<const N: usize> {
    ring: &'static RxRing<N>,
}

impl<const N: usize> RingWriter<N> {
    /// Appends one byte. Safe to call from the ingest path while the reader
    /// drains concurrently.
    pub fn push(&mut self, byte: u8) {
        let ring = self.ring;
        let wr = ring.wr.load(Ordering::Relaxed);
        // raw pointer write: the reader may be touching another cell
        unsafe {
            (ring.buf.get() as *mut u8).add(wr).write(byte);
        }
        ring.wr
            .store(if wr + 1 == N { 0 } else { wr + 1 }, Ordering::Relaxed);
        ring.pushed.store(
            ring.pushed.load(Ordering::Relaxed).wrapping_add(1),
            Ordering::Release,
        );
        if byte == LF {
            ring.lf_pushed.store(
                ring.lf_pushed.load(Ordering::Relaxed).wrapping_add(1),
                Ordering::Release,
            );
        }
    }
}

pub struct RingReader<const N: usize> {
    ring: &'static RxRing<N>,
}

impl<const N: usize> RingReader<N> {
    /// Complete (LF-terminated) lines waiting in the ring.
    pub fn lines_ready(&self) -> u32 {
        self.ring
            .lf_pushed
            .load(Ordering::Acquire)
            .wrapping_sub(self.ring.lf_popped.load(Ordering::Relaxed))
    }

    pub fn entries(&self) -> u32 {
        self.ring.entries()
    }

    /// Pops one line into `scratch`, stripping CR and LF and truncating at
    /// the scratch length (the remainder of an overlong line is consumed).
    /// Returns `None` when no complete line is buffered, or when the line is
    /// empty or not valid UTF-8 (it is consumed either way).
    pub fn pop_line<'a>(&mut self, scratch: &'a mut [u8]) -> Option<&'a str> {
        if self.lines_ready() == 0 {
            return None;
        }
        let ring = self.ring;
        let mut len = 0;
        while ring.entries() > 0 {
            let rd = ring.rd.load(Ordering::Relaxed);
            let byte = unsafe { (ring.buf.get() as *const u8).add(rd).read() };
            ring.rd
                .store(if rd + 1 == N { 0 } else { rd + 1 }, Ordering::Relaxed);
            ring.popped.store(
                ring.popped.load(Ordering::Relaxed).wrapping_add(1),
                Ordering::Release,
            );
            if byte == LF {
                ring.lf_popped.store(
                    ring.lf_popped.load(Ordering::Relaxed).wrapping_add(1),
                    Ordering::Release,
                );
                break;
            }
            if byte != CR && len < scratch.len() {
                scratch[len] = byte;
                len += 1;
            }
        }
        if len == 0 {
            return None;
        }
        core::str::from_utf8(&scratch[..len]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<const N: usize>(writer: &mut RingWriter<N>, text: &str) {
        for &byte in text.as_bytes() {
            writer.push(byte);
        }
    }

    #[test]
    fn frames_crlf_lines() {
        static RING: RxRing<64> = RxRing::new();
        let (mut writer, mut reader) = RING.split();
        let mut scratch = [0u8; 16];

        assert_eq!(reader.pop_line(&mut scratch), None);
        feed(&mut writer, "OK\r\n+CSQ: 17,99\r\n");
        assert_eq!(reader.lines_ready(), 2);
        assert_eq!(reader.pop_line(&mut scratch), Some("OK"));
        assert_eq!(reader.pop_line(&mut scratch), Some("+CSQ: 17,99"));
        assert_eq!(reader.pop_line(&mut scratch), None);
        assert_eq!(reader.entries(), 0);
    }

    #[test]
    fn wraps_at_capacity() {
        static RING: RxRing<16> = RxRing::new();
        let (mut writer, mut reader) = RING.split();
        let mut scratch = [0u8; 16];

        for round in 0..10 {
            feed(&mut writer, "abcdefgh\r\n");
            let expected = "abcdefgh";
            assert_eq!(reader.pop_line(&mut scratch), Some(expected), "round {round}");
        }
        assert_eq!(reader.entries(), 0);
    }

    #[test]
    fn consumes_overlong_line_and_keeps_the_next() {
        static RING: RxRing<256> = RxRing::new();
        let (mut writer, mut reader) = RING.split();
        let mut scratch = [0u8; 8];

        feed(&mut writer, "0123456789ABCDEF\r\nnext\r\n");
        assert_eq!(reader.pop_line(&mut scratch), Some("01234567"));
        assert_eq!(reader.pop_line(&mut scratch), Some("next"));
    }

    #[test]
    fn drops_blank_lines() {
        static RING: RxRing<32> = RxRing::new();
        let (mut writer, mut reader) = RING.split();
        let mut scratch = [0u8; 16];

        feed(&mut writer, "\r\n\r\nOK\r\n");
        assert_eq!(reader.pop_line(&mut scratch), None);
        assert_eq!(reader.pop_line(&mut scratch), None);
        assert_eq!(reader.pop_line(&mut scratch), Some("OK"));
    }

    #[test]
    fn survives_concurrent_producer() {
        static RING: RxRing<4096> = RxRing::new();
        let (mut writer, mut reader) = RING.split();

        const LINES: u32 = 300;
        let producer = std::thread::spawn(move || {
            for i in 0..LINES {
                for &byte in format!("line-{i}\r\n").as_bytes() {
                    writer.push(byte);
                }
            }
        });

        let mut scratch = [0u8; 32];
        let mut seen = 0u32;
        while seen < LINES {
            if let Some(line) = reader.pop_line(&mut scratch) {
                assert_eq!(line, format!("line-{seen}"));
                seen += 1;
            } else {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert_eq!(reader.entries(), 0);
        assert_eq!(reader.lines_ready(), 0);
    }
}
