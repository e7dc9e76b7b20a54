//! Bookkeeping for which modem responses are currently awaited.
//!
//! At most one exchange per response kind is ever in flight; an `OK` wait may
//! ride alongside one kind-specific wait because the multi-stage actions need
//! the terminating `OK` separately.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::classify::{ResponseKind, KIND_COUNT};

/// Deadline for every kind-specific response.
pub const RESPONSE_DEADLINE: Duration = Duration::from_secs(9);
/// `OK` may legitimately trail a slow multi-stage send.
pub const OK_DEADLINE: Duration = Duration::from_secs(60);

pub struct Dialogue {
    /// `Some(when)` while a response of that kind is awaited.
    awaiting: [Option<Instant>; KIND_COUNT],
}

impl Dialogue {
    pub const fn new() -> Self {
        Self {
            awaiting: [None; KIND_COUNT],
        }
    }

    /// Stamps the wait for `kind`, started at `now`.
    pub fn expect(&mut self, kind: ResponseKind, now: Instant) {
        self.awaiting[kind.index()] = Some(now);
    }

    pub fn clear(&mut self, kind: ResponseKind) {
        self.awaiting[kind.index()] = None;
    }

    pub fn is_awaiting(&self, kind: ResponseKind) -> bool {
        self.awaiting[kind.index()].is_some()
    }

    /// A request is in flight; nothing new may be dispatched.
    pub fn busy(&self) -> bool {
        self.awaiting.iter().any(Option::is_some)
    }

    fn deadline(kind: ResponseKind) -> Duration {
        match kind {
            ResponseKind::Ok => OK_DEADLINE,
            _ => RESPONSE_DEADLINE,
        }
    }

    /// Clears and returns every wait whose deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Vec<ResponseKind, KIND_COUNT> {
        let mut lapsed = Vec::new();
        for kind in ResponseKind::ALL {
            if let Some(since) = self.awaiting[kind.index()] {
                if now - since > Self::deadline(kind) {
                    self.awaiting[kind.index()] = None;
                    let _ = lapsed.push(kind);
                }
            }
        }
        lapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> Instant {
        Instant::from_ticks(0) + Duration::from_secs(secs)
    }

    #[test]
    fn fresh_table_is_idle() {
        let dialogue = Dialogue::new();
        assert!(!dialogue.busy());
        assert!(!dialogue.is_awaiting(ResponseKind::Ok));
    }

    #[test]
    fn expect_and_clear_round_trip() {
        let mut dialogue = Dialogue::new();
        dialogue.expect(ResponseKind::Csq, at(0));
        assert!(dialogue.busy());
        assert!(dialogue.is_awaiting(ResponseKind::Csq));
        dialogue.clear(ResponseKind::Csq);
        assert!(!dialogue.busy());
    }

    #[test]
    fn ok_may_ride_alongside_a_specific_wait() {
        let mut dialogue = Dialogue::new();
        dialogue.expect(ResponseKind::Cmgs, at(0));
        dialogue.expect(ResponseKind::Ok, at(0));
        dialogue.clear(ResponseKind::Cmgs);
        assert!(dialogue.busy());
        dialogue.clear(ResponseKind::Ok);
        assert!(!dialogue.busy());
    }

    #[test]
    fn specific_waits_lapse_after_nine_seconds() {
        let mut dialogue = Dialogue::new();
        dialogue.expect(ResponseKind::Cmgr, at(0));
        assert!(dialogue.expire(at(9)).is_empty());
        let lapsed = dialogue.expire(at(10));
        assert_eq!(lapsed.as_slice(), &[ResponseKind::Cmgr]);
        assert!(!dialogue.busy());
    }

    #[test]
    fn ok_wait_lasts_a_minute() {
        let mut dialogue = Dialogue::new();
        dialogue.expect(ResponseKind::Ok, at(0));
        assert!(dialogue.expire(at(59)).is_empty());
        assert_eq!(dialogue.expire(at(61)).as_slice(), &[ResponseKind::Ok]);
    }
}
