//! Edge detection for the panel-facing contact inputs.
//!
//! The inputs are pulled up and switched to ground by the panel, so
//! electrical low means "activated". One scan handles at most one
//! notification: the SMS takes the dialogue, and any further changed pin is
//! left uncommitted so the next scan sees its edge again.

use crate::config::INPUT_COUNT;

/// A committed change that wants an SMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Notification {
    pub index: usize,
    pub activated: bool,
}

pub struct InputScanner {
    last: [bool; INPUT_COUNT],
}

impl InputScanner {
    pub const fn new() -> Self {
        Self {
            last: [false; INPUT_COUNT],
        }
    }

    /// Compares one electrical sample against the last committed state.
    /// Silent changes (notify disabled) are committed as they are found; the
    /// first change that needs an SMS is committed and returned.
    pub fn scan(
        &mut self,
        levels_high: &[bool; INPUT_COUNT],
        notify: &[bool; INPUT_COUNT],
    ) -> Option<Notification> {
        for index in 0..INPUT_COUNT {
            let activated = !levels_high[index];
            if activated != self.last[index] {
                self.last[index] = activated;
                if notify[index] {
                    return Some(Notification { index, activated });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [bool; INPUT_COUNT] = [true; INPUT_COUNT];

    #[test]
    fn low_means_activated() {
        let mut scanner = InputScanner::new();
        assert_eq!(scanner.scan(&[true, true, true], &ALL), None);
        assert_eq!(
            scanner.scan(&[false, true, true], &ALL),
            Some(Notification {
                index: 0,
                activated: true
            })
        );
        // unchanged sample, no new edge
        assert_eq!(scanner.scan(&[false, true, true], &ALL), None);
        assert_eq!(
            scanner.scan(&[true, true, true], &ALL),
            Some(Notification {
                index: 0,
                activated: false
            })
        );
    }

    #[test]
    fn muted_inputs_commit_silently() {
        let mut scanner = InputScanner::new();
        let notify = [false, true, true];
        assert_eq!(scanner.scan(&[false, true, true], &notify), None);
        // the change was still recorded
        assert_eq!(scanner.scan(&[false, true, true], &notify), None);
    }

    #[test]
    fn second_changed_pin_waits_for_the_next_scan() {
        let mut scanner = InputScanner::new();
        assert_eq!(
            scanner.scan(&[false, false, true], &ALL),
            Some(Notification {
                index: 0,
                activated: true
            })
        );
        // pin 1 stayed changed and surfaces on the following scan
        assert_eq!(
            scanner.scan(&[false, false, true], &ALL),
            Some(Notification {
                index: 1,
                activated: true
            })
        );
    }

    #[test]
    fn muted_change_does_not_shadow_a_notifying_one() {
        let mut scanner = InputScanner::new();
        let notify = [false, true, true];
        assert_eq!(
            scanner.scan(&[false, false, true], &notify),
            Some(Notification {
                index: 1,
                activated: true
            })
        );
    }
}
