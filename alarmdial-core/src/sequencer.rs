//! The one multi-stage action that may be pending at a time.
//!
//! Every action funnels through the modem's `OK`: either it still has an AT
//! step to issue (the signal-quality query) or it has a staged SMS reply
//! waiting to go out.

use heapless::String;

pub const REPLY_LEN: usize = 160;
pub type Reply = String<REPLY_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// `Signal?` — still needs `AT+CSQ` before a reply can be staged.
    SignalQuery,
    TelNumberReply(Reply),
    PasswordReply(Reply),
    PinToggleReply(Reply),
    MessageTextReply(Reply),
    DefaultsReply(Reply),
    InvalidCommandReply(Reply),
    SignalLevelReply(Reply),
    StatusReply(Reply),
}

/// What the control loop should do after an `OK` lands.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    QuerySignal,
    SendReply(Reply),
    Idle,
}

pub struct Sequencer {
    pending: Option<Action>,
}

impl Sequencer {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    pub fn stage(&mut self, action: Action) {
        self.pending = Some(action);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the pending action, e.g. when the SMS read-out timed out.
    pub fn abandon(&mut self) {
        self.pending = None;
    }

    /// Consumes the pending action and says what comes next.
    pub fn on_ok(&mut self) -> Step {
        match self.pending.take() {
            None => Step::Idle,
            Some(Action::SignalQuery) => Step::QuerySignal,
            Some(Action::TelNumberReply(reply))
            | Some(Action::PasswordReply(reply))
            | Some(Action::PinToggleReply(reply))
            | Some(Action::MessageTextReply(reply))
            | Some(Action::DefaultsReply(reply))
            | Some(Action::InvalidCommandReply(reply))
            | Some(Action::SignalLevelReply(reply))
            | Some(Action::StatusReply(reply)) => Step::SendReply(reply),
        }
    }
}
