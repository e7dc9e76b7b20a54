//! The control core: one `tick` per loop iteration, all mutation in here.
//!
//! The firmware feeds in at most one received line and one pin sample and
//! gets back the IO to perform. Dialogue bookkeeping happens at the moment
//! an effect is emitted, so the caller only ever writes bytes.

use core::fmt::Write;

use embassy_time::Instant;
use heapless::{String, Vec};

use crate::classify::{classify, Classified, ResponseKind, KIND_COUNT};
use crate::command::{self, NumberValidator};
use crate::config::{Config, Text, DEFAULT_PASSWORD, INPUT_COUNT};
use crate::dialogue::Dialogue;
use crate::scanner::InputScanner;
use crate::schedule::{
    Cadence, INPUT_SCAN_PERIOD, REGISTRATION_PROBE_PERIOD, RESET_CHECK_PERIOD, RESET_COOLDOWN,
    STATUS_PROBE_PERIOD, STORE_CLEANUP_PERIOD,
};
use crate::sequencer::{Action, Reply, Sequencer, Step};
use crate::strings;
use crate::MAX_LINE;

pub type AtCommand = String<32>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Write one CR-terminated AT command.
    At(AtCommand),
    /// `AT+CMGS="<to>"`, 500 ms pause, then the body and Ctrl-Z.
    SendSms { to: Text, body: Reply },
    /// Write the encoded configuration record to flash, interrupts disabled.
    Persist,
    /// Collapse the watchdog deadline and spin.
    Reboot,
}

pub type Effects = Vec<Effect, 4>;

/// One electrical sample of the panel-facing pins. `true` is high; the
/// inputs and the reset pin are all pulled up and active low.
#[derive(Debug, Clone, Copy)]
pub struct PinSample {
    pub inputs: [bool; INPUT_COUNT],
    pub reset: bool,
}

impl PinSample {
    pub const fn idle() -> Self {
        Self {
            inputs: [true; INPUT_COUNT],
            reset: true,
        }
    }
}

pub struct Controller {
    config: Config,
    config_dirty: bool,
    dialogue: Dialogue,
    received: [Option<String<MAX_LINE>>; KIND_COUNT],
    sms_body: Option<String<MAX_LINE>>,
    sequencer: Sequencer,
    scanner: InputScanner,
    status_probe: Cadence,
    registration_probe: Cadence,
    store_cleanup: Cadence,
    input_scan: Cadence,
    reset_check: Cadence,
    last_reset: Instant,
    validate_number: NumberValidator,
    rebooting: bool,
}

impl Controller {
    pub fn new(config: Config, config_dirty: bool, now: Instant) -> Self {
        Self {
            config,
            config_dirty,
            dialogue: Dialogue::new(),
            received: core::array::from_fn(|_| None),
            sms_body: None,
            sequencer: Sequencer::new(),
            scanner: InputScanner::new(),
            status_probe: Cadence::new(STATUS_PROBE_PERIOD, now),
            registration_probe: Cadence::new(REGISTRATION_PROBE_PERIOD, now),
            store_cleanup: Cadence::new(STORE_CLEANUP_PERIOD, now),
            input_scan: Cadence::new(INPUT_SCAN_PERIOD, now),
            reset_check: Cadence::new(RESET_CHECK_PERIOD, now),
            last_reset: now,
            validate_number: command::accept_any_number,
            rebooting: false,
        }
    }

    pub fn with_validator(mut self, validate: NumberValidator) -> Self {
        self.validate_number = validate;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn busy(&self) -> bool {
        self.dialogue.busy()
    }

    /// One loop iteration. Handlers run in a fixed order; each arrival is
    /// consumed at most once and every dispatch is gated on the dialogue
    /// being free.
    pub fn tick(&mut self, now: Instant, line: Option<&str>, pins: PinSample, fx: &mut Effects) {
        if self.rebooting {
            return;
        }
        if let Some(line) = line {
            self.accept(line);
        }
        self.handle_status_probe(now, fx);
        if self.rebooting {
            return;
        }
        self.handle_registration_probe(now, fx);
        self.handle_sms_indication(now, fx);
        self.handle_call_indication(now, fx);
        self.handle_sms_readout(now);
        self.handle_signal_readout(now);
        self.handle_store_cleanup(now, fx);
        self.handle_send_confirmation(now);
        self.handle_ok(now, fx);
        self.discard_unhandled();
        self.expire_waits(now);
        self.scan_inputs(now, &pins.inputs, fx);
        self.check_reset_input(now, pins.reset, fx);
        self.maybe_persist(fx);
    }

    fn accept(&mut self, line: &str) {
        match classify(line) {
            Classified::Response(kind, text) => {
                self.received[kind.index()] = Some(strings::clipped(text));
            }
            Classified::Payload(text) => {
                // only meaningful as the body of an SMS read-out
                if self.dialogue.is_awaiting(ResponseKind::Cmgr) {
                    self.sms_body = Some(strings::clipped(text));
                }
            }
            Classified::Ignored => {}
        }
    }

    /// Consumes an arrival of `kind` if it was awaited; an unexpected
    /// arrival is dropped.
    fn take_awaited(&mut self, kind: ResponseKind) -> Option<String<MAX_LINE>> {
        let line = self.received[kind.index()].take()?;
        if self.dialogue.is_awaiting(kind) {
            self.dialogue.clear(kind);
            Some(line)
        } else {
            None
        }
    }

    fn issue(&mut self, fx: &mut Effects, now: Instant, command: &str, expect: ResponseKind) {
        let mut line = AtCommand::new();
        let _ = write!(line, "{}\r", command);
        let _ = fx.push(Effect::At(line));
        self.dialogue.expect(expect, now);
    }

    fn send_sms(&mut self, fx: &mut Effects, now: Instant, body: Reply) {
        let _ = fx.push(Effect::SendSms {
            to: self.config.destination.clone(),
            body,
        });
        self.dialogue.expect(ResponseKind::Cmgs, now);
    }

    fn handle_status_probe(&mut self, now: Instant, fx: &mut Effects) {
        if !self.dialogue.busy() && self.status_probe.due(now) {
            self.issue(fx, now, "AT+CPSI?", ResponseKind::Cpsi);
        }
        if let Some(line) = self.take_awaited(ResponseKind::Cpsi) {
            if line.contains("Online") {
                let status = strings::after_first(&line, ": ").unwrap_or("");
                let mut reply = Reply::new();
                let _ = write!(reply, "Modem check: {}", status);
                self.sequencer.stage(Action::StatusReply(reply));
                self.dialogue.expect(ResponseKind::Ok, now);
            } else {
                // the boot sequence power-cycles the modem; go there
                let _ = fx.push(Effect::Reboot);
                self.rebooting = true;
            }
        }
    }

    fn handle_registration_probe(&mut self, now: Instant, fx: &mut Effects) {
        if !self.dialogue.busy() && self.registration_probe.due(now) {
            self.issue(fx, now, "AT+CREG?", ResponseKind::Creg);
        }
        // the reply itself is only drained; its OK still has to be eaten
        if self.take_awaited(ResponseKind::Creg).is_some() {
            self.dialogue.expect(ResponseKind::Ok, now);
        }
    }

    fn handle_sms_indication(&mut self, now: Instant, fx: &mut Effects) {
        if self.dialogue.busy() || self.received[ResponseKind::Cmti.index()].is_none() {
            return;
        }
        if let Some(line) = self.received[ResponseKind::Cmti.index()].take() {
            let index = strings::after_last(&line, ',')
                .map(str::trim)
                .filter(|s| !s.is_empty() && s.len() <= 10 && s.bytes().all(|b| b.is_ascii_digit()));
            if let Some(index) = index {
                let mut command = AtCommand::new();
                let _ = write!(command, "AT+CMGR={}", index);
                self.issue(fx, now, &command, ResponseKind::Cmgr);
            }
        }
    }

    fn handle_call_indication(&mut self, now: Instant, fx: &mut Effects) {
        if self.dialogue.busy() {
            return;
        }
        if self.received[ResponseKind::Clcc.index()].take().is_some() {
            self.issue(fx, now, "AT+CHUP", ResponseKind::Ok);
        }
    }

    fn handle_sms_readout(&mut self, now: Instant) {
        if self.dialogue.is_awaiting(ResponseKind::Cmgr) {
            if self.received[ResponseKind::Cmgr.index()].is_none() || self.sms_body.is_none() {
                return; // header and body must both be in
            }
            self.received[ResponseKind::Cmgr.index()] = None;
            self.dialogue.clear(ResponseKind::Cmgr);
            self.dialogue.expect(ResponseKind::Ok, now);
            if let Some(body) = self.sms_body.take() {
                if let Some(outcome) =
                    command::interpret(&body, &mut self.config, self.validate_number)
                {
                    self.sequencer.stage(outcome.action);
                    if outcome.config_changed {
                        self.config_dirty = true;
                    }
                }
            }
        } else {
            // read-outs and bodies with no read in flight are stale
            self.received[ResponseKind::Cmgr.index()] = None;
            self.sms_body = None;
        }
    }

    fn handle_signal_readout(&mut self, now: Instant) {
        if let Some(line) = self.take_awaited(ResponseKind::Csq) {
            let after = strings::after_first(&line, ":").map(str::trim_start).unwrap_or("");
            let value = strings::before_first(after, ',').unwrap_or(after);
            let mut reply = Reply::new();
            let _ = write!(reply, "Signal quality is {}", value);
            self.sequencer.stage(Action::SignalLevelReply(reply));
            self.dialogue.expect(ResponseKind::Ok, now);
        }
    }

    fn handle_store_cleanup(&mut self, now: Instant, fx: &mut Effects) {
        if !self.dialogue.busy() && self.store_cleanup.due(now) {
            self.issue(fx, now, "AT+CMGD=0,4", ResponseKind::Ok);
        }
    }

    fn handle_send_confirmation(&mut self, now: Instant) {
        if self.take_awaited(ResponseKind::Cmgs).is_some() {
            self.dialogue.expect(ResponseKind::Ok, now);
        }
    }

    fn handle_ok(&mut self, now: Instant, fx: &mut Effects) {
        if self.take_awaited(ResponseKind::Ok).is_none() {
            return;
        }
        match self.sequencer.on_ok() {
            Step::QuerySignal => self.issue(fx, now, "AT+CSQ", ResponseKind::Csq),
            Step::SendReply(body) => self.send_sms(fx, now, body),
            Step::Idle => {}
        }
    }

    /// Kinds whose exchanges terminate in a bare `OK`, plus anything
    /// unclassified: their arrivals carry nothing actionable.
    fn discard_unhandled(&mut self) {
        for kind in [
            ResponseKind::Error,
            ResponseKind::Cpms,
            ResponseKind::Cmgd,
            ResponseKind::Unclassified,
        ] {
            self.received[kind.index()] = None;
        }
    }

    fn expire_waits(&mut self, now: Instant) {
        for kind in self.dialogue.expire(now) {
            if kind == ResponseKind::Cmgr {
                // the read-out died; whatever it was going to do dies with it
                self.sequencer.abandon();
            }
        }
    }

    fn scan_inputs(&mut self, now: Instant, levels_high: &[bool; INPUT_COUNT], fx: &mut Effects) {
        if self.dialogue.busy() || !self.input_scan.due(now) {
            return;
        }
        let notify = core::array::from_fn(|i| self.config.inputs[i].notify_enabled);
        if let Some(event) = self.scanner.scan(levels_high, &notify) {
            let input = &self.config.inputs[event.index];
            let message = if event.activated {
                &input.on_activate
            } else {
                &input.on_deactivate
            };
            let body = strings::clipped(message.as_str());
            self.send_sms(fx, now, body);
        }
    }

    fn check_reset_input(&mut self, now: Instant, reset_high: bool, fx: &mut Effects) {
        if self.dialogue.busy() || now - self.last_reset <= RESET_COOLDOWN {
            return;
        }
        if !self.reset_check.due(now) {
            return;
        }
        if !reset_high {
            self.last_reset = now;
            self.config.password = strings::clipped(DEFAULT_PASSWORD);
            self.config_dirty = true;
            self.send_sms(fx, now, strings::clipped("Password reset to default"));
        }
    }

    fn maybe_persist(&mut self, fx: &mut Effects) {
        if self.config_dirty && !self.dialogue.busy() {
            self.config_dirty = false;
            let _ = fx.push(Effect::Persist);
        }
    }
}
