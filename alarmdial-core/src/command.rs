//! The SMS command grammar: `<password> <verb>[!<argument>...]`.
//!
//! A body whose password prefix does not match is dropped without a trace; a
//! matching password always earns a reply, even if the verb is unknown. The
//! replies are staged here and sent by the sequencer once the modem has
//! acknowledged the read-out.

use core::fmt::Write;

use crate::config::{Config, INPUT_COUNT, PASSWORD_LEN};
use crate::sequencer::{Action, Reply};
use crate::strings::clipped;

/// Hook for rejecting destination numbers in the wrong format. The shipped
/// validator accepts everything.
pub type NumberValidator = fn(&str) -> bool;

pub fn accept_any_number(_number: &str) -> bool {
    true
}

pub struct Outcome {
    pub action: Action,
    pub config_changed: bool,
}

impl Outcome {
    fn reply_only(action: Action) -> Self {
        Self {
            action,
            config_changed: false,
        }
    }

    fn changed(action: Action) -> Self {
        Self {
            action,
            config_changed: true,
        }
    }
}

/// Interprets one SMS body against the current configuration. `None` means
/// the password prefix did not match.
pub fn interpret(body: &str, config: &mut Config, validate: NumberValidator) -> Option<Outcome> {
    let rest = body.strip_prefix(config.password.as_str())?;
    let Some(rest) = rest.strip_prefix(' ') else {
        return Some(invalid_instruction());
    };
    if rest.starts_with("Signal?") {
        return Some(Outcome::reply_only(Action::SignalQuery));
    }
    if let Some(arg) = rest.strip_prefix("TelephoneNumber!") {
        return Some(change_number(arg, config, validate));
    }
    if let Some(arg) = rest.strip_prefix("Password!") {
        return Some(change_password(arg, config));
    }
    if let Some(arg) = rest.strip_prefix("SMSonInput!") {
        return Some(toggle_input(arg, config));
    }
    if let Some(arg) = rest.strip_prefix("MessageText!") {
        return Some(change_message(arg, config));
    }
    if rest.starts_with("Defaults!") {
        *config = Config::default();
        return Some(Outcome::changed(Action::DefaultsReply(clipped(
            "Ok. Resetting settings to defaults",
        ))));
    }
    Some(invalid_instruction())
}

fn invalid_instruction() -> Outcome {
    Outcome::reply_only(Action::InvalidCommandReply(clipped("Invalid instruction")))
}

fn change_number(arg: &str, config: &mut Config, validate: NumberValidator) -> Outcome {
    if validate(arg) {
        config.destination = clipped(arg);
        Outcome::changed(Action::TelNumberReply(clipped(
            "Ok. Changed telephone number",
        )))
    } else {
        Outcome::reply_only(Action::TelNumberReply(clipped(
            "Error. Invalid telephone number",
        )))
    }
}

fn change_password(arg: &str, config: &mut Config) -> Outcome {
    if arg.len() == PASSWORD_LEN && !arg.contains('\0') {
        config.password = clipped(arg);
        Outcome::changed(Action::PasswordReply(clipped("Ok. Changed password")))
    } else {
        Outcome::reply_only(Action::PasswordReply(clipped(
            "Error. Invalid password (needs to be 6 characters)",
        )))
    }
}

fn pin_index(arg: &str) -> Option<usize> {
    let mut chars = arg.chars();
    let digit = chars.next().filter(char::is_ascii_digit)?;
    let index = (digit as usize).wrapping_sub('1' as usize);
    (index < INPUT_COUNT).then_some(index)
}

fn toggle_input(arg: &str, config: &mut Config) -> Outcome {
    let mut reply = Reply::new();
    // exactly one digit naming the input
    match pin_index(arg).filter(|_| arg.len() == 1) {
        Some(index) => {
            let input = &mut config.inputs[index];
            input.notify_enabled = !input.notify_enabled;
            let _ = write!(
                reply,
                "Ok. Input {} will {}trigger SMS from now on",
                index + 1,
                if input.notify_enabled { "" } else { "not " }
            );
            Outcome::changed(Action::PinToggleReply(reply))
        }
        None => {
            let _ = write!(
                reply,
                "Error. Invalid input number (must be 1-{})",
                INPUT_COUNT
            );
            Outcome::reply_only(Action::PinToggleReply(reply))
        }
    }
}

fn change_message(arg: &str, config: &mut Config) -> Outcome {
    let parsed = pin_index(arg).and_then(|index| {
        let rest = arg[1..].strip_prefix('!')?;
        if let Some(text) = rest.strip_prefix("On!") {
            Some((index, true, text))
        } else {
            rest.strip_prefix("Off!").map(|text| (index, false, text))
        }
    });
    let mut reply = Reply::new();
    match parsed {
        Some((index, activate, text)) => {
            let text = clipped(text);
            let _ = write!(
                reply,
                "Ok. New message for input {} {}: \"{}\"",
                index + 1,
                if activate { "activating" } else { "deactivating" },
                text
            );
            let input = &mut config.inputs[index];
            if activate {
                input.on_activate = text;
            } else {
                input.on_deactivate = text;
            }
            Outcome::changed(Action::MessageTextReply(reply))
        }
        None => {
            let _ = reply.push_str("Error. Invalid message change request");
            Outcome::reply_only(Action::MessageTextReply(reply))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    fn run(body: &str, config: &mut Config) -> Option<Outcome> {
        interpret(body, config, accept_any_number)
    }

    #[test]
    fn wrong_password_is_silently_dropped() {
        let mut config = config();
        assert!(run("000000 Signal?", &mut config).is_none());
        assert!(run("67435 Signal?", &mut config).is_none());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn correct_password_without_a_verb_is_answered() {
        let mut config = config();
        let outcome = run("674358", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::InvalidCommandReply(clipped("Invalid instruction"))
        );
        assert!(!outcome.config_changed);
        let outcome = run("674358 MakeCoffee!", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::InvalidCommandReply(clipped("Invalid instruction"))
        );
    }

    #[test]
    fn signal_query_stages_the_multi_stage_action() {
        let mut config = config();
        let outcome = run("674358 Signal?", &mut config).unwrap();
        assert_eq!(outcome.action, Action::SignalQuery);
        assert!(!outcome.config_changed);
    }

    #[test]
    fn telephone_number_is_stored_and_confirmed() {
        let mut config = config();
        let outcome = run("674358 TelephoneNumber!+447911123456", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::TelNumberReply(clipped("Ok. Changed telephone number"))
        );
        assert!(outcome.config_changed);
        assert_eq!(config.destination.as_str(), "+447911123456");
    }

    #[test]
    fn telephone_number_is_truncated_to_capacity() {
        let mut config = config();
        let long = "0123456789012345678901234567890123456789012345678901234";
        let outcome = run(
            &format!("674358 TelephoneNumber!{long}"),
            &mut config,
        )
        .unwrap();
        assert!(outcome.config_changed);
        assert_eq!(config.destination.as_str(), &long[..49]);
    }

    #[test]
    fn rejected_number_leaves_the_destination_alone() {
        fn deny(_: &str) -> bool {
            false
        }
        let mut config = config();
        let outcome = interpret("674358 TelephoneNumber!12345", &mut config, deny).unwrap();
        assert_eq!(
            outcome.action,
            Action::TelNumberReply(clipped("Error. Invalid telephone number"))
        );
        assert!(!outcome.config_changed);
        assert_eq!(config.destination.as_str(), "+447700900000");
    }

    #[test]
    fn password_change_requires_exactly_six_characters() {
        let mut config = config();
        let outcome = run("674358 Password!abcdef", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::PasswordReply(clipped("Ok. Changed password"))
        );
        assert_eq!(config.password.as_str(), "abcdef");

        for bad in ["abcde", "abcdefg", ""] {
            let mut config = Config::default();
            let outcome = run(&format!("674358 Password!{bad}"), &mut config).unwrap();
            assert_eq!(
                outcome.action,
                Action::PasswordReply(clipped(
                    "Error. Invalid password (needs to be 6 characters)"
                ))
            );
            assert!(!outcome.config_changed);
            assert_eq!(config.password.as_str(), "674358");
        }
    }

    #[test]
    fn input_toggle_flips_and_reports_the_new_state() {
        let mut config = config();
        let outcome = run("674358 SMSonInput!2", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::PinToggleReply(clipped("Ok. Input 2 will not trigger SMS from now on"))
        );
        assert!(!config.inputs[1].notify_enabled);

        let outcome = run("674358 SMSonInput!2", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::PinToggleReply(clipped("Ok. Input 2 will trigger SMS from now on"))
        );
        // two toggles restore the prior setting
        assert!(config.inputs[1].notify_enabled);
    }

    #[test]
    fn input_toggle_rejects_out_of_range_digits() {
        let mut config = config();
        for bad in ["0", "4", "12", "x", ""] {
            let outcome = run(&format!("674358 SMSonInput!{bad}"), &mut config).unwrap();
            assert_eq!(
                outcome.action,
                Action::PinToggleReply(clipped("Error. Invalid input number (must be 1-3)"))
            );
            assert!(!outcome.config_changed);
        }
        assert_eq!(config, Config::default());
    }

    #[test]
    fn message_text_updates_the_right_slot() {
        let mut config = config();
        let outcome = run("674358 MessageText!1!On!Front door open", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::MessageTextReply(clipped(
                "Ok. New message for input 1 activating: \"Front door open\""
            ))
        );
        assert_eq!(config.inputs[0].on_activate.as_str(), "Front door open");
        assert_eq!(
            config.inputs[0].on_deactivate.as_str(),
            "Intruder alarm cleared"
        );

        let outcome = run("674358 MessageText!3!Off!All clear", &mut config).unwrap();
        assert!(outcome.config_changed);
        assert_eq!(config.inputs[2].on_deactivate.as_str(), "All clear");
    }

    #[test]
    fn message_text_keeps_only_forty_nine_characters() {
        let mut config = config();
        let long: String = core::iter::repeat('x').take(60).collect();
        run(&format!("674358 MessageText!1!On!{long}"), &mut config).unwrap();
        assert_eq!(config.inputs[0].on_activate.len(), 49);
        assert_eq!(config.inputs[0].on_activate.as_str(), &long[..49]);
    }

    #[test]
    fn malformed_message_text_is_an_error() {
        let mut config = config();
        for bad in ["", "1", "1!", "1!Maybe!text", "9!On!text", "1On!text"] {
            let outcome = run(&format!("674358 MessageText!{bad}"), &mut config).unwrap();
            assert_eq!(
                outcome.action,
                Action::MessageTextReply(clipped("Error. Invalid message change request"))
            );
            assert!(!outcome.config_changed);
        }
        assert_eq!(config, Config::default());
    }

    #[test]
    fn defaults_resets_everything_and_is_idempotent() {
        let mut config = config();
        run("674358 Password!qwerty", &mut config).unwrap();
        run("qwerty TelephoneNumber!+15551234567", &mut config).unwrap();
        let outcome = run("qwerty Defaults!", &mut config).unwrap();
        assert_eq!(
            outcome.action,
            Action::DefaultsReply(clipped("Ok. Resetting settings to defaults"))
        );
        assert!(outcome.config_changed);
        assert_eq!(config, Config::default());

        run("674358 Defaults!", &mut config).unwrap();
        assert_eq!(config, Config::default());
    }
}
