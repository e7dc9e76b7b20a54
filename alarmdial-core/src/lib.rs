#![cfg_attr(not(test), no_std)]

//! Control core for a cellular alarm dialler.
//!
//! Everything in here is hardware-free: the ring buffer the UART feeds, the
//! line classifier, the AT dialogue bookkeeping, the multi-stage action
//! sequencer, the SMS command grammar and the persistent configuration
//! record. The firmware crate owns the peripherals and executes the
//! [`controller::Effect`]s this crate decides on.

pub mod classify;
pub mod command;
pub mod config;
pub mod controller;
pub mod dialogue;
pub mod ringbuf;
pub mod scanner;
pub mod schedule;
pub mod sequencer;
pub mod strings;

/// Longest modem line kept; anything beyond this is truncated.
pub const MAX_LINE: usize = 200;

pub use controller::{Controller, Effect, Effects, PinSample};
