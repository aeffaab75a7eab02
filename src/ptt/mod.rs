//! Push-to-talk module
//!
//! Turns operator input into key press/release events that drive one
//! recording gesture each.

mod keys;
mod listener;

pub use listener::{PttEvent, PttListener};
