//! Command module: vocabulary parsing and dispatch

mod dispatcher;
mod token;

pub use dispatcher::{log_dispatch_error, Action, Dispatcher};
