//! Bot core
//!
//! Transport-independent routing (commands, conversation state, views)
//! plus the teloxide edge for the long-polling deployment.

pub mod commands;
pub mod router;
pub mod state;
pub mod telegram;
pub mod update;
pub mod views;

pub use router::Router;
pub use state::{SessionStore, State};
pub use update::{Action, Button, CallbackAction, IncomingMessage, Keyboard, Update};
