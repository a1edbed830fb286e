//! Conversation dispatcher.
//!
//! Turns transport events (commands, free text, button presses) into wizard
//! steps, category prompts and query views, and renders the replies.

mod dispatcher;
mod event;
mod keyboard;
mod render;

pub use dispatcher::{DispatchError, Dispatcher};
pub use event::{
    Action, Button, Command, EventKind, InboundEvent, Keyboard, MenuButton, Reply, Sender,
    UnknownAction,
};
