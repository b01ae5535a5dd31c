mod common;
pub mod reminders;
pub mod tracking;

pub use common::{bot_commands, dispatch_update};
