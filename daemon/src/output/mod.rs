pub mod action;

pub use action::{ActionError, ActionOutcome, TriggerAction};
