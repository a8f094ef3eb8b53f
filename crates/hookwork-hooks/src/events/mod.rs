//! Trigger kinds that activate rule matching
//!
//! Event sources report what happened by passing a [`TriggerKind`] to
//! `HookEngine::trigger`. Rules declare the one kind they react to.

pub mod trigger;

pub use trigger::TriggerKind;
