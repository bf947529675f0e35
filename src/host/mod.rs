//! Presentation-facing entry point
//!
//! `Controller` bundles a store, a capture machine and an adapter behind
//! the handful of calls a user interface needs. Every call is synchronous;
//! a host with asynchronous storage uses `PreferenceStore::begin_save` and
//! `finish_save` directly instead.

pub mod controller;

pub use controller::{Controller, KeyOutcome};

#[cfg(test)]
mod tests;
