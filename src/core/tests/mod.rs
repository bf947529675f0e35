//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Hotkey parsing and canonical form
//! - Schema checks and default derivation
//! - Conflict detection
//! - Capture state machine
