//! Store module tests
//!
//! Contains test suites for:
//! - Load, get, set, reset and dirty tracking
//! - Blob merge over defaults
//! - Save transactions
//! - Persistence adapters

#[cfg(test)]
mod store_tests;
#[cfg(test)]
mod transaction_tests;
