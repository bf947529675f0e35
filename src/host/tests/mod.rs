//! Host module tests
