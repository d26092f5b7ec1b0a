//! Integration test utilities for the admission API
//!
//! Servers run on the in-process store, so these tests need no external
//! services.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
