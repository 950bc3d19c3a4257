//! Integration test suite for the relational state store.
//!
//! Organized by subsystem:
//! - session CRUD, propagation, and commit structural sharing
//! - relational navigation through record views
//! - end-to-end lifecycle

pub mod view_tests;
