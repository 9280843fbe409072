//! Common utilities for the Koala browser.
//!
//! This crate provides shared infrastructure used by all browser components:
//! - **Warning System** - colored terminal output for unsupported features

pub mod warning;
