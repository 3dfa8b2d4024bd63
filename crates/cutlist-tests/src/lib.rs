//! Integration test crate for Cutlist.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on all cutlist crates to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod invariants;
