//! Integration tests for rbk
//!
//! These tests run the actual binary against runbook files written to a
//! temporary directory.

mod check;
mod inspect;
