//! Shared limits and helpers.

pub mod validation;
