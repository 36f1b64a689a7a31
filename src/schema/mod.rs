//! health.sample.v1 interchange format
//!
//! This module defines the JSON record format for interval samples exported
//! from a health store, and the adapter that parses and validates it.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
