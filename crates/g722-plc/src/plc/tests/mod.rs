//! Concealment engine tests
//!
//! Scenario tests drive the engine directly with controlled history and
//! pitch; stream tests go through the concealing decoder with encoded
//! signals and loss patterns.

mod property_tests;
mod utils;
