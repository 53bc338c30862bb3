//! Controller layer: transitions, the reducer, and the operations that feed it.

pub mod events;
pub mod orchestration;
pub mod reducer;

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
