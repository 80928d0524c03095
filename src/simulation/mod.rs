//! Scenario generation for benchmarks, property tests and the CLI.

pub mod scenario;
