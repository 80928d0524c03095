//! Split calculation: allocation modes and the calculator that applies them.

pub mod allocation;
pub mod calculator;
