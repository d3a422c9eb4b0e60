//! Test suites for the lifecycle gate.

pub(crate) mod support;
