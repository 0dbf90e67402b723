// File: testing-framework/src/orchestrator/mod.rs
//
// Time orchestration for sandbox lifecycle code
//
// Readiness polling reads time through `Clock`, so it can be driven
// deterministically in tests.

/// Clock trait, real and paused implementations, bounded-wait deadline
pub mod clock;

pub use clock::{Clock, Deadline, PausedClock, SystemClock};
