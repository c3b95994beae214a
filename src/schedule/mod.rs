//! Retry and repeat scheduling.
//!
//! A [`Schedule`] decides whether, and after what delay, an effect should run
//! again. Schedules know nothing about what is being retried:
//!
//! - **Pure**: a schedule is plain data; stepping it has no side effects
//! - **Composable**: `union`, `intersect`, `with_max_retries` and
//!   `with_max_delay` build new policies from existing ones
//! - **Shared**: the same policy drives both [`Effect::retry`](crate::Effect::retry)
//!   (re-run on failure) and [`Effect::repeat`](crate::Effect::repeat)
//!   (re-run on success)
//!
//! # Quick Start
//!
//! ```rust
//! use undertow::{run_sync, Effect, Exit, Schedule};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! let attempts = Arc::new(AtomicU32::new(0));
//! let counter = attempts.clone();
//!
//! let flaky = Effect::suspend(move || {
//!     if counter.fetch_add(1, Ordering::SeqCst) < 2 {
//!         Effect::fail("transient")
//!     } else {
//!         Effect::succeed(42)
//!     }
//! });
//!
//! assert_eq!(run_sync(flaky.retry(Schedule::recurs(5))), Exit::Success(42));
//! assert_eq!(attempts.load(Ordering::SeqCst), 3);
//! ```
//!
//! # Strategies
//!
//! - **Recurs**: fixed number of immediate re-runs (`times: n`)
//! - **Spaced**: fixed delay between runs
//! - **Linear**: 100ms, 200ms, 300ms, ...
//! - **Exponential**: 100ms, 200ms, 400ms, ...
//! - **Fibonacci**: 100ms, 100ms, 200ms, 300ms, 500ms, ...

mod policy;

pub use policy::{Decision, Schedule, ScheduleState};
