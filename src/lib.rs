//! # Undertow
//!
//! A small effect runtime kernel.
//!
//! Programs are written as lazy [`Effect`] descriptions with typed failures,
//! their dependencies are supplied through a [`Context`] built from
//! [`Layer`]s, and expected failures can be retried under a [`Schedule`].
//! Nothing runs until a description reaches a runtime entry point.
//!
//! ## Three Outcomes
//!
//! Every run ends in an [`Exit`]:
//! - **Success** = the value
//! - **Fail** = an expected, typed error from the error channel
//! - **Die** = a [`Defect`]; error handlers never see it
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::{run_sync, service_tag, Effect, Exit, Layer, Schedule};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! service_tag!(Threshold => u32);
//!
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = calls.clone();
//!
//! let program: Effect<u32, String> = Effect::service::<Threshold>().flat_map(move |threshold| {
//!     let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
//!     if n < threshold {
//!         Effect::fail(format!("attempt {} too early", n))
//!     } else {
//!         Effect::succeed(n)
//!     }
//! });
//!
//! let threshold: Layer = Layer::succeed::<Threshold>(3);
//! let retried = program
//!     .retry(Schedule::recurs(10))
//!     .provide(threshold.widen_error::<String>());
//!
//! assert_eq!(run_sync(retried), Exit::Success(3));
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod context;
pub mod effect;
pub mod either;
pub mod error;
pub mod exit;
pub mod layer;
pub mod runtime;
pub mod schedule;
pub mod testing;

// Re-exports
pub use context::{Context, ServiceKey, Tag};
pub use effect::{CatchTags, Effect, Gen, Halt, Tagged};
pub use either::Either;
pub use error::ConstructionError;
pub use exit::{Cause, Defect, DefectKind, Exit};
pub use layer::Layer;
pub use runtime::{
    run_async, run_exit, run_promise, run_sync, FiberHandle, Resume, Runtime, RuntimeConfig,
};
pub use schedule::{Decision, Schedule, ScheduleState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{Context, Tag};
    pub use crate::effect::{CatchTags, Effect, Gen, Halt, Tagged};
    pub use crate::either::Either;
    pub use crate::exit::{Cause, Defect, Exit};
    pub use crate::layer::Layer;
    pub use crate::runtime::{run_async, run_exit, run_promise, run_sync, Runtime};
    pub use crate::schedule::Schedule;
    pub use crate::service_tag;
}
