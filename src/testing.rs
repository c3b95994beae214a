//! Testing utilities for code built on undertow
//!
//! This module provides a builder for mock service contexts and assertion
//! macros over [`Exit`](crate::Exit).
//!
//! # Examples
//!
//! ## TestContext Builder
//!
//! ```rust
//! use undertow::service_tag;
//! use undertow::testing::TestContext;
//!
//! #[derive(Clone)]
//! struct Database {
//!     rows: Vec<String>,
//! }
//!
//! service_tag!(DatabaseTag => Database);
//!
//! let ctx = TestContext::new()
//!     .with::<DatabaseTag>(Database { rows: vec!["test".to_string()] })
//!     .build();
//! assert!(ctx.contains::<DatabaseTag>());
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use undertow::{assert_fail, assert_success, run_sync, Effect};
//!
//! let ok: Effect<i32, String> = Effect::succeed(42);
//! assert_success!(run_sync(ok), 42);
//!
//! let err: Effect<i32, String> = Effect::fail("error".to_string());
//! assert_fail!(run_sync(err));
//! ```

use crate::context::{Context, Tag};
use crate::runtime::{Runtime, RuntimeConfig};

/// Builder for contexts filled with mock services.
///
/// # Example
///
/// ```rust
/// use undertow::{service_tag, Effect, Exit};
/// use undertow::testing::TestContext;
///
/// service_tag!(Seed => u64);
/// service_tag!(Name => String);
///
/// let runtime = TestContext::new()
///     .with::<Seed>(7)
///     .with_fn::<Name, _>(|| "fixture".to_string())
///     .runtime();
///
/// let effect: Effect<String> = Effect::service::<Name>()
///     .zip(Effect::service::<Seed>())
///     .map(|(name, seed)| format!("{}-{}", name, seed));
/// assert_eq!(runtime.run_sync(effect), Exit::Success("fixture-7".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    context: Context,
}

impl TestContext {
    /// Create an empty test context.
    pub fn new() -> Self {
        TestContext::default()
    }

    /// Register `service` under `T`.
    pub fn with<T: Tag>(self, service: T::Service) -> Self {
        TestContext {
            context: self.context.add::<T>(service),
        }
    }

    /// Register the service created by `f` under `T`.
    pub fn with_fn<T, F>(self, f: F) -> Self
    where
        T: Tag,
        F: FnOnce() -> T::Service,
    {
        self.with::<T>(f())
    }

    /// Build the final context.
    pub fn build(self) -> Context {
        self.context
    }

    /// A runtime over this context that skips every delay.
    pub fn runtime(self) -> Runtime {
        Runtime::with_context(self.context).config(RuntimeConfig::new().honor_delays(false))
    }
}

/// Assert that an exit is a success, optionally with a given value.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_success, Exit};
///
/// let exit: Exit<i32, String> = Exit::Success(42);
/// assert_success!(exit.clone());
/// assert_success!(exit, 42);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($exit:expr) => {
        match $exit {
            $crate::Exit::Success(_) => {}
            $crate::Exit::Fail(e) => {
                panic!("Expected Success, got Fail: {:?}", e);
            }
            $crate::Exit::Die(d) => {
                panic!("Expected Success, got Die: {:?}", d);
            }
        }
    };
    ($exit:expr, $expected:expr) => {
        match $exit {
            $crate::Exit::Success(v) => {
                assert_eq!(v, $expected);
            }
            $crate::Exit::Fail(e) => {
                panic!("Expected Success {:?}, got Fail: {:?}", $expected, e);
            }
            $crate::Exit::Die(d) => {
                panic!("Expected Success {:?}, got Die: {:?}", $expected, d);
            }
        }
    };
}

/// Assert that an exit is an expected failure, optionally with a given error.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_fail, Exit};
///
/// let exit: Exit<i32, &str> = Exit::Fail("boom");
/// assert_fail!(exit.clone());
/// assert_fail!(exit, "boom");
/// ```
#[macro_export]
macro_rules! assert_fail {
    ($exit:expr) => {
        match $exit {
            $crate::Exit::Fail(_) => {}
            $crate::Exit::Success(v) => {
                panic!("Expected Fail, got Success: {:?}", v);
            }
            $crate::Exit::Die(d) => {
                panic!("Expected Fail, got Die: {:?}", d);
            }
        }
    };
    ($exit:expr, $expected:expr) => {
        match $exit {
            $crate::Exit::Fail(e) => {
                assert_eq!(e, $expected);
            }
            $crate::Exit::Success(v) => {
                panic!("Expected Fail {:?}, got Success: {:?}", $expected, v);
            }
            $crate::Exit::Die(d) => {
                panic!("Expected Fail {:?}, got Die: {:?}", $expected, d);
            }
        }
    };
}

/// Assert that an exit is a defect, optionally of a kind matching a pattern.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_die, Defect, DefectKind, Exit};
///
/// let exit: Exit<i32, String> = Exit::Die(Defect::new("broken"));
/// assert_die!(exit.clone());
/// assert_die!(exit, DefectKind::Raised);
/// ```
#[macro_export]
macro_rules! assert_die {
    ($exit:expr) => {
        match $exit {
            $crate::Exit::Die(_) => {}
            $crate::Exit::Success(v) => {
                panic!("Expected Die, got Success: {:?}", v);
            }
            $crate::Exit::Fail(e) => {
                panic!("Expected Die, got Fail: {:?}", e);
            }
        }
    };
    ($exit:expr, $kind:pat) => {
        match $exit {
            $crate::Exit::Die(d) => {
                assert!(
                    matches!(d.kind(), $kind),
                    "Expected Die of kind {}, got {:?}",
                    stringify!($kind),
                    d
                );
            }
            $crate::Exit::Success(v) => {
                panic!("Expected Die, got Success: {:?}", v);
            }
            $crate::Exit::Fail(e) => {
                panic!("Expected Die, got Fail: {:?}", e);
            }
        }
    };
}
