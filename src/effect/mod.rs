//! Lazy, re-runnable effect descriptions
//!
//! An [`Effect<A, E>`] describes a computation that, when run, either
//! succeeds with an `A`, fails with an expected error `E`, or dies with a
//! [`Defect`](crate::Defect). Building an effect does nothing; only the
//! runtime executes it, and the same description may be executed any number
//! of times. Each execution re-runs every side effect inside it.
//!
//! # Core Concepts
//!
//! - **Descriptions, not actions**: constructors capture closures and values
//!   without running anything
//! - **Typed failures**: `E` lists the expected errors; defects are never part
//!   of `E`
//! - **Services from context**: [`Effect::service`] reads a dependency from the
//!   context supplied at run time
//!
//! # Examples
//!
//! ```
//! use undertow::{run_sync, Effect, Exit};
//!
//! let parsed: Effect<i32, String> = Effect::succeed("21")
//!     .flat_map(|s: &str| match s.parse::<i32>() {
//!         Ok(n) => Effect::succeed(n),
//!         Err(e) => Effect::fail(e.to_string()),
//!     })
//!     .map(|n| n * 2);
//!
//! assert_eq!(run_sync(parsed.clone()), Exit::Success(42));
//! assert_eq!(run_sync(parsed), Exit::Success(42));
//! ```
//!
//! Generator style reads like straight-line code:
//!
//! ```
//! use undertow::{run_sync, Effect, Exit, Halt};
//!
//! let program: Effect<i32, String> = Effect::gen(|cx| async move {
//!     let a = cx.bind(Effect::succeed(20)).await?;
//!     let b = cx.bind(Effect::sync(|| 22)).await?;
//!     if a + b != 42 {
//!         return Err(Halt::fail("bad arithmetic".to_string()));
//!     }
//!     Ok(a + b)
//! });
//!
//! assert_eq!(run_sync(program), Exit::Success(42));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

mod combinators;
mod constructors;
mod gen;
pub(crate) mod node;

pub use combinators::{CatchTags, Tagged};
pub use gen::{Gen, Halt};

pub(crate) use gen::GenScope;
pub(crate) use node::Node;


/// A lazy description of a computation producing `A` or failing with `E`.
///
/// Cloning an effect is cheap and yields the same description.
pub struct Effect<A, E = Infallible> {
    pub(crate) node: Arc<Node>,
    _marker: PhantomData<fn() -> (A, E)>,
}

impl<A, E> Effect<A, E> {
    pub(crate) fn from_node(node: Arc<Node>) -> Self {
        Effect {
            node,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_node(self) -> Arc<Node> {
        self.node
    }
}

impl<A, E> Clone for Effect<A, E> {
    fn clone(&self) -> Self {
        Effect::from_node(self.node.clone())
    }
}

impl<A, E> fmt::Debug for Effect<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("node", &self.node)
            .field("success", &std::any::type_name::<A>())
            .field("error", &std::any::type_name::<E>())
            .finish()
    }
}
