//! Combinators on [`Effect`](crate::Effect).
//!
//! Every combinator returns a new description and leaves its inputs
//! untouched. Nothing runs until the result is handed to a runtime.

mod collect;
mod provide;
mod recover;
mod recur;
mod sequence;

pub use recover::{CatchTags, Tagged};
