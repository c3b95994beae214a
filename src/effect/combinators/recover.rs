//! Error-channel combinators.
//!
//! None of these handlers ever sees a defect. A `Die` outcome passes through
//! `catch_all`, `catch_tag`, `or_else` and the rest untouched; only
//! [`Effect::catch_defect`] can observe it.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use crate::effect::node::{cont, DefectHandler, Node, Step};
use crate::effect::Effect;
use crate::either::Either;
use crate::exit::Defect;

/// An error that carries a discriminating tag.
///
/// ```rust
/// use undertow::Tagged;
///
/// #[derive(Debug, Clone)]
/// enum AppError {
///     Auth,
///     Parse(String),
/// }
///
/// impl Tagged for AppError {
///     fn tag(&self) -> &str {
///         match self {
///             AppError::Auth => "AuthError",
///             AppError::Parse(_) => "ParseError",
///         }
///     }
/// }
/// ```
pub trait Tagged {
    /// The discriminator.
    fn tag(&self) -> &str;
}

type TagHandler<A, E> = Arc<dyn Fn(E) -> Effect<A, E> + Send + Sync>;

/// Handlers keyed by error tag, for [`Effect::catch_tags`].
pub struct CatchTags<A, E> {
    handlers: Vec<(String, TagHandler<A, E>)>,
}

impl<A, E> CatchTags<A, E> {
    /// No handlers.
    pub fn new() -> Self {
        CatchTags {
            handlers: Vec::new(),
        }
    }

    /// Handle errors whose tag is `tag`.
    ///
    /// The first registered handler for a tag wins.
    pub fn on<F>(mut self, tag: impl Into<String>, handler: F) -> Self
    where
        F: Fn(E) -> Effect<A, E> + Send + Sync + 'static,
    {
        self.handlers.push((tag.into(), Arc::new(handler)));
        self
    }
}

impl<A, E> Default for CatchTags<A, E> {
    fn default() -> Self {
        CatchTags::new()
    }
}

impl<A, E> fmt::Debug for CatchTags<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.handlers.iter().map(|(tag, _)| tag.as_str()).collect();
        f.debug_struct("CatchTags").field("tags", &tags).finish()
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Transform the error.
    pub fn map_error<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |e: E| Step::fail(f(e))),
        ))
    }

    /// Recover from any expected failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let effect: Effect<i32, String> = Effect::fail("oops".to_string());
    /// let recovered: Effect<i32> = effect.catch_all(|e| Effect::succeed(e.len() as i32));
    /// assert_eq!(run_sync(recovered), Exit::Success(4));
    /// ```
    pub fn catch_all<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: Fn(E) -> Effect<A, E2> + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |e: E| Step::Next(f(e).into_node())),
        ))
    }

    /// Recover from failures matching `predicate`; others propagate unchanged.
    pub fn catch_if<P, F>(self, predicate: P, f: F) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(E) -> Effect<A, E> + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |e: E| {
                if predicate(&e) {
                    Step::Next(f(e).into_node())
                } else {
                    Step::fail(e)
                }
            }),
        ))
    }

    /// Recover from failures whose [`Tagged::tag`] equals `tag`.
    pub fn catch_tag<F>(self, tag: impl Into<String>, f: F) -> Self
    where
        E: Tagged,
        F: Fn(E) -> Effect<A, E> + Send + Sync + 'static,
    {
        let tag = tag.into();
        self.catch_if(move |e: &E| e.tag() == tag, f)
    }

    /// Recover from several tags at once.
    ///
    /// Errors with no registered handler propagate unchanged.
    pub fn catch_tags(self, handlers: CatchTags<A, E>) -> Self
    where
        E: Tagged,
    {
        let handlers = Arc::new(handlers.handlers);
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |e: E| {
                match handlers.iter().find(|(tag, _)| tag.as_str() == e.tag()) {
                    Some((_, handler)) => Step::Next(handler(e).into_node()),
                    None => Step::fail(e),
                }
            }),
        ))
    }

    /// Replace any failure with the effect built by `f`.
    pub fn or_else<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: Fn() -> Effect<A, E2> + Send + Sync + 'static,
    {
        self.catch_all(move |_| f())
    }

    /// Replace any failure with the error produced by `f`.
    pub fn or_else_fail<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: Fn() -> E2 + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |_: E| Step::fail(f())),
        ))
    }

    /// Replace any failure with the value produced by `f`.
    pub fn or_else_succeed<F>(self, f: F) -> Effect<A, Infallible>
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |_: E| Step::succeed(f())),
        ))
    }

    /// Fold both outcomes into a value; the result cannot fail.
    pub fn match_exit<B, S, F>(self, on_success: S, on_failure: F) -> Effect<B, Infallible>
    where
        B: Send + 'static,
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(E) -> B + Send + Sync + 'static,
    {
        Effect::from_node(Arc::new(Node::Fold {
            source: self.node,
            on_success: Some(cont(move |a: A| Step::succeed(on_success(a)))),
            on_failure: Some(cont(move |e: E| Step::succeed(on_failure(e)))),
        }))
    }

    /// Continue with one of two effects depending on the outcome.
    pub fn match_effect<B, E2, S, F>(self, on_success: S, on_failure: F) -> Effect<B, E2>
    where
        B: Send + 'static,
        E2: Send + 'static,
        S: Fn(A) -> Effect<B, E2> + Send + Sync + 'static,
        F: Fn(E) -> Effect<B, E2> + Send + Sync + 'static,
    {
        Effect::from_node(Arc::new(Node::Fold {
            source: self.node,
            on_success: Some(cont(move |a: A| Step::Next(on_success(a).into_node()))),
            on_failure: Some(cont(move |e: E| Step::Next(on_failure(e).into_node()))),
        }))
    }

    /// Move the outcome into the success channel.
    pub fn either(self) -> Effect<Either<E, A>, Infallible> {
        self.match_exit(Either::Right, Either::Left)
    }

    /// Swap the success and error channels.
    pub fn flip(self) -> Effect<E, A> {
        Effect::from_node(Arc::new(Node::Fold {
            source: self.node,
            on_success: Some(cont(|a: A| Step::fail(a))),
            on_failure: Some(cont(|e: E| Step::succeed(e))),
        }))
    }

    /// Recover from a defect.
    ///
    /// This is the only combinator that observes `Die`. Expected failures
    /// pass through it unchanged.
    pub fn catch_defect<F>(self, f: F) -> Self
    where
        F: Fn(Defect) -> Effect<A, E> + Send + Sync + 'static,
    {
        let handler: DefectHandler = Arc::new(move |defect| Step::Next(f(defect).into_node()));
        Effect::from_node(Arc::new(Node::CatchDefect(self.node, handler)))
    }
}

impl<A: Send + 'static> Effect<A, Infallible> {
    /// View an effect that cannot fail as one with error type `E2`.
    pub fn widen_error<E2: Send + 'static>(self) -> Effect<A, E2> {
        Effect::from_node(self.node)
    }
}
