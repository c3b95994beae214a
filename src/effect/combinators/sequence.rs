//! Sequencing: map, flat_map, zip and friends.

use std::sync::Arc;

use crate::effect::node::{cont, downcast, Collect, Node, Outcomes, Step};
use crate::effect::Effect;
use crate::exit::Defect;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Transform the success value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let effect: Effect<i32> = Effect::succeed(5).map(|x| x * 2);
    /// assert_eq!(run_sync(effect), Exit::Success(10));
    /// ```
    pub fn map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Effect::from_node(Node::flat_map(
            self.node,
            cont(move |a: A| Step::succeed(f(a))),
        ))
    }

    /// Chain an effect that depends on the success value.
    ///
    /// A failure or defect skips `f` entirely.
    pub fn flat_map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: Fn(A) -> Effect<B, E> + Send + Sync + 'static,
    {
        Effect::from_node(Node::flat_map(
            self.node,
            cont(move |a: A| Step::Next(f(a).into_node())),
        ))
    }

    /// Observe the success value without changing it.
    pub fn tap<F>(self, f: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.map(move |a| {
            f(&a);
            a
        })
    }

    /// Observe the error without changing it.
    pub fn tap_error<F>(self, f: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        Effect::from_node(Node::on_failure(
            self.node,
            cont(move |e: E| {
                f(&e);
                Step::fail(e)
            }),
        ))
    }

    /// Run both effects in order and pair their values.
    pub fn zip<B>(self, other: Effect<B, E>) -> Effect<(A, B), E>
    where
        B: Send + 'static,
    {
        self.zip_with(other, |a, b| (a, b))
    }

    /// Run both effects in order and combine their values with `f`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let sum: Effect<i32> = Effect::succeed(2).zip_with(Effect::succeed(3), |a, b| a + b);
    /// assert_eq!(run_sync(sum), Exit::Success(5));
    /// ```
    pub fn zip_with<B, C, F>(self, other: Effect<B, E>, f: F) -> Effect<C, E>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let pair = Arc::new(Node::All {
            children: Arc::from(vec![self.node, other.node]),
            collect: Collect::ShortCircuit,
            parallel: false,
        });
        Effect::from_node(Node::flat_map(
            pair,
            cont(move |outcomes: Outcomes| {
                let mut outcomes = outcomes.into_iter();
                match (outcomes.next(), outcomes.next()) {
                    (Some(Ok(a)), Some(Ok(b))) => match (downcast::<A>(a), downcast::<B>(b)) {
                        (Ok(a), Ok(b)) => Step::succeed(f(a, b)),
                        (Err(defect), _) | (_, Err(defect)) => Step::die(defect),
                    },
                    _ => Step::die(Defect::type_mismatch("two successful outcomes")),
                }
            }),
        ))
    }

    /// Run `self`, then `other`, keeping only the second value.
    pub fn zip_right<B>(self, other: Effect<B, E>) -> Effect<B, E>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| other.clone())
    }

    /// Replace the success value with `value`.
    pub fn as_value<B>(self, value: B) -> Effect<B, E>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Discard the success value.
    pub fn unit(self) -> Effect<(), E> {
        self.map(|_| ())
    }
}
