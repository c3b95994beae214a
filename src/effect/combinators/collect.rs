//! Collecting many effects into one.

use std::convert::Infallible;
use std::sync::Arc;

use crate::effect::node::{cont, downcast, Collect, Node, Outcomes, Step};
use crate::effect::Effect;
use crate::either::Either;
use crate::error::ConstructionError;
use crate::exit::Defect;

fn collect_node<A, E, I>(effects: I, collect: Collect, parallel: bool) -> Arc<Node>
where
    I: IntoIterator<Item = Effect<A, E>>,
{
    let children: Vec<Arc<Node>> = effects.into_iter().map(Effect::into_node).collect();
    Arc::new(Node::All {
        children: Arc::from(children),
        collect,
        parallel,
    })
}

fn successes<A: 'static>(outcomes: Outcomes) -> Result<Vec<A>, Defect> {
    outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(value) => downcast::<A>(value),
            Err(_) => Err(Defect::type_mismatch("a successful outcome")),
        })
        .collect()
}

fn all_successes<A: Send + 'static>(outcomes: Outcomes) -> Step {
    match successes::<A>(outcomes) {
        Ok(values) => Step::succeed(values),
        Err(defect) => Step::die(defect),
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Run effects in order, collecting their values.
    ///
    /// Stops at the first failure, which becomes the failure of the whole.
    /// An empty input succeeds with an empty vector.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let effects: Vec<Effect<i32>> = (1..=3).map(Effect::succeed).collect();
    /// assert_eq!(run_sync(Effect::all(effects)), Exit::Success(vec![1, 2, 3]));
    /// ```
    pub fn all<I>(effects: I) -> Effect<Vec<A>, E>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let node = collect_node(effects, Collect::ShortCircuit, false);
        Effect::from_node(Node::flat_map(node, cont(all_successes::<A>)))
    }

    /// Like [`Effect::all`], but the children may run concurrently under an
    /// async run.
    ///
    /// The first failure cancels the children still running. A sync run
    /// evaluates the children in order.
    pub fn all_par<I>(effects: I) -> Effect<Vec<A>, E>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let node = collect_node(effects, Collect::ShortCircuit, true);
        Effect::from_node(Node::flat_map(node, cont(all_successes::<A>)))
    }

    /// Run every effect and accumulate failures by position.
    ///
    /// If any child failed, the result fails with one slot per input: `None`
    /// where the child succeeded and `Some(error)` where it failed. A defect
    /// still aborts the whole.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let checks: Vec<Effect<i32, String>> = (1..=4)
    ///     .map(|n| if n % 2 == 0 { Effect::succeed(n) } else { Effect::fail(format!("odd {}", n)) })
    ///     .collect();
    ///
    /// assert_eq!(
    ///     run_sync(Effect::all_validate(checks)),
    ///     Exit::Fail(vec![Some("odd 1".to_string()), None, Some("odd 3".to_string()), None])
    /// );
    /// ```
    pub fn all_validate<I>(effects: I) -> Effect<Vec<A>, Vec<Option<E>>>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let node = collect_node(effects, Collect::Every, false);
        Effect::from_node(Node::flat_map(
            node,
            cont(|outcomes: Outcomes| {
                if outcomes.iter().all(Result::is_ok) {
                    return all_successes::<A>(outcomes);
                }
                let errors: Result<Vec<Option<E>>, Defect> = outcomes
                    .into_iter()
                    .map(|outcome| match outcome {
                        Ok(_) => Ok(None),
                        Err(error) => downcast::<E>(error).map(Some),
                    })
                    .collect();
                match errors {
                    Ok(errors) => Step::fail(errors),
                    Err(defect) => Step::die(defect),
                }
            }),
        ))
    }

    /// Run every effect and report each outcome as an [`Either`].
    ///
    /// The result never fails with an expected error; a defect still aborts.
    pub fn all_either<I>(effects: I) -> Effect<Vec<Either<E, A>>, Infallible>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let node = collect_node(effects, Collect::Every, false);
        Effect::from_node(Node::flat_map(
            node,
            cont(|outcomes: Outcomes| {
                let results: Result<Vec<Either<E, A>>, Defect> = outcomes
                    .into_iter()
                    .map(|outcome| match outcome {
                        Ok(value) => downcast::<A>(value).map(Either::Right),
                        Err(error) => downcast::<E>(error).map(Either::Left),
                    })
                    .collect();
                match results {
                    Ok(results) => Step::succeed(results),
                    Err(defect) => Step::die(defect),
                }
            }),
        ))
    }

    /// Try effects in order until one succeeds.
    ///
    /// If every effect fails, the last failure is reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyInput`] when `effects` is empty.
    pub fn first_success_of<I>(effects: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let mut effects = effects.into_iter();
        let first = effects.next().ok_or(ConstructionError::EmptyInput {
            combinator: "first_success_of",
        })?;
        Ok(effects.fold(first, |acc, next| acc.catch_all(move |_| next.clone())))
    }

    /// Run effects concurrently and keep the first success.
    ///
    /// The losers are cancelled. If every effect fails, the failure that
    /// arrived last is reported. A sync run tries the effects in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyInput`] when `effects` is empty.
    pub fn race<I>(effects: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Effect<A, E>>,
    {
        let children: Vec<Arc<Node>> = effects.into_iter().map(Effect::into_node).collect();
        if children.is_empty() {
            return Err(ConstructionError::EmptyInput { combinator: "race" });
        }
        Ok(Effect::from_node(Arc::new(Node::Race(Arc::from(children)))))
    }
}
