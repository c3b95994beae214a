//! Schedule-driven re-execution and time limits.

use std::sync::Arc;
use std::time::Duration;

use crate::effect::node::{cont, downcast, Node, Predicate, Recur, Step, Value};
use crate::effect::Effect;
use crate::schedule::Schedule;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Re-run the effect after each failure while `schedule` allows it.
    ///
    /// With `Schedule::recurs(n)` the effect runs at most `n + 1` times. If the
    /// schedule is exhausted, the last failure is reported. Defects are never
    /// retried.
    pub fn retry(self, schedule: Schedule) -> Self {
        Effect::from_node(Arc::new(Node::Recur {
            source: self.node,
            schedule,
            recur: Recur::Retry,
            filter: None,
        }))
    }

    /// Like [`Effect::retry`], but only failures matching `predicate` are
    /// retried. Any other failure is reported immediately.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit, Schedule};
    ///
    /// let fatal: Effect<i32, &str> = Effect::fail("fatal");
    /// let effect = fatal.retry_while(Schedule::forever(), |e| *e == "transient");
    /// assert_eq!(run_sync(effect), Exit::Fail("fatal"));
    /// ```
    pub fn retry_while<P>(self, schedule: Schedule, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let filter: Predicate =
            Arc::new(move |error: &Value| error.downcast_ref::<E>().is_some_and(&predicate));
        Effect::from_node(Arc::new(Node::Recur {
            source: self.node,
            schedule,
            recur: Recur::Retry,
            filter: Some(filter),
        }))
    }

    /// Re-run the effect after each success while `schedule` allows it.
    ///
    /// The value of the last run is the result. A failure stops the repetition
    /// and is reported.
    pub fn repeat(self, schedule: Schedule) -> Self {
        Effect::from_node(Arc::new(Node::Recur {
            source: self.node,
            schedule,
            recur: Recur::Repeat,
            filter: None,
        }))
    }

    /// Give up with `None` if the effect has not finished within `duration`.
    ///
    /// The unfinished run is cancelled. Only an async run can enforce a
    /// deadline; a sync run dies with
    /// [`DefectKind::AsyncInSyncRun`](crate::DefectKind::AsyncInSyncRun).
    pub fn timeout(self, duration: Duration) -> Effect<Option<A>, E> {
        let node = Arc::new(Node::Timeout(self.node, duration));
        Effect::from_node(Node::flat_map(
            node,
            cont(|finished: Option<Value>| match finished {
                Some(value) => match downcast::<A>(value) {
                    Ok(a) => Step::succeed(Some(a)),
                    Err(defect) => Step::die(defect),
                },
                None => Step::succeed(None::<A>),
            }),
        ))
    }
}
