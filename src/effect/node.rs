//! The erased description tree walked by the interpreter.
//!
//! `Effect<A, E>` is a typed handle over an `Arc<Node>`. Values and errors
//! travel through the tree as `Box<dyn Any + Send>`; the typed combinators
//! box on the way in and downcast on the way out, so a mismatch can only come
//! from a bug in this crate and surfaces as a `TypeMismatch` defect.

use std::any::{type_name, Any};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::BoxFuture;

use crate::context::{Context, ServiceKey};
use crate::exit::{Defect, Exit};
use crate::schedule::Schedule;

use super::gen::GenScope;

pub(crate) type Value = Box<dyn Any + Send>;
pub(crate) type RawExit = Exit<Value, Value>;
/// Per-child outcomes collected by `Node::All`, in input order.
pub(crate) type Outcomes = Vec<Result<Value, Value>>;

pub(crate) type Thunk = Arc<dyn Fn() -> RawExit + Send + Sync>;
pub(crate) type Cont = Arc<dyn Fn(Value) -> Step + Send + Sync>;
pub(crate) type DefectHandler = Arc<dyn Fn(Defect) -> Step + Send + Sync>;
pub(crate) type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub(crate) type Register = Arc<dyn Fn(oneshot::Sender<Resumed>) + Send + Sync>;
pub(crate) type MakeFuture = Arc<dyn Fn() -> BoxFuture<'static, RawExit> + Send + Sync>;
pub(crate) type GenBody = Arc<dyn Fn(GenScope) -> BoxFuture<'static, RawExit> + Send + Sync>;
pub(crate) type Extract = Arc<dyn Fn(&Context) -> Option<Value> + Send + Sync>;

/// What a continuation asks the interpreter to do next.
pub(crate) enum Step {
    Done(RawExit),
    Next(Arc<Node>),
}

impl Step {
    pub(crate) fn succeed<T: Send + 'static>(value: T) -> Self {
        Step::Done(Exit::Success(Box::new(value)))
    }

    pub(crate) fn fail<T: Send + 'static>(error: T) -> Self {
        Step::Done(Exit::Fail(Box::new(error)))
    }

    pub(crate) fn die(defect: Defect) -> Self {
        Step::Done(Exit::Die(defect))
    }
}

/// Payload delivered by an async callback.
pub(crate) enum Resumed {
    Exit(RawExit),
    Effect(Arc<Node>),
}

/// How `Node::All` treats failures of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collect {
    /// Stop at the first failure.
    ShortCircuit,
    /// Run every child and report each outcome.
    Every,
}

/// Whether a recurring node re-runs on failure or on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recur {
    Retry,
    Repeat,
}

pub(crate) enum Node {
    /// Synchronous leaf: pure values, failures, defects and thunks.
    Exit(Thunk),
    Suspend(Arc<dyn Fn() -> Arc<Node> + Send + Sync>),
    Async(Register),
    Promise(MakeFuture),
    FlatMap(Arc<Node>, Cont),
    Fold {
        source: Arc<Node>,
        on_success: Option<Cont>,
        on_failure: Option<Cont>,
    },
    CatchDefect(Arc<Node>, DefectHandler),
    Recur {
        source: Arc<Node>,
        schedule: Schedule,
        recur: Recur,
        filter: Option<Predicate>,
    },
    Service(ServiceKey, Extract),
    Provide(Arc<Node>, Context),
    Sleep(Duration),
    Timeout(Arc<Node>, Duration),
    All {
        children: Arc<[Arc<Node>]>,
        collect: Collect,
        parallel: bool,
    },
    Race(Arc<[Arc<Node>]>),
    Gen(GenBody),
}

impl Node {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Node::Exit(_) => "Exit",
            Node::Suspend(_) => "Suspend",
            Node::Async(_) => "Async",
            Node::Promise(_) => "Promise",
            Node::FlatMap(..) => "FlatMap",
            Node::Fold { .. } => "Fold",
            Node::CatchDefect(..) => "CatchDefect",
            Node::Recur { .. } => "Recur",
            Node::Service(..) => "Service",
            Node::Provide(..) => "Provide",
            Node::Sleep(_) => "Sleep",
            Node::Timeout(..) => "Timeout",
            Node::All { .. } => "All",
            Node::Race(_) => "Race",
            Node::Gen(_) => "Gen",
        }
    }

    pub(crate) fn exit(thunk: impl Fn() -> RawExit + Send + Sync + 'static) -> Arc<Node> {
        Arc::new(Node::Exit(Arc::new(thunk)))
    }

    pub(crate) fn flat_map(source: Arc<Node>, cont: Cont) -> Arc<Node> {
        Arc::new(Node::FlatMap(source, cont))
    }

    pub(crate) fn on_failure(source: Arc<Node>, cont: Cont) -> Arc<Node> {
        Arc::new(Node::Fold {
            source,
            on_success: None,
            on_failure: Some(cont),
        })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Service(key, _) => write!(f, "Service({})", key.name()),
            Node::Sleep(d) => write!(f, "Sleep({:?})", d),
            other => f.write_str(other.name()),
        }
    }
}

pub(crate) fn downcast<T: 'static>(value: Value) -> Result<T, Defect> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Defect::type_mismatch(type_name::<T>()))
}

/// Wrap a typed continuation so it accepts an erased value.
pub(crate) fn cont<T, F>(f: F) -> Cont
where
    T: 'static,
    F: Fn(T) -> Step + Send + Sync + 'static,
{
    Arc::new(move |value: Value| match downcast::<T>(value) {
        Ok(typed) => f(typed),
        Err(defect) => Step::die(defect),
    })
}

/// Run a user-supplied closure, turning a panic into a defect.
pub(crate) fn guard<T>(f: impl FnOnce() -> T) -> Result<T, Defect> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let defect = Defect::from_panic(payload);
        tracing::warn!(defect = %defect, "captured panic as defect");
        defect
    })
}

pub(crate) fn typed_exit<A: 'static, E: 'static>(raw: RawExit) -> Exit<A, E> {
    match raw {
        Exit::Success(value) => match downcast::<A>(value) {
            Ok(a) => Exit::Success(a),
            Err(defect) => Exit::Die(defect),
        },
        Exit::Fail(error) => match downcast::<E>(error) {
            Ok(e) => Exit::Fail(e),
            Err(defect) => Exit::Die(defect),
        },
        Exit::Die(defect) => Exit::Die(defect),
    }
}

pub(crate) fn erase_exit<A: Send + 'static, E: Send + 'static>(exit: Exit<A, E>) -> RawExit {
    match exit {
        Exit::Success(a) => Exit::Success(Box::new(a)),
        Exit::Fail(e) => Exit::Fail(Box::new(e)),
        Exit::Die(d) => Exit::Die(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_reports_expected_type() {
        let value: Value = Box::new(1u8);
        let err = downcast::<String>(value).unwrap_err();
        assert!(err.message().contains("String"));
    }

    #[test]
    fn cont_rejects_wrong_type() {
        let k = cont(|n: i32| Step::succeed(n + 1));
        match k(Box::new("not a number")) {
            Step::Done(Exit::Die(d)) => {
                assert_eq!(d.kind(), &crate::DefectKind::TypeMismatch)
            }
            _ => panic!("expected a type mismatch defect"),
        }
    }

    #[test]
    fn guard_catches_panics() {
        let result: Result<(), Defect> = guard(|| panic!("inside guard"));
        assert_eq!(result.unwrap_err().message(), "inside guard");
    }

    #[test]
    fn typed_exit_round_trips() {
        let raw = erase_exit::<i32, String>(Exit::Fail("bad".to_string()));
        assert_eq!(typed_exit::<i32, String>(raw), Exit::Fail("bad".to_string()));
    }
}
