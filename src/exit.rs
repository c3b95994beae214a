//! Outcome of running an effect
//!
//! An [`Exit`] is the three-way result of interpreting an effect description:
//!
//! - **Success**: the effect produced its value
//! - **Fail**: the effect failed with an *expected*, typed error
//! - **Die**: the effect hit a *defect* (a panic, a missing service, misuse of
//!   the runtime) that ordinary error handlers never see
//!
//! # Examples
//!
//! ```
//! use undertow::Exit;
//!
//! let ok: Exit<i32, String> = Exit::Success(21);
//! assert_eq!(ok.map(|x| x * 2), Exit::Success(42));
//!
//! let failed: Exit<i32, &str> = Exit::Fail("boom");
//! assert_eq!(failed.map_error(|e| e.len()), Exit::Fail(4));
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// The outcome of running an effect.
///
/// Exactly one variant is ever populated. `Die` is never matched by the
/// error-channel handlers of this type: [`Exit::map_error`] leaves it untouched
/// and [`Exit::fold`] escalates it instead of passing it to `on_fail`.
#[derive(Debug, Clone, PartialEq)]
pub enum Exit<A, E> {
    /// The effect succeeded with a value
    Success(A),
    /// The effect failed with an expected error
    Fail(E),
    /// The effect died with a defect
    Die(Defect),
}

impl<A, E> Exit<A, E> {
    /// Returns `true` for `Success`.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Exit::Success(_))
    }

    /// Returns `true` for `Fail`.
    #[inline]
    pub fn is_fail(&self) -> bool {
        matches!(self, Exit::Fail(_))
    }

    /// Returns `true` for `Die`.
    #[inline]
    pub fn is_die(&self) -> bool {
        matches!(self, Exit::Die(_))
    }

    /// Transform the success value. `Fail` and `Die` pass through.
    pub fn map<B, F>(self, f: F) -> Exit<B, E>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Exit::Success(a) => Exit::Success(f(a)),
            Exit::Fail(e) => Exit::Fail(e),
            Exit::Die(d) => Exit::Die(d),
        }
    }

    /// Transform the expected error. `Success` and `Die` pass through.
    pub fn map_error<E2, F>(self, f: F) -> Exit<A, E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Exit::Success(a) => Exit::Success(a),
            Exit::Fail(e) => Exit::Fail(f(e)),
            Exit::Die(d) => Exit::Die(d),
        }
    }

    /// Transform both channels at once.
    pub fn map_both<B, E2, F, G>(self, on_success: F, on_fail: G) -> Exit<B, E2>
    where
        F: FnOnce(A) -> B,
        G: FnOnce(E) -> E2,
    {
        match self {
            Exit::Success(a) => Exit::Success(on_success(a)),
            Exit::Fail(e) => Exit::Fail(on_fail(e)),
            Exit::Die(d) => Exit::Die(d),
        }
    }

    /// Fold success and failure into a single value.
    ///
    /// A `Die` is not foldable: it is escalated as `Err(defect)` so that a
    /// handler written only for the expected error can never swallow it.
    ///
    /// ```
    /// use undertow::{Defect, Exit};
    ///
    /// let exit: Exit<i32, &str> = Exit::Fail("nope");
    /// assert_eq!(exit.fold(|n| n.to_string(), |e| e.to_uppercase()), Ok("NOPE".to_string()));
    ///
    /// let died: Exit<i32, &str> = Exit::Die(Defect::new("bug"));
    /// assert!(died.fold(|n| n, |_| 0).is_err());
    /// ```
    pub fn fold<T, F, G>(self, on_success: F, on_fail: G) -> Result<T, Defect>
    where
        F: FnOnce(A) -> T,
        G: FnOnce(E) -> T,
    {
        match self {
            Exit::Success(a) => Ok(on_success(a)),
            Exit::Fail(e) => Ok(on_fail(e)),
            Exit::Die(d) => Err(d),
        }
    }

    /// Combine two exits. The first non-success wins.
    pub fn zip<B>(self, other: Exit<B, E>) -> Exit<(A, B), E> {
        match (self, other) {
            (Exit::Success(a), Exit::Success(b)) => Exit::Success((a, b)),
            (Exit::Success(_), Exit::Fail(e)) | (Exit::Fail(e), _) => Exit::Fail(e),
            (Exit::Success(_), Exit::Die(d)) | (Exit::Die(d), _) => Exit::Die(d),
        }
    }

    /// The success value, if any.
    pub fn success(self) -> Option<A> {
        match self {
            Exit::Success(a) => Some(a),
            _ => None,
        }
    }

    /// The non-success half of this exit, if any.
    pub fn cause(self) -> Option<Cause<E>> {
        match self {
            Exit::Success(_) => None,
            Exit::Fail(e) => Some(Cause::Fail(e)),
            Exit::Die(d) => Some(Cause::Die(d)),
        }
    }

    /// Convert into a standard `Result`, keeping the two kinds of failure apart.
    pub fn into_result(self) -> Result<A, Cause<E>> {
        match self {
            Exit::Success(a) => Ok(a),
            Exit::Fail(e) => Err(Cause::Fail(e)),
            Exit::Die(d) => Err(Cause::Die(d)),
        }
    }

    /// Build an exit from a standard `Result`; `Err` becomes `Fail`.
    pub fn from_result(result: Result<A, E>) -> Self {
        match result {
            Ok(a) => Exit::Success(a),
            Err(e) => Exit::Fail(e),
        }
    }
}

impl<A, E> From<Cause<E>> for Exit<A, E> {
    fn from(cause: Cause<E>) -> Self {
        match cause {
            Cause::Fail(e) => Exit::Fail(e),
            Cause::Die(d) => Exit::Die(d),
        }
    }
}

/// Why an effect did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum Cause<E> {
    /// An expected, typed error
    Fail(E),
    /// An unexpected defect
    Die(Defect),
}

impl<E> Cause<E> {
    /// Transform the expected error, leaving a defect untouched.
    pub fn map<E2, F>(self, f: F) -> Cause<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Cause::Fail(e) => Cause::Fail(f(e)),
            Cause::Die(d) => Cause::Die(d),
        }
    }

    /// The expected error, if this cause is a `Fail`.
    pub fn into_fail(self) -> Option<E> {
        match self {
            Cause::Fail(e) => Some(e),
            Cause::Die(_) => None,
        }
    }

    /// The defect, if this cause is a `Die`.
    pub fn defect(&self) -> Option<&Defect> {
        match self {
            Cause::Fail(_) => None,
            Cause::Die(d) => Some(d),
        }
    }

    /// Returns `true` for `Die`.
    pub fn is_die(&self) -> bool {
        matches!(self, Cause::Die(_))
    }
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Fail(e) => write!(f, "{}", e),
            Cause::Die(d) => write!(f, "{}", d),
        }
    }
}

impl<E: StdError + 'static> StdError for Cause<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Cause::Fail(e) => Some(e),
            Cause::Die(d) => Some(d),
        }
    }
}

/// The category of a defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefectKind {
    /// A closure invoked by the runtime panicked
    Panic,
    /// Raised explicitly through `die`
    Raised,
    /// A required service was not present in the context
    MissingService {
        /// Name of the missing tag
        service: &'static str,
    },
    /// A synchronous run reached a node that can only complete asynchronously
    AsyncInSyncRun,
    /// The fiber was cancelled before it completed
    Interrupted,
    /// An async callback handle was dropped without resuming
    ResumeDropped,
    /// An internal value did not have the type its description promised
    TypeMismatch,
}

/// An unexpected fault: a programming error surfaced as an unrecoverable outcome.
///
/// ```
/// use undertow::{Defect, DefectKind};
///
/// let defect = Defect::new("invariant broken");
/// assert_eq!(defect.kind(), &DefectKind::Raised);
/// assert_eq!(defect.to_string(), "invariant broken");
/// ```
#[derive(Clone)]
pub struct Defect {
    kind: DefectKind,
    message: String,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Defect {
    /// Create a defect with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(DefectKind::Raised, message)
    }

    /// Create a defect of a specific kind.
    pub fn with_kind(kind: DefectKind, message: impl Into<String>) -> Self {
        Defect {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error value as a defect, keeping it as the source.
    pub fn from_error<Err>(error: Err) -> Self
    where
        Err: StdError + Send + Sync + 'static,
    {
        Defect {
            kind: DefectKind::Raised,
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Build a defect from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self::with_kind(DefectKind::Panic, message)
    }

    pub(crate) fn missing_service(service: &'static str) -> Self {
        Self::with_kind(
            DefectKind::MissingService { service },
            format!("service not found in context: {}", service),
        )
    }

    pub(crate) fn async_in_sync(what: &str) -> Self {
        Self::with_kind(
            DefectKind::AsyncInSyncRun,
            format!("cannot run {} synchronously; use an async entry point", what),
        )
    }

    pub(crate) fn interrupted() -> Self {
        Self::with_kind(DefectKind::Interrupted, "fiber was interrupted")
    }

    pub(crate) fn type_mismatch(expected: &'static str) -> Self {
        Self::with_kind(
            DefectKind::TypeMismatch,
            format!("value did not have expected type {}", expected),
        )
    }

    /// The defect category.
    pub fn kind(&self) -> &DefectKind {
        &self.kind
    }

    /// The defect message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defect")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

// Defects compare by kind and message; the source is diagnostic only.
impl PartialEq for Defect {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Defect {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| &**s as &(dyn StdError + 'static))
    }
}

impl From<&str> for Defect {
    fn from(message: &str) -> Self {
        Defect::new(message)
    }
}

impl From<String> for Defect {
    fn from(message: String) -> Self {
        Defect::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_only_touches_success() {
        let ok: Exit<i32, String> = Exit::Success(1);
        assert_eq!(ok.map(|x| x + 1), Exit::Success(2));

        let failed: Exit<i32, &str> = Exit::Fail("e");
        assert_eq!(failed.map(|x| x + 1), Exit::Fail("e"));

        let died: Exit<i32, &str> = Exit::Die(Defect::new("d"));
        assert!(died.map(|x| x + 1).is_die());
    }

    #[test]
    fn map_error_never_touches_die() {
        let died: Exit<i32, &str> = Exit::Die(Defect::new("d"));
        let mapped = died.map_error(|_| "handled");
        assert_eq!(mapped, Exit::Die(Defect::new("d")));
    }

    #[test]
    fn fold_escalates_die() {
        let died: Exit<i32, &str> = Exit::Die(Defect::new("kaboom"));
        let folded = died.fold(|_| "success", |_| "failure");
        assert_eq!(folded, Err(Defect::new("kaboom")));
    }

    #[test]
    fn into_result_distinguishes_fail_and_die() {
        let failed: Exit<(), &str> = Exit::Fail("e");
        assert_eq!(failed.into_result(), Err(Cause::Fail("e")));

        let died: Exit<(), &str> = Exit::Die(Defect::new("d"));
        let cause = died.into_result().unwrap_err();
        assert!(cause.is_die());
        assert_eq!(cause.into_fail(), None);
    }

    #[test]
    fn zip_keeps_first_failure() {
        let a: Exit<i32, &str> = Exit::Fail("first");
        let b: Exit<i32, &str> = Exit::Fail("second");
        assert_eq!(a.zip(b), Exit::Fail("first"));

        let a: Exit<i32, &str> = Exit::Success(1);
        let b: Exit<i32, &str> = Exit::Success(2);
        assert_eq!(a.zip(b), Exit::Success((1, 2)));
    }

    #[test]
    fn defect_from_panic_payloads() {
        let d = Defect::from_panic(Box::new("static message"));
        assert_eq!(d.message(), "static message");
        assert_eq!(d.kind(), &DefectKind::Panic);

        let d = Defect::from_panic(Box::new(String::from("owned message")));
        assert_eq!(d.message(), "owned message");

        let d = Defect::from_panic(Box::new(42u8));
        assert_eq!(d.message(), "panic with a non-string payload");
    }

    #[test]
    fn defect_from_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.json");
        let d = Defect::from_error(io);
        assert_eq!(d.to_string(), "config.json");
        assert!(StdError::source(&d).is_some());
    }
}
