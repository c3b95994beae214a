//! A right-biased sum type used to reify effect outcomes as data.
//!
//! [`Effect::either`](crate::Effect::either) turns a failure into `Left(error)`
//! and a success into `Right(value)`, and `all_either` returns one `Either`
//! per input slot. By convention `Right` is the happy path: `map` operates on
//! it and `Left` passes through.
//!
//! ```rust
//! use undertow::Either;
//!
//! let outcomes: Vec<Either<String, i32>> = vec![
//!     Either::left("odd 1".to_string()),
//!     Either::right(2),
//!     Either::left("odd 3".to_string()),
//! ];
//!
//! let (failures, successes) = undertow::either::partition(outcomes);
//! assert_eq!(failures, vec!["odd 1".to_string(), "odd 3".to_string()]);
//! assert_eq!(successes, vec![2]);
//! ```

/// A value that is either `Left(L)` or `Right(R)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Either<L, R> {
    /// The left variant
    Left(L),
    /// The right variant
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Create a Left value.
    #[inline]
    pub fn left(value: L) -> Self {
        Either::Left(value)
    }

    /// Create a Right value.
    #[inline]
    pub fn right(value: R) -> Self {
        Either::Right(value)
    }

    /// Returns `true` if this is a `Left` value.
    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    /// Returns `true` if this is a `Right` value.
    #[inline]
    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// Returns the left value if present, consuming self.
    #[inline]
    pub fn into_left(self) -> Option<L> {
        match self {
            Either::Left(l) => Some(l),
            Either::Right(_) => None,
        }
    }

    /// Returns the right value if present, consuming self.
    #[inline]
    pub fn into_right(self) -> Option<R> {
        match self {
            Either::Left(_) => None,
            Either::Right(r) => Some(r),
        }
    }

    /// Borrow the contents.
    #[inline]
    pub fn as_ref(&self) -> Either<&L, &R> {
        match self {
            Either::Left(l) => Either::Left(l),
            Either::Right(r) => Either::Right(r),
        }
    }

    /// Transform the left value.
    pub fn map_left<L2, F>(self, f: F) -> Either<L2, R>
    where
        F: FnOnce(L) -> L2,
    {
        match self {
            Either::Left(l) => Either::Left(f(l)),
            Either::Right(r) => Either::Right(r),
        }
    }

    /// Transform the right value (right-biased).
    ///
    /// ```rust
    /// use undertow::Either;
    ///
    /// let e: Either<&str, i32> = Either::right(21);
    /// assert_eq!(e.map(|x| x * 2), Either::right(42));
    /// ```
    pub fn map<R2, F>(self, f: F) -> Either<L, R2>
    where
        F: FnOnce(R) -> R2,
    {
        match self {
            Either::Left(l) => Either::Left(l),
            Either::Right(r) => Either::Right(f(r)),
        }
    }

    /// Swap the sides.
    #[inline]
    pub fn swap(self) -> Either<R, L> {
        match self {
            Either::Left(l) => Either::Right(l),
            Either::Right(r) => Either::Left(r),
        }
    }

    /// Collapse both sides into one value.
    pub fn fold<T, F, G>(self, left_fn: F, right_fn: G) -> T
    where
        F: FnOnce(L) -> T,
        G: FnOnce(R) -> T,
    {
        match self {
            Either::Left(l) => left_fn(l),
            Either::Right(r) => right_fn(r),
        }
    }

    /// Convert to a `Result`, treating `Right` as `Ok`.
    #[inline]
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Either::Left(l) => Err(l),
            Either::Right(r) => Ok(r),
        }
    }

    /// Convert from a `Result`, mapping `Ok` to `Right`.
    #[inline]
    pub fn from_result(result: Result<R, L>) -> Self {
        match result {
            Ok(r) => Either::Right(r),
            Err(l) => Either::Left(l),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    fn from(result: Result<R, L>) -> Self {
        Either::from_result(result)
    }
}

impl<L, R> From<Either<L, R>> for Result<R, L> {
    fn from(either: Either<L, R>) -> Self {
        either.into_result()
    }
}

/// Split an iterator of `Either` values into lefts and rights, preserving order.
pub fn partition<L, R, I>(iter: I) -> (Vec<L>, Vec<R>)
where
    I: IntoIterator<Item = Either<L, R>>,
{
    let mut lefts = Vec::new();
    let mut rights = Vec::new();

    for either in iter {
        match either {
            Either::Left(l) => lefts.push(l),
            Either::Right(r) => rights.push(r),
        }
    }

    (lefts, rights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_biased_map() {
        let left: Either<&str, i32> = Either::left("err");
        assert_eq!(left.map(|x| x + 1), Either::left("err"));
        assert_eq!(Either::<&str, i32>::right(1).map(|x| x + 1), Either::right(2));
    }

    #[test]
    fn fold_and_swap() {
        let e: Either<i32, &str> = Either::right("hi");
        assert_eq!(e.swap(), Either::left("hi"));
        assert_eq!(e.fold(|n| n.to_string(), |s| s.to_uppercase()), "HI");
    }

    #[test]
    fn result_round_trip() {
        let e: Either<String, i32> = Ok(3).into();
        assert_eq!(e, Either::Right(3));
        let r: Result<i32, String> = Either::left("bad".to_string()).into();
        assert_eq!(r, Err("bad".to_string()));
    }

    #[test]
    fn partition_preserves_order() {
        let items = vec![
            Either::left(1),
            Either::right("a"),
            Either::left(2),
            Either::right("b"),
        ];
        let (lefts, rights) = partition(items);
        assert_eq!(lefts, vec![1, 2]);
        assert_eq!(rights, vec!["a", "b"]);
    }
}
