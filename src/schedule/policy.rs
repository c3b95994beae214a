//! Schedule policy types and the step function.

use std::time::Duration;

/// A retry/repeat policy.
///
/// Schedules are pure data. The engine starts from [`Schedule::initial`] and
/// calls [`Schedule::step`] after every attempt; each step either continues
/// with a delay and an advanced state, or stops.
///
/// Delay-producing policies (`spaced`, `linear`, `exponential`, `fibonacci`)
/// never stop on their own. Bound them with [`Schedule::with_max_retries`] or
/// by intersecting with [`Schedule::recurs`].
///
/// # Examples
///
/// ```rust
/// use undertow::Schedule;
/// use std::time::Duration;
///
/// let policy = Schedule::exponential(Duration::from_millis(100)).with_max_retries(3);
///
/// assert_eq!(
///     policy.delays(10),
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(400),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Schedule {
    /// Continue `n` times with no delay, then stop.
    Recurs(u32),
    /// Continue forever with no delay.
    Forever,
    /// Continue forever with a fixed delay.
    Spaced(Duration),
    /// Delay grows linearly: base * (attempt + 1).
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay grows geometrically: base * factor^attempt.
    Exponential {
        /// Base delay duration.
        base: Duration,
        /// Growth factor per attempt.
        factor: f64,
    },
    /// Delay follows the Fibonacci sequence: base * fib(attempt + 1).
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
    /// Continue while either side continues, using the shorter delay.
    Union(Box<Schedule>, Box<Schedule>),
    /// Continue while both sides continue, using the longer delay.
    Intersect(Box<Schedule>, Box<Schedule>),
    /// Cap every delay of the inner schedule.
    Capped {
        /// The schedule being capped.
        inner: Box<Schedule>,
        /// Upper bound for each delay.
        max_delay: Duration,
    },
}

/// Per-run progress of a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScheduleState {
    /// Remaining recurrences.
    Recurs {
        /// How many more times the schedule continues.
        remaining: u32,
    },
    /// Number of steps already taken.
    Attempt {
        /// Zero-based attempt counter.
        n: u32,
    },
    /// Both sides of a union; `None` marks a side that has stopped.
    Union(Option<Box<ScheduleState>>, Option<Box<ScheduleState>>),
    /// Both sides of an intersection.
    Intersect(Box<ScheduleState>, Box<ScheduleState>),
    /// State of a capped schedule.
    Capped(Box<ScheduleState>),
}

/// The outcome of one schedule step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Wait `delay`, then try again with `state`.
    Continue {
        /// Delay before the next attempt.
        delay: Duration,
        /// Advanced state.
        state: ScheduleState,
    },
    /// Give up.
    Stop,
}

impl Decision {
    /// The delay, if this decision continues.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Decision::Continue { delay, .. } => Some(*delay),
            Decision::Stop => None,
        }
    }
}

impl Schedule {
    /// Continue `n` times, then stop (`times: n`).
    ///
    /// ```rust
    /// use undertow::Schedule;
    ///
    /// assert_eq!(Schedule::recurs(3).delays(10).len(), 3);
    /// assert!(Schedule::recurs(0).delays(10).is_empty());
    /// ```
    pub fn recurs(n: u32) -> Self {
        Schedule::Recurs(n)
    }

    /// Continue forever without delay.
    pub fn forever() -> Self {
        Schedule::Forever
    }

    /// Continue forever with a fixed delay.
    pub fn spaced(delay: Duration) -> Self {
        Schedule::Spaced(delay)
    }

    /// Linearly increasing delay.
    pub fn linear(base: Duration) -> Self {
        Schedule::Linear { base }
    }

    /// Delay doubling on every attempt.
    pub fn exponential(base: Duration) -> Self {
        Self::exponential_with_factor(base, 2.0)
    }

    /// Delay multiplied by `factor` on every attempt.
    pub fn exponential_with_factor(base: Duration, factor: f64) -> Self {
        Schedule::Exponential {
            base,
            factor: factor.max(0.0),
        }
    }

    /// Fibonacci-sequence delay.
    pub fn fibonacci(base: Duration) -> Self {
        Schedule::Fibonacci { base }
    }

    /// Continue while either schedule continues, taking the shorter delay.
    pub fn union(self, other: Schedule) -> Self {
        Schedule::Union(Box::new(self), Box::new(other))
    }

    /// Continue while both schedules continue, taking the longer delay.
    pub fn intersect(self, other: Schedule) -> Self {
        Schedule::Intersect(Box::new(self), Box::new(other))
    }

    /// Stop after at most `n` continuations.
    pub fn with_max_retries(self, n: u32) -> Self {
        self.intersect(Schedule::recurs(n))
    }

    /// Never wait longer than `max_delay` between attempts.
    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Schedule::Capped {
            inner: Box::new(self),
            max_delay,
        }
    }

    /// Returns `true` if the schedule is guaranteed to stop eventually.
    pub fn is_bounded(&self) -> bool {
        match self {
            Schedule::Recurs(_) => true,
            Schedule::Forever
            | Schedule::Spaced(_)
            | Schedule::Linear { .. }
            | Schedule::Exponential { .. }
            | Schedule::Fibonacci { .. } => false,
            Schedule::Union(a, b) => a.is_bounded() && b.is_bounded(),
            Schedule::Intersect(a, b) => a.is_bounded() || b.is_bounded(),
            Schedule::Capped { inner, .. } => inner.is_bounded(),
        }
    }

    /// The state a fresh run starts from.
    pub fn initial(&self) -> ScheduleState {
        match self {
            Schedule::Recurs(n) => ScheduleState::Recurs { remaining: *n },
            Schedule::Forever
            | Schedule::Spaced(_)
            | Schedule::Linear { .. }
            | Schedule::Exponential { .. }
            | Schedule::Fibonacci { .. } => ScheduleState::Attempt { n: 0 },
            Schedule::Union(a, b) => ScheduleState::Union(
                Some(Box::new(a.initial())),
                Some(Box::new(b.initial())),
            ),
            Schedule::Intersect(a, b) => {
                ScheduleState::Intersect(Box::new(a.initial()), Box::new(b.initial()))
            }
            Schedule::Capped { inner, .. } => ScheduleState::Capped(Box::new(inner.initial())),
        }
    }

    /// Advance the schedule by one attempt.
    ///
    /// A state that does not belong to this schedule stops it.
    pub fn step(&self, state: ScheduleState) -> Decision {
        match (self, state) {
            (Schedule::Recurs(_), ScheduleState::Recurs { remaining }) => {
                if remaining > 0 {
                    Decision::Continue {
                        delay: Duration::ZERO,
                        state: ScheduleState::Recurs {
                            remaining: remaining - 1,
                        },
                    }
                } else {
                    Decision::Stop
                }
            }
            (Schedule::Union(a, b), ScheduleState::Union(sa, sb)) => {
                let left = sa.and_then(|s| continued(a.step(*s)));
                let right = sb.and_then(|s| continued(b.step(*s)));
                let delay = match (&left, &right) {
                    (Some((da, _)), Some((db, _))) => (*da).min(*db),
                    (Some((d, _)), None) | (None, Some((d, _))) => *d,
                    (None, None) => return Decision::Stop,
                };
                Decision::Continue {
                    delay,
                    state: ScheduleState::Union(
                        left.map(|(_, s)| Box::new(s)),
                        right.map(|(_, s)| Box::new(s)),
                    ),
                }
            }
            (Schedule::Intersect(a, b), ScheduleState::Intersect(sa, sb)) => {
                match (continued(a.step(*sa)), continued(b.step(*sb))) {
                    (Some((da, sa)), Some((db, sb))) => Decision::Continue {
                        delay: da.max(db),
                        state: ScheduleState::Intersect(Box::new(sa), Box::new(sb)),
                    },
                    _ => Decision::Stop,
                }
            }
            (Schedule::Capped { inner, max_delay }, ScheduleState::Capped(s)) => {
                match inner.step(*s) {
                    Decision::Continue { delay, state } => Decision::Continue {
                        delay: delay.min(*max_delay),
                        state: ScheduleState::Capped(Box::new(state)),
                    },
                    Decision::Stop => Decision::Stop,
                }
            }
            (schedule, ScheduleState::Attempt { n }) => match schedule.delay_for(n) {
                Some(delay) => Decision::Continue {
                    delay,
                    state: ScheduleState::Attempt {
                        n: n.saturating_add(1),
                    },
                },
                None => Decision::Stop,
            },
            _ => Decision::Stop,
        }
    }

    /// Preview the delays of the first `limit` continuations.
    pub fn delays(&self, limit: usize) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut state = self.initial();
        while delays.len() < limit {
            match self.step(state) {
                Decision::Continue { delay, state: next } => {
                    delays.push(delay);
                    state = next;
                }
                Decision::Stop => break,
            }
        }
        delays
    }

    // Delay of the nth attempt for the counter-driven policies.
    fn delay_for(&self, n: u32) -> Option<Duration> {
        match self {
            Schedule::Forever => Some(Duration::ZERO),
            Schedule::Spaced(d) => Some(*d),
            Schedule::Linear { base } => Some(base.saturating_mul(n.saturating_add(1))),
            Schedule::Exponential { base, factor } => {
                let exponent = i32::try_from(n).unwrap_or(i32::MAX);
                let nanos = base.as_nanos() as f64 * factor.powi(exponent);
                if nanos.is_finite() && nanos < u64::MAX as f64 {
                    Some(Duration::from_nanos(nanos as u64))
                } else {
                    Some(Duration::MAX)
                }
            }
            Schedule::Fibonacci { base } => {
                Some(base.saturating_mul(fibonacci(n.saturating_add(1))))
            }
            _ => None,
        }
    }
}

fn continued(decision: Decision) -> Option<(Duration, ScheduleState)> {
    match decision {
        Decision::Continue { delay, state } => Some((delay, state)),
        Decision::Stop => None,
    }
}

/// Calculate the nth Fibonacci number.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let temp = a.saturating_add(b);
        a = b;
        b = temp;
    }
    b
}
