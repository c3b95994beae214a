//! The stack machine that evaluates effect descriptions.
//!
//! Evaluation is iterative: sequencing and handler nodes push a frame and
//! descend into their source; an outcome pops frames until one of them
//! produces the next node to evaluate. The same loop serves both run modes.
//! A sync run polls the loop once with a no-op waker and treats anything
//! that would suspend as a defect.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

use crate::context::Context;
use crate::effect::node::{
    guard, Collect, Cont, DefectHandler, MakeFuture, Node, Outcomes, Predicate, RawExit, Recur,
    Register, Resumed, Step, Value,
};
use crate::effect::GenScope;
use crate::exit::{Defect, DefectKind, Exit};
use crate::schedule::{Decision, Schedule, ScheduleState};

use super::RuntimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Sync,
    Async,
}

/// How a fiber runs: its mode and the runtime configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub(crate) mode: Mode,
    pub(crate) config: RuntimeConfig,
}

impl Settings {
    pub(crate) fn new(mode: Mode, config: RuntimeConfig) -> Self {
        Settings { mode, config }
    }
}

struct RecurFrame {
    source: Arc<Node>,
    schedule: Schedule,
    state: ScheduleState,
    recur: Recur,
    filter: Option<Predicate>,
    attempt: u32,
}

enum Frame {
    FlatMap(Cont),
    Fold {
        on_success: Option<Cont>,
        on_failure: Option<Cont>,
    },
    CatchDefect(DefectHandler),
    Recur(RecurFrame),
    RestoreEnv(Context),
    All {
        children: Arc<[Arc<Node>]>,
        next: usize,
        collect: Collect,
        outcomes: Outcomes,
    },
    Race {
        children: Arc<[Arc<Node>]>,
        next: usize,
    },
}

struct Fiber {
    env: Context,
    settings: Settings,
    stack: Vec<Frame>,
}

/// Evaluate `node` in `env`.
pub(crate) fn run_node(node: Arc<Node>, env: Context, settings: Settings) -> BoxFuture<'static, RawExit> {
    Box::pin(async move {
        let fiber = Fiber {
            env,
            settings,
            stack: Vec::new(),
        };
        fiber.run(node).await
    })
}

/// Evaluate `node` to completion on the calling thread.
pub(crate) fn run_blocking(node: Arc<Node>, env: Context, config: RuntimeConfig) -> RawExit {
    let mut run = run_node(node, env, Settings::new(Mode::Sync, config));
    let mut cx = TaskContext::from_waker(futures::task::noop_waker_ref());
    match run.as_mut().poll(&mut cx) {
        Poll::Ready(exit) => exit,
        Poll::Pending => Exit::Die(Defect::async_in_sync("an effect that suspends")),
    }
}

fn apply(k: &Cont, value: Value) -> Step {
    guard(|| k(value)).unwrap_or_else(Step::die)
}

async fn catch_panics(run: BoxFuture<'static, RawExit>) -> RawExit {
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(exit) => exit,
        Err(payload) => {
            let defect = Defect::from_panic(payload);
            tracing::warn!(defect = %defect, "captured panic as defect");
            Exit::Die(defect)
        }
    }
}

async fn pause(settings: Settings, delay: Duration) {
    if delay.is_zero() || !settings.config.honor_delays {
        return;
    }
    match settings.mode {
        Mode::Sync => std::thread::sleep(delay),
        Mode::Async => tokio::time::sleep(delay).await,
    }
}

impl Fiber {
    async fn run(mut self, root: Arc<Node>) -> RawExit {
        let mut current = root;
        loop {
            let mut exit = match self.eval(current).await {
                Step::Next(node) => {
                    current = node;
                    continue;
                }
                Step::Done(exit) => exit,
            };
            current = loop {
                let Some(frame) = self.stack.pop() else {
                    return exit;
                };
                match self.unwind(frame, exit).await {
                    Step::Next(node) => break node,
                    Step::Done(next) => exit = next,
                }
            };
        }
    }

    fn is_sync(&self) -> bool {
        self.settings.mode == Mode::Sync
    }

    async fn eval(&mut self, node: Arc<Node>) -> Step {
        match &*node {
            Node::Exit(thunk) => Step::Done(guard(|| thunk()).unwrap_or_else(Exit::Die)),
            Node::Suspend(make) => match guard(|| make()) {
                Ok(next) => Step::Next(next),
                Err(defect) => Step::die(defect),
            },
            Node::Async(register) => self.await_callback(register).await,
            Node::Promise(make) => self.await_promise(make).await,
            Node::FlatMap(source, k) => {
                self.stack.push(Frame::FlatMap(k.clone()));
                Step::Next(source.clone())
            }
            Node::Fold {
                source,
                on_success,
                on_failure,
            } => {
                self.stack.push(Frame::Fold {
                    on_success: on_success.clone(),
                    on_failure: on_failure.clone(),
                });
                Step::Next(source.clone())
            }
            Node::CatchDefect(source, handler) => {
                self.stack.push(Frame::CatchDefect(handler.clone()));
                Step::Next(source.clone())
            }
            Node::Recur {
                source,
                schedule,
                recur,
                filter,
            } => {
                self.stack.push(Frame::Recur(RecurFrame {
                    source: source.clone(),
                    schedule: schedule.clone(),
                    state: schedule.initial(),
                    recur: *recur,
                    filter: filter.clone(),
                    attempt: 1,
                }));
                Step::Next(source.clone())
            }
            Node::Service(key, extract) => match guard(|| extract(&self.env)) {
                Ok(Some(service)) => Step::Done(Exit::Success(service)),
                Ok(None) => Step::die(Defect::missing_service(key.name())),
                Err(defect) => Step::die(defect),
            },
            Node::Provide(source, context) => {
                let outer = self.env.clone();
                self.env = outer.merge(context);
                self.stack.push(Frame::RestoreEnv(outer));
                Step::Next(source.clone())
            }
            Node::Sleep(delay) => {
                pause(self.settings, *delay).await;
                Step::succeed(())
            }
            Node::Timeout(source, limit) => self.timeout(source.clone(), *limit).await,
            Node::All {
                children,
                collect,
                parallel,
            } => {
                if *parallel && !self.is_sync() {
                    return self.all_par(children.clone(), *collect).await;
                }
                match children.first() {
                    Some(first) => {
                        let first = first.clone();
                        self.stack.push(Frame::All {
                            children: children.clone(),
                            next: 1,
                            collect: *collect,
                            outcomes: Vec::with_capacity(children.len()),
                        });
                        Step::Next(first)
                    }
                    None => Step::succeed(Outcomes::new()),
                }
            }
            Node::Race(children) => {
                if !self.is_sync() {
                    return self.race_par(children.clone()).await;
                }
                match children.first() {
                    Some(first) => {
                        let first = first.clone();
                        self.stack.push(Frame::Race {
                            children: children.clone(),
                            next: 1,
                        });
                        Step::Next(first)
                    }
                    None => Step::die(Defect::new("race requires at least one effect")),
                }
            }
            Node::Gen(body) => {
                let scope = GenScope {
                    env: self.env.clone(),
                    settings: self.settings,
                };
                match guard(|| body(scope)) {
                    Ok(run) => Step::Done(catch_panics(run).await),
                    Err(defect) => Step::die(defect),
                }
            }
        }
    }

    async fn unwind(&mut self, frame: Frame, exit: RawExit) -> Step {
        match frame {
            Frame::FlatMap(k) => match exit {
                Exit::Success(value) => apply(&k, value),
                other => Step::Done(other),
            },
            Frame::Fold {
                on_success,
                on_failure,
            } => match exit {
                Exit::Success(value) => match on_success {
                    Some(k) => apply(&k, value),
                    None => Step::Done(Exit::Success(value)),
                },
                Exit::Fail(error) => match on_failure {
                    Some(k) => apply(&k, error),
                    None => Step::Done(Exit::Fail(error)),
                },
                Exit::Die(defect) => Step::die(defect),
            },
            Frame::CatchDefect(handler) => match exit {
                Exit::Die(defect) => guard(|| handler(defect)).unwrap_or_else(Step::die),
                other => Step::Done(other),
            },
            Frame::RestoreEnv(outer) => {
                self.env = outer;
                Step::Done(exit)
            }
            Frame::Recur(recur) => self.recur(recur, exit).await,
            Frame::All {
                children,
                next,
                collect,
                mut outcomes,
            } => {
                match exit {
                    Exit::Success(value) => outcomes.push(Ok(value)),
                    Exit::Fail(error) if collect == Collect::ShortCircuit => {
                        return Step::Done(Exit::Fail(error))
                    }
                    Exit::Fail(error) => outcomes.push(Err(error)),
                    Exit::Die(defect) => return Step::die(defect),
                }
                match children.get(next).cloned() {
                    Some(child) => {
                        self.stack.push(Frame::All {
                            children,
                            next: next + 1,
                            collect,
                            outcomes,
                        });
                        Step::Next(child)
                    }
                    None => Step::succeed(outcomes),
                }
            }
            Frame::Race { children, next } => match exit {
                Exit::Fail(error) => match children.get(next).cloned() {
                    Some(child) => {
                        self.stack.push(Frame::Race {
                            children,
                            next: next + 1,
                        });
                        Step::Next(child)
                    }
                    None => Step::Done(Exit::Fail(error)),
                },
                other => Step::Done(other),
            },
        }
    }

    async fn recur(&mut self, frame: RecurFrame, exit: RawExit) -> Step {
        let again = match (frame.recur, &exit) {
            (Recur::Retry, Exit::Fail(error)) => match &frame.filter {
                Some(filter) => match guard(|| filter(error)) {
                    Ok(matched) => matched,
                    Err(defect) => return Step::die(defect),
                },
                None => true,
            },
            (Recur::Repeat, Exit::Success(_)) => true,
            _ => false,
        };
        if !again {
            return Step::Done(exit);
        }

        let RecurFrame {
            source,
            schedule,
            state,
            recur,
            filter,
            attempt,
        } = frame;
        match schedule.step(state) {
            Decision::Continue { delay, state } => {
                match recur {
                    Recur::Retry => tracing::debug!(attempt, ?delay, "retrying after failure"),
                    Recur::Repeat => tracing::debug!(attempt, ?delay, "repeating after success"),
                }
                drop(exit);
                pause(self.settings, delay).await;
                self.stack.push(Frame::Recur(RecurFrame {
                    source: source.clone(),
                    schedule,
                    state,
                    recur,
                    filter,
                    attempt: attempt.saturating_add(1),
                }));
                Step::Next(source)
            }
            Decision::Stop => {
                tracing::debug!(attempt, "schedule exhausted");
                Step::Done(exit)
            }
        }
    }

    async fn await_callback(&mut self, register: &Register) -> Step {
        if self.is_sync() {
            return Step::die(Defect::async_in_sync("an async callback"));
        }
        let (tx, rx) = oneshot::channel();
        if let Err(defect) = guard(|| register(tx)) {
            return Step::die(defect);
        }
        match rx.await {
            Ok(Resumed::Exit(exit)) => Step::Done(exit),
            Ok(Resumed::Effect(node)) => Step::Next(node),
            Err(oneshot::Canceled) => {
                tracing::warn!("async effect dropped its resume handle");
                Step::die(Defect::with_kind(
                    DefectKind::ResumeDropped,
                    "async effect was dropped without being resumed",
                ))
            }
        }
    }

    async fn await_promise(&mut self, make: &MakeFuture) -> Step {
        if self.is_sync() {
            return Step::die(Defect::async_in_sync("a promise"));
        }
        match guard(|| make()) {
            Ok(run) => Step::Done(catch_panics(run).await),
            Err(defect) => Step::die(defect),
        }
    }

    async fn timeout(&mut self, source: Arc<Node>, limit: Duration) -> Step {
        if self.is_sync() {
            return Step::die(Defect::async_in_sync("a timeout"));
        }
        let run = run_node(source, self.env.clone(), self.settings);
        match tokio::time::timeout(limit, run).await {
            Ok(Exit::Success(value)) => Step::succeed(Some(value)),
            Ok(other) => Step::Done(other),
            Err(_) => {
                tracing::debug!(?limit, "effect timed out");
                Step::succeed(None::<Value>)
            }
        }
    }

    async fn all_par(&mut self, children: Arc<[Arc<Node>]>, collect: Collect) -> Step {
        let mut running: FuturesUnordered<_> = children
            .iter()
            .enumerate()
            .map(|(index, child)| {
                let run = run_node(child.clone(), self.env.clone(), self.settings);
                async move { (index, run.await) }
            })
            .collect();

        let mut slots: Vec<Option<Result<Value, Value>>> = Vec::new();
        slots.resize_with(children.len(), || None);

        // Returning early drops `running`, which cancels the other children.
        while let Some((index, exit)) = running.next().await {
            let outcome = match exit {
                Exit::Success(value) => Ok(value),
                Exit::Fail(error) if collect == Collect::ShortCircuit => {
                    return Step::Done(Exit::Fail(error))
                }
                Exit::Fail(error) => Err(error),
                Exit::Die(defect) => return Step::die(defect),
            };
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        Step::succeed(slots.into_iter().flatten().collect::<Outcomes>())
    }

    async fn race_par(&mut self, children: Arc<[Arc<Node>]>) -> Step {
        let mut running: FuturesUnordered<_> = children
            .iter()
            .map(|child| run_node(child.clone(), self.env.clone(), self.settings))
            .collect();

        let mut last_failure = None;
        while let Some(exit) = running.next().await {
            match exit {
                Exit::Success(value) => return Step::Done(Exit::Success(value)),
                Exit::Fail(error) => last_failure = Some(error),
                Exit::Die(defect) => return Step::die(defect),
            }
        }
        match last_failure {
            Some(error) => Step::Done(Exit::Fail(error)),
            None => Step::die(Defect::new("race requires at least one effect")),
        }
    }
}
