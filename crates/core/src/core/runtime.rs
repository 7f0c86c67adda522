//! Executor seam for the poll loop.
//!
//! The controller only needs two things from its host: a way to run a local
//! future and a periodic trigger. The browser provides them through
//! `wasm-bindgen-futures` and `setInterval` (see `verso_web`), native builds
//! through tokio's `LocalSet`.

use std::time::Duration;

use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::stream::{LocalBoxStream, StreamExt};

/// Shortest period a trigger will be created with.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub trait Runtime: 'static {
    /// Run `task` to completion on the current thread's executor.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Yield once per `period`, the first time one full period from now.
    fn ticks(&self, period: Duration) -> LocalBoxStream<'static, ()>;
}

/// Handle to a running periodic trigger.
///
/// Owning a `PollLoop` is owning the schedule: dropping it cancels every tick that
/// has not fired yet. Ticks already dispatched keep running; callers re-check
/// their own state when those complete.
#[derive(Debug)]
pub struct PollLoop {
    abort: AbortHandle,
}

impl PollLoop {
    pub fn spawn<R: Runtime + ?Sized>(
        runtime: &R,
        period: Duration,
        mut on_tick: impl FnMut() + 'static,
    ) -> Self {
        let (abort, registration) = AbortHandle::new_pair();
        let mut ticks = runtime.ticks(period.max(MIN_PERIOD));
        let schedule = async move {
            while ticks.next().await.is_some() {
                on_tick();
            }
        };
        runtime.spawn(Box::pin(async move {
            let _ = Abortable::new(schedule, registration).await;
        }));
        Self { abort }
    }

    pub fn is_active(&self) -> bool {
        !self.abort.is_aborted()
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// tokio adapter. Must be used from inside a `LocalSet` (`spawn_local`).
#[cfg(any(test, feature = "native"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntime;

#[cfg(any(test, feature = "native"))]
impl Runtime for TokioRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }

    fn ticks(&self, period: Duration) -> LocalBoxStream<'static, ()> {
        let period = period.max(MIN_PERIOD);
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        futures::stream::unfold(interval, |mut interval| async move {
            interval.tick().await;
            Some(((), interval))
        })
        .boxed_local()
    }
}
