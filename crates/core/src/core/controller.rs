//! Evolution session controller: lifecycle transitions and the poll loop.
//!
//! One controller drives one session at a time. Lifecycle calls (`start`,
//! `stop`, `reset`) and tick reconciliation all mutate a single
//! [`SessionState`]; observers receive a snapshot after every committed change.
//!
//! Ordering rules:
//! - A tick is dispatched only while the session is `Running` and the poll
//!   loop is alive. `stop`, `reset`, completion and tick failure all drop the
//!   loop, so no later tick is dispatched.
//! - Calls already in flight cannot be cancelled. Each tick remembers the
//!   session epoch it was dispatched in and re-checks it after every call;
//!   a tick whose session has ended issues no further calls and is not merged.
//! - Ticks carry increasing sequence numbers; a response older than the newest
//!   merged one is dropped, so the generation count never regresses.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::GaService;
use crate::error::{ClientError, SessionError};
use crate::runtime::{PollLoop, Runtime};
use crate::session::{Phase, SessionState, TickReport};
use crate::types::{GaConfig, InitializeRequest};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What to do when a scheduled moment arrives while the previous tick is
/// still waiting on the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickOverlap {
    /// Let that moment pass; at most one tick is in flight.
    #[default]
    Skip,
    /// Dispatch anyway; ticks may overlap and complete out of order.
    Allow,
}

impl TickOverlap {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(TickOverlap::Skip),
            "allow" | "overlap" => Some(TickOverlap::Allow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub overlap: TickOverlap,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            overlap: TickOverlap::default(),
        }
    }
}

impl ControllerOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_overlap(mut self, overlap: TickOverlap) -> Self {
        self.overlap = overlap;
        self
    }
}

type Observer = Rc<dyn Fn(&SessionState)>;

pub struct SessionController<S: GaService + 'static, R: Runtime> {
    shared: Rc<Shared<S, R>>,
}

impl<S: GaService + 'static, R: Runtime> Clone for SessionController<S, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

struct Shared<S, R> {
    service: S,
    runtime: R,
    options: ControllerOptions,
    state: RefCell<SessionState>,
    poll: RefCell<Option<PollLoop>>,
    /// Bumped whenever the current session is replaced or ended from outside.
    epoch: Cell<u64>,
    next_seq: Cell<u64>,
    reconciled_seq: Cell<u64>,
    in_flight: Cell<u32>,
    /// Some tick of the current session has seen `is_complete`.
    completion_seen: Cell<bool>,
    observers: RefCell<Vec<Observer>>,
}

impl<S: GaService + 'static, R: Runtime> SessionController<S, R> {
    pub fn new(service: S, runtime: R, options: ControllerOptions) -> Self {
        Self {
            shared: Rc::new(Shared {
                service,
                runtime,
                options,
                state: RefCell::new(SessionState::default()),
                poll: RefCell::new(None),
                epoch: Cell::new(0),
                next_seq: Cell::new(0),
                reconciled_seq: Cell::new(0),
                in_flight: Cell::new(0),
                completion_seen: Cell::new(false),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn service(&self) -> &S {
        &self.shared.service
    }

    pub fn options(&self) -> ControllerOptions {
        self.shared.options
    }

    pub fn snapshot(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    /// Whether future ticks are still scheduled.
    pub fn is_polling(&self) -> bool {
        self.shared
            .poll
            .borrow()
            .as_ref()
            .is_some_and(PollLoop::is_active)
    }

    /// Register `observer` to receive every committed state. Observers may call
    /// back into the controller.
    pub fn subscribe(&self, observer: impl Fn(&SessionState) + 'static) {
        self.shared.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Probe the service. A failure is also recorded in `error`.
    pub async fn check_health(&self) -> Result<(), ClientError> {
        match self.shared.service.health().await {
            Ok(()) => {
                debug!("GA service is healthy");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "GA service health check failed");
                self.shared
                    .commit(|s| s.error = Some(format!("GA service unreachable: {e}")));
                Err(e)
            }
        }
    }

    /// Initialize a session for `target` and begin polling.
    ///
    /// The target is trimmed and uppercased before it is sent. On failure the
    /// phase is left as it was and the message is stored in `error`.
    pub async fn start(&self, target: &str, config: GaConfig) -> Result<(), SessionError> {
        let shared = &self.shared;

        let target = target.trim().to_uppercase();
        if target.is_empty() {
            shared.commit(|s| s.error = Some(SessionError::EmptyTarget.to_string()));
            return Err(SessionError::EmptyTarget);
        }
        if shared.phase() == Phase::Running {
            return Err(SessionError::AlreadyRunning);
        }

        let epoch = shared.bump_epoch();
        shared.cancel_polling();

        info!(phrase = %target, ?config, "initializing GA session");
        let request = InitializeRequest {
            target: target.clone(),
            config,
        };
        let result = shared.service.initialize(&request).await;

        if shared.epoch.get() != epoch {
            debug!(phrase = %target, "initialize finished after the start was superseded");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(population) => {
                info!(
                    phrase = %target,
                    individuals = population.len(),
                    "session running"
                );
                shared.next_seq.set(0);
                shared.reconciled_seq.set(0);
                shared.in_flight.set(0);
                shared.completion_seen.set(false);
                shared.state.borrow_mut().begin(target, population);
                Shared::start_polling(shared);
                shared.notify();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "initialize failed");
                shared.commit(|s| s.error = Some(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// User stop: cancel future ticks and move `Running → Stopped`.
    ///
    /// Also voids a `start` whose initialize is still in flight.
    pub fn stop(&self) {
        let shared = &self.shared;
        shared.bump_epoch();
        shared.cancel_polling();
        if shared.phase() == Phase::Running {
            info!(generation = shared.state.borrow().generation, "session stopped");
            shared.commit(|s| s.halt(None));
        }
    }

    /// Return to `Idle` from any phase and reset the remote run.
    ///
    /// Local state is cleared and polling cancelled before the service is
    /// called, so a failing remote reset cannot leave the UI stuck.
    pub async fn reset(&self) -> Result<(), ClientError> {
        let shared = &self.shared;
        let epoch = shared.bump_epoch();
        shared.cancel_polling();
        shared.in_flight.set(0);
        shared.commit(SessionState::clear);

        match shared.service.reset().await {
            Ok(()) => {
                info!("session reset");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "remote reset failed; local state was cleared");
                if shared.epoch.get() == epoch {
                    shared.commit(|s| s.error = Some(format!("reset failed: {e}")));
                }
                Err(e)
            }
        }
    }
}

impl<S: GaService + 'static, R: Runtime> Shared<S, R> {
    fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    fn bump_epoch(&self) -> u64 {
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);
        epoch
    }

    /// The tick's session is still the current one and still running.
    fn is_live(&self, epoch: u64) -> bool {
        self.epoch.get() == epoch && self.phase() == Phase::Running
    }

    fn start_polling(this: &Rc<Self>) {
        let weak = Rc::downgrade(this);
        let poll = PollLoop::spawn(&this.runtime, this.options.poll_interval, move || {
            if let Some(shared) = weak.upgrade() {
                Shared::dispatch_tick(&shared);
            }
        });
        *this.poll.borrow_mut() = Some(poll);
    }

    fn cancel_polling(&self) {
        let poll = self.poll.borrow_mut().take();
        drop(poll);
    }

    fn dispatch_tick(this: &Rc<Self>) {
        if this.phase() != Phase::Running || this.completion_seen.get() {
            this.cancel_polling();
            return;
        }
        let in_flight = this.in_flight.get();
        if this.options.overlap == TickOverlap::Skip && in_flight > 0 {
            debug!(in_flight, "previous tick still in flight; skipping this one");
            return;
        }

        let epoch = this.epoch.get();
        let seq = this.next_seq.get() + 1;
        this.next_seq.set(seq);
        this.in_flight.set(in_flight + 1);

        let shared = Rc::clone(this);
        this.runtime.spawn(Box::pin(async move {
            shared.run_tick(epoch, seq).await;
        }));
    }

    async fn run_tick(&self, epoch: u64, seq: u64) {
        let outcome = self.fetch_tick(epoch).await;
        if self.epoch.get() == epoch {
            self.in_flight.set(self.in_flight.get().saturating_sub(1));
        }
        match outcome {
            Ok(Some(report)) => self.reconcile(epoch, seq, report),
            Ok(None) => debug!(seq, "tick abandoned; its session is no longer running"),
            Err(e) => self.fail(epoch, seq, e),
        }
    }

    /// evolve → history → best, bailing out between calls once the session
    /// this tick belongs to has ended.
    async fn fetch_tick(&self, epoch: u64) -> Result<Option<TickReport>, ClientError> {
        // The session may have ended between dispatch and the task's first poll.
        if !self.is_live(epoch) || self.completion_seen.get() {
            return Ok(None);
        }
        let evolved = self.service.evolve(1).await?;
        if !self.is_live(epoch) {
            return Ok(None);
        }
        if evolved.is_complete {
            // No evolve may follow an observed completion.
            self.completion_seen.set(true);
            self.cancel_polling();
        }

        let history = self.service.history().await?;
        if !self.is_live(epoch) {
            return Ok(None);
        }

        let best = self.service.best().await?;
        Ok(Some(TickReport {
            evolved,
            history,
            best,
        }))
    }

    fn reconcile(&self, epoch: u64, seq: u64, report: TickReport) {
        if self.epoch.get() != epoch {
            debug!(seq, "dropping tick from an earlier session");
            return;
        }

        let complete = report.evolved.is_complete;
        let newest = self.reconciled_seq.get();
        if seq <= newest {
            debug!(seq, newest, "dropping out-of-order tick");
            // Completion still counts even when the data is stale.
            if complete && self.state.borrow_mut().complete() {
                self.cancel_polling();
                info!("target reached; session complete");
                self.notify();
            }
            return;
        }

        if complete {
            self.cancel_polling();
        }
        if !self.state.borrow_mut().apply_tick(&report) {
            debug!(seq, "tick landed after the session stopped");
            return;
        }
        self.reconciled_seq.set(seq);

        let generation = report.evolved.statistics.generation;
        if complete {
            info!(generation, "target reached; session complete");
        } else {
            debug!(
                generation,
                best = report.evolved.statistics.best_fitness,
                avg = report.evolved.statistics.avg_fitness,
                "tick merged"
            );
        }
        self.notify();
    }

    /// Fail fast: a failing call ends the session, no retry.
    fn fail(&self, epoch: u64, seq: u64, error: ClientError) {
        if !self.is_live(epoch) {
            debug!(seq, error = %error, "ignoring failure from a finished session");
            return;
        }
        warn!(seq, error = %error, "poll tick failed; stopping session");
        self.cancel_polling();
        self.commit(|s| s.halt(Some(error.to_string())));
    }

    fn commit(&self, mutate: impl FnOnce(&mut SessionState)) {
        mutate(&mut self.state.borrow_mut());
        self.notify();
    }

    /// Push a snapshot to every observer. No borrow is held while they run.
    fn notify(&self) {
        let observers: Vec<Observer> = self.observers.borrow().clone();
        if observers.is_empty() {
            return;
        }
        let snapshot = self.state.borrow().clone();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TokioRuntime;
    use crate::types::{EvolveResponse, HistoryEntry, Individual, Statistics};
    use std::collections::VecDeque;
    use std::future::Future;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(100);

    struct Step {
        delay: Duration,
        result: Result<EvolveResponse, ClientError>,
    }

    #[derive(Default)]
    struct Scripted {
        init_error: RefCell<Option<ClientError>>,
        initial_size: Cell<usize>,
        steps: RefCell<VecDeque<Step>>,
        default_delay: Cell<Duration>,
        reset_error: RefCell<Option<ClientError>>,
        health_error: RefCell<Option<ClientError>>,

        last_init: RefCell<Option<InitializeRequest>>,
        latest: RefCell<Option<EvolveResponse>>,
        init_calls: Cell<usize>,
        evolve_calls: Cell<usize>,
        history_calls: Cell<usize>,
        best_calls: Cell<usize>,
        reset_calls: Cell<usize>,
        concurrent: Cell<u32>,
        max_concurrent: Cell<u32>,
    }

    fn ind(genes: &str, fitness: f64) -> Individual {
        Individual {
            genes: genes.to_string(),
            fitness,
        }
    }

    fn evolved(generation: u64, best: f64, complete: bool) -> EvolveResponse {
        EvolveResponse {
            top_individuals: vec![ind("TO BE", best), ind("TO BX", best * 0.8)],
            statistics: Statistics {
                generation,
                best_fitness: best,
                avg_fitness: best / 2.0,
                worst_fitness: 0.0,
            },
            is_complete: complete,
        }
    }

    fn transport(endpoint: &str) -> ClientError {
        ClientError::Transport {
            endpoint: endpoint.to_string(),
            message: "connection refused".to_string(),
        }
    }

    impl Scripted {
        fn new() -> Rc<Self> {
            let s = Self::default();
            s.initial_size.set(5);
            Rc::new(s)
        }

        fn push(&self, result: Result<EvolveResponse, ClientError>) {
            self.push_delayed(Duration::ZERO, result);
        }

        fn push_delayed(&self, delay: Duration, result: Result<EvolveResponse, ClientError>) {
            self.steps.borrow_mut().push_back(Step { delay, result });
        }
    }

    impl GaService for Scripted {
        async fn initialize(
            &self,
            request: &InitializeRequest,
        ) -> Result<Vec<Individual>, ClientError> {
            self.init_calls.set(self.init_calls.get() + 1);
            *self.last_init.borrow_mut() = Some(request.clone());
            if let Some(e) = self.init_error.borrow().clone() {
                return Err(e);
            }
            let n = request
                .config
                .population_size
                .map(|n| n as usize)
                .unwrap_or(self.initial_size.get());
            Ok((0..n).map(|_| ind("XXXXX", 0.0)).collect())
        }

        async fn evolve(&self, generations: u32) -> Result<EvolveResponse, ClientError> {
            assert_eq!(generations, 1);
            let calls = self.evolve_calls.get() + 1;
            self.evolve_calls.set(calls);

            let step = self.steps.borrow_mut().pop_front().unwrap_or_else(|| Step {
                delay: self.default_delay.get(),
                result: Ok(evolved(calls as u64, 0.1, false)),
            });

            self.concurrent.set(self.concurrent.get() + 1);
            self.max_concurrent
                .set(self.max_concurrent.get().max(self.concurrent.get()));
            if !step.delay.is_zero() {
                sleep(step.delay).await;
            }
            self.concurrent.set(self.concurrent.get() - 1);

            if let Ok(resp) = &step.result {
                *self.latest.borrow_mut() = Some(resp.clone());
            }
            step.result
        }

        async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
            self.history_calls.set(self.history_calls.get() + 1);
            let latest = self.latest.borrow();
            let Some(latest) = latest.as_ref() else {
                return Ok(Vec::new());
            };
            Ok((0..=latest.statistics.generation)
                .map(|g| HistoryEntry {
                    generation: g,
                    best_fitness: latest.statistics.best_fitness,
                    avg_fitness: latest.statistics.avg_fitness,
                })
                .collect())
        }

        async fn best(&self) -> Result<Option<Individual>, ClientError> {
            self.best_calls.set(self.best_calls.get() + 1);
            Ok(self
                .latest
                .borrow()
                .as_ref()
                .and_then(|r| r.top_individuals.first().cloned()))
        }

        async fn reset(&self) -> Result<(), ClientError> {
            self.reset_calls.set(self.reset_calls.get() + 1);
            match self.reset_error.borrow().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn health(&self) -> Result<(), ClientError> {
            match self.health_error.borrow().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    type TestController = SessionController<Rc<Scripted>, TokioRuntime>;

    fn controller(service: &Rc<Scripted>, overlap: TickOverlap) -> TestController {
        SessionController::new(
            Rc::clone(service),
            TokioRuntime,
            ControllerOptions::default()
                .with_poll_interval(PERIOD)
                .with_overlap(overlap),
        )
    }

    async fn local<F: Future>(f: F) -> F::Output {
        LocalSet::new().run_until(f).await
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn to_be_session_runs_until_complete() {
        local(async {
            let svc = Scripted::new();
            svc.push(Ok(evolved(1, 0.4, false)));
            svc.push(Ok(evolved(2, 0.6, false)));
            svc.push(Ok(evolved(42, 1.0, true)));
            let c = controller(&svc, TickOverlap::Skip);

            c.start("to be", GaConfig::default().with_population_size(50))
                .await
                .unwrap();

            let sent = svc.last_init.borrow().clone().unwrap();
            assert_eq!(sent.target, "TO BE");
            assert_eq!(sent.config.population_size, Some(50));

            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Running);
            assert_eq!(s.generation, 0);
            assert_eq!(s.population.len(), 50);
            assert_eq!(s.target, "TO BE");
            assert!(c.is_polling());

            sleep(ms(150)).await;
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Running);
            assert_eq!(s.generation, 1);
            assert_eq!(s.history.len(), 2);
            assert_eq!(s.best_ever.as_ref().map(|b| b.fitness), Some(0.4));

            sleep(ms(200)).await;
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Complete);
            assert_eq!(s.generation, 42);
            assert!(!c.is_polling());

            sleep(Duration::from_secs(5)).await;
            assert_eq!(svc.evolve_calls.get(), 3);
            assert_eq!(c.snapshot().phase, Phase::Complete);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failed_initialize_stays_idle() {
        local(async {
            let svc = Scripted::new();
            *svc.init_error.borrow_mut() = Some(transport("/initialize"));
            let c = controller(&svc, TickOverlap::Skip);

            let err = c.start("HELLO", GaConfig::default()).await.unwrap_err();
            assert!(matches!(err, SessionError::Client(ClientError::Transport { .. })));

            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Idle);
            assert!(s.population.is_empty());
            assert!(s.error.as_deref().unwrap().contains("/initialize"));
            assert!(!c.is_polling());

            sleep(Duration::from_secs(1)).await;
            assert_eq!(svc.evolve_calls.get(), 0);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn blank_target_is_rejected_locally() {
        local(async {
            let svc = Scripted::new();
            let c = controller(&svc, TickOverlap::Skip);

            let err = c.start("   ", GaConfig::default()).await.unwrap_err();
            assert_eq!(err, SessionError::EmptyTarget);
            assert_eq!(svc.init_calls.get(), 0);
            assert_eq!(c.phase(), Phase::Idle);
            assert!(c.snapshot().error.is_some());
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn second_start_while_running_is_rejected() {
        local(async {
            let svc = Scripted::new();
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HELLO", GaConfig::default()).await.unwrap();

            let err = c.start("WORLD", GaConfig::default()).await.unwrap_err();
            assert_eq!(err, SessionError::AlreadyRunning);
            assert_eq!(c.snapshot().target, "HELLO");
            assert_eq!(svc.init_calls.get(), 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn tick_failure_stops_without_retry() {
        local(async {
            let svc = Scripted::new();
            svc.push(Err(transport("/evolve")));
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HELLO", GaConfig::default()).await.unwrap();

            sleep(ms(150)).await;
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Stopped);
            assert!(!s.phase.is_running());
            assert!(s.error.as_deref().unwrap().contains("/evolve"));
            assert!(!c.is_polling());

            sleep(Duration::from_secs(2)).await;
            assert_eq!(svc.evolve_calls.get(), 1);
            assert_eq!(svc.history_calls.get(), 0);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stop_cancels_future_ticks_and_abandons_in_flight_one() {
        local(async {
            let svc = Scripted::new();
            svc.push_delayed(ms(150), Ok(evolved(1, 0.3, false)));
            let c = controller(&svc, TickOverlap::Allow);
            c.start("HELLO", GaConfig::default()).await.unwrap();

            // Tick 1 fires at 100ms; its evolve call is outstanding until 250ms.
            sleep(ms(120)).await;
            assert_eq!(svc.evolve_calls.get(), 1);
            c.stop();

            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Stopped);
            assert!(s.error.is_none());

            sleep(Duration::from_secs(2)).await;
            let s = c.snapshot();
            assert_eq!(svc.evolve_calls.get(), 1);
            assert_eq!(svc.history_calls.get(), 0);
            assert_eq!(s.phase, Phase::Stopped);
            assert_eq!(s.generation, 0);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stop_from_an_observer_prevents_the_next_tick() {
        local(async {
            let svc = Scripted::new();
            let c = controller(&svc, TickOverlap::Skip);
            let handle = c.clone();
            c.subscribe(move |s| {
                if s.phase == Phase::Running && s.generation == 2 {
                    handle.stop();
                }
            });
            c.start("HELLO", GaConfig::default()).await.unwrap();

            sleep(Duration::from_secs(2)).await;
            assert_eq!(svc.evolve_calls.get(), 2);
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Stopped);
            assert_eq!(s.generation, 2);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn reset_clears_every_field_from_any_phase() {
        local(async {
            let svc = Scripted::new();
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HELLO", GaConfig::default()).await.unwrap();
            sleep(ms(250)).await;
            assert_eq!(c.snapshot().generation, 2);

            c.reset().await.unwrap();
            assert_eq!(c.snapshot(), SessionState::default());
            assert_eq!(svc.reset_calls.get(), 1);
            assert!(!c.is_polling());

            sleep(Duration::from_secs(1)).await;
            assert_eq!(svc.evolve_calls.get(), 2);

            // Reset from Stopped and Complete too.
            c.start("HELLO", GaConfig::default()).await.unwrap();
            c.stop();
            c.reset().await.unwrap();
            assert_eq!(c.snapshot(), SessionState::default());

            svc.push(Ok(evolved(9, 1.0, true)));
            c.start("HELLO", GaConfig::default()).await.unwrap();
            sleep(ms(150)).await;
            assert_eq!(c.phase(), Phase::Complete);
            c.reset().await.unwrap();
            assert_eq!(c.snapshot(), SessionState::default());
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failed_remote_reset_still_clears_and_stops() {
        local(async {
            let svc = Scripted::new();
            *svc.reset_error.borrow_mut() = Some(transport("/reset"));
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HELLO", GaConfig::default()).await.unwrap();
            sleep(ms(150)).await;

            let err = c.reset().await.unwrap_err();
            assert!(err.is_connectivity());

            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Idle);
            assert!(s.population.is_empty());
            assert!(s.history.is_empty());
            assert!(s.error.as_deref().unwrap().starts_with("reset failed"));
            assert!(!c.is_polling());

            sleep(Duration::from_secs(1)).await;
            assert_eq!(svc.evolve_calls.get(), 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn skip_policy_keeps_one_tick_in_flight() {
        local(async {
            let svc = Scripted::new();
            svc.default_delay.set(ms(250));
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HELLO", GaConfig::default()).await.unwrap();

            sleep(Duration::from_secs(2)).await;
            assert_eq!(svc.max_concurrent.get(), 1);
            assert!(svc.evolve_calls.get() >= 4);
            c.stop();
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn allow_policy_overlaps_without_regressing() {
        local(async {
            let svc = Scripted::new();
            svc.default_delay.set(ms(250));
            let c = controller(&svc, TickOverlap::Allow);

            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&seen);
            c.subscribe(move |s| sink.borrow_mut().push(s.generation));
            c.start("HELLO", GaConfig::default()).await.unwrap();

            sleep(Duration::from_secs(2)).await;
            c.stop();
            assert!(svc.max_concurrent.get() > 1);

            let seen = seen.borrow();
            assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn out_of_order_responses_are_dropped() {
        local(async {
            let svc = Scripted::new();
            let c = SessionController::new(
                Rc::clone(&svc),
                TokioRuntime,
                ControllerOptions::default().with_poll_interval(Duration::from_secs(3600)),
            );
            c.start("HELLO", GaConfig::default()).await.unwrap();
            let shared = &c.shared;
            let epoch = shared.epoch.get();

            let report = |generation, complete| TickReport {
                evolved: evolved(generation, 0.5, complete),
                history: Vec::new(),
                best: None,
            };

            shared.reconcile(epoch, 2, report(2, false));
            shared.reconcile(epoch, 1, report(1, false));
            assert_eq!(c.snapshot().generation, 2);

            // A stale completion still ends the session, keeping the newer data.
            shared.reconcile(epoch, 1, report(5, true));
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Complete);
            assert_eq!(s.generation, 2);
            assert!(!c.is_polling());

            // Responses from a previous session are ignored outright.
            shared.reconcile(epoch - 1, 9, report(9, false));
            assert_eq!(c.snapshot().generation, 2);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn no_evolve_after_completion_when_ticks_overlap() {
        local(async {
            let svc = Scripted::new();
            // Tick 1 is dispatched at 100ms and reports completion at 200ms,
            // the same instant tick 2 is due.
            svc.push_delayed(PERIOD, Ok(evolved(7, 1.0, true)));
            let c = controller(&svc, TickOverlap::Allow);
            c.start("TO BE", GaConfig::default()).await.unwrap();

            sleep(Duration::from_secs(2)).await;
            assert_eq!(svc.evolve_calls.get(), 1);
            assert_eq!(c.phase(), Phase::Complete);
            assert_eq!(c.snapshot().generation, 7);
            assert!(!c.is_polling());
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stop_between_dispatch_and_first_poll_issues_no_call() {
        local(async {
            let svc = Scripted::new();
            let c = SessionController::new(
                Rc::clone(&svc),
                TokioRuntime,
                ControllerOptions::default().with_poll_interval(Duration::from_secs(3600)),
            );
            c.start("HELLO", GaConfig::default()).await.unwrap();

            // The tick task is queued but has not run yet.
            Shared::dispatch_tick(&c.shared);
            c.stop();

            sleep(ms(50)).await;
            assert_eq!(svc.evolve_calls.get(), 0);
            assert_eq!(c.phase(), Phase::Stopped);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn reset_between_dispatch_and_first_poll_issues_no_call() {
        local(async {
            let svc = Scripted::new();
            let c = SessionController::new(
                Rc::clone(&svc),
                TokioRuntime,
                ControllerOptions::default().with_poll_interval(Duration::from_secs(3600)),
            );
            c.start("HELLO", GaConfig::default()).await.unwrap();

            Shared::dispatch_tick(&c.shared);
            c.reset().await.unwrap();

            sleep(ms(50)).await;
            assert_eq!(svc.evolve_calls.get(), 0);
            assert_eq!(c.snapshot(), SessionState::default());
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn best_ever_never_decreases_across_ticks() {
        local(async {
            let svc = Scripted::new();
            for (g, best) in [(1, 0.2), (2, 0.4), (3, 0.4), (4, 0.8), (5, 1.0)] {
                svc.push(Ok(evolved(g, best, g == 5)));
            }
            let c = controller(&svc, TickOverlap::Skip);
            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&seen);
            c.subscribe(move |s| sink.borrow_mut().push(s.best_fitness()));
            c.start("TO BE", GaConfig::default()).await.unwrap();

            sleep(Duration::from_secs(1)).await;
            assert_eq!(c.phase(), Phase::Complete);
            let seen = seen.borrow();
            assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
            assert_eq!(seen.last().copied(), Some(1.0));
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn restart_after_completion_begins_a_fresh_session() {
        local(async {
            let svc = Scripted::new();
            svc.push(Ok(evolved(3, 1.0, true)));
            let c = controller(&svc, TickOverlap::Skip);
            c.start("HI", GaConfig::default()).await.unwrap();
            sleep(ms(150)).await;
            assert_eq!(c.phase(), Phase::Complete);

            c.start("HELLO", GaConfig::default()).await.unwrap();
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Running);
            assert_eq!(s.target, "HELLO");
            assert_eq!(s.generation, 0);
            assert!(s.history.is_empty());
            assert!(s.best_ever.is_none());

            sleep(ms(150)).await;
            assert_eq!(c.snapshot().generation, 2);
            c.stop();
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn unhealthy_service_is_reported() {
        local(async {
            let svc = Scripted::new();
            *svc.health_error.borrow_mut() = Some(transport("/health"));
            let c = controller(&svc, TickOverlap::Skip);

            assert!(c.check_health().await.is_err());
            let s = c.snapshot();
            assert_eq!(s.phase, Phase::Idle);
            assert!(s.error.as_deref().unwrap().starts_with("GA service unreachable"));
        })
        .await;
    }
}
