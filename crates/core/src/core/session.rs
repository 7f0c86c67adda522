//! Session state and the pure half of the lifecycle state machine.
//!
//! Everything here is synchronous and side-effect free: the controller decides
//! *when* a transition happens, these methods define *what* it does to the record.

use serde::{Deserialize, Serialize};

use crate::types::{EvolveResponse, HistoryEntry, Individual, Statistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    /// The service reported the target as found. Polling has ended.
    Complete,
    /// Stopped by the user or by a failing tick. Polling has ended.
    Stopped,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Complete => "complete",
            Phase::Stopped => "stopped",
        }
    }

    pub fn is_running(self) -> bool {
        self == Phase::Running
    }

    /// Phases that end automatic polling but still accept `start`/`reset`.
    pub fn is_finished(self) -> bool {
        matches!(self, Phase::Complete | Phase::Stopped)
    }
}

/// Everything one poll tick learned from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub evolved: EvolveResponse,
    pub history: Vec<HistoryEntry>,
    pub best: Option<Individual>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub generation: u64,
    pub target: String,
    pub population: Vec<Individual>,
    pub best_ever: Option<Individual>,
    pub average_fitness: f64,
    pub history: Vec<HistoryEntry>,
    /// Latest full statistics, including worst fitness.
    pub statistics: Option<Statistics>,
    pub error: Option<String>,
}

impl SessionState {
    /// `Idle → Running` after a successful initialize. Anything left over from a
    /// previous session is discarded.
    pub fn begin(&mut self, target: String, initial_population: Vec<Individual>) {
        *self = SessionState {
            phase: Phase::Running,
            target,
            population: initial_population,
            ..SessionState::default()
        };
    }

    /// Merge one tick. Replaces rather than accumulates, so applying the same
    /// report twice leaves the same state as applying it once.
    ///
    /// Returns `false` (and changes nothing) unless the session is running: a
    /// response that lands after stop/complete/reset must not revive it.
    pub fn apply_tick(&mut self, report: &TickReport) -> bool {
        if self.phase != Phase::Running {
            return false;
        }

        let stats = report.evolved.statistics;
        self.population = report.evolved.top_individuals.clone();
        self.generation = stats.generation;
        self.average_fitness = stats.avg_fitness;
        self.statistics = Some(stats);
        self.best_ever = report.best.clone();
        self.history = report.history.clone();

        if report.evolved.is_complete {
            self.phase = Phase::Complete;
        }
        true
    }

    /// `Running → Complete` without touching the data fields.
    pub fn complete(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Complete;
        true
    }

    /// `Running → Stopped`. `cause` is set on the failure path only.
    pub fn halt(&mut self, cause: Option<String>) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Stopped;
        if cause.is_some() {
            self.error = cause;
        }
    }

    /// Back to a pristine `Idle` record.
    pub fn clear(&mut self) {
        *self = SessionState::default();
    }

    /// Fitness of the best individual seen so far, `0.0` before the first tick.
    pub fn best_fitness(&self) -> f64 {
        self.best_ever.as_ref().map(|b| b.fitness).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(genes: &str, fitness: f64) -> Individual {
        Individual {
            genes: genes.to_string(),
            fitness,
        }
    }

    fn report(generation: u64, best: f64, complete: bool) -> TickReport {
        TickReport {
            evolved: EvolveResponse {
                top_individuals: vec![ind("TO BX", best), ind("TQ BX", best / 2.0)],
                statistics: Statistics {
                    generation,
                    best_fitness: best,
                    avg_fitness: best / 2.0,
                    worst_fitness: 0.0,
                },
                is_complete: complete,
            },
            history: (0..=generation)
                .map(|g| HistoryEntry {
                    generation: g,
                    best_fitness: best,
                    avg_fitness: best / 2.0,
                })
                .collect(),
            best: Some(ind("TO BX", best)),
        }
    }

    fn running() -> SessionState {
        let mut s = SessionState::default();
        s.begin("TO BE".to_string(), vec![ind("ABCDE", 0.0)]);
        s
    }

    #[test]
    fn begin_discards_previous_session() {
        let mut s = running();
        s.apply_tick(&report(5, 0.6, false));
        s.halt(Some("boom".to_string()));

        s.begin("HELLO".to_string(), vec![ind("HELLQ", 0.8)]);
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.generation, 0);
        assert_eq!(s.target, "HELLO");
        assert!(s.history.is_empty());
        assert!(s.best_ever.is_none());
        assert!(s.error.is_none());
        assert_eq!(s.population.len(), 1);
    }

    #[test]
    fn applying_a_tick_twice_is_the_same_as_once() {
        let r = report(3, 0.6, false);
        let mut once = running();
        once.apply_tick(&r);

        let mut twice = running();
        twice.apply_tick(&r);
        twice.apply_tick(&r);

        assert_eq!(once, twice);
        assert_eq!(once.generation, 3);
        assert_eq!(once.history.len(), 4);
        assert_eq!(once.average_fitness, 0.3);
    }

    #[test]
    fn completion_is_idempotent_too() {
        let r = report(42, 1.0, true);
        let mut once = running();
        once.apply_tick(&r);
        let mut twice = once.clone();
        assert!(!twice.apply_tick(&r));
        assert_eq!(once, twice);
        assert_eq!(once.phase, Phase::Complete);
    }

    #[test]
    fn late_tick_does_not_revive_a_stopped_session() {
        let mut s = running();
        s.apply_tick(&report(1, 0.2, false));
        s.halt(None);
        let before = s.clone();

        assert!(!s.apply_tick(&report(2, 0.4, false)));
        assert_eq!(s, before);
        assert_eq!(s.phase, Phase::Stopped);
        assert!(s.error.is_none());
    }

    #[test]
    fn halt_records_cause_only_when_given() {
        let mut s = running();
        s.halt(Some("/evolve: request failed".to_string()));
        assert_eq!(s.phase, Phase::Stopped);
        assert_eq!(s.error.as_deref(), Some("/evolve: request failed"));

        // Not running any more, so nothing changes.
        s.halt(Some("second".to_string()));
        assert_eq!(s.error.as_deref(), Some("/evolve: request failed"));
    }

    #[test]
    fn clear_resets_every_field() {
        for phase in [Phase::Running, Phase::Complete, Phase::Stopped] {
            let mut s = running();
            s.apply_tick(&report(7, 0.9, phase == Phase::Complete));
            if phase == Phase::Stopped {
                s.halt(Some("x".to_string()));
            }
            s.clear();
            assert_eq!(s, SessionState::default());
            assert_eq!(s.phase, Phase::Idle);
            assert_eq!(s.generation, 0);
            assert!(s.population.is_empty());
            assert!(s.best_ever.is_none());
            assert!(s.history.is_empty());
            assert!(s.error.is_none());
        }
    }
}
