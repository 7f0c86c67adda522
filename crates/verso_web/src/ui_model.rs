//! UI models that should be available on both wasm and native.
//!
//! Keeping these out of the wasm-only `web` module lets us unit-test the form
//! parsing and display helpers on the host.

use verso::config::{ParamRange, CROSSOVER_RATE, ELITISM_COUNT, MUTATION_RATE, POPULATION_SIZE};
use verso::session::Phase;
use verso::types::GaConfig;

pub const STORAGE_KEY_API_URL: &str = "verso.api_url";

/// Label and accent color for the phase badge.
pub fn phase_badge(phase: Phase) -> (&'static str, &'static str) {
    match phase {
        Phase::Idle => ("Idle", "#94a3b8"),
        Phase::Running => ("Running", "#7aa2ff"),
        Phase::Complete => ("Complete", "#4ade80"),
        Phase::Stopped => ("Stopped", "#fbbf24"),
    }
}

pub fn format_percent(fitness: f64) -> String {
    format!("{:.1}%", fitness * 100.0)
}

/// Start is offered whenever no session is running; a finished one is replaced.
pub fn can_start(phase: Phase, target: &str) -> bool {
    !phase.is_running() && !target.trim().is_empty()
}

pub fn can_stop(phase: Phase) -> bool {
    phase.is_running()
}

/// Raw text of the start form. Empty parameter fields leave the service
/// default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartForm {
    pub target: String,
    pub population_size: String,
    pub mutation_rate: String,
    pub crossover_rate: String,
    pub elitism_count: String,
}

impl StartForm {
    pub fn to_config(&self) -> Result<GaConfig, String> {
        Ok(GaConfig {
            population_size: parse_count(&POPULATION_SIZE, &self.population_size)?,
            mutation_rate: parse_rate(&MUTATION_RATE, &self.mutation_rate)?,
            crossover_rate: parse_rate(&CROSSOVER_RATE, &self.crossover_rate)?,
            elitism_count: parse_count(&ELITISM_COUNT, &self.elitism_count)?,
        })
    }
}

fn parse_rate(range: &ParamRange, text: &str) -> Result<Option<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("{}: {text:?} is not a number", range.label)),
    }
}

fn parse_count(range: &ParamRange, text: &str) -> Result<Option<u32>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u32>()
        .map(Some)
        .map_err(|_| format!("{}: {text:?} is not a whole number", range.label))
}

/// Accept an `http(s)://` base URL, without its trailing slash.
pub fn normalize_api_url(text: &str) -> Option<String> {
    let url = text.trim().trim_end_matches('/');
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    if rest.is_empty() {
        return None;
    }
    Some(url.to_string())
}

/// Each character of `genes` paired with whether it already matches `target`
/// at the same position.
pub fn gene_matches(genes: &str, target: &str) -> Vec<(char, bool)> {
    let mut target = target.chars();
    genes
        .chars()
        .map(|c| (c, target.next() == Some(c)))
        .collect()
}
