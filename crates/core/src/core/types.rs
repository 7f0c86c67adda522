//! Wire types shared with the GA service.

use serde::{Deserialize, Serialize};

/// One candidate string and its closeness to the target (`1.0` = exact match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genes: String,
    pub fitness: f64,
}

/// Population statistics produced once per evolution step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub generation: u64,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub worst_fitness: f64,
}

/// One point of the fitness history; the service returns the full ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub generation: u64,
    pub best_fitness: f64,
    pub avg_fitness: f64,
}

/// User-tunable GA parameters. `None` leaves the service default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossover_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elitism_count: Option<u32>,
}

impl GaConfig {
    pub fn with_population_size(mut self, n: u32) -> Self {
        self.population_size = Some(n);
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = Some(rate);
        self
    }

    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = Some(rate);
        self
    }

    pub fn with_elitism_count(mut self, n: u32) -> Self {
        self.elitism_count = Some(n);
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn or(self, defaults: &GaConfig) -> Self {
        Self {
            population_size: self.population_size.or(defaults.population_size),
            mutation_rate: self.mutation_rate.or(defaults.mutation_rate),
            crossover_rate: self.crossover_rate.or(defaults.crossover_rate),
            elitism_count: self.elitism_count.or(defaults.elitism_count),
        }
    }
}

/// Body of `POST /initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub target: String,
    #[serde(flatten)]
    pub config: GaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub population_size: Option<u32>,
    #[serde(default)]
    pub mutation_rate: Option<f64>,
    pub initial_population: Vec<Individual>,
}

/// Body of `POST /evolve`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EvolveRequest {
    pub generations: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvolveResponse {
    pub top_individuals: Vec<Individual>,
    pub statistics: Statistics,
    pub is_complete: bool,
}

/// Body of `GET /best`. The service reports "nothing yet" as empty genes.
#[derive(Debug, Clone, Deserialize)]
pub struct BestResponse {
    #[serde(default)]
    pub genes: String,
    #[serde(default)]
    pub fitness: f64,
    #[serde(default)]
    pub found: bool,
}

impl BestResponse {
    pub fn into_individual(self) -> Option<Individual> {
        if self.genes.is_empty() {
            return None;
        }
        Some(Individual {
            genes: self.genes,
            fitness: self.fitness,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationResponse {
    pub generation: u64,
    pub population: Vec<Individual>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CompletionResponse {
    pub is_complete: bool,
    pub generation: u64,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusResponse {
    #[allow(dead_code)]
    #[serde(default)]
    pub(crate) status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_request_omits_unset_parameters() {
        let req = InitializeRequest {
            target: "TO BE".to_string(),
            config: GaConfig::default().with_population_size(50),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "target": "TO BE", "population_size": 50 })
        );
    }

    #[test]
    fn evolve_request_asks_for_a_generation_count() {
        let json = serde_json::to_value(EvolveRequest { generations: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "generations": 1 }));
    }

    #[test]
    fn empty_best_maps_to_none() {
        let best: BestResponse =
            serde_json::from_str(r#"{"genes":"","fitness":0,"found":false}"#).unwrap();
        assert!(best.into_individual().is_none());

        let best: BestResponse =
            serde_json::from_str(r#"{"genes":"TO BF","fitness":0.8,"found":false}"#).unwrap();
        assert_eq!(
            best.into_individual(),
            Some(Individual {
                genes: "TO BF".to_string(),
                fitness: 0.8
            })
        );
    }

    #[test]
    fn config_or_keeps_explicit_values() {
        let defaults = GaConfig::default()
            .with_population_size(200)
            .with_mutation_rate(0.01);
        let cfg = GaConfig::default().with_population_size(50).or(&defaults);
        assert_eq!(cfg.population_size, Some(50));
        assert_eq!(cfg.mutation_rate, Some(0.01));
        assert_eq!(cfg.crossover_rate, None);
    }
}
