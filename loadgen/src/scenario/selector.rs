//! Weighted scenario selection over cumulative boundaries

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

use super::feed::ScrollFeed;
use super::post::CreatePost;
use super::story::CreateStory;
use super::types::Scenario;

/// Allowed drift of the weight sum away from 1
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("no scenarios registered")]
    Empty,

    #[error("scenario {name} has invalid weight {weight}")]
    InvalidWeight { name: &'static str, weight: f64 },

    #[error("weights sum to {sum}, expected 1")]
    BadSum { sum: f64 },
}

/// A scenario and its probability mass
#[derive(Clone)]
pub struct WeightedScenario {
    pub scenario: Arc<dyn Scenario>,
    pub weight: f64,
}

impl WeightedScenario {
    pub fn new(scenario: Arc<dyn Scenario>, weight: f64) -> Self {
        Self { scenario, weight }
    }
}

/// Picks the first scenario whose cumulative boundary exceeds the drawn value
pub struct ScenarioSelector {
    scenarios: Vec<Arc<dyn Scenario>>,
    boundaries: Vec<f64>,
}

impl std::fmt::Debug for ScenarioSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioSelector")
            .field("names", &self.names())
            .field("boundaries", &self.boundaries)
            .finish()
    }
}

impl ScenarioSelector {
    pub fn new(weighted: Vec<WeightedScenario>) -> Result<Self, WeightError> {
        if weighted.is_empty() {
            return Err(WeightError::Empty);
        }

        let mut scenarios = Vec::with_capacity(weighted.len());
        let mut boundaries = Vec::with_capacity(weighted.len());
        let mut cumulative = 0.0;

        for entry in weighted {
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(WeightError::InvalidWeight {
                    name: entry.scenario.name(),
                    weight: entry.weight,
                });
            }
            cumulative += entry.weight;
            boundaries.push(cumulative);
            scenarios.push(entry.scenario);
        }

        if (cumulative - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::BadSum { sum: cumulative });
        }

        // Boundaries partition [0, 1) exactly
        if let Some(last) = boundaries.last_mut() {
            *last = 1.0;
        }

        Ok(Self {
            scenarios,
            boundaries,
        })
    }

    /// Scroll feed 0.5, create post 0.3, create story 0.2
    pub fn standard() -> Result<Self, WeightError> {
        Self::new(vec![
            WeightedScenario::new(Arc::new(ScrollFeed), 0.5),
            WeightedScenario::new(Arc::new(CreatePost::default()), 0.3),
            WeightedScenario::new(Arc::new(CreateStory::default()), 0.2),
        ])
    }

    /// Scenario for a value in `[0, 1)`; values past the end map to the last one
    pub fn select(&self, value: f64) -> &dyn Scenario {
        let idx = self
            .boundaries
            .iter()
            .position(|&boundary| value < boundary)
            .unwrap_or(self.scenarios.len() - 1);
        self.scenarios[idx].as_ref()
    }

    /// Draw a value from `rng` and select with it
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &dyn Scenario {
        self.select(rng.random::<f64>())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}
