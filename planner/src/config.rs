//! Planner configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a complete configuration.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::terminology::TestStepId;
use triage_search::abort::DefaultAbortStrategy;
use triage_search::algorithm::SearchAlgorithm;
use triage_search::astar::AStarSearch;
use triage_search::extender::PathExtender;
use triage_search::ids::IterativeDeepeningSearch;
use triage_search::multi::{MultiSearchAlgorithm, MultiSearchMode};

use crate::error::ConfigError;
use crate::solver::CostBenefitSolverBuilder;
use crate::strategic::DefaultSolutionsRater;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub search: SearchConfig,
    pub abort: AbortConfig,
    /// Weight of the strategic benefit; 0 disables it.
    pub strategic_benefit_factor: f64,
    /// Start with automatic planning switched off.
    pub manual_mode: bool,
    /// Full replans need at least this many undiscriminated solutions.
    pub min_undiscriminated_solutions: usize,
    /// Names of test steps whose selection is protocolled.
    pub watched_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    AStar,
    IterativeDeepening,
    /// A* after iterative deepening, continuing on abort.
    Continued,
    Merged,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: SearchStrategy,
    pub ids_max_depth: usize,
    /// Insert comfort steps into found paths.
    pub comfort_steps: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::AStar,
            ids_max_depth: IterativeDeepeningSearch::DEFAULT_MAX_DEPTH,
            comfort_steps: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AbortConfig {
    pub max_steps: u64,
    pub increasing_factor: f64,
}

impl Default for AbortConfig {
    fn default() -> Self {
        Self {
            max_steps: DefaultAbortStrategy::DEFAULT_MAX_STEPS,
            increasing_factor: DefaultAbortStrategy::DEFAULT_INCREASING_FACTOR,
        }
    }
}

impl PlannerConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the errors of
    /// [`PlannerConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file exists but cannot be read,
    /// otherwise as [`PlannerConfig::from_json_str`].
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// # Errors
    ///
    /// Rejects a negative strategic benefit factor and abort settings that
    /// [`DefaultAbortStrategy::new`] refuses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategic_benefit_factor.is_nan() || self.strategic_benefit_factor < 0.0 {
            return Err(ConfigError::NegativeStrategicBenefitFactor(
                self.strategic_benefit_factor,
            ));
        }
        self.abort_strategy()?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`DefaultAbortStrategy::new`].
    pub fn abort_strategy(&self) -> Result<DefaultAbortStrategy, ConfigError> {
        Ok(DefaultAbortStrategy::new(
            self.abort.max_steps,
            self.abort.increasing_factor,
        )?)
    }

    /// The configured search stack.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in strategies; composite construction is
    /// still checked.
    pub fn search_algorithm(&self) -> Result<Arc<dyn SearchAlgorithm>, ConfigError> {
        let astar: Arc<dyn SearchAlgorithm> = Arc::new(AStarSearch);
        let ids: Arc<dyn SearchAlgorithm> =
            Arc::new(IterativeDeepeningSearch::new(self.search.ids_max_depth));
        let base: Arc<dyn SearchAlgorithm> = match self.search.strategy {
            SearchStrategy::AStar => astar,
            SearchStrategy::IterativeDeepening => ids,
            SearchStrategy::Continued => Arc::new(MultiSearchAlgorithm::new(
                MultiSearchMode::Continued,
                vec![ids, astar],
            )?),
            SearchStrategy::Merged => Arc::new(MultiSearchAlgorithm::new(
                MultiSearchMode::Merged,
                vec![astar, ids],
            )?),
            SearchStrategy::Parallel => Arc::new(MultiSearchAlgorithm::new(
                MultiSearchMode::Parallel,
                vec![astar, ids],
            )?),
        };
        Ok(if self.search.comfort_steps {
            Arc::new(PathExtender::new(base))
        } else {
            base
        })
    }

    /// Resolves the watched step names against `kb`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTestStep`] for a name `kb` lacks.
    pub fn watched_steps(&self, kb: &KnowledgeBase) -> Result<Vec<TestStepId>, ConfigError> {
        self.watched_steps
            .iter()
            .map(|name| {
                kb.test_step_by_name(name)
                    .ok_or_else(|| ConfigError::UnknownTestStep(name.clone()))
            })
            .collect()
    }

    /// A solver builder carrying every configured setting. Strategic
    /// supports, target and cost functions are added by the caller.
    ///
    /// # Errors
    ///
    /// As [`PlannerConfig::validate`].
    pub fn solver_builder(&self) -> Result<CostBenefitSolverBuilder, ConfigError> {
        self.validate()?;
        Ok(CostBenefitSolverBuilder::default()
            .search_algorithm(self.search_algorithm()?)
            .abort_strategy(Arc::new(self.abort_strategy()?))
            .solutions_rater(Arc::new(DefaultSolutionsRater::new(
                self.min_undiscriminated_solutions,
            )))
            .strategic_benefit_factor(self.strategic_benefit_factor)
            .manual_mode(self.manual_mode))
    }
}
