//! Where targets come from: strategic supports name the undiscriminated
//! solutions and the questions that would separate them, a target function
//! turns those questions into targets, and a solutions rater decides
//! whether a full replan is worth it at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use triage_kernel::knowledge::terminology::{QuestionId, SolutionId, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::Session;
use triage_search::target::Target;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

pub trait StrategicSupport: Send + Sync + fmt::Debug {
    /// Solutions still in competition.
    fn undiscriminated_solutions(&self, session: &Session) -> BTreeSet<SolutionId>;

    /// Questions whose answers would separate `solutions`.
    fn discriminating_questions(
        &self,
        solutions: &BTreeSet<SolutionId>,
        session: &Session,
    ) -> BTreeSet<QuestionId>;

    /// Expected information gain of answering `steps`. Zero means the
    /// target is useless.
    fn information_gain(
        &self,
        steps: &[TestStepId],
        solutions: &BTreeSet<SolutionId>,
        session: &Session,
    ) -> f64;
}

pub trait TargetFunction: Send + Sync + fmt::Debug {
    fn targets(
        &self,
        session: &Session,
        questions: &BTreeSet<QuestionId>,
        solutions: &BTreeSet<SolutionId>,
        support: &dyn StrategicSupport,
    ) -> Vec<Target>;
}

pub trait SolutionsRater: Send + Sync + fmt::Debug {
    /// Whether planning towards `solutions` is worthwhile.
    fn check(&self, solutions: &BTreeSet<SolutionId>) -> bool;
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// One single-step target per parent step of each discriminating question,
/// in question order, without duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTargetFunction;

impl TargetFunction for DefaultTargetFunction {
    fn targets(
        &self,
        session: &Session,
        questions: &BTreeSet<QuestionId>,
        _solutions: &BTreeSet<SolutionId>,
        _support: &dyn StrategicSupport,
    ) -> Vec<Target> {
        let kb = session.knowledge_base();
        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();
        for question in questions {
            for step in kb.parent_steps(*question) {
                if seen.insert(*step) {
                    targets.push(Target::single(*step));
                }
            }
        }
        targets
    }
}

/// Accepts any group of at least `min_solutions` solutions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSolutionsRater {
    min_solutions: usize,
}

impl DefaultSolutionsRater {
    #[must_use]
    pub fn new(min_solutions: usize) -> Self {
        Self { min_solutions }
    }
}

impl SolutionsRater for DefaultSolutionsRater {
    fn check(&self, solutions: &BTreeSet<SolutionId>) -> bool {
        solutions.len() >= self.min_solutions
    }
}

// ---------------------------------------------------------------------------
// Table-driven support
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SolutionProfile {
    name: String,
    findings: BTreeMap<QuestionId, Value>,
}

/// Strategic support over a finding table: each solution lists the answers
/// it predicts. A solution stays undiscriminated while no answer contradicts
/// it, and the information gain of a target is the entropy reduction over a
/// uniform prior on the remaining solutions.
#[derive(Debug, Clone, Default)]
pub struct TableStrategicSupport {
    solutions: Vec<SolutionProfile>,
}

impl TableStrategicSupport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn add_solution(
        &mut self,
        name: impl Into<String>,
        findings: impl IntoIterator<Item = (QuestionId, Value)>,
    ) -> SolutionId {
        let id = SolutionId(self.solutions.len() as u32);
        self.solutions.push(SolutionProfile {
            name: name.into(),
            findings: findings.into_iter().collect(),
        });
        id
    }

    #[must_use]
    pub fn solution_name(&self, id: SolutionId) -> Option<&str> {
        self.profile(id).map(|p| p.name.as_str())
    }

    fn profile(&self, id: SolutionId) -> Option<&SolutionProfile> {
        self.solutions.get(id.0 as usize)
    }

    fn profiles<'a>(
        &'a self,
        solutions: &'a BTreeSet<SolutionId>,
    ) -> impl Iterator<Item = &'a SolutionProfile> + 'a {
        solutions.iter().filter_map(|id| self.profile(*id))
    }
}

impl StrategicSupport for TableStrategicSupport {
    #[allow(clippy::cast_possible_truncation)]
    fn undiscriminated_solutions(&self, session: &Session) -> BTreeSet<SolutionId> {
        self.solutions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.findings
                    .iter()
                    .all(|(q, v)| session.value(*q).map_or(true, |actual| actual == v))
            })
            .map(|(i, _)| SolutionId(i as u32))
            .collect()
    }

    fn discriminating_questions(
        &self,
        solutions: &BTreeSet<SolutionId>,
        session: &Session,
    ) -> BTreeSet<QuestionId> {
        let mentioned: BTreeSet<QuestionId> = self
            .profiles(solutions)
            .flat_map(|p| p.findings.keys().copied())
            .filter(|q| !session.is_answered(*q))
            .collect();
        mentioned
            .into_iter()
            .filter(|q| {
                let predictions: BTreeSet<Option<&Value>> =
                    self.profiles(solutions).map(|p| p.findings.get(q)).collect();
                predictions.len() > 1
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn information_gain(
        &self,
        steps: &[TestStepId],
        solutions: &BTreeSet<SolutionId>,
        session: &Session,
    ) -> f64 {
        let kb = session.knowledge_base();
        let questions: BTreeSet<QuestionId> = steps
            .iter()
            .filter_map(|s| kb.test_step(*s))
            .flat_map(|s| s.questions().iter().copied())
            .filter(|q| !session.is_answered(*q))
            .collect();
        let n = solutions.len();
        if n < 2 || questions.is_empty() {
            return 0.0;
        }

        let mut partition: BTreeMap<Vec<Option<&Value>>, usize> = BTreeMap::new();
        for profile in self.profiles(solutions) {
            let key = questions.iter().map(|q| profile.findings.get(q)).collect();
            *partition.entry(key).or_default() += 1;
        }
        let total = n as f64;
        let remaining: f64 = partition
            .values()
            .map(|&size| {
                let size = size as f64;
                size / total * size.log2()
            })
            .sum();
        (total.log2() - remaining).max(0.0)
    }
}
