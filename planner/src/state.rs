//! Per-session planner state: the active plan, its cursor and the
//! indications the planner put on the agenda.
//!
//! Every mutation happens inside a propagation frame of the owning session.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use triage_kernel::knowledge::terminology::{SolutionId, TestStepId};
use triage_kernel::session::indication::{Indication, IndicationSource};
use triage_kernel::session::protocol::ProtocolEntry;
use triage_kernel::session::Session;
use triage_kernel::transition::execute::{check_path, is_applicable};
use triage_search::model::SearchModel;
use triage_search::target::Target;

use crate::strategic::StrategicSupport;

#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    search_model: Option<SearchModel>,
    sequence: Option<Vec<TestStepId>>,
    /// Index of the step currently asked; `None` before the first step.
    cursor: Option<usize>,
    /// The sequence leads to a manually selected target.
    manual_sequence: bool,
    indicated: Vec<TestStepId>,
    undiscriminated: Option<BTreeSet<SolutionId>>,
    discriminating_targets: Vec<Target>,
    aborted_manual_target: bool,
    manual_mode: bool,
    unreached_target: Option<TestStepId>,
    watched: BTreeSet<TestStepId>,
}

impl PlannerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Model of the last search, kept for expert mode.
    #[must_use]
    pub fn search_model(&self) -> Option<&SearchModel> {
        self.search_model.as_ref()
    }

    pub(crate) fn set_search_model(&mut self, model: SearchModel) {
        self.search_model = Some(model);
    }

    #[must_use]
    pub fn current_sequence(&self) -> Option<&[TestStepId]> {
        self.sequence.as_deref()
    }

    #[must_use]
    pub fn has_current_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The step of the active path that is currently being asked.
    #[must_use]
    pub fn current_step(&self) -> Option<TestStepId> {
        let seq = self.sequence.as_ref()?;
        seq.get(self.cursor?).copied()
    }

    #[must_use]
    pub fn undiscriminated_solutions(&self) -> Option<&BTreeSet<SolutionId>> {
        self.undiscriminated.as_ref()
    }

    pub(crate) fn set_undiscriminated_solutions(&mut self, solutions: BTreeSet<SolutionId>) {
        self.undiscriminated = Some(solutions);
    }

    /// Targets of the last full plan, with the benefits used for it.
    #[must_use]
    pub fn discriminating_targets(&self) -> &[Target] {
        &self.discriminating_targets
    }

    pub(crate) fn set_discriminating_targets(&mut self, targets: Vec<Target>) {
        self.discriminating_targets = targets;
    }

    /// A manually selected target could not be reached; automatic
    /// replanning stays off until the flag is reset.
    #[must_use]
    pub fn is_aborted_manual_target(&self) -> bool {
        self.aborted_manual_target
    }

    pub fn set_aborted_manual_target(&mut self, aborted: bool) {
        self.aborted_manual_target = aborted;
    }

    #[must_use]
    pub fn is_manual_mode(&self) -> bool {
        self.manual_mode
    }

    pub fn set_manual_mode(&mut self, manual: bool) {
        self.manual_mode = manual;
    }

    /// Last step of a manual path that was reset before completion.
    #[must_use]
    pub fn unreached_target(&self) -> Option<TestStepId> {
        self.unreached_target
    }

    pub fn reset_unreached_target(&mut self) {
        self.unreached_target = None;
    }

    /// Adds `step` to the watch set.
    pub fn watch(&mut self, step: TestStepId) {
        self.watched.insert(step);
    }

    #[must_use]
    pub fn watched(&self) -> &BTreeSet<TestStepId> {
        &self.watched
    }

    /// Steps currently indicated by the planner.
    #[must_use]
    pub fn planner_indications(&self) -> &[TestStepId] {
        &self.indicated
    }

    // -----------------------------------------------------------------------
    // Path lifecycle
    // -----------------------------------------------------------------------

    /// Drops the active path and withdraws every planner indication.
    pub fn reset_path(&mut self, session: &mut Session) {
        if let Some(seq) = self.sequence.take() {
            let unfinished = seq.last().is_some_and(|last| !session.is_done(*last));
            if self.manual_sequence && unfinished {
                self.unreached_target = seq.last().copied();
            }
            debug!(steps = seq.len(), "path reset");
        }
        self.withdraw_indications(session);
        self.cursor = None;
        self.manual_sequence = false;
    }

    /// Indicates `steps` in order and makes them the active path.
    ///
    /// User answers to confirmation questions of the path steps are
    /// retracted so that they are asked again.
    pub fn activate_path(&mut self, session: &mut Session, steps: &[TestStepId], manual: bool) {
        self.withdraw_indications(session);
        for (position, step) in steps.iter().enumerate() {
            retract_confirmations(session, *step);
            session.set_indication(
                *step,
                IndicationSource::Planner,
                Indication::MultipleIndicated(position),
            );
            self.indicated.push(*step);
        }
        self.sequence = Some(steps.to_vec());
        self.cursor = None;
        self.manual_sequence = manual;
        self.unreached_target = None;
        self.record_watched_target(session);
    }

    /// Moves the cursor past every step that is already done.
    ///
    /// Steps reached this way have their transition fired. The path is reset
    /// when it is completed, or when the next step is no longer applicable or
    /// the rest of the path no longer checks out.
    pub fn activate_next_step(&mut self, session: &mut Session) {
        loop {
            let Some(seq) = self.sequence.as_ref() else {
                return;
            };
            if let Some(current) = self.cursor.and_then(|c| seq.get(c)) {
                if !session.is_done(*current) {
                    return;
                }
            }
            let next = self.cursor.map_or(0, |c| c + 1);
            if next >= seq.len() {
                debug!(steps = seq.len(), "path completed");
                self.reset_path(session);
                return;
            }
            let steps = seq.clone();
            let step = steps[next];
            self.cursor = Some(next);
            if let Some(previous) = next.checked_sub(1) {
                retract_confirmations(session, steps[previous]);
            }
            if !is_applicable(session, step) || !check_path(session, &steps, next) {
                debug!(step = %session.knowledge_base().step_name(step), "path no longer valid");
                self.reset_path(session);
                return;
            }
            if !session.is_done(step) {
                return;
            }
            let kb = Arc::clone(session.knowledge_base_arc());
            if let Some(transition) = kb.state_transition(step) {
                transition.fire(session);
            }
            self.cleanup_indication(session, step);
        }
    }

    /// Withdraws the planner indication of a finished step.
    pub fn cleanup_indication(&mut self, session: &mut Session, step: TestStepId) {
        if let Some(position) = self.indicated.iter().position(|s| *s == step) {
            self.indicated.remove(position);
            session.set_indication(step, IndicationSource::Planner, Indication::Neutral);
        }
    }

    /// Compares the undiscriminated solutions of the last full plan with the
    /// current ones. A group that is no longer a subset of the old one is
    /// protocolled as a text entry.
    pub fn has_changed_undiscriminated_solutions(
        &self,
        session: &mut Session,
        supports: &[Arc<dyn StrategicSupport>],
    ) -> bool {
        let Some(previous) = &self.undiscriminated else {
            return false;
        };
        let current: BTreeSet<SolutionId> = supports
            .iter()
            .flat_map(|s| s.undiscriminated_solutions(session))
            .collect();
        if !current.is_subset(previous) {
            let message = format!(
                "The group of undiscriminated solutions has changed from [{}] to [{}].",
                join_ids(previous),
                join_ids(&current)
            );
            warn!("{message}");
            let time = session.propagation_time();
            session.record(ProtocolEntry::Text { time, message });
        }
        *previous != current
    }

    fn withdraw_indications(&mut self, session: &mut Session) {
        for step in self.indicated.drain(..) {
            session.set_indication(step, IndicationSource::Planner, Indication::Neutral);
        }
    }

    fn record_watched_target(&self, session: &mut Session) {
        let Some(target) = self.search_model.as_ref().and_then(SearchModel::best_target) else {
            return;
        };
        if !target.steps().iter().any(|s| self.watched.contains(s)) {
            return;
        }
        let kb = session.knowledge_base();
        let names = target
            .steps()
            .iter()
            .map(|s| kb.step_name(*s).to_owned())
            .collect();
        let time = session.propagation_time();
        session.record(ProtocolEntry::CalculatedTarget {
            time,
            target: names,
        });
    }
}

/// Retracts user answers to the confirmation questions of `step`.
fn retract_confirmations(session: &mut Session, step: TestStepId) {
    let kb = Arc::clone(session.knowledge_base_arc());
    let Some(test_step) = kb.test_step(step) else {
        return;
    };
    for question in test_step.questions() {
        if kb.question(*question).is_some_and(|q| q.is_confirmation()) {
            session.retract_user_value(*question);
        }
    }
}

fn join_ids(ids: &BTreeSet<SolutionId>) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
