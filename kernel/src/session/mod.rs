//! Session module: the mutable state of one interview.
//!
//! A [`Session`] owns the blackboard, the indications, the protocol and the
//! current propagation frame. Search explores [`Session::search_copy`]
//! copies, never the live session.

pub mod blackboard;
pub mod fact;
pub mod indication;
pub mod propagation;
pub mod protocol;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::knowledge::base::KnowledgeBase;
use crate::knowledge::condition::Answers;
use crate::knowledge::terminology::{QuestionId, TestStepId};
use crate::knowledge::value::Value;
use crate::proof::hash::{canonical_hash, ContentHash};
use crate::proof::hash_domain::HashDomain;

use self::blackboard::Blackboard;
use self::fact::{Fact, FactSource};
use self::indication::{merge_indications, Indication, IndicationSource};
use self::propagation::PropagationEntry;
use self::protocol::{Protocol, ProtocolEntry};

#[derive(Debug, Clone)]
pub struct Session {
    knowledge_base: Arc<KnowledgeBase>,
    blackboard: Blackboard,
    indications: BTreeMap<TestStepId, BTreeMap<IndicationSource, Indication>>,
    protocol: Protocol,
    pending: Vec<PropagationEntry>,
    depth: u32,
    clock: u64,
    copy: bool,
}

impl Session {
    /// Creates a session and asserts the init values of the knowledge base.
    #[must_use]
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        let mut session = Self::empty(knowledge_base, false);
        let init: Vec<Fact> = session
            .knowledge_base
            .questions()
            .filter_map(|q| {
                q.init_value()
                    .map(|v| Fact::new(q.id(), v.clone(), FactSource::Init))
            })
            .collect();
        for fact in init {
            session.add_fact(fact);
        }
        session.pending.clear();
        session
    }

    fn empty(knowledge_base: Arc<KnowledgeBase>, copy: bool) -> Self {
        Self {
            knowledge_base,
            blackboard: Blackboard::new(),
            indications: BTreeMap::new(),
            protocol: Protocol::new(),
            pending: Vec::new(),
            depth: 0,
            clock: 0,
            copy,
        }
    }

    /// A disposable copy for exploration: facts and indications are copied,
    /// the protocol and the open propagation frame are not.
    #[must_use]
    pub fn search_copy(&self) -> Self {
        Self {
            knowledge_base: Arc::clone(&self.knowledge_base),
            blackboard: self.blackboard.clone(),
            indications: self.indications.clone(),
            protocol: Protocol::new(),
            pending: Vec::new(),
            depth: 0,
            clock: self.clock,
            copy: true,
        }
    }

    /// A disposable copy with no facts at all, not even init values.
    #[must_use]
    pub fn blank_copy(&self) -> Self {
        Self::empty(Arc::clone(&self.knowledge_base), true)
    }

    #[must_use]
    pub fn is_copy(&self) -> bool {
        self.copy
    }

    #[must_use]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    #[must_use]
    pub fn knowledge_base_arc(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge_base
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn value(&self, question: QuestionId) -> Option<&Value> {
        self.blackboard.value(question)
    }

    #[must_use]
    pub fn is_answered(&self, question: QuestionId) -> bool {
        self.blackboard.value(question).is_some()
    }

    #[must_use]
    pub fn facts(&self, question: QuestionId) -> &[Fact] {
        self.blackboard.facts(question)
    }

    pub fn answered_questions(&self) -> impl Iterator<Item = (QuestionId, &Value)> {
        self.blackboard.answered()
    }

    /// Adds a fact and records the resulting value change, if any.
    pub fn add_fact(&mut self, fact: Fact) {
        let question = fact.question();
        let strategic = !matches!(fact.source(), FactSource::User | FactSource::Init);
        let old = self.blackboard.value(question).cloned();
        let final_question = self.knowledge_base.is_final(question);
        self.blackboard.add(fact, final_question);
        self.record_value_change(question, old, strategic);
    }

    /// Answers `question` as the user.
    pub fn set_value(&mut self, question: QuestionId, value: Value) {
        self.add_fact(Fact::new(question, value, FactSource::User));
    }

    /// Removes the facts of `question` matching `pred`.
    pub fn remove_facts_where<F>(&mut self, question: QuestionId, pred: F) -> Vec<Fact>
    where
        F: Fn(&Fact) -> bool,
    {
        let old = self.blackboard.value(question).cloned();
        let final_question = self.knowledge_base.is_final(question);
        let removed = self.blackboard.remove_where(question, final_question, pred);
        let strategic = removed
            .iter()
            .all(|f| !matches!(f.source(), FactSource::User | FactSource::Init));
        self.record_value_change(question, old, strategic);
        removed
    }

    /// Retracts the user answer of `question`.
    pub fn retract_user_value(&mut self, question: QuestionId) -> Vec<Fact> {
        self.remove_facts_where(question, |f| *f.source() == FactSource::User)
    }

    /// Removes one specific fact (matched by sequence number).
    pub fn remove_fact(&mut self, fact: &Fact) -> bool {
        let seq = fact.sequence();
        !self
            .remove_facts_where(fact.question(), |f| f.sequence() == seq)
            .is_empty()
    }

    fn record_value_change(&mut self, question: QuestionId, old: Option<Value>, strategic: bool) {
        let new = self.blackboard.value(question).cloned();
        if old != new {
            self.pending.push(PropagationEntry::Value {
                question,
                old,
                new,
                strategic,
            });
        }
    }

    /// All questions of `step` are answered.
    #[must_use]
    pub fn is_done(&self, step: TestStepId) -> bool {
        self.knowledge_base
            .test_step(step)
            .is_some_and(|s| s.questions().iter().all(|q| self.is_answered(*q)))
    }

    /// Fingerprint of the values of `questions` (unanswered questions included
    /// as absent).
    #[must_use]
    pub fn state_fingerprint(&self, questions: &BTreeSet<QuestionId>) -> ContentHash {
        let mut data = Vec::with_capacity(questions.len() * 8);
        for q in questions {
            data.extend_from_slice(&q.0.to_le_bytes());
            match self.blackboard.value(*q) {
                Some(v) => data.extend_from_slice(&v.canonical_bytes()),
                None => data.push(0),
            }
        }
        canonical_hash(HashDomain::SearchState, &data)
    }

    // -----------------------------------------------------------------------
    // Indications
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn indication(&self, step: TestStepId) -> Indication {
        self.indications
            .get(&step)
            .map_or(Indication::Neutral, merge_indications)
    }

    #[must_use]
    pub fn is_contra_indicated(&self, step: TestStepId) -> bool {
        self.indication(step).is_contra_indicated()
    }

    /// Sets the indication of `step` for one source; `Neutral` removes it.
    pub fn set_indication(&mut self, step: TestStepId, source: IndicationSource, indication: Indication) {
        let old = self.indication(step);
        let by_source = self.indications.entry(step).or_default();
        if indication == Indication::Neutral {
            by_source.remove(&source);
        } else {
            by_source.insert(source, indication);
        }
        if by_source.is_empty() {
            self.indications.remove(&step);
        }
        let new = self.indication(step);
        if old != new {
            self.pending
                .push(PropagationEntry::Indication { step, old, new });
        }
    }

    /// Steps currently indicated by any source.
    #[must_use]
    pub fn indicated_steps(&self) -> Vec<TestStepId> {
        self.indications
            .keys()
            .copied()
            .filter(|s| self.indication(*s).is_indicated())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Propagation
    // -----------------------------------------------------------------------

    /// Opens a (possibly nested) propagation frame.
    pub fn open_propagation(&mut self) {
        self.depth += 1;
    }

    /// Closes a frame. The outermost commit advances the propagation time and
    /// returns every change recorded since the previous outermost commit;
    /// nested commits return nothing.
    pub fn commit_propagation(&mut self) -> Vec<PropagationEntry> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return Vec::new();
        }
        self.clock += 1;
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn is_propagating(&self) -> bool {
        self.depth > 0
    }

    /// Changes recorded in the open frame so far.
    #[must_use]
    pub fn pending_changes(&self) -> &[PropagationEntry] {
        &self.pending
    }

    /// Takes the changes recorded so far without closing the frame, so that
    /// listeners can react inside the same frame.
    pub fn drain_changes(&mut self) -> Vec<PropagationEntry> {
        std::mem::take(&mut self.pending)
    }

    /// Logical clock: number of outermost commits.
    #[must_use]
    pub fn propagation_time(&self) -> u64 {
        self.clock
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Appends to the protocol; copies never protocol.
    pub fn record(&mut self, entry: ProtocolEntry) {
        if !self.copy {
            self.protocol.push(entry);
        }
    }
}

impl Answers for Session {
    fn value(&self, question: QuestionId) -> Option<&Value> {
        self.blackboard.value(question)
    }
}
