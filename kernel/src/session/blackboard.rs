//! Per-question fact storage and the fact merge rule.

use std::collections::BTreeMap;

use crate::knowledge::terminology::QuestionId;
use crate::knowledge::value::Value;
use crate::session::fact::Fact;

/// Resolves the value of one question from its facts.
///
/// For a final question a permanently relevant transition fact wins outright
/// (the newest one if several). Otherwise the highest sequence number wins,
/// except that for final questions every non-transition fact outranks every
/// transition fact.
#[must_use]
pub fn merge_facts(facts: &[Fact], final_question: bool) -> Option<&Fact> {
    if final_question {
        if let Some(f) = facts
            .iter()
            .filter(|f| f.source().is_permanently_relevant_transition())
            .max_by_key(|f| f.sequence())
        {
            return Some(f);
        }
    }
    facts.iter().max_by_key(|f| {
        let pinned = final_question && !f.source().is_transition();
        (pinned, f.sequence())
    })
}

/// Facts per question plus the resolved value cache.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    facts: BTreeMap<QuestionId, Vec<Fact>>,
    values: BTreeMap<QuestionId, Value>,
}

impl Blackboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `fact`, replacing the fact of the same source slot.
    pub fn add(&mut self, fact: Fact, final_question: bool) {
        let q = fact.question();
        let facts = self.facts.entry(q).or_default();
        facts.retain(|f| !f.source().same_slot(fact.source()));
        facts.push(fact);
        self.resolve(q, final_question);
    }

    /// Removes the facts of `question` matching `pred` and returns them.
    pub fn remove_where<F>(&mut self, question: QuestionId, final_question: bool, pred: F) -> Vec<Fact>
    where
        F: Fn(&Fact) -> bool,
    {
        let Some(facts) = self.facts.get_mut(&question) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<Fact>, Vec<Fact>) = facts.drain(..).partition(|f| pred(f));
        *facts = kept;
        self.resolve(question, final_question);
        removed
    }

    fn resolve(&mut self, question: QuestionId, final_question: bool) {
        let resolved = self
            .facts
            .get(&question)
            .and_then(|facts| merge_facts(facts, final_question))
            .map(|f| f.value().clone());
        match resolved {
            Some(v) => {
                self.values.insert(question, v);
            }
            None => {
                self.values.remove(&question);
                self.facts.remove(&question);
            }
        }
    }

    #[must_use]
    pub fn value(&self, question: QuestionId) -> Option<&Value> {
        self.values.get(&question)
    }

    #[must_use]
    pub fn facts(&self, question: QuestionId) -> &[Fact] {
        self.facts.get(&question).map_or(&[], Vec::as_slice)
    }

    /// Questions that currently have a value, in id order.
    pub fn answered(&self) -> impl Iterator<Item = (QuestionId, &Value)> {
        self.values.iter().map(|(q, v)| (*q, v))
    }
}
