//! Comfort step insertion.
//!
//! After the wrapped algorithm has found the best path, each comfort step
//! not already on it is inserted at the first position where it is
//! applicable, costs no more than its static cost in that state, and leaves
//! the remainder of the path valid.

use std::sync::Arc;

use tracing::debug;
use triage_kernel::knowledge::terminology::TestStep;
use triage_kernel::transition::execute::{apply_step, check_path};

use crate::algorithm::{SearchAlgorithm, SearchContext};
use crate::expansion::{comfort_steps, is_comfort_applicable};
use crate::model::SearchModel;
use crate::path::Path;

#[derive(Debug, Clone)]
pub struct PathExtender {
    inner: Arc<dyn SearchAlgorithm>,
}

impl PathExtender {
    #[must_use]
    pub fn new(inner: Arc<dyn SearchAlgorithm>) -> Self {
        Self { inner }
    }

    /// Returns `path` with every insertable comfort step spliced in.
    #[must_use]
    pub fn extend_path(&self, ctx: &SearchContext, path: &Path) -> Path {
        let session = ctx.session();
        let kb = session.knowledge_base();
        let mut extended = path.clone();
        for comfort in comfort_steps(session) {
            if extended.contains(comfort.id()) {
                continue;
            }
            if let Some(next) = insert_comfort_step(ctx, &extended, comfort) {
                debug!(step = kb.step_name(comfort.id()), "comfort step inserted");
                extended = next;
            }
        }
        extended
    }
}

fn insert_comfort_step(ctx: &SearchContext, path: &Path, comfort: &TestStep) -> Option<Path> {
    let cost_function = ctx.cost_function();
    let kb = ctx.session().knowledge_base();
    let static_costs = cost_function.static_costs(comfort.id(), kb);
    let mut walk = ctx.session().search_copy();
    for (position, &step) in path.steps().iter().enumerate() {
        if is_comfort_applicable(&walk, comfort) {
            let costs = cost_function.costs(comfort.id(), &walk);
            if costs <= static_costs {
                let mut probe = walk.search_copy();
                apply_step(&mut probe, comfort.id());
                if check_path(&probe, path.steps(), position) {
                    return Some(path.inserted(position, comfort.id(), costs));
                }
            }
        }
        apply_step(&mut walk, step);
    }
    None
}

impl SearchAlgorithm for PathExtender {
    fn search(&self, ctx: &SearchContext, model: &mut SearchModel) {
        self.inner.search(ctx, model);
        let Some(best) = model.best_target() else {
            return;
        };
        let Some(path) = best.min_path() else {
            return;
        };
        let key = best.steps().to_vec();
        let extended = self.extend_path(ctx, path);
        if extended.len() != path.len() {
            model.replace_min_path(&key, extended);
        }
    }

    fn name(&self) -> &'static str {
        "path-extender"
    }
}
