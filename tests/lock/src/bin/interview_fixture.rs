//! Binary that runs the pump interview for every solution and prints
//! deterministic output lines for cross-process verification.
//!
//! Usage: `interview_fixture`
//!
//! Output: key=value lines, one block per solution and search strategy.

use lock_tests::{pump, pump_engine, run_interview};
use triage_planner::config::{PlannerConfig, SearchStrategy};

fn main() {
    let p = pump();
    let mut merged = PlannerConfig::default();
    merged.search.strategy = SearchStrategy::Merged;

    for (label, config) in [("a_star", PlannerConfig::default()), ("merged", merged)] {
        for solution in ["motor", "bearing", "wear"] {
            let mut engine = pump_engine(&p, &config);
            let outcomes = run_interview(&mut engine, p.findings(solution));
            let protocol = engine.session().protocol();
            let json = protocol
                .to_canonical_json_bytes()
                .expect("protocol canonicalizes");
            let digest = protocol.digest().expect("protocol digests");

            println!("run={label}/{solution}");
            println!("frames={}", outcomes.len());
            println!("entry_count={}", protocol.len());
            println!("protocol_digest={}", digest.as_str());
            println!(
                "protocol_json={}",
                String::from_utf8(json).expect("canonical JSON is UTF-8")
            );
        }
    }
}
