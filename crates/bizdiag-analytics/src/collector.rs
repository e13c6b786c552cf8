use bizdiag_model::{AnalyticsFact, FactSet, RunIssue};
use tracing::warn;

/// Accumulates facts in emission order; a repeated key keeps the first fact.
#[derive(Debug, Default)]
pub(crate) struct FactCollector {
    facts: FactSet,
    issues: Vec<RunIssue>,
}

impl FactCollector {
    pub(crate) fn push(&mut self, fact: AnalyticsFact) {
        let key = fact.evidence_key.clone();
        if let Err(error) = self.facts.insert(fact) {
            warn!(evidence_key = %key, "evidence key emitted twice; keeping the first value");
            self.issues.push(RunIssue::data_quality(
                None,
                format!("{error}; the later value was dropped"),
            ));
        }
    }

    pub(crate) fn facts(&self) -> &FactSet {
        &self.facts
    }

    pub(crate) fn finish(self) -> (FactSet, Vec<RunIssue>) {
        (self.facts, self.issues)
    }
}
