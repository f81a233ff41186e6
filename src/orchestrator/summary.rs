use serde::Serialize;

/// Counters for one scan-and-process pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttemptState {
    pub attempt: u32,
    /// Items whose key was absent from the output store.
    pub added: usize,
    /// Items whose stored value was empty or still equal to the source text.
    pub requeued: usize,
    /// Items copied from the peer store.
    pub cloned: usize,
    /// Items that needed nothing.
    pub satisfied: usize,
    /// Items saved by harvested batches.
    pub done: usize,
    /// Items of failed or short batches.
    pub fault: usize,
    pub batches: usize,
}

impl AttemptState {
    pub fn new(attempt: u32) -> Self {
        Self {
            attempt,
            ..Default::default()
        }
    }

    pub fn submitted(&self) -> usize {
        self.added + self.requeued
    }
}

/// Final totals of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub source_count: usize,
    /// Items saved across all attempts.
    pub translated: usize,
    pub cloned: usize,
    /// Items that needed nothing on the first attempt.
    pub already_present: usize,
    /// Items still needing work when the run stopped.
    pub pending: usize,
    pub attempts: u32,
    pub fault: usize,
    pub batches_submitted: usize,
    pub limit_reached: bool,
    pub attempt_reports: Vec<AttemptState>,
}

impl RunSummary {
    pub(crate) fn new(run_id: impl Into<String>, source_count: usize) -> Self {
        Self {
            run_id: run_id.into(),
            source_count,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, state: AttemptState) {
        if state.attempt == 1 {
            self.already_present = state.satisfied;
        }
        self.attempts = state.attempt;
        self.translated += state.done;
        self.cloned += state.cloned;
        self.fault += state.fault;
        self.batches_submitted += state.batches;
        self.attempt_reports.push(state);
    }

    /// Items accounted for by the stopping rule.
    pub fn accounted(&self) -> usize {
        self.already_present + self.translated + self.cloned
    }

    /// Share of the source collection that is finished, in percent.
    pub fn completion_percent(&self) -> f64 {
        self.percent_of(self.source_count)
    }

    /// Finished items as a share of `total`, which may be larger than the
    /// source collection when only part of a string set was available.
    pub fn percent_of(&self, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        let finished = self.accounted().min(total);
        finished as f64 * 100.0 / total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}
