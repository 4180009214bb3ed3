//! Run sequencing: progress and action envelopes, then exactly one final

use contract::EnvelopeKind;
use std::collections::HashMap;

/// Tracks every run seen on the stream, keyed by envelope id
#[derive(Debug, Default)]
pub struct RunTracker {
    runs: HashMap<String, RunState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub progress: usize,
    pub actions: usize,
    pub finished: bool,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted envelope against its run
    pub fn observe(&mut self, run_id: &str, kind: EnvelopeKind) -> Result<(), SequenceError> {
        let run = self.runs.entry(run_id.to_string()).or_default();

        if run.finished {
            return Err(SequenceError::AfterFinal);
        }

        match kind {
            EnvelopeKind::Progress => run.progress = run.progress.saturating_add(1),
            EnvelopeKind::Action => run.actions = run.actions.saturating_add(1),
            EnvelopeKind::Final => run.finished = true,
        }

        Ok(())
    }

    pub fn get(&self, run_id: &str) -> Option<&RunState> {
        self.runs.get(run_id)
    }

    /// Runs without a final envelope yet, sorted
    pub fn open_runs(&self) -> Vec<&str> {
        let mut open: Vec<&str> = self
            .runs
            .iter()
            .filter(|(_, run)| !run.finished)
            .map(|(id, _)| id.as_str())
            .collect();
        open.sort_unstable();
        open
    }

    pub fn finished_count(&self) -> usize {
        self.runs.values().filter(|run| run.finished).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    AfterFinal,
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceError::AfterFinal => write!(f, "envelope_after_final"),
        }
    }
}
