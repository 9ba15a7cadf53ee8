//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while a batch runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Stage transitions and the final outcome
    Stage(StageEvent),
    /// Fingerprint phase events
    Fingerprint(FingerprintEvent),
    /// Comparison phase events
    Compare(CompareEvent),
    /// Relocation phase events
    Relocate(RelocateEvent),
    /// Persistence phase events
    Persist(PersistEvent),
}

/// Stages of a batch, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Init,
    Fingerprint,
    Compare,
    Group,
    Relocate,
    Persist,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Init => write!(f, "Initializing"),
            Stage::Fingerprint => write!(f, "Fingerprinting"),
            Stage::Compare => write!(f, "Comparing"),
            Stage::Group => write!(f, "Grouping"),
            Stage::Relocate => write!(f, "Relocating"),
            Stage::Persist => write!(f, "Persisting"),
            Stage::Done => write!(f, "Done"),
        }
    }
}

/// Batch-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// Moving to a new stage
    Changed { stage: Stage },
    /// Batch finished
    Completed { summary: BatchSummary },
    /// Batch aborted with a fatal error
    Failed { message: String },
}

/// Counters sent when a batch finishes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub distinct: usize,
    pub groups: usize,
    pub cache_hits: usize,
    pub comparisons: usize,
    pub persisted: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Events during the fingerprint phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Fingerprinting has started
    Started { total_files: usize },
    /// One file finished
    Progress(FingerprintProgress),
    /// Fingerprinting completed
    Completed { total: usize, cache_hits: usize },
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Files finished so far
    pub completed: usize,
    /// Files in the batch
    pub total: usize,
    /// File just finished
    pub current_path: PathBuf,
    /// Fingerprints came from the store
    pub cache_hit: bool,
}

/// Events during the comparison phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// Comparison has started
    Started { total_records: usize },
    /// A record was fed to the clustering engine
    Progress(CompareProgress),
    /// Comparison and grouping completed
    Completed { groups: usize, comparisons: usize },
}

/// Progress information during comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareProgress {
    /// Records processed so far
    pub processed: usize,
    /// Records in the batch
    pub total_records: usize,
    /// Pairwise comparisons performed so far
    pub comparisons: usize,
}

/// Events during relocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelocateEvent {
    /// Relocation has started
    Started { groups: usize },
    /// A file was moved
    Moved { from: PathBuf, to: PathBuf },
    /// A move failed; relocation continues
    Error { path: PathBuf, message: String },
    /// Relocation completed
    Completed { moved: usize, errors: usize },
}

/// Events during persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistEvent {
    /// Persistence has started
    Started { records: usize },
    /// A record was written to the store
    Saved { name: String },
    /// A record failed to save; other records continue
    Error { name: String, message: String },
    /// Persistence completed
    Completed { persisted: usize, errors: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Fingerprint(FingerprintEvent::Progress(FingerprintProgress {
            completed: 3,
            total: 10,
            current_path: PathBuf::from("/images/a.png"),
            cache_hit: true,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                assert_eq!(p.completed, 3);
                assert!(p.cache_hit);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Init < Stage::Fingerprint);
        assert!(Stage::Fingerprint < Stage::Compare);
        assert!(Stage::Relocate < Stage::Persist);
        assert!(Stage::Persist < Stage::Done);
    }

    #[test]
    fn batch_summary_is_serializable() {
        let summary = BatchSummary {
            total_files: 12,
            comparisons: 45,
            duration_ms: 5000,
            ..BatchSummary::default()
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"comparisons\":45"));
    }
}
