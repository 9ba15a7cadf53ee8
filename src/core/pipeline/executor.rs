//! Batch execution implementation.

use super::relocate::Relocator;
use crate::core::cache::FingerprintStore;
use crate::core::comparator::{AlikeGroup, ClusteringEngine};
use crate::core::hasher::{FingerprintEngine, FingerprintMethod, ImageSource, PixelSource};
use crate::core::record::{ContentId, ExclusionPair, ImageRecord};
use crate::core::scanner::{list_images, ImageFilter};
use crate::error::{ConfigError, Result};
use crate::events::{
    null_sender, BatchSummary, CompareEvent, CompareProgress, Event, EventSender,
    FingerprintEvent, FingerprintProgress, PersistEvent, RelocateEvent, Stage, StageEvent,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Smallest usable size factor
pub const MIN_SIZE_FACTOR: u32 = 2;

/// Largest accepted size factor (4096-bit fingerprints)
pub const MAX_SIZE_FACTOR: u32 = 64;

/// Configuration for a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory whose images are sorted
    pub working_dir: PathBuf,
    /// Fingerprint method used for comparison
    pub method: FingerprintMethod,
    /// Largest distance still counted as alike
    pub precision: u32,
    /// Resampling scale; fingerprints have size_factor² bits
    pub size_factor: u32,
    /// Write records to the store after grouping
    pub persist: bool,
    /// Move grouped files into group directories
    pub relocate: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("./images/"),
            method: FingerprintMethod::Perceptual,
            precision: 2,
            size_factor: 8,
            persist: true,
            relocate: true,
        }
    }
}

impl BatchConfig {
    /// Check the configuration before any work starts
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(MIN_SIZE_FACTOR..=MAX_SIZE_FACTOR).contains(&self.size_factor) {
            return Err(ConfigError::InvalidSizeFactor {
                value: self.size_factor,
            });
        }

        if !self.working_dir.exists() {
            return Err(ConfigError::WorkingDirNotFound {
                path: self.working_dir.clone(),
            });
        }

        if !self.working_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.working_dir.clone(),
            });
        }

        Ok(())
    }
}

/// One distinct image in a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub name: String,
    pub identity: ContentId,
    /// Names of files with the same identity
    pub exact_duplicates: Vec<String>,
}

/// A finished group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub id: Uuid,
    /// Where the group was relocated to, if it was
    pub directory: Option<PathBuf>,
    pub members: Vec<GroupMember>,
}

impl GroupReport {
    /// Files in the group, exact duplicates included
    pub fn file_count(&self) -> usize {
        self.members
            .iter()
            .map(|m| 1 + m.exact_duplicates.len())
            .sum()
    }
}

/// Result of running a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Alike groups, in registration order of their first member
    pub groups: Vec<GroupReport>,
    /// Eligible files in the working directory
    pub total_files: usize,
    /// Records with a first-seen identity
    pub distinct: usize,
    /// Records whose fingerprints came from the store
    pub cache_hits: usize,
    /// Pairwise comparisons performed
    pub comparisons: usize,
    /// Records written to the store
    pub persisted: usize,
    /// Non-fatal errors from relocation and persistence
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl BatchReport {
    /// Counters for the completion event
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_files: self.total_files,
            distinct: self.distinct,
            groups: self.groups.len(),
            cache_hits: self.cache_hits,
            comparisons: self.comparisons,
            persisted: self.persisted,
            errors: self.errors.len(),
            duration_ms: self.duration_ms,
        }
    }

    /// Files that ended up in some group
    pub fn grouped_files(&self) -> usize {
        self.groups.iter().map(GroupReport::file_count).sum()
    }
}

/// Builder for a batch
pub struct BatchBuilder {
    config: BatchConfig,
    store: Option<Arc<dyn FingerprintStore>>,
    source: Arc<dyn PixelSource>,
}

impl BatchBuilder {
    /// Create a builder with default configuration and no store
    pub fn new() -> Self {
        Self {
            config: BatchConfig::default(),
            store: None,
            source: Arc::new(ImageSource::new()),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the directory to sort
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = dir.into();
        self
    }

    /// Set the comparison method
    pub fn method(mut self, method: FingerprintMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Set the comparison precision (largest alike distance)
    pub fn precision(mut self, precision: u32) -> Self {
        self.config.precision = precision;
        self
    }

    /// Set the size factor
    pub fn size_factor(mut self, size_factor: u32) -> Self {
        self.config.size_factor = size_factor;
        self
    }

    /// Enable or disable persistence
    pub fn persist(mut self, persist: bool) -> Self {
        self.config.persist = persist;
        self
    }

    /// Enable or disable relocation
    pub fn relocate(mut self, relocate: bool) -> Self {
        self.config.relocate = relocate;
        self
    }

    /// Set the fingerprint store
    pub fn store(mut self, store: Arc<dyn FingerprintStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the pixel source
    pub fn source(mut self, source: Arc<dyn PixelSource>) -> Self {
        self.source = source;
        self
    }

    /// Build the batch
    pub fn build(self) -> Batch {
        Batch {
            config: self.config,
            store: self.store,
            source: self.source,
        }
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One sorting run over a working directory
pub struct Batch {
    config: BatchConfig,
    store: Option<Arc<dyn FingerprintStore>>,
    source: Arc<dyn PixelSource>,
}

impl Batch {
    /// Create a new batch builder
    pub fn builder() -> BatchBuilder {
        BatchBuilder::new()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run the batch without events
    pub fn run(&self) -> Result<BatchReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the batch with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<BatchReport> {
        let result = self.execute(events);

        if let Err(e) = &result {
            tracing::error!(error = %e, "Batch failed");
            events.send(Event::Stage(StageEvent::Failed {
                message: e.to_string(),
            }));
        }

        result
    }

    /// Register two files in the working directory as never alike.
    ///
    /// Both files are decoded so the pair is stored by content identity.
    pub fn exclude(&self, first: &str, second: &str) -> Result<ExclusionPair> {
        let store = self.store.as_ref().ok_or(ConfigError::StoreRequired)?;
        self.config.validate()?;

        let a = self.identify(first)?;
        let b = self.identify(second)?;

        if a == b {
            return Err(ConfigError::SelfExclusion {
                name: second.to_string(),
                identity: a.to_string(),
            }
            .into());
        }

        store.save_exclusion(&a, &b)?;
        tracing::info!(first, second, "Registered exclusion");

        Ok(ExclusionPair::new(a, b))
    }

    fn identify(&self, name: &str) -> Result<ContentId> {
        let samples = self.source.decode(&self.config.working_dir.join(name))?;
        Ok(ContentId::from_samples(&samples))
    }

    fn enter(&self, stage: Stage, events: &EventSender) {
        tracing::info!(%stage, "Entering stage");
        events.send(Event::Stage(StageEvent::Changed { stage }));
    }

    fn persisting(&self) -> Option<&Arc<dyn FingerprintStore>> {
        if self.config.persist {
            self.store.as_ref()
        } else {
            None
        }
    }

    fn execute(&self, events: &EventSender) -> Result<BatchReport> {
        let start_time = Instant::now();

        self.enter(Stage::Init, events);
        self.config.validate()?;
        let engine = FingerprintEngine::new(self.config.size_factor);

        let files = list_images(&self.config.working_dir, &ImageFilter::new())?;
        let total_files = files.len();
        tracing::info!(
            dir = %self.config.working_dir.display(),
            files = total_files,
            method = %self.config.method,
            precision = self.config.precision,
            size_factor = self.config.size_factor,
            "Listed working directory"
        );

        // Fingerprint
        self.enter(Stage::Fingerprint, events);
        events.send(Event::Fingerprint(FingerprintEvent::Started { total_files }));

        let completed = AtomicUsize::new(0);
        let records = files
            .par_iter()
            .map(|path| -> Result<ImageRecord> {
                let record = self.fingerprint_file(path, &engine)?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Fingerprint(FingerprintEvent::Progress(
                    FingerprintProgress {
                        completed: done,
                        total: total_files,
                        current_path: path.clone(),
                        cache_hit: record.cache_hit,
                    },
                )));
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        let cache_hits = records.iter().filter(|r| r.cache_hit).count();
        events.send(Event::Fingerprint(FingerprintEvent::Completed {
            total: records.len(),
            cache_hits,
        }));

        // Compare
        self.enter(Stage::Compare, events);
        events.send(Event::Compare(CompareEvent::Started {
            total_records: total_files,
        }));

        let mut clustering = ClusteringEngine::new(self.config.method, self.config.precision);
        for (i, record) in records.into_iter().enumerate() {
            clustering.add(record)?;
            events.send(Event::Compare(CompareEvent::Progress(CompareProgress {
                processed: i + 1,
                total_records: total_files,
                comparisons: clustering.comparisons(),
            })));
        }

        // Group
        self.enter(Stage::Group, events);
        let groups = clustering.groups();
        let comparisons = clustering.comparisons();
        let distinct = clustering.distinct().to_vec();
        let mut records = clustering.into_records();

        events.send(Event::Compare(CompareEvent::Completed {
            groups: groups.len(),
            comparisons,
        }));
        tracing::info!(
            groups = groups.len(),
            distinct = distinct.len(),
            comparisons,
            "Grouping finished"
        );

        // Reports are taken before relocation changes paths
        let mut group_reports: Vec<GroupReport> = groups
            .iter()
            .map(|g| Self::group_report(g, &records))
            .collect();
        let mut errors = Vec::new();

        if self.config.relocate {
            self.enter(Stage::Relocate, events);
            self.relocate(&groups, &mut records, &mut group_reports, &mut errors, events);
        }

        let mut persisted = 0;
        if let Some(store) = self.persisting() {
            self.enter(Stage::Persist, events);
            persisted = self.persist(
                store.as_ref(),
                &distinct,
                &mut records,
                &mut errors,
                events,
            );
        }

        self.enter(Stage::Done, events);

        let report = BatchReport {
            groups: group_reports,
            total_files,
            distinct: distinct.len(),
            cache_hits,
            comparisons,
            persisted,
            errors,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            files = report.total_files,
            groups = report.groups.len(),
            cache_hits = report.cache_hits,
            persisted = report.persisted,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Batch finished"
        );
        events.send(Event::Stage(StageEvent::Completed {
            summary: report.summary(),
        }));

        Ok(report)
    }

    /// Decode one file and load or compute its fingerprint
    fn fingerprint_file(&self, path: &Path, engine: &FingerprintEngine) -> Result<ImageRecord> {
        let method = self.config.method;
        let size_factor = self.config.size_factor;

        let samples = self.source.decode(path)?;
        let mut record = ImageRecord::new(path, &samples, size_factor);

        if let Some(store) = &self.store {
            if let Some(stored) = store.find(&record.id)? {
                record.exists = true;
                record.copy = stored.name != record.name;
            }

            if let Some(cached) = store.find_fingerprints(&record.id)?.remove(&size_factor) {
                record.cache_hit = cached.get(method).is_some();
                record.fingerprints = cached;
            }

            record.ignore = store.find_exclusions(&record.id)?;
        }

        if !record.cache_hit {
            let fingerprint = engine.compute(method, &samples, self.source.as_ref())?;
            record.fingerprints.insert(method, fingerprint);
        }

        if let Some(fingerprint) = record.fingerprint(method) {
            tracing::debug!(
                name = %record.name,
                identity = %record.id.short(12),
                %fingerprint,
                cache_hit = record.cache_hit,
                "Fingerprinted"
            );
        }

        // Stored sets hold every method; the samples are not kept past here
        if self.persisting().is_some() && record.needs_persisting() {
            engine.complete(&mut record.fingerprints, &samples, self.source.as_ref())?;
        }

        Ok(record)
    }

    fn group_report(group: &AlikeGroup, records: &[ImageRecord]) -> GroupReport {
        GroupReport {
            id: group.id,
            directory: None,
            members: group
                .members
                .iter()
                .map(|&m| GroupMember {
                    name: records[m].name.clone(),
                    identity: records[m].id.clone(),
                    exact_duplicates: records[m]
                        .exact_duplicates
                        .iter()
                        .map(|&d| records[d].name.clone())
                        .collect(),
                })
                .collect(),
        }
    }

    fn relocate(
        &self,
        groups: &[AlikeGroup],
        records: &mut [ImageRecord],
        reports: &mut [GroupReport],
        errors: &mut Vec<String>,
        events: &EventSender,
    ) {
        events.send(Event::Relocate(RelocateEvent::Started {
            groups: groups.len(),
        }));

        let relocator = Relocator::new(&self.config.working_dir);
        let shared: &[ImageRecord] = records;
        let outcomes: Vec<_> = groups
            .par_iter()
            .map(|group| relocator.relocate_group(group, shared, events))
            .collect();

        let mut moved = 0;
        let mut failed = 0;
        for (report, outcome) in reports.iter_mut().zip(outcomes) {
            report.directory = outcome.directory;
            for (index, path) in outcome.moves {
                records[index].path = path;
                moved += 1;
            }
            for error in outcome.errors {
                tracing::warn!(error = %error, "Relocation failed");
                errors.push(error.to_string());
                failed += 1;
            }
        }

        events.send(Event::Relocate(RelocateEvent::Completed {
            moved,
            errors: failed,
        }));
    }

    fn persist(
        &self,
        store: &dyn FingerprintStore,
        distinct: &[usize],
        records: &mut [ImageRecord],
        errors: &mut Vec<String>,
        events: &EventSender,
    ) -> usize {
        events.send(Event::Persist(PersistEvent::Started {
            records: distinct.len(),
        }));

        let shared: &[ImageRecord] = records;
        let results: Vec<(usize, Result<bool>)> = distinct
            .par_iter()
            .map(|&index| (index, Self::persist_record(store, &shared[index])))
            .collect();

        let mut persisted = 0;
        let mut failed = 0;
        for (index, result) in results {
            let record = &mut records[index];

            match result {
                Ok(true) => {
                    record.persisted = true;
                    persisted += 1;
                    events.send(Event::Persist(PersistEvent::Saved {
                        name: record.name.clone(),
                    }));
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(name = %record.name, error = %e, "Persisting failed");
                    events.send(Event::Persist(PersistEvent::Error {
                        name: record.name.clone(),
                        message: e.to_string(),
                    }));
                    errors.push(format!("{}: {}", record.name, e));
                    failed += 1;
                }
            }
        }

        events.send(Event::Persist(PersistEvent::Completed {
            persisted,
            errors: failed,
        }));

        persisted
    }

    /// Write one record; `Ok(false)` when there was nothing to write
    fn persist_record(store: &dyn FingerprintStore, record: &ImageRecord) -> Result<bool> {
        if !record.needs_persisting() {
            return Ok(false);
        }

        if !record.exists {
            store.save_image(&record.id, &record.name, record.width, record.height)?;
        }

        store.save_fingerprints(&record.id, record.size_factor(), &record.fingerprints)?;
        Ok(true)
    }
}
