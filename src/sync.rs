//! Sync Engine - Plans and applies updates of generated code
//!
//! Planning walks every project, generator and target in configuration order,
//! fetches the generated files, resolves where each belongs on disk and
//! compares it with the local copy. Nothing is written while planning apart
//! from directories needed to resolve a path. Applying then writes every
//! pending update, continuing past individual failures.

use crate::change::ChangeDetector;
use crate::client::GeneratorSource;
use crate::config::{Config, ProjectFilter};
use crate::error::{FileOperation, WriteError};
use crate::paths::{self, display_path};
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A file whose generated content differs from what is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub source: String,
    pub generator: String,
    pub target_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Changed,
    Unchanged,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Changed => write!(f, "changed"),
            FileStatus::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Counters gathered while planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub targets_scanned: usize,
    pub targets_not_found: usize,
    pub files_changed: usize,
    pub files_unchanged: usize,
}

/// Result of a planning pass
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Status lines in the order they were emitted
    pub status_lines: Vec<String>,
    /// Updates in discovery order
    pub updates: Vec<PendingUpdate>,
    pub stats: PlanStats,
}

impl SyncPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Receives status lines as soon as they are known
pub type StatusSink<'s> = &'s mut dyn FnMut(&str);

/// Walks the configuration and accumulates pending updates
pub struct SyncPlanner<'a> {
    config: &'a Config,
    source: &'a dyn GeneratorSource,
    filter: ProjectFilter,
    detector: ChangeDetector<'a>,
    cwd: PathBuf,
}

impl<'a> SyncPlanner<'a> {
    pub fn new(config: &'a Config, source: &'a dyn GeneratorSource) -> Self {
        Self {
            config,
            source,
            filter: ProjectFilter::default(),
            detector: ChangeDetector::default(),
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }

    pub fn with_filter(mut self, filter: ProjectFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_detector(mut self, detector: ChangeDetector<'a>) -> Self {
        self.detector = detector;
        self
    }

    /// Directory that printed paths are shown relative to
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Build the plan. A `NotFound` target is reported and skipped; any other
    /// fetch failure aborts planning.
    pub async fn plan(&self, emit: StatusSink<'_>) -> Result<SyncPlan> {
        let mut plan = SyncPlan::default();
        let create_directories = self.config.settings.create_directories;

        let mut record = |plan: &mut SyncPlan, line: String| {
            emit(&line);
            plan.status_lines.push(line);
        };

        for project in self.config.projects.iter().filter(|p| self.filter.matches(p)) {
            for generator in &project.generators {
                for target in &generator.targets {
                    let target_root = self.config.target_root(target);
                    plan.stats.targets_scanned += 1;

                    record(
                        &mut plan,
                        format!(
                            "  - {}/{}/{}/{} => {}",
                            project.org,
                            project.name,
                            project.version,
                            generator.name,
                            display_path(&target_root, &self.cwd)
                        ),
                    );

                    let files = match self
                        .source
                        .fetch_generated_files(
                            &project.org,
                            &project.name,
                            &project.version,
                            &generator.name,
                        )
                        .await
                    {
                        Ok(files) => files,
                        Err(e) if e.is_not_found() => {
                            warn!("{}", e);
                            plan.stats.targets_not_found += 1;
                            record(&mut plan, "      not found".to_string());
                            continue;
                        }
                        Err(e) => {
                            error!("Aborting sync: {}", e);
                            return Err(anyhow::Error::new(e).context(format!(
                                "Failed to fetch generator {} for {}/{}/{}",
                                generator.name, project.org, project.name, project.version
                            )));
                        }
                    };

                    debug!(
                        "Generator {} returned {} file(s) for {}",
                        generator.name,
                        files.len(),
                        target_root.display()
                    );

                    for file in files {
                        let resolved =
                            paths::resolve(&target_root, &file, create_directories, target.kind)?;
                        let existing = read_existing(&resolved.target_path)?;

                        let status = if self.detector.differs(&file.contents, &existing) {
                            FileStatus::Changed
                        } else {
                            FileStatus::Unchanged
                        };

                        record(
                            &mut plan,
                            format!(
                                "      - {}: {}",
                                display_path(&resolved.target_path, &self.cwd),
                                status
                            ),
                        );

                        match status {
                            FileStatus::Changed => {
                                plan.stats.files_changed += 1;
                                plan.updates.push(PendingUpdate {
                                    source: file.contents,
                                    generator: generator.name.clone(),
                                    target_path: resolved.target_path,
                                });
                            }
                            FileStatus::Unchanged => plan.stats.files_unchanged += 1,
                        }
                    }
                }
            }
        }

        info!(
            "Planned {} update(s) across {} target(s), {} not found",
            plan.updates.len(),
            plan.stats.targets_scanned,
            plan.stats.targets_not_found
        );

        Ok(plan)
    }
}

/// Current content of `path`, or the empty string when it is not a file
fn read_existing(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Ok(String::new());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read existing file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Outcome of applying a plan
#[derive(Debug, Default)]
pub struct ApplySummary {
    pub applied: usize,
    pub failures: Vec<WriteError>,
}

/// Writes pending updates to disk
pub struct SyncApplier {
    cwd: PathBuf,
}

impl SyncApplier {
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }

    /// Write every update in order. A failed write is recorded and the
    /// remaining updates are still attempted.
    pub fn apply(&self, updates: &[PendingUpdate], emit: StatusSink<'_>) -> ApplySummary {
        let mut summary = ApplySummary::default();

        for update in updates {
            emit(&format!(
                "  - {} => {}",
                update.generator,
                display_path(&update.target_path, &self.cwd)
            ));

            match write_update(update) {
                Ok(()) => {
                    debug!("Wrote {}", update.target_path.display());
                    summary.applied += 1;
                }
                Err(e) => {
                    error!("{}: {}", e, e.source);
                    summary.failures.push(e);
                }
            }
        }

        summary
    }
}

impl Default for SyncApplier {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

fn write_update(update: &PendingUpdate) -> Result<(), WriteError> {
    if let Some(parent) = update.target_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WriteError::new(FileOperation::CreateDir, parent.to_path_buf(), e))?;
        }
    }

    std::fs::write(&update.target_path, &update.source)
        .map_err(|e| WriteError::new(FileOperation::Write, update.target_path.clone(), e))
}

/// Options for a single sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Plan and report without writing files
    pub dry_run: bool,
    pub filter: ProjectFilter,
}

/// Results from a complete sync operation
#[derive(Debug)]
pub struct SyncSummary {
    pub stats: PlanStats,
    pub updates: Vec<PendingUpdate>,
    pub files_written: usize,
    pub failures: Vec<WriteError>,
    pub dry_run: bool,
    pub duration: Duration,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plans and applies updates for a configuration
pub struct SyncEngine {
    config: Config,
    source: Box<dyn GeneratorSource>,
    cwd: PathBuf,
}

impl SyncEngine {
    pub fn new(config: Config, source: Box<dyn GeneratorSource>) -> Self {
        Self {
            config,
            source,
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Run a complete sync: plan every target, then write changed files
    pub async fn run(&self, options: &SyncOptions, emit: StatusSink<'_>) -> Result<SyncSummary> {
        let start_time = Instant::now();
        info!("Starting code synchronization");

        let plan = SyncPlanner::new(&self.config, self.source.as_ref())
            .with_filter(options.filter.clone())
            .with_cwd(self.cwd.clone())
            .plan(&mut *emit)
            .await?;

        let mut files_written = 0;
        let mut failures = Vec::new();

        if plan.is_up_to_date() {
            emit("");
            emit("All generated code is up to date");
        } else if options.dry_run {
            emit("");
            emit("Dry run, files that would be updated:");
            for update in &plan.updates {
                emit(&format!(
                    "  - {} => {}",
                    update.generator,
                    display_path(&update.target_path, &self.cwd)
                ));
            }
        } else {
            emit("");
            emit("Copying updated code");
            let applied = SyncApplier::new(self.cwd.clone()).apply(&plan.updates, &mut *emit);
            files_written = applied.applied;
            failures = applied.failures;
        }

        let summary = SyncSummary {
            stats: plan.stats,
            updates: plan.updates,
            files_written,
            failures,
            dry_run: options.dry_run,
            duration: start_time.elapsed(),
        };

        info!(
            "Sync completed in {:.2}s: {} written, {} failed, {} unchanged",
            summary.duration.as_secs_f64(),
            summary.files_written,
            summary.failures.len(),
            summary.stats.files_unchanged
        );

        Ok(summary)
    }
}
