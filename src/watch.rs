//! Watch mode for automatic per-category rebuilds on file changes
//!
//! Provides file system watching with debouncing for the `assetflow watch`
//! and `assetflow dev` commands. A changed path is routed to the categories
//! whose watch glob matches it, and each category rebuilds on its own worker
//! thread. After every rebuild a reload notification goes to the browsers.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, channel};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::build::discovery::{absolute_pattern, glob_base};
use crate::build::{BuildContext, BuildPipeline, StepKind, StepResult};
use crate::category::AssetCategory;
use crate::server::{ReloadEvent, ReloadHub};
use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", .path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// No watch root exists on disk
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// A watch glob does not parse
    #[error("Invalid watch pattern for {category}: {source}")]
    InvalidPattern {
        category: AssetCategory,
        #[source]
        source: glob::PatternError,
    },
    /// A rebuild worker could not be started
    #[error("Failed to start rebuild worker: {0}")]
    Worker(#[source] io::Error),
}

/// One category's watch glob, resolved against the project root.
#[derive(Debug, Clone)]
pub struct WatchRegistration {
    /// Category rebuilt when the pattern matches
    pub category: AssetCategory,
    /// Absolute glob pattern
    pub pattern: Pattern,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Routes changed paths to the categories that must rebuild.
#[derive(Debug, Clone)]
pub struct WatchDispatcher {
    registrations: Vec<WatchRegistration>,
    roots: Vec<PathBuf>,
}

impl WatchDispatcher {
    /// Register every category's watch glob.
    ///
    /// Patterns are anchored at the canonical project root, which is also how
    /// the OS watcher reports paths.
    pub fn new(ctx: &BuildContext) -> Result<Self, WatchError> {
        let root =
            fs::canonicalize(ctx.project_root()).unwrap_or_else(|_| ctx.project_root().to_path_buf());

        let mut registrations = Vec::new();
        let mut bases = Vec::new();
        for category in AssetCategory::ALL {
            let glob = absolute_pattern(&root, ctx.paths(category).watch_glob());
            let pattern = Pattern::new(&glob)
                .map_err(|source| WatchError::InvalidPattern { category, source })?;
            bases.push(glob_base(&glob));
            registrations.push(WatchRegistration { category, pattern });
        }

        Ok(Self { registrations, roots: outermost(bases) })
    }

    /// The registrations, in build order.
    pub fn registrations(&self) -> &[WatchRegistration] {
        &self.registrations
    }

    /// Directories to watch recursively. None is nested inside another.
    pub fn watch_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Categories whose watch glob matches `path`, in build order.
    pub fn dispatch(&self, path: &Path) -> Vec<AssetCategory> {
        self.registrations
            .iter()
            .filter(|r| r.pattern.matches_path_with(path, MATCH_OPTIONS))
            .map(|r| r.category)
            .collect()
    }
}

/// Drop directories contained in another one.
fn outermost(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort();
    dirs.dedup();
    let mut roots: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !roots.iter().any(|root| dir.starts_with(root)) {
            roots.push(dir);
        }
    }
    roots
}

/// One worker thread per category.
///
/// Requests for the same category run one at a time; requests that pile up
/// while a rebuild runs collapse into a single follow-up rebuild. Different
/// categories rebuild concurrently.
pub struct RebuildScheduler {
    senders: HashMap<AssetCategory, mpsc::Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl RebuildScheduler {
    /// Start a worker for each category, all running `rebuild`.
    pub fn spawn<F>(categories: &[AssetCategory], rebuild: F) -> io::Result<Self>
    where
        F: Fn(AssetCategory) + Send + Sync + 'static,
    {
        let rebuild = Arc::new(rebuild);
        let mut senders = HashMap::new();
        let mut workers = Vec::new();

        for &category in categories {
            let (tx, rx) = channel::<()>();
            let rebuild = Arc::clone(&rebuild);
            let handle = thread::Builder::new()
                .name(format!("rebuild-{}", category.label()))
                .spawn(move || {
                    while rx.recv().is_ok() {
                        while rx.try_recv().is_ok() {}
                        rebuild(category);
                    }
                })?;
            senders.insert(category, tx);
            workers.push(handle);
        }

        Ok(Self { senders, workers })
    }

    /// Queue a rebuild. Returns false if the category has no worker.
    pub fn schedule(&self, category: AssetCategory) -> bool {
        self.senders.get(&category).map(|tx| tx.send(()).is_ok()).unwrap_or(false)
    }

    /// Stop accepting requests and wait for queued rebuilds to finish.
    pub fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("rebuild worker panicked");
            }
        }
    }
}

/// Clear the terminal screen. No-op when stdout is redirected.
fn clear_screen() {
    if !atty::is(atty::Stream::Stdout) {
        return;
    }
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
pub fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Print a rebuild outcome to the console.
pub fn print_step_result(result: &StepResult) {
    if result.is_success() {
        let files = result.outputs.len();
        println!(
            "[{}] Finished '{}' after {} - {} file{}",
            timestamp(),
            result.step,
            format_duration(result.duration),
            files,
            if files == 1 { "" } else { "s" }
        );
    } else {
        eprintln!(
            "[{}] '{}' errored after {}: {}",
            timestamp(),
            result.step,
            format_duration(result.duration),
            result.status
        );
    }

    for warning in &result.warnings {
        eprintln!("[{}] Warning: {}", timestamp(), warning);
    }
}

/// Watch the sources and rebuild affected categories.
///
/// This function blocks and runs until interrupted (Ctrl+C). Rebuild
/// failures and watcher errors are reported and watching continues.
pub fn watch_and_rebuild(ctx: BuildContext, hub: ReloadHub) -> Result<(), WatchError> {
    let dispatcher = WatchDispatcher::new(&ctx)?;

    let roots: Vec<PathBuf> =
        dispatcher.watch_roots().iter().filter(|root| root.is_dir()).cloned().collect();
    if roots.is_empty() {
        return Err(WatchError::SourceNotFound(ctx.src_dir()));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(ctx.config().watch.debounce_ms as u64);
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    for root in &roots {
        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: root.clone(), source })?;
    }

    if ctx.is_verbose() {
        for registration in dispatcher.registrations() {
            println!("  watch {} -> {}", registration.pattern, registration.category.task_name());
        }
    }

    let clear = ctx.config().watch.clear_screen;
    let pipeline = BuildPipeline::new(ctx);
    let scheduler = RebuildScheduler::spawn(&AssetCategory::ALL, move |category| {
        if clear {
            clear_screen();
        }
        println!("[{}] Starting '{}'...", timestamp(), category.task_name());
        let result = pipeline.run_step(StepKind::Asset(category));
        print_step_result(&result);
        hub.notify(ReloadEvent::for_category(category));
    })
    .map_err(WatchError::Worker)?;

    for root in &roots {
        println!("[{}] Watching {} for changes...", timestamp(), root.display());
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let mut affected = BTreeSet::new();
                for event in events.iter().filter(|e| matches!(e.kind, DebouncedEventKind::Any)) {
                    let categories = dispatcher.dispatch(&event.path);
                    if categories.is_empty() {
                        continue;
                    }
                    if let Some(name) = event.path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                    affected.extend(categories);
                }

                for category in affected {
                    if !scheduler.schedule(category) {
                        tracing::error!(%category, "rebuild worker is gone");
                    }
                }
            }
            Ok(Err(error)) => {
                // Watch error (non-fatal) - log but continue watching
                tracing::warn!("watch error: {:?}", error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                scheduler.shutdown();
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}
