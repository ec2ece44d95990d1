//! `build --watch`: rebuild the bundles when the widget source changes.
//!
//! ```text
//! notify ─▶ Debouncer (300ms quiet window) ─▶ content hash check ─▶ build
//! ```
//!
//! The parent directory of the input is watched rather than the file
//! itself, so editors that save by rename keep triggering rebuilds.

use super::{BuildError, BuildReport, build_source};
use crate::config::BundleConfig;
use crate::logger::{status_error, status_success, status_unchanged};
use crate::utils::hash;
use crate::{debug, log};
use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const DEBOUNCE_MS: u64 = 300;
/// Upper bound on a single wait, so Ctrl+C is noticed promptly.
const POLL_MS: u64 = 200;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler that ends [`watch`].
pub fn setup_shutdown_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| SHUTDOWN.store(true, Ordering::SeqCst))
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Check if path is an editor temp/backup file.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp") || name.ends_with('~') || name.starts_with('.')
}

/// Collects change events until the input has been quiet for a while.
struct Debouncer {
    target: PathBuf,
    changed: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(target: PathBuf) -> Self {
        Self {
            target,
            changed: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            // mtime/chmod noise
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => {}
            _ => return,
        }

        for path in &event.paths {
            if is_temp_file(path) || !same_file(path, &self.target) {
                continue;
            }
            debug!("watch"; "{:?}: {}", event.kind, path.display());
            self.changed.insert(path.clone());
            self.last_event = Some(Instant::now());
        }
    }

    fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take_if_ready(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.last_event = None;
        !std::mem::take(&mut self.changed).is_empty()
    }

    fn sleep_duration(&self) -> Duration {
        let remaining = self.last_event.map_or(Duration::from_millis(POLL_MS), |t| {
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(t.elapsed())
        });
        remaining
            .min(Duration::from_millis(POLL_MS))
            .max(Duration::from_millis(1))
    }
}

/// Compare by file name within the watched directory.
///
/// notify may report canonical paths while the config holds the path as
/// written, so only the last component is compared.
fn same_file(event_path: &Path, target: &Path) -> bool {
    event_path.file_name().is_some() && event_path.file_name() == target.file_name()
}

/// Skips builds whose source hash matches the last successful one.
#[derive(Debug, Default)]
struct Freshness {
    last: Option<u64>,
}

impl Freshness {
    fn is_fresh(&self, source: &str) -> bool {
        self.last == Some(hash::compute(source))
    }

    fn record(&mut self, report: &BuildReport) {
        self.last = Some(report.source_hash);
    }
}

fn rebuild(config: &BundleConfig, freshness: &mut Freshness) {
    let source = match fs::read_to_string(&config.input) {
        Ok(source) => source,
        Err(e) => {
            status_error(&format!("cannot read {}", config.input.display()), &e.to_string());
            return;
        }
    };

    let name = config.input.display().to_string();
    if freshness.is_fresh(&source) {
        status_unchanged(&format!("unchanged: {name}"));
        return;
    }

    match build_source(config, &source) {
        Ok(report) => {
            freshness.record(&report);
            status_success(&format!(
                "rebuilt: {name} ({} -> {} bytes, {})",
                report.source_bytes,
                report.minified_bytes,
                hash::fingerprint(&source)
            ));
        }
        Err(e) => status_error(&format!("failed: {name}"), &e.to_string()),
    }
}

/// Build once, then rebuild on every change until Ctrl+C.
pub fn watch(config: &BundleConfig) -> Result<(), BuildError> {
    let dir = config
        .input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    // Start watching before the first build so no edit is missed
    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    let mut freshness = Freshness::default();
    let report = super::build_and_log(config)?;
    freshness.record(&report);
    log!("watch"; "watching {} (Ctrl+C to stop)", dir.display());

    let mut debouncer = Debouncer::new(config.input.clone());
    while !is_shutdown() {
        match rx.recv_timeout(debouncer.sleep_duration()) {
            Ok(Ok(event)) => debouncer.add_event(&event),
            Ok(Err(e)) => log!("watch"; "notify error: {}", e),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        if debouncer.take_if_ready() {
            rebuild(config, &mut freshness);
        }
    }

    log!("watch"; "stopped");
    Ok(())
}
