use crate::actions::{self, ActionResult, Executor, OrganizePlan};
use crate::advisor::{self, Completer};
use crate::classify::{self, date::DateStage};
use crate::config::OrganizerConfig;
use crate::dupes::{self, DuplicateGroup};
use crate::error::{Error, Result};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::sandbox::Sandbox;
use crate::scanner::{self, FileEntry, IgnoreSet};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cooperative stop signal. Clones share the same flag.
///
/// Once set, no new file is scanned, hashed or acted on; work already in
/// flight is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizeMode {
    Extension,
    Date,
    Temp,
    Size,
    Duplicate,
    Ai,
}

impl fmt::Display for OrganizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extension => "extension",
            Self::Date => "date",
            Self::Temp => "temp",
            Self::Size => "size",
            Self::Duplicate => "duplicate",
            Self::Ai => "ai",
        };
        f.write_str(name)
    }
}

impl FromStr for OrganizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extension" => Ok(Self::Extension),
            "date" => Ok(Self::Date),
            "temp" => Ok(Self::Temp),
            "size" => Ok(Self::Size),
            "duplicate" => Ok(Self::Duplicate),
            "ai" => Ok(Self::Ai),
            other => Err(Error::Validation(format!("unknown organize mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizeOptions {
    pub recursive: bool,
    /// Required by the size strategy, ignored by the others.
    pub size_threshold: Option<u64>,
}

impl OrganizeOptions {
    pub fn recursive(recursive: bool) -> Self {
        Self {
            recursive,
            size_threshold: None,
        }
    }

    pub fn with_size_threshold(mut self, threshold: u64) -> Self {
        self.size_threshold = Some(threshold);
        self
    }
}

/// What one organize call did.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeReport {
    pub mode: OrganizeMode,
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Advisor actions dropped by validation. Always 0 for built-in modes.
    pub rejected: usize,
    pub results: Vec<ActionResult>,
    pub summary: String,
}

impl OrganizeReport {
    fn from_results(mode: OrganizeMode, results: Vec<ActionResult>, rejected: usize) -> Self {
        let planned = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = planned - succeeded;

        let summary = if planned == 0 && rejected > 0 {
            format!("nothing to execute: all {rejected} suggested actions were rejected")
        } else if planned == 0 {
            "nothing to organize".to_string()
        } else {
            let mut summary = format!("{succeeded} of {planned} actions succeeded");
            if failed > 0 {
                summary.push_str(&format!(", {failed} failed"));
            }
            if rejected > 0 {
                summary.push_str(&format!(", {rejected} rejected"));
            }
            summary
        };

        Self {
            mode,
            planned,
            succeeded,
            failed,
            rejected,
            results,
            summary,
        }
    }

    /// The response envelope handed to the web layer.
    ///
    /// Success: `{success: true, moved, summary}`, plus per-action `results`
    /// for the AI mode. Failure: `{success: false, error}`.
    pub fn envelope(result: &Result<OrganizeReport>) -> Value {
        match result {
            Ok(report) => {
                let mut envelope = json!({
                    "success": true,
                    "moved": report.succeeded,
                    "summary": report.summary,
                });
                if report.mode == OrganizeMode::Ai {
                    envelope["results"] =
                        serde_json::to_value(&report.results).unwrap_or_default();
                }
                envelope
            }
            Err(err) => json!({
                "success": false,
                "error": err.to_string(),
            }),
        }
    }
}

/// Entry point: scan, plan, validate and execute one organize request.
pub struct Organizer {
    config: OrganizerConfig,
    ignore: IgnoreSet,
    cancel: CancelToken,
    reporter: Box<dyn ProgressReporter>,
}

impl Organizer {
    pub fn new(config: OrganizerConfig) -> Result<Self> {
        let ignore = IgnoreSet::new(&config.ignore_patterns)?;
        Ok(Self {
            config,
            ignore,
            cancel: CancelToken::new(),
            reporter: Box::new(SilentReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn organize(
        &self,
        root: &Path,
        mode: OrganizeMode,
        options: &OrganizeOptions,
        raw_actions: Option<&[Value]>,
    ) -> Result<OrganizeReport> {
        match mode {
            OrganizeMode::Extension => self.organize_by_extension(root, options),
            OrganizeMode::Date => self.organize_by_date(root, options),
            OrganizeMode::Temp => self.organize_by_temp(root, options),
            OrganizeMode::Size => self.organize_by_size(root, options),
            OrganizeMode::Duplicate => self.organize_by_duplicate(root, options),
            OrganizeMode::Ai => {
                let raw = raw_actions.ok_or_else(|| {
                    Error::Validation("ai mode requires an action list".to_string())
                })?;
                self.organize_by_ai(root, options, raw)
            }
        }
    }

    pub fn organize_by_extension(
        &self,
        root: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport> {
        let sandbox = Sandbox::new(root)?;
        let files = self.scan(&sandbox, options.recursive)?;
        let plan = classify::extension::plan(&files, &sandbox);
        Ok(self.run(OrganizeMode::Extension, &plan))
    }

    /// Bucket files into `YYYY-MM` folders.
    ///
    /// Recursive runs flatten the whole tree into the root first and remove
    /// the emptied folders, so the original structure is lost.
    pub fn organize_by_date(
        &self,
        root: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport> {
        let sandbox = Sandbox::new(root)?;
        let mut results = Vec::new();

        if options.recursive {
            let files = self.scan(&sandbox, true)?;
            let plan = classify::date::flatten_plan(&files, &sandbox);
            info!(
                "Date stage '{}': moving {} nested files into {}",
                DateStage::Flatten.name(),
                plan.len(),
                sandbox.root().display()
            );
            results.extend(self.execute(&plan));
            classify::date::remove_empty_dirs(sandbox.root());
        }

        let files = self.scan(&sandbox, false)?;
        let plan = classify::date::bucket_plan(&files, &sandbox);
        info!(
            "Date stage '{}': {} files to bucket",
            DateStage::Bucket.name(),
            plan.len()
        );
        results.extend(self.execute(&plan));

        Ok(OrganizeReport::from_results(OrganizeMode::Date, results, 0))
    }

    pub fn organize_by_temp(
        &self,
        root: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport> {
        let sandbox = Sandbox::new(root)?;
        let files = self.scan(&sandbox, options.recursive)?;
        let plan = classify::temp::plan(&files, &sandbox);
        if plan.is_empty() {
            info!("No temporary files found in {}", sandbox.root().display());
        }
        Ok(self.run(OrganizeMode::Temp, &plan))
    }

    pub fn organize_by_size(
        &self,
        root: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport> {
        let threshold = options.size_threshold.ok_or_else(|| {
            Error::Validation("size threshold is required for size mode".to_string())
        })?;
        let sandbox = Sandbox::new(root)?;
        let files = self.scan(&sandbox, options.recursive)?;
        let plan = classify::size::plan(&files, &sandbox, threshold);
        Ok(self.run(OrganizeMode::Size, &plan))
    }

    pub fn organize_by_duplicate(
        &self,
        root: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport> {
        let sandbox = Sandbox::new(root)?;
        let groups = self.detect(&sandbox, options.recursive)?;
        let plan = dupes::disposition_plan(&groups, &sandbox, options.recursive);
        Ok(self.run(OrganizeMode::Duplicate, &plan))
    }

    /// Report duplicate groups without moving anything.
    pub fn find_duplicates(&self, root: &Path, recursive: bool) -> Result<Vec<DuplicateGroup>> {
        let sandbox = Sandbox::new(root)?;
        self.detect(&sandbox, recursive)
    }

    /// Validate an untrusted advisor action list against a fresh scan of
    /// `root`, then execute whatever survives.
    pub fn organize_by_ai(
        &self,
        root: &Path,
        options: &OrganizeOptions,
        raw_actions: &[Value],
    ) -> Result<OrganizeReport> {
        let sandbox = Sandbox::new(root)?;
        let files = self.scan(&sandbox, options.recursive)?;
        let known: HashSet<PathBuf> = files.into_iter().map(|f| f.path).collect();

        let validation = actions::validate(raw_actions, &known, &sandbox);
        info!(
            "Advisor suggested {} actions: {} accepted, {} rejected",
            raw_actions.len(),
            validation.accepted.len(),
            validation.rejected_count()
        );
        if validation.nothing_to_execute() {
            info!("Nothing to execute");
        }

        let results = self.execute(&validation.accepted);
        Ok(OrganizeReport::from_results(
            OrganizeMode::Ai,
            results,
            validation.rejected_count(),
        ))
    }

    /// Ask `completer` for an action list and run it through `organize_by_ai`.
    pub fn organize_with_advisor(
        &self,
        root: &Path,
        options: &OrganizeOptions,
        completer: &dyn Completer,
        prompt: &str,
    ) -> Result<OrganizeReport> {
        let raw_actions = advisor::request_actions(completer, prompt)?;
        self.organize_by_ai(root, options, &raw_actions)
    }

    fn scan(&self, sandbox: &Sandbox, recursive: bool) -> Result<Vec<FileEntry>> {
        let root = sandbox.root();
        info!("Scanning {} (recursive: {})", root.display(), recursive);
        self.reporter.on_scan_start(&root.to_string_lossy());

        let start = Instant::now();
        let files = scanner::scan(root, recursive, &self.ignore, &self.cancel)?;
        let duration = start.elapsed().as_secs_f64();

        self.reporter.on_scan_complete(files.len(), duration);
        debug!("Scan completed in {:.2}s: {} files", duration, files.len());
        Ok(files)
    }

    fn detect(&self, sandbox: &Sandbox, recursive: bool) -> Result<Vec<DuplicateGroup>> {
        let files: Vec<FileEntry> = self
            .scan(sandbox, recursive)?
            .into_iter()
            .filter(|f| !dupes::in_review_dir(sandbox, &f.path))
            .collect();

        info!("Building content hashes for possible duplicates...");
        let start = Instant::now();
        let pool = dupes::build_pool(self.config.hash_workers)?;
        let groups = dupes::find_duplicates(&files, &pool, &self.cancel, self.reporter.as_ref())?;
        let duration = start.elapsed().as_secs_f64();

        let wasted: u64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();
        self.reporter.on_hash_complete(groups.len(), duration);
        debug!(
            "Hash completed in {:.2}s: {} duplicate groups, {} bytes wasted",
            duration,
            groups.len(),
            wasted
        );
        Ok(groups)
    }

    fn execute(&self, plan: &OrganizePlan) -> Vec<ActionResult> {
        Executor::new(&self.cancel, self.reporter.as_ref()).execute(plan)
    }

    fn run(&self, mode: OrganizeMode, plan: &OrganizePlan) -> OrganizeReport {
        info!("Organizing by {}: {} actions planned", mode, plan.len());
        let results = self.execute(plan);
        OrganizeReport::from_results(mode, results, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("extension".parse::<OrganizeMode>().unwrap(), OrganizeMode::Extension);
        assert_eq!(" AI ".parse::<OrganizeMode>().unwrap(), OrganizeMode::Ai);
        assert!(matches!(
            "delete".parse::<OrganizeMode>(),
            Err(Error::Validation(_))
        ));
        assert_eq!(OrganizeMode::Duplicate.to_string(), "duplicate");
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_error_envelope() {
        let result: Result<OrganizeReport> =
            Err(Error::Validation("size threshold is required".to_string()));
        let envelope = OrganizeReport::envelope(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("size threshold is required"));
    }

    #[test]
    fn test_summary_for_all_rejected_batch() {
        let report = OrganizeReport::from_results(OrganizeMode::Ai, Vec::new(), 3);
        assert_eq!(report.planned, 0);
        assert!(report.summary.starts_with("nothing to execute"));
        let envelope = OrganizeReport::envelope(&Ok(report));
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["results"], json!([]));
    }
}
