use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

use crate::app::{AppContext, GleanerError, Result};
use crate::cli::Preset;
use crate::config::Config;
use crate::domain::{BatchPlan, Target};
use crate::harvester::{HarvestReport, HarvestRequest, HarvestRunner, Termination};
use crate::store::{RunLog, RunRecord, RunStatus};

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub preset: Option<Preset>,
    pub headless: bool,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(preset) = self.preset {
            config.harvester = config.harvester.with_pacing(&preset.harvester());
        }
        if self.headless {
            config.harvester.headless = true;
        }
        if let Some(secs) = self.timeout_secs {
            config.harvester.timeout_secs = secs;
        }
        if let Some(ref dir) = self.output_dir {
            config.output.directory = dir.clone();
        }
        config
    }
}

/// Where a checkpoint should go, if anywhere.
#[derive(Debug, Clone, Default)]
pub enum CheckpointChoice {
    #[default]
    Off,
    /// `<output dir>/<label>_checkpoint.csv`
    Default,
    Path(PathBuf),
}

impl CheckpointChoice {
    fn resolve(&self, config: &Config, request: &HarvestRequest) -> Option<PathBuf> {
        match self {
            CheckpointChoice::Off => None,
            CheckpointChoice::Default => Some(config.output.checkpoint_path(&request.file_stem())),
            CheckpointChoice::Path(p) => Some(p.clone()),
        }
    }
}

impl From<Option<Option<PathBuf>>> for CheckpointChoice {
    fn from(flag: Option<Option<PathBuf>>) -> Self {
        match flag {
            None => CheckpointChoice::Off,
            Some(None) => CheckpointChoice::Default,
            Some(Some(path)) => CheckpointChoice::Path(path),
        }
    }
}

/// Run one request and record the outcome in the run log.
pub async fn run_recorded<R: HarvestRunner + ?Sized>(
    ctx: &AppContext,
    runner: &R,
    config: &Config,
    request: HarvestRequest,
) -> Result<HarvestReport> {
    let started_at = Utc::now();
    let target = request.target.clone();
    let label = request.label();
    let requested = request.count;
    let checkpoint = request.checkpoint.clone();

    let result = runner.run(config, request).await;

    let mut run = RunRecord {
        id: 0,
        target_kind: target.kind().to_string(),
        target: target.value().to_string(),
        label,
        requested,
        collected: 0,
        status: RunStatus::Failed,
        output_path: None,
        checkpoint_path: checkpoint.map(|p| p.display().to_string()),
        error: None,
        started_at,
        finished_at: Utc::now(),
    };
    match &result {
        Ok(report) => {
            run.collected = report.records.len();
            run.status = report.termination.status();
            run.output_path = report.output_path.as_ref().map(|p| p.display().to_string());
            if let Termination::EngineFault(e) = &report.termination {
                run.error = Some(e.clone());
            }
        }
        Err(e) => run.error = Some(e.to_string()),
    }

    if let Err(e) = ctx.run_log.record_run(&run) {
        warn!("Failed to record run for '{}': {}", run.label, e);
    }
    result
}

fn print_report(report: &HarvestReport) {
    println!(
        "{}: {} of {} reviews ({})",
        report.label,
        report.records.len(),
        report.requested,
        report.termination
    );
    if let Some(ref path) = report.output_path {
        println!("  results:    {}", path.display());
    }
    if let Some(ref path) = report.checkpoint_path {
        println!("  checkpoint: {}", path.display());
    }
}

pub async fn harvest<R: HarvestRunner + ?Sized>(
    ctx: &AppContext,
    runner: &R,
    target: Target,
    count: usize,
    checkpoint: CheckpointChoice,
    output: Option<PathBuf>,
    overrides: &Overrides,
) -> Result<()> {
    let config = overrides.apply(&ctx.config);

    let mut request = HarvestRequest::new(target, count);
    request.checkpoint = checkpoint.resolve(&config, &request);
    request.output = output;

    let report = run_recorded(ctx, runner, &config, request).await?;
    print_report(&report);
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Harvest every target in the batch file, one full run at a time.
///
/// A failing target is reported and the batch moves on to the next one.
pub async fn batch<R: HarvestRunner + ?Sized>(
    ctx: &AppContext,
    runner: &R,
    path: &Path,
    checkpoint: bool,
    skip_completed: bool,
    overrides: &Overrides,
) -> Result<BatchSummary> {
    let plan = BatchPlan::load(path)?;
    let config = overrides.apply(&ctx.config);
    let total = plan.targets.len();
    let mut summary = BatchSummary::default();

    if total == 0 {
        println!("No targets in {}", path.display());
        return Ok(summary);
    }

    for (i, entry) in plan.targets.iter().enumerate() {
        let target = entry.target()?;
        println!("({}/{}) {} (target: {})", i + 1, total, target, entry.count);

        if skip_completed {
            if let Some(last) = ctx.run_log.last_run_for(target.value())? {
                if last.status == RunStatus::TargetMet && last.requested >= entry.count {
                    println!("  skipped: completed on {}", last.finished_at.format("%Y-%m-%d %H:%M"));
                    summary.skipped += 1;
                    continue;
                }
            }
        }

        let mut request = HarvestRequest::new(target, entry.count);
        request.label = entry.label.clone();
        if checkpoint {
            request.checkpoint = CheckpointChoice::Default.resolve(&config, &request);
        }

        match run_recorded(ctx, runner, &config, request).await {
            Ok(report) => {
                print_report(&report);
                summary.succeeded += 1;
            }
            Err(e) => {
                eprintln!("  ! failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    println!(
        "\nBatch complete: {} harvested, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    Ok(summary)
}

pub fn history(ctx: &AppContext, limit: usize) -> Result<()> {
    let runs = ctx.run_log.recent_runs(limit)?;

    if runs.is_empty() {
        println!("No runs recorded");
        return Ok(());
    }

    for run in runs {
        println!(
            "{} {:<12} {} ({}/{})",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.status,
            run.label,
            run.collected,
            run.requested
        );
        if let Some(path) = run.output_path {
            println!("  {}", path);
        }
        if let Some(error) = run.error {
            println!("  error: {}", error);
        }
    }

    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| GleanerError::Config(format!("Failed to render config: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

pub fn config_path(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path().map_err(|e| GleanerError::Config(e.to_string()))?,
    };
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers from a fixed script of outcomes, one per request.
    struct FakeRunner {
        seen: Mutex<Vec<HarvestRequest>>,
        fail_on: Vec<String>,
    }

    impl FakeRunner {
        fn new(fail_on: &[&str]) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl HarvestRunner for FakeRunner {
        async fn run(&self, _config: &Config, request: HarvestRequest) -> Result<HarvestReport> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail_on.iter().any(|t| t == request.target.value()) {
                return Err(GleanerError::Navigation("no reviews tab".into()));
            }
            Ok(HarvestReport {
                target: request.target.clone(),
                label: request.label(),
                requested: request.count,
                termination: Termination::TargetMet,
                accumulated: request.count,
                iterations: 1,
                records: Vec::new(),
                output_path: None,
                checkpoint_path: request.checkpoint.clone(),
            })
        }
    }

    fn write_plan(dir: &Path) -> PathBuf {
        let path = dir.join("targets.toml");
        std::fs::write(
            &path,
            r#"
[[targets]]
keyword = "여의도한강공원"
count = 10

[[targets]]
keyword = "broken"
count = 10

[[targets]]
url = "https://www.google.com/maps/place/x"
count = 5
label = "x-park"
"#,
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_batch_continues_after_failed_target() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        let runner = FakeRunner::new(&["broken"]);

        let summary = batch(&ctx, &runner, &write_plan(dir.path()), true, false, &Overrides::default())
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary { succeeded: 2, failed: 1, skipped: 0 });

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].label.as_deref(), Some("x-park"));
        assert_eq!(seen[2].checkpoint, Some(PathBuf::from("./x-park_checkpoint.csv")));

        let runs = ctx.run_log.recent_runs(10).unwrap();
        assert_eq!(runs.len(), 3);
        let broken = ctx.run_log.last_run_for("broken").unwrap().unwrap();
        assert_eq!(broken.status, RunStatus::Failed);
        assert!(broken.error.unwrap().contains("no reviews tab"));
    }

    #[tokio::test]
    async fn test_batch_skips_completed_targets() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        let plan = write_plan(dir.path());

        batch(&ctx, &FakeRunner::new(&["broken"]), &plan, false, false, &Overrides::default())
            .await
            .unwrap();

        let runner = FakeRunner::new(&[]);
        let summary = batch(&ctx, &runner, &plan, false, true, &Overrides::default())
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary { succeeded: 1, failed: 0, skipped: 2 });
        assert_eq!(runner.seen.lock().unwrap()[0].target.value(), "broken");
    }

    #[tokio::test]
    async fn test_batch_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        let err = batch(
            &ctx,
            &FakeRunner::new(&[]),
            &dir.path().join("nope.toml"),
            false,
            false,
            &Overrides::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GleanerError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_harvest_resolves_default_checkpoint_path() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        let runner = FakeRunner::new(&[]);
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };

        harvest(
            &ctx,
            &runner,
            Target::Keyword("망원 한강공원".into()),
            30,
            CheckpointChoice::from(Some(None)),
            None,
            &overrides,
        )
        .await
        .unwrap();

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen[0].checkpoint, Some(PathBuf::from("out/망원_한강공원_checkpoint.csv")));
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            headless: true,
            timeout_secs: Some(30),
            ..Default::default()
        };
        let config = overrides.apply(&Config::default());
        assert!(config.harvester.headless);
        assert_eq!(config.harvester.timeout_secs, 30);
        assert_eq!(config.output.directory, PathBuf::from("."));
    }

    #[test]
    fn test_preset_applies_before_explicit_flags() {
        let mut base = Config::default();
        base.harvester.search_url = "https://maps.example/".to_string();
        let overrides = Overrides {
            preset: Some(Preset::Patient),
            timeout_secs: Some(45),
            ..Default::default()
        };

        let config = overrides.apply(&base);
        assert_eq!(config.harvester.stagnation_threshold, 10);
        assert_eq!(config.harvester.timeout_secs, 45);
        assert_eq!(config.harvester.search_url, "https://maps.example/");

        let config = Overrides {
            preset: Some(Preset::Unattended),
            ..Default::default()
        }
        .apply(&base);
        assert!(config.harvester.headless);
    }
}
