//! `convert`: run the widget over HTML pages and write the result.
//!
//! Each page is handled the way a browser would see it: the markup is
//! parsed, the widget initialized while the page is still loading, then
//! parsing finishes and queued work is flushed. Configuration is layered
//! defaults → `[widget]` → the page's carrier element → CLI flags.

use super::args::{ConvertArgs, WidgetArgs};
use crate::config::WidgetConfig;
use crate::host::{Page, PageSummary};
use crate::logger::ProgressLine;
use crate::{debug, log};
use anyhow::{Context, Result, bail};
use jwalk::WalkDir;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One page to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub dry: bool,
    pub pages: Vec<PageReport>,
}

impl ConvertReport {
    pub fn failed(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_some()).count()
    }

    pub fn converted_images(&self) -> usize {
        self.pages
            .iter()
            .filter_map(|p| p.summary.as_ref())
            .map(|s| s.scan.converted)
            .sum()
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Expand the given paths into (input, output) pairs.
///
/// A file lands directly in `output`; files found in a directory keep
/// their path relative to that directory. Two inputs mapping to the same
/// output are rejected.
fn collect_jobs(paths: &[PathBuf], output: &Path) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for path in paths {
        if path.is_file() {
            let name = path
                .file_name()
                .with_context(|| format!("not a file path: {}", path.display()))?;
            jobs.push(Job {
                input: path.clone(),
                output: output.join(name),
            });
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path())
                .filter(|p| is_html(p))
                .collect();
            found.sort();
            for input in found {
                let relative = input.strip_prefix(path).unwrap_or(&input).to_path_buf();
                jobs.push(Job {
                    output: output.join(relative),
                    input,
                });
            }
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }

    let mut claimed: FxHashMap<&Path, &Path> = FxHashMap::default();
    for job in &jobs {
        if let Some(first) = claimed.insert(&job.output, &job.input) {
            bail!(
                "{} and {} would both be written to {}",
                first.display(),
                job.input.display(),
                job.output.display()
            );
        }
    }
    Ok(jobs)
}

/// Convert one page's markup.
pub fn convert_html(
    html: &str,
    base: &WidgetConfig,
    overrides: &WidgetArgs,
    shadow: bool,
) -> Result<(String, PageSummary)> {
    let mut page = Page::parse(html)?;
    let config = overrides.apply(base.clone().with_carrier(page.document()));
    page.init(config);
    page.finish_parsing();
    Ok((page.to_html(shadow), page.summary()))
}

fn convert_job(job: &Job, base: &WidgetConfig, args: &ConvertArgs) -> Result<PageSummary> {
    let html = fs::read_to_string(&job.input)
        .with_context(|| format!("cannot read {}", job.input.display()))?;
    let (converted, summary) = convert_html(&html, base, &args.widget, args.shadow)?;

    if !args.dry {
        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        fs::write(&job.output, converted)
            .with_context(|| format!("cannot write {}", job.output.display()))?;
    }
    Ok(summary)
}

/// Convert every page in parallel.
pub fn convert_pages(args: &ConvertArgs, base: &WidgetConfig) -> Result<ConvertReport> {
    let jobs = collect_jobs(&args.paths, &args.output)?;
    debug!("convert"; "{} page(s) found", jobs.len());

    let progress = (!args.json && !jobs.is_empty())
        .then(|| ProgressLine::new("convert", "pages", jobs.len()));

    let pages = jobs
        .par_iter()
        .map(|job| {
            let result = convert_job(job, base, args);
            if let Some(progress) = &progress {
                progress.inc();
            }
            let (summary, error) = match result {
                Ok(summary) => (Some(summary), None),
                Err(e) => (None, Some(format!("{e:#}"))),
            };
            PageReport {
                input: job.input.clone(),
                output: job.output.clone(),
                summary,
                error,
            }
        })
        .collect();

    if let Some(progress) = progress {
        progress.finish();
    }
    Ok(ConvertReport {
        dry: args.dry,
        pages,
    })
}

/// Entry point for `fix-broken-img convert`.
pub fn run(args: &ConvertArgs, base: &WidgetConfig) -> Result<()> {
    let report = convert_pages(args, base)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for page in &report.pages {
            match (&page.summary, &page.error) {
                (_, Some(error)) => log!("error"; "{}: {}", page.input.display(), error),
                (Some(s), None) => debug!(
                    "convert"; "{}: {} converted, {} element(s)",
                    page.input.display(), s.scan.converted, s.controllers
                ),
                (None, None) => {}
            }
        }
        let verb = if args.dry { "would convert" } else { "converted" };
        log!(
            "convert";
            "{} {} image(s) in {} page(s)",
            verb,
            report.converted_images(),
            report.pages.len()
        );
    }

    let failed = report.failed();
    if failed > 0 {
        bail!("{} of {} page(s) failed", failed, report.pages.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(paths: Vec<PathBuf>, output: PathBuf) -> ConvertArgs {
        ConvertArgs {
            paths,
            output,
            shadow: false,
            dry: false,
            json: true,
            widget: WidgetArgs::default(),
            verbose: false,
        }
    }

    #[test]
    fn test_convert_html_uses_carrier() {
        let html = r##"<html><body><div id="fix-broken-img" data-background="#111"></div><img src="a.png"></body></html>"##;
        let (out, summary) =
            convert_html(html, &WidgetConfig::default(), &WidgetArgs::default(), false).unwrap();
        assert!(out.contains(r##"<fix-broken-img src="a.png" background-color="#111"></fix-broken-img>"##));
        assert_eq!(summary.scan.converted, 1);
        assert_eq!(summary.loading, 1);
    }

    #[test]
    fn test_cli_overrides_carrier() {
        let html = r#"<body><div id="fix-broken-img" data-auto-convert="false"></div><img src="a.png"></body>"#;
        let overrides = WidgetArgs {
            auto_convert: Some(true),
            ..WidgetArgs::default()
        };
        let (out, _) = convert_html(html, &WidgetConfig::default(), &overrides, false).unwrap();
        assert!(out.contains("<fix-broken-img"));
        assert!(!out.contains("<img"));
    }

    #[test]
    fn test_file_config_disables_conversion() {
        let base = WidgetConfig {
            auto_convert: false,
            ..WidgetConfig::default()
        };
        let (out, summary) =
            convert_html(r#"<body><img src="a.png"></body>"#, &base, &WidgetArgs::default(), false)
                .unwrap();
        assert!(out.contains(r#"<img src="a.png">"#));
        assert!(!summary.auto_convert);
    }

    #[test]
    fn test_collect_jobs_walks_directories() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(site.join("posts")).unwrap();
        fs::write(site.join("index.html"), "").unwrap();
        fs::write(site.join("posts/a.html"), "").unwrap();
        fs::write(site.join("style.css"), "").unwrap();

        let out = dir.path().join("out");
        let jobs = collect_jobs(&[site.clone()], &out).unwrap();
        let outputs: Vec<_> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(outputs, vec![out.join("index.html"), out.join("posts/a.html")]);
    }

    #[test]
    fn test_collect_jobs_rejects_shared_output() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a/index.html");
        let b = dir.path().join("b/index.html");
        for page in [&a, &b] {
            fs::create_dir_all(page.parent().unwrap()).unwrap();
            fs::write(page, "").unwrap();
        }

        let out = dir.path().join("out");
        let err = collect_jobs(&[a.clone(), b.clone()], &out).unwrap_err().to_string();
        assert!(err.contains(&a.display().to_string()));
        assert!(err.contains(&b.display().to_string()));

        let args = args(vec![a, b], out.clone());
        assert!(convert_pages(&args, &WidgetConfig::default()).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_collect_jobs_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(collect_jobs(&[dir.path().join("nope")], dir.path()).is_err());
    }

    #[test]
    fn test_convert_pages_writes_output() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("page.html");
        fs::write(&page, r#"<body><p><img src="x.png"></p></body>"#).unwrap();
        let out = dir.path().join("dist");

        let mut args = args(vec![page], out.clone());
        args.shadow = true;
        let report = convert_pages(&args, &WidgetConfig::default()).unwrap();

        assert_eq!(report.failed(), 0);
        assert_eq!(report.converted_images(), 1);
        let written = fs::read_to_string(out.join("page.html")).unwrap();
        assert!(written.contains(r#"<p><fix-broken-img src="x.png"><template shadowrootmode="open">"#));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("page.html");
        fs::write(&page, r#"<img src="x.png">"#).unwrap();
        let out = dir.path().join("dist");

        let mut args = args(vec![page], out.clone());
        args.dry = true;
        let report = convert_pages(&args, &WidgetConfig::default()).unwrap();

        assert_eq!(report.converted_images(), 1);
        assert!(!out.exists());
    }
}
