//! # cms-export CLI Interface (Module)
//!
//! Argument parsing, precondition checks and orchestration of one export run.
//! All traversal and extraction logic lives in [`cms_export_core`]; this module
//! only turns flags, environment and the optional YAML file into a [`Plan`],
//! launches the browser session and hands it to the core.
//!
//! Preconditions (credentials, `--get` usage, base URL) are checked before any
//! browser is launched, so a bad invocation never leaves a Chromium behind.
use crate::browser::{BrowserOptions, BrowserSession};
use crate::load_config::{load_config, FileConfig};
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use cms_export_core::config::{ExportConfig, ExportScope};
use cms_export_core::contract::RemoteClient;
use cms_export_core::mirror::{export_all, export_single, sign_in, Credentials};
use cms_export_core::report::ExportReport;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use url::Url;

pub const GET_USAGE: &str = "Please make sure you're using the --get flag correctly: cms-export -u USERNAME -p PASSWORD -g FULL_PATH PAGE_URL";

/// Mirror a CMS (sections, pages, files, layouts, partials) to the local filesystem.
#[derive(Debug, Default, Parser)]
#[command(name = "cms-export", version, about)]
pub struct Cli {
    /// Base URL for CMS admin access
    #[arg(short = 'b', long = "url", env = "CMS_EXPORT_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Admin username
    #[arg(short = 'u', long = "user", env = "CMS_EXPORT_USER", value_name = "USERNAME")]
    pub user: Option<String>,

    /// Admin password
    #[arg(
        short = 'p',
        long = "password",
        env = "CMS_EXPORT_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub password: Option<String>,

    /// Print a line for every exported node (default)
    #[arg(short = 'v', long, action = ArgAction::SetTrue, overrides_with = "quiet")]
    pub verbose: bool,

    /// Only log, no progress lines
    #[arg(short = 'q', long, action = ArgAction::SetTrue, overrides_with = "verbose")]
    pub quiet: bool,

    /// Export the section tree (and everything else)
    #[arg(short = 'a', long = "all", value_name = "BOOL", value_parser = parse_bool)]
    pub all: Option<bool>,

    /// Export layouts
    #[arg(
        long = "layouts",
        visible_alias = "layout",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_bool
    )]
    pub layouts: Option<bool>,

    /// Export partials
    #[arg(
        long = "partials",
        visible_alias = "partial",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_bool
    )]
    pub partials: Option<bool>,

    /// Export a single page: destination path, then page URL
    #[arg(short = 'g', long = "get", value_name = "FULL_PATH PAGE_URL", num_args = 1..)]
    pub get: Option<Vec<String>>,

    /// Sections to skip, at any depth
    #[arg(short = 's', long = "skip", value_name = "SECTION", num_args = 1..)]
    pub skip: Vec<String>,

    /// Export root directory [default: .]
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// YAML file with non-secret settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err("Boolean value expected.".to_string()),
    }
}

/// Blank values count as not given.
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Everything,
    Single { destination: PathBuf, url: String },
}

/// Everything a run needs, resolved from flags, environment and config file.
#[derive(Debug)]
pub struct Plan {
    pub credentials: Credentials,
    pub config: ExportConfig,
    pub browser: BrowserOptions,
    pub mode: Mode,
    pub report: Option<PathBuf>,
}

impl Plan {
    /// Checks preconditions and merges settings. CLI flags win over the file.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self> {
        let base_url = provided(cli.url).or(provided(file.base_url));
        let username = provided(cli.user);
        let password = provided(cli.password);
        let missing: Vec<&str> = [
            (base_url.is_none(), "Please provide CMS base login URL with the -b option"),
            (username.is_none(), "Please provide CMS admin username with the -u option"),
            (password.is_none(), "Please provide CMS admin password with the -p option"),
        ]
        .into_iter()
        .filter_map(|(absent, message)| absent.then_some(message))
        .collect();
        if !missing.is_empty() {
            for message in &missing {
                eprintln!("{message}");
            }
            bail!("missing credentials: {} value(s) not provided", missing.len());
        }
        let (Some(base_url), Some(username), Some(password)) = (base_url, username, password)
        else {
            bail!("missing credentials");
        };

        let mode = match cli.get {
            None => Mode::Everything,
            Some(values) => match <[String; 2]>::try_from(values) {
                Ok([destination, url]) => Mode::Single {
                    destination: PathBuf::from(destination),
                    url,
                },
                Err(values) => {
                    eprintln!("{GET_USAGE}");
                    bail!("--get expects a path and a URL, got {} value(s)", values.len());
                }
            },
        };

        let base_url = Url::parse(&base_url)
            .with_context(|| format!("Invalid base URL {base_url:?}"))?;
        let output_dir = cli
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let skip = if cli.skip.is_empty() { file.skip } else { cli.skip };

        let mut config = ExportConfig::new(base_url, output_dir);
        config.skip_sections = skip.into_iter().collect::<HashSet<_>>();
        config.scope = ExportScope::resolve(
            cli.all,
            cli.layouts.unwrap_or(false),
            cli.partials.unwrap_or(false),
        );
        config.verbose = !cli.quiet;
        config.tab_wait = file.browser.tab_wait();

        let mut browser = file.browser.options();
        if cli.headed {
            browser.headless = false;
        }

        Ok(Self {
            credentials: Credentials { username, password },
            config,
            browser,
            mode,
            report: cli.report,
        })
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let plan = Plan::resolve(cli, file)?;

    let session = BrowserSession::launch(&plan.browser)
        .await
        .context("Failed to launch browser")?;
    let outcome = execute(&session, &plan).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Browser session did not close cleanly");
    }
    let report = outcome?;

    if let Some(path) = &plan.report {
        write_report(&report, path)?;
    }
    let summary = report.summary();
    if summary.failed > 0 {
        warn!(failed = summary.failed, "Export finished with failures");
    } else {
        info!("Export finished");
    }
    Ok(())
}

async fn execute<C>(client: &C, plan: &Plan) -> Result<ExportReport>
where
    C: RemoteClient + ?Sized,
{
    if let Err(e) = sign_in(client, &plan.config.base_url, &plan.credentials).await {
        error!(error = %e, "Sign-in failed");
        return Err(e.into());
    }
    let report = match &plan.mode {
        Mode::Everything => export_all(client, &plan.config).await?,
        Mode::Single { destination, url } => {
            export_single(client, destination, url, &plan.config).await
        }
    };
    Ok(report)
}

fn write_report(report: &ExportReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {path:?}"))?;
    info!(path = ?path, "Report written");
    Ok(())
}
