use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use page_vision::capture::{ChromeDriver, PageDriver};
use page_vision::compare::compare;
use page_vision::config::{self, ThresholdSettings};
use page_vision::diff::DiffConfig;
use page_vision::namespace::clear_artifacts;
use page_vision::runner::{RunConfig, run};
use page_vision::viewport::Viewport;

/// Page Vision - Visual regression testing for live web pages
#[derive(Parser, Debug)]
#[command(
    name = "page-vision",
    about = "Visual regression testing for live web pages with full-page capture and pixel comparison",
    after_help = "ENVIRONMENT VARIABLES:\n\
        URL_1                            Baseline origin (required for run)\n\
        URL_2                            Candidate origin (required for run)\n\
        Brandcode                        Brand code for artifact naming\n\
        PageType                         Page type for artifact naming\n\
        PAGE_VISION_ROOT                 Artifact root directory\n\
        PAGE_VISION_SPEC_ID              Spec directory under the root\n\
        PAGE_VISION_THRESHOLD_DESKTOP    Desktop mismatch tolerance [0,1]\n\
        PAGE_VISION_THRESHOLD_TABLET     Tablet mismatch tolerance [0,1]\n\
        PAGE_VISION_THRESHOLD_MOBILE     Mobile mismatch tolerance [0,1]"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture and compare both origins across viewports
    Run {
        /// Baseline origin URL
        #[arg(long, env = "URL_1")]
        baseline: Option<String>,

        /// Candidate origin URL
        #[arg(long, env = "URL_2")]
        candidate: Option<String>,

        /// Brand code used in artifact names
        #[arg(long, env = "Brandcode", default_value = "")]
        brand: String,

        /// Page type used in artifact names
        #[arg(long, env = "PageType", default_value = "")]
        page_type: String,

        /// Artifact root directory
        #[arg(long, env = "PAGE_VISION_ROOT", default_value = "./screenshots")]
        root: PathBuf,

        /// Spec directory under the root
        #[arg(long, env = "PAGE_VISION_SPEC_ID", default_value = "regression")]
        spec_id: String,

        /// Restrict the run to a single viewport (desktop, tablet, mobile)
        #[arg(long)]
        viewport: Option<String>,

        /// Override the mismatch threshold for all viewports [0,1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Compare full color instead of luminance only
        #[arg(long)]
        use_color: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two existing captures without driving a browser
    Compare {
        /// Baseline image path
        #[arg(short, long)]
        baseline: PathBuf,

        /// Candidate image path
        #[arg(short, long)]
        candidate: PathBuf,

        /// Diff image output path
        #[arg(short, long, default_value = "./diff.png")]
        diff: PathBuf,

        /// Mismatch threshold [0,1]
        #[arg(short, long, default_value = "0.1")]
        threshold: f64,

        /// Compare full color instead of luminance only
        #[arg(long)]
        use_color: bool,
    },

    /// Remove stale artifacts for a (brand, page type, viewport) identity
    Clean {
        /// Artifact root directory
        #[arg(long, env = "PAGE_VISION_ROOT", default_value = "./screenshots")]
        root: PathBuf,

        /// Spec directory under the root
        #[arg(long, env = "PAGE_VISION_SPEC_ID", default_value = "regression")]
        spec_id: String,

        /// Viewport whose artifacts to remove
        #[arg(long)]
        viewport: String,

        /// Brand code scope
        #[arg(long, env = "Brandcode", default_value = "")]
        brand: String,

        /// Page type scope
        #[arg(long, env = "PageType", default_value = "")]
        page_type: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("page_vision=info")),
        )
        .init();

    match run_command() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run_command() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Run {
            baseline,
            candidate,
            brand,
            page_type,
            root,
            spec_id,
            viewport,
            threshold,
            use_color,
            json,
        }) => {
            // Fatal before any browser interaction.
            let baseline = baseline
                .filter(|s| !s.is_empty())
                .ok_or_else(|| config::ConfigError::MissingVar(config::ENV_BASELINE_URL))?;
            let candidate = candidate
                .filter(|s| !s.is_empty())
                .ok_or_else(|| config::ConfigError::MissingVar(config::ENV_CANDIDATE_URL))?;
            for (name, value) in [
                (config::ENV_BASELINE_URL, &baseline),
                (config::ENV_CANDIDATE_URL, &candidate),
            ] {
                url::Url::parse(value)
                    .map_err(|e| format!("{} is not a valid URL ({}): {}", name, value, e))?;
            }

            let viewports = match viewport {
                Some(name) => {
                    let viewport = Viewport::from_name(&name).ok_or_else(|| {
                        format!("Invalid viewport '{}'. Use: desktop, tablet, mobile", name)
                    })?;
                    vec![viewport]
                }
                None => Viewport::ALL.to_vec(),
            };

            let mut thresholds = config::get().thresholds.clone();
            if let Some(t) = threshold {
                thresholds = ThresholdSettings {
                    desktop: t,
                    tablet: t,
                    mobile: t,
                };
            }

            let run_config = RunConfig {
                baseline_url: baseline,
                candidate_url: candidate,
                brand,
                page_type,
                root,
                spec_id,
                viewports,
                thresholds,
                diff: DiffConfig {
                    ignore_colors: !use_color,
                    ..DiffConfig::default()
                },
            };

            let result = run(&run_config, &mut |viewport| {
                ChromeDriver::launch(viewport).map(|d| Box::new(d) as Box<dyn PageDriver>)
            });
            result.write_manifest(&run_config)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for verdict in &result.verdicts {
                    let status = if verdict.passed() { "PASS" } else { "FAIL" };
                    match (&verdict.result, &verdict.error) {
                        (Some(comparison), _) => println!(
                            "  {} {} ({}): {}",
                            status,
                            verdict.viewport,
                            verdict.base_name,
                            comparison.summary()
                        ),
                        (None, Some(error)) => println!(
                            "  {} {} ({}): {}",
                            status, verdict.viewport, verdict.base_name, error
                        ),
                        (None, None) => {}
                    }
                }
                println!(
                    "\nRun {}: {}/{} viewports passed",
                    if result.success { "passed" } else { "failed" },
                    result.verdicts.iter().filter(|v| v.passed()).count(),
                    result.verdicts.len()
                );
            }

            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Some(Commands::Compare {
            baseline,
            candidate,
            diff,
            threshold,
            use_color,
        }) => {
            let config = DiffConfig {
                ignore_colors: !use_color,
                ..DiffConfig::default()
            };
            let result = compare(&baseline, &candidate, &diff, threshold, &config)?;
            println!("{}", result.summary());
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Some(Commands::Clean {
            root,
            spec_id,
            viewport,
            brand,
            page_type,
        }) => {
            let viewport = Viewport::from_name(&viewport).ok_or_else(|| {
                format!("Invalid viewport '{}'. Use: desktop, tablet, mobile", viewport)
            })?;
            let removed = clear_artifacts(&root, &spec_id, viewport, &brand, &page_type)?;
            println!("Removed {} stale artifact(s)", removed);
            Ok(ExitCode::SUCCESS)
        }

        None => {
            println!("Page Vision - Visual regression testing for live web pages");
            println!();
            println!("Usage: page-vision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run      Capture and compare both origins across viewports");
            println!("  compare  Compare two existing captures without driving a browser");
            println!("  clean    Remove stale artifacts for an identity");
            println!();
            println!("Run with --help for more information.");
            Ok(ExitCode::SUCCESS)
        }
    }
}
