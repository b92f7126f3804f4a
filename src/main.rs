use clap::{Parser, Subcommand};
use imgpreset::artifact::ImageArtifact;
use imgpreset::cache::MtimeCache;
use imgpreset::config::{self, BuildConfig};
use imgpreset::{output, process};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgpreset")]
#[command(about = "Preset-driven image derivatives for static site builds")]
#[command(long_about = "\
Preset-driven image derivatives for static site builds

Each [presets.<name>] table in config.toml picks source images from a
directory and applies its commands, in order, to every one of them:

  [presets.thumbs]
  source = \"img\"                 # scanned recursively for png/jpg/jpeg/gif
  destination = \"generated_img\"  # under the output root (default _site)
  resize = \"100x100\"             # fit within 100x100
  quality = 80

img/logo.png becomes _site/generated_img/logo.png. A file is regenerated
when its derivative is missing or its source changed since the last pass
in the same process; `watch` keeps that knowledge across passes.

Set RUST_LOG=info (or debug) for per-preset and per-file diagnostics.

Run 'imgpreset gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root holding config.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output root, overriding `destination` from config.toml
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Write the pass result as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit with an error if any preset or file reported a problem
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args, Clone)]
struct WatchArgs {
    /// Pause between passes, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many passes (runs until interrupted when omitted)
    #[arg(long)]
    max_passes: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one generation pass
    Build(BuildArgs),
    /// Run passes repeatedly, regenerating only what changed
    ///
    /// Freshness is tracked per source file, not per preset. When a touched
    /// source feeds several presets, only the first preset that reaches it
    /// regenerates its output; the others pick the change up on the next touch
    /// or the next `build`.
    Watch(WatchArgs),
    /// Validate presets and count their sources without generating anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Build(args) => {
            let config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            let cache = MtimeCache::new();
            let result = run_pass(&config, &cli.root, &cache)?;

            if let Some(path) = &args.report {
                std::fs::write(path, output::report_json(&result)?)?;
            }
            if args.strict && !result.is_clean() {
                return Err(format!(
                    "{} problem(s) reported (--strict)",
                    result.diagnostics.len()
                )
                .into());
            }
        }
        Command::Watch(args) => {
            let mut config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            let cache = MtimeCache::new();
            let interval = Duration::from_millis(args.interval_ms);
            let mut pass = 0u32;

            loop {
                pass += 1;
                println!("==> Pass {pass}");
                run_pass(&config, &cli.root, &cache)?;

                if args.max_passes.is_some_and(|max| pass >= max) {
                    break;
                }
                std::thread::sleep(interval);

                // Pick up config edits between passes; keep the last good one.
                match load_config(&cli) {
                    Ok(reloaded) => config = reloaded,
                    Err(e) => tracing::warn!(error = %e, "config reload failed, keeping previous"),
                }
            }
        }
        Command::Check => {
            let config = load_config(&cli)?;
            println!("==> Checking {}", cli.root.join(config::CONFIG_FILENAME).display());
            let checks = process::check(&config, &cli.root);
            output::print_check(&checks);

            let failures = checks.iter().filter(|c| c.status.is_err()).count();
            if failures > 0 {
                return Err(format!("{failures} preset(s) have problems").into());
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load config.toml from the project root, applying the `--output` override.
fn load_config(cli: &Cli) -> Result<BuildConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.root)?;
    if let Some(output) = &cli.output {
        config.destination = output.to_string_lossy().into_owned();
        config.validate()?;
    }
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: the config can lower it, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// One pass with live progress on stdout and a summary at the end.
fn run_pass(
    config: &BuildConfig,
    root: &Path,
    cache: &MtimeCache,
) -> Result<process::ProcessResult, Box<dyn std::error::Error>> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_process_event(&event);
        }
    });

    let mut registry: Vec<ImageArtifact> = Vec::new();
    let result = process::process(config, root, cache, &mut registry, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    tracing::info!(registered = registry.len(), "pass complete");
    output::print_pass_summary(&result);
    Ok(result)
}
