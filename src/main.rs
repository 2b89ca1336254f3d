use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use paper_mirror::config::{find_config_file, load_config, Config, LOCAL_CONFIG_NAME};
use paper_mirror::download::{
    summary, write_archive, write_failure_manifest, BatchProcessor, FallbackChain, OutputDir,
};
use paper_mirror::models::parse_doi_list;
use paper_mirror::ui::{self, Status};
use paper_mirror::utils::ProgressReporter;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Mirror - Download paper PDFs by DOI from mirror sites with an open-access fallback
#[derive(Parser, Debug)]
#[command(name = "paper-mirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download paper PDFs by DOI from mirror sites with an open-access fallback", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download papers for a list of DOIs
    #[command(alias = "dl")]
    Download(DownloadArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug, Default)]
struct DownloadArgs {
    /// File with DOIs separated by commas or newlines ("-" reads stdin)
    input: Option<PathBuf>,

    /// DOI to download (repeatable, comma-delimited)
    #[arg(long = "doi", value_delimiter = ',')]
    dois: Vec<String>,

    /// Additional mirror base URL, tried after the configured ones (repeatable)
    #[arg(long = "mirror")]
    mirrors: Vec<String>,

    /// Use only the mirrors given with --mirror
    #[arg(long)]
    no_default_mirrors: bool,

    /// Maximum number of mirrors tried per DOI
    #[arg(long)]
    max_mirrors: Option<usize>,

    /// Minimum pause between mirrors, in seconds
    #[arg(long)]
    delay_min: Option<f64>,

    /// Maximum pause between mirrors, in seconds
    #[arg(long)]
    delay_max: Option<f64>,

    /// Contact email for the open-access lookup
    #[arg(long)]
    email: Option<String>,

    /// Directory the PDFs are written to
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Path of the zip archive
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Path of the failed DOI list
    #[arg(long)]
    failed_list: Option<PathBuf>,

    /// Do not write a zip archive
    #[arg(long)]
    no_archive: bool,

    /// Keep files from previous runs in the output directory
    #[arg(long)]
    keep_existing: bool,

    /// Skip the open-access fallback
    #[arg(long)]
    no_open_access: bool,

    /// Rendering proxy used once after a 403 (empty string disables it)
    #[arg(long)]
    bypass_proxy: Option<String>,

    /// Print the batch result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a configuration file with the default settings
    Init {
        /// Where to write it
        #[arg(default_value = LOCAL_CONFIG_NAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_mirror={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let mut config =
        load_config(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }

    match cli.command {
        Commands::Download(args) => {
            apply_overrides(&mut config, &args);
            config.validate().context("Invalid settings")?;
            run_download(&config, &args, cli.quiet).await
        }
        Commands::Config(ConfigCommands::Init { path, force }) => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
            Ok(())
        }
        Commands::Config(ConfigCommands::Show) => {
            match &config_path {
                Some(path) => println!("# {}", path.display()),
                None => println!("# built-in defaults"),
            }
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Layer command line flags over the loaded configuration
fn apply_overrides(config: &mut Config, args: &DownloadArgs) {
    if args.no_default_mirrors {
        config.mirrors.urls.clear();
    }
    config.mirrors.urls.extend(args.mirrors.iter().cloned());
    if let Some(max) = args.max_mirrors {
        config.mirrors.max = max;
    }
    if let Some(min) = args.delay_min {
        config.delay.min_secs = min;
    }
    if let Some(max) = args.delay_max {
        config.delay.max_secs = max;
    }
    if let Some(email) = &args.email {
        config.open_access.email = Some(email.clone());
    }
    if args.no_open_access {
        config.open_access.enabled = false;
    }
    if let Some(proxy) = &args.bypass_proxy {
        config.http.bypass_proxy = proxy.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.downloads.output_dir = dir.clone();
    }
    if let Some(archive) = &args.archive {
        config.downloads.archive_name = archive.clone();
    }
    if let Some(failed) = &args.failed_list {
        config.downloads.failed_list_name = failed.clone();
    }
    if args.keep_existing {
        config.downloads.clear_output_dir = false;
    }
}

/// Gather DOIs from the input file (or stdin) and `--doi` flags, in that order
fn collect_dois(args: &DownloadArgs) -> Result<Vec<String>> {
    let mut dois = Vec::new();

    if let Some(input) = &args.input {
        let content = if input == Path::new("-") {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read DOIs from stdin")?;
            buffer
        } else {
            std::fs::read_to_string(input)
                .with_context(|| format!("Failed to read {}", input.display()))?
        };
        dois.extend(parse_doi_list(&content));
    }

    dois.extend(
        args.dois
            .iter()
            .map(|d| d.trim().trim_matches('"').trim().to_string())
            .filter(|d| !d.is_empty()),
    );

    Ok(dois)
}

async fn run_download(config: &Config, args: &DownloadArgs, quiet: bool) -> Result<()> {
    let dois = collect_dois(args)?;
    if dois.is_empty() {
        bail!("No DOIs given. Pass a file, \"-\" for stdin, or --doi");
    }
    tracing::info!("Found {} DOIs.", dois.len());

    let mirrors = config.mirror_list();
    if mirrors.was_truncated() {
        tracing::warn!("Only the first {} mirrors will be used.", mirrors.len());
    }

    OutputDir::new(&config.downloads.output_dir)
        .prepare(config.downloads.clear_output_dir)
        .with_context(|| {
            format!(
                "Failed to prepare {}",
                config.downloads.output_dir.display()
            )
        })?;

    let processor = BatchProcessor::new(FallbackChain::from_config(config)?);

    let reporter = if quiet || args.json || !ui::is_terminal() {
        ProgressReporter::quiet("Downloading papers", dois.len())
    } else {
        ProgressReporter::new("Downloading papers", dois.len())
    };
    let result = processor.run(&dois, &reporter).await;
    reporter.finish();

    let manifest = write_failure_manifest(&result, &config.downloads.failed_list_name)?;
    let archive = if args.no_archive {
        None
    } else {
        match write_archive(&result, &config.downloads.archive_name) {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(
                    "Failed to archive downloads into {}: {}",
                    config.downloads.archive_name.display(),
                    e
                );
                None
            }
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if ui::is_terminal() {
        ui::print_summary(&result, archive.as_deref(), manifest.as_deref());
    } else {
        print!("{}", summary(&result));
    }

    Ok(())
}
