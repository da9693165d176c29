//! poisson-cat - Poisson differential abundance CLI
//!
//! Command-line interface for closed-form Poisson differentials over a
//! binary metadata category.

use clap::{Parser, Subcommand, ValueEnum};
use poisson_cat::data::{CountMatrix, Metadata};
use poisson_cat::error::Result;
use poisson_cat::filter::DEFAULT_CONTROL_LABEL;
use poisson_cat::pipeline::{PoissonCat, PoissonCatConfig, PoissonCatOutput};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Format of the differentials written to the output path
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Two-column TSV (FeatureID, Differential)
    Tsv,
    /// JSON with group summary; non-finite scores become null
    Json,
}

/// Poisson differential abundance for binary categories
#[derive(Parser)]
#[command(name = "poisson-cat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute differentials for a metadata category
    Run {
        /// Count table TSV (features x samples, BIOM TSV accepted)
        #[arg(short, long)]
        table: PathBuf,

        /// Sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Metadata category of interest
        #[arg(short, long)]
        category: String,

        /// Reference category; if not specified, the first category will be picked
        #[arg(short, long)]
        reference_category: Option<String>,

        /// Output path to which differentials will be written
        #[arg(short, long)]
        output_path: PathBuf,

        /// Filter out all samples whose category value is the control label
        #[arg(short, long)]
        filter_control: bool,

        /// Category value identifying control samples
        #[arg(long, default_value = DEFAULT_CONTROL_LABEL)]
        control_label: String,

        /// Output format
        #[arg(long, value_enum, default_value = "tsv")]
        format: OutputFormat,
    },

    /// Run an analysis from a YAML configuration file
    Config {
        /// Path to analysis configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Count table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Output path to which differentials will be written
        #[arg(short, long)]
        output_path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "tsv")]
        format: OutputFormat,
    },

    /// Generate an example analysis configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "poisson-cat.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            table,
            metadata,
            category,
            reference_category,
            output_path,
            filter_control,
            control_label,
            format,
        } => {
            let mut analysis = PoissonCat::new(&category);
            if let Some(reference) = &reference_category {
                analysis = analysis.reference(reference);
            }
            if filter_control {
                analysis = analysis.filter_control(&control_label);
            }
            cmd_run(&analysis, &table, &metadata, &output_path, format)
        }

        Commands::Config {
            config,
            table,
            metadata,
            output_path,
            format,
        } => load_config(&config).and_then(|config| {
            cmd_run(
                &PoissonCat::from_config(&config),
                &table,
                &metadata,
                &output_path,
                format,
            )
        }),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<PoissonCatConfig> {
    info!("Loading configuration from {:?}", path);
    let yaml = std::fs::read_to_string(path)?;
    PoissonCatConfig::from_yaml(&yaml)
}

/// Load inputs, run the analysis and write the differentials
fn cmd_run(
    analysis: &PoissonCat,
    table_path: &Path,
    metadata_path: &Path,
    output_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    info!("Loading data...");
    let counts = CountMatrix::from_tsv(table_path)?;
    let metadata = Metadata::from_tsv(metadata_path)?;
    info!(
        "Loaded {} features x {} samples, {} metadata samples",
        counts.n_features(),
        counts.n_samples(),
        metadata.n_samples()
    );

    info!("Running poisson_cat on '{}'...", analysis.config().category);
    let PoissonCatOutput {
        differentials,
        control_filter,
    } = analysis.run(&counts, &metadata)?;

    if control_filter.applied {
        info!(
            "Control filter kept {}/{} samples and {}/{} features",
            control_filter.samples_after,
            control_filter.samples_before,
            control_filter.features_after,
            control_filter.features_before
        );
    }
    let groups = &differentials.groups;
    info!(
        "Reference '{}': {} samples ({} counts); '{}': {} samples ({} counts)",
        groups.reference_level,
        groups.n_reference,
        groups.reference_library_size,
        groups.other_level,
        groups.n_non_reference,
        groups.non_reference_library_size
    );
    let n_non_finite = differentials.n_non_finite();
    if n_non_finite > 0 {
        warn!(
            "{} of {} features have a non-finite differential",
            n_non_finite,
            differentials.len()
        );
    }

    info!("Writing differentials to {:?}...", output_path);
    match format {
        OutputFormat::Tsv => differentials.to_tsv(output_path)?,
        OutputFormat::Json => std::fs::write(output_path, differentials.to_json()?)?,
    }
    info!("Done.");

    Ok(())
}

/// Write an example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let config = PoissonCat::new("disease")
        .name("example-poisson-cat")
        .reference("healthy")
        .filter_control(DEFAULT_CONTROL_LABEL)
        .config()
        .clone();
    let config = PoissonCatConfig {
        description: Some("Healthy vs. disease, control samples removed".to_string()),
        ..config
    };

    std::fs::write(output_path, config.to_yaml()?)?;
    eprintln!("Example configuration written to {:?}", output_path);

    Ok(())
}
