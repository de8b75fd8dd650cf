use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{FULL_VERSION, check_required_filename};

/// Flags every subcommand takes: the mixture, the synthetic chromosomes, outputs and threading
#[derive(Args, Clone, Default, Serialize)]
pub struct CommonSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    pub quokka_version: String,

    /// Mixture table (CSV or TSV) with one abundance column per mixture
    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "mixture")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub mixture_fn: PathBuf,

    /// Mixture column to score against [default: first mixture]
    #[clap(long = "mix")]
    #[clap(value_name = "NAME")]
    #[clap(help_heading = Some("Input/Output"))]
    pub mix: Option<String>,

    /// Chromosome holding the sequins, can be repeated [default: any]
    #[clap(long = "synthetic-chrom")]
    #[clap(value_name = "NAME")]
    #[clap(help_heading = Some("Input/Output"))]
    pub synthetic_chroms: Vec<String>,

    /// Output directory for the summary, tables and stats
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Optional run label for the output tables
    #[clap(long = "label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "quokka")]
    pub label: String,

    /// Number of threads to use in the classification step
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

/// Checks and logs the shared inputs; each subcommand logs its own inputs in between
/// # Arguments
/// * `settings` - the shared settings, modified in place
/// * `subcommand` - name of the subcommand for the log
/// # Errors
/// * if the mixture file does not exist
/// * if a mixture or chromosome name is empty
pub fn check_common_inputs(settings: &mut CommonSettings, subcommand: &str) -> anyhow::Result<()> {
    // hard code the version in
    settings.quokka_version = FULL_VERSION.clone();
    info!("Quokka version: {:?}", &settings.quokka_version);
    info!("Sub-command: {subcommand}");
    info!("Inputs:");

    check_required_filename(&settings.mixture_fn, "Mixture file")?;
    info!("\tMixture: {:?}", &settings.mixture_fn);
    match settings.mix.as_deref() {
        Some("") => bail!("--mix must not be empty"),
        Some(mix) => info!("\tMixture column: {mix:?}"),
        None => info!("\tMixture column: first")
    };

    if settings.synthetic_chroms.iter().any(|c| c.is_empty()) {
        bail!("--synthetic-chrom must not be empty");
    }
    if settings.synthetic_chroms.is_empty() {
        info!("\tSynthetic chromosomes: any");
    } else {
        info!("\tSynthetic chromosomes: {:?}", &settings.synthetic_chroms);
    }
    Ok(())
}

/// Logs the shared outputs and normalizes the thread count
/// # Arguments
/// * `settings` - the shared settings, modified in place
pub fn check_common_outputs(settings: &mut CommonSettings) {
    info!("Outputs:");
    info!("\tLabel: {:?}", &settings.label);
    info!("\tOutput folder: {:?}", &settings.output_folder);

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);
}
