
use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use std::path::Path;

use crate::cli::align::AlignSettings;
use crate::cli::express::ExpressSettings;
use crate::cli::fold::FoldSettings;
use crate::cli::fusion::FusionSettings;
use crate::cli::germline::GermlineSettings;

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string with the copyright and the sequin reference note.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2023-{}     The Quokka developers.
Scores are only as good as the sequin annotation and mixture they are computed from;
use the files that shipped with the sequin kit in your sample.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author, 
    version = &**FULL_VERSION, 
    about, 
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// Quokka, a tool for scoring pipelines against spiked-in sequins.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Scores variant calls against germline or somatic variant sequins
    Germline(Box<GermlineSettings>),
    /// Scores aligned exon blocks and splice junctions against transcript sequins
    Align(Box<AlignSettings>),
    /// Scores measured abundances against transcript or gene sequins
    Express(Box<ExpressSettings>),
    /// Scores measured fold changes between two mixtures and their differential calls
    Fold(Box<FoldSettings>),
    /// Scores fusion calls against fusion sequins
    Fusion(Box<FusionSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Fails if a required input file is missing
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.is_file() {
        bail!("{label} does not exist or is not a file: {filename:?}");
    }
    Ok(())
}

/// Same as `check_required_filename`, but `None` is accepted
/// # Arguments
/// * `opt_filename` - the file path to check for, if any
/// * `label` - the label to use for error messages
pub fn check_optional_filename(opt_filename: Option<&Path>, label: &str) -> anyhow::Result<()> {
    match opt_filename {
        Some(filename) => check_required_filename(filename, label),
        None => Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_germline() {
        let cli = Cli::try_parse_from([
            "quokka", "germline",
            "--mixture", "mix.csv", "--annotation", "variants.tsv", "--calls", "calls.vcf",
            "--output-dir", "out", "--synthetic-chrom", "chrQ", "--synthetic-chrom", "chrR",
            "--class", "somatic", "--fuzzy", "2", "-vv"
        ]).unwrap();
        let Commands::Germline(settings) = cli.command else {
            panic!("expected germline");
        };
        assert_eq!(settings.common.synthetic_chroms, vec!["chrQ".to_string(), "chrR".to_string()]);
        assert_eq!(settings.class, crate::data_types::sequins::VariantClass::Somatic);
        assert_eq!(settings.fuzzy, 2);
        assert_eq!(settings.region_flank, 500);
        assert_eq!(settings.common.verbosity, 2);
        assert_eq!(settings.common.label, "quokka");
    }

    #[test]
    fn test_parse_fold() {
        let cli = Cli::try_parse_from([
            "quokka", "fold",
            "--mixture", "mix.tsv", "--annotation", "transcripts.tsv", "--folds", "folds.tsv",
            "--output-dir", "out", "--mix", "A", "--mix-b", "B", "--level", "gene"
        ]).unwrap();
        let Commands::Fold(settings) = cli.command else {
            panic!("expected fold");
        };
        assert_eq!(settings.common.mix.as_deref(), Some("A"));
        assert_eq!(settings.mix_b.as_deref(), Some("B"));
        assert_eq!(settings.level, crate::expression_classifier::ExpressionLevel::Gene);
        assert_eq!(settings.q_cutoff, 0.1);
        assert_eq!(settings.fold_cutoff, 0.0);
    }

    #[test]
    fn test_check_filenames() {
        assert!(check_required_filename(Path::new("test_data/calls.vcf"), "VCF").is_ok());
        assert!(check_required_filename(Path::new("test_data/nope.vcf"), "VCF").is_err());
        assert!(check_optional_filename(None, "BED").is_ok());
        assert!(check_optional_filename(Some(Path::new("test_data/nope.bed")), "BED").is_err());
    }
}
