use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::common::{CommonSettings, check_common_inputs, check_common_outputs};
use crate::cli::core::{AFTER_HELP, check_required_filename};
use crate::expression_classifier::ExpressionLevel;
use crate::reference::matcher::MatchRule;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct FoldSettings {
    #[clap(flatten)]
    pub common: CommonSettings,

    /// Transcript sequin annotation, one exon per row (TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotation")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_fn: PathBuf,

    /// Measured log2 fold changes with optional q-values (TSV)
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "folds")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub folds_fn: PathBuf,

    /// Mixture column the folds are relative to, --mix is the baseline [default: first other mixture]
    #[clap(long = "mix-b")]
    #[clap(value_name = "NAME")]
    #[clap(help_heading = Some("Input/Output"))]
    pub mix_b: Option<String>,

    /// Match records to isoforms or genes
    #[clap(long = "level")]
    #[clap(value_name = "LEVEL")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "isoform")]
    pub level: ExpressionLevel,

    /// Locus rule for a match
    #[clap(long = "rule")]
    #[clap(value_name = "RULE")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "exact")]
    pub rule: MatchRule,

    /// Records with a q-value at or below this are differential calls
    #[clap(long = "q-cutoff")]
    #[clap(value_name = "Q")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "0.1")]
    pub q_cutoff: f64,

    /// Sequins with an expected |log2 fold| above this are truly differential
    #[clap(long = "fold-cutoff")]
    #[clap(value_name = "LOG2")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "0")]
    pub fold_cutoff: f64
}

pub fn check_fold_settings(mut settings: FoldSettings) -> anyhow::Result<FoldSettings> {
    check_common_inputs(&mut settings.common, "fold")?;

    check_required_filename(&settings.annotation_fn, "Annotation TSV")?;
    check_required_filename(&settings.folds_fn, "Fold change TSV")?;
    info!("\tAnnotation: {:?}", &settings.annotation_fn);
    info!("\tFold changes: {:?}", &settings.folds_fn);
    match settings.mix_b.as_deref() {
        Some("") => bail!("--mix-b must not be empty"),
        Some(mix) => info!("\tComparison mixture column: {mix:?}"),
        None => info!("\tComparison mixture column: first other")
    };

    check_common_outputs(&mut settings.common);

    info!("Classification parameters:");
    info!("\tLevel: {}", settings.level);
    info!("\tMatch rule: {}", settings.rule);
    if !(0.0..=1.0).contains(&settings.q_cutoff) {
        bail!("--q-cutoff must be in [0, 1]");
    }
    info!("\tQ-value cutoff: {}", settings.q_cutoff);
    if !settings.fold_cutoff.is_finite() || settings.fold_cutoff < 0.0 {
        bail!("--fold-cutoff must be a non-negative number");
    }
    info!("\tFold cutoff: {}", settings.fold_cutoff);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FoldSettings {
        FoldSettings {
            common: CommonSettings {
                mixture_fn: PathBuf::from("test_data/mixture_transcripts.tsv"),
                output_folder: PathBuf::from("unused"),
                ..Default::default()
            },
            annotation_fn: PathBuf::from("test_data/transcripts.tsv"),
            folds_fn: PathBuf::from("test_data/folds.tsv"),
            q_cutoff: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_check_fold_settings() {
        let checked = check_fold_settings(settings()).unwrap();
        assert_eq!(checked.common.threads, 1);
        assert_eq!(checked.level, ExpressionLevel::Isoform);
        assert_eq!(checked.mix_b, None);
    }

    #[test]
    fn test_bad_fold_settings() {
        let mut bad = settings();
        bad.q_cutoff = 1.5;
        assert!(check_fold_settings(bad).is_err());

        let mut bad = settings();
        bad.fold_cutoff = -1.0;
        assert!(check_fold_settings(bad).is_err());

        let mut bad = settings();
        bad.mix_b = Some(String::new());
        assert!(check_fold_settings(bad).is_err());
    }
}
