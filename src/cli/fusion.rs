use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::common::{CommonSettings, check_common_inputs, check_common_outputs};
use crate::cli::core::{AFTER_HELP, check_required_filename};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct FusionSettings {
    #[clap(flatten)]
    pub common: CommonSettings,

    /// Fusion sequin annotation, one junction per row (TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotation")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_fn: PathBuf,

    /// Fusion calls to score (TSV)
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "fusions")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub fusions_fn: PathBuf,

    /// Tolerance (bp) applied to each breakpoint
    #[clap(long = "fuzzy")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "0")]
    pub fuzzy: u64
}

pub fn check_fusion_settings(mut settings: FusionSettings) -> anyhow::Result<FusionSettings> {
    check_common_inputs(&mut settings.common, "fusion")?;

    check_required_filename(&settings.annotation_fn, "Annotation TSV")?;
    check_required_filename(&settings.fusions_fn, "Fusion TSV")?;
    info!("\tAnnotation: {:?}", &settings.annotation_fn);
    info!("\tFusion calls: {:?}", &settings.fusions_fn);

    check_common_outputs(&mut settings.common);

    info!("Classification parameters:");
    info!("\tFuzzy match: {} bp", settings.fuzzy);
    Ok(settings)
}
