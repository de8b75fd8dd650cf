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
pub struct AlignSettings {
    #[clap(flatten)]
    pub common: CommonSettings,

    /// Transcript sequin annotation, one exon per row (TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotation")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_fn: PathBuf,

    /// Aligned exon blocks and splice junctions (TSV)
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "features")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub features_fn: PathBuf
}

pub fn check_align_settings(mut settings: AlignSettings) -> anyhow::Result<AlignSettings> {
    check_common_inputs(&mut settings.common, "align")?;

    check_required_filename(&settings.annotation_fn, "Annotation TSV")?;
    check_required_filename(&settings.features_fn, "Features TSV")?;
    info!("\tAnnotation: {:?}", &settings.annotation_fn);
    info!("\tFeatures: {:?}", &settings.features_fn);

    check_common_outputs(&mut settings.common);
    Ok(settings)
}
