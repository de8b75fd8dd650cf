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
pub struct ExpressSettings {
    #[clap(flatten)]
    pub common: CommonSettings,

    /// Transcript sequin annotation, one exon per row (TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotation")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_fn: PathBuf,

    /// Measured abundances (TSV)
    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "expression")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub expression_fn: PathBuf,

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
    pub rule: MatchRule
}

pub fn check_express_settings(mut settings: ExpressSettings) -> anyhow::Result<ExpressSettings> {
    check_common_inputs(&mut settings.common, "express")?;

    check_required_filename(&settings.annotation_fn, "Annotation TSV")?;
    check_required_filename(&settings.expression_fn, "Expression TSV")?;
    info!("\tAnnotation: {:?}", &settings.annotation_fn);
    info!("\tExpression: {:?}", &settings.expression_fn);

    check_common_outputs(&mut settings.common);

    info!("Classification parameters:");
    info!("\tLevel: {}", settings.level);
    info!("\tMatch rule: {}", settings.rule);
    Ok(settings)
}
