use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::common::{CommonSettings, check_common_inputs, check_common_outputs};
use crate::cli::core::{AFTER_HELP, check_optional_filename, check_required_filename};
use crate::data_types::sequins::VariantClass;
use crate::parsing::noodles_helper::get_vcf_sample_name;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct GermlineSettings {
    #[clap(flatten)]
    pub common: CommonSettings,

    /// Variant sequin annotation (TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotation")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_fn: PathBuf,

    /// Variant calls to score (VCF/BCF)
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "calls")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub calls_fn: PathBuf,

    /// Sequin regions (BED) [default: sequin loci padded by --region-flank]
    #[clap(short = 'b')]
    #[clap(long = "regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub regions: Option<PathBuf>,

    /// The sample name to use in the calls [default: first sample]
    #[clap(long = "sample")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub sample: String,

    /// Padding (bp) around each sequin when no regions are given
    #[clap(long = "region-flank")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "500")]
    pub region_flank: u64,

    /// Only score calls with a PASS filter
    #[clap(long = "passed-only")]
    #[clap(help_heading = Some("Classification parameters"))]
    pub passed_only: bool,

    /// Boundary tolerance (bp) when matching call positions
    #[clap(long = "fuzzy")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "0")]
    pub fuzzy: u64,

    /// Class of sequins under evaluation
    #[clap(long = "class")]
    #[clap(value_name = "CLASS")]
    #[clap(help_heading = Some("Classification parameters"))]
    #[clap(default_value = "germline")]
    pub class: VariantClass,

    /// Calls with a PVAL above this threshold are filtered
    #[clap(long = "significance")]
    #[clap(value_name = "P")]
    #[clap(help_heading = Some("Classification parameters"))]
    pub significance: Option<f64>
}

pub fn check_germline_settings(mut settings: GermlineSettings) -> anyhow::Result<GermlineSettings> {
    check_common_inputs(&mut settings.common, "germline")?;

    // check for all the required input files
    check_required_filename(&settings.annotation_fn, "Annotation TSV")?;
    check_required_filename(&settings.calls_fn, "Calls VCF")?;
    check_optional_filename(settings.regions.as_deref(), "Regions")?;

    // dump stuff to the logger
    info!("\tAnnotation: {:?}", &settings.annotation_fn);
    info!("\tCalls VCF: {:?}", &settings.calls_fn);
    if settings.sample.is_empty() {
        settings.sample = get_vcf_sample_name(&settings.calls_fn, None)?.unwrap_or_default();
    } else {
        // fails if the sample is not in the file
        get_vcf_sample_name(&settings.calls_fn, Some(settings.sample.as_str()))?;
    }
    info!("\tCalls sample: {:?}", &settings.sample);
    if let Some(regions_fn) = settings.regions.as_deref() {
        info!("\tRegions: {regions_fn:?}");
    } else {
        info!("\tRegions: sequins +-{} bp", settings.region_flank);
    }

    check_common_outputs(&mut settings.common);

    info!("Classification parameters:");
    info!("\tEvaluated class: {}", settings.class);
    info!("\tPassed only: {}", if settings.passed_only { "ENABLED" } else { "DISABLED" });
    info!("\tFuzzy match: {} bp", settings.fuzzy);
    if let Some(significance) = settings.significance {
        if !(0.0..=1.0).contains(&significance) {
            bail!("--significance must be in [0, 1]");
        }
        info!("\tSignificance: {significance}");
    }

    Ok(settings)
}
