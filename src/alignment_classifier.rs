use derive_builder::Builder;
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::confusion::{ConfusionCounter, ConfusionError, ConfusionSnapshot};
use crate::data_types::detected::{DetectedFeature, DetectedRecord, ParsedRecord};
use crate::data_types::locus::{Located, Locus};
use crate::data_types::sequins::{FeatureKind, SplicedFeature};
use crate::limit_of_detection::{SensitivityResult, estimate_limit_of_detection};
use crate::reference::matcher::MatchRule;
use crate::reference::model::{ReferenceError, ReferenceModel};

/// Controls the alignment scoring
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct AlignmentClassifierConfig {
    /// mixture used for the gene abundances, the first one if None
    mixture: Option<String>
}

/// Record counts for one feature kind, each aligned block or junction is one record
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AlignmentCounts {
    /// Records that matched a reference feature
    pub matched: u64,
    /// Records on a synthetic chromosome that matched nothing
    pub unmatched: u64
}

impl AlignmentCounts {
    /// matched / (matched + unmatched), None without records
    pub fn precision(&self) -> Option<f64> {
        let denom = self.matched + self.unmatched;
        if denom > 0 {
            Some(self.matched as f64 / denom as f64)
        } else {
            None
        }
    }
}

/// Metrics for exons or introns.
/// Sensitivity is over distinct reference features, precision is over the aligned records.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FeatureMetrics {
    alignment: AlignmentCounts,
    /// tp = distinct reference features detected, fp = unmatched records, nr = reference features
    feature: ConfusionCounter
}

impl FeatureMetrics {
    /// Report view combining the feature sensitivity with the record precision
    /// # Errors
    /// * if more features were detected than exist
    pub fn snapshot(&self) -> Result<ConfusionSnapshot, ConfusionError> {
        let mut snapshot = self.feature.snapshot()?;
        let precision = self.alignment.precision();
        snapshot.precision = precision.unwrap_or(f64::NAN);
        snapshot.fdr = precision.map(|p| 1.0 - p).unwrap_or(f64::NAN);
        snapshot.f1 = match (self.feature.sensitivity()?, precision) {
            (Some(sn), Some(pc)) if sn + pc > 0.0 => 2.0 * sn * pc / (sn + pc),
            (Some(_), Some(_)) => 0.0,
            _ => f64::NAN
        };
        Ok(snapshot)
    }

    // getters
    pub fn alignment(&self) -> &AlignmentCounts {
        &self.alignment
    }

    pub fn feature(&self) -> &ConfusionCounter {
        &self.feature
    }
}

/// Scores aligned exon blocks and splice junctions against a transcriptome reference
#[derive(Clone, Debug)]
pub struct AlignmentClassifier<'a> {
    reference: &'a ReferenceModel,
    mixture: String
}

impl<'a> AlignmentClassifier<'a> {
    /// Constructor
    /// # Errors
    /// * if the configured mixture is not in the reference
    pub fn new(reference: &'a ReferenceModel, config: AlignmentClassifierConfig) -> Result<Self, ReferenceError> {
        let mixture = reference.resolve_mixture(config.mixture.as_deref())?;
        Ok(Self { reference, mixture })
    }

    /// Scores every record in a single pass
    /// # Arguments
    /// * `records` - the aligned features
    /// # Errors
    /// * if a counter breaks `tp <= nr`, which indicates a bug
    pub fn classify<I>(&self, records: I) -> Result<AlignmentClassification<'a>, ConfusionError>
    where
        I: IntoIterator<Item = ParsedRecord<DetectedFeature>>
    {
        let reference = self.reference;
        let mut exons = FeatureMetrics::default();
        let mut introns = FeatureMetrics::default();
        let mut seen: u64 = 0;
        let mut malformed: u64 = 0;
        let mut out_of_region: u64 = 0;

        // identity of a feature is (kind, gene, locus) since features are distinct per gene
        let mut detected_features: FxHashSet<(FeatureKind, &'a str, Locus)> = Default::default();
        let mut blocks: BTreeMap<String, Vec<Locus>> = Default::default();
        let mut histogram: BTreeMap<String, u64> = Default::default();
        let mut abundances: BTreeMap<String, f64> = Default::default();
        for chrom in reference.chromosomes() {
            if let Some(data) = reference.chrom(chrom) {
                for gene in data.genes().iter() {
                    histogram.insert(gene.id().to_string(), 0);
                    if let Some(abundance) = gene.abundance(&self.mixture) {
                        abundances.insert(gene.id().to_string(), abundance);
                    }
                }
                exons.feature.add_reference_total(data.exons().len() as u64);
                introns.feature.add_reference_total(data.introns().len() as u64);
            }
        }

        for parsed in records {
            seen += 1;
            let record = match parsed {
                ParsedRecord::Record(r) => r,
                ParsedRecord::Malformed { reason } => {
                    debug!("Skipping malformed feature: {reason}");
                    malformed += 1;
                    continue;
                }
            };

            let chrom = record.chrom();
            let locus = record.locus();
            if reference.chrom(chrom).is_none() {
                trace!("Out of region {chrom}:{locus}");
                out_of_region += 1;
                continue;
            }

            let (metrics, hit) = match record.kind() {
                FeatureKind::Exon => {
                    blocks.entry(chrom.to_string()).or_default().push(locus);
                    (&mut exons, reference.find_exon(chrom, &locus, MatchRule::Contains))
                },
                FeatureKind::Intron => {
                    (&mut introns, reference.find_intron(chrom, &locus, MatchRule::Exact))
                }
            };

            match hit {
                Some(feature) => {
                    metrics.alignment.matched += 1;
                    if detected_features.insert((feature.kind(), feature.gene_id(), feature.locus())) {
                        metrics.feature.add_true_positive();
                    }
                    if record.kind() == FeatureKind::Exon {
                        *histogram.entry(feature.gene_id().to_string()).or_default() += 1;
                    }
                },
                None => {
                    metrics.alignment.unmatched += 1;
                    metrics.feature.add_false_positive();
                }
            }
        }

        // base level, merged blocks against the merged reference exons
        let mut bases = ConfusionCounter::default();
        for chrom in reference.chromosomes() {
            let Some(data) = reference.chrom(chrom) else {
                continue;
            };
            bases.add_reference_total(data.exon_bases());
            let Some(chrom_blocks) = blocks.get(chrom) else {
                continue;
            };

            let merged_blocks = Locus::merge(chrom_blocks);
            let query_bases: u64 = merged_blocks.iter().map(|l| l.length()).sum();
            let true_bases = Locus::merged_overlap(&merged_blocks, data.merged_exons());
            bases.add_counts(true_bases, query_bases - true_bases);
        }

        bases.check()?;
        exons.feature.check()?;
        introns.feature.check()?;

        let mut missing: Vec<(&'a str, &'a SplicedFeature)> = vec![];
        for chrom in reference.chromosomes() {
            if let Some(data) = reference.chrom(chrom) {
                missing.extend(
                    data.exons().iter().chain(data.introns().iter())
                        .filter(|f| !detected_features.contains(&(f.kind(), f.gene_id(), f.locus())))
                        .map(|f| (chrom, f))
                );
            }
        }

        let classified = exons.alignment.matched + exons.alignment.unmatched +
            introns.alignment.matched + introns.alignment.unmatched;
        if classified == 0 {
            warn!("No aligned features could be classified, {seen} records were seen");
        } else if malformed + out_of_region > 0 {
            warn!("Skipped {} features: {malformed} malformed, {out_of_region} off the synthetic chromosomes", malformed + out_of_region);
        }

        let sensitivity = estimate_limit_of_detection(&histogram, &abundances);
        Ok(AlignmentClassification {
            mixture: self.mixture.clone(),
            bases,
            exons,
            introns,
            sensitivity,
            seen,
            malformed,
            out_of_region,
            missing,
            histogram
        })
    }
}

/// The full outcome of an alignment run
#[derive(Clone, Debug, Serialize)]
pub struct AlignmentClassification<'a> {
    mixture: String,
    /// base-level counts
    bases: ConfusionCounter,
    exons: FeatureMetrics,
    introns: FeatureMetrics,
    /// gene-level detection floor
    sensitivity: SensitivityResult,
    seen: u64,
    malformed: u64,
    out_of_region: u64,
    /// reference exons and introns no record matched, with their chromosome
    #[serde(skip)]
    missing: Vec<(&'a str, &'a SplicedFeature)>,
    /// gene id to exon block count
    histogram: BTreeMap<String, u64>
}

impl<'a> AlignmentClassification<'a> {
    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn bases(&self) -> &ConfusionCounter {
        &self.bases
    }

    pub fn exons(&self) -> &FeatureMetrics {
        &self.exons
    }

    pub fn introns(&self) -> &FeatureMetrics {
        &self.introns
    }

    pub fn sensitivity(&self) -> &SensitivityResult {
        &self.sensitivity
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    pub fn out_of_region(&self) -> u64 {
        self.out_of_region
    }

    pub fn missing(&self) -> &[(&'a str, &'a SplicedFeature)] {
        &self.missing
    }

    pub fn histogram(&self) -> &BTreeMap<String, u64> {
        &self.histogram
    }
}
