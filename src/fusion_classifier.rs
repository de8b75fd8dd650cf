use derive_builder::Builder;
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::confusion::{ConfusionCounter, ConfusionError};
use crate::data_types::detected::{DetectedFusion, ParsedRecord};
use crate::data_types::locus::Located;
use crate::expression_classifier::ExpressionPoint;
use crate::limit_of_detection::{SensitivityResult, estimate_limit_of_detection};
use crate::reference::model::{ReferenceError, ReferenceModel};

/// Controls the fusion scoring
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct FusionClassifierConfig {
    /// tolerance in bp applied to each breakpoint
    fuzzy: u64,
    /// mixture used for the expected abundances, the first one if None
    mixture: Option<String>
}

impl Default for FusionClassifierConfig {
    fn default() -> Self {
        Self {
            fuzzy: 0,
            mixture: None
        }
    }
}

/// What a single fusion call was counted as
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum_macros::Display)]
pub enum FusionLabel {
    /// first call matching a sequin fusion
    #[strum(serialize = "TP")]
    TruePositive,
    /// another call matching an already detected sequin fusion
    #[strum(serialize = "DUP")]
    Duplicate,
    /// call touching the synthetic chromosomes that matches no sequin
    #[strum(serialize = "FP")]
    FalsePositive,
    /// both breakpoints outside the synthetic chromosomes
    #[strum(serialize = "GENOME")]
    Genome,
    /// one breakpoint inside and one outside the synthetic chromosomes
    #[strum(serialize = "GENOME_SYNTHETIC")]
    GenomeSynthetic
}

/// One fusion call with its label and the sequin it matched, if any
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionOutcome {
    pub record: DetectedFusion,
    pub label: FusionLabel,
    pub entity_id: Option<String>
}

/// Scores fusion calls against the fusion sequins of a reference
#[derive(Clone, Debug)]
pub struct FusionClassifier<'a> {
    reference: &'a ReferenceModel,
    config: FusionClassifierConfig,
    mixture: String
}

impl<'a> FusionClassifier<'a> {
    /// Constructor
    /// # Errors
    /// * if the configured mixture is not in the reference
    pub fn new(reference: &'a ReferenceModel, config: FusionClassifierConfig) -> Result<Self, ReferenceError> {
        let mixture = reference.resolve_mixture(config.mixture.as_deref())?;
        Ok(Self { reference, config, mixture })
    }

    /// Labels one well-formed call, returning the matched sequin id for true positives and duplicates
    fn label(&self, record: &DetectedFusion, histogram: &mut BTreeMap<String, u64>) -> (FusionLabel, Option<String>) {
        let synthetic_1 = self.reference.chrom(record.chrom_1()).is_some();
        let synthetic_2 = self.reference.chrom(record.chrom_2()).is_some();
        match (synthetic_1, synthetic_2) {
            (false, false) => return (FusionLabel::Genome, None),
            (true, false) | (false, true) => return (FusionLabel::GenomeSynthetic, None),
            (true, true) => {}
        };
        if !record.is_intra_chromosomal() {
            return (FusionLabel::FalsePositive, None);
        }

        match self.reference.find_fusion(record.chrom_1(), &record.breakpoints(), self.config.fuzzy) {
            Some(entity) => {
                let count = histogram.entry(entity.id().to_string()).or_default();
                *count += 1;
                let label = if *count == 1 { FusionLabel::TruePositive } else { FusionLabel::Duplicate };
                (label, Some(entity.id().to_string()))
            },
            None => (FusionLabel::FalsePositive, None)
        }
    }

    /// Scores every call in a single pass
    /// # Errors
    /// * if the counter breaks `tp <= nr`, which indicates a bug
    pub fn classify<I>(&self, records: I) -> Result<FusionClassification, ConfusionError>
    where
        I: IntoIterator<Item = ParsedRecord<DetectedFusion>>
    {
        let reference = self.reference;
        let entities: Vec<_> = reference.chromosomes()
            .filter_map(|chrom| reference.chrom(chrom))
            .flat_map(|data| data.fusions().iter())
            .collect();
        let mut confusion = ConfusionCounter::default();
        confusion.add_reference_total(entities.len() as u64);
        let mut histogram: BTreeMap<String, u64> = entities.iter()
            .map(|f| (f.id().to_string(), 0))
            .collect();
        let abundances: BTreeMap<String, f64> = entities.iter()
            .filter_map(|f| f.abundance(&self.mixture).map(|abundance| (f.id().to_string(), abundance)))
            .collect();

        let mut stats = FusionStats::default();
        let mut outcomes: Vec<FusionOutcome> = vec![];
        let mut points: Vec<ExpressionPoint> = vec![];
        for parsed in records {
            stats.seen += 1;
            let record = match parsed {
                ParsedRecord::Record(r) => r,
                ParsedRecord::Malformed { reason } => {
                    debug!("Skipping malformed fusion record: {reason}");
                    stats.malformed += 1;
                    continue;
                }
            };

            let (label, entity_id) = self.label(&record, &mut histogram);
            match label {
                FusionLabel::Genome => stats.genome += 1,
                FusionLabel::GenomeSynthetic => stats.genome_synthetic += 1,
                FusionLabel::Duplicate => {
                    stats.classified += 1;
                    stats.duplicates += 1;
                },
                FusionLabel::FalsePositive => {
                    trace!("Unmatched fusion at {}:{}", record.chrom_1(), record.locus());
                    stats.classified += 1;
                    confusion.add_false_positive();
                },
                FusionLabel::TruePositive => {
                    stats.classified += 1;
                    confusion.add_true_positive();
                    let expected = entity_id.as_deref()
                        .and_then(|id| abundances.get(id).copied())
                        .unwrap_or(f64::NAN);
                    points.push(ExpressionPoint {
                        entity_id: entity_id.clone().unwrap_or_default(),
                        chrom: record.chrom_1().to_string(),
                        locus: record.locus(),
                        expected,
                        measured: record.reads() as f64
                    });
                }
            };
            outcomes.push(FusionOutcome { record, label, entity_id });
        }
        confusion.check()?;

        if points.is_empty() {
            warn!("No fusion calls matched a sequin, {} records were seen", stats.seen);
        }

        let missing: Vec<String> = entities.iter()
            .filter(|f| histogram.get(f.id()).copied().unwrap_or(0) == 0)
            .map(|f| f.id().to_string())
            .collect();
        let sensitivity = estimate_limit_of_detection(&histogram, &abundances);

        Ok(FusionClassification {
            mixture: self.mixture.clone(),
            confusion,
            sensitivity,
            stats,
            outcomes,
            points,
            missing,
            histogram
        })
    }
}

/// What happened to the records
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FusionStats {
    pub seen: u64,
    pub malformed: u64,
    /// Calls with both breakpoints off the synthetic chromosomes
    pub genome: u64,
    /// Calls joining a synthetic and a non-synthetic chromosome
    pub genome_synthetic: u64,
    /// Repeat calls of an already detected sequin, included in `classified`
    pub duplicates: u64,
    /// Calls that were matched against the sequins
    pub classified: u64
}

/// The full outcome of a fusion run
#[derive(Clone, Debug, Serialize)]
pub struct FusionClassification {
    mixture: String,
    /// tp = distinct fusions detected, fp = calls matching no sequin
    confusion: ConfusionCounter,
    sensitivity: SensitivityResult,
    stats: FusionStats,
    #[serde(skip)]
    outcomes: Vec<FusionOutcome>,
    /// expected is the mixture abundance, measured is the supporting read count
    #[serde(skip)]
    points: Vec<ExpressionPoint>,
    /// fusion ids never detected
    missing: Vec<String>,
    histogram: BTreeMap<String, u64>
}

impl FusionClassification {
    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn confusion(&self) -> &ConfusionCounter {
        &self.confusion
    }

    pub fn sensitivity(&self) -> &SensitivityResult {
        &self.sensitivity
    }

    pub fn stats(&self) -> &FusionStats {
        &self.stats
    }

    pub fn outcomes(&self) -> &[FusionOutcome] {
        &self.outcomes
    }

    pub fn points(&self) -> &[ExpressionPoint] {
        &self.points
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn histogram(&self) -> &BTreeMap<String, u64> {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use std::path::PathBuf;

    use crate::data_types::detected::FusionSide;
    use crate::data_types::sequins::Strand;
    use crate::parsing::annotation::load_fusion_annotation;
    use crate::parsing::features::load_fusions;
    use crate::parsing::mixture::load_mixture;
    use crate::reference::builder::{FusionAnnotation, MixtureRecord, ReferenceBuilder};

    fn build_reference() -> ReferenceModel {
        let mut builder = ReferenceBuilder::new();
        builder.extend_fusion_annotations(load_fusion_annotation(&PathBuf::from("test_data/fusions_annotation.tsv")).unwrap());
        builder.extend_mixture_records(load_mixture(&PathBuf::from("test_data/mixture_fusions.tsv")).unwrap());
        builder.build_fusions().unwrap()
    }

    fn call(chrom_1: &str, break_1: u64, chrom_2: &str, break_2: u64, reads: u64) -> ParsedRecord<DetectedFusion> {
        let side_1 = FusionSide { chrom: chrom_1.to_string(), position: break_1, strand: Strand::Forward };
        let side_2 = FusionSide { chrom: chrom_2.to_string(), position: break_2, strand: Strand::Forward };
        ParsedRecord::Record(DetectedFusion::new(side_1, side_2, reads).unwrap())
    }

    #[test]
    fn test_fusion_calls() {
        let reference = build_reference();
        let config = FusionClassifierConfigBuilder::default()
            .fuzzy(1)
            .build().unwrap();
        let classifier = FusionClassifier::new(&reference, config).unwrap();
        let calls = load_fusions(&PathBuf::from("test_data/fusions.tsv")).unwrap();
        let result = classifier.classify(calls).unwrap();

        assert_eq!(result.mixture(), "A");
        assert_eq!(result.confusion(), &ConfusionCounter::new(2, 1, 3));
        assert_eq!(result.stats(), &FusionStats {
            seen: 7, malformed: 1, genome: 1, genome_synthetic: 1, duplicates: 1, classified: 4
        });

        let labels: Vec<FusionLabel> = result.outcomes().iter().map(|o| o.label).collect();
        assert_eq!(labels, vec![
            FusionLabel::TruePositive, FusionLabel::Duplicate, FusionLabel::TruePositive,
            FusionLabel::FalsePositive, FusionLabel::GenomeSynthetic, FusionLabel::Genome
        ]);
        assert_eq!(result.outcomes()[1].entity_id.as_deref(), Some("FG1_12_1"));
        assert_eq!(result.missing(), &["FG3_23_1".to_string()]);
        assert_eq!(result.histogram()["FG1_12_1"], 2);

        assert_eq!(result.points().len(), 2);
        assert_approx_eq!(result.points()[0].expected, 16.0);
        assert_approx_eq!(result.points()[0].measured, 30.0);

        // FG2 is seen once, FG1 twice
        assert_eq!(result.sensitivity().entity_id(), Some("FG2_12P_1"));
        assert_approx_eq!(result.sensitivity().abundance(), 2.0);
    }

    #[test]
    fn test_strict_breakpoints() {
        let mut builder = ReferenceBuilder::new();
        builder.extend_fusion_annotations(load_fusion_annotation(&PathBuf::from("test_data/fusions_annotation.tsv")).unwrap());
        builder.extend_fusion_annotations([FusionAnnotation {
            id: "FG4_1".to_string(),
            chrom: "chrU".to_string(),
            break_1: 100,
            strand_1: Strand::Forward,
            break_2: 900,
            strand_2: Strand::Forward
        }]);
        builder.extend_mixture_records(load_mixture(&PathBuf::from("test_data/mixture_fusions.tsv")).unwrap());
        builder.add_mixture_record(MixtureRecord { id: "FG4_1".to_string(), mixture: "A".to_string(), abundance: 1.0 });
        let reference = builder.build_fusions().unwrap();

        let classifier = FusionClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            // one base off without any tolerance
            call("chrT", 1201, "chrT", 5000, 10),
            call("chrT", 1200, "chrT", 5000, 10),
            // both sides synthetic but on different chromosomes
            call("chrT", 100, "chrU", 900, 10)
        ]).unwrap();
        assert_eq!(result.confusion(), &ConfusionCounter::new(1, 2, 4));
        assert_eq!(result.stats().genome_synthetic, 0);
        assert_eq!(result.outcomes()[2].label, FusionLabel::FalsePositive);
        assert_eq!(result.missing().len(), 3);
    }

    #[test]
    fn test_nothing_detected() {
        let reference = build_reference();
        let classifier = FusionClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([call("chr1", 10, "chr2", 20, 5)]).unwrap();
        assert_eq!(result.confusion(), &ConfusionCounter::new(0, 0, 3));
        assert!(!result.sensitivity().is_detected());
        assert_eq!(result.missing().len(), 3);
    }
}
