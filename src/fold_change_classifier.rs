use derive_builder::Builder;
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::confusion::{ConfusionCounter, ConfusionError};
use crate::data_types::detected::{DetectedFold, DetectedRecord, ParsedRecord};
use crate::data_types::locus::Located;
use crate::expression_classifier::{ExpressionLevel, ExpressionPoint, find_at_level, level_entities};
use crate::limit_of_detection::{SensitivityResult, estimate_limit_of_detection};
use crate::reference::matcher::MatchRule;
use crate::reference::model::{ReferenceError, ReferenceModel};

/// Controls the fold change scoring
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct FoldChangeClassifierConfig {
    /// match to isoforms or genes
    level: ExpressionLevel,
    /// locus rule for the match
    rule: MatchRule,
    /// baseline mixture, the first one if None
    mixture: Option<String>,
    /// compared mixture, the first one that is not the baseline if None
    comparison: Option<String>,
    /// a call is differential when its q-value is at most this
    q_cutoff: f64,
    /// an entity is truly differential when its expected |log2 fold| is above this
    fold_cutoff: f64
}

impl Default for FoldChangeClassifierConfig {
    fn default() -> Self {
        Self {
            level: ExpressionLevel::Isoform,
            rule: MatchRule::Exact,
            mixture: None,
            comparison: None,
            q_cutoff: 0.1,
            fold_cutoff: 0.0
        }
    }
}

/// Expected log2(comparison / baseline), None unless both abundances are positive
fn expected_log_fold(baseline: Option<f64>, comparison: Option<f64>) -> Option<f64> {
    match (baseline, comparison) {
        (Some(a), Some(b)) if a > 0.0 && b > 0.0 => Some((b / a).log2()),
        _ => None
    }
}

/// Scores measured log fold changes between two samples against the fold implied by two mixtures
#[derive(Clone, Debug)]
pub struct FoldChangeClassifier<'a> {
    reference: &'a ReferenceModel,
    config: FoldChangeClassifierConfig,
    mixture: String,
    comparison: String
}

impl<'a> FoldChangeClassifier<'a> {
    /// Constructor
    /// # Errors
    /// * if either configured mixture is not in the reference
    /// * if no comparison is configured and the reference only has one mixture
    pub fn new(reference: &'a ReferenceModel, config: FoldChangeClassifierConfig) -> Result<Self, ReferenceError> {
        let mixture = reference.resolve_mixture(config.mixture.as_deref())?;
        let comparison = match config.comparison.as_deref() {
            Some(m) => reference.resolve_mixture(Some(m))?,
            None => reference.mixtures().iter()
                .find(|m| **m != mixture)
                .cloned()
                .ok_or_else(|| ReferenceError::MissingReferenceData { what: format!("mixture other than {mixture}") })?
        };
        if comparison == mixture {
            warn!("Comparing mixture {mixture} with itself, every expected fold change is 0");
        }
        Ok(Self { reference, config, mixture, comparison })
    }

    /// Scores every record in a single pass.
    /// The first record matched to an entity decides its differential call.
    /// # Errors
    /// * if a counter breaks `tp <= nr`, which indicates a bug
    pub fn classify<I>(&self, records: I) -> Result<FoldChangeClassification, ConfusionError>
    where
        I: IntoIterator<Item = ParsedRecord<DetectedFold>>
    {
        let entities = level_entities(self.reference, self.config.level);
        let mut confusion = ConfusionCounter::default();
        confusion.add_reference_total(entities.len() as u64);
        let mut histogram: BTreeMap<String, u64> = entities.iter()
            .map(|e| (e.id().to_string(), 0))
            .collect();
        let abundances: BTreeMap<String, f64> = entities.iter()
            .filter_map(|e| e.abundance(&self.mixture).map(|abundance| (e.id().to_string(), abundance)))
            .collect();

        let mut stats = FoldChangeStats::default();
        let mut differential = ConfusionCounter::default();
        let mut true_negatives: u64 = 0;
        let mut points: Vec<ExpressionPoint> = vec![];
        for parsed in records {
            stats.seen += 1;
            let record = match parsed {
                ParsedRecord::Record(r) => r,
                ParsedRecord::Malformed { reason } => {
                    debug!("Skipping malformed fold change record: {reason}");
                    stats.malformed += 1;
                    continue;
                }
            };

            let chrom = record.chrom();
            let locus = record.locus();
            if self.reference.chrom(chrom).is_none() {
                trace!("Out of region {chrom}:{locus}");
                stats.out_of_region += 1;
                continue;
            }
            // division by zero upstream shows up as inf or NaN
            if !record.log_fold().is_finite() {
                stats.unmeasured += 1;
                continue;
            }

            let Some(entity) = find_at_level(self.reference, self.config.level, chrom, &locus, self.config.rule) else {
                trace!("Unmatched fold change at {chrom}:{locus}");
                confusion.add_false_positive();
                continue;
            };

            let expected = expected_log_fold(entity.abundance(&self.mixture), entity.abundance(&self.comparison));
            points.push(ExpressionPoint {
                entity_id: entity.id().to_string(),
                chrom: chrom.to_string(),
                locus,
                expected: expected.unwrap_or(f64::NAN),
                measured: record.log_fold()
            });

            let count = histogram.entry(entity.id().to_string()).or_default();
            *count += 1;
            if *count > 1 {
                continue;
            }
            confusion.add_true_positive();

            match (expected, record.q_value()) {
                (None, _) => stats.no_expected += 1,
                (Some(_e), None) => stats.untested += 1,
                (Some(e), Some(q)) => {
                    let truly_differential = e.abs() > self.config.fold_cutoff;
                    let called = q <= self.config.q_cutoff;
                    if truly_differential {
                        differential.add_reference_total(1);
                    }
                    match (truly_differential, called) {
                        (true, true) => differential.add_true_positive(),
                        (false, true) => differential.add_false_positive(),
                        (false, false) => true_negatives += 1,
                        (true, false) => trace!("Missed differential call for {}", entity.id())
                    };
                }
            };
        }
        confusion.check()?;
        differential.check()?;

        if points.is_empty() {
            warn!("No fold change records matched a sequin, {} records were seen", stats.seen);
        }

        let missing: Vec<String> = entities.iter()
            .filter(|e| histogram.get(e.id()).copied().unwrap_or(0) == 0)
            .map(|e| e.id().to_string())
            .collect();
        let sensitivity = estimate_limit_of_detection(&histogram, &abundances);

        Ok(FoldChangeClassification {
            mixture: self.mixture.clone(),
            comparison: self.comparison.clone(),
            level: self.config.level,
            confusion,
            differential,
            true_negatives,
            sensitivity,
            stats,
            points,
            missing,
            histogram
        })
    }
}

/// What happened to the records
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FoldChangeStats {
    pub seen: u64,
    pub malformed: u64,
    /// Records off the synthetic chromosomes
    pub out_of_region: u64,
    /// Records with a non-finite log fold
    pub unmeasured: u64,
    /// First matches without a q-value
    pub untested: u64,
    /// First matches to an entity missing from either mixture
    pub no_expected: u64
}

/// The full outcome of a fold change run
#[derive(Clone, Debug, Serialize)]
pub struct FoldChangeClassification {
    mixture: String,
    comparison: String,
    level: ExpressionLevel,
    /// tp = distinct entities measured, fp = unmatched records
    confusion: ConfusionCounter,
    /// tp = correct differential calls, fp = calls on entities with no expected change,
    /// nr = truly differential entities that were tested
    differential: ConfusionCounter,
    /// tested entities correctly left uncalled
    true_negatives: u64,
    sensitivity: SensitivityResult,
    stats: FoldChangeStats,
    /// expected is the mixture log2 fold, measured is the reported one
    #[serde(skip)]
    points: Vec<ExpressionPoint>,
    missing: Vec<String>,
    histogram: BTreeMap<String, u64>
}

impl FoldChangeClassification {
    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn comparison(&self) -> &str {
        &self.comparison
    }

    pub fn level(&self) -> ExpressionLevel {
        self.level
    }

    pub fn confusion(&self) -> &ConfusionCounter {
        &self.confusion
    }

    pub fn differential(&self) -> &ConfusionCounter {
        &self.differential
    }

    pub fn true_negatives(&self) -> u64 {
        self.true_negatives
    }

    pub fn sensitivity(&self) -> &SensitivityResult {
        &self.sensitivity
    }

    pub fn stats(&self) -> &FoldChangeStats {
        &self.stats
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
    use crate::data_types::locus::Locus;
    use crate::reference::builder::{MixtureRecord, ReferenceBuilder, TranscriptAnnotation};

    fn locus(start: u64, end: u64) -> Locus {
        Locus::new(start, end).unwrap()
    }

    fn exon(isoform_id: &str, gene_id: &str, start: u64, end: u64) -> TranscriptAnnotation {
        TranscriptAnnotation {
            isoform_id: isoform_id.to_string(),
            gene_id: gene_id.to_string(),
            chrom: "chrT".to_string(),
            locus: locus(start, end)
        }
    }

    fn mix(id: &str, mixture: &str, abundance: f64) -> MixtureRecord {
        MixtureRecord { id: id.to_string(), mixture: mixture.to_string(), abundance }
    }

    fn build_reference() -> ReferenceModel {
        let mut builder = ReferenceBuilder::new();
        builder.extend_transcript_annotations([
            exon("R1_1", "R1", 100, 200),
            exon("R1_1", "R1", 301, 400),
            exon("R1_2", "R1", 100, 200),
            exon("R1_2", "R1", 301, 500),
            exon("R2_1", "R2", 1000, 1100)
        ]);
        builder.extend_mixture_records([
            mix("R1_1", "A", 8.0), mix("R1_1", "B", 4.0),
            mix("R1_2", "A", 4.0), mix("R1_2", "B", 8.0),
            mix("R2_1", "A", 0.5), mix("R2_1", "B", 0.5)
        ]);
        builder.build_transcriptome().unwrap()
    }

    fn fold(chrom: &str, start: u64, end: u64, log_fold: f64, q_value: Option<f64>) -> ParsedRecord<DetectedFold> {
        ParsedRecord::Record(DetectedFold::new(chrom.to_string(), locus(start, end), log_fold, q_value))
    }

    #[test]
    fn test_expected_log_fold() {
        assert_approx_eq!(expected_log_fold(Some(8.0), Some(4.0)).unwrap(), -1.0);
        assert_approx_eq!(expected_log_fold(Some(0.5), Some(0.5)).unwrap(), 0.0);
        assert_eq!(expected_log_fold(Some(0.0), Some(4.0)), None);
        assert_eq!(expected_log_fold(None, Some(4.0)), None);
    }

    #[test]
    fn test_isoform_folds() {
        let reference = build_reference();
        let classifier = FoldChangeClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            fold("chrT", 100, 400, -0.9, Some(0.01)),
            fold("chrT", 100, 500, 1.1, Some(0.5)),
            fold("chrT", 1000, 1100, 0.1, Some(0.01)),
            // later matches do not change the differential call
            fold("chrT", 100, 400, -1.0, Some(0.9)),
            fold("chrT", 100, 450, 2.0, Some(0.01)),
            fold("chrT", 1000, 1100, f64::NAN, None),
            fold("chr1", 1, 10, 1.0, None),
            ParsedRecord::Malformed { reason: "bad".to_string() }
        ]).unwrap();

        assert_eq!(result.mixture(), "A");
        assert_eq!(result.comparison(), "B");
        assert_eq!(result.confusion(), &ConfusionCounter::new(3, 1, 3));
        // R1_1 called, R1_2 missed, R2_1 called without an expected change
        assert_eq!(result.differential(), &ConfusionCounter::new(1, 1, 2));
        assert_eq!(result.true_negatives(), 0);
        assert_eq!(result.stats(), &FoldChangeStats {
            seen: 8, malformed: 1, out_of_region: 1, unmeasured: 1, untested: 0, no_expected: 0
        });

        assert_eq!(result.points().len(), 4);
        assert_approx_eq!(result.points()[0].expected, -1.0);
        assert_approx_eq!(result.points()[0].measured, -0.9);
        assert_approx_eq!(result.points()[1].expected, 1.0);
        assert!(result.missing().is_empty());
        assert_eq!(result.histogram()["R1_1"], 2);

        // R1_2 and R2_1 are seen once, R2_1 has the lower baseline abundance
        assert_eq!(result.sensitivity().entity_id(), Some("R2_1"));
    }

    #[test]
    fn test_gene_folds_with_cutoff() {
        let reference = build_reference();
        let config = FoldChangeClassifierConfigBuilder::default()
            .level(ExpressionLevel::Gene)
            .rule(MatchRule::Contains)
            .comparison(Some("B".to_string()))
            .fold_cutoff(0.5)
            .build().unwrap();
        let classifier = FoldChangeClassifier::new(&reference, config).unwrap();
        let result = classifier.classify([
            // R1 is 12 in both mixtures
            fold("chrT", 150, 160, 0.2, Some(0.9)),
            fold("chrT", 1050, 1060, -0.1, None)
        ]).unwrap();

        assert_eq!(result.level(), ExpressionLevel::Gene);
        assert_eq!(result.confusion(), &ConfusionCounter::new(2, 0, 2));
        assert_eq!(result.differential(), &ConfusionCounter::new(0, 0, 0));
        assert_eq!(result.true_negatives(), 1);
        assert_eq!(result.stats().untested, 1);
        assert_approx_eq!(result.points()[0].expected, 0.0);
    }

    #[test]
    fn test_comparison_mixture() {
        let reference = build_reference();
        let config = FoldChangeClassifierConfigBuilder::default()
            .comparison(Some("C".to_string()))
            .build().unwrap();
        assert!(matches!(
            FoldChangeClassifier::new(&reference, config).unwrap_err(),
            ReferenceError::UnknownMixture { .. }
        ));

        let config = FoldChangeClassifierConfigBuilder::default()
            .mixture(Some("B".to_string()))
            .build().unwrap();
        let classifier = FoldChangeClassifier::new(&reference, config).unwrap();
        assert_eq!(classifier.comparison, "A");

        let mut builder = ReferenceBuilder::new();
        builder.add_transcript_annotation(exon("R1_1", "R1", 100, 200));
        builder.add_mixture_record(mix("R1_1", "A", 1.0));
        let single = builder.build_transcriptome().unwrap();
        assert_eq!(
            FoldChangeClassifier::new(&single, Default::default()).unwrap_err(),
            ReferenceError::MissingReferenceData { what: "mixture other than A".to_string() }
        );
    }
}
