use derive_builder::Builder;
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::confusion::{ConfusionCounter, ConfusionError};
use crate::data_types::detected::{DetectedExpression, DetectedRecord, ParsedRecord};
use crate::data_types::locus::{Located, Locus};
use crate::data_types::sequins::{GeneEntity, TranscriptEntity};
use crate::limit_of_detection::{SensitivityResult, estimate_limit_of_detection};
use crate::reference::matcher::MatchRule;
use crate::reference::model::{ReferenceError, ReferenceModel};

/// Which transcriptome entities expression records are matched to
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize,
    clap::ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ExpressionLevel {
    #[default]
    #[strum(serialize = "isoform")]
    #[clap(name = "isoform")]
    Isoform,
    #[strum(serialize = "gene")]
    #[clap(name = "gene")]
    Gene
}

/// Controls the expression scoring
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct ExpressionClassifierConfig {
    /// match to isoforms or genes
    level: ExpressionLevel,
    /// locus rule for the match
    rule: MatchRule,
    /// mixture used for the expected abundances, the first one if None
    mixture: Option<String>
}

impl Default for ExpressionClassifierConfig {
    fn default() -> Self {
        Self {
            level: ExpressionLevel::Isoform,
            rule: MatchRule::Exact,
            mixture: None
        }
    }
}

/// One measured abundance paired with what the mixture says it should be
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpressionPoint {
    pub entity_id: String,
    pub chrom: String,
    pub locus: Locus,
    pub expected: f64,
    pub measured: f64
}

/// A transcriptome entity at one expression level
#[derive(Clone, Copy, Debug)]
pub(crate) enum LeveledEntity<'a> {
    Isoform(&'a TranscriptEntity),
    Gene(&'a GeneEntity)
}

impl<'a> LeveledEntity<'a> {
    pub(crate) fn id(&self) -> &'a str {
        match self {
            LeveledEntity::Isoform(t) => t.id(),
            LeveledEntity::Gene(g) => g.id()
        }
    }

    pub(crate) fn abundance(&self, mixture: &str) -> Option<f64> {
        match self {
            LeveledEntity::Isoform(t) => t.abundance(mixture),
            LeveledEntity::Gene(g) => g.abundance(mixture)
        }
    }
}

/// All entities of a transcriptome reference at `level`, in chromosome then locus order
pub(crate) fn level_entities(reference: &ReferenceModel, level: ExpressionLevel) -> Vec<LeveledEntity<'_>> {
    let mut ret = vec![];
    for chrom in reference.chromosomes() {
        let Some(data) = reference.chrom(chrom) else {
            continue;
        };
        match level {
            ExpressionLevel::Isoform => ret.extend(data.transcripts().iter().map(LeveledEntity::Isoform)),
            ExpressionLevel::Gene => ret.extend(data.genes().iter().map(LeveledEntity::Gene))
        };
    }
    ret
}

/// Best entity at `level` for a measured locus
pub(crate) fn find_at_level<'a>(
    reference: &'a ReferenceModel, level: ExpressionLevel,
    chrom: &str, locus: &Locus, rule: MatchRule
) -> Option<LeveledEntity<'a>> {
    match level {
        ExpressionLevel::Isoform => reference.find_transcript(chrom, locus, rule).map(LeveledEntity::Isoform),
        ExpressionLevel::Gene => reference.find_gene(chrom, locus, rule).map(LeveledEntity::Gene)
    }
}

/// Scores measured abundances against the isoforms or genes of a transcriptome reference
#[derive(Clone, Debug)]
pub struct ExpressionClassifier<'a> {
    reference: &'a ReferenceModel,
    config: ExpressionClassifierConfig,
    mixture: String
}

impl<'a> ExpressionClassifier<'a> {
    /// Constructor
    /// # Errors
    /// * if the configured mixture is not in the reference
    pub fn new(reference: &'a ReferenceModel, config: ExpressionClassifierConfig) -> Result<Self, ReferenceError> {
        let mixture = reference.resolve_mixture(config.mixture.as_deref())?;
        Ok(Self { reference, config, mixture })
    }

    /// All entities at the configured level as (id, expected abundance), in reference order
    fn entities(&self) -> Vec<(&'a str, Option<f64>)> {
        level_entities(self.reference, self.config.level).into_iter()
            .map(|e| (e.id(), e.abundance(&self.mixture)))
            .collect()
    }

    /// Best entity for a measured locus as (id, expected abundance)
    fn find(&self, chrom: &str, locus: &Locus) -> Option<(&'a str, Option<f64>)> {
        find_at_level(self.reference, self.config.level, chrom, locus, self.config.rule)
            .map(|e| (e.id(), e.abundance(&self.mixture)))
    }

    /// Scores every record in a single pass
    /// # Errors
    /// * if the counter breaks `tp <= nr`, which indicates a bug
    pub fn classify<I>(&self, records: I) -> Result<ExpressionClassification, ConfusionError>
    where
        I: IntoIterator<Item = ParsedRecord<DetectedExpression>>
    {
        let entities = self.entities();
        let mut confusion = ConfusionCounter::default();
        confusion.add_reference_total(entities.len() as u64);
        let mut histogram: BTreeMap<String, u64> = entities.iter()
            .map(|(id, _a)| (id.to_string(), 0))
            .collect();
        let abundances: BTreeMap<String, f64> = entities.iter()
            .filter_map(|(id, a)| a.map(|abundance| (id.to_string(), abundance)))
            .collect();

        let mut stats = ExpressionStats::default();
        let mut points: Vec<ExpressionPoint> = vec![];
        for parsed in records {
            stats.seen += 1;
            let record = match parsed {
                ParsedRecord::Record(r) => r,
                ParsedRecord::Malformed { reason } => {
                    debug!("Skipping malformed expression record: {reason}");
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
            // a zero measurement is not a detection
            if record.abundance() <= 0.0 || record.abundance().is_nan() {
                stats.unexpressed += 1;
                continue;
            }

            match self.find(chrom, &locus) {
                Some((entity_id, expected)) => {
                    let count = histogram.entry(entity_id.to_string()).or_default();
                    *count += 1;
                    if *count == 1 {
                        confusion.add_true_positive();
                    }
                    points.push(ExpressionPoint {
                        entity_id: entity_id.to_string(),
                        chrom: chrom.to_string(),
                        locus,
                        expected: expected.unwrap_or(f64::NAN),
                        measured: record.abundance()
                    });
                },
                None => {
                    trace!("Unmatched expression at {chrom}:{locus}");
                    confusion.add_false_positive();
                }
            }
        }
        confusion.check()?;

        if points.is_empty() {
            warn!("No expression records matched a sequin, {} records were seen", stats.seen);
        }

        let missing: Vec<String> = entities.iter()
            .filter(|(id, _a)| histogram.get(*id).copied().unwrap_or(0) == 0)
            .map(|(id, _a)| id.to_string())
            .collect();
        let sensitivity = estimate_limit_of_detection(&histogram, &abundances);

        Ok(ExpressionClassification {
            mixture: self.mixture.clone(),
            level: self.config.level,
            confusion,
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
pub struct ExpressionStats {
    pub seen: u64,
    pub malformed: u64,
    /// Records off the synthetic chromosomes
    pub out_of_region: u64,
    /// Records with a measured abundance of 0
    pub unexpressed: u64
}

/// The full outcome of an expression run
#[derive(Clone, Debug, Serialize)]
pub struct ExpressionClassification {
    mixture: String,
    level: ExpressionLevel,
    /// tp = distinct entities detected, fp = unmatched records
    confusion: ConfusionCounter,
    sensitivity: SensitivityResult,
    stats: ExpressionStats,
    #[serde(skip)]
    points: Vec<ExpressionPoint>,
    /// entity ids never measured
    missing: Vec<String>,
    histogram: BTreeMap<String, u64>
}

impl ExpressionClassification {
    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn level(&self) -> ExpressionLevel {
        self.level
    }

    pub fn confusion(&self) -> &ConfusionCounter {
        &self.confusion
    }

    pub fn sensitivity(&self) -> &SensitivityResult {
        &self.sensitivity
    }

    pub fn stats(&self) -> &ExpressionStats {
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

    fn mix(id: &str, abundance: f64) -> MixtureRecord {
        MixtureRecord { id: id.to_string(), mixture: "A".to_string(), abundance }
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
        builder.extend_mixture_records([mix("R1_1", 8.0), mix("R1_2", 4.0), mix("R2_1", 0.5)]);
        builder.build_transcriptome().unwrap()
    }

    fn measured(chrom: &str, start: u64, end: u64, abundance: f64) -> ParsedRecord<DetectedExpression> {
        ParsedRecord::Record(DetectedExpression::new(chrom.to_string(), locus(start, end), abundance))
    }

    #[test]
    fn test_isoform_exact() {
        let reference = build_reference();
        let classifier = ExpressionClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            measured("chrT", 100, 400, 7.5),
            measured("chrT", 100, 400, 0.5),
            measured("chrT", 100, 450, 1.0),
            measured("chrT", 1000, 1100, 0.0),
            measured("chr1", 1, 10, 3.0)
        ]).unwrap();

        assert_eq!(result.confusion(), &ConfusionCounter::new(1, 1, 3));
        assert_eq!(result.stats().unexpressed, 1);
        assert_eq!(result.stats().out_of_region, 1);
        assert_eq!(result.points().len(), 2);
        assert_approx_eq!(result.points()[0].expected, 8.0);
        assert_approx_eq!(result.points()[0].measured, 7.5);
        assert_eq!(result.histogram()["R1_1"], 2);
        assert_eq!(result.missing(), &["R1_2".to_string(), "R2_1".to_string()]);
        assert_eq!(result.sensitivity().entity_id(), Some("R1_1"));
    }

    #[test]
    fn test_gene_contains() {
        let reference = build_reference();
        let config = ExpressionClassifierConfigBuilder::default()
            .level(ExpressionLevel::Gene)
            .rule(MatchRule::Contains)
            .build().unwrap();
        let classifier = ExpressionClassifier::new(&reference, config).unwrap();
        let result = classifier.classify([
            measured("chrT", 150, 160, 2.0),
            measured("chrT", 1050, 1060, 1.0)
        ]).unwrap();

        assert_eq!(result.level(), ExpressionLevel::Gene);
        assert_eq!(result.confusion(), &ConfusionCounter::new(2, 0, 2));
        assert!(result.missing().is_empty());
        assert_approx_eq!(result.points()[0].expected, 12.0);

        // both genes seen once, R2 has the lower abundance
        assert_eq!(result.sensitivity().entity_id(), Some("R2"));
        assert_approx_eq!(result.sensitivity().abundance(), 0.5);
    }
}
