use derive_builder::Builder;
use indicatif::ParallelProgressIterator;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

use crate::data_types::classification::{Classification, MatchResult};
use crate::data_types::confusion::ConfusionError;
use crate::data_types::detected::{DetectedRecord, DetectedVariant, ParsedRecord};
use crate::data_types::locus::Located;
use crate::data_types::sequins::{VariantClass, VariantEntity};
use crate::data_types::stratified_metrics::StratifiedMetrics;
use crate::limit_of_detection::{SensitivityResult, estimate_limit_of_detection};
use crate::reference::matcher::MatchRule;
use crate::reference::model::{ReferenceError, ReferenceModel};
use crate::reference::regions::SequinRegions;
use crate::util::progress_bar::get_progress_style;

/// Result of scoring one detected variant, or one missed reference variant
pub type VariantMatch<'a> = MatchResult<'a, DetectedVariant, VariantEntity>;

/// Controls which records get scored and how
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct VariantClassifierConfig {
    /// if True, only records with a PASS filter are scored
    passed_only: bool,
    /// boundary tolerance in bp for the positional match
    fuzzy: u64,
    /// the class of sequins under evaluation, records matching other classes are ignored
    evaluated_class: VariantClass,
    /// if set, records with a p-value above this threshold are filtered
    significance: Option<f64>,
    /// mixture used for the expected abundances, the first one if None
    mixture: Option<String>
}

impl Default for VariantClassifierConfig {
    fn default() -> Self {
        // these settings are set to reasonable defaults for unit tests
        // main.rs will set each of them manually based on user input
        Self {
            passed_only: false,
            fuzzy: 0,
            evaluated_class: VariantClass::Germline,
            significance: None,
            mixture: None
        }
    }
}

/// Tallies of what happened to every record, scored or not
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MappingStats {
    /// Every record handed to the classifier
    pub seen: u64,
    /// Records that could not be parsed
    pub malformed: u64,
    /// Records removed by the filter or significance settings
    pub filtered: u64,
    /// Records outside every sequin region
    pub out_of_region: u64,
    /// Records that belong to a sequin of a different class
    pub other_class: u64,
    /// Repeated detections of an already matched sequin
    pub duplicates: u64,
    /// Records that became a TP or FP
    pub classified: u64
}

impl AddAssign for MappingStats {
    fn add_assign(&mut self, rhs: Self) {
        self.seen += rhs.seen;
        self.malformed += rhs.malformed;
        self.filtered += rhs.filtered;
        self.out_of_region += rhs.out_of_region;
        self.other_class += rhs.other_class;
        self.duplicates += rhs.duplicates;
        self.classified += rhs.classified;
    }
}

/// Scores detected variants against the variant sequins of one class
#[derive(Clone, Debug)]
pub struct VariantClassifier<'a> {
    reference: &'a ReferenceModel,
    regions: &'a SequinRegions,
    config: VariantClassifierConfig,
    /// resolved from the config
    mixture: String
}

impl<'a> VariantClassifier<'a> {
    /// Constructor
    /// # Arguments
    /// * `reference` - the validated variant reference
    /// * `regions` - the evaluable territory
    /// * `config` - scoring settings
    /// # Errors
    /// * if the configured mixture is not in the reference
    pub fn new(reference: &'a ReferenceModel, regions: &'a SequinRegions, config: VariantClassifierConfig) -> Result<Self, ReferenceError> {
        let mixture = reference.resolve_mixture(config.mixture.as_deref())?;
        Ok(Self {
            reference,
            regions,
            config,
            mixture
        })
    }

    /// Starts a run over every chromosome in the reference
    pub fn start(&self) -> VariantRun<'a> {
        let entities: Vec<&'a VariantEntity> = self.reference.chromosomes()
            .flat_map(|chrom| self.reference.variants_in_class(chrom, self.config.evaluated_class))
            .collect();
        self.build_run(None, entities)
    }

    /// Starts a run restricted to one chromosome; records elsewhere count as out-of-region
    pub fn start_chrom(&self, chrom: &str) -> VariantRun<'a> {
        let entities = self.reference.variants_in_class(chrom, self.config.evaluated_class);
        self.build_run(Some(chrom.to_string()), entities)
    }

    fn build_run(&self, scope: Option<String>, entities: Vec<&'a VariantEntity>) -> VariantRun<'a> {
        let histogram: BTreeMap<String, u64> = entities.iter()
            .map(|e| (e.id().to_string(), 0))
            .collect();
        let abundances: BTreeMap<String, f64> = entities.iter()
            .filter_map(|e| e.abundance(&self.mixture).map(|a| (e.id().to_string(), a)))
            .collect();

        VariantRun {
            classifier: self.clone(),
            scope,
            confusion: StratifiedMetrics::from_reference(entities.iter().copied()),
            entities,
            mapping: Default::default(),
            true_positives: vec![],
            false_positives: vec![],
            histogram,
            abundances
        }
    }

    /// Single-threaded classification of a record stream
    /// # Errors
    /// * if the counters break `tp <= nr`
    pub fn classify<I>(&self, records: I) -> Result<VariantClassification<'a>, ConfusionError>
    where
        I: IntoIterator<Item = ParsedRecord<DetectedVariant>>
    {
        let mut run = self.start();
        for parsed in records {
            run.observe(parsed);
        }
        run.finish()
    }

    /// Classifies each chromosome independently on the rayon pool, then merges the partial results.
    /// The output is identical to `classify` on the same records.
    /// # Errors
    /// * if the counters break `tp <= nr`
    pub fn classify_parallel(&self, records: Vec<ParsedRecord<DetectedVariant>>) -> Result<VariantClassification<'a>, ConfusionError> {
        // every reference chromosome gets a worker so its misses are reported even without records
        let mut by_chrom: BTreeMap<String, Vec<ParsedRecord<DetectedVariant>>> = self.reference.chromosomes()
            .map(|chrom| (chrom.to_string(), vec![]))
            .collect();
        let mut unplaced = self.build_run(None, vec![]);
        for parsed in records.into_iter() {
            let opt_chrom = match &parsed {
                ParsedRecord::Record(r) => Some(r.chrom().to_string()),
                ParsedRecord::Malformed { .. } => None
            };
            match opt_chrom {
                Some(chrom) => by_chrom.entry(chrom).or_default().push(parsed),
                None => unplaced.observe(parsed)
            }
        }

        let work: Vec<(String, Vec<ParsedRecord<DetectedVariant>>)> = by_chrom.into_iter().collect();
        let partials: Vec<VariantRun<'a>> = work.into_par_iter()
            .map(|(chrom, chrom_records)| {
                debug!("Classifying {} records on {chrom}...", chrom_records.len());
                let mut run = self.start_chrom(&chrom);
                for parsed in chrom_records.into_iter() {
                    run.observe(parsed);
                }
                run
            })
            .progress_with_style(get_progress_style())
            .collect();

        for partial in partials.into_iter() {
            unplaced.merge(partial);
        }
        unplaced.finish()
    }

    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn config(&self) -> &VariantClassifierConfig {
        &self.config
    }
}

/// In-progress classification, fed one record at a time
#[derive(Debug)]
pub struct VariantRun<'a> {
    classifier: VariantClassifier<'a>,
    /// chromosome this run is restricted to, if any
    scope: Option<String>,
    /// the evaluated entities in scope, in reference order
    entities: Vec<&'a VariantEntity>,
    confusion: StratifiedMetrics,
    mapping: MappingStats,
    true_positives: Vec<VariantMatch<'a>>,
    false_positives: Vec<VariantMatch<'a>>,
    /// entity id to detection count, seeded with 0
    histogram: BTreeMap<String, u64>,
    /// entity id to expected abundance in the evaluated mixture
    abundances: BTreeMap<String, f64>
}

impl<'a> VariantRun<'a> {
    /// Scores a single record; nothing here is fatal, skipped records are tallied in the mapping stats
    pub fn observe(&mut self, parsed: ParsedRecord<DetectedVariant>) {
        self.mapping.seen += 1;
        let record = match parsed {
            ParsedRecord::Record(r) => r,
            ParsedRecord::Malformed { reason } => {
                debug!("Skipping malformed record: {reason}");
                self.mapping.malformed += 1;
                return;
            }
        };

        let config = &self.classifier.config;
        if config.passed_only && !record.filter_passed() {
            trace!("Filtered {}:{}", record.chrom(), record.locus());
            self.mapping.filtered += 1;
            return;
        }
        if let (Some(threshold), Some(p_value)) = (config.significance, record.p_value()) {
            if p_value > threshold {
                trace!("Filtered {}:{} with p-value {p_value}", record.chrom(), record.locus());
                self.mapping.filtered += 1;
                return;
            }
        }

        let locus = record.locus();
        let in_scope = self.scope.as_deref().is_none_or(|s| s == record.chrom());
        if !in_scope || !self.classifier.regions.contains(record.chrom(), &locus) {
            trace!("Out of region {}:{locus}", record.chrom());
            self.mapping.out_of_region += 1;
            return;
        }

        let reference = self.classifier.reference;
        let fuzzy = config.fuzzy;
        let evaluated_class = config.evaluated_class;
        let position_match = reference.find_variant(record.chrom(), &locus, MatchRule::Contains, fuzzy);
        let alleles_matched = match position_match {
            Some(entity) => (entity.ref_allele() == record.ref_allele(), entity.alt_allele() == record.alt_allele()),
            None => (false, false)
        };

        match position_match {
            Some(entity) if alleles_matched == (true, true) => {
                if entity.class() != evaluated_class {
                    trace!("Ignoring {}:{locus}, matches {} sequin {}", record.chrom(), entity.class(), entity.id());
                    self.mapping.other_class += 1;
                    return;
                }

                let count = self.histogram.entry(entity.id().to_string()).or_default();
                *count += 1;
                if *count > 1 {
                    trace!("Duplicate detection of {}", entity.id());
                    self.mapping.duplicates += 1;
                    return;
                }

                self.confusion.add_true_positive(entity);
                self.mapping.classified += 1;
                self.true_positives.push(MatchResult::detected(record, Some(entity), alleles_matched, Classification::TruePositive));
            },
            _ => {
                if reference.find_variant_not_in_class(record.chrom(), &locus, MatchRule::Contains, fuzzy, evaluated_class).is_some() {
                    trace!("Ignoring {}:{locus}, inside a sequin of another class", record.chrom());
                    self.mapping.other_class += 1;
                    return;
                }

                self.confusion.add_false_positive(&record);
                self.mapping.classified += 1;
                self.false_positives.push(MatchResult::detected(record, position_match, alleles_matched, Classification::FalsePositive));
            }
        }
    }

    /// Folds another run into this one; runs must cover disjoint sets of entities
    pub fn merge(&mut self, other: VariantRun<'a>) {
        self.entities.extend(other.entities);
        self.confusion += other.confusion;
        self.mapping += other.mapping;
        self.true_positives.extend(other.true_positives);
        self.false_positives.extend(other.false_positives);
        self.histogram.extend(other.histogram);
        self.abundances.extend(other.abundances);
    }

    /// Collects the misses and the sensitivity floor
    /// # Errors
    /// * if any bucket has more true positives than reference entities
    pub fn finish(self) -> Result<VariantClassification<'a>, ConfusionError> {
        self.confusion.check()?;

        let false_negatives: Vec<VariantMatch<'a>> = self.entities.iter()
            .filter(|e| self.histogram.get(e.id()).copied().unwrap_or(0) == 0)
            .map(|&e| MatchResult::missed(e))
            .collect();
        let sensitivity = estimate_limit_of_detection(&self.histogram, &self.abundances);

        if self.mapping.classified == 0 {
            warn!("No detected records could be classified, {} records were seen", self.mapping.seen);
        } else {
            let skipped = self.mapping.malformed + self.mapping.filtered + self.mapping.out_of_region;
            if skipped > 0 {
                warn!(
                    "Skipped {skipped} records: {} malformed, {} filtered, {} out of region",
                    self.mapping.malformed, self.mapping.filtered, self.mapping.out_of_region
                );
            }
        }

        Ok(VariantClassification {
            mixture: self.classifier.mixture,
            evaluated_class: self.classifier.config.evaluated_class,
            confusion: self.confusion,
            sensitivity,
            mapping: self.mapping,
            true_positives: self.true_positives,
            false_positives: self.false_positives,
            false_negatives,
            histogram: self.histogram
        })
    }
}

/// The full outcome of a variant run
#[derive(Clone, Debug, Serialize)]
pub struct VariantClassification<'a> {
    /// the mixture the abundances came from
    mixture: String,
    evaluated_class: VariantClass,
    /// stratified TP/FP/FN counts
    confusion: StratifiedMetrics,
    /// the detection floor
    sensitivity: SensitivityResult,
    /// what happened to the records that were not scored
    mapping: MappingStats,
    #[serde(skip)]
    true_positives: Vec<VariantMatch<'a>>,
    #[serde(skip)]
    false_positives: Vec<VariantMatch<'a>>,
    #[serde(skip)]
    false_negatives: Vec<VariantMatch<'a>>,
    /// entity id to detection count
    histogram: BTreeMap<String, u64>
}

impl<'a> VariantClassification<'a> {
    /// Every scored entity in reference order, paired with its TP record if it was detected
    pub fn entity_outcomes(&self) -> Vec<(&'a VariantEntity, Option<&DetectedVariant>)> {
        let mut ret: Vec<(&'a VariantEntity, Option<&DetectedVariant>)> = self.true_positives.iter()
            .filter_map(|m| m.entity().map(|e| (e, m.record())))
            .chain(self.false_negatives.iter().filter_map(|m| m.entity().map(|e| (e, None))))
            .collect();
        ret.sort_by(|a, b| (a.0.chrom(), a.0.locus(), a.0.id()).cmp(&(b.0.chrom(), b.0.locus(), b.0.id())));
        ret
    }

    // getters
    pub fn mixture(&self) -> &str {
        &self.mixture
    }

    pub fn evaluated_class(&self) -> VariantClass {
        self.evaluated_class
    }

    pub fn confusion(&self) -> &StratifiedMetrics {
        &self.confusion
    }

    pub fn sensitivity(&self) -> &SensitivityResult {
        &self.sensitivity
    }

    pub fn mapping(&self) -> &MappingStats {
        &self.mapping
    }

    pub fn true_positives(&self) -> &[VariantMatch<'a>] {
        &self.true_positives
    }

    pub fn false_positives(&self) -> &[VariantMatch<'a>] {
        &self.false_positives
    }

    pub fn false_negatives(&self) -> &[VariantMatch<'a>] {
        &self.false_negatives
    }

    pub fn histogram(&self) -> &BTreeMap<String, u64> {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::confusion::ConfusionCounter;
    use crate::data_types::locus::Locus;
    use crate::data_types::sequins::{Context, Genotype, MutationKind};
    use crate::reference::builder::{MixtureRecord, ReferenceBuilder, VariantAnnotation};

    fn variant(id: &str, position: u64, ref_allele: &str, alt_allele: &str, class: VariantClass) -> VariantAnnotation {
        VariantAnnotation {
            id: id.to_string(),
            chrom: "chrQ".to_string(),
            position,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
            genotype: Genotype::Heterozygous,
            context: Some(Context::Common),
            class
        }
    }

    fn mix(id: &str, abundance: f64) -> MixtureRecord {
        MixtureRecord { id: id.to_string(), mixture: "A".to_string(), abundance }
    }

    /// V1 500 A>T, V2 800 C>G, S1 1200 G>A (somatic)
    fn build_reference() -> ReferenceModel {
        let mut builder = ReferenceBuilder::new();
        builder.extend_variant_annotations([
            variant("V1", 500, "A", "T", VariantClass::Germline),
            variant("V2", 800, "C", "G", VariantClass::Germline),
            variant("S1", 1200, "G", "A", VariantClass::Somatic)
        ]);
        builder.extend_mixture_records([mix("V1", 0.5), mix("V2", 0.25), mix("S1", 0.1)]);
        builder.build_variants().unwrap()
    }

    fn build_regions(reference: &ReferenceModel) -> SequinRegions {
        SequinRegions::from_reference(reference, 50).unwrap()
    }

    fn call(position: u64, ref_allele: &str, alt_allele: &str) -> ParsedRecord<DetectedVariant> {
        ParsedRecord::Record(
            DetectedVariant::new("chrQ".to_string(), position, ref_allele.to_string(), alt_allele.to_string()).unwrap()
                .with_genotype(Some(Genotype::Heterozygous))
        )
    }

    #[test]
    fn test_simple_true_positive() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();
        assert_eq!(classifier.mixture(), "A");

        let result = classifier.classify([call(500, "A", "T")]).unwrap();
        assert_eq!(result.true_positives().len(), 1);
        assert_eq!(result.true_positives()[0].entity().unwrap().id(), "V1");
        assert!(result.true_positives()[0].is_full_match());
        assert_eq!(result.confusion().by_mutation()[&MutationKind::Snp].tp(), 1);
        assert_eq!(result.confusion().overall().nr(), 2);
        assert_eq!(result.false_negatives().len(), 1);
        assert_eq!(result.sensitivity().entity_id(), Some("V1"));
        assert_eq!(result.mapping().classified, 1);
    }

    #[test]
    fn test_allele_mismatch_is_false_positive() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();

        let result = classifier.classify([call(500, "A", "G")]).unwrap();
        assert!(result.true_positives().is_empty());
        assert_eq!(result.false_positives().len(), 1);
        let fp = &result.false_positives()[0];
        assert!(fp.locus_matched());
        assert!(fp.ref_allele_matched());
        assert!(!fp.alt_allele_matched());
        assert_eq!(fp.classification(), Classification::FalsePositive);

        let missed: Vec<&str> = result.false_negatives().iter().map(|m| m.entity().unwrap().id()).collect();
        assert_eq!(missed, vec!["V1", "V2"]);
        assert_eq!(result.confusion().overall().fp(), 1);
        assert_eq!(result.confusion().overall().false_negatives().unwrap(), 2);
    }

    #[test]
    fn test_genotype_axis_counts_uncalled_false_positive() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();

        let uncalled = DetectedVariant::new("chrQ".to_string(), 520, "C".to_string(), "G".to_string()).unwrap();
        let result = classifier.classify([ParsedRecord::Record(uncalled)]).unwrap();
        let confusion = result.confusion();
        let total = |counters: Vec<&ConfusionCounter>| -> u64 {
            counters.iter().map(|c| c.tp() + c.fp() + c.false_negatives().unwrap()).sum()
        };
        let by_mutation = total(confusion.by_mutation().values().collect());
        let by_genotype = total(confusion.by_genotype().values().chain([confusion.unknown_genotype()]).collect());
        assert_eq!(total(vec![confusion.overall()]), 3);
        assert_eq!(by_mutation, 3);
        assert_eq!(by_genotype, 3);
        assert_eq!(confusion.unknown_genotype().fp(), 1);
    }

    #[test]
    fn test_untouched_reference_is_false_negative() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();

        let result = classifier.classify([call(500, "A", "T")]).unwrap();
        let missed: Vec<&str> = result.false_negatives().iter().map(|m| m.entity().unwrap().id()).collect();
        assert_eq!(missed, vec!["V2"]);
        assert!(result.false_negatives()[0].record().is_none());
        assert_eq!(result.false_negatives()[0].classification(), Classification::FalseNegative);
    }

    #[test]
    fn test_other_class_and_regions() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();

        let result = classifier.classify([
            // somatic sequin, exact and inexact
            call(1200, "G", "A"),
            call(1200, "G", "C"),
            // far from everything
            call(5000, "A", "T"),
            // inside the V2 flank, matches nothing
            call(820, "T", "TA"),
            ParsedRecord::Malformed { reason: "symbolic ALT".to_string() }
        ]).unwrap();
        let mapping = result.mapping();
        assert_eq!(mapping.seen, 5);
        assert_eq!(mapping.other_class, 2);
        assert_eq!(mapping.out_of_region, 1);
        assert_eq!(mapping.malformed, 1);
        assert_eq!(mapping.classified, 1);
        assert_eq!(result.confusion().by_mutation()[&MutationKind::Insertion].fp(), 1);
    }

    #[test]
    fn test_somatic_evaluation() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let config = VariantClassifierConfigBuilder::default()
            .evaluated_class(VariantClass::Somatic)
            .build().unwrap();
        let classifier = VariantClassifier::new(&reference, &regions, config).unwrap();

        let result = classifier.classify([call(500, "A", "T"), call(1200, "G", "A")]).unwrap();
        assert_eq!(result.true_positives().len(), 1);
        assert_eq!(result.confusion().overall().nr(), 1);
        assert_eq!(result.mapping().other_class, 1);
        assert!(result.false_negatives().is_empty());
    }

    #[test]
    fn test_duplicates_and_filters() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let config = VariantClassifierConfigBuilder::default()
            .passed_only(true)
            .significance(Some(0.05))
            .build().unwrap();
        let classifier = VariantClassifier::new(&reference, &regions, config).unwrap();

        let failed = DetectedVariant::new("chrQ".to_string(), 800, "C".to_string(), "G".to_string()).unwrap()
            .with_filter_passed(false);
        let insignificant = DetectedVariant::new("chrQ".to_string(), 800, "C".to_string(), "G".to_string()).unwrap()
            .with_p_value(Some(0.2));
        let result = classifier.classify([
            call(500, "A", "T"),
            call(500, "A", "T"),
            ParsedRecord::Record(failed),
            ParsedRecord::Record(insignificant)
        ]).unwrap();

        // a second detection never adds a second TP
        assert_eq!(result.confusion().overall().tp(), 1);
        assert_eq!(result.histogram()["V1"], 2);
        assert_eq!(result.histogram()["V2"], 0);
        assert_eq!(result.mapping().duplicates, 1);
        assert_eq!(result.mapping().filtered, 2);
        assert!(result.confusion().check().is_ok());
    }

    #[test]
    fn test_fuzzy_match() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let strict = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();
        assert_eq!(strict.classify([call(502, "A", "T")]).unwrap().confusion().overall().tp(), 0);

        let config = VariantClassifierConfigBuilder::default().fuzzy(2).build().unwrap();
        let fuzzy = VariantClassifier::new(&reference, &regions, config).unwrap();
        assert_eq!(fuzzy.classify([call(502, "A", "T")]).unwrap().confusion().overall().tp(), 1);
    }

    #[test]
    fn test_empty_result() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();

        let result = classifier.classify(std::iter::empty()).unwrap();
        assert_eq!(result.mapping().classified, 0);
        assert_eq!(result.false_negatives().len(), 2);
        assert!(!result.sensitivity().is_detected());
        assert_eq!(result.confusion().overall().sensitivity().unwrap(), Some(0.0));
    }

    #[test]
    fn test_unknown_mixture() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let config = VariantClassifierConfigBuilder::default()
            .mixture(Some("Z".to_string()))
            .build().unwrap();
        assert!(VariantClassifier::new(&reference, &regions, config).is_err());
    }

    #[test]
    fn test_parallel_matches_serial() {
        let reference = build_reference();
        let regions = build_regions(&reference);
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();
        let records = vec![
            call(500, "A", "T"),
            call(800, "C", "A"),
            call(1200, "G", "A"),
            ParsedRecord::Record(DetectedVariant::new("chrX".to_string(), 10, "A".to_string(), "T".to_string()).unwrap()),
            ParsedRecord::Malformed { reason: "bad".to_string() }
        ];

        let serial = classifier.classify(records.clone()).unwrap();
        let parallel = classifier.classify_parallel(records).unwrap();
        assert_eq!(serial.confusion(), parallel.confusion());
        assert_eq!(serial.mapping(), parallel.mapping());
        assert_eq!(serial.histogram(), parallel.histogram());
        assert_eq!(serial.sensitivity(), parallel.sensitivity());
        assert_eq!(serial.false_negatives().len(), parallel.false_negatives().len());

        let outcomes = parallel.entity_outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0.locus(), Locus::new(500, 500).unwrap());
        assert!(outcomes[0].1.is_some());
        assert!(outcomes[1].1.is_none());
    }
}
