use serde::Serialize;

use crate::data_types::detected::DetectedRecord;

/// Each scored comparison ends up in one of these buckets
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::AsRefStr)]
pub enum Classification {
    #[strum(serialize = "TP")]
    TruePositive,
    #[strum(serialize = "FP")]
    FalsePositive,
    #[strum(serialize = "FN")]
    FalseNegative
}

/// The outcome of comparing one detected record against the reference.
/// False negatives have no record, only the reference entity that was missed.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult<'a, R, E> {
    /// The detected record, None for false negatives
    record: Option<R>,
    /// The entity matched by position, if any
    entity: Option<&'a E>,
    locus_matched: bool,
    ref_allele_matched: bool,
    alt_allele_matched: bool,
    classification: Classification
}

impl<'a, R: DetectedRecord, E> MatchResult<'a, R, E> {
    /// Result for a record that was compared to the reference.
    /// # Arguments
    /// * `record` - the detected record
    /// * `entity` - the entity matched by position, if any
    /// * `alleles_matched` - (REF, ALT) equality against `entity`; both true for non-variant matches
    /// * `classification` - TP or FP
    pub fn detected(record: R, entity: Option<&'a E>, alleles_matched: (bool, bool), classification: Classification) -> Self {
        Self {
            record: Some(record),
            locus_matched: entity.is_some(),
            entity,
            ref_allele_matched: alleles_matched.0,
            alt_allele_matched: alleles_matched.1,
            classification
        }
    }

    /// Result for a reference entity no record ever matched
    pub fn missed(entity: &'a E) -> Self {
        Self {
            record: None,
            entity: Some(entity),
            locus_matched: false,
            ref_allele_matched: false,
            alt_allele_matched: false,
            classification: Classification::FalseNegative
        }
    }

    /// True if position and both alleles agree with the entity
    pub fn is_full_match(&self) -> bool {
        self.locus_matched && self.ref_allele_matched && self.alt_allele_matched
    }

    // getters
    pub fn record(&self) -> Option<&R> {
        self.record.as_ref()
    }

    pub fn entity(&self) -> Option<&'a E> {
        self.entity
    }

    pub fn locus_matched(&self) -> bool {
        self.locus_matched
    }

    pub fn ref_allele_matched(&self) -> bool {
        self.ref_allele_matched
    }

    pub fn alt_allele_matched(&self) -> bool {
        self.alt_allele_matched
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }
}
