use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use strum::IntoEnumIterator;

use crate::data_types::confusion::{ConfusionCounter, ConfusionError};
use crate::data_types::detected::DetectedVariant;
use crate::data_types::sequins::{Context, Genotype, MutationKind, VariantEntity};

/// Genotype bucket label for records without a called genotype
pub const BUCKET_UNKNOWN_GENOTYPE: &str = "Unknown";

/// The independent axes a variant run is stratified along
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display)]
pub enum StratificationAxis {
    #[strum(serialize = "ALL")]
    All,
    #[strum(serialize = "MUTATION")]
    Mutation,
    #[strum(serialize = "GENOTYPE")]
    Genotype,
    #[strum(serialize = "CONTEXT")]
    Context,
    #[strum(serialize = "GC")]
    Gc,
    #[strum(serialize = "REPEAT")]
    Repeat
}

/// One confusion counter per stratification bucket, filled in a single pass
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StratifiedMetrics {
    /// Every scored record and entity
    overall: ConfusionCounter,
    /// Split by mutation kind
    by_mutation: BTreeMap<MutationKind, ConfusionCounter>,
    /// Split by genotype
    by_genotype: BTreeMap<Genotype, ConfusionCounter>,
    /// Genotype bucket for FP records without a called genotype, so the genotype axis still covers every record
    unknown_genotype: ConfusionCounter,
    /// Split by context; only entities with a context tag contribute
    by_context: BTreeMap<Context, ConfusionCounter>,
    /// All GC-tagged contexts together
    gc: ConfusionCounter,
    /// All homopolymer and repeat contexts together
    repeat: ConfusionCounter
}

impl AddAssign for StratifiedMetrics {
    // Enables += when merging per-chromosome results
    fn add_assign(&mut self, rhs: Self) {
        self.overall += rhs.overall;
        for (kind, counter) in rhs.by_mutation.into_iter() {
            *self.by_mutation.entry(kind).or_default() += counter;
        }
        for (genotype, counter) in rhs.by_genotype.into_iter() {
            *self.by_genotype.entry(genotype).or_default() += counter;
        }
        self.unknown_genotype += rhs.unknown_genotype;
        for (context, counter) in rhs.by_context.into_iter() {
            *self.by_context.entry(context).or_default() += counter;
        }
        self.gc += rhs.gc;
        self.repeat += rhs.repeat;
    }
}

impl StratifiedMetrics {
    /// Creates metrics with every mutation and genotype bucket present and the reference totals filled in.
    /// Reference totals depend only on the entities, never on what gets detected.
    /// # Arguments
    /// * `entities` - the reference entities under evaluation
    pub fn from_reference<'a, I: IntoIterator<Item = &'a VariantEntity>>(entities: I) -> Self {
        let mut ret = Self::default();
        for kind in MutationKind::iter() {
            ret.by_mutation.entry(kind).or_default();
        }
        for genotype in Genotype::iter() {
            ret.by_genotype.entry(genotype).or_default();
        }

        for entity in entities {
            ret.overall.add_reference_total(1);
            ret.by_mutation.entry(entity.kind()).or_default().add_reference_total(1);
            ret.by_genotype.entry(entity.genotype()).or_default().add_reference_total(1);
            if let Some(context) = entity.context() {
                ret.by_context.entry(context).or_default().add_reference_total(1);
                if context.is_gc() {
                    ret.gc.add_reference_total(1);
                }
                if context.is_repeat() {
                    ret.repeat.add_reference_total(1);
                }
            }
        }
        ret
    }

    /// Counts a true positive in every bucket the matched entity falls into
    pub fn add_true_positive(&mut self, entity: &VariantEntity) {
        self.overall.add_true_positive();
        self.by_mutation.entry(entity.kind()).or_default().add_true_positive();
        self.by_genotype.entry(entity.genotype()).or_default().add_true_positive();
        if let Some(context) = entity.context() {
            self.by_context.entry(context).or_default().add_true_positive();
            if context.is_gc() {
                self.gc.add_true_positive();
            }
            if context.is_repeat() {
                self.repeat.add_true_positive();
            }
        }
    }

    /// Counts a false positive; without an entity there is no context, so only the record's own axes apply.
    /// A record without a called genotype goes to the unknown genotype bucket.
    pub fn add_false_positive(&mut self, record: &DetectedVariant) {
        self.overall.add_false_positive();
        self.by_mutation.entry(record.kind()).or_default().add_false_positive();
        match record.genotype() {
            Some(genotype) => self.by_genotype.entry(genotype).or_default().add_false_positive(),
            None => self.unknown_genotype.add_false_positive()
        }
    }

    /// Verifies that no bucket has more true positives than reference entities.
    /// # Errors
    /// * the first bucket that breaks `tp <= nr`
    pub fn check(&self) -> Result<(), ConfusionError> {
        for (_axis, _bucket, counter) in self.buckets() {
            counter.check()?;
        }
        Ok(())
    }

    /// Every bucket as (axis, bucket label, counter), in a stable report order
    pub fn buckets(&self) -> Vec<(StratificationAxis, String, ConfusionCounter)> {
        let mut ret = vec![(StratificationAxis::All, "ALL".to_string(), self.overall)];
        ret.extend(self.by_mutation.iter().map(|(k, &c)| (StratificationAxis::Mutation, k.to_string(), c)));
        ret.extend(self.by_genotype.iter().map(|(g, &c)| (StratificationAxis::Genotype, g.to_string(), c)));
        ret.push((StratificationAxis::Genotype, BUCKET_UNKNOWN_GENOTYPE.to_string(), self.unknown_genotype));
        ret.extend(self.by_context.iter().map(|(x, &c)| (StratificationAxis::Context, x.to_string(), c)));
        ret.push((StratificationAxis::Gc, "GC".to_string(), self.gc));
        ret.push((StratificationAxis::Repeat, "REPEAT".to_string(), self.repeat));
        ret
    }

    /// Sum of the insertion and deletion buckets
    pub fn joint_indel(&self) -> ConfusionCounter {
        let mut ret = ConfusionCounter::default();
        for (kind, &counter) in self.by_mutation.iter() {
            if kind.is_indel() {
                ret += counter;
            }
        }
        ret
    }

    // getters
    pub fn overall(&self) -> &ConfusionCounter {
        &self.overall
    }

    pub fn by_mutation(&self) -> &BTreeMap<MutationKind, ConfusionCounter> {
        &self.by_mutation
    }

    pub fn by_genotype(&self) -> &BTreeMap<Genotype, ConfusionCounter> {
        &self.by_genotype
    }

    pub fn unknown_genotype(&self) -> &ConfusionCounter {
        &self.unknown_genotype
    }

    pub fn by_context(&self) -> &BTreeMap<Context, ConfusionCounter> {
        &self.by_context
    }

    pub fn gc(&self) -> &ConfusionCounter {
        &self.gc
    }

    pub fn repeat(&self) -> &ConfusionCounter {
        &self.repeat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::sequins::VariantClass;

    fn entity(id: &str, position: u64, ref_allele: &str, alt_allele: &str, genotype: Genotype, context: Option<Context>) -> VariantEntity {
        VariantEntity::new(
            id.to_string(), "chrQ".to_string(), position,
            ref_allele.to_string(), alt_allele.to_string(),
            genotype, context, VariantClass::Germline
        ).unwrap()
    }

    #[test]
    fn test_reference_totals() {
        let entities = [
            entity("V1", 100, "A", "T", Genotype::Homozygous, Some(Context::Common)),
            entity("V2", 200, "A", "AT", Genotype::Heterozygous, Some(Context::LowGc)),
            entity("V3", 300, "AT", "A", Genotype::Heterozygous, None)
        ];
        let metrics = StratifiedMetrics::from_reference(entities.iter());
        assert_eq!(metrics.overall().nr(), 3);
        assert_eq!(metrics.by_mutation()[&MutationKind::Snp].nr(), 1);
        assert_eq!(metrics.by_mutation()[&MutationKind::Insertion].nr(), 1);
        assert_eq!(metrics.by_genotype()[&Genotype::Heterozygous].nr(), 2);
        assert_eq!(metrics.by_context().len(), 2);
        assert_eq!(metrics.gc().nr(), 1);
        assert_eq!(metrics.repeat().nr(), 0);
        assert_eq!(metrics.joint_indel().nr(), 2);

        // empty buckets exist up front
        let empty = StratifiedMetrics::from_reference(std::iter::empty());
        assert_eq!(empty.by_mutation().len(), 3);
        assert_eq!(empty.by_genotype().len(), 2);
        assert!(empty.check().is_ok());
    }

    #[test]
    fn test_one_record_many_axes() {
        let e = entity("V1", 100, "A", "T", Genotype::Homozygous, Some(Context::LongHomopolymer));
        let mut metrics = StratifiedMetrics::from_reference([&e]);
        metrics.add_true_positive(&e);
        assert_eq!(metrics.overall().tp(), 1);
        assert_eq!(metrics.by_mutation()[&MutationKind::Snp].tp(), 1);
        assert_eq!(metrics.by_genotype()[&Genotype::Homozygous].tp(), 1);
        assert_eq!(metrics.by_context()[&Context::LongHomopolymer].tp(), 1);
        assert_eq!(metrics.repeat().tp(), 1);
        assert_eq!(metrics.gc().tp(), 0);

        // a second TP for the same single entity breaks the invariant
        metrics.add_true_positive(&e);
        assert!(metrics.check().is_err());
    }

    #[test]
    fn test_conservation() {
        let entities = [
            entity("V1", 100, "A", "T", Genotype::Homozygous, Some(Context::Common)),
            entity("V2", 200, "A", "AT", Genotype::Heterozygous, None),
            entity("V3", 300, "AT", "A", Genotype::Heterozygous, Some(Context::HighGc)),
            entity("V4", 400, "C", "G", Genotype::Heterozygous, None)
        ];
        let mut metrics = StratifiedMetrics::from_reference(entities.iter());
        metrics.add_true_positive(&entities[0]);
        metrics.add_true_positive(&entities[2]);
        let fp1 = DetectedVariant::new("chrQ".to_string(), 150, "G".to_string(), "C".to_string()).unwrap()
            .with_genotype(Some(Genotype::Heterozygous));
        let fp2 = DetectedVariant::new("chrQ".to_string(), 250, "G".to_string(), "GCC".to_string()).unwrap()
            .with_genotype(Some(Genotype::Homozygous));
        metrics.add_false_positive(&fp1);
        metrics.add_false_positive(&fp2);
        metrics.check().unwrap();

        let total = |counters: Vec<&ConfusionCounter>| -> u64 {
            counters.iter().map(|c| c.tp() + c.fp() + c.false_negatives().unwrap()).sum()
        };
        let overall = total(vec![metrics.overall()]);
        assert_eq!(overall, 2 + 2 + 2);
        assert_eq!(total(metrics.by_mutation().values().collect()), overall);
        assert_eq!(total(metrics.by_genotype().values().collect()), overall);
        assert_eq!(metrics.unknown_genotype().fp(), 0);
    }

    #[test]
    fn test_conservation_without_called_genotype() {
        let e = entity("V1", 500, "A", "T", Genotype::Heterozygous, None);
        let mut metrics = StratifiedMetrics::from_reference([&e]);
        let fp = DetectedVariant::new("chrQ".to_string(), 520, "C".to_string(), "G".to_string()).unwrap();
        assert_eq!(fp.genotype(), None);
        metrics.add_false_positive(&fp);
        metrics.check().unwrap();

        let total = |axis: StratificationAxis| -> u64 {
            metrics.buckets().iter()
                .filter(|(a, _b, _c)| *a == axis)
                .map(|(_a, _b, c)| c.tp() + c.fp() + c.false_negatives().unwrap())
                .sum()
        };
        assert_eq!(total(StratificationAxis::All), 2);
        assert_eq!(total(StratificationAxis::Mutation), 2);
        assert_eq!(total(StratificationAxis::Genotype), 2);
        assert_eq!(metrics.unknown_genotype(), &ConfusionCounter::new(0, 1, 0));
    }

    #[test]
    fn test_add_assign() {
        let e1 = entity("V1", 100, "A", "T", Genotype::Homozygous, Some(Context::Common));
        let e2 = entity("V2", 100, "A", "AT", Genotype::Heterozygous, Some(Context::VeryLowGc));
        let mut m1 = StratifiedMetrics::from_reference([&e1]);
        m1.add_true_positive(&e1);
        let mut m2 = StratifiedMetrics::from_reference([&e2]);
        m2.add_true_positive(&e2);

        m1 += m2;
        assert_eq!(m1.overall(), &ConfusionCounter::new(2, 0, 2));
        assert_eq!(m1.by_context().len(), 2);
        assert_eq!(m1.gc(), &ConfusionCounter::new(1, 0, 1));
        assert_eq!(m1.buckets().len(), 1 + 3 + 3 + 2 + 2);
    }
}
