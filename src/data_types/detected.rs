use serde::Serialize;

use crate::data_types::locus::{Located, Locus, LocusError};
use crate::data_types::sequins::{Breakpoints, FeatureKind, Genotype, MutationKind, SequinError, Strand};

/// Common view of every detected record type
pub trait DetectedRecord: Located {
    fn chrom(&self) -> &str;
}

/// Output of a record parser: either a usable record or a description of why it could not be used
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedRecord<T> {
    Record(T),
    Malformed { reason: String }
}

/// A single called allele from a variant caller
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedVariant {
    chrom: String,
    /// Span of the reference allele
    locus: Locus,
    ref_allele: String,
    alt_allele: String,
    kind: MutationKind,
    /// True if FILTER was PASS
    filter_passed: bool,
    /// QUAL column
    quality: Option<f32>,
    /// Total read depth at the site
    depth: Option<u64>,
    /// Observed allele frequency of the ALT allele
    allele_frequency: Option<f64>,
    /// None when the sample is hom-ref or missing
    genotype: Option<Genotype>,
    /// Caller provided probability, when the caller reports one
    p_value: Option<f64>
}

impl DetectedVariant {
    /// Constructor, everything optional defaults to unknown and the filter to passed.
    /// # Arguments
    /// * `chrom` - chromosome name
    /// * `position` - 1-based position of the first reference base
    /// * `ref_allele` - reference allele
    /// * `alt_allele` - called alternate allele
    /// # Errors
    /// * if the alleles or position are invalid
    pub fn new(chrom: String, position: u64, ref_allele: String, alt_allele: String) -> Result<Self, SequinError> {
        let kind = MutationKind::from_alleles(ref_allele.as_bytes(), alt_allele.as_bytes())?;
        let locus = Locus::new(position, position + ref_allele.len() as u64 - 1)?;
        Ok(Self {
            chrom, locus,
            ref_allele, alt_allele, kind,
            filter_passed: true,
            quality: None,
            depth: None,
            allele_frequency: None,
            genotype: None,
            p_value: None
        })
    }

    // builder-style setters for the optional call details
    pub fn with_filter_passed(mut self, filter_passed: bool) -> Self {
        self.filter_passed = filter_passed;
        self
    }

    pub fn with_quality(mut self, quality: Option<f32>) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_depth(mut self, depth: Option<u64>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_allele_frequency(mut self, allele_frequency: Option<f64>) -> Self {
        self.allele_frequency = allele_frequency;
        self
    }

    pub fn with_genotype(mut self, genotype: Option<Genotype>) -> Self {
        self.genotype = genotype;
        self
    }

    pub fn with_p_value(mut self, p_value: Option<f64>) -> Self {
        self.p_value = p_value;
        self
    }

    /// 1-based position of the first reference base
    pub fn position(&self) -> u64 {
        self.locus.start()
    }

    // getters
    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn filter_passed(&self) -> bool {
        self.filter_passed
    }

    pub fn quality(&self) -> Option<f32> {
        self.quality
    }

    pub fn depth(&self) -> Option<u64> {
        self.depth
    }

    pub fn allele_frequency(&self) -> Option<f64> {
        self.allele_frequency
    }

    pub fn genotype(&self) -> Option<Genotype> {
        self.genotype
    }

    pub fn p_value(&self) -> Option<f64> {
        self.p_value
    }
}

impl Located for DetectedVariant {
    fn locus(&self) -> Locus {
        self.locus
    }
}

impl DetectedRecord for DetectedVariant {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}

/// An aligned exon block or a spliced junction, with the number of reads supporting it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectedFeature {
    chrom: String,
    locus: Locus,
    kind: FeatureKind,
    count: u64
}

impl DetectedFeature {
    pub fn new(chrom: String, locus: Locus, kind: FeatureKind, count: u64) -> Self {
        Self { chrom, locus, kind, count }
    }

    // getters
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Located for DetectedFeature {
    fn locus(&self) -> Locus {
        self.locus
    }
}

impl DetectedRecord for DetectedFeature {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}

/// A measured abundance for a genomic locus
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedExpression {
    chrom: String,
    locus: Locus,
    abundance: f64
}

impl DetectedExpression {
    pub fn new(chrom: String, locus: Locus, abundance: f64) -> Self {
        Self { chrom, locus, abundance }
    }

    pub fn abundance(&self) -> f64 {
        self.abundance
    }
}

impl Located for DetectedExpression {
    fn locus(&self) -> Locus {
        self.locus
    }
}

impl DetectedRecord for DetectedExpression {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}

/// A measured log2 fold change between two samples, with the q-value of the differential test if one was run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedFold {
    chrom: String,
    locus: Locus,
    log_fold: f64,
    q_value: Option<f64>
}

impl DetectedFold {
    pub fn new(chrom: String, locus: Locus, log_fold: f64, q_value: Option<f64>) -> Self {
        Self { chrom, locus, log_fold, q_value }
    }

    // getters
    pub fn log_fold(&self) -> f64 {
        self.log_fold
    }

    pub fn q_value(&self) -> Option<f64> {
        self.q_value
    }
}

impl Located for DetectedFold {
    fn locus(&self) -> Locus {
        self.locus
    }
}

impl DetectedRecord for DetectedFold {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}

/// A fusion call joining two breakpoints, possibly on different chromosomes.
/// The breakpoint pair is kept in ascending order, so `chrom_1` belongs to the lower one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedFusion {
    chrom_1: String,
    chrom_2: String,
    breakpoints: Breakpoints,
    reads: u64
}

/// One side of a fusion call as written by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FusionSide {
    pub chrom: String,
    pub position: u64,
    pub strand: Strand
}

impl DetectedFusion {
    /// Orders the two sides of a call, keeping each chromosome with its breakpoint.
    /// # Errors
    /// * if either position is 0
    pub fn new(side_1: FusionSide, side_2: FusionSide, reads: u64) -> Result<Self, LocusError> {
        let (lower, upper) = if side_1.position <= side_2.position {
            (side_1, side_2)
        } else {
            (side_2, side_1)
        };
        let breakpoints = Breakpoints::new(lower.position, lower.strand, upper.position, upper.strand)?;
        Ok(Self {
            chrom_1: lower.chrom,
            chrom_2: upper.chrom,
            breakpoints,
            reads
        })
    }

    /// True when both breakpoints sit on the same chromosome
    pub fn is_intra_chromosomal(&self) -> bool {
        self.chrom_1 == self.chrom_2
    }

    // getters
    pub fn chrom_1(&self) -> &str {
        &self.chrom_1
    }

    pub fn chrom_2(&self) -> &str {
        &self.chrom_2
    }

    pub fn breakpoints(&self) -> Breakpoints {
        self.breakpoints
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl Located for DetectedFusion {
    fn locus(&self) -> Locus {
        self.breakpoints.locus()
    }
}

impl DetectedRecord for DetectedFusion {
    fn chrom(&self) -> &str {
        &self.chrom_1
    }
}
