use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::locus::{Located, Locus, LocusError};

/// The mutation kinds a sequin variant can carry
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MutationKind {
    /// REF and ALT are both length = 1
    #[strum(to_string = "SNP", serialize = "SNV")]
    Snp=0,
    /// ALT is longer than REF
    Insertion,
    /// REF is longer than ALT
    Deletion
}

impl MutationKind {
    /// Derives the mutation kind from the allele pair.
    /// # Errors
    /// * if either allele is empty
    /// * if the alleles are equal length but longer than 1 bp (MNPs are not modeled)
    pub fn from_alleles(ref_allele: &[u8], alt_allele: &[u8]) -> Result<Self, SequinError> {
        match (ref_allele.len(), alt_allele.len()) {
            (0, _) | (_, 0) => Err(SequinError::EmptyAllele),
            (1, 1) => Ok(MutationKind::Snp),
            (r, a) if r < a => Ok(MutationKind::Insertion),
            (r, a) if r > a => Ok(MutationKind::Deletion),
            (r, _) => Err(SequinError::UnsupportedAlleles { length: r })
        }
    }

    pub fn is_indel(&self) -> bool {
        matches!(self, MutationKind::Insertion | MutationKind::Deletion)
    }
}

/// Diploid genotype of a non-reference allele
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Genotype {
    /// 1/1, 2/2, etc.
    #[strum(to_string = "Homozygous", serialize = "HOM")]
    Homozygous=0,
    /// 0/1, 1/2, etc.
    #[strum(to_string = "Heterozygous", serialize = "HET")]
    Heterozygous
}

/// Sequence context tag attached to a sequin variant
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Context {
    Common=0,
    #[strum(to_string = "LowGC")]
    LowGc,
    #[strum(to_string = "HighGC")]
    HighGc,
    #[strum(to_string = "VeryLowGC")]
    VeryLowGc,
    #[strum(to_string = "VeryHighGC")]
    VeryHighGc,
    ShortHomopolymer,
    LongHomopolymer,
    ShortDinucleotideRepeat,
    LongDinucleotideRepeat,
    ShortTrinucleotideRepeat,
    LongTrinucleotideRepeat,
    #[strum(to_string = "ShortQuadRepeat", serialize = "ShortQuadNucleotideRepeat")]
    ShortQuadRepeat,
    #[strum(to_string = "LongQuadRepeat", serialize = "LongQuadNucleotideRepeat")]
    LongQuadRepeat
}

impl Context {
    /// Returns true for the GC-richness tags
    pub fn is_gc(&self) -> bool {
        matches!(self, Context::LowGc | Context::HighGc | Context::VeryLowGc | Context::VeryHighGc)
    }

    /// Returns true for homopolymers and short tandem repeats
    pub fn is_repeat(&self) -> bool {
        match self {
            Context::ShortHomopolymer |
            Context::LongHomopolymer |
            Context::ShortDinucleotideRepeat |
            Context::LongDinucleotideRepeat |
            Context::ShortTrinucleotideRepeat |
            Context::LongTrinucleotideRepeat |
            Context::ShortQuadRepeat |
            Context::LongQuadRepeat => true,

            Context::Common |
            Context::LowGc |
            Context::HighGc |
            Context::VeryLowGc |
            Context::VeryHighGc => false
        }
    }
}

/// The class a variant sequin belongs to; only one class is scored per run
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    clap::ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum VariantClass {
    #[default]
    #[strum(serialize = "germline")]
    #[clap(name = "germline")]
    Germline,
    #[strum(serialize = "somatic")]
    #[clap(name = "somatic")]
    Somatic
}

/// Splits spliced reference features
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FeatureKind {
    #[strum(serialize = "exon")]
    Exon,
    #[strum(serialize = "intron")]
    Intron
}

/// Strand of one side of a fusion breakpoint
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::Display, strum_macros::EnumString)]
pub enum Strand {
    #[strum(serialize = "+")]
    Forward,
    #[strum(serialize = "-")]
    Reverse
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SequinError {
    #[error("alleles cannot be empty")]
    EmptyAllele,
    #[error("equal length alleles must be 1 bp, found {length} bp")]
    UnsupportedAlleles { length: usize },
    #[error(transparent)]
    Locus(#[from] LocusError)
}

/// A synthetic variant with known genotype and context
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantEntity {
    /// Sequin identifier
    id: String,
    /// Chromosome the sequin is placed on
    chrom: String,
    /// Span of the reference allele
    locus: Locus,
    /// Reference allele
    ref_allele: String,
    /// Alternate allele
    alt_allele: String,
    /// Derived from the allele lengths
    kind: MutationKind,
    genotype: Genotype,
    /// Optional, entities without one are left out of the context axes
    context: Option<Context>,
    class: VariantClass,
    /// Expected allele frequency per mixture
    abundances: BTreeMap<String, f64>
}

impl VariantEntity {
    /// Constructor, the locus covers the reference allele starting at `position`.
    /// # Arguments
    /// * `id` - unique sequin identifier
    /// * `chrom` - chromosome name
    /// * `position` - 1-based position of the first reference base
    /// * `ref_allele` - reference allele
    /// * `alt_allele` - alternate allele
    /// * `genotype` - expected genotype of the ALT allele
    /// * `context` - optional sequence context tag
    /// * `class` - germline or somatic
    /// # Errors
    /// * if the alleles are empty or an unsupported shape
    /// * if the position is 0
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String, chrom: String, position: u64,
        ref_allele: String, alt_allele: String,
        genotype: Genotype, context: Option<Context>, class: VariantClass
    ) -> Result<Self, SequinError> {
        let kind = MutationKind::from_alleles(ref_allele.as_bytes(), alt_allele.as_bytes())?;
        let locus = Locus::new(position, position + ref_allele.len() as u64 - 1)?;
        Ok(Self {
            id, chrom, locus,
            ref_allele, alt_allele,
            kind, genotype, context, class,
            abundances: Default::default()
        })
    }

    /// Sets the expected allele frequency for one mixture
    pub fn set_abundance(&mut self, mixture: &str, abundance: f64) {
        self.abundances.insert(mixture.to_string(), abundance);
    }

    /// Expected allele frequency in the given mixture, if the mixture defines one
    pub fn abundance(&self, mixture: &str) -> Option<f64> {
        self.abundances.get(mixture).copied()
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn genotype(&self) -> Genotype {
        self.genotype
    }

    pub fn context(&self) -> Option<Context> {
        self.context
    }

    pub fn class(&self) -> VariantClass {
        self.class
    }

    pub fn abundances(&self) -> &BTreeMap<String, f64> {
        &self.abundances
    }
}

impl Located for VariantEntity {
    fn locus(&self) -> Locus {
        self.locus
    }
}

/// A synthetic transcript (isoform) built from its exons
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptEntity {
    /// Isoform identifier, also the sequin id
    id: String,
    /// Parent gene
    gene_id: String,
    chrom: String,
    /// Span from the first to the last exon
    locus: Locus,
    /// Merged exon loci, sorted
    exons: Vec<Locus>,
    /// Concentration per mixture
    abundances: BTreeMap<String, f64>
}

impl TranscriptEntity {
    /// Builds a transcript from its exons; overlapping exons are merged first.
    /// Returns None if no exons are provided.
    pub fn from_exons(id: String, gene_id: String, chrom: String, exons: &[Locus]) -> Option<Self> {
        let exons = Locus::merge(exons);
        let locus = Locus::expand(exons.iter().copied())?;
        Some(Self {
            id, gene_id, chrom, locus, exons,
            abundances: Default::default()
        })
    }

    /// Gaps between consecutive exons
    pub fn introns(&self) -> Vec<Locus> {
        // merged exons never touch, so every gap is at least 1 bp
        self.exons.windows(2)
            .filter_map(|pair| Locus::new(pair[0].end() + 1, pair[1].start() - 1).ok())
            .collect()
    }

    pub fn set_abundance(&mut self, mixture: &str, abundance: f64) {
        self.abundances.insert(mixture.to_string(), abundance);
    }

    pub fn abundance(&self, mixture: &str) -> Option<f64> {
        self.abundances.get(mixture).copied()
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn isoform_id(&self) -> &str {
        &self.id
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn exons(&self) -> &[Locus] {
        &self.exons
    }

    pub fn abundances(&self) -> &BTreeMap<String, f64> {
        &self.abundances
    }
}

impl Located for TranscriptEntity {
    fn locus(&self) -> Locus {
        self.locus
    }
}

/// A gene, which is the collection of its isoforms
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneEntity {
    id: String,
    chrom: String,
    /// Span covering all isoforms
    locus: Locus,
    /// Isoform ids, sorted
    isoforms: Vec<String>,
    /// Sum of the isoform concentrations per mixture
    abundances: BTreeMap<String, f64>
}

impl GeneEntity {
    /// Collapses a set of isoforms belonging to the same gene.
    /// Returns None if there are no isoforms.
    pub fn from_isoforms(id: String, isoforms: &[&TranscriptEntity]) -> Option<Self> {
        let first = isoforms.first()?;
        let locus = Locus::expand(isoforms.iter().map(|t| t.locus()))?;
        let mut abundances: BTreeMap<String, f64> = Default::default();
        for transcript in isoforms.iter() {
            for (mixture, &abundance) in transcript.abundances().iter() {
                *abundances.entry(mixture.clone()).or_default() += abundance;
            }
        }
        let mut isoform_ids: Vec<String> = isoforms.iter().map(|t| t.id().to_string()).collect();
        isoform_ids.sort();

        Some(Self {
            id,
            chrom: first.chrom().to_string(),
            locus,
            isoforms: isoform_ids,
            abundances
        })
    }

    pub fn abundance(&self, mixture: &str) -> Option<f64> {
        self.abundances.get(mixture).copied()
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn isoforms(&self) -> &[String] {
        &self.isoforms
    }
}

impl Located for GeneEntity {
    fn locus(&self) -> Locus {
        self.locus
    }
}

/// An exon or intron of a gene, used for alignment-level matching
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplicedFeature {
    kind: FeatureKind,
    gene_id: String,
    /// First isoform (by input order) that carries this feature
    isoform_id: String,
    locus: Locus
}

impl SplicedFeature {
    pub fn new(kind: FeatureKind, gene_id: String, isoform_id: String, locus: Locus) -> Self {
        Self { kind, gene_id, isoform_id, locus }
    }

    // getters
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    pub fn isoform_id(&self) -> &str {
        &self.isoform_id
    }
}

impl Located for SplicedFeature {
    fn locus(&self) -> Locus {
        self.locus
    }
}

/// Both sides of a fusion junction, ordered so the lower breakpoint comes first.
/// Each strand stays with its own breakpoint.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Breakpoints {
    /// Lower and upper breakpoint positions as a locus
    locus: Locus,
    /// Strand at the lower breakpoint, then at the upper one
    strands: (Strand, Strand)
}

impl Breakpoints {
    /// Orders a breakpoint pair.
    /// # Errors
    /// * if either position is 0
    pub fn new(break_1: u64, strand_1: Strand, break_2: u64, strand_2: Strand) -> Result<Self, LocusError> {
        let (lower, upper) = if break_1 <= break_2 {
            ((break_1, strand_1), (break_2, strand_2))
        } else {
            ((break_2, strand_2), (break_1, strand_1))
        };
        Ok(Self {
            locus: Locus::new(lower.0, upper.0)?,
            strands: (lower.1, upper.1)
        })
    }

    pub fn strands(&self) -> (Strand, Strand) {
        self.strands
    }
}

impl Located for Breakpoints {
    fn locus(&self) -> Locus {
        self.locus
    }
}

/// A synthetic fusion gene, defined by the junction of its two partner genes
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionEntity {
    id: String,
    chrom: String,
    breakpoints: Breakpoints,
    /// Concentration per mixture
    abundances: BTreeMap<String, f64>
}

impl FusionEntity {
    pub fn new(id: String, chrom: String, breakpoints: Breakpoints) -> Self {
        Self {
            id, chrom, breakpoints,
            abundances: Default::default()
        }
    }

    pub fn set_abundance(&mut self, mixture: &str, abundance: f64) {
        self.abundances.insert(mixture.to_string(), abundance);
    }

    pub fn abundance(&self, mixture: &str) -> Option<f64> {
        self.abundances.get(mixture).copied()
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }
}

impl Located for FusionEntity {
    fn locus(&self) -> Locus {
        self.breakpoints.locus()
    }
}

/// Borrowed view of any reference entity
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReferenceEntity<'a> {
    Transcript(&'a TranscriptEntity),
    Variant(&'a VariantEntity),
    Fusion(&'a FusionEntity)
}

impl ReferenceEntity<'_> {
    pub fn id(&self) -> &str {
        match self {
            ReferenceEntity::Transcript(t) => t.id(),
            ReferenceEntity::Variant(v) => v.id(),
            ReferenceEntity::Fusion(f) => f.id()
        }
    }

    pub fn chrom(&self) -> &str {
        match self {
            ReferenceEntity::Transcript(t) => t.chrom(),
            ReferenceEntity::Variant(v) => v.chrom(),
            ReferenceEntity::Fusion(f) => f.chrom()
        }
    }

    pub fn abundance(&self, mixture: &str) -> Option<f64> {
        match self {
            ReferenceEntity::Transcript(t) => t.abundance(mixture),
            ReferenceEntity::Variant(v) => v.abundance(mixture),
            ReferenceEntity::Fusion(f) => f.abundance(mixture)
        }
    }
}

impl Located for ReferenceEntity<'_> {
    fn locus(&self) -> Locus {
        match self {
            ReferenceEntity::Transcript(t) => t.locus(),
            ReferenceEntity::Variant(v) => v.locus(),
            ReferenceEntity::Fusion(f) => f.locus()
        }
    }
}
