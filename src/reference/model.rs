use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_types::locus::{Located, Locus};
use crate::data_types::sequins::{Breakpoints, FusionEntity, GeneEntity, ReferenceEntity, SplicedFeature, TranscriptEntity, VariantClass, VariantEntity};
use crate::reference::matcher::{MatchRule, SortedIndex};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("no {what} entries found")]
    MissingReferenceData { what: String },
    #[error("no reference entities remain after matching annotation and mixture ids")]
    EmptyReferenceModel,
    #[error("annotation ({annotation} ids) and mixture ({mixture} ids) do not share any sequin ids")]
    DisjointReference { annotation: usize, mixture: usize },
    #[error("duplicate entry for {id}")]
    DuplicateEntity { id: String },
    #[error("entity {id} is not assigned to a chromosome")]
    UnassignedChromosome { id: String },
    #[error("invalid annotation for {id}: {reason}")]
    InvalidAnnotation { id: String, reason: String },
    #[error("mixture {mixture} is not defined, options are: {available:?}")]
    UnknownMixture { mixture: String, available: Vec<String> },
    #[error("sorted index on {chrom} is out of order")]
    UnsortedIndex { chrom: String }
}

/// Which kind of entities a model holds
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ReferenceMode {
    Transcriptome,
    Variants,
    Fusion
}

/// Everything that was dropped while building the model; nothing is silently lost
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Sequin ids in the annotation without any mixture entry, sorted
    pub annotation_only: Vec<String>,
    /// Sequin ids in the mixture without any annotation entry, sorted
    pub mixture_only: Vec<String>,
    /// Annotation rows that were not on an expected synthetic chromosome
    pub off_target: usize
}

impl ValidationReport {
    /// Total number of dropped ids and rows
    pub fn dropped_count(&self) -> usize {
        self.annotation_only.len() + self.mixture_only.len() + self.off_target
    }
}

/// All reference data on one chromosome, with sorted indices for matching
#[derive(Clone, Debug, Default)]
pub struct ChromReference {
    transcripts: SortedIndex<TranscriptEntity>,
    genes: SortedIndex<GeneEntity>,
    /// Distinct exons per gene
    exons: SortedIndex<SplicedFeature>,
    /// Distinct introns per gene
    introns: SortedIndex<SplicedFeature>,
    /// Union of all exons, sorted and non-overlapping
    merged_exons: Vec<Locus>,
    variants: SortedIndex<VariantEntity>,
    /// Fusion junctions, indexed by their breakpoint pair
    fusions: SortedIndex<FusionEntity>
}

impl ChromReference {
    /// Constructor for transcriptome data
    pub fn from_transcriptome(
        transcripts: Vec<TranscriptEntity>, genes: Vec<GeneEntity>,
        exons: Vec<SplicedFeature>, introns: Vec<SplicedFeature>
    ) -> Self {
        let exon_loci: Vec<Locus> = exons.iter().map(|e| e.locus()).collect();
        Self {
            transcripts: SortedIndex::new(transcripts),
            genes: SortedIndex::new(genes),
            exons: SortedIndex::new(exons),
            introns: SortedIndex::new(introns),
            merged_exons: Locus::merge(&exon_loci),
            ..Default::default()
        }
    }

    /// Constructor for variant data
    pub fn from_variants(variants: Vec<VariantEntity>) -> Self {
        Self {
            variants: SortedIndex::new(variants),
            ..Default::default()
        }
    }

    /// Constructor for fusion data
    pub fn from_fusions(fusions: Vec<FusionEntity>) -> Self {
        Self {
            fusions: SortedIndex::new(fusions),
            ..Default::default()
        }
    }

    /// Total number of bases covered by the exons
    pub fn exon_bases(&self) -> u64 {
        self.merged_exons.iter().map(|l| l.length()).sum()
    }

    /// Number of entities (transcripts, variants and fusions) on this chromosome
    pub fn entity_count(&self) -> usize {
        self.transcripts.len() + self.variants.len() + self.fusions.len()
    }

    // getters
    pub fn transcripts(&self) -> &SortedIndex<TranscriptEntity> {
        &self.transcripts
    }

    pub fn genes(&self) -> &SortedIndex<GeneEntity> {
        &self.genes
    }

    pub fn exons(&self) -> &SortedIndex<SplicedFeature> {
        &self.exons
    }

    pub fn introns(&self) -> &SortedIndex<SplicedFeature> {
        &self.introns
    }

    pub fn merged_exons(&self) -> &[Locus] {
        &self.merged_exons
    }

    pub fn variants(&self) -> &SortedIndex<VariantEntity> {
        &self.variants
    }

    pub fn fusions(&self) -> &SortedIndex<FusionEntity> {
        &self.fusions
    }
}

/// The validated, immutable reference for one analysis run.
/// Build it with `ReferenceBuilder`, then share it by reference with the classifiers.
#[derive(Clone, Debug)]
pub struct ReferenceModel {
    mode: ReferenceMode,
    /// Mixture names in input order
    mixtures: Vec<String>,
    /// Per-chromosome data, only chromosomes with at least one entity
    chroms: BTreeMap<String, ChromReference>,
    /// What got dropped during construction
    report: ValidationReport
}

impl ReferenceModel {
    /// Assembles and validates a model.
    /// # Errors
    /// * if the assembled model breaks any invariant, see `validate`
    pub fn new(
        mode: ReferenceMode, mixtures: Vec<String>,
        chroms: BTreeMap<String, ChromReference>, report: ValidationReport
    ) -> Result<Self, ReferenceError> {
        let model = Self { mode, mixtures, chroms, report };
        model.validate()?;
        Ok(model)
    }

    /// Re-checks the model invariants; never changes anything, so repeated calls are a no-op.
    /// # Errors
    /// * if there are no entities on any chromosome
    /// * if an entity sits in the wrong chromosome bucket
    /// * if a sorted index is out of order
    pub fn validate(&self) -> Result<(), ReferenceError> {
        if self.chroms.values().all(|c| c.entity_count() == 0) {
            return Err(ReferenceError::EmptyReferenceModel);
        }

        for (chrom, data) in self.chroms.iter() {
            let misplaced = data.transcripts.iter().map(|t| (t.id(), t.chrom()))
                .chain(data.variants.iter().map(|v| (v.id(), v.chrom())))
                .chain(data.fusions.iter().map(|f| (f.id(), f.chrom())))
                .find(|(_id, c)| c != chrom);
            if let Some((id, _c)) = misplaced {
                return Err(ReferenceError::UnassignedChromosome { id: id.to_string() });
            }

            let all_sorted = data.transcripts.is_sorted() && data.genes.is_sorted() &&
                data.exons.is_sorted() && data.introns.is_sorted() && data.variants.is_sorted() &&
                data.fusions.is_sorted();
            if !all_sorted {
                return Err(ReferenceError::UnsortedIndex { chrom: chrom.clone() });
            }
        }
        Ok(())
    }

    /// Resolves the mixture to use for abundances, defaulting to the first one.
    /// # Errors
    /// * if `mixture` is provided and is not defined
    pub fn resolve_mixture(&self, mixture: Option<&str>) -> Result<String, ReferenceError> {
        match mixture {
            Some(m) if self.mixtures.iter().any(|x| x == m) => Ok(m.to_string()),
            Some(m) => Err(ReferenceError::UnknownMixture { mixture: m.to_string(), available: self.mixtures.clone() }),
            None => self.mixtures.first()
                .cloned()
                .ok_or(ReferenceError::MissingReferenceData { what: "mixture".to_string() })
        }
    }

    /// Best variant at `locus` under `rule`, of any class
    pub fn find_variant(&self, chrom: &str, locus: &Locus, rule: MatchRule, fuzzy: u64) -> Option<&VariantEntity> {
        self.chroms.get(chrom)?.variants.find(locus, rule, fuzzy)
    }

    /// Best variant at `locus` under `rule` that belongs to a class other than `class`
    pub fn find_variant_not_in_class(&self, chrom: &str, locus: &Locus, rule: MatchRule, fuzzy: u64, class: VariantClass) -> Option<&VariantEntity> {
        self.chroms.get(chrom)?.variants.find_where(locus, rule, fuzzy, |v| v.class() != class)
    }

    pub fn find_exon(&self, chrom: &str, locus: &Locus, rule: MatchRule) -> Option<&SplicedFeature> {
        self.chroms.get(chrom)?.exons.find(locus, rule, 0)
    }

    pub fn find_intron(&self, chrom: &str, locus: &Locus, rule: MatchRule) -> Option<&SplicedFeature> {
        self.chroms.get(chrom)?.introns.find(locus, rule, 0)
    }

    pub fn find_transcript(&self, chrom: &str, locus: &Locus, rule: MatchRule) -> Option<&TranscriptEntity> {
        self.chroms.get(chrom)?.transcripts.find(locus, rule, 0)
    }

    pub fn find_gene(&self, chrom: &str, locus: &Locus, rule: MatchRule) -> Option<&GeneEntity> {
        self.chroms.get(chrom)?.genes.find(locus, rule, 0)
    }

    /// Fusion whose breakpoints both fall within `fuzzy` bases of the query, with matching strands
    pub fn find_fusion(&self, chrom: &str, breakpoints: &Breakpoints, fuzzy: u64) -> Option<&FusionEntity> {
        self.chroms.get(chrom)?.fusions.find_where(
            &breakpoints.locus(), MatchRule::Exact, fuzzy,
            |f| f.breakpoints().strands() == breakpoints.strands()
        )
    }

    /// Best entity of either kind; variants are checked before transcripts
    pub fn find_entity(&self, chrom: &str, locus: &Locus, rule: MatchRule) -> Option<ReferenceEntity<'_>> {
        self.find_variant(chrom, locus, rule, 0)
            .map(ReferenceEntity::Variant)
            .or_else(|| self.find_transcript(chrom, locus, rule).map(ReferenceEntity::Transcript))
    }

    /// All entities on a chromosome, variants first, then transcripts and fusions, each in sorted order
    pub fn entities<'a>(&'a self, chrom: &str) -> Vec<ReferenceEntity<'a>> {
        match self.chroms.get(chrom) {
            Some(data) => data.variants.iter().map(ReferenceEntity::Variant)
                .chain(data.transcripts.iter().map(ReferenceEntity::Transcript))
                .chain(data.fusions.iter().map(ReferenceEntity::Fusion))
                .collect(),
            None => vec![]
        }
    }

    /// Variants of one class on one chromosome
    pub fn variants_in_class<'a>(&'a self, chrom: &str, class: VariantClass) -> Vec<&'a VariantEntity> {
        match self.chroms.get(chrom) {
            Some(data) => data.variants.iter().filter(|v| v.class() == class).collect(),
            None => vec![]
        }
    }

    /// Chromosome names, sorted
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(|s| s.as_str())
    }

    pub fn chrom(&self, chrom: &str) -> Option<&ChromReference> {
        self.chroms.get(chrom)
    }

    /// Total number of entities across all chromosomes
    pub fn entity_count(&self) -> usize {
        self.chroms.values().map(|c| c.entity_count()).sum()
    }

    // getters
    pub fn mode(&self) -> ReferenceMode {
        self.mode
    }

    pub fn mixtures(&self) -> &[String] {
        &self.mixtures
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}
