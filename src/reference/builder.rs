use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

use crate::data_types::locus::{Located, Locus};
use crate::data_types::sequins::{Breakpoints, Context, FeatureKind, FusionEntity, GeneEntity, Genotype, SplicedFeature, Strand, TranscriptEntity, VariantClass, VariantEntity};
use crate::reference::model::{ChromReference, ReferenceError, ReferenceMode, ReferenceModel, ValidationReport};

/// One exon of an isoform, as provided by an annotation parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptAnnotation {
    pub isoform_id: String,
    pub gene_id: String,
    pub chrom: String,
    pub locus: Locus
}

/// One sequin variant, as provided by an annotation parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantAnnotation {
    pub id: String,
    pub chrom: String,
    /// 1-based position of the first reference base
    pub position: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub genotype: Genotype,
    pub context: Option<Context>,
    pub class: VariantClass
}

/// One sequin fusion junction, as provided by an annotation parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FusionAnnotation {
    pub id: String,
    pub chrom: String,
    pub break_1: u64,
    pub strand_1: Strand,
    pub break_2: u64,
    pub strand_2: Strand
}

/// One (sequin, mixture) concentration
#[derive(Clone, Debug, PartialEq)]
pub struct MixtureRecord {
    pub id: String,
    pub mixture: String,
    pub abundance: f64
}

/// Collects raw annotation and mixture records, then validates them into a `ReferenceModel`.
#[derive(Clone, Debug, Default)]
pub struct ReferenceBuilder {
    /// Chromosomes the sequins are expected on; empty accepts any
    synthetic_chroms: BTreeSet<String>,
    transcripts: Vec<TranscriptAnnotation>,
    variants: Vec<VariantAnnotation>,
    fusions: Vec<FusionAnnotation>,
    mixtures: Vec<MixtureRecord>
}

/// Mixture records after duplicate checks: id -> [(mixture, abundance)], plus mixture names in input order
type MixtureLookup = (FxHashMap<String, Vec<(String, f64)>>, Vec<String>);

impl ReferenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the annotation to the provided chromosomes
    pub fn with_synthetic_chroms<I: IntoIterator<Item = String>>(mut self, chroms: I) -> Self {
        self.synthetic_chroms.extend(chroms);
        self
    }

    pub fn add_transcript_annotation(&mut self, annotation: TranscriptAnnotation) {
        self.transcripts.push(annotation);
    }

    pub fn add_variant_annotation(&mut self, annotation: VariantAnnotation) {
        self.variants.push(annotation);
    }

    pub fn add_mixture_record(&mut self, record: MixtureRecord) {
        self.mixtures.push(record);
    }

    pub fn extend_transcript_annotations<I: IntoIterator<Item = TranscriptAnnotation>>(&mut self, annotations: I) {
        self.transcripts.extend(annotations);
    }

    pub fn extend_variant_annotations<I: IntoIterator<Item = VariantAnnotation>>(&mut self, annotations: I) {
        self.variants.extend(annotations);
    }

    pub fn extend_fusion_annotations<I: IntoIterator<Item = FusionAnnotation>>(&mut self, annotations: I) {
        self.fusions.extend(annotations);
    }

    pub fn extend_mixture_records<I: IntoIterator<Item = MixtureRecord>>(&mut self, records: I) {
        self.mixtures.extend(records);
    }

    /// Builds a transcriptome model: isoforms from exons, genes from isoforms, and the exon/intron indices.
    /// # Errors
    /// * `MissingReferenceData` if no exons are on the synthetic chromosomes, or there is no mixture
    /// * `DisjointReference` if annotation and mixture share no ids
    /// * `DuplicateEntity` for repeated (id, mixture) cells
    /// * `InvalidAnnotation` if an isoform spans chromosomes or genes
    /// * `EmptyReferenceModel` if nothing remains
    pub fn build_transcriptome(self) -> Result<ReferenceModel, ReferenceError> {
        let synthetic_chroms = self.synthetic_chroms;
        let (annotations, off_target) = retain_synthetic(self.transcripts, &synthetic_chroms, |a| &a.chrom);
        if annotations.is_empty() {
            return Err(missing_annotation(&synthetic_chroms));
        }
        let (mix_lookup, mixture_names) = index_mixtures(&self.mixtures)?;

        // collect exons per isoform, preserving the input order of isoforms
        let mut isoforms: IndexMap<String, (String, String, Vec<Locus>)> = Default::default();
        for annotation in annotations.into_iter() {
            if annotation.chrom.is_empty() {
                return Err(ReferenceError::UnassignedChromosome { id: annotation.isoform_id });
            }
            let entry = isoforms.entry(annotation.isoform_id.clone())
                .or_insert_with(|| (annotation.gene_id.clone(), annotation.chrom.clone(), vec![]));
            if entry.0 != annotation.gene_id || entry.1 != annotation.chrom {
                return Err(ReferenceError::InvalidAnnotation {
                    id: annotation.isoform_id,
                    reason: format!("exons found on {}:{} and {}:{}", entry.1, entry.0, annotation.chrom, annotation.gene_id)
                });
            }
            entry.2.push(annotation.locus);
        }

        let annotation_ids: Vec<&str> = isoforms.keys().map(|s| s.as_str()).collect();
        let (shared, report) = intersect_ids(&annotation_ids, &mix_lookup, off_target)?;

        // build the isoforms that survived the intersection
        let mut by_chrom: BTreeMap<String, Vec<TranscriptEntity>> = Default::default();
        for (isoform_id, (gene_id, chrom, exons)) in isoforms.into_iter() {
            if !shared.contains(isoform_id.as_str()) {
                continue;
            }
            let mut transcript = TranscriptEntity::from_exons(isoform_id.clone(), gene_id, chrom.clone(), &exons)
                .ok_or_else(|| ReferenceError::InvalidAnnotation { id: isoform_id.clone(), reason: "no exons".to_string() })?;
            for (mixture, abundance) in mix_lookup.get(&isoform_id).into_iter().flatten() {
                transcript.set_abundance(mixture, *abundance);
            }
            by_chrom.entry(chrom).or_default().push(transcript);
        }

        // a gene must live on exactly one chromosome
        let mut gene_chrom: FxHashMap<&str, &str> = Default::default();
        for (chrom, transcripts) in by_chrom.iter() {
            for transcript in transcripts.iter() {
                let previous = gene_chrom.entry(transcript.gene_id()).or_insert(chrom.as_str());
                if *previous != chrom.as_str() {
                    return Err(ReferenceError::InvalidAnnotation {
                        id: transcript.gene_id().to_string(),
                        reason: format!("gene found on {previous} and {chrom}")
                    });
                }
            }
        }

        let chroms: BTreeMap<String, ChromReference> = by_chrom.into_iter()
            .map(|(chrom, transcripts)| {
                debug!("Indexing {} isoforms on {chrom}...", transcripts.len());
                (chrom, build_chrom_transcriptome(transcripts))
            })
            .collect();

        if chroms.is_empty() {
            return Err(ReferenceError::EmptyReferenceModel);
        }
        log_report(&report);
        ReferenceModel::new(ReferenceMode::Transcriptome, mixture_names, chroms, report)
    }

    /// Builds a variant model with one entity per annotated sequin variant.
    /// # Errors
    /// * `MissingReferenceData` if no variants are on the synthetic chromosomes, or there is no mixture
    /// * `DisjointReference` if annotation and mixture share no ids
    /// * `DuplicateEntity` for repeated variant ids or (id, mixture) cells
    /// * `InvalidAnnotation` for unsupported alleles or positions
    /// * `EmptyReferenceModel` if nothing remains
    pub fn build_variants(self) -> Result<ReferenceModel, ReferenceError> {
        let synthetic_chroms = self.synthetic_chroms;
        let (annotations, off_target) = retain_synthetic(self.variants, &synthetic_chroms, |a| &a.chrom);
        if annotations.is_empty() {
            return Err(missing_annotation(&synthetic_chroms));
        }
        let (mix_lookup, mixture_names) = index_mixtures(&self.mixtures)?;

        let mut seen: FxHashSet<&str> = Default::default();
        for annotation in annotations.iter() {
            if !seen.insert(annotation.id.as_str()) {
                return Err(ReferenceError::DuplicateEntity { id: annotation.id.clone() });
            }
            if annotation.chrom.is_empty() {
                return Err(ReferenceError::UnassignedChromosome { id: annotation.id.clone() });
            }
        }

        let annotation_ids: Vec<&str> = annotations.iter().map(|a| a.id.as_str()).collect();
        let (shared, report) = intersect_ids(&annotation_ids, &mix_lookup, off_target)?;

        let mut by_chrom: BTreeMap<String, Vec<VariantEntity>> = Default::default();
        for annotation in annotations.into_iter() {
            if !shared.contains(annotation.id.as_str()) {
                continue;
            }
            let mut entity = VariantEntity::new(
                annotation.id.clone(), annotation.chrom.clone(), annotation.position,
                annotation.ref_allele, annotation.alt_allele,
                annotation.genotype, annotation.context, annotation.class
            ).map_err(|e| ReferenceError::InvalidAnnotation { id: annotation.id.clone(), reason: e.to_string() })?;
            for (mixture, abundance) in mix_lookup.get(&annotation.id).into_iter().flatten() {
                entity.set_abundance(mixture, *abundance);
            }
            by_chrom.entry(annotation.chrom).or_default().push(entity);
        }

        let chroms: BTreeMap<String, ChromReference> = by_chrom.into_iter()
            .map(|(chrom, variants)| {
                debug!("Indexing {} variants on {chrom}...", variants.len());
                (chrom, ChromReference::from_variants(variants))
            })
            .collect();

        if chroms.is_empty() {
            return Err(ReferenceError::EmptyReferenceModel);
        }
        log_report(&report);
        ReferenceModel::new(ReferenceMode::Variants, mixture_names, chroms, report)
    }

    /// Builds a fusion model with one entity per annotated junction.
    /// # Errors
    /// * `MissingReferenceData` if no fusions are on the synthetic chromosomes, or there is no mixture
    /// * `DisjointReference` if annotation and mixture share no ids
    /// * `DuplicateEntity` for repeated fusion ids or (id, mixture) cells
    /// * `InvalidAnnotation` for a breakpoint at position 0
    /// * `EmptyReferenceModel` if nothing remains
    pub fn build_fusions(self) -> Result<ReferenceModel, ReferenceError> {
        let synthetic_chroms = self.synthetic_chroms;
        let (annotations, off_target) = retain_synthetic(self.fusions, &synthetic_chroms, |a| &a.chrom);
        if annotations.is_empty() {
            return Err(missing_annotation(&synthetic_chroms));
        }
        let (mix_lookup, mixture_names) = index_mixtures(&self.mixtures)?;

        let mut seen: FxHashSet<&str> = Default::default();
        for annotation in annotations.iter() {
            if !seen.insert(annotation.id.as_str()) {
                return Err(ReferenceError::DuplicateEntity { id: annotation.id.clone() });
            }
            if annotation.chrom.is_empty() {
                return Err(ReferenceError::UnassignedChromosome { id: annotation.id.clone() });
            }
        }

        let annotation_ids: Vec<&str> = annotations.iter().map(|a| a.id.as_str()).collect();
        let (shared, report) = intersect_ids(&annotation_ids, &mix_lookup, off_target)?;

        let mut by_chrom: BTreeMap<String, Vec<FusionEntity>> = Default::default();
        for annotation in annotations.into_iter() {
            if !shared.contains(annotation.id.as_str()) {
                continue;
            }
            let breakpoints = Breakpoints::new(annotation.break_1, annotation.strand_1, annotation.break_2, annotation.strand_2)
                .map_err(|e| ReferenceError::InvalidAnnotation { id: annotation.id.clone(), reason: e.to_string() })?;
            let mut entity = FusionEntity::new(annotation.id.clone(), annotation.chrom.clone(), breakpoints);
            for (mixture, abundance) in mix_lookup.get(&annotation.id).into_iter().flatten() {
                entity.set_abundance(mixture, *abundance);
            }
            by_chrom.entry(annotation.chrom).or_default().push(entity);
        }

        let chroms: BTreeMap<String, ChromReference> = by_chrom.into_iter()
            .map(|(chrom, fusions)| {
                debug!("Indexing {} fusions on {chrom}...", fusions.len());
                (chrom, ChromReference::from_fusions(fusions))
            })
            .collect();

        if chroms.is_empty() {
            return Err(ReferenceError::EmptyReferenceModel);
        }
        log_report(&report);
        ReferenceModel::new(ReferenceMode::Fusion, mixture_names, chroms, report)
    }
}

/// Keeps only annotation on the synthetic chromosomes (if any are set), returning the number dropped
fn retain_synthetic<T, F>(annotations: Vec<T>, synthetic_chroms: &BTreeSet<String>, get_chrom: F) -> (Vec<T>, usize)
where
    F: Fn(&T) -> &String
{
    if synthetic_chroms.is_empty() {
        return (annotations, 0);
    }
    let total = annotations.len();
    let kept: Vec<T> = annotations.into_iter()
        .filter(|a| synthetic_chroms.contains(get_chrom(a)))
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

fn missing_annotation(synthetic_chroms: &BTreeSet<String>) -> ReferenceError {
    let what = if synthetic_chroms.is_empty() {
        "annotation".to_string()
    } else {
        format!("annotation on {}", synthetic_chroms.iter().join(","))
    };
    ReferenceError::MissingReferenceData { what }
}

/// Groups mixture records by sequin id and checks for duplicates
fn index_mixtures(records: &[MixtureRecord]) -> Result<MixtureLookup, ReferenceError> {
    if records.is_empty() {
        return Err(ReferenceError::MissingReferenceData { what: "mixture".to_string() });
    }

    let mut lookup: FxHashMap<String, Vec<(String, f64)>> = Default::default();
    let mut names: IndexSet<String> = Default::default();
    for record in records.iter() {
        let entry = lookup.entry(record.id.clone()).or_default();
        if entry.iter().any(|(m, _a)| m == &record.mixture) {
            return Err(ReferenceError::DuplicateEntity { id: format!("{}:{}", record.id, record.mixture) });
        }
        entry.push((record.mixture.clone(), record.abundance));
        names.insert(record.mixture.clone());
    }
    Ok((lookup, names.into_iter().collect()))
}

/// Set-intersection of annotation and mixture ids, with everything dropped recorded in the report
fn intersect_ids(
    annotation_ids: &[&str],
    mix_lookup: &FxHashMap<String, Vec<(String, f64)>>,
    off_target: usize
) -> Result<(FxHashSet<String>, ValidationReport), ReferenceError> {
    let annotation_set: FxHashSet<&str> = annotation_ids.iter().copied().collect();
    let shared: FxHashSet<String> = annotation_ids.iter()
        .filter(|id| mix_lookup.contains_key(**id))
        .map(|id| id.to_string())
        .collect();

    let annotation_only: Vec<String> = annotation_set.iter()
        .filter(|id| !shared.contains(**id))
        .map(|id| id.to_string())
        .sorted()
        .collect();
    let mixture_only: Vec<String> = mix_lookup.keys()
        .filter(|id| !annotation_set.contains(id.as_str()))
        .cloned()
        .sorted()
        .collect();

    if shared.is_empty() {
        return Err(ReferenceError::DisjointReference {
            annotation: annotation_set.len(),
            mixture: mix_lookup.len()
        });
    }

    Ok((shared, ValidationReport { annotation_only, mixture_only, off_target }))
}

fn log_report(report: &ValidationReport) {
    if !report.annotation_only.is_empty() {
        warn!("Dropped {} annotated sequins without a mixture entry: {:?}", report.annotation_only.len(), report.annotation_only);
    }
    if !report.mixture_only.is_empty() {
        warn!("Dropped {} mixture sequins without an annotation entry: {:?}", report.mixture_only.len(), report.mixture_only);
    }
    if report.off_target > 0 {
        warn!("Ignored {} annotation rows outside the synthetic chromosomes", report.off_target);
    }
}

/// Derives genes, distinct exons and distinct introns for the isoforms of one chromosome
fn build_chrom_transcriptome(transcripts: Vec<TranscriptEntity>) -> ChromReference {
    // genes in first-seen order so the isoform order stays stable
    let mut gene_isoforms: IndexMap<&str, Vec<&TranscriptEntity>> = Default::default();
    for transcript in transcripts.iter() {
        gene_isoforms.entry(transcript.gene_id()).or_default().push(transcript);
    }

    let mut genes: Vec<GeneEntity> = vec![];
    let mut exons: Vec<SplicedFeature> = vec![];
    let mut introns: Vec<SplicedFeature> = vec![];
    for (&gene_id, isoforms) in gene_isoforms.iter() {
        if let Some(gene) = GeneEntity::from_isoforms(gene_id.to_string(), isoforms) {
            genes.push(gene);
        }

        let mut seen_exons: FxHashSet<Locus> = Default::default();
        let mut seen_introns: FxHashSet<Locus> = Default::default();
        for isoform in isoforms.iter() {
            for &exon in isoform.exons().iter() {
                if seen_exons.insert(exon) {
                    exons.push(SplicedFeature::new(FeatureKind::Exon, gene_id.to_string(), isoform.id().to_string(), exon));
                }
            }
            for intron in isoform.introns().into_iter() {
                if seen_introns.insert(intron) {
                    introns.push(SplicedFeature::new(FeatureKind::Intron, gene_id.to_string(), isoform.id().to_string(), intron));
                }
            }
        }
    }

    ChromReference::from_transcriptome(transcripts, genes, exons, introns)
}
