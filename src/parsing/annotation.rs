use anyhow::{Context, anyhow};
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::data_types::locus::Locus;
use crate::data_types::sequins::{Context as SequenceContext, Genotype, Strand, VariantClass};
use crate::reference::builder::{FusionAnnotation, TranscriptAnnotation, VariantAnnotation};

/// One row of the variant annotation TSV
#[derive(Debug, Deserialize)]
struct VariantRow {
    name: String,
    chrom: String,
    position: u64,
    #[serde(rename = "ref")]
    ref_allele: String,
    #[serde(rename = "alt")]
    alt_allele: String,
    genotype: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    class: Option<String>
}

/// One exon row of the transcript annotation TSV
#[derive(Debug, Deserialize)]
struct TranscriptRow {
    isoform_id: String,
    gene_id: String,
    chrom: String,
    start: u64,
    end: u64
}

/// One junction row of the fusion annotation TSV
#[derive(Debug, Deserialize)]
struct FusionRow {
    name: String,
    chrom: String,
    break_1: u64,
    strand_1: String,
    break_2: u64,
    strand_2: String
}

/// Opens a headered TSV for serde deserialization
fn open_tsv(filename: &Path) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))
}

/// Treats empty and "-" cells as missing
fn optional_cell(cell: Option<String>) -> Option<String> {
    cell.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != "-" && c != ".")
}

/// Loads the variant sequin definitions.
/// Every row must be valid since this is reference data.
/// # Arguments
/// * `filename` - TSV with name, chrom, position, ref, alt, genotype and optional context and class columns
/// # Errors
/// * if the file cannot be read, or any row fails to parse
pub fn load_variant_annotation(filename: &Path) -> anyhow::Result<Vec<VariantAnnotation>> {
    let mut tsv_reader = open_tsv(filename)?;
    let mut ret = vec![];
    for (row_index, result) in tsv_reader.deserialize().enumerate() {
        let row: VariantRow = result
            .with_context(|| format!("Error while parsing row #{} of {filename:?}:", row_index + 1))?;

        let genotype = Genotype::from_str(&row.genotype)
            .map_err(|_e| anyhow!("Unknown genotype {:?} for {}", row.genotype, row.name))?;
        let context = match optional_cell(row.context) {
            Some(c) => Some(
                SequenceContext::from_str(&c)
                    .map_err(|_e| anyhow!("Unknown context {c:?} for {}", row.name))?
            ),
            None => None
        };
        let class = match optional_cell(row.class) {
            Some(c) => VariantClass::from_str(&c)
                .map_err(|_e| anyhow!("Unknown class {c:?} for {}", row.name))?,
            None => VariantClass::Germline
        };

        ret.push(VariantAnnotation {
            id: row.name,
            chrom: row.chrom,
            position: row.position,
            ref_allele: row.ref_allele.to_ascii_uppercase(),
            alt_allele: row.alt_allele.to_ascii_uppercase(),
            genotype,
            context,
            class
        });
    }
    debug!("Loaded {} variant annotations from {filename:?}", ret.len());
    Ok(ret)
}

/// Loads the transcript sequin exons, one row per exon
/// # Arguments
/// * `filename` - TSV with isoform_id, gene_id, chrom, start and end columns; coordinates are 1-based inclusive
/// # Errors
/// * if the file cannot be read, or any row fails to parse
pub fn load_transcript_annotation(filename: &Path) -> anyhow::Result<Vec<TranscriptAnnotation>> {
    let mut tsv_reader = open_tsv(filename)?;
    let mut ret = vec![];
    for (row_index, result) in tsv_reader.deserialize().enumerate() {
        let row: TranscriptRow = result
            .with_context(|| format!("Error while parsing row #{} of {filename:?}:", row_index + 1))?;
        let locus = Locus::new(row.start, row.end)
            .with_context(|| format!("Error while parsing exon of {}:", row.isoform_id))?;
        ret.push(TranscriptAnnotation {
            isoform_id: row.isoform_id,
            gene_id: row.gene_id,
            chrom: row.chrom,
            locus
        });
    }
    debug!("Loaded {} exon annotations from {filename:?}", ret.len());
    Ok(ret)
}

/// Loads the fusion sequin junctions, one row per fusion
/// # Arguments
/// * `filename` - TSV with name, chrom, break_1, strand_1, break_2 and strand_2 columns; strands are "+" or "-"
/// # Errors
/// * if the file cannot be read, or any row fails to parse
pub fn load_fusion_annotation(filename: &Path) -> anyhow::Result<Vec<FusionAnnotation>> {
    let mut tsv_reader = open_tsv(filename)?;
    let mut ret = vec![];
    for (row_index, result) in tsv_reader.deserialize().enumerate() {
        let row: FusionRow = result
            .with_context(|| format!("Error while parsing row #{} of {filename:?}:", row_index + 1))?;
        let strand_1 = Strand::from_str(row.strand_1.trim())
            .map_err(|_e| anyhow!("Unknown strand {:?} for {}", row.strand_1, row.name))?;
        let strand_2 = Strand::from_str(row.strand_2.trim())
            .map_err(|_e| anyhow!("Unknown strand {:?} for {}", row.strand_2, row.name))?;
        ret.push(FusionAnnotation {
            id: row.name,
            chrom: row.chrom,
            break_1: row.break_1,
            strand_1,
            break_2: row.break_2,
            strand_2
        });
    }
    debug!("Loaded {} fusion annotations from {filename:?}", ret.len());
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_variant_annotation() {
        let annotations = load_variant_annotation(&PathBuf::from("test_data/variants.tsv")).unwrap();
        assert_eq!(annotations.len(), 6);

        let v2 = &annotations[1];
        assert_eq!(v2.id, "V2");
        assert_eq!(v2.position, 800);
        assert_eq!(v2.ref_allele, "CAT");
        assert_eq!(v2.genotype, Genotype::Homozygous);
        assert_eq!(v2.context, Some(SequenceContext::LongHomopolymer));

        // empty class falls back to germline, "-" context is none
        assert_eq!(annotations[2].class, VariantClass::Germline);
        assert_eq!(annotations[2].context, Some(SequenceContext::LowGc));
        assert_eq!(annotations[3].context, None);
        assert_eq!(annotations[4].class, VariantClass::Somatic);
    }

    #[test]
    fn test_load_transcript_annotation() {
        let annotations = load_transcript_annotation(&PathBuf::from("test_data/transcripts.tsv")).unwrap();
        assert_eq!(annotations.len(), 6);
        assert_eq!(annotations[3].isoform_id, "R1_2");
        assert_eq!(annotations[3].gene_id, "R1");
        assert_eq!(annotations[3].locus, Locus::new(301, 500).unwrap());
    }

    #[test]
    fn test_load_fusion_annotation() {
        let annotations = load_fusion_annotation(&PathBuf::from("test_data/fusions_annotation.tsv")).unwrap();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[1].id, "FG2_12P_1");
        assert_eq!(annotations[1].break_1, 6000);
        assert_eq!(annotations[1].strand_1, Strand::Reverse);
        assert_eq!(annotations[1].strand_2, Strand::Forward);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_variant_annotation(&PathBuf::from("test_data/does_not_exist.tsv")).is_err());
    }
}
