use anyhow::{Context, anyhow};
use log::debug;
use std::path::Path;
use std::str::FromStr;

use crate::data_types::detected::{DetectedExpression, DetectedFeature, DetectedFold, DetectedFusion, FusionSide, ParsedRecord};
use crate::data_types::locus::Locus;
use crate::data_types::sequins::{FeatureKind, Strand};

/// Opens a headered TSV where each row becomes one detected record
fn open_tsv(filename: &Path) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))
}

/// Parses a required cell by position
fn parse_cell<T>(row: &csv::StringRecord, index: usize, label: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display
{
    let cell = row.get(index)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .ok_or(anyhow!("missing {label}"))?;
    cell.parse::<T>().map_err(|e| anyhow!("invalid {label} {cell:?}: {e}"))
}

fn parse_feature_row(row: &csv::StringRecord) -> anyhow::Result<DetectedFeature> {
    let chrom: String = parse_cell(row, 0, "chrom")?;
    let start: u64 = parse_cell(row, 1, "start")?;
    let end: u64 = parse_cell(row, 2, "end")?;
    let kind: FeatureKind = parse_cell(row, 3, "kind")?;
    let count: u64 = parse_cell(row, 4, "count")?;
    Ok(DetectedFeature::new(chrom, Locus::new(start, end)?, kind, count))
}

fn parse_expression_row(row: &csv::StringRecord) -> anyhow::Result<DetectedExpression> {
    let chrom: String = parse_cell(row, 0, "chrom")?;
    let start: u64 = parse_cell(row, 1, "start")?;
    let end: u64 = parse_cell(row, 2, "end")?;
    let abundance: f64 = parse_cell(row, 3, "abundance")?;
    Ok(DetectedExpression::new(chrom, Locus::new(start, end)?, abundance))
}

/// Like `parse_cell`, but an absent, empty or "NA" cell is None
fn parse_optional_cell<T>(row: &csv::StringRecord, index: usize, label: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display
{
    match row.get(index).map(|c| c.trim()) {
        None | Some("") | Some("NA") => Ok(None),
        Some(_c) => parse_cell(row, index, label).map(Some)
    }
}

fn parse_fold_row(row: &csv::StringRecord) -> anyhow::Result<DetectedFold> {
    let chrom: String = parse_cell(row, 0, "chrom")?;
    let start: u64 = parse_cell(row, 1, "start")?;
    let end: u64 = parse_cell(row, 2, "end")?;
    let log_fold: f64 = parse_cell(row, 3, "log2 fold")?;
    let q_value: Option<f64> = parse_optional_cell(row, 4, "q-value")?;
    Ok(DetectedFold::new(chrom, Locus::new(start, end)?, log_fold, q_value))
}

fn parse_fusion_row(row: &csv::StringRecord) -> anyhow::Result<DetectedFusion> {
    let side_1 = FusionSide {
        chrom: parse_cell(row, 0, "chrom_1")?,
        position: parse_cell(row, 1, "break_1")?,
        strand: parse_cell::<Strand>(row, 2, "strand_1")?
    };
    let side_2 = FusionSide {
        chrom: parse_cell(row, 3, "chrom_2")?,
        position: parse_cell(row, 4, "break_2")?,
        strand: parse_cell::<Strand>(row, 5, "strand_2")?
    };
    let reads: u64 = parse_cell(row, 6, "reads")?;
    Ok(DetectedFusion::new(side_1, side_2, reads)?)
}

/// Reads every row, turning rows that fail `parse_row` into malformed entries
fn load_rows<T, F>(filename: &Path, parse_row: F) -> anyhow::Result<Vec<ParsedRecord<T>>>
where
    F: Fn(&csv::StringRecord) -> anyhow::Result<T>
{
    let mut tsv_reader = open_tsv(filename)?;
    let mut ret = vec![];
    for (row_index, result) in tsv_reader.records().enumerate() {
        let row = result.with_context(|| format!("Error while reading row #{} of {filename:?}:", row_index + 1))?;
        let parsed = match parse_row(&row) {
            Ok(record) => ParsedRecord::Record(record),
            Err(e) => ParsedRecord::Malformed { reason: format!("row #{}: {e:#}", row_index + 1) }
        };
        ret.push(parsed);
    }
    debug!("Loaded {} rows from {filename:?}", ret.len());
    Ok(ret)
}

/// Loads aligned exon blocks and splice junctions
/// # Arguments
/// * `filename` - TSV with chrom, start, end, kind (exon/intron) and count columns, 1-based inclusive
/// # Errors
/// * if the file cannot be read; bad rows are returned as malformed instead
pub fn load_features(filename: &Path) -> anyhow::Result<Vec<ParsedRecord<DetectedFeature>>> {
    load_rows(filename, parse_feature_row)
}

/// Loads measured abundances
/// # Arguments
/// * `filename` - TSV with chrom, start, end and abundance columns, 1-based inclusive
/// # Errors
/// * if the file cannot be read; bad rows are returned as malformed instead
pub fn load_expression(filename: &Path) -> anyhow::Result<Vec<ParsedRecord<DetectedExpression>>> {
    load_rows(filename, parse_expression_row)
}

/// Loads measured log2 fold changes between two samples
/// # Arguments
/// * `filename` - TSV with chrom, start, end, log2 fold and an optional q-value column, 1-based inclusive
/// # Errors
/// * if the file cannot be read; bad rows are returned as malformed instead
pub fn load_folds(filename: &Path) -> anyhow::Result<Vec<ParsedRecord<DetectedFold>>> {
    load_rows(filename, parse_fold_row)
}

/// Loads fusion calls
/// # Arguments
/// * `filename` - TSV with chrom_1, break_1, strand_1, chrom_2, break_2, strand_2 and reads columns
/// # Errors
/// * if the file cannot be read; bad rows are returned as malformed instead
pub fn load_fusions(filename: &Path) -> anyhow::Result<Vec<ParsedRecord<DetectedFusion>>> {
    load_rows(filename, parse_fusion_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::data_types::detected::DetectedRecord;
    use crate::data_types::locus::Located;

    #[test]
    fn test_load_features() {
        let features = load_features(&PathBuf::from("test_data/features.tsv")).unwrap();
        assert_eq!(features.len(), 5);
        match &features[1] {
            ParsedRecord::Record(f) => {
                assert_eq!(f.kind(), FeatureKind::Intron);
                assert_eq!(f.locus(), Locus::new(201, 300).unwrap());
                assert_eq!(f.count(), 4);
            },
            ParsedRecord::Malformed { reason } => panic!("unexpected malformed row: {reason}")
        };
        assert!(matches!(&features[3], ParsedRecord::Malformed { .. }));
    }

    #[test]
    fn test_load_expression() {
        let expression = load_expression(&PathBuf::from("test_data/expression.tsv")).unwrap();
        assert_eq!(expression.len(), 4);
        match &expression[0] {
            ParsedRecord::Record(e) => {
                assert_eq!(e.chrom(), "chrT");
                assert_eq!(e.abundance(), 7.5);
            },
            ParsedRecord::Malformed { reason } => panic!("unexpected malformed row: {reason}")
        };
        assert!(matches!(&expression[3], ParsedRecord::Malformed { .. }));
    }

    #[test]
    fn test_load_folds() {
        let folds = load_folds(&PathBuf::from("test_data/folds.tsv")).unwrap();
        assert_eq!(folds.len(), 5);
        match &folds[0] {
            ParsedRecord::Record(f) => {
                assert_eq!(f.locus(), Locus::new(100, 400).unwrap());
                assert_eq!(f.log_fold(), -0.9);
                assert_eq!(f.q_value(), Some(0.01));
            },
            ParsedRecord::Malformed { reason } => panic!("unexpected malformed row: {reason}")
        };
        // NA q-value means the test was not run
        assert!(matches!(&folds[2], ParsedRecord::Record(f) if f.q_value().is_none()));
        assert!(matches!(&folds[4], ParsedRecord::Malformed { .. }));
    }

    #[test]
    fn test_load_fusions() {
        let fusions = load_fusions(&PathBuf::from("test_data/fusions.tsv")).unwrap();
        assert_eq!(fusions.len(), 7);
        match &fusions[1] {
            ParsedRecord::Record(f) => {
                // written upper breakpoint first
                assert_eq!(f.locus(), Locus::new(1200, 5000).unwrap());
                assert!(f.is_intra_chromosomal());
                assert_eq!(f.reads(), 12);
            },
            ParsedRecord::Malformed { reason } => panic!("unexpected malformed row: {reason}")
        };
        assert!(matches!(&fusions[6], ParsedRecord::Malformed { .. }));
    }
}
