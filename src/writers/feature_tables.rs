use serde::Serialize;
use std::path::Path;

use crate::alignment_classifier::AlignmentClassification;
use crate::data_types::locus::Located;
use crate::expression_classifier::ExpressionPoint;
use crate::fusion_classifier::FusionClassification;
use crate::writers::summary::open_delimited_writer;

/// One exon or intron no record matched
#[derive(Debug, Serialize)]
struct MissingRow<'a> {
    label: &'a str,
    kind: String,
    gene_id: &'a str,
    isoform_id: &'a str,
    chrom: &'a str,
    start: u64,
    end: u64
}

/// One measured entity
#[derive(Debug, Serialize)]
struct PointRow<'a> {
    label: &'a str,
    entity_id: &'a str,
    chrom: &'a str,
    start: u64,
    end: u64,
    /// value implied by the mixture
    expected: f64,
    measured: f64
}

/// One fusion call and what it was counted as
#[derive(Debug, Serialize)]
struct FusionRow<'a> {
    label: &'a str,
    chrom_1: &'a str,
    break_1: u64,
    strand_1: String,
    chrom_2: &'a str,
    break_2: u64,
    strand_2: String,
    reads: u64,
    outcome: String,
    sequin_id: &'a str
}

/// Writes the reference exons and introns that were never detected
/// # Arguments
/// * `filename` - the output path (tsv/csv)
/// * `label` - run label to go on each row
/// * `classification` - the scored alignment run
pub fn write_missing_features(filename: &Path, label: &str, classification: &AlignmentClassification) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    for &(chrom, feature) in classification.missing().iter() {
        let locus = feature.locus();
        let row = MissingRow {
            label,
            kind: feature.kind().to_string(),
            gene_id: feature.gene_id(),
            isoform_id: feature.isoform_id(),
            chrom,
            start: locus.start(),
            end: locus.end()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes expected versus measured values, one row per point.
/// Used for abundances, log fold changes and fusion read counts alike.
/// # Arguments
/// * `filename` - the output path (tsv/csv)
/// * `label` - run label to go on each row
/// * `points` - the matched records of a scored run
pub fn write_points(filename: &Path, label: &str, points: &[ExpressionPoint]) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    for point in points.iter() {
        let row = PointRow {
            label,
            entity_id: &point.entity_id,
            chrom: &point.chrom,
            start: point.locus.start(),
            end: point.locus.end(),
            expected: point.expected,
            measured: point.measured
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes every well-formed fusion call with its outcome
/// # Arguments
/// * `filename` - the output path (tsv/csv)
/// * `label` - run label to go on each row
/// * `classification` - the scored fusion run
pub fn write_fusions(filename: &Path, label: &str, classification: &FusionClassification) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    for outcome in classification.outcomes().iter() {
        let record = &outcome.record;
        let locus = record.locus();
        let (strand_1, strand_2) = record.breakpoints().strands();
        let row = FusionRow {
            label,
            chrom_1: record.chrom_1(),
            break_1: locus.start(),
            strand_1: strand_1.to_string(),
            chrom_2: record.chrom_2(),
            break_2: locus.end(),
            strand_2: strand_2.to_string(),
            reads: record.reads(),
            outcome: outcome.label.to_string(),
            sequin_id: outcome.entity_id.as_deref().unwrap_or(".")
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_classifier::AlignmentClassifier;
    use crate::data_types::detected::{DetectedExpression, DetectedFeature, DetectedFusion, FusionSide, ParsedRecord};
    use crate::data_types::locus::Locus;
    use crate::data_types::sequins::{FeatureKind, Strand};
    use crate::expression_classifier::ExpressionClassifier;
    use crate::fusion_classifier::FusionClassifier;
    use crate::reference::builder::{FusionAnnotation, MixtureRecord, ReferenceBuilder, TranscriptAnnotation};
    use crate::reference::model::ReferenceModel;

    /// R1_1: 100-200, 301-400
    fn build_reference() -> ReferenceModel {
        let mut builder = ReferenceBuilder::new();
        builder.extend_transcript_annotations([(100, 200), (301, 400)].into_iter().map(|(start, end)| {
            TranscriptAnnotation {
                isoform_id: "R1_1".to_string(),
                gene_id: "R1".to_string(),
                chrom: "chrT".to_string(),
                locus: Locus::new(start, end).unwrap()
            }
        }));
        builder.extend_mixture_records([
            MixtureRecord { id: "R1_1".to_string(), mixture: "A".to_string(), abundance: 8.0 }
        ]);
        builder.build_transcriptome().unwrap()
    }

    fn read_lines(filename: &Path) -> Vec<String> {
        let text = std::fs::read_to_string(filename).unwrap();
        std::fs::remove_file(filename).unwrap();
        text.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_write_missing_features() {
        let reference = build_reference();
        let classifier = AlignmentClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            ParsedRecord::Record(DetectedFeature::new("chrT".to_string(), Locus::new(120, 180).unwrap(), FeatureKind::Exon, 3))
        ]).unwrap();

        let filename = std::env::temp_dir().join(format!("quokka_missing_{}.tsv", std::process::id()));
        write_missing_features(&filename, "run", &result).unwrap();
        let lines = read_lines(&filename);
        assert_eq!(lines, vec![
            "label\tkind\tgene_id\tisoform_id\tchrom\tstart\tend".to_string(),
            "run\texon\tR1\tR1_1\tchrT\t301\t400".to_string(),
            "run\tintron\tR1\tR1_1\tchrT\t201\t300".to_string()
        ]);
    }

    #[test]
    fn test_write_points() {
        let reference = build_reference();
        let classifier = ExpressionClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            ParsedRecord::Record(DetectedExpression::new("chrT".to_string(), Locus::new(100, 400).unwrap(), 7.5))
        ]).unwrap();

        let filename = std::env::temp_dir().join(format!("quokka_expression_{}.csv", std::process::id()));
        write_points(&filename, "run", result.points()).unwrap();
        let lines = read_lines(&filename);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "run,R1_1,chrT,100,400,8.0,7.5");
    }

    #[test]
    fn test_write_fusions() {
        let mut builder = ReferenceBuilder::new();
        builder.extend_fusion_annotations([FusionAnnotation {
            id: "FG1".to_string(),
            chrom: "chrT".to_string(),
            break_1: 1200,
            strand_1: Strand::Forward,
            break_2: 5000,
            strand_2: Strand::Reverse
        }]);
        builder.add_mixture_record(MixtureRecord { id: "FG1".to_string(), mixture: "A".to_string(), abundance: 4.0 });
        let reference = builder.build_fusions().unwrap();

        let side = |chrom: &str, position: u64, strand: Strand| FusionSide { chrom: chrom.to_string(), position, strand };
        let classifier = FusionClassifier::new(&reference, Default::default()).unwrap();
        let result = classifier.classify([
            ParsedRecord::Record(DetectedFusion::new(side("chrT", 5000, Strand::Reverse), side("chrT", 1200, Strand::Forward), 9).unwrap()),
            ParsedRecord::Record(DetectedFusion::new(side("chr1", 10, Strand::Forward), side("chr2", 20, Strand::Forward), 2).unwrap())
        ]).unwrap();

        let filename = std::env::temp_dir().join(format!("quokka_fusions_{}.tsv", std::process::id()));
        write_fusions(&filename, "run", &result).unwrap();
        let lines = read_lines(&filename);
        assert_eq!(lines, vec![
            "label\tchrom_1\tbreak_1\tstrand_1\tchrom_2\tbreak_2\tstrand_2\treads\toutcome\tsequin_id".to_string(),
            "run\tchrT\t1200\t+\tchrT\t5000\t-\t9\tTP\tFG1".to_string(),
            "run\tchr1\t10\t+\tchr2\t20\t+\t2\tGENOME\t.".to_string()
        ]);
    }
}
