use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::alignment_classifier::AlignmentClassification;
use crate::data_types::confusion::{ConfusionError, ConfusionSnapshot};
use crate::data_types::stratified_metrics::StratificationAxis;
use crate::expression_classifier::ExpressionClassification;
use crate::fold_change_classifier::FoldChangeClassification;
use crate::fusion_classifier::FusionClassification;
use crate::variant_classifier::VariantClassification;

pub const BUCKET_JOINT_INDEL: &str = "JointIndel";
pub const LEVEL_BASE: &str = "BASE";
pub const LEVEL_EXON: &str = "EXON";
pub const LEVEL_INTRON: &str = "INTRON";
pub const LEVEL_DIFFERENTIAL: &str = "DIFFERENTIAL";
pub const LEVEL_FUSION: &str = "FUSION";

/// Opens a delimited writer, using "," if the file ends with .csv and tabs otherwise
/// # Arguments
/// * `filename` - the output path
pub fn open_delimited_writer(filename: &Path) -> csv::Result<csv::Writer<File>> {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
}

/// This is a wrapper for writing out summary stats to a file
#[derive(Default)]
pub struct SummaryWriter {
    /// Run label to go on each row
    label: String,
    /// Rows in the order they were added
    rows: Vec<SummaryRow>
}

/// Contains all the data written to each row of our summary file
#[derive(Debug, Serialize)]
struct SummaryRow {
    /// User provided label
    label: String,
    /// Mixture the expected abundances came from
    mixture: String,
    /// Stratification axis or feature level
    axis: String,
    /// Bucket within the axis
    bucket: String,
    /// Number of reference entities
    nr: u64,
    /// Number of scored records
    nq: u64,
    tp: u64,
    fp: u64,
    #[serde(rename = "fn")]
    fn_: u64,
    /// tp / nr
    sensitivity: f64,
    /// tp / (tp + fp)
    precision: f64,
    f1: f64,
    fdr: f64
}

impl SummaryRow {
    /// Creates a new row from labels and a snapshot, undefined metrics stay NaN
    fn new(label: String, mixture: String, axis: String, bucket: String, snapshot: ConfusionSnapshot) -> Self {
        Self {
            label, mixture, axis, bucket,
            nr: snapshot.nr,
            nq: snapshot.nq,
            tp: snapshot.tp,
            fp: snapshot.fp,
            fn_: snapshot.fn_,
            sensitivity: snapshot.sensitivity,
            precision: snapshot.precision,
            f1: snapshot.f1,
            fdr: snapshot.fdr
        }
    }
}

impl SummaryWriter {
    /// Creates a new writer to accumulate rows
    pub fn new(label: String) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }

    fn push(&mut self, mixture: &str, axis: &str, bucket: &str, snapshot: ConfusionSnapshot) {
        self.rows.push(SummaryRow::new(
            self.label.clone(), mixture.to_string(), axis.to_string(), bucket.to_string(), snapshot
        ));
    }

    /// Adds one row per stratification bucket plus the joint indel row
    /// # Arguments
    /// * `classification` - the germline/somatic result
    /// # Errors
    /// * if any bucket has more true positives than reference entities
    pub fn add_variant_classification(&mut self, classification: &VariantClassification) -> Result<(), ConfusionError> {
        let mixture = classification.mixture();
        let metrics = classification.confusion();
        let mut previous_axis = StratificationAxis::All;
        for (axis, bucket, counter) in metrics.buckets() {
            if previous_axis == StratificationAxis::Mutation && axis != StratificationAxis::Mutation {
                // joint indel closes the mutation block
                self.push(mixture, &previous_axis.to_string(), BUCKET_JOINT_INDEL, metrics.joint_indel().snapshot()?);
            }
            self.push(mixture, &axis.to_string(), &bucket, counter.snapshot()?);
            previous_axis = axis;
        }
        Ok(())
    }

    /// Adds the base, exon and intron level rows
    /// # Errors
    /// * if any level has more true positives than reference features
    pub fn add_alignment_classification(&mut self, classification: &AlignmentClassification) -> Result<(), ConfusionError> {
        let mixture = classification.mixture();
        self.push(mixture, LEVEL_BASE, "ALL", classification.bases().snapshot()?);
        self.push(mixture, LEVEL_EXON, "ALL", classification.exons().snapshot()?);
        self.push(mixture, LEVEL_INTRON, "ALL", classification.introns().snapshot()?);
        Ok(())
    }

    /// Adds the entity-level row for isoforms or genes
    /// # Errors
    /// * if more entities were detected than exist
    pub fn add_expression_classification(&mut self, classification: &ExpressionClassification) -> Result<(), ConfusionError> {
        let level = classification.level().to_string().to_ascii_uppercase();
        self.push(classification.mixture(), &level, "ALL", classification.confusion().snapshot()?);
        Ok(())
    }

    /// Adds the entity-level row and the differential call row.
    /// The mixture column reads "comparison/baseline", the direction of the fold.
    /// # Errors
    /// * if either counter has more true positives than reference entities
    pub fn add_fold_change_classification(&mut self, classification: &FoldChangeClassification) -> Result<(), ConfusionError> {
        let mixture = format!("{}/{}", classification.comparison(), classification.mixture());
        let level = classification.level().to_string().to_ascii_uppercase();
        self.push(&mixture, &level, "ALL", classification.confusion().snapshot()?);
        self.push(&mixture, LEVEL_DIFFERENTIAL, "ALL", classification.differential().snapshot()?);
        Ok(())
    }

    /// Adds the fusion row
    /// # Errors
    /// * if more fusions were detected than exist
    pub fn add_fusion_classification(&mut self, classification: &FusionClassification) -> Result<(), ConfusionError> {
        self.push(classification.mixture(), LEVEL_FUSION, "ALL", classification.confusion().snapshot()?);
        Ok(())
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        let mut csv_writer = open_delimited_writer(filename)?;
        for row in self.rows.iter() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::confusion::ConfusionCounter;
    use crate::data_types::detected::{DetectedFold, DetectedVariant, ParsedRecord};
    use crate::data_types::locus::Locus;
    use crate::data_types::sequins::{Genotype, VariantClass};
    use crate::fold_change_classifier::FoldChangeClassifier;
    use crate::reference::builder::{MixtureRecord, ReferenceBuilder, TranscriptAnnotation, VariantAnnotation};
    use crate::reference::regions::SequinRegions;
    use crate::variant_classifier::VariantClassifier;

    fn variant(id: &str, position: u64, ref_allele: &str, alt_allele: &str) -> VariantAnnotation {
        VariantAnnotation {
            id: id.to_string(),
            chrom: "chrQ".to_string(),
            position,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
            genotype: Genotype::Heterozygous,
            context: None,
            class: VariantClass::Germline
        }
    }

    #[test]
    fn test_row_keeps_nan() {
        let snapshot = ConfusionCounter::new(0, 0, 4).snapshot().unwrap();
        let row = SummaryRow::new("run".to_string(), "A".to_string(), "ALL".to_string(), "ALL".to_string(), snapshot);
        assert_eq!(row.fn_, 4);
        assert_eq!(row.sensitivity, 0.0);
        assert!(row.precision.is_nan());
        assert!(row.f1.is_nan());
    }

    #[test]
    fn test_write_summary() {
        let mut writer = SummaryWriter::new("run".to_string());
        writer.push("A", "ALL", "ALL", ConfusionCounter::new(3, 1, 4).snapshot().unwrap());
        writer.push("A", "GC", "GC", ConfusionCounter::default().snapshot().unwrap());

        let filename = std::env::temp_dir().join(format!("quokka_summary_{}.csv", std::process::id()));
        writer.write_summary(&filename).unwrap();
        let text = std::fs::read_to_string(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "label,mixture,axis,bucket,nr,nq,tp,fp,fn,sensitivity,precision,f1,fdr");
        assert_eq!(lines[1], "run,A,ALL,ALL,4,4,3,1,1,0.75,0.75,0.75,0.25");
        assert_eq!(lines[2], "run,A,GC,GC,0,0,0,0,0,NaN,NaN,NaN,NaN");
    }

    #[test]
    fn test_variant_rows() {
        let mut builder = ReferenceBuilder::new();
        builder.extend_variant_annotations([
            variant("V1", 500, "A", "T"),
            variant("V2", 800, "CAT", "C")
        ]);
        builder.extend_mixture_records([
            MixtureRecord { id: "V1".to_string(), mixture: "A".to_string(), abundance: 0.5 },
            MixtureRecord { id: "V2".to_string(), mixture: "A".to_string(), abundance: 0.25 }
        ]);
        let reference = builder.build_variants().unwrap();
        let regions = SequinRegions::from_reference(&reference, 10).unwrap();
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();
        let call = DetectedVariant::new("chrQ".to_string(), 800, "CAT".to_string(), "C".to_string()).unwrap();
        let result = classifier.classify([ParsedRecord::Record(call)]).unwrap();

        let mut writer = SummaryWriter::new("run".to_string());
        writer.add_variant_classification(&result).unwrap();
        let buckets: Vec<(&str, &str)> = writer.rows.iter().map(|r| (r.axis.as_str(), r.bucket.as_str())).collect();
        assert_eq!(&buckets[0..5], &[
            ("ALL", "ALL"), ("MUTATION", "SNP"), ("MUTATION", "Insertion"), ("MUTATION", "Deletion"), ("MUTATION", BUCKET_JOINT_INDEL)
        ]);

        let joint = &writer.rows[4];
        assert_eq!((joint.nr, joint.tp, joint.fn_), (1, 1, 0));
        let snp = &writer.rows[1];
        assert_eq!((snp.nr, snp.tp, snp.fn_), (1, 0, 1));
        assert!(snp.precision.is_nan());
    }

    #[test]
    fn test_fold_change_rows() {
        let mut builder = ReferenceBuilder::new();
        builder.extend_transcript_annotations([("R1_1", 100, 200), ("R2_1", 1000, 1100)].into_iter().map(|(id, start, end)| {
            TranscriptAnnotation {
                isoform_id: id.to_string(),
                gene_id: id[0..2].to_string(),
                chrom: "chrT".to_string(),
                locus: Locus::new(start, end).unwrap()
            }
        }));
        builder.extend_mixture_records([
            MixtureRecord { id: "R1_1".to_string(), mixture: "A".to_string(), abundance: 1.0 },
            MixtureRecord { id: "R1_1".to_string(), mixture: "B".to_string(), abundance: 4.0 },
            MixtureRecord { id: "R2_1".to_string(), mixture: "A".to_string(), abundance: 1.0 },
            MixtureRecord { id: "R2_1".to_string(), mixture: "B".to_string(), abundance: 1.0 }
        ]);
        let reference = builder.build_transcriptome().unwrap();
        let classifier = FoldChangeClassifier::new(&reference, Default::default()).unwrap();
        let fold = DetectedFold::new("chrT".to_string(), Locus::new(100, 200).unwrap(), 1.8, Some(0.01));
        let result = classifier.classify([ParsedRecord::Record(fold)]).unwrap();

        let mut writer = SummaryWriter::new("run".to_string());
        writer.add_fold_change_classification(&result).unwrap();
        assert_eq!(writer.rows.len(), 2);
        assert_eq!(writer.rows[0].mixture, "B/A");
        assert_eq!((writer.rows[0].axis.as_str(), writer.rows[0].nr, writer.rows[0].tp), ("ISOFORM", 2, 1));
        assert_eq!((writer.rows[1].axis.as_str(), writer.rows[1].nr, writer.rows[1].tp), (LEVEL_DIFFERENTIAL, 1, 1));
    }
}
