use serde::Serialize;
use std::path::Path;

use crate::data_types::classification::Classification;
use crate::data_types::detected::DetectedRecord;
use crate::data_types::locus::Located;
use crate::variant_classifier::VariantClassification;
use crate::writers::summary::open_delimited_writer;

/// One reference sequin of the evaluated class
#[derive(Debug, Serialize)]
struct SequinRow {
    label: String,
    sequin_id: String,
    chrom: String,
    position: u64,
    #[serde(rename = "ref")]
    ref_allele: String,
    #[serde(rename = "alt")]
    alt_allele: String,
    mutation: String,
    genotype: String,
    context: String,
    /// expected allele frequency in the chosen mixture
    expected: Option<f64>,
    /// TP or FN
    classification: String,
    /// number of records that matched this sequin
    detections: u64,
    observed_depth: Option<u64>,
    observed_af: Option<f64>,
    quality: Option<f32>
}

/// One scored call
#[derive(Debug, Serialize)]
struct DetectedRow {
    label: String,
    chrom: String,
    position: u64,
    #[serde(rename = "ref")]
    ref_allele: String,
    #[serde(rename = "alt")]
    alt_allele: String,
    mutation: String,
    genotype: Option<String>,
    depth: Option<u64>,
    allele_frequency: Option<f64>,
    quality: Option<f32>,
    filter_passed: bool,
    /// TP or FP
    classification: String,
    /// sequin matched by position, if any
    sequin_id: Option<String>,
    ref_matched: bool,
    alt_matched: bool
}

/// Writes one row per reference sequin with its TP/FN outcome
/// # Arguments
/// * `filename` - the output path (tsv/csv)
/// * `label` - run label to go on each row
/// * `classification` - the scored run
pub fn write_sequins(filename: &Path, label: &str, classification: &VariantClassification) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    let mixture = classification.mixture();
    for (entity, record) in classification.entity_outcomes() {
        let outcome = if record.is_some() { Classification::TruePositive } else { Classification::FalseNegative };
        let row = SequinRow {
            label: label.to_string(),
            sequin_id: entity.id().to_string(),
            chrom: entity.chrom().to_string(),
            position: entity.locus().start(),
            ref_allele: entity.ref_allele().to_string(),
            alt_allele: entity.alt_allele().to_string(),
            mutation: entity.kind().to_string(),
            genotype: entity.genotype().to_string(),
            context: entity.context().map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            expected: entity.abundance(mixture),
            classification: outcome.as_ref().to_string(),
            detections: classification.histogram().get(entity.id()).copied().unwrap_or(0),
            observed_depth: record.and_then(|r| r.depth()),
            observed_af: record.and_then(|r| r.allele_frequency()),
            quality: record.and_then(|r| r.quality())
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes one row per TP or FP call, in genomic order
/// # Arguments
/// * `filename` - the output path (tsv/csv)
/// * `label` - run label to go on each row
/// * `classification` - the scored run
pub fn write_detected(filename: &Path, label: &str, classification: &VariantClassification) -> csv::Result<()> {
    let mut scored: Vec<_> = classification.true_positives().iter()
        .chain(classification.false_positives().iter())
        .filter_map(|m| m.record().map(|r| (r, m)))
        .collect();
    scored.sort_by(|a, b| (a.0.chrom(), a.0.locus()).cmp(&(b.0.chrom(), b.0.locus())));

    let mut csv_writer = open_delimited_writer(filename)?;
    for (record, result) in scored.into_iter() {
        let row = DetectedRow {
            label: label.to_string(),
            chrom: record.chrom().to_string(),
            position: record.position(),
            ref_allele: record.ref_allele().to_string(),
            alt_allele: record.alt_allele().to_string(),
            mutation: record.kind().to_string(),
            genotype: record.genotype().map(|g| g.to_string()),
            depth: record.depth(),
            allele_frequency: record.allele_frequency(),
            quality: record.quality(),
            filter_passed: record.filter_passed(),
            classification: result.classification().as_ref().to_string(),
            sequin_id: result.entity().map(|e| e.id().to_string()),
            ref_matched: result.ref_allele_matched(),
            alt_matched: result.alt_allele_matched()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::detected::{DetectedVariant, ParsedRecord};
    use crate::data_types::sequins::{Genotype, VariantClass};
    use crate::reference::builder::{MixtureRecord, ReferenceBuilder, VariantAnnotation};
    use crate::reference::model::ReferenceModel;
    use crate::reference::regions::SequinRegions;
    use crate::variant_classifier::VariantClassifier;

    fn build_reference() -> ReferenceModel {
        let mut builder = ReferenceBuilder::new();
        builder.extend_variant_annotations(["V1", "V2"].iter().zip([500, 800]).map(|(id, position)| {
            VariantAnnotation {
                id: id.to_string(),
                chrom: "chrQ".to_string(),
                position,
                ref_allele: "A".to_string(),
                alt_allele: "T".to_string(),
                genotype: Genotype::Heterozygous,
                context: None,
                class: VariantClass::Germline
            }
        }));
        builder.extend_mixture_records([
            MixtureRecord { id: "V1".to_string(), mixture: "A".to_string(), abundance: 0.5 },
            MixtureRecord { id: "V2".to_string(), mixture: "A".to_string(), abundance: 0.25 }
        ]);
        builder.build_variants().unwrap()
    }

    fn read_lines(filename: &Path) -> Vec<String> {
        let text = std::fs::read_to_string(filename).unwrap();
        std::fs::remove_file(filename).unwrap();
        text.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_write_tables() {
        let reference = build_reference();
        let regions = SequinRegions::from_reference(&reference, 10).unwrap();
        let classifier = VariantClassifier::new(&reference, &regions, Default::default()).unwrap();
        let hit = DetectedVariant::new("chrQ".to_string(), 500, "A".to_string(), "T".to_string()).unwrap()
            .with_depth(Some(30))
            .with_allele_frequency(Some(0.4));
        let miss = DetectedVariant::new("chrQ".to_string(), 505, "C".to_string(), "G".to_string()).unwrap();
        let result = classifier.classify([ParsedRecord::Record(miss), ParsedRecord::Record(hit)]).unwrap();

        let temp_dir = std::env::temp_dir();
        let sequins_fn = temp_dir.join(format!("quokka_sequins_{}.tsv", std::process::id()));
        write_sequins(&sequins_fn, "run", &result).unwrap();
        let lines = read_lines(&sequins_fn);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "run\tV1\tchrQ\t500\tA\tT\tSNP\tHeterozygous\t-\t0.5\tTP\t1\t30\t0.4\t");
        assert!(lines[2].starts_with("run\tV2\t"));
        assert!(lines[2].contains("\tFN\t0\t"));

        let detected_fn = temp_dir.join(format!("quokka_detected_{}.csv", std::process::id()));
        write_detected(&detected_fn, "run", &result).unwrap();
        let lines = read_lines(&detected_fn);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("run,chrQ,500,"));
        assert!(lines[1].contains(",TP,V1,true,true"));
        assert!(lines[2].starts_with("run,chrQ,505,"));
        assert!(lines[2].ends_with(",FP,,false,false"));
    }
}
