use anyhow::{Context, anyhow, bail};
use log::{debug, trace};
use noodles::vcf;
use noodles::vcf::variant::record::samples::keys::key as vcf_key;
use noodles::vcf::variant::record_buf::samples::sample::Value as SampleValue;
use noodles::vcf::variant::record_buf::samples::sample::value::Array as SampleArray;
use noodles::vcf::variant::record_buf::info::field::Value as InfoValue;
use noodles_util::variant::io::reader::Builder as VcfBuilder;
use std::path::Path;

use crate::data_types::detected::{DetectedVariant, ParsedRecord};
use crate::data_types::sequins::Genotype;
use crate::parsing::noodles_helper::get_vcf_sample_index;

/// Streams every ALT allele of every record in a VCF file into `callback`.
/// Records that cannot be converted are passed along as `ParsedRecord::Malformed`.
/// # Arguments
/// * `vcf_fn` - the VCF/BCF file, optionally compressed
/// * `sample` - the sample to pull genotypes from, the first sample if None
/// * `callback` - receives each parsed call in file order
/// # Errors
/// * if the file or header cannot be read, or the sample does not exist
pub fn for_each_call<F>(vcf_fn: &Path, sample: Option<&str>, mut callback: F) -> anyhow::Result<u64>
where
    F: FnMut(ParsedRecord<DetectedVariant>)
{
    let mut vcf_reader = VcfBuilder::default()
        .build_from_path(vcf_fn)
        .with_context(|| format!("Error while opening {vcf_fn:?}:"))?;
    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {vcf_fn:?}:"))?;
    let sample_index = get_vcf_sample_index(&vcf_header, sample)
        .with_context(|| format!("Error while locating sample in {vcf_fn:?}:"))?;

    let mut record_count: u64 = 0;
    for result in vcf_reader.records(&vcf_header) {
        record_count += 1;
        let record: Box<dyn vcf::variant::Record> = match result {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                callback(ParsedRecord::Malformed { reason: format!("record #{record_count}: {e}") });
                continue;
            },
            Err(e) => {
                return Err(e).with_context(|| format!("Error while reading record #{record_count} of {vcf_fn:?}:"));
            }
        };

        let record_buf = match vcf::variant::RecordBuf::try_from_variant_record(&vcf_header, record.as_ref()) {
            Ok(rb) => rb,
            Err(e) => {
                callback(ParsedRecord::Malformed { reason: format!("record #{record_count}: {e}") });
                continue;
            }
        };

        match parse_calls(&record_buf, sample_index) {
            Ok(calls) => {
                for call in calls.into_iter() {
                    callback(call);
                }
            },
            Err(e) => {
                callback(ParsedRecord::Malformed { reason: format!("record #{record_count}: {e:#}") });
            }
        }
    }

    debug!("Parsed {record_count} records from {vcf_fn:?}");
    Ok(record_count)
}

/// Loads every call into memory, for the per-chromosome parallel scoring
/// # Arguments
/// * `vcf_fn` - the VCF/BCF file, optionally compressed
/// * `sample` - the sample to pull genotypes from, the first sample if None
pub fn load_calls(vcf_fn: &Path, sample: Option<&str>) -> anyhow::Result<Vec<ParsedRecord<DetectedVariant>>> {
    let mut ret = vec![];
    for_each_call(vcf_fn, sample, |call| ret.push(call))?;
    Ok(ret)
}

/// Converts one record into one call per ALT allele.
/// An error means the whole record is unusable; an individual bad ALT becomes a malformed entry.
/// # Arguments
/// * `record` - the record to parse
/// * `sample_index` - column of the sample to pull genotypes from
fn parse_calls(record: &vcf::variant::RecordBuf, sample_index: Option<usize>) -> anyhow::Result<Vec<ParsedRecord<DetectedVariant>>> {
    let chrom = record.reference_sequence_name();
    let position = record.variant_start().ok_or(anyhow!("Missing POS"))?.get() as u64;
    let ref_allele = record.reference_bases();
    let alts = record.alternate_bases().as_ref();
    if alts.is_empty() {
        bail!("No ALT alleles at {chrom}:{position}");
    }

    let filters = record.filters().as_ref();
    let filter_passed = !filters.is_empty() && filters.iter().all(|f| f == "PASS");
    let quality = record.quality_score();
    let p_value = info_float(record, "PVAL");

    let sample = match sample_index {
        Some(index) => Some(
            record.samples().get_index(index)
                .ok_or(anyhow!("Sample index {index} missing at {chrom}:{position}"))?
        ),
        None => None
    };
    let depth = sample.as_ref()
        .and_then(|s| s.get(vcf_key::READ_DEPTH).flatten())
        .and_then(value_to_depth)
        .or_else(|| info_depth(record));

    let mut ret = vec![];
    for (alt_offset, alt_allele) in alts.iter().enumerate() {
        // symbolic, breakend and spanning deletion ALTs cannot match a sequin
        if alt_allele.starts_with('<') || alt_allele.contains(['[', ']']) || alt_allele == "*" || alt_allele == "." {
            ret.push(ParsedRecord::Malformed { reason: format!("unsupported ALT {alt_allele:?} at {chrom}:{position}") });
            continue;
        }

        let alt_index = alt_offset + 1;
        let (genotype, allele_frequency) = match sample.as_ref() {
            Some(s) => {
                let genotype = s.get(vcf_key::GENOTYPE).flatten().and_then(|gt| parse_genotype(gt, alt_index));
                let allele_frequency = s.get("AF").flatten()
                    .and_then(|af| value_to_float(af, alt_offset))
                    .or_else(|| s.get(vcf_key::READ_DEPTHS).flatten().and_then(|ad| allele_depth_fraction(ad, alt_index)));
                (genotype, allele_frequency)
            },
            None => (None, None)
        };

        let call = match DetectedVariant::new(chrom.to_string(), position, ref_allele.to_string(), alt_allele.to_string()) {
            Ok(c) => c,
            Err(e) => {
                ret.push(ParsedRecord::Malformed { reason: format!("{e} at {chrom}:{position}") });
                continue;
            }
        };
        let call = call
            .with_filter_passed(filter_passed)
            .with_quality(quality)
            .with_depth(depth)
            .with_allele_frequency(allele_frequency)
            .with_genotype(genotype)
            .with_p_value(p_value);
        trace!("Parsed {call:?}");
        ret.push(ParsedRecord::Record(call));
    }
    Ok(ret)
}

/// Genotype of one ALT allele from the GT field; hom-ref, missing, and non-carriers are None
/// # Arguments
/// * `gt` - the GT field from the record
/// * `alt_index` - 1-based index of the ALT allele
fn parse_genotype(gt: &SampleValue, alt_index: usize) -> Option<Genotype> {
    let SampleValue::Genotype(genotype) = gt else {
        return None;
    };
    let positions: Vec<usize> = genotype.as_ref().iter()
        .map(|allele| allele.position())
        .collect::<Option<_>>()?;

    let carried = positions.iter().filter(|&&p| p == alt_index).count();
    if carried == 0 {
        None
    } else if carried == positions.len() {
        Some(Genotype::Homozygous)
    } else {
        Some(Genotype::Heterozygous)
    }
}

/// Pulls a float out of a scalar or an array value, arrays are indexed by `offset`
fn value_to_float(value: &SampleValue, offset: usize) -> Option<f64> {
    match value {
        SampleValue::Float(f) => Some(*f as f64),
        SampleValue::Integer(i) => Some(*i as f64),
        SampleValue::Array(SampleArray::Float(values)) => values.get(offset).copied().flatten().map(|f| f as f64),
        SampleValue::Array(SampleArray::Integer(values)) => values.get(offset).copied().flatten().map(|i| i as f64),
        _ => None
    }
}

fn value_to_depth(value: &SampleValue) -> Option<u64> {
    match value {
        SampleValue::Integer(i) => u64::try_from(*i).ok(),
        _ => None
    }
}

/// ALT reads over all reads from the AD field
fn allele_depth_fraction(value: &SampleValue, alt_index: usize) -> Option<f64> {
    let SampleValue::Array(SampleArray::Integer(depths)) = value else {
        return None;
    };
    let alt_depth = depths.get(alt_index).copied().flatten()?;
    let total: i32 = depths.iter().map(|d| d.unwrap_or(0)).sum();
    if total > 0 {
        Some(alt_depth as f64 / total as f64)
    } else {
        None
    }
}

fn info_depth(record: &vcf::variant::RecordBuf) -> Option<u64> {
    match record.info().get("DP").flatten() {
        Some(InfoValue::Integer(i)) => u64::try_from(*i).ok(),
        _ => None
    }
}

fn info_float(record: &vcf::variant::RecordBuf, key: &str) -> Option<f64> {
    match record.info().get(key).flatten() {
        Some(InfoValue::Float(f)) => Some(*f as f64),
        Some(InfoValue::Integer(i)) => Some(*i as f64),
        _ => None
    }
}
