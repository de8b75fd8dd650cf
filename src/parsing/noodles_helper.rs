use anyhow::{Context, anyhow, bail};
use indexmap::IndexMap;
use log::debug;
use noodles::bed::io::reader::Builder as BedBuilder;
use noodles::bed::{io::Reader as BedReader, Record as BedRecord};
use noodles::vcf;
use std::io::BufReader;
use std::path::Path;

use crate::data_types::locus::Locus;

/// Wrapper function that handles both gzip compressed and uncompressed BED files
/// # Arguments
/// * `filename` - path to the .bed(.gz) file to open
pub fn open_bed_file(filename: &Path) -> anyhow::Result<BedReader<3, BufReader<Box<dyn std::io::Read>>>> {
    let is_compressed = filename.extension().is_some_and(|extension| extension == "gz");
    let buf_reader: Box<dyn std::io::Read> = if is_compressed {
        #[allow(clippy::default_constructed_unit_structs)]
        let bgzf_reader = noodles::bgzf::io::reader::Builder::default()
            .build_from_path(filename)
            .with_context(|| format!("Error while loading {filename:?}:"))?;
        Box::new(bgzf_reader)
    } else {
        Box::new(
            std::fs::File::open(filename)
                .with_context(|| format!("Error while opening {filename:?}:"))?
        )
    };

    #[allow(clippy::default_constructed_unit_structs)]
    let bed_reader = BedBuilder::<3>::default()
        .build_from_reader(buf_reader);
    Ok(bed_reader)
}

/// A pre-loaded BED file in 1-based inclusive loci, with chromosomes in file order and the loci sorted.
#[derive(Clone, Debug, Default)]
pub struct LoadedBed {
    /// Map from chromosome to the sorted loci
    chrom_lookup: IndexMap<String, Vec<Locus>>
}

impl LoadedBed {
    /// Loads an entire BED file into memory, sorting the loci of each chromosome if needed.
    /// # Arguments
    /// * `filename` - path to the .bed(.gz) file to open
    /// # Errors
    /// * if the file cannot be read
    /// * if a record is missing its end, or has an empty interval
    pub fn preload_bed_file(filename: &Path) -> anyhow::Result<Self> {
        debug!("Pre-loading {filename:?}...");
        let mut bed_handle = open_bed_file(filename)?;

        let mut record = BedRecord::<3>::default();
        let mut chrom_lookup: IndexMap<String, Vec<Locus>> = Default::default();
        while bed_handle.read_record(&mut record)
            .with_context(|| format!("Error while reading {filename:?}:"))? > 0 {
            let chrom = record.reference_sequence_name().to_string();
            // noodles converts the 0-based start to a 1-based position for us
            let start = record.feature_start()
                .with_context(|| format!("Error while parsing start for record: {record:?}"))?;
            let end = record.feature_end()
                .unwrap_or(Err(std::io::Error::other("Missing end")))
                .with_context(|| format!("Error while parsing end for record: {record:?}"))?;
            let locus = Locus::new(start.get() as u64, end.get() as u64)
                .with_context(|| format!("Error while parsing interval for record: {record:?}"))?;

            chrom_lookup.entry(chrom).or_default().push(locus);
        }

        for (chrom, loci) in chrom_lookup.iter_mut() {
            let num_entries = loci.len();
            if !loci.is_sorted() {
                debug!("Sorting {num_entries} BED entries for {chrom}...");
                loci.sort();
            } else {
                debug!("Found {num_entries} sorted BED entries for {chrom}.");
            }
        }

        Ok(Self {
            chrom_lookup
        })
    }

    /// Total number of loci across all chromosomes
    pub fn len(&self) -> usize {
        self.chrom_lookup.values().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // getters
    pub fn chrom_lookup(&self) -> &IndexMap<String, Vec<Locus>> {
        &self.chrom_lookup
    }
}

/// Finds the column of the sample to score in a VCF header.
/// Returns None if the file has no samples and no sample was requested.
/// # Arguments
/// * `vcf_header` - the parsed VCF header
/// * `sample` - requested sample name, the first sample if None
/// # Errors
/// * if the requested sample is not in the header
pub fn get_vcf_sample_index(vcf_header: &vcf::Header, sample: Option<&str>) -> anyhow::Result<Option<usize>> {
    let sample_names = vcf_header.sample_names();
    match sample {
        Some(name) => {
            let index = sample_names.get_index_of(name)
                .ok_or(anyhow!("Sample {name:?} was not found, options are: {sample_names:?}"))?;
            Ok(Some(index))
        },
        None if sample_names.is_empty() => Ok(None),
        None => Ok(Some(0))
    }
}

/// Opens a VCF (plain, bgzip, or BCF) and returns the sample name that would be scored
/// # Arguments
/// * `vcf_fn` - the VCF filename to open
/// * `sample` - requested sample name, the first sample if None
pub fn get_vcf_sample_name(vcf_fn: &Path, sample: Option<&str>) -> anyhow::Result<Option<String>> {
    use noodles_util::variant::io::reader::Builder as VcfBuilder;

    let mut vcf_reader = VcfBuilder::default()
        .build_from_path(vcf_fn)
        .with_context(|| format!("Error while opening {vcf_fn:?}:"))?;
    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {vcf_fn:?}:"))?;

    let sample_index = get_vcf_sample_index(&vcf_header, sample)?;
    match sample_index {
        Some(index) => {
            let name = vcf_header.sample_names().get_index(index)
                .ok_or(anyhow!("Sample index {index} does not exist."))?;
            Ok(Some(name.clone()))
        },
        None => {
            if sample.is_some() {
                bail!("{vcf_fn:?} does not contain any samples");
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_preload_bed() {
        let bed_fn = PathBuf::from("test_data/regions.bed");
        let loaded = LoadedBed::preload_bed_file(&bed_fn).unwrap();
        assert_eq!(loaded.len(), 3);

        // file order of chromosomes is kept, the loci are sorted
        let chroms: Vec<&String> = loaded.chrom_lookup().keys().collect();
        assert_eq!(chroms, vec!["chrQ", "chrR"]);
        assert_eq!(loaded.chrom_lookup()["chrQ"], vec![Locus::new(100, 200).unwrap(), Locus::new(401, 500).unwrap()]);
        assert_eq!(loaded.chrom_lookup()["chrR"], vec![Locus::new(1, 50).unwrap()]);
    }

    #[test]
    fn test_vcf_sample_name() {
        let vcf_fn = PathBuf::from("test_data/calls.vcf");
        assert_eq!(get_vcf_sample_name(&vcf_fn, None).unwrap(), Some("SAMPLE1".to_string()));
        assert_eq!(get_vcf_sample_name(&vcf_fn, Some("SAMPLE2")).unwrap(), Some("SAMPLE2".to_string()));
        assert!(get_vcf_sample_name(&vcf_fn, Some("MISSING")).is_err());
    }
}
