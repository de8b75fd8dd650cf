use anyhow::{Context, anyhow, bail, ensure};
use indexmap::IndexMap;
use log::debug;
use std::path::Path;

use crate::reference::builder::MixtureRecord;

/// Suffixes marking the reference and variant halves of an allele-pair sequin
const REFERENCE_SUFFIX: &str = "_R";
const VARIANT_SUFFIX: &str = "_V";

/// Loads a mixture table: the first column is the sequin id, an optional `length` column is ignored,
/// and every other column is a mixture whose cells are abundances.
/// The file is comma-delimited unless it ends in .tsv or .txt.
/// # Arguments
/// * `filename` - the mixture file
/// # Errors
/// * if the file cannot be read
/// * if there are no mixture columns, or a cell is not a number
pub fn load_mixture(filename: &Path) -> anyhow::Result<Vec<MixtureRecord>> {
    let is_tab = filename.extension().is_some_and(|ext| ext == "tsv" || ext == "txt");
    let delimiter: u8 = if is_tab { b'\t' } else { b',' };
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    let headers = csv_reader.headers()
        .with_context(|| format!("Error while reading header of {filename:?}:"))?
        .clone();
    let mixture_columns: Vec<(usize, String)> = headers.iter().enumerate()
        .skip(1)
        .filter(|(_i, name)| !name.trim().eq_ignore_ascii_case("length"))
        .map(|(i, name)| (i, name.trim().to_string()))
        .collect();
    ensure!(!mixture_columns.is_empty(), "No mixture columns found in {filename:?}");

    let mut ret = vec![];
    for (row_index, result) in csv_reader.records().enumerate() {
        let row = result.with_context(|| format!("Error while reading row #{} of {filename:?}:", row_index + 1))?;
        let id = row.get(0)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(anyhow!("Missing sequin id on row #{} of {filename:?}", row_index + 1))?;

        for (column, mixture) in mixture_columns.iter() {
            let cell = row.get(*column)
                .ok_or(anyhow!("Missing {mixture} value for {id}"))?
                .trim();
            let abundance: f64 = cell.parse()
                .with_context(|| format!("Error while parsing {mixture} value {cell:?} for {id}:"))?;
            if abundance < 0.0 || !abundance.is_finite() {
                bail!("Invalid {mixture} value {cell:?} for {id}");
            }
            ret.push(MixtureRecord {
                id: id.to_string(),
                mixture: mixture.clone(),
                abundance
            });
        }
    }
    debug!("Loaded {} mixture values from {filename:?}", ret.len());
    Ok(ret)
}

/// Collapses `<base>_R` / `<base>_V` pairs into a single record for `<base>` with the allele frequency V / (R + V).
/// Unpaired ids pass through unchanged; a pair with no molecules at all gets a frequency of 0.
/// # Arguments
/// * `records` - the mixture records, in file order
pub fn collapse_allele_pairs(records: Vec<MixtureRecord>) -> Vec<MixtureRecord> {
    // (base, mixture) -> (R, V), in order of first appearance
    let mut pairs: IndexMap<(String, String), (Option<f64>, Option<f64>)> = Default::default();
    let mut ret: Vec<MixtureRecord> = vec![];
    for record in records.into_iter() {
        if let Some(base) = record.id.strip_suffix(REFERENCE_SUFFIX) {
            pairs.entry((base.to_string(), record.mixture.clone())).or_default().0 = Some(record.abundance);
        } else if let Some(base) = record.id.strip_suffix(VARIANT_SUFFIX) {
            pairs.entry((base.to_string(), record.mixture.clone())).or_default().1 = Some(record.abundance);
        } else {
            ret.push(record);
        }
    }

    for ((base, mixture), (reference, variant)) in pairs.into_iter() {
        match (reference, variant) {
            (Some(r), Some(v)) => {
                let total = r + v;
                let abundance = if total > 0.0 { v / total } else { 0.0 };
                ret.push(MixtureRecord { id: base, mixture, abundance });
            },
            (Some(r), None) => {
                debug!("No {VARIANT_SUFFIX} partner for {base}{REFERENCE_SUFFIX}");
                ret.push(MixtureRecord { id: format!("{base}{REFERENCE_SUFFIX}"), mixture, abundance: r });
            },
            (None, Some(v)) => {
                debug!("No {REFERENCE_SUFFIX} partner for {base}{VARIANT_SUFFIX}");
                ret.push(MixtureRecord { id: format!("{base}{VARIANT_SUFFIX}"), mixture, abundance: v });
            },
            (None, None) => {}
        }
    }
    ret
}
