use anyhow::{Context, bail};
use coitrees::{COITree, Interval, IntervalTree};
use std::collections::BTreeMap;
use std::path::Path;

use crate::data_types::locus::{Located, Locus};
use crate::parsing::noodles_helper::LoadedBed;
use crate::reference::model::ReferenceModel;

/// The evaluable territory of a run: merged sequin regions with interval-tree lookups.
/// Records outside these regions are neither TP nor FP.
pub struct SequinRegions {
    /// Merged, sorted regions per chromosome
    regions: BTreeMap<String, Vec<Locus>>,
    /// Lookup from a chromosome to a COITree over `regions`, 1-based inclusive; metadata is the region index
    lookup_trees: BTreeMap<String, COITree<usize, usize>>
}

impl std::fmt::Debug for SequinRegions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // COITree does not have Debug, so lets just report the region counts
        let region_counts: BTreeMap<&String, usize> = self.regions.iter()
            .map(|(chrom, r)| (chrom, r.len()))
            .collect();
        f.debug_struct("SequinRegions").field("region_counts", &region_counts).finish()
    }
}

impl SequinRegions {
    /// Builds the region set from loci per chromosome; overlapping and adjacent loci are merged first.
    /// # Errors
    /// * if a coordinate does not fit in the interval tree
    pub fn from_loci(loci: BTreeMap<String, Vec<Locus>>) -> anyhow::Result<Self> {
        let mut regions: BTreeMap<String, Vec<Locus>> = Default::default();
        let mut lookup_trees: BTreeMap<String, COITree<usize, usize>> = Default::default();
        for (chrom, chrom_loci) in loci.into_iter() {
            let merged = Locus::merge(&chrom_loci);
            let coi_intervals: Vec<Interval<usize>> = merged.iter().enumerate()
                .map(|(index, l)| {
                    let first = i32::try_from(l.start())
                        .with_context(|| format!("Region start out of range on {chrom}: {l}"))?;
                    let last = i32::try_from(l.end())
                        .with_context(|| format!("Region end out of range on {chrom}: {l}"))?;
                    Ok(Interval::new(first, last, index))
                })
                .collect::<anyhow::Result<_>>()?;

            let coi_tree = COITree::new(&coi_intervals);
            lookup_trees.insert(chrom.clone(), coi_tree);
            regions.insert(chrom, merged);
        }

        Ok(Self {
            regions,
            lookup_trees
        })
    }

    /// Loads the regions from a BED file
    /// # Arguments
    /// * `bed_fn` - path to the .bed(.gz) file
    pub fn from_bed(bed_fn: &Path) -> anyhow::Result<Self> {
        let loaded_bed = LoadedBed::preload_bed_file(bed_fn)?;
        if loaded_bed.is_empty() {
            bail!("No regions found in {bed_fn:?}");
        }
        let loci: BTreeMap<String, Vec<Locus>> = loaded_bed.chrom_lookup().iter()
            .map(|(chrom, chrom_loci)| (chrom.clone(), chrom_loci.clone()))
            .collect();
        Self::from_loci(loci)
            .with_context(|| format!("Error while indexing regions from {bed_fn:?}:"))
    }

    /// Derives the regions from the variant entities in a model, padding each by `flank` bp.
    /// # Arguments
    /// * `reference` - the variant reference model
    /// * `flank` - number of bases added on each side of each variant
    pub fn from_reference(reference: &ReferenceModel, flank: u64) -> anyhow::Result<Self> {
        let loci: BTreeMap<String, Vec<Locus>> = reference.chromosomes()
            .filter_map(|chrom| {
                let data = reference.chrom(chrom)?;
                let chrom_loci: Vec<Locus> = data.variants().iter()
                    .map(|v| v.locus().pad(flank))
                    .chain(data.transcripts().iter().map(|t| t.locus().pad(flank)))
                    .collect();
                Some((chrom.to_string(), chrom_loci))
            })
            .collect();
        Self::from_loci(loci)
    }

    /// Returns the merged region that fully contains `locus`, if any
    /// # Arguments
    /// * `chrom` - the chromosome
    /// * `locus` - the 1-based inclusive locus to test
    pub fn containing_region(&self, chrom: &str, locus: &Locus) -> Option<Locus> {
        let coi_tree = self.lookup_trees.get(chrom)?;
        let regions = self.regions.get(chrom)?;
        let (first, last) = (i32::try_from(locus.start()).ok()?, i32::try_from(locus.end()).ok()?);

        let mut found: Option<usize> = None;
        coi_tree.query(first, last, |i| {
            if i.first <= first && i.last >= last {
                found = Some(i.metadata.to_owned());
            }
        });
        found.and_then(|index| regions.get(index).copied())
    }

    /// Returns true if `locus` is fully inside one merged region
    pub fn contains(&self, chrom: &str, locus: &Locus) -> bool {
        self.containing_region(chrom, locus).is_some()
    }

    /// Returns true if `locus` overlaps at least one region
    pub fn overlaps(&self, chrom: &str, locus: &Locus) -> bool {
        match (self.lookup_trees.get(chrom), i32::try_from(locus.start()), i32::try_from(locus.end())) {
            (Some(coi_tree), Ok(first), Ok(last)) => coi_tree.query_count(first, last) > 0,
            _ => false
        }
    }

    /// Total number of merged regions
    pub fn len(&self) -> usize {
        self.regions.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // getters
    pub fn regions(&self) -> &BTreeMap<String, Vec<Locus>> {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn locus(start: u64, end: u64) -> Locus {
        Locus::new(start, end).unwrap()
    }

    #[test]
    fn test_from_loci() {
        let mut loci: BTreeMap<String, Vec<Locus>> = Default::default();
        loci.insert("chrQ".to_string(), vec![locus(100, 200), locus(150, 250), locus(251, 260), locus(400, 500)]);
        let regions = SequinRegions::from_loci(loci).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions.regions()["chrQ"], vec![locus(100, 260), locus(400, 500)]);

        // containment is against the merged set, so this spans two input loci but one region
        assert_eq!(regions.containing_region("chrQ", &locus(190, 255)), Some(locus(100, 260)));
        assert!(regions.contains("chrQ", &locus(100, 100)));
        assert!(regions.contains("chrQ", &locus(500, 500)));
        assert!(!regions.contains("chrQ", &locus(99, 100)));
        assert!(!regions.contains("chrQ", &locus(300, 300)));
        assert!(!regions.contains("chrX", &locus(150, 150)));

        assert!(regions.overlaps("chrQ", &locus(99, 100)));
        assert!(!regions.overlaps("chrQ", &locus(261, 399)));
    }

    #[test]
    fn test_from_bed() {
        let bed_fn = PathBuf::from("test_data/regions.bed");
        let regions = SequinRegions::from_bed(&bed_fn).unwrap();
        assert_eq!(regions.len(), 3);

        // BED is 0-based half-open: "chrQ 99 200" covers 1-based 100-200
        assert!(regions.contains("chrQ", &locus(100, 100)));
        assert!(regions.contains("chrQ", &locus(200, 200)));
        assert!(!regions.contains("chrQ", &locus(99, 99)));
        assert!(!regions.contains("chrQ", &locus(201, 201)));
        assert!(regions.contains("chrR", &locus(10, 20)));
    }
}
