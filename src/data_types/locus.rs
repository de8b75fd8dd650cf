use serde::Serialize;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LocusError {
    #[error("invalid locus {start}-{end}: start must be <= end")]
    InvalidLocus { start: u64, end: u64 },
    #[error("invalid locus {start}-{end}: coordinates are 1-based")]
    ZeroCoordinate { start: u64, end: u64 }
}

/// A genomic interval with 1-based, inclusive coordinates.
/// Ordering is by start, then end, which is the order every sorted index in the crate relies on.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Locus {
    /// First included base, 1-based
    start: u64,
    /// Last included base, 1-based
    end: u64
}

impl Locus {
    /// Constructor
    /// # Arguments
    /// * `start` - first included base, 1-based
    /// * `end` - last included base, 1-based
    /// # Errors
    /// * if `start > end`
    /// * if either coordinate is 0
    pub fn new(start: u64, end: u64) -> Result<Self, LocusError> {
        if start > end {
            return Err(LocusError::InvalidLocus { start, end });
        }
        if start == 0 {
            return Err(LocusError::ZeroCoordinate { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a single base locus
    pub fn point(position: u64) -> Result<Self, LocusError> {
        Self::new(position, position)
    }

    /// Number of bases covered, always >= 1
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Number of bases shared by both loci, 0 if they are disjoint
    pub fn overlap(&self, other: &Locus) -> u64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            end - start + 1
        } else {
            0
        }
    }

    /// Returns true if `other` is fully inside this locus
    pub fn contains(&self, other: &Locus) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two loci overlap or sit directly next to each other
    pub fn is_touching(&self, other: &Locus) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    /// Widens the locus by `bp` on each side; the start never drops below 1
    pub fn pad(&self, bp: u64) -> Locus {
        Locus {
            start: self.start.saturating_sub(bp).max(1),
            end: self.end.saturating_add(bp)
        }
    }

    /// Returns the smallest locus spanning everything provided, or None if the input is empty.
    /// # Arguments
    /// * `loci` - any collection of loci, order does not matter
    pub fn expand<I: IntoIterator<Item = Locus>>(loci: I) -> Option<Locus> {
        loci.into_iter()
            .reduce(|acc, l| Locus {
                start: acc.start.min(l.start),
                end: acc.end.max(l.end)
            })
    }

    /// Folds overlapping and adjacent loci into maximal non-overlapping runs.
    /// The output is sorted by start and covers exactly the union of the input.
    /// # Arguments
    /// * `loci` - the loci to merge, in any order
    pub fn merge(loci: &[Locus]) -> Vec<Locus> {
        let mut sorted: Vec<Locus> = loci.to_vec();
        sorted.sort_unstable();

        let mut ret: Vec<Locus> = Vec::with_capacity(sorted.len());
        for locus in sorted.into_iter() {
            match ret.last_mut() {
                Some(last) if last.is_touching(&locus) => {
                    last.end = last.end.max(locus.end);
                },
                _ => ret.push(locus)
            }
        }
        ret
    }

    /// Total bases shared by two merged locus lists, in one sweep over both.
    /// # Arguments
    /// * `left` - sorted, non-overlapping loci, such as the output of `merge`
    /// * `right` - sorted, non-overlapping loci
    pub fn merged_overlap(left: &[Locus], right: &[Locus]) -> u64 {
        let (mut i, mut j) = (0, 0);
        let mut total = 0;
        while i < left.len() && j < right.len() {
            total += left[i].overlap(&right[j]);
            // whichever ends first cannot overlap anything further along the other list
            if left[i].end <= right[j].end {
                i += 1;
            } else {
                j += 1;
            }
        }
        total
    }

    // getters
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Anything that sits at a single locus in the reference and can be placed in a sorted index
pub trait Located {
    fn locus(&self) -> Locus;
}

impl Located for Locus {
    fn locus(&self) -> Locus {
        *self
    }
}
