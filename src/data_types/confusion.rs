use serde::Serialize;
use std::ops::AddAssign;

#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfusionError {
    #[error("{tp} true positives exceed the {nr} reference entities in this bucket")]
    MoreTruePositivesThanReferences { tp: u64, nr: u64 }
}

/// Accumulates TP/FP against a known reference total.
/// False negatives are derived as `nr - tp`, never tracked independently.
/// True negatives are not modeled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounter {
    /// Detected records that match the reference
    tp: u64,
    /// Detected records that do not match the reference
    fp: u64,
    /// Number of reference entities in this bucket
    nr: u64,
    /// Number of detected records counted in this bucket
    nq: u64
}

impl AddAssign for ConfusionCounter {
    // Enables += with stats
    fn add_assign(&mut self, rhs: Self) {
        self.tp += rhs.tp;
        self.fp += rhs.fp;
        self.nr += rhs.nr;
        self.nq += rhs.nq;
    }
}

impl ConfusionCounter {
    /// Constructor for tests and for pre-tallied values; nq is tp + fp
    pub fn new(tp: u64, fp: u64, nr: u64) -> Self {
        Self { tp, fp, nr, nq: tp + fp }
    }

    /// Counts one true positive record
    pub fn add_true_positive(&mut self) {
        self.tp += 1;
        self.nq += 1;
    }

    /// Counts one false positive record
    pub fn add_false_positive(&mut self) {
        self.fp += 1;
        self.nq += 1;
    }

    /// Adds pre-tallied counts, e.g. bases
    pub fn add_counts(&mut self, tp: u64, fp: u64) {
        self.tp += tp;
        self.fp += fp;
        self.nq += tp + fp;
    }

    /// Sets the reference total for this bucket
    pub fn set_reference_total(&mut self, nr: u64) {
        self.nr = nr;
    }

    /// Adds to the reference total for this bucket
    pub fn add_reference_total(&mut self, nr: u64) {
        self.nr += nr;
    }

    /// Checks the `tp <= nr` invariant.
    /// # Errors
    /// * if more true positives were counted than reference entities exist
    pub fn check(&self) -> Result<(), ConfusionError> {
        if self.tp > self.nr {
            Err(ConfusionError::MoreTruePositivesThanReferences { tp: self.tp, nr: self.nr })
        } else {
            Ok(())
        }
    }

    /// Reference entities that were never detected, `nr - tp`.
    /// # Errors
    /// * if `tp > nr`
    pub fn false_negatives(&self) -> Result<u64, ConfusionError> {
        self.check()?;
        Ok(self.nr - self.tp)
    }

    /// Sensitivity = tp / nr, None if there are no reference entities.
    /// # Errors
    /// * if `tp > nr`
    pub fn sensitivity(&self) -> Result<Option<f64>, ConfusionError> {
        self.check()?;
        if self.nr > 0 {
            Ok(Some(self.tp as f64 / self.nr as f64))
        } else {
            Ok(None)
        }
    }

    /// Precision = tp / (tp + fp), None if nothing was detected.
    pub fn precision(&self) -> Option<f64> {
        let denom = self.tp + self.fp;
        if denom > 0 {
            Some(self.tp as f64 / denom as f64)
        } else {
            None
        }
    }

    /// F1 score, None unless both sensitivity and precision are defined
    /// # Errors
    /// * if `tp > nr`
    pub fn f1(&self) -> Result<Option<f64>, ConfusionError> {
        match (self.sensitivity()?, self.precision()) {
            (Some(sn), Some(pc)) if sn + pc > 0.0 => Ok(Some(2.0 * pc * sn / (pc + sn))),
            (Some(_), Some(_)) => Ok(Some(0.0)),
            _ => Ok(None)
        }
    }

    /// False discovery rate = 1 - precision
    pub fn false_discovery_rate(&self) -> Option<f64> {
        self.precision().map(|pc| 1.0 - pc)
    }

    /// Snapshot of the counts and derived metrics, with undefined metrics as NaN
    /// # Errors
    /// * if `tp > nr`
    pub fn snapshot(&self) -> Result<ConfusionSnapshot, ConfusionError> {
        Ok(ConfusionSnapshot {
            nr: self.nr,
            nq: self.nq,
            tp: self.tp,
            fp: self.fp,
            fn_: self.false_negatives()?,
            sensitivity: self.sensitivity()?.unwrap_or(f64::NAN),
            precision: self.precision().unwrap_or(f64::NAN),
            f1: self.f1()?.unwrap_or(f64::NAN),
            fdr: self.false_discovery_rate().unwrap_or(f64::NAN)
        })
    }

    // getters
    pub fn tp(&self) -> u64 {
        self.tp
    }

    pub fn fp(&self) -> u64 {
        self.fp
    }

    pub fn nr(&self) -> u64 {
        self.nr
    }

    pub fn nq(&self) -> u64 {
        self.nq
    }
}

/// A checked, report-ready view of a counter
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ConfusionSnapshot {
    pub nr: u64,
    pub nq: u64,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub sensitivity: f64,
    pub precision: f64,
    pub f1: f64,
    pub fdr: f64
}
