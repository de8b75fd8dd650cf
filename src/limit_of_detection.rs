use serde::Serialize;
use std::collections::BTreeMap;

/// The faintest reference entity that was still detected, the sensitivity floor of an experiment
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensitivityResult {
    /// Entity at the detection floor, None when nothing was detected
    entity_id: Option<String>,
    /// Number of detections of that entity, 0 when nothing was detected
    detection_count: u64,
    /// Known abundance of that entity, NaN when nothing was detected
    abundance: f64
}

impl SensitivityResult {
    /// The "nothing was detected" result
    pub fn undetected() -> Self {
        Self {
            entity_id: None,
            detection_count: 0,
            abundance: f64::NAN
        }
    }

    pub fn is_detected(&self) -> bool {
        self.detection_count > 0
    }

    // getters
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn detection_count(&self) -> u64 {
        self.detection_count
    }

    pub fn abundance(&self) -> f64 {
        self.abundance
    }
}

/// Picks the detected entity with the smallest detection count, breaking ties by the smallest abundance.
/// Remaining ties go to the first id in sorted order.
/// Entities without a known abundance cannot bound anything and are skipped.
/// # Arguments
/// * `histogram` - entity id to detection count, seeded with every reference entity at 0
/// * `abundances` - entity id to known abundance in the evaluated mixture
pub fn estimate_limit_of_detection(histogram: &BTreeMap<String, u64>, abundances: &BTreeMap<String, f64>) -> SensitivityResult {
    let mut best: Option<(&String, u64, f64)> = None;
    for (entity_id, &count) in histogram.iter() {
        if count == 0 {
            continue;
        }
        let Some(&abundance) = abundances.get(entity_id) else {
            continue;
        };

        let replace = match best {
            None => true,
            Some((_id, best_count, best_abundance)) => {
                count < best_count || (count == best_count && abundance < best_abundance)
            }
        };
        if replace {
            best = Some((entity_id, count, abundance));
        }
    }

    match best {
        Some((entity_id, detection_count, abundance)) => SensitivityResult {
            entity_id: Some(entity_id.clone()),
            detection_count,
            abundance
        },
        None => SensitivityResult::undetected()
    }
}
