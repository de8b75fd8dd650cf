use serde::Serialize;
use std::path::Path;

use crate::reference::model::ValidationReport;
use crate::util::json_io::save_json;

/// Everything that goes into stats.json
#[derive(Serialize)]
struct RunStats<'a, T: Serialize> {
    label: &'a str,
    /// what was dropped while building the reference
    reference: &'a ValidationReport,
    /// the classification, with its confusion, sensitivity and mapping sections
    result: &'a T
}

/// Saves the combined run result as JSON
/// # Arguments
/// * `filename` - the output path, gzipped if it ends with .gz
/// * `label` - run label
/// * `report` - the reference validation report
/// * `result` - any of the classification results
/// # Errors
/// * if the file cannot be written
pub fn write_stats<T: Serialize>(filename: &Path, label: &str, report: &ValidationReport, result: &T) -> anyhow::Result<()> {
    let stats = RunStats { label, reference: report, result };
    save_json(&stats, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::confusion::ConfusionCounter;
    use crate::util::json_io::load_json;

    #[test]
    fn test_write_stats() {
        let report = ValidationReport {
            annotation_only: vec!["V9".to_string()],
            mixture_only: vec![],
            off_target: 2
        };
        let filename = std::env::temp_dir().join(format!("quokka_stats_{}.json", std::process::id()));
        write_stats(&filename, "run", &report, &ConfusionCounter::new(1, 0, 2)).unwrap();
        let loaded: serde_json::Value = load_json(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();

        assert_eq!(loaded["label"], "run");
        assert_eq!(loaded["reference"]["annotation_only"][0], "V9");
        assert_eq!(loaded["reference"]["off_target"], 2);
        assert_eq!(loaded["result"]["tp"], 1);
    }
}
