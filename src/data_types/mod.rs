
/// TP/FP/FN labels and the per-record match outcome
pub mod classification;
/// Tracker for TP, FP and the reference total, with the derived metrics
pub mod confusion;
/// Records produced by variant callers, aligners and quantifiers
pub mod detected;
/// Closed integer intervals and the interval algebra on them
pub mod locus;
/// Reference sequin entities and their categorical tags
pub mod sequins;
/// One confusion counter per stratification bucket
pub mod stratified_metrics;
