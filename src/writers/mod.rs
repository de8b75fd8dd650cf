/*!
# Writers module
Contains the logic for writing the per-run output tables for every subcommand.
*/
/// Generates the missing-feature, point and fusion call tables
pub mod feature_tables;
/// Generates the stats.json file
pub mod stats;
/// Generates the summary file
pub mod summary;
/// Generates the per-sequin and per-call tables for variant runs
pub mod variant_tables;
