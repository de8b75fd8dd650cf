/*!
# Reference module
Builds the per-run reference model of sequins and answers the locus lookups against it.
*/
/// Joins annotation and mixture inputs into a validated model
pub mod builder;
/// Exact/contains match rules and the sorted entity index
pub mod matcher;
/// The reference model and its per-chromosome data
pub mod model;
/// The evaluable territory around the sequins
pub mod regions;
