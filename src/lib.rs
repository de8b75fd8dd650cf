/// Scores aligned exon blocks and splice junctions against a transcriptome reference
pub mod alignment_classifier;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Scores measured abundances against isoforms or genes
pub mod expression_classifier;
/// Scores measured fold changes between two mixtures, including differential calls
pub mod fold_change_classifier;
/// Scores fusion calls against fusion sequin breakpoints
pub mod fusion_classifier;
/// Picks the lowest-abundance sequin that was still detected
pub mod limit_of_detection;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// The reference model of sequins and its lookups
pub mod reference;
/// Various utility functions that tend to be very generic
pub mod util;
/// Scores variant calls against the variant sequins, stratified along several axes
pub mod variant_classifier;
/// All output writers
pub mod writers;
