/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Parsers for the variant and transcript sequin annotations
pub mod annotation;
/// Parsers for aligned features and measured abundances
pub mod features;
/// Parser for the mixture tables
pub mod mixture;
/// Helper functions for noodles
pub mod noodles_helper;
/// Streams variant calls out of VCF/BCF files
pub mod variant_calls;
