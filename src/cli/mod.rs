/*!
# CLI module
Command line interface functionality that is specific to Quokka.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// Flags shared by every subcommand
pub mod common;
/// The germline (variant) CLI subcommand
pub mod germline;
/// The align CLI subcommand
pub mod align;
/// The express CLI subcommand
pub mod express;
/// The fold change CLI subcommand
pub mod fold;
/// The fusion CLI subcommand
pub mod fusion;
