use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

/// Emits VERGEN_GIT_DESCRIBE for the version string.
/// # Errors
/// * if `git` is missing or the source tree is not a clone (e.g. a release tarball)
fn emit_git_describe() -> Result<(), Box<dyn Error>> {
    let gitcl = GitclBuilder::default()
        .describe(false, true, Some("NoTagShouldEverMatchThis"))
        .build()?;

    Emitter::default()
        .fail_on_error()
        .add_instructions(&gitcl)?
        .emit()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    if emit_git_describe().is_err() {
        // packagers can inject their own description, otherwise "unknown"
        let git_desc = option_env!("QUOKKA_GIT_DESCRIBE").unwrap_or("unknown");
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE={git_desc}");
    }

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=src");
    Ok(())
}
