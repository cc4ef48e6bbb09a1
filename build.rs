use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

/// Fallback used when there is no git checkout, e.g. when building from a release tarball
const UNKNOWN_DESCRIBE: &str = "unknown";

/// Emits `VERGEN_GIT_DESCRIBE` (and the other git instructions) from the local clone.
/// # Errors
/// * if `git` is not installed
/// * if the source tree is not a git clone
fn emit_git_describe() -> Result<(), Box<dyn Error>> {
    // the match pattern never matches a tag, so describe falls back to the short hash
    let gitcl = GitclBuilder::default()
        .all()
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
        // packagers can pin a description with RIBOFOLD_GIT_DESCRIBE
        let git_describe = option_env!("RIBOFOLD_GIT_DESCRIBE").unwrap_or(UNKNOWN_DESCRIBE);
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE={git_describe}");
    }

    for tracked in ["Cargo.toml", "build.rs", "src"] {
        println!("cargo:rerun-if-changed={tracked}");
    }
    println!("cargo:rerun-if-env-changed=RIBOFOLD_GIT_DESCRIBE");
    Ok(())
}
