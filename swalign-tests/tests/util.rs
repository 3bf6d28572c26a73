use std::{env, path::Path};

use anyhow::{Result, anyhow};
use clap::Parser;
use swalign::align;

pub fn run_in_repo_root(args: &str) -> Result<()> {
    // The manifest directory is "[...]/swalign-tests", so the repo root is its parent.
    env::set_current_dir(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .ok_or(anyhow!("No parent directory"))?,
    )?;

    let args = align::Cli::try_parse_from(args.split_whitespace())?;
    align::cli(args)
}

/// Runs the command with an additional `-o` option and returns the parsed output file.
pub fn run_with_output(args: &str, label: &str) -> Result<toml::Table> {
    let output = env::temp_dir().join(format!(
        "swalign-test-{label}-{}.toml",
        std::process::id()
    ));
    run_in_repo_root(&format!("{args} -o {}", output.display()))?;

    let output_toml = toml::from_str(&std::fs::read_to_string(&output)?)?;
    std::fs::remove_file(&output)?;
    Ok(output_toml)
}
