use anyhow::Result;
use clap::Parser;
use swalign::align::{Cli, cli};

fn main() -> Result<()> {
    cli(Cli::parse())
}
