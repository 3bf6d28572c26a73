use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow, ensure};
use clap::Parser;
use lib_swalign::{
    aligner::Aligner,
    alignment_result::AlignmentResult,
    enumerator::EnumerationSettings,
    scoring_model::{ScoringModel, ScoringParameters},
};
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use crate::align::{config::Config, fasta_parser::parse_pair_fasta_file};

mod config;
mod fasta_parser;

#[derive(Parser)]
pub struct Cli {
    #[clap(long, short = 'l', default_value = "info")]
    log_level: LevelFilter,

    /// A toml file containing the scoring parameters and substitution scores.
    ///
    /// If not given, the default scoring parameters are used.
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// The first sequence, given directly on the command line.
    #[clap(long, short = 'a', requires = "sequence_b")]
    sequence_a: Option<String>,

    /// The second sequence, given directly on the command line.
    #[clap(long, short = 'b', requires = "sequence_a")]
    sequence_b: Option<String>,

    /// The path to a fasta file containing both sequences.
    #[clap(long, short = 'p', conflicts_with_all = ["sequence_a", "sequence_b"])]
    pair_fasta: Option<PathBuf>,

    /// A file with one pair of sequences per line, separated by a tab character.
    ///
    /// For each pair, only the best score is printed on its own line, or "none" if the pair has no alignment.
    #[clap(long, conflicts_with_all = ["sequence_a", "sequence_b", "pair_fasta"])]
    batch: Option<PathBuf>,

    /// The file to store the alignment results in toml format.
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,

    /// Report at most this many alignments per pair.
    #[clap(long)]
    max_results: Option<usize>,

    /// Do not report alignments scoring lower than this.
    #[clap(long, allow_hyphen_values = true)]
    min_score: Option<i64>,

    /// Do not report alignments that share a matrix cell with a better alignment.
    #[clap(long)]
    no_overlap: bool,

    /// Print only the best score of each pair.
    #[clap(long)]
    best_only: bool,

    /// Divide the scores by the length of the first sequence.
    ///
    /// Both sequences must have the same length.
    #[clap(long)]
    normalize: bool,

    /// Divide the printed scores by this value.
    #[clap(long, default_value = "1.0")]
    score_scale: f64,

    /// Reject sequences containing characters that are not part of the substitution matrix.
    ///
    /// This is always done if the matrix was configured to not fall back to the default scores.
    #[clap(long)]
    require_covered: bool,

    /// An approximate memory limit in bytes for the alignment matrix.
    ///
    /// Pairs exceeding it are not aligned and cause an error.
    #[clap(long)]
    memory_limit: Option<usize>,
}

#[derive(Debug, Clone)]
struct SequencePair {
    name: String,
    sequence_a: String,
    sequence_b: String,
}

#[derive(Debug, Serialize)]
struct Output {
    pairs: Vec<PairOutput>,
}

/// The scores are missing if the pair has no alignment scoring above zero.
#[derive(Debug, Serialize)]
struct PairOutput {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_score: Option<f64>,
    results: Vec<AlignmentResult>,
}

/// Printed instead of a score if a pair has no alignment.
const NO_HIT: &str = "none";

pub fn cli(cli: Cli) -> Result<()> {
    if let Err(error) = TermLogger::init(
        cli.log_level,
        Default::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        warn!("Logger was already initialised: {error}");
    }

    ensure!(
        cli.score_scale.is_finite() && cli.score_scale != 0.0,
        "The score scale must be a finite non-zero number, but is {}",
        cli.score_scale
    );

    let model = if let Some(config) = &cli.config {
        info!("Loading config file {config:?}");
        Config::read(config)?.into_model()?
    } else {
        ScoringModel::create(ScoringParameters::default())?
    };
    let require_covered = cli.require_covered || !model.uses_defaults_as_fallback();

    let pairs = load_pairs(&cli)?;
    debug!("Loaded {} sequence pairs", pairs.len());

    let mut aligner = Aligner::new(&model);
    if let Some(memory_limit) = cli.memory_limit {
        aligner = aligner.with_memory_limit(memory_limit);
    }

    let settings = enumeration_settings(&cli);
    let best_only = cli.best_only || cli.batch.is_some();
    let mut output = Output { pairs: Vec::new() };

    for pair in &pairs {
        if require_covered {
            check_covered(&model, pair)?;
        }

        let session = aligner.align(pair.sequence_a.as_bytes(), pair.sequence_b.as_bytes())?;
        let best_score = session.max_score().map(|score| score.as_i64());
        let display_score = scaled_score(&cli, pair, best_score.unwrap_or_default())?;
        let display_score = best_score.is_some().then_some(display_score);
        let printed_score = display_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| NO_HIT.to_string());

        if best_only {
            println!("{printed_score}");
            output.pairs.push(PairOutput {
                name: pair.name.clone(),
                best_score,
                display_score,
                results: Vec::new(),
            });
            continue;
        }

        println!("{}: {printed_score}", pair.name);
        let results: Vec<_> = session.enumerator_with(settings).collect();
        info!("Found {} alignments for {}", results.len(), pair.name);
        for result in &results {
            println!("{result}");
        }

        output.pairs.push(PairOutput {
            name: pair.name.clone(),
            best_score,
            display_score,
            results,
        });
    }

    if let Some(path) = &cli.output {
        write_output(path, &output)?;
    }

    Ok(())
}

fn enumeration_settings(cli: &Cli) -> EnumerationSettings {
    let mut settings = EnumerationSettings::default();
    if let Some(max_results) = cli.max_results {
        settings = settings.with_max_results(max_results);
    }
    if let Some(min_score) = cli.min_score {
        settings = settings.with_min_score(min_score);
    }
    if cli.no_overlap {
        settings = settings.without_overlap();
    }
    settings
}

fn load_pairs(cli: &Cli) -> Result<Vec<SequencePair>> {
    if let (Some(sequence_a), Some(sequence_b)) = (&cli.sequence_a, &cli.sequence_b) {
        Ok(vec![SequencePair {
            name: "pair".to_string(),
            sequence_a: sequence_a.clone(),
            sequence_b: sequence_b.clone(),
        }])
    } else if let Some(pair_fasta) = &cli.pair_fasta {
        info!("Loading pair file {pair_fasta:?}");
        let (record_a, record_b) = parse_pair_fasta_file(pair_fasta)?;
        Ok(vec![SequencePair {
            name: format!("{} {}", record_a.id, record_b.id),
            sequence_a: record_a.sequence,
            sequence_b: record_b.sequence,
        }])
    } else if let Some(batch) = &cli.batch {
        info!("Loading batch file {batch:?}");
        parse_batch_file(batch)
    } else {
        Err(anyhow!("No input given"))
    }
}

fn parse_batch_file(path: &Path) -> Result<Vec<SequencePair>> {
    let input = BufReader::new(
        File::open(path).map_err(|error| anyhow!("Unable to open batch file {path:?}: {error}"))?,
    );
    let mut pairs = Vec::new();

    for (line_index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let columns: Vec<_> = line.split('\t').collect();
        ensure!(
            columns.len() == 2,
            "Line {} of batch file {path:?} has {} columns instead of two",
            line_index + 1,
            columns.len()
        );
        pairs.push(SequencePair {
            name: format!("line {}", line_index + 1),
            sequence_a: columns[0].to_string(),
            sequence_b: columns[1].to_string(),
        });
    }

    Ok(pairs)
}

fn check_covered(model: &ScoringModel, pair: &SequencePair) -> Result<()> {
    for (label, sequence) in [("first", &pair.sequence_a), ("second", &pair.sequence_b)] {
        let uncovered = model.uncovered_characters(sequence.as_bytes());
        ensure!(
            uncovered.is_empty(),
            "The {label} sequence of {} contains characters without substitution scores: {}",
            pair.name,
            String::from_utf8_lossy(&uncovered)
        );
    }
    Ok(())
}

/// Applies the score scale and the optional length normalisation.
fn scaled_score(cli: &Cli, pair: &SequencePair, score: i64) -> Result<f64> {
    let score = score as f64 / cli.score_scale;

    if cli.normalize {
        ensure!(
            pair.sequence_a.len() == pair.sequence_b.len(),
            "Normalised scores require sequences of equal length, but {} has lengths {} and {}",
            pair.name,
            pair.sequence_a.len(),
            pair.sequence_b.len()
        );
        ensure!(
            !pair.sequence_a.is_empty(),
            "Normalised scores require non-empty sequences, but {} is empty",
            pair.name
        );
        Ok(score / pair.sequence_a.len() as f64)
    } else {
        Ok(score)
    }
}

fn write_output(path: &Path, output: &Output) -> Result<()> {
    debug!("Writing output to {path:?}");
    let mut writer = BufWriter::new(
        File::create(path)
            .map_err(|error| anyhow!("Unable to create output file {path:?}: {error}"))?,
    );
    write!(writer, "{}", toml::to_string(output)?)?;
    writer.flush()?;
    Ok(())
}
