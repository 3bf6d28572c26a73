use std::path::Path;

use anyhow::{Result, anyhow, ensure};
use lib_swalign::scoring_model::{ScoringModel, ScoringParameters};
use log::debug;
use serde::Deserialize;

/// The scoring configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    parameters: ScoringParameters,

    matrix: Option<MatrixConfig>,

    /// Applied after the matrix, so these override its entries.
    #[serde(default)]
    substitutions: Vec<SubstitutionConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatrixConfig {
    alphabet: String,
    /// Row-major.
    scores: Vec<i32>,
    #[serde(default = "default_use_defaults_as_fallback")]
    use_defaults_as_fallback: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubstitutionConfig {
    a: char,
    b: char,
    score: i32,
}

fn default_use_defaults_as_fallback() -> bool {
    true
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading config file {path:?}");

        let config = std::fs::read_to_string(path)
            .map_err(|error| anyhow!("Unable to read config file {path:?}: {error}"))?;
        toml::from_str(&config)
            .map_err(|error| anyhow!("Unable to parse config file {path:?}: {error}"))
    }

    pub fn into_model(self) -> Result<ScoringModel> {
        let mut model = ScoringModel::create(self.parameters)?;

        if let Some(matrix) = self.matrix {
            ensure!(
                matrix.alphabet.is_ascii(),
                "The matrix alphabet contains non-ASCII characters: {}",
                matrix.alphabet
            );
            model.add_full_matrix(
                matrix.alphabet.as_bytes(),
                &matrix.scores,
                matrix.use_defaults_as_fallback,
            )?;
        }

        for SubstitutionConfig { a, b, score } in self.substitutions {
            ensure!(
                a.is_ascii() && b.is_ascii(),
                "Substitution between {a:?} and {b:?} contains non-ASCII characters"
            );
            model.add_substitution(a as u8, b as u8, score);
        }

        Ok(model)
    }
}
