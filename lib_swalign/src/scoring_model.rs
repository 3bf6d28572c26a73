use log::debug;
use substitution_table::SubstitutionTable;

use crate::{
    error::{Error, Result},
    score::Score,
};

pub mod substitution_table;

/// The scalar part of a scoring model.
///
/// Scores are maximised, so matches should score higher than mismatches.
/// Gap costs are non-positive and are added to the score: a gap of length `L` adds
/// `gap_open + gap_extend * L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ScoringParameters {
    /// Score of two identical characters that have no substitution table entry.
    pub default_match: i32,
    /// Score of two different characters that have no substitution table entry.
    pub default_mismatch: i32,
    pub gap_open: i32,
    pub gap_extend: i32,

    /// Gaps before the first aligned character are free.
    ///
    /// If unset, the gap states of row 0 and column 0 carry `gap_open + gap_extend * length`.
    /// Alignments stay local either way: scores never drop below zero.
    pub free_start_gaps: bool,
    /// Alignments may end anywhere.
    ///
    /// If unset, alignments end in the last row or the last column of the alignment matrix.
    pub free_end_gaps: bool,

    /// Forbid gaps in sequence a, i.e. never consume a character of b without consuming one of a.
    pub no_gaps_in_a: bool,
    /// Forbid gaps in sequence b, i.e. never consume a character of a without consuming one of b.
    pub no_gaps_in_b: bool,
    /// Forbid aligning two different characters, regardless of their substitution score.
    pub no_mismatches: bool,

    pub case_sensitive: bool,
}

/// A substitution table together with gap costs and structural flags.
///
/// The model is immutable while any alignment borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringModel {
    parameters: ScoringParameters,
    substitution_table: SubstitutionTable,
    use_defaults_as_fallback: bool,
}

impl ScoringModel {
    pub fn create(parameters: ScoringParameters) -> Result<Self> {
        if parameters.gap_open > 0 {
            return Err(Error::InvalidParameter {
                name: "gap_open",
                value: parameters.gap_open.into(),
                reason: "gap costs must not be positive",
            });
        }

        if parameters.gap_extend > 0 {
            return Err(Error::InvalidParameter {
                name: "gap_extend",
                value: parameters.gap_extend.into(),
                reason: "gap costs must not be positive",
            });
        }

        if parameters.default_match < parameters.default_mismatch {
            return Err(Error::InvalidParameter {
                name: "default_match",
                value: parameters.default_match.into(),
                reason: "the default match score must not be lower than the default mismatch score",
            });
        }

        Ok(Self {
            parameters,
            substitution_table: SubstitutionTable::new(),
            use_defaults_as_fallback: true,
        })
    }

    pub fn parameters(&self) -> &ScoringParameters {
        &self.parameters
    }

    pub fn substitution_table(&self) -> &SubstitutionTable {
        &self.substitution_table
    }

    /// False if the substitution table is meant to cover every character that will be aligned.
    pub fn uses_defaults_as_fallback(&self) -> bool {
        self.use_defaults_as_fallback
    }

    /// Inserts the score of the directed pair `(a, b)`.
    ///
    /// The reverse pair is not inserted.
    pub fn add_substitution(&mut self, a: u8, b: u8, score: i32) {
        let a = self.fold(a);
        let b = self.fold(b);
        self.substitution_table.insert(a, b, score.into());
    }

    /// Inserts a square matrix over `alphabet` given in row-major order.
    ///
    /// Row `i` holds the scores of `alphabet[i]` against each character of the alphabet.
    pub fn add_full_matrix(
        &mut self,
        alphabet: &[u8],
        flattened_scores: &[i32],
        use_defaults_as_fallback: bool,
    ) -> Result<()> {
        let expected = alphabet
            .len()
            .checked_mul(alphabet.len())
            .unwrap_or(usize::MAX);
        if flattened_scores.len() != expected {
            return Err(Error::InvalidMatrixSize {
                alphabet_length: alphabet.len(),
                expected,
                actual: flattened_scores.len(),
            });
        }

        if !alphabet.is_empty() {
            for (&a, row) in alphabet
                .iter()
                .zip(flattened_scores.chunks_exact(alphabet.len()))
            {
                for (&b, &score) in alphabet.iter().zip(row) {
                    self.add_substitution(a, b, score);
                }
            }
        }

        self.use_defaults_as_fallback = use_defaults_as_fallback;
        debug!(
            "Added a {0}x{0} substitution matrix, the table now has {1} entries",
            alphabet.len(),
            self.substitution_table.len()
        );
        Ok(())
    }

    /// The case normalisation applied to characters before each table access.
    pub fn fold(&self, character: u8) -> u8 {
        if self.parameters.case_sensitive {
            character
        } else {
            character.to_ascii_lowercase()
        }
    }

    /// The score of aligning `a` to `b`.
    ///
    /// A table entry always wins. Without one, identical characters get the default match score
    /// and different characters get the default mismatch score.
    pub fn lookup(&self, a: u8, b: u8) -> Score {
        let a = self.fold(a);
        let b = self.fold(b);

        self.substitution_table.get(a, b).unwrap_or_else(|| {
            if a == b {
                self.parameters.default_match.into()
            } else {
                self.parameters.default_mismatch.into()
            }
        })
    }

    /// The score used by the aligner for a diagonal move over `a` and `b`.
    ///
    /// Returns `None` if the move is not allowed, which is the case for different characters
    /// when `no_mismatches` is set, whatever their table entry.
    pub fn substitution_score(&self, a: u8, b: u8) -> Option<Score> {
        if self.parameters.no_mismatches && self.fold(a) != self.fold(b) {
            None
        } else {
            Some(self.lookup(a, b))
        }
    }

    /// The raw substitution table entry, without falling back to the defaults.
    pub fn table_entry(&self, a: u8, b: u8) -> Option<Score> {
        self.substitution_table.get(self.fold(a), self.fold(b))
    }

    pub fn is_covered(&self, character: u8) -> bool {
        self.substitution_table.covers(self.fold(character))
    }

    /// The distinct characters of `sequence` that the substitution table does not cover, in order of first occurrence.
    pub fn uncovered_characters(&self, sequence: &[u8]) -> Vec<u8> {
        let mut result = Vec::new();
        for &character in sequence {
            if !self.is_covered(character) && !result.contains(&character) {
                result.push(character);
            }
        }
        result
    }

    pub(crate) fn gap_open(&self) -> Score {
        self.parameters.gap_open.into()
    }

    pub(crate) fn gap_extend(&self) -> Score {
        self.parameters.gap_extend.into()
    }
}

impl Default for ScoringParameters {
    fn default() -> Self {
        Self {
            default_match: 1,
            default_mismatch: -1,
            gap_open: -2,
            gap_extend: -1,
            free_start_gaps: true,
            free_end_gaps: true,
            no_gaps_in_a: false,
            no_gaps_in_b: false,
            no_mismatches: false,
            case_sensitive: false,
        }
    }
}
