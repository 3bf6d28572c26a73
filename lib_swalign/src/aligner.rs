use log::{debug, trace};

use crate::{
    alignment_matrix::AlignmentMatrix,
    enumerator::{EnumerationSettings, ResultEnumerator},
    error::{Error, Result},
    score::Score,
    scoring_model::ScoringModel,
};

/// Runs alignments against a borrowed scoring model.
#[derive(Debug, Clone, Copy)]
pub struct Aligner<'model> {
    model: &'model ScoringModel,
    memory_limit: Option<usize>,
}

/// The filled alignment matrix of one pair of sequences.
///
/// Results are drawn from it with [`AlignmentSession::enumerator`].
#[derive(Debug, Clone)]
pub struct AlignmentSession<'model, 'sequences> {
    model: &'model ScoringModel,
    sequence_a: &'sequences [u8],
    sequence_b: &'sequences [u8],
    matrix: AlignmentMatrix,
}

impl<'model> Aligner<'model> {
    pub fn new(model: &'model ScoringModel) -> Self {
        Self {
            model,
            memory_limit: None,
        }
    }

    /// Refuse alignments whose matrix needs more than `bytes` bytes.
    ///
    /// Only the matrix is counted. An enumerator additionally keeps one candidate per positive cell,
    /// and one flag per cell if overlaps are not allowed.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    pub fn memory_limit(&self) -> Option<usize> {
        self.memory_limit
    }

    pub fn model(&self) -> &'model ScoringModel {
        self.model
    }

    pub fn align<'sequences>(
        &self,
        sequence_a: &'sequences [u8],
        sequence_b: &'sequences [u8],
    ) -> Result<AlignmentSession<'model, 'sequences>> {
        let limit = self.memory_limit.unwrap_or(usize::MAX);
        let required_bytes = AlignmentMatrix::required_bytes(sequence_a.len(), sequence_b.len())
            .filter(|&required_bytes| required_bytes <= limit)
            .ok_or(Error::DimensionOverflow {
                sequence_a_length: sequence_a.len(),
                sequence_b_length: sequence_b.len(),
                limit,
            })?;

        debug!(
            "Aligning sequences of length {} and {} using {required_bytes} bytes",
            sequence_a.len(),
            sequence_b.len()
        );

        let mut matrix = AlignmentMatrix::new(sequence_a.len(), sequence_b.len());
        matrix.align(self.model, sequence_a, sequence_b);
        trace!("Alignment matrix:\n{matrix}");

        Ok(AlignmentSession {
            model: self.model,
            sequence_a,
            sequence_b,
            matrix,
        })
    }

    pub fn best_score(&self, sequence_a: &[u8], sequence_b: &[u8]) -> Result<Score> {
        Ok(self.align(sequence_a, sequence_b)?.best_score())
    }
}

impl<'model, 'sequences> AlignmentSession<'model, 'sequences> {
    /// A fresh enumerator with default settings, yielding every distinct alignment with its traceback.
    pub fn enumerator(&self) -> ResultEnumerator<'_> {
        self.enumerator_with(EnumerationSettings::default())
    }

    pub fn enumerator_with(&self, settings: EnumerationSettings) -> ResultEnumerator<'_> {
        ResultEnumerator::new(
            self.model,
            self.sequence_a,
            self.sequence_b,
            &self.matrix,
            settings,
        )
    }

    /// The score of the first result an enumerator would yield, or `None` if there is no alignment.
    pub fn max_score(&self) -> Option<Score> {
        self.matrix.max_score(self.model)
    }

    /// Like [`Self::max_score`], but zero if there is no alignment.
    pub fn best_score(&self) -> Score {
        self.max_score().unwrap_or(Score::ZERO)
    }

    pub fn model(&self) -> &'model ScoringModel {
        self.model
    }

    pub fn sequence_a(&self) -> &'sequences [u8] {
        self.sequence_a
    }

    pub fn sequence_b(&self) -> &'sequences [u8] {
        self.sequence_b
    }

    pub fn matrix(&self) -> &AlignmentMatrix {
        &self.matrix
    }
}

/// Align two sequences without a memory limit.
pub fn align<'model, 'sequences>(
    sequence_a: &'sequences [u8],
    sequence_b: &'sequences [u8],
    model: &'model ScoringModel,
) -> Result<AlignmentSession<'model, 'sequences>> {
    Aligner::new(model).align(sequence_a, sequence_b)
}

pub fn best_score(sequence_a: &[u8], sequence_b: &[u8], model: &ScoringModel) -> Result<Score> {
    Aligner::new(model).best_score(sequence_a, sequence_b)
}

/// Scores independent pairs one after the other, stopping at the first error.
pub fn score_pairs<A: AsRef<[u8]>, B: AsRef<[u8]>>(
    pairs: impl IntoIterator<Item = (A, B)>,
    model: &ScoringModel,
) -> Result<Vec<Score>> {
    let aligner = Aligner::new(model);
    pairs
        .into_iter()
        .map(|(sequence_a, sequence_b)| {
            aligner.best_score(sequence_a.as_ref(), sequence_b.as_ref())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        alignment_matrix::AlignmentMatrix,
        error::Error,
        score::Score,
        scoring_model::{ScoringModel, ScoringParameters},
    };

    use super::{Aligner, best_score, score_pairs};

    #[test]
    fn memory_limit() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let required_bytes = AlignmentMatrix::required_bytes(4, 4).unwrap();

        let aligner = Aligner::new(&model).with_memory_limit(required_bytes);
        assert!(aligner.align(b"ACGT", b"ACGT").is_ok());
        assert_eq!(
            aligner.align(b"ACGTA", b"ACGT").unwrap_err(),
            Error::DimensionOverflow {
                sequence_a_length: 5,
                sequence_b_length: 4,
                limit: required_bytes,
            }
        );
    }

    #[test]
    fn zero_memory_limit() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let sequence = vec![b'A'; 16];

        let aligner = Aligner::new(&model).with_memory_limit(0);
        assert!(matches!(
            aligner.align(&sequence, &sequence),
            Err(Error::DimensionOverflow { limit: 0, .. })
        ));
    }

    #[test]
    fn batch() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let scores = score_pairs([("AAB", "AAB"), ("AAB", "ABB"), ("", "A")], &model).unwrap();
        assert_eq!(scores, vec![Score::from(3), Score::from(2), Score::ZERO]);
        assert_eq!(best_score(b"AAB", b"AAB", &model).unwrap(), Score::from(3));
    }

    #[test]
    fn max_score_matches_first_result() {
        let model = ScoringModel::create(ScoringParameters {
            free_start_gaps: false,
            free_end_gaps: false,
            ..Default::default()
        })
        .unwrap();
        let aligner = Aligner::new(&model);

        for (a, b) in [(&b"GGGGAC"[..], &b"AC"[..]), (b"ABBA", b"BAAB"), (b"AC", b"GT")] {
            let session = aligner.align(a, b).unwrap();
            assert_eq!(
                session.max_score(),
                session.enumerator().next().map(|result| result.score)
            );
        }
        assert_eq!(aligner.align(b"AC", b"GT").unwrap().max_score(), None);
        assert_eq!(aligner.best_score(b"AC", b"GT").unwrap(), Score::ZERO);
    }
}
