use std::{cmp::Ordering, collections::HashSet, iter::FusedIterator};

use binary_heap_plus::BinaryHeap;
use deterministic_default_hasher::DeterministicDefaultHasher;
use log::trace;
use ndarray::Array2;

use crate::{
    alignment_matrix::AlignmentMatrix,
    alignment_result::{AlignmentCoordinates, AlignmentResult, Traceback},
    score::Score,
    scoring_model::ScoringModel,
};

/// Controls which results a [`ResultEnumerator`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationSettings {
    /// Compute the path of each result.
    pub traceback: bool,
    /// Stop before the first result scoring lower than this.
    pub min_score: Option<Score>,
    pub max_results: Option<usize>,
    /// If false, skip results whose path shares a matrix cell with an earlier result.
    pub allow_overlap: bool,
}

/// Yields the alignments of a session by descending score.
///
/// Ties are broken by the end cell, first by its row and then by its column, both ascending.
pub struct ResultEnumerator<'session> {
    model: &'session ScoringModel,
    sequence_a: &'session [u8],
    sequence_b: &'session [u8],
    matrix: &'session AlignmentMatrix,
    settings: EnumerationSettings,

    /// Filled on the first fetch.
    candidates: Option<BinaryHeap<Candidate>>,
    emitted_spans: HashSet<(AlignmentCoordinates, AlignmentCoordinates), DeterministicDefaultHasher>,
    /// Only maintained if overlaps are not allowed.
    used_cells: Option<Array2<bool>>,
    emitted_count: usize,
    exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    score: Score,
    end: AlignmentCoordinates,
}

impl EnumerationSettings {
    pub fn without_traceback(mut self) -> Self {
        self.traceback = false;
        self
    }

    pub fn with_min_score(mut self, min_score: impl Into<Score>) -> Self {
        self.min_score = Some(min_score.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn without_overlap(mut self) -> Self {
        self.allow_overlap = false;
        self
    }
}

impl Default for EnumerationSettings {
    fn default() -> Self {
        Self {
            traceback: true,
            min_score: None,
            max_results: None,
            allow_overlap: true,
        }
    }
}

impl<'session> ResultEnumerator<'session> {
    pub(crate) fn new(
        model: &'session ScoringModel,
        sequence_a: &'session [u8],
        sequence_b: &'session [u8],
        matrix: &'session AlignmentMatrix,
        settings: EnumerationSettings,
    ) -> Self {
        Self {
            model,
            sequence_a,
            sequence_b,
            matrix,
            settings,
            candidates: None,
            emitted_spans: HashSet::default(),
            used_cells: (!settings.allow_overlap).then(|| Array2::from_elem(matrix.dim(), false)),
            emitted_count: 0,
            exhausted: false,
        }
    }

    pub fn settings(&self) -> &EnumerationSettings {
        &self.settings
    }

    /// The next best alignment, or `None` once all alignments were yielded.
    ///
    /// After returning `None` once, this always returns `None`.
    pub fn fetch(&mut self) -> Option<AlignmentResult> {
        if self.exhausted {
            return None;
        }

        let result = self.fetch_inner();
        if let Some(result) = &result {
            self.emitted_count += 1;
            trace!("Emitting result {}: {result}", self.emitted_count);
        } else {
            self.exhausted = true;
        }
        result
    }

    fn fetch_inner(&mut self) -> Option<AlignmentResult> {
        if self
            .settings
            .max_results
            .is_some_and(|max_results| self.emitted_count >= max_results)
        {
            return None;
        }

        if self.candidates.is_none() {
            self.candidates = Some(self.collect_candidates());
        }

        loop {
            let candidate = self.candidates.as_mut()?.pop()?;
            if self
                .settings
                .min_score
                .is_some_and(|min_score| candidate.score < min_score)
            {
                return None;
            }

            if !self.settings.traceback && self.settings.allow_overlap {
                if !self.emitted_spans.insert((candidate.end, candidate.end)) {
                    continue;
                }

                return Some(AlignmentResult {
                    score: candidate.score,
                    end: candidate.end,
                    traceback: None,
                });
            }

            let path =
                self.matrix
                    .traceback(self.model, self.sequence_a, self.sequence_b, candidate.end);

            if let Some(used_cells) = &mut self.used_cells {
                if path.cells.iter().any(|cell| used_cells[[cell.a, cell.b]]) {
                    continue;
                }
                for cell in &path.cells {
                    used_cells[[cell.a, cell.b]] = true;
                }
            }

            if !self.emitted_spans.insert((path.start, path.end)) {
                continue;
            }

            return Some(AlignmentResult {
                score: candidate.score,
                end: path.end,
                traceback: self.settings.traceback.then(|| {
                    Traceback::new(
                        path.start,
                        path.alignment,
                        self.sequence_a,
                        self.sequence_b,
                    )
                }),
            });
        }
    }

    /// Every cell with a positive score where an alignment may end.
    fn collect_candidates(&self) -> BinaryHeap<Candidate> {
        let free_end = self.model.parameters().free_end_gaps;

        let candidates: Vec<_> = self
            .matrix
            .inner_cells()
            .filter(|&cell| free_end || self.matrix.is_end_boundary(cell))
            .filter_map(|cell| {
                let score = self.matrix.entry(cell).h;
                (score > Score::ZERO).then_some(Candidate { score, end: cell })
            })
            .collect();

        trace!("Found {} candidate end cells", candidates.len());
        BinaryHeap::from_vec(candidates)
    }
}

impl Iterator for ResultEnumerator<'_> {
    type Item = AlignmentResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch()
    }
}

impl FusedIterator for ResultEnumerator<'_> {}

impl Ord for Candidate {
    /// The greatest candidate has the highest score and, among equal scores, the smallest end.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.end.a.cmp(&self.end.a))
            .then_with(|| other.end.b.cmp(&self.end.b))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        aligner::align,
        alignment_result::AlignmentCoordinates,
        score::Score,
        scoring_model::{ScoringModel, ScoringParameters},
    };

    use super::{Candidate, EnumerationSettings};

    #[test]
    fn candidate_order() {
        let mut candidates = vec![
            Candidate {
                score: 2.into(),
                end: AlignmentCoordinates::new(3, 1),
            },
            Candidate {
                score: 3.into(),
                end: AlignmentCoordinates::new(4, 4),
            },
            Candidate {
                score: 2.into(),
                end: AlignmentCoordinates::new(1, 5),
            },
            Candidate {
                score: 2.into(),
                end: AlignmentCoordinates::new(1, 2),
            },
        ];
        candidates.sort_by(|a, b| b.cmp(a));

        assert_eq!(
            candidates
                .iter()
                .map(|candidate| (candidate.end.a, candidate.end.b))
                .collect::<Vec<_>>(),
            vec![(4, 4), (1, 2), (1, 5), (3, 1)]
        );
    }

    #[test]
    fn enumeration_order() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let session = align(b"AAB", b"ABB", &model).unwrap();
        let results: Vec<_> = session.enumerator().collect();

        let scores: Vec<_> = results.iter().map(|result| result.score.as_i64()).collect();
        assert_eq!(scores, vec![2, 1, 1, 1]);

        let spans: Vec<_> = results
            .iter()
            .map(|result| {
                let start = result.start().unwrap();
                ((start.a, start.b), (result.end.a, result.end.b))
            })
            .collect();
        assert_eq!(
            spans,
            vec![
                ((1, 0), (3, 2)),
                ((0, 0), (1, 1)),
                ((1, 0), (2, 1)),
                ((2, 2), (3, 3)),
            ]
        );
    }

    #[test]
    fn penalised_start_and_end_gaps() {
        let model = ScoringModel::create(ScoringParameters {
            free_start_gaps: false,
            free_end_gaps: false,
            ..Default::default()
        })
        .unwrap();
        let session = align(b"GGGGAC", b"AC", &model).unwrap();
        let results: Vec<_> = session.enumerator().collect();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, Score::from(2));
        assert_eq!(results[0].end, AlignmentCoordinates::new(6, 2));
        assert_eq!(results[0].start(), Some(AlignmentCoordinates::new(4, 0)));
        assert_eq!(results[0].alignment().unwrap().cigar(), "2M");

        let session = align(b"TTTT", b"GGGG", &model).unwrap();
        assert_eq!(session.enumerator().fetch(), None);
    }

    #[test]
    fn exhaustion_is_permanent() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let session = align(b"AC", b"GT", &model).unwrap();
        let mut enumerator = session.enumerator();

        assert_eq!(enumerator.fetch(), None);
        assert_eq!(enumerator.fetch(), None);
        assert_eq!(enumerator.next(), None);
    }

    #[test]
    fn settings() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let session = align(b"AAB", b"ABB", &model).unwrap();

        let limited: Vec<_> = session
            .enumerator_with(EnumerationSettings::default().with_max_results(2))
            .collect();
        assert_eq!(limited.len(), 2);

        let thresholded: Vec<_> = session
            .enumerator_with(EnumerationSettings::default().with_min_score(2))
            .collect();
        assert_eq!(thresholded.len(), 1);
        assert_eq!(thresholded[0].score, Score::from(2));

        let scores_only: Vec<_> = session
            .enumerator_with(EnumerationSettings::default().without_traceback())
            .collect();
        assert_eq!(scores_only.len(), 4);
        assert!(scores_only.iter().all(|result| result.traceback.is_none()));
    }
}
