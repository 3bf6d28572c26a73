use log::warn;
use ndarray::Array2;

use crate::{
    alignment_result::{AlignmentCoordinates, AlignmentType, alignment::Alignment},
    score::Score,
    scoring_model::ScoringModel,
};

/// The dynamic programming state of one alignment, following Gotoh's three matrix formulation.
///
/// Row `a` and column `b` hold the alignments of the prefixes `sequence_a[..a]` and `sequence_b[..b]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMatrix {
    matrix: Array2<AlignmentMatrixEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentMatrixEntry {
    /// The best score of an alignment ending in this cell.
    pub h: Score,
    /// The best score of an alignment ending in this cell with a gap in sequence a.
    pub e: Score,
    /// The best score of an alignment ending in this cell with a gap in sequence b.
    pub f: Score,
}

/// The path found by a traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackPath {
    pub start: AlignmentCoordinates,
    pub end: AlignmentCoordinates,
    pub alignment: Alignment,
    /// All cells of the path except the start, from the end towards the start.
    pub cells: Vec<AlignmentCoordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TracebackState {
    H,
    GapInA,
    GapInB,
}

impl AlignmentMatrix {
    pub fn new(sequence_a_length: usize, sequence_b_length: usize) -> Self {
        Self {
            matrix: Array2::from_elem(
                (sequence_a_length + 1, sequence_b_length + 1),
                AlignmentMatrixEntry::default(),
            ),
        }
    }

    /// The amount of bytes needed for the matrix of two sequences with the given lengths.
    ///
    /// Returns `None` if the amount does not fit into a `usize`.
    pub fn required_bytes(sequence_a_length: usize, sequence_b_length: usize) -> Option<usize> {
        sequence_a_length
            .checked_add(1)?
            .checked_mul(sequence_b_length.checked_add(1)?)?
            .checked_mul(size_of::<AlignmentMatrixEntry>())
    }

    pub fn dim(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    pub fn entry(&self, cell: AlignmentCoordinates) -> &AlignmentMatrixEntry {
        &self.matrix[[cell.a, cell.b]]
    }

    /// All cells outside of row 0 and column 0 in row-major order.
    pub fn inner_cells(&self) -> impl Iterator<Item = AlignmentCoordinates> {
        let (rows, columns) = self.matrix.dim();
        (1..rows).flat_map(move |a| (1..columns).map(move |b| AlignmentCoordinates::new(a, b)))
    }

    /// True if the cell is in the last row or the last column.
    pub fn is_end_boundary(&self, cell: AlignmentCoordinates) -> bool {
        cell.a + 1 == self.matrix.dim().0 || cell.b + 1 == self.matrix.dim().1
    }

    /// The highest `h` among cells where an alignment may end, or `None` if no cell scores above zero.
    pub fn max_score(&self, model: &ScoringModel) -> Option<Score> {
        let free_end = model.parameters().free_end_gaps;
        self.inner_cells()
            .filter(|&cell| free_end || self.is_end_boundary(cell))
            .map(|cell| self.entry(cell).h)
            .filter(|&h| h > Score::ZERO)
            .max()
    }

    pub fn align(&mut self, model: &ScoringModel, sequence_a: &[u8], sequence_b: &[u8]) {
        debug_assert_eq!(self.matrix.dim(), (sequence_a.len() + 1, sequence_b.len() + 1));

        self.initialise(model);
        self.align_inner(model, sequence_a, sequence_b);
    }

    /// Row 0 and column 0 always score zero.
    /// Without free start gaps, their gap states carry the cost of a leading gap.
    fn initialise(&mut self, model: &ScoringModel) {
        let parameters = model.parameters();
        let leading_gap = |length: usize, forbidden: bool| {
            if parameters.free_start_gaps {
                Score::ZERO
            } else if forbidden {
                Score::NEG_INFINITY
            } else {
                model.gap_open() + Score::from(parameters.gap_extend as i64 * length as i64)
            }
        };

        let (rows, columns) = self.matrix.dim();
        self.matrix[[0, 0]] = AlignmentMatrixEntry::local_start();

        for a in 1..rows {
            self.matrix[[a, 0]] = AlignmentMatrixEntry {
                f: leading_gap(a, parameters.no_gaps_in_b),
                ..AlignmentMatrixEntry::local_start()
            };
        }
        for b in 1..columns {
            self.matrix[[0, b]] = AlignmentMatrixEntry {
                e: leading_gap(b, parameters.no_gaps_in_a),
                ..AlignmentMatrixEntry::local_start()
            };
        }
    }

    fn align_inner(&mut self, model: &ScoringModel, sequence_a: &[u8], sequence_b: &[u8]) {
        let (rows, columns) = self.matrix.dim();

        for a in 1..rows {
            for b in 1..columns {
                let cell = AlignmentCoordinates::new(a, b);
                let e = self.compute_gap_in_a_score(cell, model);
                let f = self.compute_gap_in_b_score(cell, model);
                let h = self
                    .compute_diagonal_score(cell, model, sequence_a, sequence_b)
                    .max(e)
                    .max(f)
                    .max(Score::ZERO);

                self.matrix[[a, b]] = AlignmentMatrixEntry { h, e, f };
            }
        }
    }

    fn compute_gap_in_a_score(&self, cell: AlignmentCoordinates, model: &ScoringModel) -> Score {
        if model.parameters().no_gaps_in_a {
            return Score::NEG_INFINITY;
        }

        let predecessor = &self.matrix[[cell.a, cell.b - 1]];
        (predecessor.e + model.gap_extend())
            .max(predecessor.h + model.gap_open() + model.gap_extend())
    }

    fn compute_gap_in_b_score(&self, cell: AlignmentCoordinates, model: &ScoringModel) -> Score {
        if model.parameters().no_gaps_in_b {
            return Score::NEG_INFINITY;
        }

        let predecessor = &self.matrix[[cell.a - 1, cell.b]];
        (predecessor.f + model.gap_extend())
            .max(predecessor.h + model.gap_open() + model.gap_extend())
    }

    fn compute_diagonal_score(
        &self,
        cell: AlignmentCoordinates,
        model: &ScoringModel,
        sequence_a: &[u8],
        sequence_b: &[u8],
    ) -> Score {
        match model.substitution_score(sequence_a[cell.a - 1], sequence_b[cell.b - 1]) {
            Some(score) => self.matrix[[cell.a - 1, cell.b - 1]].h + score,
            None => Score::NEG_INFINITY,
        }
    }

    /// Follow the best path backwards from `end` until the first cell with `h == 0`.
    ///
    /// In each cell the diagonal move is preferred, then the gap in b (up), then the gap in a (left).
    /// Inside a gap, opening the gap is preferred over extending it.
    pub fn traceback(
        &self,
        model: &ScoringModel,
        sequence_a: &[u8],
        sequence_b: &[u8],
        end: AlignmentCoordinates,
    ) -> TracebackPath {
        let gap_open_extend = model.gap_open() + model.gap_extend();
        let mut reverse_alignment = Alignment::new();
        let mut cells = Vec::new();
        let mut cell = end;
        let mut state = TracebackState::H;

        loop {
            let entry = *self.entry(cell);

            match state {
                TracebackState::H => {
                    if entry.h == Score::ZERO || cell.a == 0 || cell.b == 0 {
                        break;
                    }

                    if self.compute_diagonal_score(cell, model, sequence_a, sequence_b) == entry.h {
                        let a = model.fold(sequence_a[cell.a - 1]);
                        let b = model.fold(sequence_b[cell.b - 1]);
                        reverse_alignment.push(if a == b {
                            AlignmentType::Match
                        } else {
                            AlignmentType::Mismatch
                        });
                        cells.push(cell);
                        cell = AlignmentCoordinates::new(cell.a - 1, cell.b - 1);
                    } else if entry.f == entry.h {
                        state = TracebackState::GapInB;
                    } else if entry.e == entry.h {
                        state = TracebackState::GapInA;
                    } else {
                        warn!("Traceback found no predecessor for {cell} with {entry:?}");
                        break;
                    }
                }
                TracebackState::GapInB => {
                    let predecessor = AlignmentCoordinates::new(cell.a - 1, cell.b);
                    reverse_alignment.push(AlignmentType::GapInB);
                    cells.push(cell);

                    if self.entry(predecessor).h + gap_open_extend == entry.f {
                        state = TracebackState::H;
                    } else {
                        debug_assert_eq!(self.entry(predecessor).f + model.gap_extend(), entry.f);
                    }
                    cell = predecessor;
                }
                TracebackState::GapInA => {
                    let predecessor = AlignmentCoordinates::new(cell.a, cell.b - 1);
                    reverse_alignment.push(AlignmentType::GapInA);
                    cells.push(cell);

                    if self.entry(predecessor).h + gap_open_extend == entry.e {
                        state = TracebackState::H;
                    } else {
                        debug_assert_eq!(self.entry(predecessor).e + model.gap_extend(), entry.e);
                    }
                    cell = predecessor;
                }
            }
        }

        TracebackPath {
            start: cell,
            end,
            alignment: reverse_alignment.reverse(),
            cells,
        }
    }

    #[cfg(test)]
    fn manual_debug_h(&self) -> Vec<Vec<i64>> {
        self.matrix
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|entry| entry.h.as_i64()).collect())
            .collect()
    }
}

impl AlignmentMatrixEntry {
    fn local_start() -> Self {
        Self {
            h: Score::ZERO,
            e: Score::NEG_INFINITY,
            f: Score::NEG_INFINITY,
        }
    }
}

impl Default for AlignmentMatrixEntry {
    fn default() -> Self {
        Self {
            h: Score::NEG_INFINITY,
            e: Score::NEG_INFINITY,
            f: Score::NEG_INFINITY,
        }
    }
}

impl core::fmt::Display for AlignmentMatrix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut column_widths = vec![0; self.matrix.dim().1];
        for row in self.matrix.rows() {
            for (entry, column_width) in row.iter().zip(column_widths.iter_mut()) {
                *column_width = format!("{}", entry.h).len().max(*column_width);
            }
        }

        for row in self.matrix.rows() {
            write!(f, "[")?;
            for (entry, column_width) in row.iter().zip(&column_widths) {
                write!(f, " {: >width$}", entry.h, width = column_width)?;
            }
            writeln!(f, " ]")?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use crate::{
        alignment_result::AlignmentCoordinates,
        score::Score,
        scoring_model::{ScoringModel, ScoringParameters},
    };

    use super::AlignmentMatrix;

    fn aligned(model: &ScoringModel, a: &[u8], b: &[u8]) -> AlignmentMatrix {
        let mut matrix = AlignmentMatrix::new(a.len(), b.len());
        matrix.align(model, a, b);
        matrix
    }

    fn cell(a: usize, b: usize) -> AlignmentCoordinates {
        AlignmentCoordinates::new(a, b)
    }

    #[test]
    fn test_simple_local_matrix() {
        let model = ScoringModel::create(ScoringParameters::default()).unwrap();
        let matrix = aligned(&model, b"AAB", b"ABB");

        assert_eq!(
            matrix.manual_debug_h(),
            vec![
                vec![0, 0, 0, 0],
                vec![0, 1, 0, 0],
                vec![0, 1, 0, 0],
                vec![0, 0, 2, 1],
            ],
            "matrix:\n{matrix}"
        );
        assert_eq!(matrix.max_score(&model), Some(Score::from(2)));

        let path = matrix.traceback(&model, b"AAB", b"ABB", cell(3, 2));
        assert_eq!(path.start, cell(1, 0));
        assert_eq!(path.alignment.cigar(), "2M");
        assert_eq!(path.cells, vec![cell(3, 2), cell(2, 1)]);
    }

    #[test]
    fn test_affine_gap() {
        let model = ScoringModel::create(ScoringParameters {
            default_match: 5,
            default_mismatch: -4,
            gap_open: -3,
            gap_extend: -1,
            ..Default::default()
        })
        .unwrap();
        // One gap of length two costs 5, which is cheaper than losing the flanking matches.
        let matrix = aligned(&model, b"ACGTTT", b"ACTTT");
        let end = cell(6, 5);
        assert_eq!(matrix.entry(end).h.as_i64(), 5 * 5 - 4);

        let path = matrix.traceback(&model, b"ACGTTT", b"ACTTT", end);
        assert_eq!(path.start, cell(0, 0));
        assert_eq!(path.alignment.cigar(), "2M1D3M");

        let matrix = aligned(&model, b"ACGGTTT", b"ACTTT");
        let end = cell(7, 5);
        assert_eq!(matrix.entry(end).h.as_i64(), 5 * 5 - 5);
        let path = matrix.traceback(&model, b"ACGGTTT", b"ACTTT", end);
        assert_eq!(path.alignment.cigar(), "2M2D3M");
    }

    #[test]
    fn test_penalised_start_gaps() {
        let model = ScoringModel::create(ScoringParameters {
            free_start_gaps: false,
            free_end_gaps: false,
            ..Default::default()
        })
        .unwrap();
        let matrix = aligned(&model, b"GGGGAC", b"AC");

        // Leading gaps cost gap_open + gap_extend * length, but the boundary itself stays at zero.
        assert_eq!(matrix.entry(cell(1, 0)).f.as_i64(), -3);
        assert_eq!(matrix.entry(cell(3, 0)).f.as_i64(), -5);
        assert_eq!(matrix.entry(cell(0, 2)).e.as_i64(), -4);
        assert!(matrix.entry(cell(3, 0)).e.is_neg_infinity());
        assert_eq!(matrix.entry(cell(3, 0)).h, Score::ZERO);
        assert_eq!(matrix.entry(cell(0, 2)).h, Score::ZERO);
        assert!(matrix.inner_cells().all(|index| matrix.entry(index).h >= Score::ZERO));

        // The alignment of AC restarts in the interior instead of paying for the leading G's.
        let end = cell(6, 2);
        assert_eq!(matrix.max_score(&model), Some(Score::from(2)));
        let path = matrix.traceback(&model, b"GGGGAC", b"AC", end);
        assert_eq!(path.start, cell(4, 0));
        assert_eq!(path.alignment.cigar(), "2M");

        let matrix = aligned(&model, b"TTTT", b"GGGG");
        assert_eq!(matrix.max_score(&model), None);
        assert!(matrix.inner_cells().all(|index| matrix.entry(index).h == Score::ZERO));
    }

    #[test]
    fn test_start_gaps_do_not_change_scores() {
        let free = ScoringModel::create(ScoringParameters::default()).unwrap();
        let penalised = ScoringModel::create(ScoringParameters {
            free_start_gaps: false,
            ..Default::default()
        })
        .unwrap();

        for (a, b) in [(&b"CAB"[..], &b"AB"[..]), (b"ABBA", b"BAAB"), (b"A", b"B")] {
            assert_eq!(
                aligned(&free, a, b).manual_debug_h(),
                aligned(&penalised, a, b).manual_debug_h()
            );
        }
    }

    #[test]
    fn test_gap_restrictions() {
        let model = ScoringModel::create(ScoringParameters {
            default_match: 5,
            default_mismatch: -4,
            gap_open: -1,
            gap_extend: -1,
            no_gaps_in_b: true,
            ..Default::default()
        })
        .unwrap();
        // Skipping the 'G' of a would need a gap in b.
        let matrix = aligned(&model, b"ACGTTT", b"ACTTT");
        assert_eq!(matrix.entry(cell(6, 5)).h.as_i64(), 5 * 3);
        assert!(matrix.inner_cells().all(|index| matrix.entry(index).f.is_neg_infinity()));

        let model = ScoringModel::create(ScoringParameters {
            default_match: 5,
            default_mismatch: -4,
            gap_open: -1,
            gap_extend: -1,
            no_gaps_in_a: true,
            ..Default::default()
        })
        .unwrap();
        let matrix = aligned(&model, b"ACGTTT", b"ACTTT");
        assert_eq!(matrix.entry(cell(6, 5)).h.as_i64(), 5 * 5 - 2);
        assert!(matrix.inner_cells().all(|index| matrix.entry(index).e.is_neg_infinity()));
    }

    #[test]
    fn test_no_mismatches() {
        let model = ScoringModel::create(ScoringParameters {
            default_match: 3,
            default_mismatch: -1,
            gap_open: -5,
            gap_extend: -5,
            no_mismatches: true,
            ..Default::default()
        })
        .unwrap();
        // With mismatches "ACA" vs "AGA" would score 5.
        let matrix = aligned(&model, b"ACA", b"AGA");
        assert_eq!(matrix.max_score(&model), Some(Score::from(3)));
    }

    #[test]
    fn required_bytes() {
        assert_eq!(
            AlignmentMatrix::required_bytes(2, 3),
            Some(12 * size_of::<super::AlignmentMatrixEntry>())
        );
        assert_eq!(AlignmentMatrix::required_bytes(usize::MAX, 3), None);
        assert_eq!(AlignmentMatrix::required_bytes(usize::MAX / 2, 4), None);
    }
}
