use std::fmt::Display;

use alignment::Alignment;

use crate::score::Score;

pub mod alignment;

/// A single step of an alignment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlignmentType {
    /// Two identical characters (after case folding).
    Match,
    /// Two different characters.
    Mismatch,
    /// A character of b aligned to a gap in a.
    GapInA,
    /// A character of a aligned to a gap in b.
    GapInB,
}

/// A position in the alignment matrix, i.e. a pair of prefix lengths of the two sequences.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlignmentCoordinates {
    pub a: usize,
    pub b: usize,
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlignmentResult {
    pub score: Score,
    /// The alignment covers `a[..end.a]` and `b[..end.b]` up to its start.
    pub end: AlignmentCoordinates,
    /// Only present if the traceback was requested.
    pub traceback: Option<Traceback>,
}

/// The path of an alignment through the alignment matrix.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Traceback {
    pub start: AlignmentCoordinates,
    pub alignment: Alignment,
    /// The covered part of sequence a with '-' for gaps.
    pub aligned_a: String,
    /// The covered part of sequence b with '-' for gaps.
    pub aligned_b: String,
}

impl AlignmentType {
    pub fn consumes_a(&self) -> bool {
        matches!(
            self,
            AlignmentType::Match | AlignmentType::Mismatch | AlignmentType::GapInB
        )
    }

    pub fn consumes_b(&self) -> bool {
        matches!(
            self,
            AlignmentType::Match | AlignmentType::Mismatch | AlignmentType::GapInA
        )
    }
}

impl AlignmentCoordinates {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }
}

impl AlignmentResult {
    pub fn score(&self) -> Score {
        self.score
    }

    pub fn start(&self) -> Option<AlignmentCoordinates> {
        self.traceback.as_ref().map(|traceback| traceback.start)
    }

    pub fn alignment(&self) -> Option<&Alignment> {
        self.traceback.as_ref().map(|traceback| &traceback.alignment)
    }
}

impl Traceback {
    pub(crate) fn new(
        start: AlignmentCoordinates,
        alignment: Alignment,
        sequence_a: &[u8],
        sequence_b: &[u8],
    ) -> Self {
        let mut aligned_a = String::new();
        let mut aligned_b = String::new();
        let mut a = sequence_a[start.a..start.a + alignment.length_a()]
            .iter()
            .copied()
            .map(char::from);
        let mut b = sequence_b[start.b..start.b + alignment.length_b()]
            .iter()
            .copied()
            .map(char::from);

        for alignment_type in alignment.iter_flat() {
            let character_a = if alignment_type.consumes_a() {
                a.next()
            } else {
                None
            };
            let character_b = if alignment_type.consumes_b() {
                b.next()
            } else {
                None
            };
            aligned_a.push(character_a.unwrap_or('-'));
            aligned_b.push(character_b.unwrap_or('-'));
        }

        Self {
            start,
            alignment,
            aligned_a,
            aligned_b,
        }
    }
}

impl Display for AlignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AlignmentType::Match => "M",
                AlignmentType::Mismatch => "S",
                AlignmentType::GapInA => "I",
                AlignmentType::GapInB => "D",
            }
        )
    }
}

impl Display for AlignmentCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A{}B{}", self.a, self.b)
    }
}

impl Display for AlignmentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Score: {} End: {}", self.score, self.end)?;
        if let Some(traceback) = &self.traceback {
            writeln!(
                f,
                " Start: {} CIGAR: {}",
                traceback.start, traceback.alignment
            )?;
            writeln!(f, "{}", traceback.aligned_a)?;
            write!(f, "{}", traceback.aligned_b)?;
        }
        Ok(())
    }
}
