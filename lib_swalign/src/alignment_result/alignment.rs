use std::fmt::Display;

use super::AlignmentType;

/// A run-length encoded sequence of alignment operations, ordered from the start of the alignment to its end.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    alignment: Vec<(usize, AlignmentType)>,
}

impl Alignment {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, alignment_type: AlignmentType) {
        if let Some((multiplicity, last_alignment_type)) = self.alignment.last_mut() {
            if *last_alignment_type == alignment_type {
                *multiplicity += 1;
            } else {
                self.alignment.push((1, alignment_type));
            }
        } else {
            self.alignment.push((1, alignment_type));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alignment.is_empty()
    }

    /// Iterate over single alignment operations.
    pub fn iter_flat(&self) -> impl DoubleEndedIterator<Item = AlignmentType> + '_ {
        self.alignment
            .iter()
            .flat_map(|(multiplicity, alignment_type)| {
                std::iter::repeat_n(*alignment_type, *multiplicity)
            })
    }

    /// The number of characters of sequence a covered by the alignment.
    pub fn length_a(&self) -> usize {
        self.alignment
            .iter()
            .filter(|(_, alignment_type)| alignment_type.consumes_a())
            .map(|(multiplicity, _)| multiplicity)
            .sum()
    }

    /// The number of characters of sequence b covered by the alignment.
    pub fn length_b(&self) -> usize {
        self.alignment
            .iter()
            .filter(|(_, alignment_type)| alignment_type.consumes_b())
            .map(|(multiplicity, _)| multiplicity)
            .sum()
    }

    pub fn cigar(&self) -> String {
        let mut result = String::new();
        // Writing into a string cannot fail.
        let _ = self.write_cigar(&mut result);
        result
    }

    pub fn write_cigar(&self, writer: &mut impl std::fmt::Write) -> std::fmt::Result {
        for (amount, alignment_type) in &self.alignment {
            write!(writer, "{amount}{alignment_type}")?;
        }

        Ok(())
    }

    pub fn reverse(&self) -> Self {
        Self {
            alignment: self.alignment.iter().copied().rev().collect(),
        }
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_cigar(f)
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self {
            alignment: Default::default(),
        }
    }
}
