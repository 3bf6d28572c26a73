use ndarray::Array2;

use crate::score::Score;

const CHARACTER_COUNT: usize = u8::MAX as usize + 1;

/// A table of directed substitution scores between byte characters.
///
/// Entries that were never inserted are absent, and lookups for them return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    entries: Array2<Option<Score>>,
    covered: [bool; CHARACTER_COUNT],
    len: usize,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self {
            entries: Array2::from_elem((CHARACTER_COUNT, CHARACTER_COUNT), None),
            covered: [false; CHARACTER_COUNT],
            len: 0,
        }
    }

    pub fn get(&self, a: u8, b: u8) -> Option<Score> {
        self.entries
            .get([usize::from(a), usize::from(b)])
            .copied()
            .flatten()
    }

    /// Inserts the score for the directed pair `(a, b)`, replacing any previous entry.
    pub fn insert(&mut self, a: u8, b: u8, score: Score) {
        if let Some(entry) = self.entries.get_mut([usize::from(a), usize::from(b)]) {
            if entry.replace(score).is_none() {
                self.len += 1;
            }
        }
        self.covered[usize::from(a)] = true;
        self.covered[usize::from(b)] = true;
    }

    /// True if the character is part of at least one entry.
    pub fn covers(&self, character: u8) -> bool {
        self.covered[usize::from(character)]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::score::Score;

    use super::SubstitutionTable;

    #[test]
    fn directed_entries() {
        let mut table = SubstitutionTable::new();
        assert!(table.is_empty());

        table.insert(b'a', b'r', Score::from(-3));
        assert_eq!(table.get(b'a', b'r'), Some(Score::from(-3)));
        assert_eq!(table.get(b'r', b'a'), None);
        assert!(table.covers(b'a'));
        assert!(table.covers(b'r'));
        assert!(!table.covers(b'n'));

        table.insert(b'a', b'r', Score::from(2));
        assert_eq!(table.get(b'a', b'r'), Some(Score::from(2)));
        assert_eq!(table.len(), 1);

        table.insert(u8::MAX, 0, Score::ZERO);
        assert_eq!(table.get(u8::MAX, 0), Some(Score::ZERO));
        assert_eq!(table.len(), 2);
    }
}
