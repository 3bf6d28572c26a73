use std::ops::Add;

/// The score of an alignment.
///
/// Scores are maximised.
/// The special value [`Score::NEG_INFINITY`] marks a move that is not allowed.
/// Adding anything to it yields [`Score::NEG_INFINITY`] again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Score(i64);

impl Score {
    /// Far enough from `i64::MIN` that sums of finite scores never wrap.
    pub const NEG_INFINITY: Score = Score(i64::MIN / 4);
    pub const ZERO: Score = Score(0);

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_neg_infinity(&self) -> bool {
        *self <= Self::NEG_INFINITY
    }
}

impl From<i64> for Score {
    fn from(value: i64) -> Self {
        Self(value).max(Self::NEG_INFINITY)
    }
}

impl From<i32> for Score {
    fn from(value: i32) -> Self {
        Self(value.into())
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Self) -> Self::Output {
        if self.is_neg_infinity() || rhs.is_neg_infinity() {
            Self::NEG_INFINITY
        } else {
            Self(self.0.saturating_add(rhs.0)).max(Self::NEG_INFINITY)
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_neg_infinity() {
            write!(f, "-inf")
        } else {
            self.0.fmt(f)
        }
    }
}
