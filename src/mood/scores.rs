//! Per-mood score vectors.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Mood;

/// One entry of a ranked score list
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RankedMood {
    pub mood: Mood,
    pub score: f32,
}

/// Mapping from mood to score, kept in the owning engine's enumeration order.
///
/// Order matters: ties in [`ScoreVector::argmax`] resolve to the earliest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    entries: Vec<(Mood, f32)>,
}

impl ScoreVector {
    /// Build a vector by evaluating `score` for every mood in `moods`.
    pub fn from_fn(moods: &[Mood], mut score: impl FnMut(Mood) -> f32) -> Self {
        Self {
            entries: moods.iter().map(|&m| (m, score(m))).collect(),
        }
    }

    /// Same score for every mood.
    pub fn uniform(moods: &[Mood], value: f32) -> Self {
        Self::from_fn(moods, |_| value)
    }

    pub fn get(&self, mood: Mood) -> Option<f32> {
        self.entries
            .iter()
            .find(|(m, _)| *m == mood)
            .map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mood, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weighted linear combination of several vectors over the moods of `self`.
    ///
    /// Moods missing from a part contribute nothing for that part.
    pub fn weighted_sum(moods: &[Mood], parts: &[(&ScoreVector, f32)]) -> Self {
        Self::from_fn(moods, |mood| {
            parts
                .iter()
                .map(|(vector, weight)| weight * vector.get(mood).unwrap_or(0.0))
                .sum()
        })
    }

    /// Highest-scoring entry; the first maximal entry wins ties.
    pub fn argmax(&self) -> Option<(Mood, f32)> {
        let mut best: Option<(Mood, f32)> = None;
        for (mood, score) in self.iter() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((mood, score)),
            }
        }
        best
    }

    /// Entries sorted by descending score. Stable: equal scores keep enumeration order.
    pub fn ranked(&self) -> Vec<(Mood, f32)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// [`ScoreVector::ranked`] as serializable entries.
    pub fn ranking(&self) -> Vec<RankedMood> {
        self.ranked()
            .into_iter()
            .map(|(mood, score)| RankedMood { mood, score })
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_finite())
    }
}

impl Serialize for ScoreVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (mood, score) in &self.entries {
            map.serialize_entry(mood.as_str(), score)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR: [Mood; 4] = [Mood::Happy, Mood::Sad, Mood::Calm, Mood::Angry];

    #[test]
    fn test_argmax_first_maximum_wins() {
        let v = ScoreVector::from_fn(&FOUR, |m| match m {
            Mood::Sad | Mood::Angry => 0.8,
            _ => 0.1,
        });
        assert_eq!(v.argmax(), Some((Mood::Sad, 0.8)));

        let flat = ScoreVector::uniform(&FOUR, 0.5);
        assert_eq!(flat.argmax(), Some((Mood::Happy, 0.5)));
    }

    #[test]
    fn test_argmax_empty() {
        assert!(ScoreVector::uniform(&[], 1.0).argmax().is_none());
    }

    #[test]
    fn test_weighted_sum() {
        let a = ScoreVector::uniform(&FOUR, 1.0);
        let b = ScoreVector::from_fn(&FOUR, |m| if m == Mood::Calm { 1.0 } else { 0.0 });
        let combined = ScoreVector::weighted_sum(&FOUR, &[(&a, 0.5), (&b, 0.3)]);
        assert!((combined.get(Mood::Calm).unwrap() - 0.8).abs() < 1e-6);
        assert!((combined.get(Mood::Happy).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ranked_is_stable_and_descending() {
        let v = ScoreVector::from_fn(&FOUR, |m| match m {
            Mood::Happy => 0.2,
            Mood::Sad => 0.9,
            Mood::Calm => 0.2,
            _ => 0.5,
        });
        let ranked: Vec<Mood> = v.ranked().into_iter().map(|(m, _)| m).collect();
        assert_eq!(ranked, vec![Mood::Sad, Mood::Angry, Mood::Happy, Mood::Calm]);
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let v = ScoreVector::from_fn(&[Mood::Happy, Mood::Sad], |m| {
            if m == Mood::Happy {
                0.25
            } else {
                0.5
            }
        });
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"Happy":0.25,"Sad":0.5}"#);
    }

    #[test]
    fn test_is_finite() {
        assert!(ScoreVector::uniform(&FOUR, 0.5).is_finite());
        assert!(!ScoreVector::uniform(&FOUR, f32::NAN).is_finite());
    }
}
