//! Mood catalog: display blurbs and the descriptive phrases used to build
//! embedding prototypes.
//!
//! Phrase wording directly shapes the prototypes, so changing a phrase
//! changes every prediction the embedding engine makes.

use super::Mood;

/// A mood definition with its prototype phrases
#[derive(Debug, Clone)]
pub struct MoodDescriptor {
    pub mood: Mood,
    /// Short human-readable explanation, served by `/moods`
    pub summary: &'static str,
    /// Natural-language phrases averaged into the mood's prototype
    pub phrases: [&'static str; 5],
}

pub const MOOD_HAPPY: MoodDescriptor = MoodDescriptor {
    mood: Mood::Happy,
    summary: "Positive, joyful emotions expressed through bright colors and energetic strokes",
    phrases: [
        "a joyful and cheerful artwork",
        "bright and vibrant colors expressing happiness",
        "optimistic and uplifting art",
        "artwork showing joy and contentment",
        "colorful and energetic drawing expressing happiness",
    ],
};

pub const MOOD_SAD: MoodDescriptor = MoodDescriptor {
    mood: Mood::Sad,
    summary: "Melancholic feelings shown through cooler tones and slower movements",
    phrases: [
        "a melancholic and sorrowful artwork",
        "dark and muted colors expressing sadness",
        "artwork showing grief and sorrow",
        "depressing and gloomy art",
        "artwork expressing loneliness and sadness",
    ],
};

pub const MOOD_CALM: MoodDescriptor = MoodDescriptor {
    mood: Mood::Calm,
    summary: "Peaceful, serene state reflected in balanced composition and gentle colors",
    phrases: [
        "a peaceful and tranquil artwork",
        "serene and balanced composition",
        "artwork showing relaxation and peace",
        "meditative and calming art",
        "harmonious and gentle artwork",
    ],
};

pub const MOOD_ANGRY: MoodDescriptor = MoodDescriptor {
    mood: Mood::Angry,
    summary: "Intense emotions displayed through aggressive strokes and bold colors",
    phrases: [
        "an aggressive and intense artwork",
        "chaotic and turbulent composition",
        "artwork showing anger and frustration",
        "violent and aggressive art",
        "artwork with sharp and harsh elements expressing rage",
    ],
};

pub const MOOD_ANXIOUS: MoodDescriptor = MoodDescriptor {
    mood: Mood::Anxious,
    summary: "Nervous tension conveyed through scattered marks and uneasy composition",
    phrases: [
        "a nervous and worried artwork",
        "chaotic and scattered composition",
        "artwork showing stress and anxiety",
        "tense and uncomfortable art",
        "artwork expressing fear and nervousness",
    ],
};

pub const MOOD_EXCITED: MoodDescriptor = MoodDescriptor {
    mood: Mood::Excited,
    summary: "Lively enthusiasm carried by bold contrasts and dynamic movement",
    phrases: [
        "an energetic and dynamic artwork",
        "bold and vibrant composition",
        "artwork showing enthusiasm and energy",
        "dynamic and lively art",
        "artwork expressing excitement and vigor",
    ],
};

/// Every known mood, in enumeration order
pub const CATALOG: &[MoodDescriptor] = &[
    MOOD_HAPPY,
    MOOD_SAD,
    MOOD_CALM,
    MOOD_ANGRY,
    MOOD_ANXIOUS,
    MOOD_EXCITED,
];

/// Look up the descriptor for a mood.
pub fn descriptor(mood: Mood) -> &'static MoodDescriptor {
    match mood {
        Mood::Happy => &CATALOG[0],
        Mood::Sad => &CATALOG[1],
        Mood::Calm => &CATALOG[2],
        Mood::Angry => &CATALOG[3],
        Mood::Anxious => &CATALOG[4],
        Mood::Excited => &CATALOG[5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_follows_enumeration_order() {
        let moods: Vec<Mood> = CATALOG.iter().map(|d| d.mood).collect();
        assert_eq!(moods, Mood::ALL.to_vec());
    }

    #[test]
    fn test_descriptor_lookup() {
        for mood in Mood::ALL {
            assert_eq!(descriptor(mood).mood, mood);
        }
    }

    #[test]
    fn test_phrases_are_distinct() {
        for d in CATALOG {
            let mut phrases = d.phrases.to_vec();
            phrases.sort_unstable();
            phrases.dedup();
            assert_eq!(phrases.len(), 5, "duplicate phrase for {}", d.mood);
        }
    }
}
