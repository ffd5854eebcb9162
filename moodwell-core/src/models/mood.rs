use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse mood label. The set is closed: classifier output and the empathy
/// template table are both keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Happy,
    Sad,
    Anxious,
    Calm,
    Energetic,
    Tired,
    Stressed,
    Content,
    Overwhelmed,
    Optimistic,
}

impl MoodCategory {
    /// Declaration order. Also the tie-break order for classification.
    pub const ALL: [MoodCategory; 10] = [
        MoodCategory::Happy,
        MoodCategory::Sad,
        MoodCategory::Anxious,
        MoodCategory::Calm,
        MoodCategory::Energetic,
        MoodCategory::Tired,
        MoodCategory::Stressed,
        MoodCategory::Content,
        MoodCategory::Overwhelmed,
        MoodCategory::Optimistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Happy => "happy",
            MoodCategory::Sad => "sad",
            MoodCategory::Anxious => "anxious",
            MoodCategory::Calm => "calm",
            MoodCategory::Energetic => "energetic",
            MoodCategory::Tired => "tired",
            MoodCategory::Stressed => "stressed",
            MoodCategory::Content => "content",
            MoodCategory::Overwhelmed => "overwhelmed",
            MoodCategory::Optimistic => "optimistic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// The category a negated keyword counts towards ("not happy" -> sad).
    pub fn opposite(&self) -> MoodCategory {
        match self {
            MoodCategory::Happy => MoodCategory::Sad,
            MoodCategory::Sad => MoodCategory::Happy,
            MoodCategory::Calm => MoodCategory::Anxious,
            MoodCategory::Anxious => MoodCategory::Calm,
            MoodCategory::Energetic => MoodCategory::Tired,
            MoodCategory::Tired => MoodCategory::Energetic,
            MoodCategory::Content => MoodCategory::Stressed,
            MoodCategory::Stressed => MoodCategory::Content,
            MoodCategory::Optimistic => MoodCategory::Overwhelmed,
            MoodCategory::Overwhelmed => MoodCategory::Optimistic,
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

impl std::fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one piece of text. Transient: computed and dropped
/// within a single orchestration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodClassification {
    pub category: MoodCategory,
    pub confidence: f32,
    /// Stable hash of the normalized input, used to seed template selection.
    pub fingerprint: u64,
}

impl MoodClassification {
    pub fn new(category: MoodCategory, confidence: f32, fingerprint: u64) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            fingerprint,
        }
    }
}

/// A mood the user logged explicitly from the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: String,
    pub category: MoodCategory,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MoodEntry {
    pub fn new(user_id: &str, category: MoodCategory, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            category,
            note,
            recorded_at: Utc::now(),
        }
    }
}

/// Fixed-size per-category counter, indexed by declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CategoryTally([f32; 10]);

impl CategoryTally {
    pub(crate) fn add(&mut self, category: MoodCategory, weight: f32) {
        self.0[category.index()] += weight;
    }

    pub(crate) fn get(&self, category: MoodCategory) -> f32 {
        self.0[category.index()]
    }

    pub(crate) fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Highest-scoring category; earlier categories win ties. `None` if
    /// nothing scored.
    pub(crate) fn winner(&self) -> Option<(MoodCategory, f32)> {
        let mut best: Option<(MoodCategory, f32)> = None;
        for category in MoodCategory::ALL {
            let score = self.get(category);
            if score <= 0.0 {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((category, score)),
            }
        }
        best
    }
}
