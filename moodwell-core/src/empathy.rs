//! Empathetic response generator
//!
//! Maps a mood category to a canned four-part reply (emoji, message,
//! affirmation, suggested activity). Each category owns one or more weighted
//! templates; which one is used is decided by an explicit [`SelectionPolicy`]
//! so tests stay deterministic.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{MoodCategory, MoodClassification};

/// How a template is picked when a category has several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Always the first template registered for the category.
    #[default]
    FixedFirst,
    /// Weighted pick from an RNG seeded with `seed ^ fingerprint`, so the same
    /// seed and the same input always give the same template.
    WeightedRandom { seed: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyTemplate {
    pub category: MoodCategory,
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub emoji: String,
    pub message: String,
    pub affirmation: String,
    pub activity: String,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmpathyResponse {
    pub emoji: String,
    pub message: String,
    pub affirmation: String,
    pub activity: String,
}

impl EmpathyResponse {
    /// The single text block stored as the assistant turn.
    pub fn render(&self) -> String {
        format!(
            "{} {}\n\nAffirmation: {}\nTry this: {}",
            self.emoji, self.message, self.affirmation, self.activity
        )
    }
}

impl From<&EmpathyTemplate> for EmpathyResponse {
    fn from(t: &EmpathyTemplate) -> Self {
        Self {
            emoji: t.emoji.clone(),
            message: t.message.clone(),
            affirmation: t.affirmation.clone(),
            activity: t.activity.clone(),
        }
    }
}

// (category, weight, emoji, message, affirmation, activity)
const BUILTIN_TEMPLATES: &[(MoodCategory, u32, &str, &str, &str, &str)] = &[
    (
        MoodCategory::Happy,
        2,
        "😊",
        "It's wonderful to hear you're feeling happy!",
        "I deserve to enjoy the good moments in my life.",
        "Write down three things that made you smile today.",
    ),
    (
        MoodCategory::Happy,
        1,
        "🌞",
        "Your good mood is shining through. Let's hold on to it.",
        "Joy is something I am allowed to feel fully.",
        "Share your good news with someone you care about.",
    ),
    (
        MoodCategory::Sad,
        2,
        "💙",
        "I'm sorry you're feeling down. It's okay to not be okay.",
        "My feelings are valid and this moment will pass.",
        "Reach out to a friend or take a gentle walk outside.",
    ),
    (
        MoodCategory::Sad,
        1,
        "🫂",
        "That sounds heavy. Thank you for telling me about it.",
        "I am worthy of comfort and care.",
        "Wrap up in something warm and put on a song you love.",
    ),
    (
        MoodCategory::Anxious,
        2,
        "🌿",
        "Anxiety can feel overwhelming, but you're not alone in this.",
        "I am safe right now, and I can take things one step at a time.",
        "Try the 4-7-8 breathing exercise: inhale 4s, hold 7s, exhale 8s.",
    ),
    (
        MoodCategory::Anxious,
        1,
        "🍃",
        "Let's slow things down together for a moment.",
        "I can notice my worries without letting them steer me.",
        "Name five things you can see and four things you can hear.",
    ),
    (
        MoodCategory::Calm,
        1,
        "🧘",
        "It's lovely that you're feeling calm and centered.",
        "Peace is something I can return to whenever I need it.",
        "Spend five minutes in mindful meditation to savour this calm.",
    ),
    (
        MoodCategory::Energetic,
        1,
        "⚡",
        "You're full of energy today! Let's put it to good use.",
        "I have the power to make positive things happen.",
        "Tackle a task you've been putting off, or go for a run.",
    ),
    (
        MoodCategory::Tired,
        2,
        "😴",
        "Feeling tired is your body's way of asking for rest.",
        "Taking care of myself is not selfish, it's necessary.",
        "Take a short nap or do some gentle stretching.",
    ),
    (
        MoodCategory::Tired,
        1,
        "🌙",
        "Running low is hard. Be gentle with yourself tonight.",
        "Rest is part of progress.",
        "Put your screen away thirty minutes before bed.",
    ),
    (
        MoodCategory::Stressed,
        2,
        "🌊",
        "Stress can be tough. Let's find a way to ease the pressure.",
        "I can handle challenges one at a time.",
        "Write down what's stressing you and pick one small step to take.",
    ),
    (
        MoodCategory::Stressed,
        1,
        "🫖",
        "It sounds like a lot is on your plate right now.",
        "I don't have to do everything at once.",
        "Step away for ten minutes and make yourself a warm drink.",
    ),
    (
        MoodCategory::Content,
        1,
        "🌸",
        "Contentment is a beautiful feeling. Enjoy this moment.",
        "I appreciate the simple joys in my life.",
        "Practice gratitude by noting what you're thankful for.",
    ),
    (
        MoodCategory::Overwhelmed,
        2,
        "🤍",
        "When everything feels like too much, it helps to pause.",
        "I don't have to do everything at once. Small steps count.",
        "Break your to-do list into tiny tasks and start with just one.",
    ),
    (
        MoodCategory::Overwhelmed,
        1,
        "🪷",
        "That's a lot to carry. Let's set some of it down.",
        "I am allowed to ask for help.",
        "Tell someone you trust one thing they could help you with.",
    ),
    (
        MoodCategory::Optimistic,
        1,
        "🌈",
        "Your optimism is inspiring! Keep looking forward.",
        "Good things are coming my way.",
        "Set a small goal for tomorrow that excites you.",
    ),
];

/// Built-in templates in declaration order.
pub fn builtin_templates() -> Vec<EmpathyTemplate> {
    BUILTIN_TEMPLATES
        .iter()
        .map(
            |&(category, weight, emoji, message, affirmation, activity)| EmpathyTemplate {
                category,
                weight,
                emoji: emoji.to_string(),
                message: message.to_string(),
                affirmation: affirmation.to_string(),
                activity: activity.to_string(),
            },
        )
        .collect()
}

#[derive(Debug, Clone)]
pub struct EmpathyGenerator {
    table: HashMap<MoodCategory, Vec<EmpathyTemplate>>,
    policy: SelectionPolicy,
}

impl EmpathyGenerator {
    /// Built-in table plus `extra` templates. Fails if any category ends up
    /// without a template.
    pub fn new(policy: SelectionPolicy, extra: Vec<EmpathyTemplate>) -> Result<Self, PipelineError> {
        let mut templates = builtin_templates();
        templates.extend(extra);
        Self::from_templates(policy, templates)
    }

    pub fn from_templates(
        policy: SelectionPolicy,
        templates: Vec<EmpathyTemplate>,
    ) -> Result<Self, PipelineError> {
        let mut table: HashMap<MoodCategory, Vec<EmpathyTemplate>> = HashMap::new();
        for t in templates {
            let fields = [&t.emoji, &t.message, &t.affirmation, &t.activity];
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(PipelineError::Config(format!(
                    "empathy template for '{}' has an empty field",
                    t.category
                )));
            }
            if t.weight == 0 {
                return Err(PipelineError::Config(format!(
                    "empathy template for '{}' has zero weight",
                    t.category
                )));
            }
            table.entry(t.category).or_default().push(t);
        }

        let generator = Self { table, policy };
        generator.check_coverage()?;
        Ok(generator)
    }

    /// Every category the classifier can emit must have a template.
    pub fn check_coverage(&self) -> Result<(), PipelineError> {
        match MoodCategory::ALL
            .iter()
            .find(|c| self.candidates(**c).is_empty())
        {
            Some(missing) => Err(PipelineError::UnknownCategory(*missing)),
            None => Ok(()),
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn candidates(&self, category: MoodCategory) -> &[EmpathyTemplate] {
        self.table.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn generate(
        &self,
        classification: &MoodClassification,
    ) -> Result<EmpathyResponse, PipelineError> {
        let candidates = self.candidates(classification.category);
        if candidates.is_empty() {
            return Err(PipelineError::UnknownCategory(classification.category));
        }

        let index = match self.policy {
            SelectionPolicy::FixedFirst => 0,
            SelectionPolicy::WeightedRandom { seed } => {
                weighted_pick(candidates, seed ^ classification.fingerprint)
            }
        };

        Ok(EmpathyResponse::from(&candidates[index]))
    }
}

fn weighted_pick(candidates: &[EmpathyTemplate], seed: u64) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    match WeightedIndex::new(candidates.iter().map(|t| t.weight)) {
        Ok(dist) => dist.sample(&mut rng),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(category: MoodCategory, fingerprint: u64) -> MoodClassification {
        MoodClassification::new(category, 1.0, fingerprint)
    }

    #[test]
    fn test_builtin_table_covers_every_category() {
        let generator = EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![]).unwrap();
        for category in MoodCategory::ALL {
            let response = generator.generate(&classification(category, 0)).unwrap();
            assert!(!response.emoji.is_empty());
            assert!(!response.message.is_empty());
            assert!(!response.affirmation.is_empty());
            assert!(!response.activity.is_empty());
        }
    }

    #[test]
    fn test_fixed_first_returns_first_registered_template() {
        let generator = EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![]).unwrap();
        let first = &generator.candidates(MoodCategory::Sad)[0];
        for fp in 0..20 {
            let response = generator.generate(&classification(MoodCategory::Sad, fp)).unwrap();
            assert_eq!(response.message, first.message);
        }
    }

    #[test]
    fn test_weighted_random_is_deterministic_for_seed_and_input() {
        let policy = SelectionPolicy::WeightedRandom { seed: 7 };
        let a = EmpathyGenerator::new(policy, vec![]).unwrap();
        let b = EmpathyGenerator::new(policy, vec![]).unwrap();
        for fp in 0..50 {
            let c = classification(MoodCategory::Anxious, fp);
            assert_eq!(a.generate(&c).unwrap(), b.generate(&c).unwrap());
        }
    }

    #[test]
    fn test_weighted_random_reaches_every_candidate() {
        let generator =
            EmpathyGenerator::new(SelectionPolicy::WeightedRandom { seed: 1 }, vec![]).unwrap();
        let candidates = generator.candidates(MoodCategory::Happy);
        assert_eq!(candidates.len(), 2);

        let mut seen = std::collections::HashSet::new();
        for fp in 0..200 {
            let r = generator.generate(&classification(MoodCategory::Happy, fp)).unwrap();
            seen.insert(r.message);
        }
        assert_eq!(seen.len(), candidates.len());
    }

    #[test]
    fn test_missing_category_fails_coverage_check() {
        let templates: Vec<EmpathyTemplate> = builtin_templates()
            .into_iter()
            .filter(|t| t.category != MoodCategory::Calm)
            .collect();
        let err = EmpathyGenerator::from_templates(SelectionPolicy::FixedFirst, templates)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategory(MoodCategory::Calm)));
    }

    #[test]
    fn test_rejects_empty_fields_and_zero_weight() {
        let mut blank = builtin_templates()[0].clone();
        blank.affirmation = "  ".to_string();
        assert!(matches!(
            EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![blank]),
            Err(PipelineError::Config(_))
        ));

        let mut weightless = builtin_templates()[0].clone();
        weightless.weight = 0;
        assert!(matches!(
            EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![weightless]),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_extra_templates_are_appended_after_builtins() {
        let extra = EmpathyTemplate {
            category: MoodCategory::Calm,
            weight: 5,
            emoji: "🌊".to_string(),
            message: "Ride the stillness.".to_string(),
            affirmation: "I am steady.".to_string(),
            activity: "Listen to the rain.".to_string(),
        };
        let generator =
            EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![extra.clone()]).unwrap();
        let candidates = generator.candidates(MoodCategory::Calm);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1], extra);
    }

    #[test]
    fn test_render_uses_fixed_layout() {
        let response = EmpathyResponse {
            emoji: "😊".to_string(),
            message: "Nice.".to_string(),
            affirmation: "I am enough.".to_string(),
            activity: "Stretch.".to_string(),
        };
        assert_eq!(
            response.render(),
            "😊 Nice.\n\nAffirmation: I am enough.\nTry this: Stretch."
        );
    }
}
