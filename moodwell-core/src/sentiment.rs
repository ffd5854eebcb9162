//! Lexical sentiment classifier
//!
//! Scores word tokens against a weighted keyword lexicon:
//!
//!   score(category) = Σ weight(keyword) × boost × [not negated]
//!
//! - boost = 2.0 when an intensifier ("very", "so", ...) sits in the two
//!   tokens before the keyword, else 1.0
//! - a negator ("not", "never", ...) in the three tokens before the keyword
//!   moves its weight to `category.opposite()`
//!
//! Highest score wins, earlier categories win ties. With no match the
//! configured default category is returned with confidence 0.0.

use std::collections::HashMap;

use regex::Regex;

use crate::config::ClassifierConfig;
use crate::error::PipelineError;
use crate::models::mood::CategoryTally;
use crate::models::{MoodCategory, MoodClassification};

const NEGATION_WINDOW: usize = 3;
const INTENSIFIER_WINDOW: usize = 2;
const INTENSIFIER_BOOST: f32 = 2.0;

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "isn't", "wasn't", "aren't", "hardly", "barely",
];

const INTENSIFIERS: &[&str] = &["very", "so", "really", "extremely", "super", "incredibly"];

const LEXICON: &[(MoodCategory, &str, f32)] = &[
    (MoodCategory::Happy, "happy", 1.0),
    (MoodCategory::Happy, "great", 1.0),
    (MoodCategory::Happy, "glad", 1.0),
    (MoodCategory::Happy, "joy", 1.0),
    (MoodCategory::Happy, "joyful", 1.0),
    (MoodCategory::Happy, "wonderful", 1.0),
    (MoodCategory::Happy, "amazing", 1.0),
    (MoodCategory::Happy, "awesome", 1.0),
    (MoodCategory::Happy, "fantastic", 1.0),
    (MoodCategory::Happy, "delighted", 1.0),
    (MoodCategory::Happy, "cheerful", 1.0),
    (MoodCategory::Happy, "good", 0.5),
    (MoodCategory::Happy, "love", 0.5),
    (MoodCategory::Sad, "sad", 1.0),
    (MoodCategory::Sad, "unhappy", 1.0),
    (MoodCategory::Sad, "depressed", 1.0),
    (MoodCategory::Sad, "lonely", 1.0),
    (MoodCategory::Sad, "miserable", 1.0),
    (MoodCategory::Sad, "heartbroken", 1.0),
    (MoodCategory::Sad, "crying", 1.0),
    (MoodCategory::Sad, "cry", 1.0),
    (MoodCategory::Sad, "upset", 1.0),
    (MoodCategory::Sad, "gloomy", 1.0),
    (MoodCategory::Sad, "down", 0.5),
    (MoodCategory::Sad, "bad", 0.5),
    (MoodCategory::Anxious, "anxious", 1.0),
    (MoodCategory::Anxious, "anxiety", 1.0),
    (MoodCategory::Anxious, "worried", 1.0),
    (MoodCategory::Anxious, "worry", 1.0),
    (MoodCategory::Anxious, "nervous", 1.0),
    (MoodCategory::Anxious, "panic", 1.0),
    (MoodCategory::Anxious, "scared", 1.0),
    (MoodCategory::Anxious, "afraid", 1.0),
    (MoodCategory::Anxious, "uneasy", 1.0),
    (MoodCategory::Anxious, "restless", 0.5),
    (MoodCategory::Calm, "calm", 1.0),
    (MoodCategory::Calm, "peaceful", 1.0),
    (MoodCategory::Calm, "relaxed", 1.0),
    (MoodCategory::Calm, "serene", 1.0),
    (MoodCategory::Calm, "tranquil", 1.0),
    (MoodCategory::Calm, "centered", 1.0),
    (MoodCategory::Calm, "chill", 0.5),
    (MoodCategory::Energetic, "energetic", 1.0),
    (MoodCategory::Energetic, "energized", 1.0),
    (MoodCategory::Energetic, "excited", 1.0),
    (MoodCategory::Energetic, "pumped", 1.0),
    (MoodCategory::Energetic, "motivated", 1.0),
    (MoodCategory::Energetic, "lively", 1.0),
    (MoodCategory::Energetic, "active", 0.5),
    (MoodCategory::Tired, "tired", 1.0),
    (MoodCategory::Tired, "exhausted", 1.0),
    (MoodCategory::Tired, "sleepy", 1.0),
    (MoodCategory::Tired, "drained", 1.0),
    (MoodCategory::Tired, "fatigued", 1.0),
    (MoodCategory::Tired, "weary", 1.0),
    (MoodCategory::Tired, "worn", 0.5),
    (MoodCategory::Stressed, "stressed", 1.0),
    (MoodCategory::Stressed, "stress", 1.0),
    (MoodCategory::Stressed, "tense", 1.0),
    (MoodCategory::Stressed, "frustrated", 1.0),
    (MoodCategory::Stressed, "pressure", 1.0),
    (MoodCategory::Stressed, "deadline", 0.5),
    (MoodCategory::Stressed, "deadlines", 0.5),
    (MoodCategory::Stressed, "angry", 0.5),
    (MoodCategory::Content, "content", 1.0),
    (MoodCategory::Content, "satisfied", 1.0),
    (MoodCategory::Content, "grateful", 1.0),
    (MoodCategory::Content, "thankful", 1.0),
    (MoodCategory::Content, "fine", 0.5),
    (MoodCategory::Content, "okay", 0.5),
    (MoodCategory::Content, "alright", 0.5),
    (MoodCategory::Overwhelmed, "overwhelmed", 1.0),
    (MoodCategory::Overwhelmed, "overwhelming", 1.0),
    (MoodCategory::Overwhelmed, "swamped", 1.0),
    (MoodCategory::Overwhelmed, "drowning", 1.0),
    (MoodCategory::Overwhelmed, "buried", 0.5),
    (MoodCategory::Optimistic, "optimistic", 1.0),
    (MoodCategory::Optimistic, "hopeful", 1.0),
    (MoodCategory::Optimistic, "hope", 1.0),
    (MoodCategory::Optimistic, "confident", 1.0),
    (MoodCategory::Optimistic, "positive", 1.0),
    (MoodCategory::Optimistic, "bright", 0.5),
];

/// Weight given to keywords added through configuration.
const EXTRA_KEYWORD_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    lexicon: HashMap<String, (MoodCategory, f32)>,
    default_category: MoodCategory,
    tokenizer: Regex,
}

impl SentimentClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, PipelineError> {
        let tokenizer = Regex::new(r"[a-z']+")
            .map_err(|e| PipelineError::Config(format!("tokenizer pattern: {}", e)))?;

        let mut lexicon: HashMap<String, (MoodCategory, f32)> = LEXICON
            .iter()
            .map(|&(category, word, weight)| (word.to_string(), (category, weight)))
            .collect();

        for (name, words) in &config.extra_keywords {
            let category = MoodCategory::parse(name).ok_or_else(|| {
                PipelineError::Config(format!("unknown mood category '{}' in extra_keywords", name))
            })?;
            for word in words {
                let word = word.trim().to_lowercase();
                if word.is_empty() || word.split_whitespace().count() != 1 {
                    return Err(PipelineError::Config(format!(
                        "extra keyword '{}' for '{}' must be a single word",
                        word, name
                    )));
                }
                lexicon.insert(word, (category, EXTRA_KEYWORD_WEIGHT));
            }
        }

        Ok(Self {
            lexicon,
            default_category: config.default_category,
            tokenizer,
        })
    }

    /// Every category this classifier can return.
    pub fn categories(&self) -> Vec<MoodCategory> {
        let mut out: Vec<MoodCategory> = self.lexicon.values().map(|(c, _)| *c).collect();
        out.extend(out.clone().into_iter().map(|c| c.opposite()));
        out.push(self.default_category);
        out.sort();
        out.dedup();
        out
    }

    pub fn classify(&self, text: &str) -> Result<MoodClassification, PipelineError> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Err(PipelineError::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }

        let tokens: Vec<&str> = self
            .tokenizer
            .find_iter(&normalized)
            .map(|m| m.as_str())
            .collect();

        let mut tally = CategoryTally::default();
        for (i, token) in tokens.iter().enumerate() {
            let Some(&(category, weight)) = self.lexicon.get(*token) else {
                continue;
            };

            let boost = if preceded_by(&tokens, i, INTENSIFIER_WINDOW, INTENSIFIERS) {
                INTENSIFIER_BOOST
            } else {
                1.0
            };

            let target = if preceded_by(&tokens, i, NEGATION_WINDOW, NEGATORS) {
                category.opposite()
            } else {
                category
            };

            tally.add(target, weight * boost);
        }

        let fingerprint = fingerprint(&normalized);
        let classification = match tally.winner() {
            Some((category, score)) => {
                MoodClassification::new(category, score / tally.total(), fingerprint)
            }
            None => MoodClassification::new(self.default_category, 0.0, fingerprint),
        };

        tracing::debug!(
            category = %classification.category,
            confidence = classification.confidence,
            tokens = tokens.len(),
            "Classified text"
        );

        Ok(classification)
    }
}

fn preceded_by(tokens: &[&str], index: usize, window: usize, words: &[&str]) -> bool {
    tokens[index.saturating_sub(window)..index]
        .iter()
        .any(|t| words.contains(t))
}

/// Lowercase, straighten apostrophes, collapse whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase().replace('\u{2019}', "'"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// FNV-1a, stable across processes and platforms.
fn fingerprint(text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::empathy::{EmpathyGenerator, SelectionPolicy};

    fn classifier() -> SentimentClassifier {
        SentimentClassifier::new(&ClassifierConfig::default()).unwrap()
    }

    fn category_of(text: &str) -> MoodCategory {
        classifier().classify(text).unwrap().category
    }

    #[test]
    fn test_empty_and_whitespace_input_rejected() {
        let c = classifier();
        assert!(matches!(c.classify(""), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(c.classify("   \n\t"), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_basic_keywords() {
        assert_eq!(category_of("I feel great today"), MoodCategory::Happy);
        assert_eq!(category_of("I'm so lonely and sad"), MoodCategory::Sad);
        assert_eq!(category_of("Worried about my exam"), MoodCategory::Anxious);
        assert_eq!(category_of("Completely exhausted after work"), MoodCategory::Tired);
        assert_eq!(category_of("Deadlines everywhere, I'm stressed"), MoodCategory::Stressed);
        assert_eq!(category_of("I am swamped and overwhelmed"), MoodCategory::Overwhelmed);
        assert_eq!(category_of("Feeling hopeful about tomorrow"), MoodCategory::Optimistic);
        assert_eq!(category_of("A peaceful, relaxed evening"), MoodCategory::Calm);
        assert_eq!(category_of("So pumped for the game!"), MoodCategory::Energetic);
        assert_eq!(category_of("Just grateful for my friends"), MoodCategory::Content);
    }

    #[test]
    fn test_negation_flips_to_opposite() {
        assert_eq!(category_of("I'm not happy at all"), MoodCategory::Sad);
        assert_eq!(category_of("I don't feel calm"), MoodCategory::Anxious);
        assert_eq!(category_of("never tired these days"), MoodCategory::Energetic);
    }

    #[test]
    fn test_negation_outside_window_is_ignored() {
        assert_eq!(
            category_of("not that it matters much but happy"),
            MoodCategory::Happy
        );
    }

    #[test]
    fn test_intensifier_outweighs_plain_keyword() {
        // sad=1.0 vs happy=2.0
        assert_eq!(category_of("a bit sad but really happy"), MoodCategory::Happy);
    }

    #[test]
    fn test_curly_apostrophe_negation() {
        assert_eq!(category_of("I don\u{2019}t feel happy"), MoodCategory::Sad);
    }

    #[test]
    fn test_no_keyword_uses_default_with_zero_confidence() {
        let result = classifier().classify("The bus was on time").unwrap();
        assert_eq!(result.category, MoodCategory::Content);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_ties_go_to_earlier_category() {
        assert_eq!(category_of("happy and sad"), MoodCategory::Happy);
    }

    #[test]
    fn test_confidence_is_share_of_total() {
        let result = classifier().classify("happy happy happy sad").unwrap();
        assert_eq!(result.category, MoodCategory::Happy);
        assert!((result.confidence - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_classify_is_pure() {
        let c = classifier();
        for text in ["I feel great today", "meh", "not calm, very worried", "Tired."] {
            let first = c.classify(text).unwrap();
            for _ in 0..5 {
                assert_eq!(c.classify(text).unwrap(), first);
            }
        }
    }

    #[test]
    fn test_fingerprint_ignores_case_and_spacing() {
        let c = classifier();
        let a = c.classify("I feel  GREAT today").unwrap();
        let b = c.classify("i feel great today").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_extra_keywords_from_config() {
        let mut config = ClassifierConfig::default();
        config
            .extra_keywords
            .insert("tired".to_string(), vec!["Knackered".to_string()]);
        let c = SentimentClassifier::new(&config).unwrap();
        assert_eq!(c.classify("totally knackered").unwrap().category, MoodCategory::Tired);
    }

    #[test]
    fn test_bad_extra_keywords_rejected() {
        let mut config = ClassifierConfig::default();
        config
            .extra_keywords
            .insert("grumpy".to_string(), vec!["meh".to_string()]);
        assert!(matches!(
            SentimentClassifier::new(&config),
            Err(PipelineError::Config(_))
        ));

        let mut config = ClassifierConfig::default();
        config
            .extra_keywords
            .insert("sad".to_string(), vec!["feeling blue".to_string()]);
        assert!(matches!(
            SentimentClassifier::new(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_every_classifier_category_has_templates() {
        let generator = EmpathyGenerator::new(SelectionPolicy::FixedFirst, vec![]).unwrap();
        for category in classifier().categories() {
            let c = MoodClassification::new(category, 1.0, 0);
            assert!(generator.generate(&c).is_ok(), "no template for {}", category);
        }
    }
}
