// Batch Summary
// Client-side view of a classified batch: trust score, suspicious reviews and
// their flags, plus filtering and de-duplication of scraped reviews before
// submission

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::models::ClassificationResult;
use crate::services::text_processor::{char_len, normalize_review_text};

const SHORT_REVIEW_CHARS: usize = 30;
const LONG_REVIEW_CHARS: usize = 500;
const MIN_REVIEW_CHARS: usize = 20;
const MIN_DIGIT_LED_REVIEW_CHARS: usize = 50;

pub const FLAG_AI_DETECTED_FAKE: &str = "ai_detected_fake";
pub const FLAG_TOO_SHORT: &str = "too_short";
pub const FLAG_TOO_LONG: &str = "too_long";
pub const FLAG_EXTREME_LANGUAGE: &str = "extreme_language";
pub const FLAG_REPETITIVE: &str = "repetitive";

static EXTREME_RE: OnceLock<Regex> = OnceLock::new();
static NON_REVIEW_RES: OnceLock<Vec<Regex>> = OnceLock::new();
static DIGIT_LED_RE: OnceLock<Regex> = OnceLock::new();

fn extreme_re() -> &'static Regex {
    EXTREME_RE.get_or_init(|| {
        Regex::new(r"(?i)amazing|incredible|perfect|best ever|worst ever|terrible|awful")
            .expect("extreme language pattern is valid")
    })
}

fn non_review_res() -> &'static [Regex] {
    NON_REVIEW_RES.get_or_init(|| {
        [
            r"(?i)local\s+guide",
            r"(?i)\d+\s+reviews?\s*•\s*\d+\s+photos?",
            r"(?i)\d+\s+photos?\s*•\s*\d+\s+reviews?",
            r"(?i)level\s+\d+",
            r"(?i)write\s+a\s+review",
            r"(?i)add\s+photos?",
            r"(?i)^\d+\s+reviews?$",
            r"(?i)^\d+\s+photos?$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("non-review pattern is valid"))
        .collect()
    })
}

fn digit_led_re() -> &'static Regex {
    DIGIT_LED_RE.get_or_init(|| Regex::new(r"^\d+").expect("digit pattern is valid"))
}

/// A scraped review before submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannedReview {
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspiciousReview {
    pub index: usize,
    pub review_text: String,
    pub confidence: String,
    pub reason_category: String,
    pub reason_description: String,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub total_reviews: usize,
    pub suspicious_count: usize,
    /// Percentage of reviews not flagged, rounded
    pub trust_score: u32,
    pub suspicious_reviews: Vec<SuspiciousReview>,
}

impl BatchSummary {
    /// Summarize results; `texts` and `results` are index-aligned
    pub fn from_results(texts: &[String], results: &[ClassificationResult]) -> Self {
        let suspicious_reviews: Vec<SuspiciousReview> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_fake())
            .map(|(index, r)| {
                let review_text = texts.get(index).cloned().unwrap_or_default();
                SuspiciousReview {
                    index,
                    flags: review_flags(&review_text),
                    review_text,
                    confidence: r.confidence.clone(),
                    reason_category: r.reason_category.clone(),
                    reason_description: r.reason_description.clone(),
                }
            })
            .collect();

        let total_reviews = results.len();
        let suspicious_count = suspicious_reviews.len();

        Self {
            total_reviews,
            suspicious_count,
            trust_score: trust_score(total_reviews, suspicious_count),
            suspicious_reviews,
        }
    }
}

pub fn trust_score(total: usize, suspicious: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    let genuine = total.saturating_sub(suspicious) as f64;
    (genuine / total as f64 * 100.0).round() as u32
}

/// Flags for a review the classifier marked fake
pub fn review_flags(text: &str) -> Vec<String> {
    let mut flags = vec![FLAG_AI_DETECTED_FAKE.to_string()];
    let len = char_len(text);
    if len < SHORT_REVIEW_CHARS {
        flags.push(FLAG_TOO_SHORT.to_string());
    }
    if len > LONG_REVIEW_CHARS {
        flags.push(FLAG_TOO_LONG.to_string());
    }
    if extreme_re().is_match(text) {
        flags.push(FLAG_EXTREME_LANGUAGE.to_string());
    }
    if is_repetitive(text) {
        flags.push(FLAG_REPETITIVE.to_string());
    }
    flags
}

/// Any word longer than three characters used more than twice
fn is_repetitive(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in lowered.split_whitespace().filter(|w| char_len(w) > 3) {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts.values().any(|&count| count > 2)
}

/// Profile badges, photo counters and other scraped text that is not a review
pub fn is_non_review_content(text: &str) -> bool {
    let trimmed = text.trim();
    let len = char_len(text);
    non_review_res().iter().any(|re| re.is_match(trimmed))
        || len < MIN_REVIEW_CHARS
        || (digit_led_re().is_match(trimmed) && len < MIN_DIGIT_LED_REVIEW_CHARS)
}

/// Keep only scraped entries that look like review text
pub fn drop_non_review_content(reviews: Vec<ScannedReview>) -> Vec<ScannedReview> {
    reviews
        .into_iter()
        .filter(|r| !is_non_review_content(&r.text))
        .collect()
}

/// Drop repeated reviews, keyed by normalized author and text; first one wins
pub fn dedupe_reviews(reviews: Vec<ScannedReview>) -> Vec<ScannedReview> {
    let mut seen = HashSet::new();
    reviews
        .into_iter()
        .filter(|r| {
            let author = r.author.as_deref().unwrap_or("").to_lowercase();
            let key = format!("{}|||{}", author.trim(), normalize_review_text(&r.text));
            seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExplanationRecord;

    #[test]
    fn test_trust_score() {
        assert_eq!(trust_score(0, 0), 100);
        assert_eq!(trust_score(4, 1), 75);
        assert_eq!(trust_score(3, 1), 67);
        assert_eq!(trust_score(2, 2), 0);
    }

    #[test]
    fn test_review_flags() {
        assert_eq!(review_flags("too good"), vec!["ai_detected_fake", "too_short"]);
        assert_eq!(review_flags(&"a".repeat(501)), vec!["ai_detected_fake", "too_long"]);
        assert_eq!(review_flags(&"a".repeat(100)), vec!["ai_detected_fake"]);
    }

    #[test]
    fn test_review_flags_extreme_language() {
        let flags = review_flags("The staff were simply INCREDIBLE and the view was lovely");
        assert_eq!(flags, vec!["ai_detected_fake", "extreme_language"]);

        let flags = review_flags("Worst ever. Cold food and rude staff at the counter.");
        assert!(flags.contains(&FLAG_EXTREME_LANGUAGE.to_string()));
    }

    #[test]
    fn test_review_flags_repetitive() {
        let flags = review_flags("Tasty noodles, tasty broth, tasty dumplings at this spot");
        assert_eq!(flags, vec!["ai_detected_fake", "repetitive"]);

        // Short words and two repeats are not enough
        let flags = review_flags("the fish and the rice and the tea were served warm, fish fine");
        assert_eq!(flags, vec!["ai_detected_fake"]);
    }

    #[test]
    fn test_review_flags_all_heuristics() {
        let flags = review_flags(
            "Amazing amazing amazing food, the best ever, perfect service and incredible staff here",
        );
        assert_eq!(
            flags,
            vec!["ai_detected_fake", "extreme_language", "repetitive"]
        );
    }

    #[test]
    fn test_non_review_content() {
        assert!(is_non_review_content("Local Guide · 120 reviews"));
        assert!(is_non_review_content("Local guide profile with a long description here"));
        assert!(is_non_review_content("  34 reviews • 12 photos  and some more text here"));
        assert!(is_non_review_content("Level 6 reviewer with plenty of contributions"));
        assert!(is_non_review_content("Write a review for this restaurant today please"));
        assert!(is_non_review_content("Too short"));
        assert!(is_non_review_content("12 people found this helpful today"));

        assert!(!is_non_review_content("The ramen was rich and the service quick."));
        assert!(!is_non_review_content(
            "2 visits so far and both times the pasta was cooked perfectly al dente"
        ));
    }

    #[test]
    fn test_drop_non_review_content() {
        let reviews = vec![
            ScannedReview { author: None, text: "Local Guide · 48 reviews · 210 photos".into() },
            ScannedReview { author: Some("Mia".into()), text: "Lovely patio and friendly staff all evening.".into() },
            ScannedReview { author: Some("Jo".into()), text: "Great!".into() },
        ];
        let kept = drop_non_review_content(reviews);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].author.as_deref(), Some("Mia"));
    }

    #[test]
    fn test_summary_from_results() {
        let texts = vec!["Amazing!!! Use code X".to_string(), "Decent noodles, long wait.".to_string()];
        let results = vec![
            ClassificationResult::new(true, 0.91, ExplanationRecord::new("Promotional Spam", "Code.")),
            ClassificationResult::new(false, 0.8, ExplanationRecord::genuine()),
        ];

        let summary = BatchSummary::from_results(&texts, &results);
        assert_eq!(summary.total_reviews, 2);
        assert_eq!(summary.suspicious_count, 1);
        assert_eq!(summary.trust_score, 50);
        assert_eq!(summary.suspicious_reviews[0].index, 0);
        assert_eq!(summary.suspicious_reviews[0].confidence, "0.9100");
        assert_eq!(summary.suspicious_reviews[0].reason_category, "Promotional Spam");
        assert!(summary.suspicious_reviews[0].flags.contains(&"too_short".to_string()));
    }

    #[test]
    fn test_dedupe_reviews() {
        let reviews = vec![
            ScannedReview { author: Some("Ana".into()), text: "Great  food".into() },
            ScannedReview { author: Some(" ana ".into()), text: "great food ".into() },
            ScannedReview { author: Some("Bo".into()), text: "Great food".into() },
            ScannedReview { author: None, text: "Great food".into() },
        ];
        let unique = dedupe_reviews(reviews);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].text, "Great  food");
        assert_eq!(unique[1].author.as_deref(), Some("Bo"));
    }
}
