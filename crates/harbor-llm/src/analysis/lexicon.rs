//! Lexicon scorer for how assistants describe brands in recommendations.

/// Word weights for product-recommendation language.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("best", 0.5),
    ("excellent", 0.5),
    ("outstanding", 0.5),
    ("leading", 0.4),
    ("top", 0.4),
    ("great", 0.4),
    ("trusted", 0.4),
    ("reliable", 0.4),
    ("recommended", 0.4),
    ("recommend", 0.4),
    ("popular", 0.3),
    ("innovative", 0.3),
    ("intuitive", 0.3),
    ("durable", 0.3),
    ("comfortable", 0.3),
    ("affordable", 0.3),
    ("versatile", 0.3),
    ("powerful", 0.3),
    ("good", 0.3),
    ("quality", 0.3),
    ("solid", 0.2),
    ("favorite", 0.4),
    ("love", 0.4),
    // Negative signals
    ("expensive", -0.3),
    ("overpriced", -0.5),
    ("clunky", -0.4),
    ("outdated", -0.4),
    ("limited", -0.3),
    ("unreliable", -0.5),
    ("complicated", -0.3),
    ("confusing", -0.3),
    ("poor", -0.5),
    ("bad", -0.4),
    ("worst", -0.6),
    ("avoid", -0.6),
    ("recall", -0.7),
    ("complaints", -0.4),
    ("issues", -0.3),
    ("problems", -0.3),
    ("lacks", -0.3),
    ("slow", -0.3),
    ("buggy", -0.5),
];

fn normalise(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase()
}

fn weight_of(word: &str) -> Option<f32> {
    LEXICON
        .iter()
        .find(|(lex_word, _)| *lex_word == word)
        .map(|&(_, weight)| weight)
}

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let score: f32 = text
        .split_whitespace()
        .filter_map(|word| weight_of(&normalise(word)))
        .sum();
    score.clamp(-1.0, 1.0)
}

/// The lexicon word in `text` with the largest absolute weight.
///
/// Ties go to the first occurrence.
#[must_use]
pub fn strongest_word(text: &str) -> Option<String> {
    let mut best: Option<(String, f32)> = None;
    for word in text.split_whitespace() {
        let w = normalise(word);
        if let Some(weight) = weight_of(&w) {
            if best.as_ref().is_none_or(|(_, b)| weight.abs() > b.abs()) {
                best = Some((w, weight));
            }
        }
    }
    best.map(|(word, _)| word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_keyword_returns_positive() {
        let score = lexicon_score("a reliable choice for runners");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn negative_keyword_returns_negative() {
        let score = lexicon_score("it is overpriced for what you get");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn score_clamps_to_positive_one() {
        let text = "best excellent outstanding leading top great trusted";
        assert_eq!(lexicon_score(text), 1.0);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        assert!(lexicon_score("Durable!") > 0.0);
    }

    #[test]
    fn strongest_word_prefers_largest_magnitude() {
        assert_eq!(
            strongest_word("good shoes, but avoid the clearance line").as_deref(),
            Some("avoid")
        );
    }

    #[test]
    fn strongest_word_none_without_lexicon_hits() {
        assert_eq!(strongest_word("shoes for running"), None);
    }
}
