//! Mention Finder (spec §4.3): heuristically identifies candidate
//! character/location mention spans in a scene.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use illumine_core::model::{EntityKind, Mention};

/// ~80 common words excluded from the single-capitalized-word character
/// heuristic, mostly sentence-initial connectives and generic deictics that
/// happen to be capitalized at the start of a sentence.
const STOPWORDS: &[&str] = &[
    "the", "this", "that", "these", "those", "a", "an", "it", "its", "if", "when", "while",
    "although", "because", "since", "after", "before", "during", "though", "meanwhile",
    "however", "then", "now", "here", "there", "she", "he", "they", "we", "you", "i", "what",
    "who", "whom", "where", "why", "how", "suddenly", "finally", "perhaps", "indeed", "still",
    "yet", "also", "again", "once", "every", "each", "some", "many", "few", "all", "most",
    "such", "other", "another", "same", "only", "just", "even", "soon", "later", "today",
    "tomorrow", "yesterday", "morning", "evening", "night", "day", "and", "but", "or", "nor",
    "for", "so", "yes", "no", "well", "oh", "ah", "too", "very", "much", "more", "less",
    "first", "last", "next", "upon", "above", "below",
];

const TITLES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "lady", "sir", "captain", "lord", "professor", "king", "queen",
    "prince", "princess", "general", "major", "colonel", "father", "mother", "duke", "duchess",
    "baron", "baroness",
];

const PRONOUNS: &[&str] = &[
    "he", "him", "his", "she", "her", "hers", "they", "them", "their", "theirs",
];

const KINSHIP_TERMS: &[&str] = &[
    "mother", "father", "brother", "sister", "son", "daughter", "uncle", "aunt", "cousin",
    "grandmother", "grandfather", "wife", "husband",
];

const GENERIC_ROLE_NOUNS: &[&str] = &[
    "king", "queen", "prince", "princess", "knight", "wizard", "soldier", "guard", "merchant",
    "farmer", "priest", "witch", "warrior",
];

const LOCATION_LEXICON: &[&str] = &[
    "castle", "tower", "forest", "village", "city", "mountain", "river", "valley", "kingdom",
    "temple", "palace", "harbor", "island", "cave", "bridge", "road", "garden", "chamber",
    "hall", "courtyard",
];

fn titled_form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let titles = TITLES.join("|");
        Regex::new(&format!(
            r"(?i)\b(?:{titles})\.?\s+([A-Z][a-zA-Z']+)"
        ))
        .expect("static titled-form regex is valid")
    })
}

fn single_capitalized_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z']{2,19}\b").expect("static regex is valid"))
}

fn pronoun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words = PRONOUNS.join("|");
        Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("static pronoun regex is valid")
    })
}

fn kinship_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words = KINSHIP_TERMS.join("|");
        Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("static kinship regex is valid")
    })
}

fn generic_role_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words = GENERIC_ROLE_NOUNS.join("|");
        Regex::new(&format!(r"(?i)\bthe\s+((?:{words}))\b")).expect("static role regex is valid")
    })
}

fn prepositional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:in|at|to|from|near|beyond|across|through|beside|within)\s+(?:the\s+)?([A-Z][A-Za-z']*(?:\s+[A-Z][A-Za-z']*)*)",
        )
        .expect("static prepositional regex is valid")
    })
}

fn location_lexicon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words = LOCATION_LEXICON.join("|");
        Regex::new(&format!(
            r"(?i)\bthe\s+([a-zA-Z]+\s+)?((?:{words}))\b"
        ))
        .expect("static location-lexicon regex is valid")
    })
}

fn directional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bthe\s+((?:north|south|east|west)(?:ern)?)\s+([a-zA-Z]+)\b")
            .expect("static directional regex is valid")
    })
}

/// `find_mentions(scene_text) -> set of Mention` (§4.3).
pub fn find_mentions(scene_text: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for (sentence, sentence_start) in split_sentences(scene_text) {
        let mut push = |start: usize, end: usize, kind_hint: Option<EntityKind>, is_pronoun: bool| {
            let raw_text = &scene_text[start..end];
            if raw_text.len() < 2 || raw_text.len() > 50 {
                return;
            }
            let key = (raw_text.to_lowercase(), sentence.to_string());
            if !seen.insert(key) {
                return;
            }
            mentions.push(Mention {
                span_start: start,
                span_end: end,
                raw_text: raw_text.to_string(),
                surrounding_sentence: sentence.to_string(),
                kind_hint,
                is_pronoun,
            });
        };

        for cap in titled_form_re().captures_iter(sentence) {
            if let Some(m) = cap.get(0) {
                push(
                    sentence_start + m.start(),
                    sentence_start + m.end(),
                    Some(EntityKind::Character),
                    false,
                );
            }
        }

        for m in single_capitalized_re().find_iter(sentence) {
            let word = m.as_str();
            if STOPWORDS.contains(&word.to_lowercase().as_str()) {
                continue;
            }
            // Skip words already covered by a titled form at this position.
            push(
                sentence_start + m.start(),
                sentence_start + m.end(),
                Some(EntityKind::Character),
                false,
            );
        }

        for m in pronoun_re().find_iter(sentence) {
            push(
                sentence_start + m.start(),
                sentence_start + m.end(),
                Some(EntityKind::Character),
                true,
            );
        }

        for m in kinship_re().find_iter(sentence) {
            push(
                sentence_start + m.start(),
                sentence_start + m.end(),
                Some(EntityKind::Character),
                false,
            );
        }

        for cap in generic_role_re().captures_iter(sentence) {
            if let Some(m) = cap.get(1) {
                push(
                    sentence_start + m.start(),
                    sentence_start + m.end(),
                    Some(EntityKind::Character),
                    false,
                );
            }
        }

        for cap in prepositional_re().captures_iter(sentence) {
            if let Some(m) = cap.get(1) {
                push(
                    sentence_start + m.start(),
                    sentence_start + m.end(),
                    Some(EntityKind::Location),
                    false,
                );
            }
        }

        for cap in location_lexicon_re().captures_iter(sentence) {
            if let Some(m) = cap.get(0) {
                push(
                    sentence_start + m.start(),
                    sentence_start + m.end(),
                    Some(EntityKind::Location),
                    false,
                );
            }
        }

        for cap in directional_re().captures_iter(sentence) {
            if let Some(m) = cap.get(0) {
                push(
                    sentence_start + m.start(),
                    sentence_start + m.end(),
                    Some(EntityKind::Location),
                    false,
                );
            }
        }
    }

    mentions
}

/// Sentence-split on `.?!`, returning each sentence with its byte offset
/// into the original text.
fn split_sentences(text: &str) -> Vec<(&str, usize)> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        if matches!(b, b'.' | b'?' | b'!') {
            if i + 1 > start {
                sentences.push((&text[start..=i], start));
            }
            start = i + 1;
        }
    }
    if start < text.len() {
        sentences.push((&text[start..], start));
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_text_returns_no_mentions() {
        assert!(find_mentions("").is_empty());
    }

    #[test]
    fn finds_simple_character_and_location() {
        let text = "Lyra climbed the stairs of the Crystal Tower. Lyra paused to look back.";
        let mentions = find_mentions(text);
        assert!(mentions.iter().any(|m| m.raw_text == "Lyra"));
        assert!(mentions
            .iter()
            .any(|m| m.kind_hint == Some(EntityKind::Location)));
    }

    #[test]
    fn deduplicates_by_lowercase_text_and_sentence() {
        let text = "Lyra and Lyra walked together in the hall.";
        let mentions = find_mentions(text);
        let lyra_count = mentions.iter().filter(|m| m.raw_text == "Lyra").count();
        assert_eq!(lyra_count, 1);
    }

    #[test]
    fn titled_form_is_captured() {
        let text = "Captain Harrow gave the order.";
        let mentions = find_mentions(text);
        assert!(mentions
            .iter()
            .any(|m| m.raw_text.contains("Harrow") && m.kind_hint == Some(EntityKind::Character)));
    }

    #[test]
    fn pronoun_mentions_are_flagged() {
        let text = "She walked away.";
        let mentions = find_mentions(text);
        assert!(mentions.iter().any(|m| m.is_pronoun));
    }

    #[test]
    fn stopwords_are_excluded_from_character_candidates() {
        let text = "The soldiers marched on.";
        let mentions = find_mentions(text);
        assert!(!mentions.iter().any(|m| m.raw_text == "The"));
    }

    #[test]
    fn mention_span_length_bounds_are_enforced() {
        let text = "Ab went to Xy.";
        let mentions = find_mentions(text);
        for m in &mentions {
            assert!(m.raw_text.len() >= 2 && m.raw_text.len() <= 50);
        }
    }
}
