//! Evolution Tracker (spec §4.7): records how an entity's description
//! changes, chapter over chapter, as a structured diff.

use illumine_core::model::{Entity, EvolutionRecord};

const IDENTICAL_SIMILARITY: f64 = 1.0;
const MINIMAL_CHANGE_SIMILARITY: f64 = 0.95;
const MIN_PHRASE_LEN: usize = 3;
const SENTENCE_SIMILARITY_LOW: f64 = 0.5;
const SENTENCE_SIMILARITY_HIGH: f64 = 0.95;

const APPEARANCE: &[&str] = &[
    "tall", "short", "slender", "muscular", "scarred", "beautiful", "handsome", "pale",
    "freckled", "wrinkled",
];
const CLOTHING: &[&str] = &[
    "cloak", "armor", "robe", "dress", "boots", "hood", "cape", "tunic", "gloves", "crown",
];
const EMOTIONAL_STATE: &[&str] = &[
    "anxious", "confident", "afraid", "joyful", "angry", "calm", "determined", "exhausted",
    "hopeful", "grim",
];
const PHYSICAL_CONDITION: &[&str] = &[
    "wounded", "healthy", "weak", "strong", "injured", "recovering", "feverish", "limping",
];

fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Maximal contiguous runs, in `haystack`'s own word order, of words absent
/// from `reference`, rendered as space-joined phrases longer than
/// [`MIN_PHRASE_LEN`] characters.
fn phrase_runs(haystack: &[String], reference_set: &std::collections::HashSet<&str>) -> Vec<String> {
    let mut phrases = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in haystack {
        if !reference_set.contains(word.as_str()) {
            current.push(word);
        } else if !current.is_empty() {
            phrases.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        phrases.push(current.join(" "));
    }
    phrases.into_iter().filter(|p| p.len() > MIN_PHRASE_LEN).collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn sentence_modifications(old: &str, new: &str) -> Vec<String> {
    let old_sentences = split_sentences(old);
    let new_sentences = split_sentences(new);
    let mut changes = Vec::new();

    for new_sentence in &new_sentences {
        let best = old_sentences
            .iter()
            .map(|old_sentence| {
                (
                    old_sentence,
                    strsim::normalized_levenshtein(old_sentence, new_sentence),
                )
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((old_sentence, similarity)) = best {
            if (SENTENCE_SIMILARITY_LOW..SENTENCE_SIMILARITY_HIGH).contains(&similarity) {
                changes.push(format!("\"{old_sentence}\" \u{2192} \"{new_sentence}\""));
            }
        }
    }
    changes
}

fn attribute_changes(old: &str, new: &str) -> Vec<String> {
    let old_lower = old.to_lowercase();
    let new_lower = new.to_lowercase();
    let vocabularies: [(&str, &[&str]); 4] = [
        ("appearance", APPEARANCE),
        ("clothing", CLOTHING),
        ("emotional state", EMOTIONAL_STATE),
        ("physical condition", PHYSICAL_CONDITION),
    ];

    let mut changes = Vec::new();
    for (category, vocabulary) in vocabularies {
        for keyword in vocabulary {
            let was_present = has_word(&old_lower, keyword);
            let is_present = has_word(&new_lower, keyword);
            if was_present && !is_present {
                changes.push(format!("{category}: no longer {keyword}"));
            } else if !was_present && is_present {
                changes.push(format!("{category}: now {keyword}"));
            }
        }
    }
    changes
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == word)
}

/// `track(entity, new_description, at_chapter) -> EvolutionRecord | none` (§4.7).
pub fn track(entity: &Entity, new_description: &str, at_chapter: u32) -> Option<EvolutionRecord> {
    let old_normalized = normalize(&entity.description);
    let new_normalized = normalize(new_description);

    let similarity = if old_normalized == new_normalized {
        IDENTICAL_SIMILARITY
    } else {
        strsim::normalized_levenshtein(&old_normalized, &new_normalized)
    };

    if old_normalized == new_normalized {
        return None;
    }

    if similarity > MINIMAL_CHANGE_SIMILARITY {
        return Some(EvolutionRecord {
            entity_id: entity.id,
            at_chapter,
            previous_description: entity.description.clone(),
            new_description: new_description.to_string(),
            updated: false,
            changes: vec!["minimal changes".to_string()],
        });
    }

    let old_words = words(&entity.description);
    let new_words = words(new_description);
    let old_set: std::collections::HashSet<&str> = old_words.iter().map(|w| w.as_str()).collect();
    let new_set: std::collections::HashSet<&str> = new_words.iter().map(|w| w.as_str()).collect();

    let mut changes = Vec::new();
    for phrase in phrase_runs(&new_words, &old_set) {
        changes.push(format!("added: {phrase}"));
    }
    for phrase in phrase_runs(&old_words, &new_set) {
        changes.push(format!("removed: {phrase}"));
    }
    changes.extend(sentence_modifications(&entity.description, new_description));
    changes.extend(attribute_changes(&entity.description, new_description));

    if changes.is_empty() {
        return None;
    }

    Some(EvolutionRecord {
        entity_id: entity.id,
        at_chapter,
        previous_description: entity.description.clone(),
        new_description: new_description.to_string(),
        updated: true,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use illumine_core::model::EntityKind;
    use uuid::Uuid;

    fn entity(description: &str) -> Entity {
        Entity {
            id: Uuid::new_v4(),
            work_id: Uuid::new_v4(),
            name: "Lyra".into(),
            kind: EntityKind::Character,
            description: description.to_string(),
            aliases: vec![],
            first_appearance_chapter: 1,
            active: true,
        }
    }

    #[test]
    fn identical_descriptions_emit_nothing() {
        let e = entity("a tall mage in a blue cloak");
        assert!(track(&e, "a tall mage in a blue cloak", 2).is_none());
    }

    #[test]
    fn near_identical_emits_minimal_changes_record() {
        let e = entity("a tall mage in a blue cloak");
        let record = track(&e, "a tall mage in a blue cloaks", 2);
        assert!(record.is_some());
        let record = record.unwrap();
        assert!(!record.updated);
        assert_eq!(record.changes, vec!["minimal changes".to_string()]);
    }

    #[test]
    fn substantial_change_produces_attribute_diff() {
        let e = entity("a wounded soldier wears a tattered cloak and feels afraid");
        let record = track(
            &e,
            "a healthy soldier wears shining armor and feels confident",
            3,
        );
        let record = record.expect("expected a record");
        assert!(record.updated);
        assert!(record.changes.iter().any(|c| c.contains("no longer wounded")));
        assert!(record.changes.iter().any(|c| c.contains("now healthy")));
    }
}
