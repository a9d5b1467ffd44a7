//! Entity Resolver (spec §4.4): scores every known entity against every
//! mention and picks the best match, if any clears the confidence floor.

use illumine_core::config::Thresholds;
use illumine_core::model::{Entity, EntityKind, EntityLink, Mention};
use uuid::Uuid;

const CHARACTER_VERBS: &[&str] = &[
    "said", "smiled", "frowned", "nodded", "shouted", "whispered", "laughed", "cried", "walked",
    "ran", "grabbed", "looked", "turned", "stood", "sat", "replied", "asked", "answered",
];

const BODY_PART_NOUNS: &[&str] = &[
    "eyes", "hands", "face", "hair", "shoulders", "chest", "arms", "legs", "fingers", "lips",
];

const LOCATION_PREPOSITIONS: &[&str] = &[
    "in", "at", "to", "from", "near", "beyond", "across", "through", "beside", "within",
];

const LOCATION_LEXICON: &[&str] = &[
    "castle", "tower", "forest", "village", "city", "mountain", "river", "valley", "kingdom",
    "temple", "palace", "harbor", "island", "cave", "bridge", "road", "garden", "chamber",
    "hall", "courtyard",
];

const UNRESOLVED_FLOOR: f64 = 0.1;

fn base_score(candidate_name: &str, aliases: &[String], mention_text: &str) -> f64 {
    let mention_lower = mention_text.to_lowercase();
    let name_lower = candidate_name.to_lowercase();

    if mention_lower == name_lower {
        return 1.00;
    }
    if aliases.iter().any(|a| a.to_lowercase() == mention_lower) {
        return 0.95;
    }

    let similarity = strsim::normalized_levenshtein(&mention_lower, &name_lower);
    let contains = name_lower.contains(&mention_lower) || mention_lower.contains(&name_lower);

    let mut best = 0.0f64;
    if contains && similarity > 0.7 {
        best = best.max(similarity * 0.80);
    }
    best
}

fn similarity_tier(candidate_name: &str, mention_text: &str, threshold: f64) -> f64 {
    let similarity =
        strsim::normalized_levenshtein(&mention_text.to_lowercase(), &candidate_name.to_lowercase());
    if similarity >= threshold {
        similarity * 0.70
    } else {
        0.0
    }
}

fn has_word(sentence: &str, words: &[&str]) -> bool {
    let lower = sentence.to_lowercase();
    words.iter().any(|w| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == *w)
    })
}

fn is_proper_noun_shaped(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_uppercase())
}

fn contextual_multiplier(mention: &Mention, entity_kind: EntityKind) -> f64 {
    let mut multiplier = 1.0;
    let sentence = &mention.surrounding_sentence;

    if entity_kind == EntityKind::Character
        && (has_word(sentence, CHARACTER_VERBS) || has_word(sentence, BODY_PART_NOUNS))
    {
        multiplier *= 1.2;
    }
    if entity_kind == EntityKind::Location
        && (has_word(sentence, LOCATION_PREPOSITIONS) || has_word(sentence, LOCATION_LEXICON))
    {
        multiplier *= 1.2;
    }
    if mention.is_pronoun {
        multiplier *= 0.6;
    }
    if is_proper_noun_shaped(&mention.raw_text) {
        multiplier *= 1.1;
    }

    multiplier
}

struct Scored {
    entity_id: uuid::Uuid,
    confidence: f64,
}

fn score_mention(mention: &Mention, known_entities: &[Entity], thresholds: &Thresholds) -> Vec<Scored> {
    let mut scored: Vec<Scored> = known_entities
        .iter()
        .map(|entity| {
            let base = base_score(&entity.name, &entity.aliases, &mention.raw_text).max(
                similarity_tier(&entity.name, &mention.raw_text, thresholds.similarity_threshold),
            );
            let multiplier = contextual_multiplier(mention, entity.kind);
            Scored {
                entity_id: entity.id,
                confidence: (base * multiplier).clamp(0.0, 1.0),
            }
        })
        .collect();
    scored.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// `resolve(mentions, known_entities) -> EntityLink per mention, ordered by
/// confidence desc` (§4.4). `scene_id` identifies the scene the mentions
/// were found in, so the resulting links can key the scene<->entity edge
/// repository (§6).
pub fn resolve(
    scene_id: Uuid,
    mentions: &[Mention],
    known_entities: &[Entity],
    thresholds: &Thresholds,
) -> Vec<EntityLink> {
    let mut links: Vec<EntityLink> = mentions
        .iter()
        .map(|mention| {
            let scored = score_mention(mention, known_entities, thresholds);
            let span = (mention.span_start, mention.span_end);

            match scored.first() {
                Some(best) if best.confidence >= thresholds.min_resolver_confidence => {
                    let alternatives = scored
                        .iter()
                        .skip(1)
                        .take(thresholds.max_alternatives)
                        .map(|s| s.entity_id)
                        .collect();
                    EntityLink {
                        scene_id,
                        mention_span: span,
                        resolved_entity_id: Some(best.entity_id),
                        confidence: best.confidence,
                        alternative_entity_ids: alternatives,
                        disambiguation_note: None,
                    }
                }
                Some(best) if best.confidence >= UNRESOLVED_FLOOR => EntityLink {
                    scene_id,
                    mention_span: span,
                    resolved_entity_id: None,
                    confidence: best.confidence,
                    alternative_entity_ids: scored
                        .iter()
                        .take(thresholds.max_alternatives)
                        .map(|s| s.entity_id)
                        .collect(),
                    disambiguation_note: Some(format!(
                        "no candidate for \"{}\" reached the resolution floor",
                        mention.raw_text
                    )),
                },
                _ => EntityLink {
                    scene_id,
                    mention_span: span,
                    resolved_entity_id: None,
                    confidence: 0.0,
                    alternative_entity_ids: Vec::new(),
                    disambiguation_note: Some(format!(
                        "no candidate found for \"{}\"",
                        mention.raw_text
                    )),
                },
            }
        })
        .collect();

    links.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    links
}
