//! Entity Merger (spec §4.6): reconciles freshly extracted entities
//! against the known set, merging, flagging conflicts, or adding as new.

use std::collections::HashSet;

use illumine_core::model::Entity;
use uuid::Uuid;

const MERGE_THRESHOLD: f64 = 0.95;
const CONFLICT_THRESHOLD: f64 = 0.8;
const DESCRIPTION_WEIGHT: f64 = 0.7;

fn similarity(new_entity: &Entity, existing: &Entity) -> f64 {
    let name_sim =
        strsim::normalized_levenshtein(&new_entity.name.to_lowercase(), &existing.name.to_lowercase());
    let alias_sim = existing
        .aliases
        .iter()
        .map(|a| strsim::normalized_levenshtein(&new_entity.name.to_lowercase(), &a.to_lowercase()))
        .fold(0.0f64, f64::max);
    let description_sim = DESCRIPTION_WEIGHT
        * strsim::normalized_levenshtein(
            &new_entity.description.to_lowercase(),
            &existing.description.to_lowercase(),
        );
    name_sim.max(alias_sim).max(description_sim)
}

fn distinct_lemma_count(new_description: &str, old_description: &str) -> usize {
    let old_words: HashSet<String> = old_description
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .collect();
    new_description
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty() && !old_words.contains(w))
        .collect::<HashSet<_>>()
        .len()
}

fn merge_into(existing: &mut Entity, new_entity: Entity) {
    existing.first_appearance_chapter = existing
        .first_appearance_chapter
        .min(new_entity.first_appearance_chapter);

    let added_lemmas = distinct_lemma_count(&new_entity.description, &existing.description);
    if added_lemmas > 3 {
        existing.description = format!("{} {}", existing.description, new_entity.description);
    } else if new_entity.description.len() > existing.description.len() {
        existing.description = new_entity.description;
    }

    let mut seen: HashSet<String> = existing.aliases.iter().map(|a| a.to_lowercase()).collect();
    seen.insert(existing.name.to_lowercase());
    for alias in new_entity.aliases {
        if seen.insert(alias.to_lowercase()) {
            existing.aliases.push(alias);
        }
    }

    if new_entity.name.len() > existing.name.len()
        && new_entity
            .name
            .to_lowercase()
            .contains(&existing.name.to_lowercase())
    {
        existing.name = new_entity.name;
    }
}

fn conflict(mut new_entity: Entity) -> Entity {
    new_entity.name = format!("{} (variant)", new_entity.name);
    new_entity.id = Uuid::new_v4();
    new_entity
}

fn apply_one(combined: &mut Vec<Entity>, new_entity: Entity) {
    let best = combined
        .iter()
        .enumerate()
        .map(|(i, e)| (i, similarity(&new_entity, e)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let Some((idx, s)) = best else {
        combined.push(new_entity);
        return;
    };

    let same_kind = combined[idx].kind == new_entity.kind;
    let exact_name = combined[idx].name.to_lowercase() == new_entity.name.to_lowercase();

    if s > MERGE_THRESHOLD && same_kind {
        merge_into(&mut combined[idx], new_entity);
    } else if s > MERGE_THRESHOLD {
        combined.push(conflict(new_entity));
    } else if s > CONFLICT_THRESHOLD && exact_name && same_kind {
        merge_into(&mut combined[idx], new_entity);
    } else if s > CONFLICT_THRESHOLD && exact_name {
        combined.push(conflict(new_entity));
    } else {
        combined.push(new_entity);
    }
}

/// `merge(new_entities, existing_entities) -> combined entities` (§4.6).
/// Deterministic for a given ordering of `new_entities`.
pub fn merge(new_entities: Vec<Entity>, existing_entities: Vec<Entity>) -> Vec<Entity> {
    let mut combined = existing_entities;
    for new_entity in new_entities {
        apply_one(&mut combined, new_entity);
    }
    combined
}
