//! Entity Extractor (spec §4.5): asks the text model for characters and
//! locations not already known, then keeps only results that plausibly
//! explain one of the scene's unresolved mentions.

use illumine_core::external::text_model::TextModel;
use illumine_core::model::{Entity, EntityKind, Mention};
use uuid::Uuid;

use crate::error::Result;

/// `extract_new(scene_text, unresolved_mentions, known_mentions) -> Entity
/// set` (§4.5).
pub async fn extract_new(
    work_id: Uuid,
    at_chapter: u32,
    scene_text: &str,
    unresolved_mentions: &[Mention],
    known_mentions: &[String],
    model: &dyn TextModel,
) -> Result<Vec<Entity>> {
    if unresolved_mentions.is_empty() {
        return Ok(Vec::new());
    }

    let extracted = model.extract_entities(scene_text, known_mentions).await?;

    let mut entities = Vec::new();

    for character in extracted.characters {
        if overlaps_any(&character.name, &character.aliases, unresolved_mentions) {
            entities.push(Entity {
                id: Uuid::new_v4(),
                work_id,
                name: character.name,
                kind: EntityKind::Character,
                description: character.description,
                aliases: character.aliases,
                first_appearance_chapter: at_chapter,
                active: true,
            });
        }
    }

    for location in extracted.locations {
        if overlaps_any(&location.name, &[], unresolved_mentions) {
            entities.push(Entity {
                id: Uuid::new_v4(),
                work_id,
                name: location.name,
                kind: EntityKind::Location,
                description: location.description,
                aliases: Vec::new(),
                first_appearance_chapter: at_chapter,
                active: true,
            });
        }
    }

    Ok(entities)
}

fn overlaps_any(name: &str, aliases: &[String], unresolved_mentions: &[Mention]) -> bool {
    let name_lower = name.to_lowercase();
    unresolved_mentions.iter().any(|mention| {
        let mention_lower = mention.raw_text.to_lowercase();
        name_lower.contains(&mention_lower)
            || mention_lower.contains(&name_lower)
            || aliases.iter().any(|a| a.to_lowercase() == mention_lower)
    })
}
