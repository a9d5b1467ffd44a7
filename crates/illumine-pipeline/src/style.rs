//! Style-preset prompt bases, negative extensions and technical parameter
//! overrides, shared by the Reference Image Manager (§4.8) and the Prompt
//! Composer (§4.9).

use illumine_core::model::TechnicalParameters;

pub(crate) fn base_prompt(style_preset: &str) -> String {
    format!("{style_preset} art style")
}

const KNOWN_STYLES: &[&str] = &["fantasy", "noir", "scifi", "sci-fi", "watercolor", "anime"];

pub(crate) fn known_style_keywords() -> impl Iterator<Item = String> {
    KNOWN_STYLES.iter().map(|s| base_prompt(s))
}

pub(crate) fn negative_extension(style_preset: &str) -> Option<&'static str> {
    match style_preset.to_lowercase().as_str() {
        "noir" => Some("color, vibrant, saturated"),
        "fantasy" => Some("modern, technology, vehicles"),
        "scifi" | "sci-fi" => Some("medieval, rustic, primitive"),
        _ => None,
    }
}

pub(crate) fn technical_overrides(style_preset: &str) -> TechnicalParameters {
    let mut technical = TechnicalParameters::default();
    match style_preset.to_lowercase().as_str() {
        "noir" => technical.steps = 40,
        "anime" => technical.cfg_scale = 9.0,
        "watercolor" => technical.steps = 25,
        _ => {}
    }
    technical
}
