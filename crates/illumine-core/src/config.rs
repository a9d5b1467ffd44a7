//! Environment-sourced configuration (spec §6 "Configuration").

use serde::Deserialize;

use crate::error::Error;

/// Thresholds and minima consumed by the pipeline's components. Every field
/// has a spec-derived default; all are overridable via environment
/// variables prefixed `ILLUMINE_` (e.g. `ILLUMINE_MIN_VISUAL_SCORE`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// §4.2: scenes below this visual score are dropped.
    pub min_visual_score: f64,
    /// §4.2: scenes below this impact score are dropped.
    pub min_impact_score: f64,
    /// §4.4: minimum confidence for a candidate to become the resolved entity.
    pub min_resolver_confidence: f64,
    /// §4.4: default Levenshtein similarity threshold for the weaker match tier.
    pub similarity_threshold: f64,
    /// §4.4: maximum lower-scoring alternative candidates recorded per mention.
    pub max_alternatives: usize,
    /// §4.9: maximum number of modifications accepted in one modification request.
    pub max_modifications_per_request: usize,
    /// §4.9: maximum prompt text length, in characters.
    pub max_prompt_length: usize,
    /// §4.10: maximum retry attempts for image generation.
    pub image_max_retries: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_visual_score: 0.3,
            min_impact_score: 0.3,
            min_resolver_confidence: 0.5,
            similarity_threshold: 0.6,
            max_alternatives: 3,
            max_modifications_per_request: 10,
            max_prompt_length: 4000,
            image_max_retries: 3,
        }
    }
}

/// Per-call deadlines (§5 "Suspension points").
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Deadlines {
    /// Text model calls, in seconds.
    pub text_model_seconds: u64,
    /// Image generation end-to-end, including polling, in seconds.
    pub image_generation_seconds: u64,
    /// Persistence layer calls, in seconds.
    pub persistence_seconds: u64,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            text_model_seconds: 60,
            image_generation_seconds: 300,
            persistence_seconds: 30,
        }
    }
}

/// Top-level settings loaded from the environment at process startup.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the text model service.
    pub text_model_endpoint: String,
    /// API key for the text model service.
    pub text_model_api_key: String,
    /// Base URL of the image model service.
    pub image_model_endpoint: String,
    /// API key for the image model service.
    pub image_model_api_key: String,
    /// Connection string for the persistence layer.
    pub persistence_connection_string: String,
    /// Bucket/container name for the object store.
    pub object_store_bucket: String,
    /// Number of chapter-pipeline workers run concurrently across works (§5).
    pub worker_count: usize,
    /// Size cap, in bytes, for ingested files (§6 Ingest API).
    pub max_ingest_bytes: u64,
    /// Component thresholds and minima.
    pub thresholds: Thresholds,
    /// Per-call deadlines.
    pub deadlines: Deadlines,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_model_endpoint: String::new(),
            text_model_api_key: String::new(),
            image_model_endpoint: String::new(),
            image_model_api_key: String::new(),
            persistence_connection_string: String::new(),
            object_store_bucket: String::new(),
            worker_count: 4,
            max_ingest_bytes: 50 * 1024 * 1024,
            thresholds: Thresholds::default(),
            deadlines: Deadlines::default(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables prefixed `ILLUMINE_`,
    /// falling back to spec-derived defaults for anything unset, mirroring
    /// the teacher's `config_loader::env_vars` convention.
    pub fn load() -> Result<Self, Error> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default()).map_err(|e| {
                Error::Configuration(format!("failed to seed defaults: {e}"))
            })?)
            .add_source(
                config::Environment::with_prefix("ILLUMINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::Configuration(e.to_string()))
    }
}
