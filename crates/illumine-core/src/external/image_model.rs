//! The image model contract (§6): submit-then-poll, matching the Image
//! Generator's (§4.10) retry/poll transport.

use async_trait::async_trait;

use crate::error::Error;
use crate::model::TechnicalParameters;

/// Inputs to `generate` (§6).
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative: String,
    pub technical: TechnicalParameters,
    pub seed: Option<u64>,
}

/// Terminal/in-flight status reported by `poll` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageJobStatus {
    Pending,
    Succeeded,
    Failed,
}

/// `poll(job_id)` response shape (§6).
#[derive(Debug, Clone)]
pub struct ImagePollResult {
    pub status: ImageJobStatus,
    pub output_pointer: Option<String>,
    pub error: Option<String>,
    pub cost: Option<f64>,
}

/// `generate(prompt, negative, width, height, steps, cfg_scale, [seed]) -> { job_id }`
/// and `poll(job_id) -> { status, output_pointer?, error? }` (§6).
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Submit a generation request, returning an opaque job id.
    async fn generate(&self, request: &ImageRequest) -> Result<String, Error>;

    /// Poll a previously submitted job for its current status.
    async fn poll(&self, job_id: &str) -> Result<ImagePollResult, Error>;

    /// The model version string to record on the resulting `GeneratedImage`.
    fn model_version(&self) -> String;
}
