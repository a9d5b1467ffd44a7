//! Shared submit-then-poll transport for the image model, used by both the
//! Reference Image Manager (§4.8) and the Image Generator (§4.10).

use std::time::Duration;

use illumine_core::external::image_model::{ImageJobStatus, ImageModel, ImagePollResult, ImageRequest};
use illumine_core::Error;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const POLL_CEILING: Duration = Duration::from_secs(5 * 60);

/// Submit `request` and poll for a terminal status at a fixed interval up to
/// a ceiling, per §4.10's transport description.
pub(crate) async fn submit_and_poll(
    model: &dyn ImageModel,
    request: &ImageRequest,
) -> Result<ImagePollResult, Error> {
    let job_id = model.generate(request).await?;
    let deadline = tokio::time::Instant::now() + POLL_CEILING;

    loop {
        let result = model.poll(&job_id).await?;
        if result.status != ImageJobStatus::Pending {
            return Ok(result);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(ImagePollResult {
                status: ImageJobStatus::Failed,
                output_pointer: None,
                error: Some("generation poll exceeded ceiling".to_string()),
                cost: None,
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
