//! Image Generator (spec §4.10): submits a prompt to the image model,
//! retries transient failures, and manages per-scene image versioning.

use std::time::Duration;

use chrono::Utc;
use illumine_core::external::image_model::{ImageJobStatus, ImageModel, ImageRequest};
use illumine_core::model::{GeneratedImage, GeneratedImageStatus, Prompt};
use illumine_core::retry::{with_retry, RetryPolicy};
use illumine_core::Error as CoreError;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::submit_and_poll;

const NON_RETRYABLE_MARKERS: &[&str] = &["content policy", "invalid parameter", "invalid request"];

fn is_retryable_failure(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    !NON_RETRYABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// `generate(prompt, priority, scene_id?, replace_existing) ->
/// GeneratedImage` (§4.10). Never returns `Err` for a generation failure —
/// failures are reported as `status = Error` on the returned record; `Err`
/// is reserved for errors the retry policy itself could not classify.
pub async fn generate(
    prompt: &Prompt,
    priority: i64,
    scene_id: Option<Uuid>,
    replace_existing: bool,
    existing_images: &mut [GeneratedImage],
    image_model: &dyn ImageModel,
    max_retries: u32,
) -> Result<GeneratedImage> {
    tracing::debug!(priority, ?scene_id, "submitting image generation request");

    let request = ImageRequest {
        prompt: prompt.text.clone(),
        negative: prompt.negative_text.clone(),
        technical: prompt.technical,
        seed: None,
    };

    let policy = RetryPolicy::new(max_retries, Duration::from_secs(1), 2.0, |e| e.is_retryable());

    let outcome = with_retry(&policy, || async {
        let result = submit_and_poll(image_model, &request).await?;
        match result.status {
            ImageJobStatus::Succeeded => Ok(result),
            ImageJobStatus::Failed => {
                let detail = result.error.clone().unwrap_or_default();
                if is_retryable_failure(&detail) {
                    Err(CoreError::UpstreamTransient(detail))
                } else {
                    Err(CoreError::UpstreamPermanent(detail))
                }
            }
            ImageJobStatus::Pending => {
                Err(CoreError::UpstreamPermanent("poll returned non-terminal status".into()))
            }
        }
    })
    .await;

    let (status, image_pointer, cost, error_detail) = match outcome {
        Ok(result) => (GeneratedImageStatus::Success, result.output_pointer, result.cost, None),
        Err(e) => (GeneratedImageStatus::Error, None, None, Some(e.to_string())),
    };

    let mut version = 1;
    let mut replaced_image_id = None;
    if replace_existing {
        if let Some(scene_id) = scene_id {
            if let Some(previous) = existing_images
                .iter_mut()
                .find(|img| img.scene_id == scene_id && img.selected)
            {
                previous.selected = false;
                version = previous.version + 1;
                replaced_image_id = Some(previous.id);
            } else {
                tracing::debug!(?scene_id, "replace_existing requested but no selected image found");
            }
        }
    }

    Ok(GeneratedImage {
        id: Uuid::new_v4(),
        prompt_id: prompt.id,
        scene_id: scene_id.unwrap_or(prompt.scene_id),
        image_pointer,
        status,
        model_version: image_model.model_version(),
        seed: None,
        generation_time: Utc::now(),
        cost,
        error_detail,
        version,
        replaced_image_id,
        selected: status == GeneratedImageStatus::Success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use illumine_core::external::image_model::ImagePollResult;
    use illumine_core::model::{SamplerKind, TechnicalParameters};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct StubModel {
        attempts: AtomicU32,
        fail_times: u32,
        terminal_failure: bool,
        poll_log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageModel for StubModel {
        async fn generate(&self, _request: &ImageRequest) -> std::result::Result<String, CoreError> {
            Ok("job-1".to_string())
        }

        async fn poll(&self, job_id: &str) -> std::result::Result<ImagePollResult, CoreError> {
            self.poll_log.lock().unwrap().push(job_id.to_string());
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                if self.terminal_failure {
                    return Ok(ImagePollResult {
                        status: ImageJobStatus::Failed,
                        output_pointer: None,
                        error: Some("invalid parameter: width".to_string()),
                        cost: None,
                    });
                }
                return Ok(ImagePollResult {
                    status: ImageJobStatus::Failed,
                    output_pointer: None,
                    error: Some("upstream hiccup".to_string()),
                    cost: None,
                });
            }
            Ok(ImagePollResult {
                status: ImageJobStatus::Succeeded,
                output_pointer: Some("mem://images/abc".to_string()),
                error: None,
                cost: Some(0.02),
            })
        }

        fn model_version(&self) -> String {
            "stub-v1".to_string()
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            id: Uuid::new_v4(),
            scene_id: Uuid::new_v4(),
            text: "a scene".to_string(),
            negative_text: "low quality".to_string(),
            style_preset: "fantasy".to_string(),
            references: vec![],
            technical: TechnicalParameters {
                width: 1024,
                height: 1024,
                steps: 30,
                cfg_scale: 7.0,
                sampler: SamplerKind::EulerAncestral,
            },
            parent_prompt_id: None,
            modification_history: vec![],
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let model = StubModel {
            attempts: AtomicU32::new(0),
            fail_times: 2,
            terminal_failure: false,
            poll_log: Mutex::new(vec![]),
        };
        let prompt = prompt();
        let mut existing = Vec::new();
        let image = generate(&prompt, 0, None, false, &mut existing, &model, 5)
            .await
            .unwrap();
        assert_eq!(image.status, GeneratedImageStatus::Success);
        assert!(image.selected);
    }

    #[tokio::test]
    async fn non_retryable_failure_is_reported_without_retry() {
        let model = StubModel {
            attempts: AtomicU32::new(0),
            fail_times: 10,
            terminal_failure: true,
            poll_log: Mutex::new(vec![]),
        };
        let prompt = prompt();
        let mut existing = Vec::new();
        let image = generate(&prompt, 0, None, false, &mut existing, &model, 5)
            .await
            .unwrap();
        assert_eq!(image.status, GeneratedImageStatus::Error);
        assert_eq!(model.poll_log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replacement_marks_previous_image_deselected() {
        let model = StubModel {
            attempts: AtomicU32::new(0),
            fail_times: 0,
            terminal_failure: false,
            poll_log: Mutex::new(vec![]),
        };
        let scene_id = Uuid::new_v4();
        let previous = GeneratedImage {
            id: Uuid::new_v4(),
            prompt_id: Uuid::new_v4(),
            scene_id,
            image_pointer: Some("mem://images/old".to_string()),
            status: GeneratedImageStatus::Success,
            model_version: "stub-v1".to_string(),
            seed: None,
            generation_time: Utc::now(),
            cost: None,
            error_detail: None,
            version: 1,
            replaced_image_id: None,
            selected: true,
        };
        let mut existing = vec![previous.clone()];
        let prompt = prompt();
        let image = generate(&prompt, 0, Some(scene_id), true, &mut existing, &model, 3)
            .await
            .unwrap();
        assert_eq!(image.version, 2);
        assert_eq!(image.replaced_image_id, Some(previous.id));
        assert!(!existing[0].selected);
    }
}
