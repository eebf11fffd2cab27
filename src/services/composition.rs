use garde::Validate;
use std::sync::Arc;
use std::time::Instant;

use crate::models::report::{CompositionReport, SceneAssessment, TokenUsage};
use crate::services::image::ImageEncoding;
use crate::services::model::{
    ContentBlock, ConverseRequest, ImageBlock, InferenceConfig, Message, ModelClient, ModelError,
    SystemBlock,
};

const SYSTEM_PROMPT: &str = "\
You are an advanced garbage detection and classification AI designed for public spaces.
Given an image, thoroughly analyze it and provide a detailed report:

1. Identify and list ALL visible garbage/waste items in the image.
2. Count the QUANTITY of each type of garbage.
3. Classify each garbage type from the following list:
   - plastic_bottle
   - plastic_bag
   - food_waste
   - paper_cardboard
   - glass_bottle
   - metal_can
   - electronic_waste
   - medical_waste
   - mixed_garbage
   - construction_debris
   - organic_waste
   - hazardous_waste
   - other

Ensure the output is formatted in valid JSON and follows this exact structure (no extra text, no markdown):
{
  \"total_garbage_count\": <number>,
  \"severity_level\": \"\",
  \"garbage_types\": [
    {
      \"type\": \"\",
      \"quantity\": <number>,
      \"confidence\": <0.0 to 1.0>,
      \"location_in_image\": \"\"
    }
  ],
  \"cleanliness_score\": <0 to 10>,
  \"summary\": \"\"
}

Provide the following additional details for optimal output:
- Each `garbage_type` should include a confidence level indicating the model's certainty in the classification.
- Specify the `location_in_image` where each garbage type is predominantly found.
- The `severity_level` should reflect the overall amount and type of waste detected.
- The `cleanliness_score` should be a numerical rating of the image's cleanliness.
- The `summary` should concisely describe the overall condition of the scene.

Make sure the output is precise, clear, and concise, adhering strictly to the JSON format provided.";

const USER_PROMPT: &str =
    "Analyze this image for garbage/waste detection. Return structured JSON only.";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1024;

/// Composition report pipeline: same model endpoint, no tool declaration.
/// The model is asked for a strict JSON body in its text output, which the
/// client parses and validates.
pub struct CompositionAnalyzer {
    model: Arc<dyn ModelClient>,
}

impl CompositionAnalyzer {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        image_bytes: &[u8],
        encoding: ImageEncoding,
        image_source: &str,
    ) -> Result<CompositionReport, CompositionError> {
        let request = ConverseRequest {
            system: vec![SystemBlock { text: SYSTEM_PROMPT.to_string() }],
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image(ImageBlock::from_bytes(
                        image_bytes,
                        &encoding.to_string(),
                    )),
                    ContentBlock::Text(USER_PROMPT.to_string()),
                ],
            }],
            tool_config: None,
            inference_config: InferenceConfig {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            },
        };

        let start = Instant::now();
        let response = self.model.converse(&request).await?;
        let elapsed = start.elapsed().as_secs_f64();

        let text: String = response
            .output
            .message
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(CompositionError::NoContent);
        }

        let body = strip_code_fence(&text);
        let assessment: SceneAssessment = serde_json::from_str(body)
            .map_err(|e| CompositionError::Malformed(e.to_string()))?;
        assessment
            .validate()
            .map_err(|e| CompositionError::Malformed(e.to_string()))?;

        tracing::info!(
            image_source,
            total = assessment.total_garbage_count,
            cleanliness = assessment.cleanliness_score,
            wall_time_seconds = elapsed,
            "composition report generated"
        );

        Ok(CompositionReport {
            assessment,
            image_source: image_source.to_string(),
            model_id: self.model.model_id().to_string(),
            tokens_used: TokenUsage {
                input: response.usage.input_tokens,
                output: response.usage.output_tokens,
            },
        })
    }
}

/// Models sometimes wrap the JSON in a markdown fence despite instructions.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let inner = trimmed.trim_start_matches("```");
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("model endpoint request failed: {0}")]
    Transport(#[from] ModelError),

    #[error("model response contained no text content")]
    NoContent,

    #[error("model output is not a valid composition report: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::model::{ConverseOutput, ConverseResponse, Usage};
    use async_trait::async_trait;

    struct StubModel {
        text: String,
    }

    #[async_trait]
    impl ModelClient for StubModel {
        fn model_id(&self) -> &str {
            "stub-vision-model"
        }

        async fn converse(
            &self,
            _request: &ConverseRequest,
        ) -> Result<ConverseResponse, ModelError> {
            Ok(ConverseResponse {
                output: ConverseOutput {
                    message: Message {
                        role: "assistant".to_string(),
                        content: vec![ContentBlock::Text(self.text.clone())],
                    },
                },
                stop_reason: Some("end_turn".to_string()),
                usage: Usage { input_tokens: 900, output_tokens: 150 },
            })
        }
    }

    fn report_json() -> String {
        serde_json::json!({
            "total_garbage_count": 3,
            "severity_level": "medium",
            "garbage_types": [{
                "type": "plastic_bag",
                "quantity": 3,
                "confidence": 0.8,
                "location_in_image": "near the drain"
            }],
            "cleanliness_score": 5.0,
            "summary": "Some plastic bags near the drain."
        })
        .to_string()
    }

    #[tokio::test]
    async fn plain_json_is_parsed_and_tagged() {
        let analyzer = CompositionAnalyzer::new(Arc::new(StubModel { text: report_json() }));
        let report = analyzer
            .analyze(b"img", ImageEncoding::Jpeg, "street.jpg")
            .await
            .unwrap();

        assert_eq!(report.assessment.total_garbage_count, 3);
        assert_eq!(report.image_source, "street.jpg");
        assert_eq!(report.model_id, "stub-vision-model");
        assert_eq!(report.tokens_used.input, 900);
        assert_eq!(report.tokens_used.output, 150);
    }

    #[tokio::test]
    async fn fenced_json_is_unwrapped() {
        let fenced = format!("```json\n{}\n```", report_json());
        let analyzer = CompositionAnalyzer::new(Arc::new(StubModel { text: fenced }));
        let report = analyzer
            .analyze(b"img", ImageEncoding::Png, "street.jpg")
            .await
            .unwrap();
        assert_eq!(report.assessment.garbage_types.len(), 1);
    }

    #[tokio::test]
    async fn prose_instead_of_json_is_malformed() {
        let analyzer = CompositionAnalyzer::new(Arc::new(StubModel {
            text: "The street looks quite dirty.".to_string(),
        }));
        let err = analyzer
            .analyze(b"img", ImageEncoding::Png, "street.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, CompositionError::Malformed(_)));
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n{\"a\":1}\n``` "), "{\"a\":1}");
    }
}
