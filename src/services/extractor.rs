use garde::Validate;
use std::sync::Arc;
use std::time::Instant;

use crate::models::ticket::{Ticket, TicketDraft};
use crate::services::image::ImageEncoding;
use crate::services::model::{
    ContentBlock, ConverseRequest, ImageBlock, InferenceConfig, Message, ModelClient, ModelError,
    SystemBlock, Tool, ToolConfig, ToolInputSchema, ToolSpec,
};

/// Name of the single structured callback declared to the model.
pub const WASTE_REPORT_TOOL: &str = "waste_report";

const SYSTEM_PROMPT: &str = "\
You are an expert waste-detection AI.

Analyze the image and call waste_report EXACTLY ONCE.
Do not output any text outside the tool call.";

const USER_PROMPT: &str = "Inspect the image carefully and call waste_report once.";

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 4096;

/// Turns one image into one waste hotspot ticket via the model's structured
/// callback. One call, one ticket; failures are terminal for the call and
/// never retried here.
pub struct TicketExtractor {
    model: Arc<dyn ModelClient>,
}

impl TicketExtractor {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Run one extraction call. Blocks (at one await point) until the model
    /// responds or the transport gives up.
    pub async fn extract(
        &self,
        image_bytes: &[u8],
        encoding: ImageEncoding,
    ) -> Result<Ticket, ExtractError> {
        let request = self.build_request(image_bytes, encoding);

        let start = Instant::now();
        let outcome = self.model.converse(&request).await;
        let elapsed = start.elapsed().as_secs_f64();

        metrics::histogram!("extraction_duration_seconds").record(elapsed);

        let response = match outcome {
            Ok(r) => r,
            Err(e) => {
                metrics::counter!("extractions_failed").increment(1);
                return Err(ExtractError::Transport(e));
            }
        };

        let draft = match Self::take_callback(&response.output.message.content) {
            Ok(d) => d,
            Err(e) => {
                metrics::counter!("extractions_failed").increment(1);
                return Err(e);
            }
        };

        let ticket = Ticket::issue(draft, elapsed);

        metrics::counter!("extractions_total").increment(1);
        tracing::info!(
            ticket_id = %ticket.ticket_id,
            area = %ticket.area_name,
            priority = %ticket.priority,
            wall_time_seconds = ticket.wall_time_seconds,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "ticket extracted"
        );

        Ok(ticket)
    }

    fn build_request(&self, image_bytes: &[u8], encoding: ImageEncoding) -> ConverseRequest {
        ConverseRequest {
            system: vec![SystemBlock { text: SYSTEM_PROMPT.to_string() }],
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Text(USER_PROMPT.to_string()),
                    ContentBlock::Image(ImageBlock::from_bytes(
                        image_bytes,
                        &encoding.to_string(),
                    )),
                ],
            }],
            tool_config: Some(waste_report_tool()),
            inference_config: InferenceConfig {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            },
        }
    }

    /// Pick the winning `waste_report` invocation out of the response and
    /// validate its arguments. The slot is local to this call, so a stale
    /// result can never leak across extraction calls; if the model invoked
    /// the callback more than once, the last invocation wins outright.
    fn take_callback(content: &[ContentBlock]) -> Result<TicketDraft, ExtractError> {
        let mut slot: Option<&serde_json::Value> = None;

        for block in content {
            if let ContentBlock::ToolUse(tool_use) = block {
                if tool_use.name == WASTE_REPORT_TOOL {
                    slot = Some(&tool_use.input);
                }
            }
        }

        let input = slot.ok_or(ExtractError::NoCallback)?;

        let draft: TicketDraft = serde_json::from_value(input.clone())
            .map_err(|e| ExtractError::SchemaViolation(e.to_string()))?;
        draft
            .validate()
            .map_err(|e| ExtractError::SchemaViolation(e.to_string()))?;

        Ok(draft)
    }
}

/// Declaration of the `waste_report` callback and its argument contract.
fn waste_report_tool() -> ToolConfig {
    ToolConfig {
        tools: vec![Tool {
            tool_spec: ToolSpec {
                name: WASTE_REPORT_TOOL.to_string(),
                description: "Generate a structured waste hotspot ticket.".to_string(),
                input_schema: ToolInputSchema {
                    json: serde_json::json!({
                        "type": "object",
                        "required": [
                            "area_name",
                            "lat",
                            "lng",
                            "waste_type",
                            "volume_level",
                            "estimated_weight_kg",
                            "priority",
                            "near_sensitive_zone",
                            "action",
                            "vehicle_type",
                            "requires_after_photo",
                        ],
                        "properties": {
                            "area_name": {
                                "type": "string",
                                "description": "Human-readable locality or neighbourhood name inferred from coordinates or image context.",
                            },
                            "lat": {"type": "number"},
                            "lng": {"type": "number"},
                            "waste_type": {
                                "type": "string",
                                "enum": ["ORGANIC", "PLASTIC", "E_WASTE", "C_D_WASTE", "MIXED", "OTHER"],
                            },
                            "volume_level": {
                                "type": "string",
                                "enum": ["LOW", "MEDIUM", "HIGH"],
                            },
                            "estimated_weight_kg": {"type": "number"},
                            "priority": {
                                "type": "string",
                                "enum": ["P0", "P1", "P2"],
                            },
                            "near_sensitive_zone": {"type": "boolean"},
                            "action": {
                                "type": "string",
                                "enum": ["DISPATCH_NOW", "ADD_TO_ROUTE", "MONITOR"],
                            },
                            "vehicle_type": {
                                "type": "string",
                                "enum": ["E_RICKSHAW", "PICKUP", "COMPACTOR", "OTHER"],
                            },
                            "requires_after_photo": {"type": "boolean"},
                        },
                    }),
                },
            },
        }],
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("model endpoint request failed: {0}")]
    Transport(#[from] ModelError),

    #[error("model returned without calling waste_report")]
    NoCallback,

    #[error("waste_report arguments failed schema validation: {0}")]
    SchemaViolation(String),
}
