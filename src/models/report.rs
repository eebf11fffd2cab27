use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Garbage categories used by the composition report prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GarbageCategory {
    PlasticBottle,
    PlasticBag,
    FoodWaste,
    PaperCardboard,
    GlassBottle,
    MetalCan,
    ElectronicWaste,
    MedicalWaste,
    MixedGarbage,
    ConstructionDebris,
    OrganicWaste,
    HazardousWaste,
    Other,
}

/// One garbage type spotted in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GarbageObservation {
    #[serde(rename = "type")]
    #[garde(skip)]
    pub category: GarbageCategory,

    #[garde(skip)]
    pub quantity: u32,

    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    #[garde(length(max = 500))]
    pub location_in_image: String,
}

/// The JSON body the model is instructed to emit for the composition prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SceneAssessment {
    #[garde(skip)]
    pub total_garbage_count: u32,

    #[garde(length(min = 1, max = 100))]
    pub severity_level: String,

    #[garde(dive)]
    pub garbage_types: Vec<GarbageObservation>,

    #[garde(range(min = 0.0, max = 10.0))]
    pub cleanliness_score: f64,

    #[garde(length(max = 2000))]
    pub summary: String,
}

/// Token counts reported by the model endpoint for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

/// Full composition report: the model's assessment plus fields attached by
/// the client after the call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionReport {
    #[serde(flatten)]
    pub assessment: SceneAssessment,
    pub image_source: String,
    pub model_id: String,
    pub tokens_used: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_form_is_snake_case() {
        assert_eq!(
            serde_json::to_value(GarbageCategory::PlasticBottle).unwrap(),
            serde_json::json!("plastic_bottle")
        );
        assert_eq!(
            serde_json::to_value(GarbageCategory::ConstructionDebris).unwrap(),
            serde_json::json!("construction_debris")
        );
    }

    #[test]
    fn assessment_parses_model_shaped_json() {
        let raw = serde_json::json!({
            "total_garbage_count": 7,
            "severity_level": "high",
            "garbage_types": [
                {
                    "type": "plastic_bottle",
                    "quantity": 4,
                    "confidence": 0.92,
                    "location_in_image": "lower left corner"
                },
                {
                    "type": "mixed_garbage",
                    "quantity": 3,
                    "confidence": 0.6,
                    "location_in_image": "center"
                }
            ],
            "cleanliness_score": 3.5,
            "summary": "Scattered litter near the kerb."
        });

        let assessment: SceneAssessment = serde_json::from_value(raw).unwrap();
        assert_eq!(assessment.garbage_types.len(), 2);
        assert_eq!(assessment.garbage_types[0].category, GarbageCategory::PlasticBottle);
        garde::Validate::validate(&assessment).unwrap();
    }

    #[test]
    fn assessment_rejects_confidence_above_one() {
        let assessment = SceneAssessment {
            total_garbage_count: 1,
            severity_level: "low".to_string(),
            garbage_types: vec![GarbageObservation {
                category: GarbageCategory::Other,
                quantity: 1,
                confidence: 1.4,
                location_in_image: "top".to_string(),
            }],
            cleanliness_score: 8.0,
            summary: String::new(),
        };
        assert!(garde::Validate::validate(&assessment).is_err());
    }

    #[test]
    fn report_flattens_assessment_fields() {
        let report = CompositionReport {
            assessment: SceneAssessment {
                total_garbage_count: 0,
                severity_level: "none".to_string(),
                garbage_types: Vec::new(),
                cleanliness_score: 10.0,
                summary: "Clean.".to_string(),
            },
            image_source: "park.jpg".to_string(),
            model_id: "amazon.nova-pro-v1:0".to_string(),
            tokens_used: TokenUsage { input: 1200, output: 80 },
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["total_garbage_count"], 0);
        assert_eq!(value["image_source"], "park.jpg");
        assert_eq!(value["tokens_used"]["input"], 1200);
    }
}
