//! Request and response bodies for each endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::upstream::Resource;
use crate::validation::{expect_object, expect_string, FieldContract, RequestSchema};

/// `POST /api/completion`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn completion_shape(body: &Map<String, Value>) -> Result<(), (&'static str, String)> {
    expect_string(body, "prompt")?;
    expect_string(body, "model")
}

impl RequestSchema for CompletionRequest {
    const CONTRACT: FieldContract =
        FieldContract::new(&["prompt"], &["model"]).with_predicate(completion_shape);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
}

/// Per-step model overrides for `/api/generate`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelSelection {
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub draft: Option<String>,
}

impl ModelSelection {
    pub fn for_step(&self, step_id: &str) -> Option<&str> {
        match step_id {
            "analysis" => self.analysis.as_deref(),
            "draft" => self.draft.as_deref(),
            _ => None,
        }
    }
}

/// `POST /api/generate`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateRequest {
    pub input: String,
    #[serde(default)]
    pub models: ModelSelection,
}

fn generate_shape(body: &Map<String, Value>) -> Result<(), (&'static str, String)> {
    expect_string(body, "input")?;
    expect_object(body, "models")
}

impl RequestSchema for GenerateRequest {
    const CONTRACT: FieldContract =
        FieldContract::new(&["input"], &["models"]).with_predicate(generate_shape);
}

/// `GET /api/scopestack/account`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    pub data: Resource,
    #[serde(rename = "accountSlug", default, skip_serializing_if = "Option::is_none")]
    pub account_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
