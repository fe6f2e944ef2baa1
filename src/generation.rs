//! Multi-step scope generation streamed as progress events.
//!
//! # Steps
//! ```text
//! analysis → extract requirements from the input
//! draft    → write the scope using input + analysis
//! ```
//!
//! Each step emits `step{running}`, then `step{completed}` or a terminal
//! `error`. A successful run ends with `complete`.

use futures_util::Stream;
use serde_json::json;
use uuid::Uuid;

use crate::http::sse::{StepStatus, StreamEvent};
use crate::http::types::GenerateRequest;
use crate::upstream::LlmClient;

/// A single LLM-backed step.
pub struct Step {
    pub id: &'static str,
    pub operation: &'static str,
    pub label: &'static str,
    /// Builds the prompt from the user input and previous step outputs.
    pub prompt: fn(&str, &[(&'static str, String)]) -> String,
}

fn analysis_prompt(input: &str, _previous: &[(&'static str, String)]) -> String {
    format!(
        "Analyze the following project request. List the key requirements, \
         deliverables, assumptions and open questions as concise bullet points.\n\n{input}"
    )
}

fn draft_prompt(input: &str, previous: &[(&'static str, String)]) -> String {
    let analysis = previous
        .iter()
        .find(|(id, _)| *id == "analysis")
        .map(|(_, text)| text.as_str())
        .unwrap_or_default();
    format!(
        "Using this analysis:\n\n{analysis}\n\nWrite a professional services scope of work \
         for the following request:\n\n{input}"
    )
}

pub const STEPS: &[Step] = &[
    Step {
        id: "analysis",
        operation: "llm.generate.analysis",
        label: "Analyzing request",
        prompt: analysis_prompt,
    },
    Step {
        id: "draft",
        operation: "llm.generate.draft",
        label: "Drafting scope",
        prompt: draft_prompt,
    },
];

fn progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total) as u8
}

/// Run every step in order, yielding events as they happen.
///
/// The stream always ends with exactly one terminal event.
pub fn run_generation(
    llm: LlmClient,
    request: GenerateRequest,
    request_id: String,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let run_id = Uuid::new_v4();
        let total = STEPS.len();
        let mut outputs: Vec<(&'static str, String)> = Vec::with_capacity(total);

        tracing::info!(request_id = %request_id, run_id = %run_id, steps = total, "Generation started");

        for (index, step) in STEPS.iter().enumerate() {
            yield StreamEvent::step(step.id, StepStatus::Running, progress(index, total), Some(step.label.to_string()));

            let prompt = (step.prompt)(&request.input, &outputs);
            let model = request.models.for_step(step.id);

            match llm.complete(step.operation, &prompt, model, Some(request_id.as_str())).await {
                Ok(completion) => {
                    tracing::debug!(request_id = %request_id, step = step.id, model = %completion.model, "Step completed");
                    outputs.push((step.id, completion.text));
                    yield StreamEvent::step(step.id, StepStatus::Completed, progress(index + 1, total), None);
                }
                Err(err) => {
                    tracing::warn!(request_id = %request_id, step = step.id, kind = %err.kind(), error = %err, "Step failed");
                    yield StreamEvent::failure(Some(step.id), &err);
                    return;
                }
            }
        }

        let result: serde_json::Map<String, serde_json::Value> = outputs
            .into_iter()
            .map(|(id, text)| (id.to_string(), json!(text)))
            .collect();

        tracing::info!(request_id = %request_id, run_id = %run_id, "Generation complete");
        yield StreamEvent::Complete { run_id, result: serde_json::Value::Object(result) };
    }
}
