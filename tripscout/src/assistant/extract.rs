//! Search-parameter extraction

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Assistant, AssistantError};
use crate::domain::SearchParams;
use crate::llm::CompletionRequest;
use crate::rpc::ToolInfo;

const EXTRACT_MAX_TOKENS: u32 = 500;

#[derive(Serialize)]
struct ExtractContext<'a> {
    schema: String,
    today: String,
    example_year: i32,
    default_location: &'a str,
    request: &'a str,
}

impl Assistant {
    /// Ask the model for search parameters matching `request`
    ///
    /// `tool` is the advertised search tool; its input schema is shown to the
    /// model when available.
    pub async fn extract_params(
        &self,
        request: &str,
        tool: Option<&ToolInfo>,
        today: NaiveDate,
    ) -> Result<SearchParams, AssistantError> {
        debug!(%request, has_schema = tool.is_some(), %today, "Assistant::extract_params: called");
        let schema = match tool {
            Some(tool) => serde_json::to_string_pretty(&tool.input_schema).map_err(crate::llm::LlmError::from)?,
            None => "(schema unavailable)".to_string(),
        };
        let context = ExtractContext {
            schema,
            today: today.format("%Y-%m-%d").to_string(),
            example_year: today.year(),
            default_location: &self.default_location,
            request,
        };

        let system_prompt = self.prompts.render("extract", &context)?;
        let user = self.prompts.render("extract-input", &context)?;
        let completion = CompletionRequest::single(system_prompt, user, EXTRACT_MAX_TOKENS).expecting_json();

        let response = self.llm.complete(completion).await?;
        let reply = response.content.ok_or(AssistantError::EmptyReply)?;
        let params = parse_params_reply(&reply)?;
        info!(location = %params.location, "Extracted search parameters");
        Ok(params)
    }
}

/// Parse the model's reply, tolerating prose or code fences around the object
fn parse_params_reply(reply: &str) -> Result<SearchParams, AssistantError> {
    debug!(reply_len = reply.len(), "parse_params_reply: called");
    let start = reply.find('{');
    let end = reply.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            warn!(%reply, "Extraction reply holds no JSON object");
            return Err(AssistantError::Unparseable("no object found".to_string()));
        }
    };

    let value: Value = serde_json::from_str(body).map_err(|e| AssistantError::Unparseable(e.to_string()))?;
    SearchParams::from_loose_json(&value).ok_or(AssistantError::NoLocation)
}
