//! Kickoff stage: collect the user's background into a structured resume
//!
//! Each turn sends the transcript to the model, which answers with a JSON
//! object holding its reply, the resume draft so far and whether it has
//! enough information. The transcript and the last valid draft are the
//! persisted substate.

use crate::launchpad::{Dumpable, Step, StepContext, StepError, StepResult};
use crate::llm::{LlmMessage, LlmRequest, LlmService};
use crate::resume::Resume;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const KICKOFF: &str = "kickoff";

const SYSTEM_PROMPT: &str = r#"You help the user put together their resume.
Ask one short question at a time about their experience, education and skills.
Always answer with a single JSON object of the form:
{"reply": "<message for the user>", "resume": <resume in JSON Resume format or null>, "complete": <true once the resume covers basics, work and education>}
Dates use YYYY, YYYY-MM or YYYY-MM-DD. Leave unknown fields empty."#;

const FALLBACK_REPLY: &str = "Thanks, noted. Tell me more.";

/// Payload returned by every kickoff turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KickoffOutput {
    /// Latest draft that passed validation
    pub resume: Option<Resume>,
    /// The model considers the resume finished and the draft is valid
    pub complete: bool,
    /// Problems found in this turn's draft, if it was rejected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct KickoffState {
    #[serde(default)]
    transcript: Vec<LlmMessage>,
    #[serde(default)]
    resume: Option<Resume>,
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    reply: String,
    #[serde(default)]
    resume: Option<Resume>,
    #[serde(default)]
    complete: bool,
}

pub struct KickoffStep {
    llm: Arc<dyn LlmService>,
    state: KickoffState,
}

impl KickoffStep {
    pub fn new(ctx: &StepContext) -> Self {
        Self {
            llm: ctx.llm().clone(),
            state: KickoffState::default(),
        }
    }

    pub fn resume(&self) -> Option<&Resume> {
        self.state.resume.as_ref()
    }

    pub fn turns(&self) -> usize {
        self.state.transcript.len()
    }
}

#[async_trait]
impl Step for KickoffStep {
    async fn execute(&mut self, input: &str) -> Result<StepResult, StepError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StepError::InvalidInput("message is empty".to_string()));
        }

        let mut messages = self.state.transcript.clone();
        messages.push(LlmMessage::user(input));
        let request = LlmRequest::new(messages)
            .with_system(SYSTEM_PROMPT)
            .with_json_output();

        let response = self.llm.complete(&request).await?;

        let (reply, draft, claimed_complete) = match serde_json::from_str::<ModelReply>(&response.text) {
            Ok(parsed) if parsed.reply.trim().is_empty() => {
                (FALLBACK_REPLY.to_string(), parsed.resume, parsed.complete)
            }
            Ok(parsed) => (parsed.reply, parsed.resume, parsed.complete),
            Err(e) => {
                tracing::warn!(error = %e, "Kickoff reply was not structured, using raw text");
                (response.text.clone(), None, false)
            }
        };

        let mut issues = Vec::new();
        if let Some(draft) = draft {
            match draft.validate() {
                Ok(()) => self.state.resume = Some(draft),
                Err(found) => {
                    tracing::debug!(issues = found.len(), "Rejected resume draft");
                    issues = found.iter().map(ToString::to_string).collect();
                }
            }
        }

        self.state.transcript.push(LlmMessage::user(input));
        self.state.transcript.push(LlmMessage::assistant(response.text));

        let output = KickoffOutput {
            complete: claimed_complete && issues.is_empty() && self.state.resume.is_some(),
            resume: self.state.resume.clone(),
            issues,
        };
        Ok(StepResult::of(&output)?.with_response(reply))
    }
}

impl Dumpable for KickoffStep {
    fn dump(&self) -> Result<Value, StepError> {
        Ok(serde_json::to_value(&self.state)?)
    }

    fn load(&mut self, state: Value) -> Result<(), StepError> {
        self.state = serde_json::from_value(state)?;
        Ok(())
    }
}
