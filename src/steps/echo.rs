use crate::launchpad::{Step, StepError, StepResult};
use async_trait::async_trait;
use serde_json::Value;

/// Stateless step that returns its input as both payload and response
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoStep;

#[async_trait]
impl Step for EchoStep {
    async fn execute(&mut self, input: &str) -> Result<StepResult, StepError> {
        Ok(StepResult::new(Value::from(input)).with_response(input))
    }
}
