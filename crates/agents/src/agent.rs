//! An agent is a definition bound to one provider instance.

use std::sync::Arc;

use troupe_domain::agentdef::AgentDefinition;
use troupe_domain::stream::{BoxStream, StreamEvent};
use troupe_domain::Result;
use troupe_providers::{Completion, CompletionRequest, LlmProvider};

pub struct Agent {
    pub definition: AgentDefinition,
    provider: Arc<dyn LlmProvider>,
}

impl Agent {
    pub fn new(definition: AgentDefinition, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            definition,
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether this agent's tool filter permits the named tool.
    pub fn allows(&self, tool_name: &str) -> bool {
        self.definition.tools.allows(tool_name)
    }

    /// Fill unset request fields from the definition's model config.
    fn fill_request(&self, mut req: CompletionRequest) -> CompletionRequest {
        let model = &self.definition.model;
        if req.model.is_none() {
            req.model = Some(model.model_name.clone());
        }
        if req.temperature.is_none() {
            req.temperature = Some(model.temperature);
        }
        if req.max_tokens.is_none() {
            req.max_tokens = Some(model.max_tokens);
        }
        req
    }

    /// Non-streaming completion through this agent's provider.
    pub async fn complete(&self, req: CompletionRequest) -> Result<Completion> {
        self.provider.complete(self.fill_request(req)).await
    }

    /// Streaming completion through this agent's provider.
    pub async fn stream(&self, req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>> {
        self.provider.stream(self.fill_request(req)).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_domain::agentdef::{ModelConfig, ToolFilter};

    struct Probe;

    #[async_trait::async_trait]
    impl LlmProvider for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn supports_tools(&self) -> bool {
            true
        }
        async fn complete(&self, req: CompletionRequest) -> Result<Completion> {
            // Echo the filled parameters back so the test can assert them.
            Ok(Completion {
                content: format!(
                    "{}|{}|{}",
                    req.model.unwrap_or_default(),
                    req.temperature.unwrap_or(-1.0),
                    req.max_tokens.unwrap_or(0),
                ),
                tool_calls: Vec::new(),
                usage: None,
            })
        }
        async fn stream(
            &self,
            _req: CompletionRequest,
        ) -> Result<BoxStream<'static, StreamEvent>> {
            unimplemented!("not used in this test")
        }
    }

    fn agent() -> Agent {
        Agent::new(
            AgentDefinition {
                name: "developer".into(),
                display_name: "Developer".into(),
                description: String::new(),
                system_prompt: "You write code.".into(),
                capabilities: vec![],
                skills: vec![],
                model: ModelConfig {
                    provider: "probe".into(),
                    model_name: "model-x".into(),
                    temperature: 0.3,
                    max_tokens: 2048,
                },
                tools: ToolFilter {
                    allowed: vec!["write_file".into()],
                    denied: vec![],
                },
            },
            Arc::new(Probe),
        )
    }

    #[tokio::test]
    async fn unset_fields_filled_from_definition() {
        let out = agent().complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(out.content, "model-x|0.3|2048");
    }

    #[tokio::test]
    async fn explicit_fields_win() {
        let req = CompletionRequest {
            model: Some("override".into()),
            temperature: Some(0.0),
            max_tokens: Some(16),
            ..Default::default()
        };
        let out = agent().complete(req).await.unwrap();
        assert_eq!(out.content, "override|0|16");
    }

    #[test]
    fn allows_follows_filter() {
        let a = agent();
        assert!(a.allows("write_file"));
        assert!(!a.allows("run_command"));
    }
}
