//! The seam between the pipeline and the generative model.
//!
//! Every stage that talks to a model does so through [`TextModel`], so tests can script the
//! model's answers and production code can use [`claudius::Anthropic`].

use claudius::{
    Anthropic, ContentBlock, KnownModel, MessageCreateParams, MessageParam, MessageRole, Model,
    Usage as ClaudiusUsage,
};

/////////////////////////////////////////////// Prompt /////////////////////////////////////////////

/// A single request to a generative model.
#[derive(Clone, Debug, PartialEq)]
pub struct Prompt {
    /// Fixed instructions, sent as the system prompt when present.
    pub system: Option<String>,
    /// The request-specific message.
    pub user: String,
    /// Randomness for this call.
    pub temperature: f32,
}

impl Prompt {
    /// A prompt with no system block.
    pub fn new(user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature,
        }
    }

    /// Attach a system block.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

///////////////////////////////////////////// Completion ///////////////////////////////////////////

/// The text a model produced, plus its token usage when the backend reports one.
#[derive(Clone, Debug, Default)]
pub struct Completion {
    /// Raw response text.
    pub text: String,
    /// Token usage for this call.
    pub usage: Option<ClaudiusUsage>,
}

impl Completion {
    /// A completion without usage information.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

///////////////////////////////////////////// TextModel ////////////////////////////////////////////

/// A generative model that turns a prompt into free text.
///
/// No structural guarantee is made about the text: callers ask for a shape and then parse
/// defensively.
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    /// Run the prompt once.
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, claudius::Error>;
}

//////////////////////////////////////////// ModelConfig ///////////////////////////////////////////

/// Parameters for the Anthropic-backed [`TextModel`].
#[derive(Clone, Debug)]
pub struct ModelConfig {
    /// The model to call.
    pub model: Model,
    /// Upper bound on generated tokens per call.
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: Model::Known(KnownModel::ClaudeSonnet40),
            max_tokens: 4096,
        }
    }
}

/// An Anthropic client paired with the parameters to call it with.
pub struct AnthropicModel {
    client: Anthropic,
    config: ModelConfig,
}

impl AnthropicModel {
    /// Wrap an existing client.
    pub fn new(client: Anthropic, config: ModelConfig) -> Self {
        Self { client, config }
    }

    /// Build a client from the environment (`ANTHROPIC_API_KEY`).
    pub fn from_env(config: ModelConfig) -> Result<Self, claudius::Error> {
        Ok(Self::new(Anthropic::new(None)?, config))
    }
}

#[async_trait::async_trait]
impl TextModel for AnthropicModel {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, claudius::Error> {
        let req = MessageCreateParams {
            max_tokens: self.config.max_tokens,
            model: self.config.model.clone(),
            messages: vec![MessageParam::new_with_string(
                prompt.user.clone(),
                MessageRole::User,
            )],
            system: prompt.system.clone().map(Into::into),
            thinking: None,
            metadata: None,
            stop_sequences: None,
            temperature: Some(prompt.temperature),
            tool_choice: None,
            tools: None,
            top_k: None,
            top_p: None,
            stream: false,
        };
        tracing::debug!(
            temperature = prompt.temperature,
            chars = prompt.user.len(),
            "sending prompt"
        );
        let resp = self.client.send(req).await?;
        let text = resp
            .content
            .iter()
            .flat_map(|c| {
                if let ContentBlock::Text(t) = c {
                    Some(t.text.clone())
                } else {
                    None
                }
            })
            .collect::<String>();
        Ok(Completion {
            text,
            usage: Some(resp.usage),
        })
    }
}

/////////////////////////////////////////////// testing ////////////////////////////////////////////


/////////////////////////////////////////////// tests //////////////////////////////////////////////
