//! Job description generation and the keyword chat bot.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// DescriptionRequest
///
/// Body of `POST /ai/generate-description`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct DescriptionRequest {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub key_skills: Vec<String>,
}

/// Validated input for a generator.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionBrief {
    pub job_title: String,
    pub company_name: Option<String>,
    pub key_skills: Vec<String>,
}

impl DescriptionRequest {
    /// `None` when `job_title` is missing or blank.
    pub fn brief(&self) -> Option<DescriptionBrief> {
        let job_title = self.job_title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(DescriptionBrief {
            job_title: job_title.to_string(),
            company_name: self
                .company_name
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            key_skills: self
                .key_skills
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedDescription {
    pub description: String,
    /// `template` or `openai`.
    pub source: String,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion returned no content")]
    EmptyContent,
}

/// DescriptionGenerator
///
/// Produces the body text of a job posting from a short brief.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(&self, brief: &DescriptionBrief) -> GeneratedDescription;
}

pub type GeneratorState = Arc<dyn DescriptionGenerator>;

/// The fixed posting template used when no model is configured.
pub fn template_description(brief: &DescriptionBrief) -> String {
    let skills = if brief.key_skills.is_empty() {
        String::new()
    } else {
        format!(" with expertise in {}", brief.key_skills.join(", "))
    };
    let company = brief
        .company_name
        .as_deref()
        .map(|c| format!(" at {c}"))
        .unwrap_or_default();

    format!(
        "We are seeking a talented {title}{skills} to join our team{company}.

Responsibilities:
• Lead and execute key projects
• Collaborate with cross-functional teams
• Drive innovation and continuous improvement
• Mentor junior team members

Qualifications:
• 3+ years of relevant experience
• Strong problem-solving skills
• Excellent communication abilities
• Bachelor's degree in relevant field

Benefits:
• Competitive salary
• Health insurance
• Flexible working hours
• Professional development opportunities",
        title = brief.job_title,
    )
}

pub fn description_prompt(brief: &DescriptionBrief) -> String {
    let mut prompt = format!("Generate a professional job description for {}", brief.job_title);
    if let Some(company) = &brief.company_name {
        prompt.push_str(&format!(" at {company}"));
    }
    prompt.push_str(". ");
    if !brief.key_skills.is_empty() {
        prompt.push_str(&format!("Required skills: {}. ", brief.key_skills.join(", ")));
    }
    prompt.push_str("Include responsibilities, qualifications, and benefits.");
    prompt
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateDescriptionGenerator;

#[async_trait]
impl DescriptionGenerator for TemplateDescriptionGenerator {
    async fn generate(&self, brief: &DescriptionBrief) -> GeneratedDescription {
        GeneratedDescription {
            description: template_description(brief),
            source: "template".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAiDescriptionGenerator
///
/// Calls the chat-completions API and falls back to the template on any failure.
#[derive(Clone)]
pub struct OpenAiDescriptionGenerator {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiDescriptionGenerator {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, OPENAI_CHAT_URL)
    }

    pub fn with_endpoint(api_key: String, endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            endpoint: endpoint.to_string(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, GeneratorError> {
        let body = ChatRequest {
            model: OPENAI_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GeneratorError::EmptyContent)
    }
}

#[async_trait]
impl DescriptionGenerator for OpenAiDescriptionGenerator {
    async fn generate(&self, brief: &DescriptionBrief) -> GeneratedDescription {
        match self.complete(&description_prompt(brief)).await {
            Ok(description) => GeneratedDescription {
                description,
                source: "openai".to_string(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "description generation failed, using template");
                TemplateDescriptionGenerator.generate(brief).await
            }
        }
    }
}

// --- Chat bot ---

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ChatPayload {
    pub message: Option<String>,
}

/// Keyword reply: "hello" wins over "bye"; anything else is echoed.
pub fn chat_reply(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("hello") {
        "Hello! How can I help you today?".to_string()
    } else if lower.contains("bye") {
        "Goodbye! Have a great day!".to_string()
    } else {
        format!("I am a simple chatbot. You said: {message}")
    }
}

/// ChatTranscript
///
/// One persisted exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTranscript {
    pub timestamp: String,
    pub user: String,
    pub bot: String,
}

impl ChatTranscript {
    pub fn new(at: DateTime<Utc>, user: &str, bot: &str) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            user: user.to_string(),
            bot: bot.to_string(),
        }
    }
}

pub fn chat_key(at: DateTime<Utc>) -> String {
    format!("chats/chat_{}.json", at.timestamp_millis())
}
