use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    assistant::{
        ChatPayload, ChatTranscript, DescriptionRequest, GeneratedDescription, chat_key, chat_reply,
    },
    auth::AuthUser,
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::ApiJson,
    validation::ValidationErrors,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatReply {
    pub response: String,
}

/// generate_description
///
/// [Authenticated Route] Drafts a job description from a title, company and key skills.
#[utoipa::path(
    post,
    path = "/ai/generate-description",
    request_body = DescriptionRequest,
    responses(
        (status = 200, description = "Generated description", body = GeneratedDescription),
        (status = 422, description = "Job title missing")
    )
)]
pub async fn generate_description(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DescriptionRequest>,
) -> ApiResult<ApiResponse<GeneratedDescription>> {
    let brief = request
        .brief()
        .ok_or_else(|| ValidationErrors::single("job_title", "The job title field is required."))?;

    let generated = state.ai.generate(&brief).await;
    Ok(ApiResponse::ok(
        "Job description generated successfully",
        generated,
    ))
}

/// chat
///
/// [Public Route] Keyword chat bot. Each exchange is archived through the storage service;
/// archiving failures are logged and never fail the reply.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Bot reply", body = ChatReply),
        (status = 400, description = "Message is required")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ChatPayload>,
) -> ApiResult<ApiResponse<ChatReply>> {
    let message = payload
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;

    let reply = chat_reply(message);

    let now = Utc::now();
    let key = chat_key(now);
    let transcript = ChatTranscript::new(now, message, &reply);
    match serde_json::to_vec_pretty(&transcript) {
        Ok(bytes) => {
            if let Err(err) = state.storage.put(&key, "application/json", bytes).await {
                tracing::warn!(key = %key, error = %err, "failed to save chat transcript");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to encode chat transcript"),
    }

    Ok(ApiResponse::ok(
        "Message processed",
        ChatReply { response: reply },
    ))
}
