use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::assistant::conversation::{Conversation, Exchange, Mode, NamedDocument};
use crate::assistant::prompts::jd_generation_prompt;
use crate::documents::TextExtractor;
use crate::errors::AppError;
use crate::extraction::parser::parse_model_output;
use crate::llm_client::complete_within;
use crate::llm_client::prompts::ASSISTANT_SYSTEM;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    /// Parsed job description, or `null` when the model did not return JSON.
    pub job_description: Option<Value>,
    pub raw: String,
}

#[derive(Deserialize)]
pub struct OpenConversationRequest {
    pub mode: Mode,
    pub job_description: NamedDocument,
    #[serde(default)]
    pub resumes: Vec<NamedDocument>,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub mode: Mode,
    pub signature: String,
    pub history: Vec<Exchange>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            mode: c.mode,
            signature: c.signature,
            history: c.history,
        }
    }
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub conversation_id: Uuid,
    /// 1-based position of this exchange in the history.
    pub index: usize,
    pub question: String,
    pub answer: String,
}

/// POST /api/v1/jd/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = req.prompt.trim();
    if request.is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }

    let raw = complete_within(
        state.llm.as_ref(),
        &jd_generation_prompt(request),
        ASSISTANT_SYSTEM,
        state.llm_deadline(),
    )
    .await?;
    let job_description = parse_model_output(&raw).value();
    info!(parsed = job_description.is_some(), "Generated job description");

    Ok(Json(GenerateResponse {
        job_description,
        raw,
    }))
}

/// POST /api/v1/conversations
pub async fn handle_open_conversation(
    State(state): State<AppState>,
    Json(req): Json<OpenConversationRequest>,
) -> Result<Json<ConversationResponse>, AppError> {
    open_conversation(&state, req.mode, req.job_description, req.resumes).await
}

/// POST /api/v1/conversations/upload
///
/// Multipart form: a `mode` text field, one `job_description` file and any
/// number of `resumes` files (txt, pdf, docx or doc).
pub async fn handle_upload_conversation(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConversationResponse>, AppError> {
    let staging = tempfile::tempdir().context("Cannot create upload staging directory")?;
    let mut mode = None;
    let mut job_description = None;
    let mut resumes = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "mode" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                mode = Some(parse_mode(&raw)?);
            }
            "job_description" | "resumes" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation(format!("'{name}' must be a file")))?;
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                let document = read_upload(
                    state.text_extractor.as_ref(),
                    staging.path(),
                    &file_name,
                    &bytes,
                )
                .await?;
                if name == "job_description" {
                    job_description = Some(document);
                } else {
                    resumes.push(document);
                }
            }
            other => {
                return Err(AppError::Validation(format!("Unexpected form field '{other}'")))
            }
        }
    }

    let mode = mode.ok_or_else(|| AppError::Validation("'mode' is required".to_string()))?;
    let job_description = job_description
        .ok_or_else(|| AppError::Validation("'job_description' file is required".to_string()))?;
    open_conversation(&state, mode, job_description, resumes).await
}

async fn open_conversation(
    state: &AppState,
    mode: Mode,
    job_description: NamedDocument,
    resumes: Vec<NamedDocument>,
) -> Result<Json<ConversationResponse>, AppError> {
    if job_description.text.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description.text must not be empty".to_string(),
        ));
    }
    if mode == Mode::Matching && resumes.is_empty() {
        return Err(AppError::Validation(
            "matching requires at least one resume".to_string(),
        ));
    }

    let conversation = state
        .conversations
        .open(mode, job_description, resumes)
        .await;
    info!(
        id = %conversation.id,
        mode = %conversation.mode,
        signature = %conversation.signature,
        history = conversation.history.len(),
        "Opened conversation"
    );
    Ok(Json(conversation.into()))
}

/// POST /api/v1/conversations/:id/messages
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = req.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }

    let conversation = find(&state, id).await?;
    // The store lock is not held across the model call.
    let answer = complete_within(
        state.llm.as_ref(),
        &conversation.prompt_for(&question),
        ASSISTANT_SYSTEM,
        state.llm_deadline(),
    )
    .await?;

    let exchange = Exchange {
        question: question.clone(),
        answer: answer.clone(),
    };
    let index = state
        .conversations
        .append(id, exchange)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id} was replaced")))?;

    Ok(Json(AskResponse {
        conversation_id: id,
        index,
        question,
        answer,
    }))
}

/// GET /api/v1/conversations/:id
pub async fn handle_get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, AppError> {
    Ok(Json(find(&state, id).await?.into()))
}

/// POST /api/v1/conversations/:id/reset
pub async fn handle_reset_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state
        .conversations
        .reset(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))?;
    Ok(Json(conversation.into()))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed upload: {e}"))
}

fn parse_mode(raw: &str) -> Result<Mode, AppError> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase())).map_err(|_| {
        AppError::Validation(format!(
            "Unknown mode '{}', expected extraction, reasoning or matching",
            raw.trim()
        ))
    })
}

/// Stages one uploaded file under its own name and extracts its text.
async fn read_upload(
    extractor: &dyn TextExtractor,
    staging: &std::path::Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<NamedDocument, AppError> {
    let name = std::path::Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Validation(format!("Invalid file name '{file_name}'")))?;

    let path = staging.join(&name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Cannot stage upload {name}"))?;

    let text = extractor.extract(&path).await;
    if text.is_empty() {
        return Err(AppError::Validation(format!(
            "No text could be read from '{name}'"
        )));
    }
    Ok(NamedDocument { name, text })
}

async fn find(state: &AppState, id: Uuid) -> Result<Conversation, AppError> {
    state
        .conversations
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))
}
