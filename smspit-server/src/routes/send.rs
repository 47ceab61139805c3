use axum::{
    body::Bytes,
    extract::{rejection::FormRejection, Path, State},
    Form, Json,
};

use crate::capture::{SendRequest, SendResponse, TwilioSendRequest, TwilioSendResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /send
///
/// The body is decoded as JSON whatever the Content-Type says.
pub async fn send(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<SendResponse>> {
    let request: SendRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::decode(format!("Invalid JSON: {}", e)))?;

    let response = state.pipeline.capture_native(request).await?;
    Ok(Json(response))
}

/// POST /2010-04-01/Accounts/{account_sid}/Messages.json
pub async fn twilio_send(
    State(state): State<AppState>,
    Path(account_sid): Path<String>,
    form: Result<Form<TwilioSendRequest>, FormRejection>,
) -> ApiResult<Json<TwilioSendResponse>> {
    let Form(request) = form.map_err(|e| ApiError::decode(format!("Invalid form data: {}", e)))?;
    tracing::debug!(account_sid = %account_sid, "Twilio-compatible capture");

    let response = state.pipeline.capture_twilio(request).await?;
    Ok(Json(response))
}
