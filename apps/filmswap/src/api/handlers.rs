//! # API Endpoint Handlers
//!
//! Every handler is a thin call into the shared engine, run through
//! [`AppState::run`]. Engine errors become [`ApiError`], which picks the
//! status code and logs server-side failures.

use super::{
    AppState,
    types::{
        DoneRequest, ErrorResponse, HealthResponse, JoinRequest, MatchResponse, PeriodRequest,
        RevealRequest, TargetRequest, TextRequest,
    },
};
use crate::deliver;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use filmswap_core::{
    GifteeLetter, JoinOutcome, ParticipantId, ReceivedGift, RemovalOutcome, Reveal, SwapError,
    SwapInfo, SwapRecord, SwapSummary, Transition, UnmatchOutcome,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// An engine error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub SwapError);

impl From<SwapError> for ApiError {
    fn from(e: SwapError) -> Self {
        Self(e)
    }
}

/// HTTP status for an engine error.
#[must_use]
pub fn status_for(e: &SwapError) -> StatusCode {
    if e.is_integrity_failure() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match e {
        SwapError::InvalidPeriod(_) | SwapError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SwapError::UnknownParticipant(_)
        | SwapError::NoActiveSwap
        | SwapError::NotMatched(_)
        | SwapError::MissingLetter(_)
        | SwapError::MissingGift(_) => StatusCode::NOT_FOUND,
        SwapError::SwapAlreadyExists
        | SwapError::AlreadyJoined(_)
        | SwapError::Banned(_)
        | SwapError::NotBanned(_)
        | SwapError::NotFullyMatched(_)
        | SwapError::GiftsNotDelivered(_)
        | SwapError::InsufficientParticipants { .. }
        | SwapError::NoMatchedParticipants => StatusCode::CONFLICT,
        SwapError::ConfigError(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if self.0.is_integrity_failure() {
            tracing::error!(error = %self.0, "assignment integrity failure");
        } else if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH / SWAP
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Current period and counts.
pub async fn swap_info_handler(State(state): State<AppState>) -> ApiResult<Json<SwapInfo>> {
    Ok(Json(state.run(|engine| engine.swap_info()).await?))
}

/// Create the swap.
pub async fn create_swap_handler(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SwapRecord>)> {
    let record = state.run(|engine| engine.create_swap()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// =============================================================================
// PARTICIPANT HANDLERS
// =============================================================================

/// Enroll a participant.
pub async fn join_handler(
    State(state): State<AppState>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<(StatusCode, Json<JoinOutcome>)> {
    let outcome = state
        .run(move |engine| engine.join(request.participant_id(), &request.name))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Write or replace the letter.
pub async fn letter_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<TextRequest>,
) -> ApiResult<StatusCode> {
    state
        .run(move |engine| engine.set_letter(ParticipantId(id), &request.text))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit the gift for the current giftee.
pub async fn gift_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<TextRequest>,
) -> ApiResult<StatusCode> {
    state
        .run(move |engine| engine.set_gift(ParticipantId(id), &request.text))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Update the display name.
pub async fn rename_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<TextRequest>,
) -> ApiResult<StatusCode> {
    state
        .run(move |engine| engine.rename(ParticipantId(id), &request.text))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark the participant done watching (or not).
pub async fn done_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DoneRequest>,
) -> ApiResult<StatusCode> {
    state
        .run(move |engine| engine.set_done_watching(ParticipantId(id), request.done))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leave the swap.
pub async fn leave_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<RemovalOutcome>> {
    let outcome = state
        .run(move |engine| engine.leave(ParticipantId(id)))
        .await?;
    deliver::dispatch(&outcome.notifications);
    Ok(Json(outcome))
}

/// The giftee's letter.
pub async fn giftee_letter_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<GifteeLetter>> {
    let letter = state
        .run(move |engine| engine.read_giftee_letter(ParticipantId(id)))
        .await?;
    Ok(Json(letter))
}

/// The gift from the participant's santa, once the watch period started.
pub async fn received_gift_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<ReceivedGift>> {
    let gift = state
        .run(move |engine| engine.receive_gift(ParticipantId(id)))
        .await?;
    Ok(Json(gift))
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

/// Match every eligible participant.
pub async fn match_handler(State(state): State<AppState>) -> ApiResult<Json<MatchResponse>> {
    let outcome = state.run(|engine| engine.match_users()).await?;
    deliver::dispatch(&outcome.notifications);
    Ok(Json(outcome.into()))
}

/// Ban a participant, repairing their cycle.
pub async fn ban_handler(
    State(state): State<AppState>,
    Json(request): Json<TargetRequest>,
) -> ApiResult<Json<RemovalOutcome>> {
    let outcome = state
        .run(move |engine| engine.ban(request.participant_id()))
        .await?;
    deliver::dispatch(&outcome.notifications);
    Ok(Json(outcome))
}

/// Lift a ban.
pub async fn unban_handler(
    State(state): State<AppState>,
    Json(request): Json<TargetRequest>,
) -> ApiResult<StatusCode> {
    state
        .run(move |engine| engine.unban(request.participant_id()))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Clear every assignment edge, unless disabled by configuration.
pub async fn unmatch_handler(State(state): State<AppState>) -> ApiResult<Json<UnmatchOutcome>> {
    if state.disable_unmatch {
        return Err(SwapError::ConfigError("unmatch is disabled".to_string()).into());
    }
    Ok(Json(state.run(|engine| engine.unmatch_all()).await?))
}

/// Change the period.
pub async fn period_handler(
    State(state): State<AppState>,
    Json(request): Json<PeriodRequest>,
) -> ApiResult<Json<Transition>> {
    let mut transition = state
        .run(move |engine| engine.set_period(&request.period))
        .await?;
    if state.period_post_hook {
        deliver::dispatch(&transition.notifications);
    } else {
        transition.notifications.clear();
    }
    Ok(Json(transition))
}

/// Render the assignment.
pub async fn reveal_handler(
    State(state): State<AppState>,
    Json(request): Json<RevealRequest>,
) -> ApiResult<Json<Reveal>> {
    let (format, layout, count) = request.resolve(state.default_layout)?;
    let reveal = state
        .run(move |engine| engine.reveal(format, layout, count))
        .await?;
    Ok(Json(reveal))
}

/// Administrator overview.
pub async fn summary_handler(State(state): State<AppState>) -> ApiResult<Json<SwapSummary>> {
    Ok(Json(state.run(|engine| engine.summary()).await?))
}
