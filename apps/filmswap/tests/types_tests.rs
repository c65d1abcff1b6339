//! Tests for API request/response types and the error-to-status mapping.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use filmswap::api::{
    DoneRequest, ErrorResponse, JoinRequest, MatchResponse, RevealRequest, TargetRequest,
    keys_match, status_for,
};
use filmswap_core::{
    GraphLayout, MatchOutcome, MatchStrategy, MutationRecord, Notification, ParticipantId,
    RevealFormat, SwapError, SwapPeriod,
};
use serde_json::json;

// =============================================================================
// REQUEST PARSING
// =============================================================================

#[test]
fn test_done_request_defaults_to_true() {
    let request: DoneRequest = serde_json::from_value(json!({})).unwrap();
    assert!(request.done);

    let request: DoneRequest = serde_json::from_value(json!({ "done": false })).unwrap();
    assert!(!request.done);
}

#[test]
fn test_join_and_target_ids() {
    let join: JoinRequest = serde_json::from_value(json!({ "id": 12, "name": "x" })).unwrap();
    assert_eq!(join.participant_id(), ParticipantId(12));

    let target: TargetRequest = serde_json::from_value(json!({ "id": 3 })).unwrap();
    assert_eq!(target.participant_id(), ParticipantId(3));
}

#[test]
fn test_join_request_requires_name() {
    assert!(serde_json::from_value::<JoinRequest>(json!({ "id": 1 })).is_err());
}

#[test]
fn test_reveal_request_defaults() {
    let request = RevealRequest::default();
    let (format, layout, count) = request.resolve(GraphLayout::Circle).unwrap();
    assert_eq!(format, RevealFormat::Text);
    assert_eq!(layout, GraphLayout::Circle);
    assert_eq!(count, 1);
}

#[test]
fn test_reveal_request_names_are_case_insensitive() {
    let request: RevealRequest =
        serde_json::from_value(json!({ "format": "Graph", "layout": "KAMADA_KAWAI", "count": 10 }))
            .unwrap();
    let (format, layout, count) = request.resolve(GraphLayout::Spectral).unwrap();
    assert_eq!(format, RevealFormat::Graph);
    assert_eq!(layout, GraphLayout::KamadaKawai);
    assert_eq!(count, 10);
}

#[test]
fn test_reveal_request_rejects_out_of_range_count() {
    for count in [0, 11] {
        let request = RevealRequest {
            count: Some(count),
            ..RevealRequest::default()
        };
        assert!(matches!(
            request.resolve(GraphLayout::Spectral),
            Err(SwapError::InvalidInput(_))
        ));
    }
}

#[test]
fn test_reveal_request_rejects_unknown_format() {
    let request = RevealRequest {
        format: Some("ascii-art".to_string()),
        ..RevealRequest::default()
    };
    assert!(request.resolve(GraphLayout::Spectral).is_err());
}

// =============================================================================
// RESPONSES
// =============================================================================

#[test]
fn test_match_response_drops_mutations() {
    let outcome = MatchOutcome {
        strategy: MatchStrategy::Splice,
        newly_matched: vec![ParticipantId(4)],
        mutations: vec![MutationRecord::new(ParticipantId(4))],
        notifications: vec![Notification::GifteeChanged {
            recipient: ParticipantId(2),
        }],
    };
    let response = MatchResponse::from(outcome);
    assert_eq!(response.strategy, MatchStrategy::Splice);
    assert_eq!(response.newly_matched, vec![ParticipantId(4)]);
    assert_eq!(response.notifications.len(), 1);

    let value = serde_json::to_value(&response).unwrap();
    assert!(value.get("mutations").is_none());
}

#[test]
fn test_error_response_flags_integrity_failures() {
    let corrupt = ErrorResponse::from(&SwapError::SelfLoop(ParticipantId(1)));
    assert!(corrupt.integrity_failure);

    let user = ErrorResponse::from(&SwapError::NotMatched(ParticipantId(1)));
    assert!(!user.integrity_failure);
    assert!(!user.error.is_empty());
}

// =============================================================================
// STATUS MAPPING
// =============================================================================

#[test]
fn test_status_mapping() {
    let cases = [
        (SwapError::InvalidPeriod("x".into()), StatusCode::BAD_REQUEST),
        (SwapError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
        (SwapError::UnknownParticipant(ParticipantId(1)), StatusCode::NOT_FOUND),
        (SwapError::NoActiveSwap, StatusCode::NOT_FOUND),
        (SwapError::MissingLetter(ParticipantId(1)), StatusCode::NOT_FOUND),
        (SwapError::AlreadyJoined(ParticipantId(1)), StatusCode::CONFLICT),
        (SwapError::Banned(ParticipantId(1)), StatusCode::CONFLICT),
        (
            SwapError::GiftsNotDelivered(SwapPeriod::Swap),
            StatusCode::CONFLICT,
        ),
        (
            SwapError::InsufficientParticipants { eligible: 1 },
            StatusCode::CONFLICT,
        ),
        (SwapError::ConfigError("x".into()), StatusCode::FORBIDDEN),
        (SwapError::NoCyclesFound, StatusCode::INTERNAL_SERVER_ERROR),
        (
            SwapError::DanglingEdge {
                from: ParticipantId(1),
                to: ParticipantId(2),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (SwapError::StorageError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(status_for(&error), expected, "{:?}", error);
    }
}

#[test]
fn test_keys_match_is_exact() {
    assert!(keys_match("abc", "abc"));
    assert!(!keys_match("abd", "abc"));
    assert!(!keys_match("abcd", "abc"));
}
