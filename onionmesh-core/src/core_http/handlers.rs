//! HTTP handlers for directory, relay and user nodes
//!
//! Every JSON body is extracted as `Result<Json<_>, JsonRejection>` so that a
//! malformed body is answered with the same `400 {error}` shape as a missing field.

use super::types::*;
use crate::core_directory::{Directory, DirectoryError, NodeId};
use crate::core_onion::{OnionError, RelayNode, RelayOutcome, UserNode};
use crate::metrics;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

pub(crate) const MISSING_REGISTRATION_FIELDS: &str = "Missing nodeId or public key";
pub(crate) const ALREADY_REGISTERED: &str = "Node is already registered";
pub(crate) const REGISTERED: &str = "Node registered successfully";
pub(crate) const RELAY_MISSING_MESSAGE: &str = "Missing message";
pub(crate) const RELAY_INTERNAL_ERROR: &str = "Internal error while processing the message";
pub(crate) const RELAY_FORWARDED: &str = "Message decrypted and forwarded successfully";
pub(crate) const RELAY_TERMINAL: &str = "Final message reached the last node";
pub(crate) const USER_MISSING_MESSAGE: &str = "Message not detected";
pub(crate) const SEND_MISSING_FIELDS: &str = "Message content and recipient ID are required";
pub(crate) const SEND_INTERNAL_ERROR: &str = "Internal error occurred during message transmission.";
pub(crate) const SEND_OK: &str = "Message successfully transmitted";

/// Error answered as `{error}` with a 400 or 500 status
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(error) => (StatusCode::BAD_REQUEST, error),
            ApiError::Internal(error) => (StatusCode::INTERNAL_SERVER_ERROR, error),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidInput(_) => ApiError::bad_request(MISSING_REGISTRATION_FIELDS),
            DirectoryError::DuplicateRegistration(_) => ApiError::bad_request(ALREADY_REGISTERED),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body or answer 400 with `on_error`
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, on_error: &str) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request(on_error)
    })
}

/// GET /status - Liveness probe shared by every node kind
pub async fn status() -> &'static str {
    "live"
}

// ============================================================================
// Directory Handlers
// ============================================================================

/// POST /registerNode - Publish a relay's public key
pub async fn register_node(
    State(directory): State<Arc<Directory>>,
    payload: Result<Json<RegisterNodeRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterNodeResponse>> {
    let req = json_body(payload, MISSING_REGISTRATION_FIELDS)?;
    let (Some(node_id), Some(pub_key)) = (req.node_id, req.pub_key) else {
        metrics::record_registration(Some("invalid_input"));
        return Err(ApiError::bad_request(MISSING_REGISTRATION_FIELDS));
    };

    match directory.register(node_id, pub_key).await {
        Ok(()) => {
            metrics::record_registration(None);
            Ok(Json(RegisterNodeResponse {
                message: REGISTERED.to_string(),
            }))
        }
        Err(err) => {
            metrics::record_registration(Some(err.kind()));
            Err(err.into())
        }
    }
}

/// GET /getNodeRegistry - Full relay listing
pub async fn get_node_registry(
    State(directory): State<Arc<Directory>>,
) -> Json<NodeRegistryResponse> {
    Json(NodeRegistryResponse {
        nodes: directory.list_nodes().await,
    })
}

// ============================================================================
// Relay Handlers
// ============================================================================

/// POST /message - Peel one layer and forward
pub async fn relay_message(
    State(relay): State<Arc<RelayNode>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let message = json_body(payload, RELAY_MISSING_MESSAGE)?
        .message
        .ok_or_else(|| ApiError::bad_request(RELAY_MISSING_MESSAGE))?;

    match relay.handle_message(&message).await {
        Ok(RelayOutcome::Forwarded { .. }) => Ok(Json(StatusResponse::new(RELAY_FORWARDED))),
        Ok(RelayOutcome::Delivered { plaintext }) => Ok(Json(StatusResponse {
            status: RELAY_TERMINAL.to_string(),
            message: Some(plaintext),
        })),
        // Already logged by the relay
        Err(_) => Err(ApiError::internal(RELAY_INTERNAL_ERROR)),
    }
}

/// GET /getLastReceivedEncryptedMessage
pub async fn last_received_encrypted_message(
    State(relay): State<Arc<RelayNode>>,
) -> Json<ResultResponse<Option<String>>> {
    Json(ResultResponse {
        result: relay.state().await.last_encrypted_message,
    })
}

/// GET /getLastReceivedDecryptedMessage
pub async fn last_received_decrypted_message(
    State(relay): State<Arc<RelayNode>>,
) -> Json<ResultResponse<Option<String>>> {
    Json(ResultResponse {
        result: relay.state().await.last_decrypted_message,
    })
}

/// GET /getLastMessageDestination
pub async fn last_message_destination(
    State(relay): State<Arc<RelayNode>>,
) -> Json<ResultResponse<Option<u64>>> {
    Json(ResultResponse {
        result: relay.state().await.last_forward_destination,
    })
}

/// GET /getPrivateKey - Only routed when key export is enabled
pub async fn private_key(
    State(relay): State<Arc<RelayNode>>,
) -> ApiResult<Json<ResultResponse<String>>> {
    let result = relay.keys().export_private_key().map_err(|err| {
        error!(node_id = relay.node_id(), error = %err, "Private key export failed");
        ApiError::internal(err.to_string())
    })?;
    Ok(Json(ResultResponse { result }))
}

// ============================================================================
// User Handlers
// ============================================================================

/// POST /message - Final delivery from the exit relay
pub async fn user_message(
    State(user): State<Arc<UserNode>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<&'static str> {
    let message = json_body(payload, USER_MISSING_MESSAGE)?
        .message
        .ok_or_else(|| ApiError::bad_request(USER_MISSING_MESSAGE))?;

    user.receive(message).await;
    Ok("success")
}

/// POST /sendMessage - Build a circuit and send through it
pub async fn send_message(
    State(user): State<Arc<UserNode>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let req = json_body(payload, SEND_MISSING_FIELDS)?;
    let (Some(message), Some(destination)) = (req.message, req.destination_user_id) else {
        return Err(ApiError::bad_request(SEND_MISSING_FIELDS));
    };

    match user.send(&message, destination).await {
        Ok(_) => Ok(Json(StatusResponse::new(SEND_OK))),
        Err(OnionError::InvalidInput(_)) => Err(ApiError::bad_request(SEND_MISSING_FIELDS)),
        // Never name the failing hop
        Err(_) => Err(ApiError::internal(SEND_INTERNAL_ERROR)),
    }
}

/// GET /getLastReceivedMessage
pub async fn last_received_message(
    State(user): State<Arc<UserNode>>,
) -> Json<ResultResponse<Option<String>>> {
    Json(ResultResponse {
        result: user.state().await.last_received_message,
    })
}

/// GET /getLastSentMessage
pub async fn last_sent_message(
    State(user): State<Arc<UserNode>>,
) -> Json<ResultResponse<Option<String>>> {
    Json(ResultResponse {
        result: user.state().await.last_sent_message,
    })
}

/// GET /getLastCircuit
pub async fn last_circuit(
    State(user): State<Arc<UserNode>>,
) -> Json<ResultResponse<Option<Vec<NodeId>>>> {
    Json(ResultResponse {
        result: user.state().await.last_circuit,
    })
}
