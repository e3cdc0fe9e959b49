//! API routes for each node kind

use super::handlers;
use crate::core_directory::Directory;
use crate::core_onion::{RelayNode, UserNode};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Directory routes
pub fn build_directory_router(directory: Arc<Directory>) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/registerNode", post(handlers::register_node))
        .route("/getNodeRegistry", get(handlers::get_node_registry))
        .with_state(directory)
}

/// Relay routes; `/getPrivateKey` only exists when `expose_private_key` is set
pub fn build_relay_router(relay: Arc<RelayNode>, expose_private_key: bool) -> Router {
    let mut router = Router::new()
        .route("/status", get(handlers::status))
        .route("/message", post(handlers::relay_message))
        // Diagnostics
        .route(
            "/getLastReceivedEncryptedMessage",
            get(handlers::last_received_encrypted_message),
        )
        .route(
            "/getLastReceivedDecryptedMessage",
            get(handlers::last_received_decrypted_message),
        )
        .route("/getLastMessageDestination", get(handlers::last_message_destination));

    if expose_private_key {
        router = router.route("/getPrivateKey", get(handlers::private_key));
    }

    router.with_state(relay)
}

/// User routes
pub fn build_user_router(user: Arc<UserNode>) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/message", post(handlers::user_message))
        .route("/sendMessage", post(handlers::send_message))
        // Diagnostics
        .route("/getLastReceivedMessage", get(handlers::last_received_message))
        .route("/getLastSentMessage", get(handlers::last_sent_message))
        .route("/getLastCircuit", get(handlers::last_circuit))
        .with_state(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_crypto::RelayKeyPair;
    use crate::core_onion::circuit::{build_onion, Circuit};
    use crate::core_router::{AddressSpace, Endpoint};
    use crate::test_utils::{record_for, relay_with_shared_keys, shared_keys, RecordingTransport};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn call_json(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = call(router, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // ------------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_status_is_live() {
        let router = build_directory_router(Arc::new(Directory::new()));
        let (status, body) = call(router, Method::GET, "/status", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"live");
    }

    #[tokio::test]
    async fn test_register_and_list_nodes() {
        let directory = Arc::new(Directory::new());
        let router = build_directory_router(directory.clone());

        let (status, body) = call_json(
            router.clone(),
            Method::POST,
            "/registerNode",
            Some(json!({ "nodeId": 1, "pubKey": "key-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Node registered successfully" }));

        let (status, body) = call_json(router, Method::GET, "/getNodeRegistry", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "nodes": [{ "nodeId": 1, "pubKey": "key-1" }] }));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_missing_fields() {
        let router = build_directory_router(Arc::new(Directory::new()));
        let record = json!({ "nodeId": 3, "pubKey": "key-3" });

        call_json(router.clone(), Method::POST, "/registerNode", Some(record.clone())).await;
        let (status, body) =
            call_json(router.clone(), Method::POST, "/registerNode", Some(record)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Node is already registered");

        for bad in [json!({ "nodeId": 4 }), json!({ "pubKey": "k" }), json!({ "nodeId": "x" })] {
            let (status, body) =
                call_json(router.clone(), Method::POST, "/registerNode", Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Missing nodeId or public key");
        }
    }

    // ------------------------------------------------------------------------
    // Relay
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_relay_forwards_and_exposes_diagnostics() {
        let transport = Arc::new(RecordingTransport::default());
        let relay = Arc::new(relay_with_shared_keys(2, transport.clone()));
        let router = build_relay_router(relay, false);

        let circuit = Circuit::new(vec![record_for(2), record_for(1), record_for(3)]).unwrap();
        let onion = build_onion(&circuit, "hello", 7, &AddressSpace::default()).unwrap();

        let (status, body) = call_json(
            router.clone(),
            Method::POST,
            "/message",
            Some(json!({ "message": onion.as_str() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Message decrypted and forwarded successfully");
        assert_eq!(transport.forwarded().await[0].0, Endpoint::Relay(1));

        let (_, body) =
            call_json(router.clone(), Method::GET, "/getLastMessageDestination", None).await;
        assert_eq!(body, json!({ "result": 4001 }));

        let (_, body) =
            call_json(router, Method::GET, "/getLastReceivedEncryptedMessage", None).await;
        assert_eq!(body["result"], onion.as_str());
    }

    #[tokio::test]
    async fn test_relay_diagnostics_start_empty() {
        let relay = Arc::new(relay_with_shared_keys(0, Arc::new(RecordingTransport::default())));
        let router = build_relay_router(relay, false);

        let (status, body) =
            call_json(router, Method::GET, "/getLastReceivedDecryptedMessage", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": null }));
    }

    #[tokio::test]
    async fn test_relay_message_errors() {
        let relay = Arc::new(relay_with_shared_keys(0, Arc::new(RecordingTransport::default())));
        let router = build_relay_router(relay, false);

        let (status, body) =
            call_json(router.clone(), Method::POST, "/message", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing message");

        let (status, body) = call_json(
            router,
            Method::POST,
            "/message",
            Some(json!({ "message": "not an onion" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal error while processing the message");
    }

    #[tokio::test]
    async fn test_private_key_route_is_gated() {
        let relay = Arc::new(relay_with_shared_keys(0, Arc::new(RecordingTransport::default())));

        let (status, _) = call(
            build_relay_router(relay.clone(), false),
            Method::GET,
            "/getPrivateKey",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            call_json(build_relay_router(relay, true), Method::GET, "/getPrivateKey", None).await;
        assert_eq!(status, StatusCode::OK);

        let exported = body["result"].as_str().unwrap();
        let restored = RelayKeyPair::from_private_key_base64(exported).unwrap();
        assert_eq!(
            restored.export_public_key().unwrap(),
            shared_keys(0).export_public_key().unwrap()
        );
    }

    // ------------------------------------------------------------------------
    // User
    // ------------------------------------------------------------------------

    fn user_router(transport: Arc<RecordingTransport>) -> Router {
        let user = UserNode::new(0, AddressSpace::default(), transport).unwrap();
        build_user_router(Arc::new(user))
    }

    #[tokio::test]
    async fn test_user_receives_message() {
        let router = user_router(Arc::new(RecordingTransport::default()));

        let (status, body) = call(
            router.clone(),
            Method::POST,
            "/message",
            Some(json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"success");

        let (_, body) = call_json(router.clone(), Method::GET, "/getLastReceivedMessage", None).await;
        assert_eq!(body, json!({ "result": "hello" }));

        let (status, body) =
            call_json(router, Method::POST, "/message", Some(json!({ "message": null }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message not detected");
    }

    #[tokio::test]
    async fn test_send_message_records_circuit() {
        let transport = Arc::new(RecordingTransport::with_nodes(vec![
            record_for(1),
            record_for(2),
            record_for(3),
        ]));
        let router = user_router(transport.clone());

        let (status, body) = call_json(
            router.clone(),
            Method::POST,
            "/sendMessage",
            Some(json!({ "message": "hello", "destinationUserId": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Message successfully transmitted");

        let (_, body) = call_json(router.clone(), Method::GET, "/getLastSentMessage", None).await;
        assert_eq!(body, json!({ "result": "hello" }));

        let (_, body) = call_json(router, Method::GET, "/getLastCircuit", None).await;
        let path = body["result"].as_array().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(transport.forwarded().await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_message_validation_and_failure() {
        let transport = Arc::new(RecordingTransport::with_nodes(vec![record_for(1)]));
        let router = user_router(transport.clone());

        for bad in [
            json!({ "message": "", "destinationUserId": 7 }),
            json!({ "message": "hello" }),
            json!({ "destinationUserId": 7 }),
            json!({ "message": "hello", "destinationUserId": 70_000 }),
        ] {
            let (status, body) =
                call_json(router.clone(), Method::POST, "/sendMessage", Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Message content and recipient ID are required");
        }

        // Only one relay registered
        let (status, body) = call_json(
            router.clone(),
            Method::POST,
            "/sendMessage",
            Some(json!({ "message": "hello", "destinationUserId": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal error occurred during message transmission.");
        assert_eq!(transport.forward_attempts().await, 0);

        let (_, body) = call_json(router, Method::GET, "/getLastCircuit", None).await;
        assert_eq!(body, json!({ "result": null }));
    }
}
