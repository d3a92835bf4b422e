//! HTTP surface of the relay.
//!
//! ```text
//! POST /send                    {to, from, envelope} -> {"ok": true}
//! GET  /receive?participant=id                       -> {"messages": [...]}
//! GET  /health                                       -> {"status": "ok"}
//! ```
//!
//! Every rejection, including unparseable JSON, answers
//! `400 {"error": "..."}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use murmur_core::Environment;
use murmur_proto::{
    HealthResponse, ParticipantId, ReceiveQuery, ReceiveResponse, SendRequest, SendResponse,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{MailboxStore, RelayError};

/// Build the relay router around an explicit store instance.
pub fn router<E: Environment>(store: Arc<MailboxStore<E>>) -> Router {
    Router::new()
        .route("/send", post(send::<E>))
        .route("/receive", get(receive::<E>))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(store)
}

async fn send<E: Environment>(
    State(store): State<Arc<MailboxStore<E>>>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!("rejected send body: {}", rejection.body_text());
            return RelayError::BadRequest(rejection.body_text()).into_response();
        },
    };

    match store.append(request) {
        Ok(()) => Json(SendResponse::ACK).into_response(),
        Err(err) => {
            tracing::warn!("rejected send: {}", err);
            err.into_response()
        },
    }
}

async fn receive<E: Environment>(
    State(store): State<Arc<MailboxStore<E>>>,
    query: Result<Query<ReceiveQuery>, QueryRejection>,
) -> Response {
    let participant = match query {
        Ok(Query(ReceiveQuery { participant: Some(participant) })) if !participant.is_empty() => {
            participant
        },
        Ok(_) => return RelayError::BadRequest("missing participant".to_owned()).into_response(),
        Err(rejection) => return RelayError::BadRequest(rejection.body_text()).into_response(),
    };

    let participant = match ParticipantId::new(participant) {
        Ok(participant) => participant,
        Err(err) => return RelayError::BadRequest(err.to_string()).into_response(),
    };

    Json(ReceiveResponse { messages: store.drain(&participant) }).into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_owned() })
}
