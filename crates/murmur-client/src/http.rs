//! Relay client over HTTP.

use async_trait::async_trait;
use murmur_core::{Relay, TransportError};
use murmur_proto::{
    ErrorResponse, MailboxMessage, ParticipantId, ReceiveResponse, SendRequest, SendResponse,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// [`Relay`] backed by a remote `murmur-relay`.
///
/// Timeouts are enforced by the engine, not by the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRelay {
    /// Relay at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Relay at `base_url` using a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn send(&self, request: SendRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/send"))
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;
        let ack: SendResponse = decode(response).await?;
        if ack.ok {
            Ok(())
        } else {
            Err(TransportError::Protocol("relay answered ok=false".to_owned()))
        }
    }

    async fn receive(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<MailboxMessage>, TransportError> {
        let response = self
            .client
            .get(self.url("/receive"))
            .query(&[("participant", participant.as_str())])
            .send()
            .await
            .map_err(request_error)?;
        let body: ReceiveResponse = decode(response).await?;
        Ok(body.messages)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    match response.status() {
        StatusCode::OK => {
            response.json().await.map_err(|e| TransportError::Protocol(e.to_string()))
        },
        StatusCode::BAD_REQUEST => {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(e) => e.to_string(),
            };
            Err(TransportError::BadRequest(reason))
        },
        status => Err(TransportError::Protocol(format!("unexpected status {status}"))),
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(err.to_string())
    }
}
