//! Murmur relay server.
//!
//! A store-and-forward relay for end-to-end encrypted envelopes. The relay
//! sees participant ids and opaque ciphertext only; it queues envelopes per
//! recipient and hands the whole queue over on the recipient's next poll.
//!
//! ## Architecture
//!
//! ```text
//! murmur-server
//!   ├─ SystemEnv      (production Environment impl, from murmur-core)
//!   ├─ http::router   (axum handlers: /send, /receive, /health)
//!   └─ MailboxStore   (per-recipient queues, atomic drain)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod http;
mod mailbox;

use std::{future::Future, net::SocketAddr, sync::Arc};

pub use error::{RelayError, ServerError};
pub use mailbox::{DEFAULT_MAX_ENVELOPE_BYTES, MailboxStore};
use murmur_core::SystemEnv;
use tokio::net::TcpListener;

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address to bind to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Largest accepted `nonce + ciphertext`, in bytes
    pub max_envelope_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_owned(),
            max_envelope_bytes: DEFAULT_MAX_ENVELOPE_BYTES,
        }
    }
}

/// Production relay: a bound listener plus the mailbox store it serves.
pub struct Server {
    listener: TcpListener,
    store: Arc<MailboxStore<SystemEnv>>,
}

impl Server {
    /// Validate `config` and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `max_envelope_bytes` is zero
    /// - Binding to the address fails
    pub async fn bind(config: RelayConfig) -> Result<Self, ServerError> {
        if config.max_envelope_bytes == 0 {
            return Err(ServerError::Config("max_envelope_bytes must be positive".to_owned()));
        }

        let listener = TcpListener::bind(&config.bind_address).await?;
        let store = Arc::new(MailboxStore::new(SystemEnv::new(), config.max_envelope_bytes));
        Ok(Self { listener, store })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the mailbox store.
    pub fn store(&self) -> Arc<MailboxStore<SystemEnv>> {
        Arc::clone(&self.store)
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        tracing::info!("Relay listening on {}", self.listener.local_addr()?);

        axum::serve(self.listener, http::router(self.store))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Relay stopped");
        Ok(())
    }
}
