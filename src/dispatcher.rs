// src/dispatcher.rs - One-command-per-cycle Q-code dispatch and tokenization
use async_trait::async_trait;
use thiserror::Error;

use crate::config::SerialEndpointConfig;
use crate::transport::{SerialTransport, TransportError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("serial communication failed: {0}")]
    Communication(#[from] TransportError),
}

/// Ordered, trimmed, non-empty tokens from one controller reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    tokens: Vec<String>,
}

impl RawResponse {
    /// The "no data" reply, produced when the controller stays silent.
    pub fn empty() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Build a response from already-split tokens. Fragments are trimmed
    /// and empty ones dropped, so the token invariant holds regardless of
    /// input.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .filter_map(|t| {
                    let trimmed = t.as_ref().trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Split a raw reply on comma and space, dropping empty fragments and
/// trimming the rest. Order and duplicates are preserved.
pub fn tokenize(text: &str) -> RawResponse {
    RawResponse::from_tokens(text.split([',', ' ']))
}

/// Seam between the snapshot assembler and the physical device. The real
/// implementation talks to a serial port; tests drive the assembler with a
/// scripted fake.
#[async_trait]
pub trait QueryDispatcher: Send + Sync {
    /// Run one full query cycle for a single Q-code.
    async fn query(&self, code: &str) -> Result<RawResponse, DispatchError>;
}

// Lets a shared dispatcher (and tests observing it) drive the collector.
#[async_trait]
impl<D: QueryDispatcher + ?Sized> QueryDispatcher for std::sync::Arc<D> {
    async fn query(&self, code: &str) -> Result<RawResponse, DispatchError> {
        (**self).query(code).await
    }
}

/// Dispatches each query as an atomic open-write-settle-read-close cycle
/// against the configured serial endpoint.
pub struct SerialDispatcher {
    config: SerialEndpointConfig,
}

impl SerialDispatcher {
    pub fn new(config: SerialEndpointConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QueryDispatcher for SerialDispatcher {
    async fn query(&self, code: &str) -> Result<RawResponse, DispatchError> {
        // The transport is dropped on every path out of this function,
        // closing the port even when a write fails mid-cycle.
        let transport = SerialTransport::open(&self.config)?;
        transport.write(code).await?;

        match transport.read_available().await {
            Ok(text) => {
                let response = tokenize(&text);
                tracing::debug!("{} -> {} token(s)", code, response.len());
                Ok(response)
            }
            Err(e) if e.is_read_timeout() => {
                tracing::debug!("no reply to {} within read timeout", code);
                Ok(RawResponse::empty())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_comma_and_space() {
        let response = tokenize("STATUS,ON");
        assert_eq!(response.tokens(), &["STATUS", "ON"]);

        let response = tokenize("Q600 5041 123.45");
        assert_eq!(response.tokens(), &["Q600", "5041", "123.45"]);
    }

    #[test]
    fn test_tokenize_drops_empty_fragments() {
        let response = tokenize(",, PROGRAM ,  O01234 ,,");
        assert_eq!(response.tokens(), &["PROGRAM", "O01234"]);
    }

    #[test]
    fn test_tokenize_trims_line_endings() {
        let response = tokenize("SERIAL NUMBER,3093123\r\n");
        assert_eq!(response.tokens(), &["SERIAL", "NUMBER", "3093123"]);
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \r\n").is_empty());
        assert_eq!(tokenize(", ,").len(), 0);
    }

    #[test]
    fn test_tokens_are_their_own_trim() {
        let response = tokenize("  A,B\r\n,  C  D\t ");
        for token in response.tokens() {
            assert!(!token.is_empty());
            assert_eq!(token, token.trim());
        }
    }

    #[test]
    fn test_tokenize_preserves_order_and_duplicates() {
        let response = tokenize("A B A,B");
        assert_eq!(response.tokens(), &["A", "B", "A", "B"]);
    }

    #[test]
    fn test_from_tokens_keeps_multiword_tokens() {
        // Callers that pre-split a reply may hand over tokens with inner
        // spaces; only the ends are trimmed.
        let response = RawResponse::from_tokens(["PROGRAM", "MDI", " FEED HOLD "]);
        assert_eq!(response.token(2), Some("FEED HOLD"));
    }
}
