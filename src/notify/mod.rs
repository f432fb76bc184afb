//! Outbound operator notifications.
//!
//! Every reply and unattended notification is a single text message sent to
//! one target identity. The bot's HTTP message endpoint is reached through
//! [`HttpNotifier`]; [`ConsoleNotifier`] prints instead and is what the
//! command line uses when no endpoint is configured.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::constants::NOTIFY_TIMEOUT;

/// Delivers a text message to a target identity.
pub trait Notifier: Send + Sync {
    fn send(&self, target: &str, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Prints messages to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        if target.is_empty() {
            println!("{message}");
        } else {
            println!("{} {}", format!("[to {target}]").dimmed(), message);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    target: &'a str,
    content: &'a str,
    chat_type: &'a str,
}

/// Posts messages as JSON to the bot's message endpoint.
///
/// The body is `{"target": ..., "content": ..., "chat_type": ...}`.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_type: String,
}

impl HttpNotifier {
    /// Notifier whose requests give up after [`NOTIFY_TIMEOUT`].
    pub fn new(endpoint: impl Into<String>, chat_type: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, chat_type, NOTIFY_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        chat_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            chat_type: chat_type.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Notifier for HttpNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        debug!("Posting message for {} to {}", target, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&OutboundMessage {
                target,
                content: message,
                chat_type: &self.chat_type,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach message endpoint {}", self.endpoint))?;

        if !response.status().is_success() {
            bail!("Message endpoint {} answered HTTP {}", self.endpoint, response.status());
        }
        Ok(())
    }
}

/// Notifier chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnyNotifier {
    Console(ConsoleNotifier),
    Http(HttpNotifier),
}

impl AnyNotifier {
    /// HTTP when an endpoint is configured, console otherwise.
    pub fn from_endpoint(endpoint: Option<&str>, chat_type: &str) -> Result<Self> {
        Ok(match endpoint {
            Some(url) if !url.trim().is_empty() => Self::Http(HttpNotifier::new(url, chat_type)?),
            _ => Self::Console(ConsoleNotifier),
        })
    }
}

impl Notifier for AnyNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        match self {
            Self::Console(n) => n.send(target, message).await,
            Self::Http(n) => n.send(target, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_endpoint() {
        assert!(matches!(
            AnyNotifier::from_endpoint(None, "private").unwrap(),
            AnyNotifier::Console(_)
        ));
        assert!(matches!(
            AnyNotifier::from_endpoint(Some("  "), "private").unwrap(),
            AnyNotifier::Console(_)
        ));
        match AnyNotifier::from_endpoint(Some("http://127.0.0.1:3000/send"), "group").unwrap() {
            AnyNotifier::Http(n) => assert_eq!(n.endpoint(), "http://127.0.0.1:3000/send"),
            other => panic!("expected http notifier, got {other:?}"),
        }
    }

    #[test]
    fn test_outbound_message_shape() {
        let body = serde_json::to_value(OutboundMessage {
            target: "10001",
            content: "hi",
            chat_type: "private",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"target": "10001", "content": "hi", "chat_type": "private"}));
    }

    #[tokio::test]
    async fn test_http_notifier_reports_unreachable_endpoint() {
        // Port 9 (discard) on localhost is normally closed
        let notifier = HttpNotifier::new("http://127.0.0.1:9/send", "private").unwrap();
        assert!(notifier.send("1", "hello").await.is_err());
    }

    #[tokio::test]
    async fn test_http_notifier_gives_up_on_silent_endpoint() {
        // Accepts connections but never writes a response
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let notifier = HttpNotifier::with_timeout(
            format!("http://{addr}/send"),
            "private",
            Duration::from_millis(200),
        )
        .unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), notifier.send("1", "hello"))
            .await
            .expect("send should time out on its own");
        assert!(result.is_err());

        server.abort();
    }
}
