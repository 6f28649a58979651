//! HTTP bridge transport
//!
//! Commands go out as signed JSON requests against the sidecar bridge.
//! Events come back through the webhook sink and are routed here to the
//! owning account's session channel.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use zaprust_common::config::TransportConfig;
use zaprust_common::types::AccountId;

use super::transport::{SessionHandle, Transport, TransportError, TransportEvent};

type HmacSha256 = Hmac<Sha256>;

/// Sign a request body with the shared bridge secret
pub fn sign_body(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify a webhook signature header against the raw body
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    chat: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct MediaPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    filename: String,
    data: String,
}

/// Bridge transport: session commands over HTTP, events via webhook
pub struct BridgeTransport {
    client: Client,
    base_url: String,
    secret: String,
    routes: Arc<RwLock<HashMap<AccountId, mpsc::Sender<TransportEvent>>>>,
}

impl BridgeTransport {
    /// Create a new bridge transport from configuration
    pub fn new(config: &TransportConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
            secret: config.webhook_secret.clone(),
            routes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The shared secret used to verify webhook signatures
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Route a webhook-delivered event to the owning account's session
    ///
    /// Returns false when no session is registered for the account. A
    /// route whose session has gone away is dropped on delivery failure.
    pub async fn deliver_event(&self, account_id: AccountId, event: TransportEvent) -> bool {
        let sender = { self.routes.read().await.get(&account_id).cloned() };

        match sender {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    self.routes.write().await.remove(&account_id);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn start_session(
        &self,
        account_id: AccountId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn SessionHandle>, TransportError> {
        // Register the route first so events arriving right after the
        // bridge acknowledges the start are not lost.
        self.routes.write().await.insert(account_id, events);

        let url = format!("{}/sessions/{}/start", self.base_url, account_id);
        if let Err(e) = post_signed(&self.client, &self.secret, url, &serde_json::json!({})).await {
            self.routes.write().await.remove(&account_id);
            return Err(e);
        }

        debug!(%account_id, "Bridge session started");

        Ok(Box::new(BridgeSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            secret: self.secret.clone(),
            account_id,
        }))
    }
}

/// Command surface of one bridge-backed session
#[derive(Debug)]
struct BridgeSession {
    client: Client,
    base_url: String,
    secret: String,
    account_id: AccountId,
}

impl BridgeSession {
    fn url(&self, suffix: &str) -> String {
        format!("{}/sessions/{}/{}", self.base_url, self.account_id, suffix)
    }
}

#[async_trait]
impl SessionHandle for BridgeSession {
    async fn send_text(&self, chat: &str, body: &str) -> Result<(), TransportError> {
        let payload = TextPayload { chat, body };
        post_signed(&self.client, &self.secret, self.url("messages"), &payload).await
    }

    async fn send_media(
        &self,
        chat: &str,
        media_path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let payload = media_payload(media_path, Some(chat), caption).await?;
        post_signed(&self.client, &self.secret, self.url("messages"), &payload).await
    }

    async fn post_broadcast(
        &self,
        media_path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let payload = media_payload(media_path, None, caption).await?;
        post_signed(&self.client, &self.secret, self.url("broadcast"), &payload).await
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        post_signed(
            &self.client,
            &self.secret,
            self.url("stop"),
            &serde_json::json!({}),
        )
        .await
    }
}

async fn media_payload(
    path: &Path,
    chat: Option<&str>,
    caption: Option<&str>,
) -> Result<MediaPayload, TransportError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TransportError::Media(format!("{}: {}", path.display(), e)))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());

    Ok(MediaPayload {
        chat: chat.map(str::to_string),
        caption: caption.map(str::to_string),
        filename,
        data: BASE64.encode(&bytes),
    })
}

async fn post_signed<T: Serialize>(
    client: &Client,
    secret: &str,
    url: String,
    payload: &T,
) -> Result<(), TransportError> {
    let body = serde_json::to_vec(payload)
        .map_err(|e| TransportError::Rejected(format!("Failed to encode payload: {}", e)))?;

    let mut request = client
        .post(&url)
        .header("Content-Type", "application/json");

    if let Some(signature) = sign_body(secret, &body) {
        request = request.header("X-Webhook-Signature", signature);
    }

    let response = request.body(body).send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let detail = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::CONFLICT || status.is_server_error() {
        Err(TransportError::Unavailable(format!("{}: {}", status, detail)))
    } else {
        Err(TransportError::Rejected(format!("{}: {}", status, detail)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> TransportConfig {
        TransportConfig {
            bridge_url: server.uri(),
            webhook_secret: "test-secret".to_string(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let signature = sign_body("secret", b"payload").unwrap();
        assert!(signature.starts_with("sha256="));
        assert!(verify_signature("secret", b"payload", &signature));
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let signature = sign_body("secret", b"payload").unwrap();
        assert!(!verify_signature("secret", b"other", &signature));
        assert!(!verify_signature("wrong", b"payload", &signature));
        assert!(!verify_signature("secret", b"payload", "md5=abc"));
        assert!(!verify_signature("secret", b"payload", "sha256=zz"));
    }

    #[tokio::test]
    async fn test_start_session_registers_event_route() {
        let server = MockServer::start().await;
        let account_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/start", account_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = BridgeTransport::new(&test_config(&server));
        let (tx, mut rx) = mpsc::channel(4);
        transport.start_session(account_id, tx).await.unwrap();

        assert!(
            transport
                .deliver_event(account_id, TransportEvent::Ready)
                .await
        );
        assert!(matches!(rx.recv().await, Some(TransportEvent::Ready)));

        // unknown accounts have no route
        assert!(
            !transport
                .deliver_event(Uuid::new_v4(), TransportEvent::Ready)
                .await
        );
    }

    #[tokio::test]
    async fn test_send_text_request_shape() {
        let server = MockServer::start().await;
        let account_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/start", account_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/messages", account_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = BridgeTransport::new(&test_config(&server));
        let (tx, _rx) = mpsc::channel(4);
        let session = transport.start_session(account_id, tx).await.unwrap();

        session.send_text("5511999990000@c.us", "hello").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = requests.last().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["chat"], "5511999990000@c.us");
        assert_eq!(body["body"], "hello");

        let signature = request
            .headers
            .get("X-Webhook-Signature")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(verify_signature("test-secret", &request.body, signature));
    }

    #[tokio::test]
    async fn test_send_media_encodes_file() {
        let server = MockServer::start().await;
        let account_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/start", account_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/messages", account_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fake image bytes").unwrap();

        let transport = BridgeTransport::new(&test_config(&server));
        let (tx, _rx) = mpsc::channel(4);
        let session = transport.start_session(account_id, tx).await.unwrap();

        session
            .send_media("5511999990000@c.us", file.path(), Some("look"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&requests.last().unwrap().body).unwrap();
        assert_eq!(body["caption"], "look");
        assert_eq!(body["data"], BASE64.encode(b"fake image bytes"));
        assert!(body["filename"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_missing_media_file_is_terminal() {
        let err = media_payload(Path::new("/nonexistent/file.jpg"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Media(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        let account_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/start", account_id)))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let transport = BridgeTransport::new(&test_config(&server));
        let (tx, _rx) = mpsc::channel(4);
        let err = transport.start_session(account_id, tx).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert!(err.is_transient());

        let other = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path(format!("/sessions/{}/start", other)))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad request"))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::channel(4);
        let err = transport.start_session(other, tx).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
        assert!(!err.is_transient());
    }
}
