//! Websocket transport for the realtime stream

use crate::config::ClientConfig;
use crate::error::{PointfinderError, PointfinderResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

/// The (game, token) pair the client keeps a subscription for
#[derive(Clone, PartialEq, Eq)]
pub struct DesiredSession {
    pub game_id: Uuid,
    pub token: String,
}

impl DesiredSession {
    pub fn new(game_id: Uuid, token: impl Into<String>) -> Self {
        Self {
            game_id,
            token: token.into(),
        }
    }
}

impl fmt::Debug for DesiredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesiredSession")
            .field("game_id", &self.game_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Opens realtime connections
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self, session: &DesiredSession) -> PointfinderResult<Box<dyn RealtimeConnection>>;
}

/// One open realtime connection
///
/// `recv` must be cancel-safe; the client polls it alongside its timers.
#[async_trait]
pub trait RealtimeConnection: Send {
    /// Next text payload, or `None` once the server closed the stream
    async fn recv(&mut self) -> PointfinderResult<Option<String>>;

    async fn ping(&mut self) -> PointfinderResult<()>;

    async fn close(&mut self) -> PointfinderResult<()>;
}

/// tokio-tungstenite connector for the mobile event endpoint
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: Url,
    path: String,
}

impl WebSocketConnector {
    pub fn new(api_base_url: &str, path: impl Into<String>) -> PointfinderResult<Self> {
        let base_url = Url::parse(api_base_url)?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(PointfinderError::config_with_context(
                format!("'{}' is not a usable server URL", api_base_url),
                "Building realtime endpoint",
            ));
        }
        Ok(Self {
            base_url,
            path: path.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> PointfinderResult<Self> {
        Self::new(&config.api_base_url, config.realtime.path.clone())
    }

    /// Websocket URL for `session`: same host and port, `ws`/`wss` scheme,
    /// the configured path in place of the API path
    pub fn endpoint(&self, session: &DesiredSession) -> PointfinderResult<Url> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            PointfinderError::config(format!("Cannot use {} scheme for {}", scheme, self.base_url))
        })?;
        url.set_path(&self.path);
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("gameId", &session.game_id.to_string())
            .append_pair("token", &session.token);
        Ok(url)
    }
}

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(&self, session: &DesiredSession) -> PointfinderResult<Box<dyn RealtimeConnection>> {
        let url = self.endpoint(session)?;
        let mut request = url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", session.token))
            .map_err(|e| PointfinderError::transport(format!("Invalid token header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        tracing::debug!(game_id = %session.game_id, "websocket handshake complete");
        Ok(Box::new(WebSocketConnection { ws }))
    }
}

struct WebSocketConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RealtimeConnection for WebSocketConnection {
    async fn recv(&mut self) -> PointfinderResult<Option<String>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        tracing::debug!(len = data.len(), "dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Pongs are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn ping(&mut self) -> PointfinderResult<()> {
        self.ws.send(Message::Ping(Vec::<u8>::new().into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> PointfinderResult<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DesiredSession {
        DesiredSession::new(Uuid::from_u128(1), "token-abc")
    }

    #[test]
    fn test_secure_base_uses_wss() {
        let connector = WebSocketConnector::new("https://pointfinder.pt", "/ws/mobile").unwrap();
        let url = connector.endpoint(&session()).unwrap();

        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("pointfinder.pt"));
        assert_eq!(url.port_or_known_default(), Some(443));
        assert_eq!(url.path(), "/ws/mobile");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("gameId".to_string(), Uuid::from_u128(1).to_string()),
                ("token".to_string(), "token-abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_plain_base_keeps_port_and_replaces_path() {
        let connector = WebSocketConnector::new("http://localhost:8080/api", "/ws/mobile").unwrap();
        let url = connector.endpoint(&session()).unwrap();

        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "/ws/mobile");
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(WebSocketConnector::new("not-a-url", "/ws/mobile").is_err());
        assert!(WebSocketConnector::new("mailto:ops@example.com", "/ws/mobile").is_err());
    }

    #[test]
    fn test_token_is_escaped_in_query() {
        let connector = WebSocketConnector::new("https://pointfinder.pt", "/ws/mobile").unwrap();
        let url = connector
            .endpoint(&DesiredSession::new(Uuid::nil(), "a+b/c=="))
            .unwrap();
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned());
        assert_eq!(token.as_deref(), Some("a+b/c=="));
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let printed = format!("{:?}", session());
        assert!(!printed.contains("token-abc"));
    }
}
