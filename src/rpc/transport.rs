use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// One logical channel carrying the text frames of a single request.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<()>;
    /// Next inbound text frame. `None` means the channel ended.
    async fn recv(&mut self) -> Option<Result<String>>;
    async fn close(&mut self);
}

/// Opens a fresh channel per request. Integration tests substitute a
/// scripted implementation here.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Box<dyn Transport>>;
}

pub struct WsDialer {
    url: Url,
}

impl WsDialer {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self { url: Url::parse(url)? })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        Ok(Box::new(WsTransport { inner: ws }))
    }
}

pub struct WsTransport {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.inner.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite; binary frames are
                // not part of this protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
