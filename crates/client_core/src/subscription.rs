//! `onCreateTalk` feed over the `graphql-transport-ws` protocol.

use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::{SinkExt, Stream, StreamExt};
use shared::{
    domain::Talk,
    error::ApiException,
    protocol::{
        ClientMessage, GraphqlRequest, GraphqlResponse, OnCreateTalkData, ServerMessage,
        GRAPHQL_TRANSPORT_WS,
    },
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::error::ClientError;

const CONNECTION_ACK_TIMEOUT: Duration = Duration::from_secs(10);
const FEED_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live stream of talks created by any client. Holding the feed keeps the
/// subscription open; [`TalkFeed::unsubscribe`] or dropping it releases the
/// subscription, and the release happens at most once.
pub struct TalkFeed {
    talks: ReceiverStream<Talk>,
    release: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TalkFeed {
    /// Builds a feed over an existing channel. `release` fires when the feed
    /// is unsubscribed or dropped.
    pub fn from_receiver(talks: mpsc::Receiver<Talk>, release: oneshot::Sender<()>) -> Self {
        Self {
            talks: ReceiverStream::new(talks),
            release: Some(release),
            task: None,
        }
    }

    /// Releases the subscription and waits for the socket task to send
    /// `complete` and close.
    pub async fn unsubscribe(mut self) {
        self.release_once();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(%err, "subscription task ended abnormally");
            }
        }
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
            self.talks.close();
        }
    }
}

impl Drop for TalkFeed {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl Stream for TalkFeed {
    type Item = Talk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Talk>> {
        Pin::new(&mut self.talks).poll_next(cx)
    }
}

pub(crate) async fn open_talk_feed(
    ws_url: &str,
    api_key: Option<&str>,
    subscription_id: String,
) -> Result<TalkFeed, ClientError> {
    let mut request = ws_url.into_client_request()?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static(GRAPHQL_TRANSPORT_WS),
    );
    let (mut ws, _) = connect_async(request).await?;

    send_frame(
        &mut ws,
        &ClientMessage::ConnectionInit {
            payload: api_key.map(|key| serde_json::json!({ "x-api-key": key })),
        },
    )
    .await?;
    tokio::time::timeout(CONNECTION_ACK_TIMEOUT, await_connection_ack(&mut ws))
        .await
        .map_err(|_| ClientError::Protocol("timed out waiting for connection_ack".into()))??;

    send_frame(
        &mut ws,
        &ClientMessage::Subscribe {
            id: subscription_id.clone(),
            payload: GraphqlRequest::on_create_talk(),
        },
    )
    .await?;
    info!(subscription_id = %subscription_id, "subscribed to onCreateTalk");

    let (talks_tx, talks_rx) = mpsc::channel(FEED_BUFFER);
    let (release_tx, release_rx) = oneshot::channel();
    let task = tokio::spawn(run_feed(ws, subscription_id, talks_tx, release_rx));

    Ok(TalkFeed {
        talks: ReceiverStream::new(talks_rx),
        release: Some(release_tx),
        task: Some(task),
    })
}

async fn send_frame(ws: &mut WsStream, frame: &ClientMessage) -> Result<(), ClientError> {
    let text = serde_json::to_string(frame)?;
    ws.send(Message::Text(text)).await?;
    Ok(())
}

async fn await_connection_ack(ws: &mut WsStream) -> Result<(), ClientError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text)? {
                ServerMessage::ConnectionAck { .. } => return Ok(()),
                ServerMessage::Ping { payload } => {
                    send_frame(ws, &ClientMessage::Pong { payload }).await?;
                }
                other => {
                    return Err(ClientError::Protocol(format!(
                        "expected connection_ack, got {other:?}"
                    )))
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(ClientError::Protocol(
        "socket closed before connection_ack".into(),
    ))
}

fn decode_talk(payload: GraphqlResponse<serde_json::Value>) -> Result<Talk, ClientError> {
    if !payload.errors.is_empty() {
        return Err(ApiException::from_graphql_errors(&payload.errors).into());
    }
    let data = payload.data.ok_or(ClientError::MissingData {
        operation: "onCreateTalk",
    })?;
    let data: OnCreateTalkData = serde_json::from_value(data)?;
    Ok(data.on_create_talk)
}

async fn run_feed(
    ws: WsStream,
    subscription_id: String,
    talks: mpsc::Sender<Talk>,
    mut release: oneshot::Receiver<()>,
) {
    let (mut writer, mut reader) = ws.split();

    loop {
        tokio::select! {
            _ = &mut release => {
                let complete = ClientMessage::Complete { id: subscription_id.clone() };
                if let Ok(text) = serde_json::to_string(&complete) {
                    let _ = writer.send(Message::Text(text)).await;
                }
                let _ = writer.close().await;
                info!(subscription_id = %subscription_id, "released onCreateTalk subscription");
                return;
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::Next { id, payload }) if id == subscription_id => {
                        match decode_talk(payload) {
                            Ok(talk) => {
                                if talks.send(talk).await.is_err() {
                                    debug!("feed receiver closed; awaiting release");
                                }
                            }
                            Err(err) => warn!(%err, "dropping undecodable onCreateTalk event"),
                        }
                    }
                    Ok(ServerMessage::Ping { payload }) => {
                        let pong = ClientMessage::Pong { payload };
                        if let Ok(text) = serde_json::to_string(&pong) {
                            if writer.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(ServerMessage::Error { id, payload }) if id == subscription_id => {
                        let err = ApiException::from_graphql_errors(&payload);
                        warn!(%err, "subscription rejected by server");
                        break;
                    }
                    Ok(ServerMessage::Complete { id }) if id == subscription_id => {
                        info!(subscription_id = %id, "server completed subscription");
                        break;
                    }
                    Ok(other) => debug!(?other, "ignoring subscription frame"),
                    Err(err) => warn!(%err, "invalid subscription frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "websocket receive failed");
                    break;
                }
            }
        }
    }

    debug!(subscription_id = %subscription_id, "onCreateTalk feed ended");
}
