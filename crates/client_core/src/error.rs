use shared::error::ApiException;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graphql error: {0}")]
    Graphql(#[from] ApiException),
    #[error("graphql response for {operation} carried no data")]
    MissingData { operation: &'static str },
    #[error("websocket failure: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("subscription protocol violation: {0}")]
    Protocol(String),
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(value))
    }
}
