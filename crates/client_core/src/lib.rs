use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Talk, TalkInput},
    error::ApiException,
    protocol::{CreateTalkData, GraphqlRequest, GraphqlResponse, ListTalksData},
};
use tracing::{debug, info};
use url::Url;

pub mod error;
mod subscription;

pub use error::ClientError;
pub use subscription::TalkFeed;

const API_KEY_HEADER: &str = "x-api-key";

/// The three backend operations the talk list depends on.
#[async_trait]
pub trait TalkApi: Send + Sync {
    async fn list_talks(&self) -> Result<Vec<Talk>>;
    async fn create_talk(&self, input: TalkInput) -> Result<Talk>;
    async fn subscribe_on_create_talk(&self) -> Result<TalkFeed>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub ws_endpoint: Option<String>,
    pub api_key: Option<String>,
}

pub struct GraphqlTalkClient {
    http: Client,
    endpoint: Url,
    ws_endpoint: Url,
    api_key: Option<String>,
    next_subscription_id: AtomicU64,
}

impl GraphqlTalkClient {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ClientError> {
        let endpoint = parse_endpoint(&config.endpoint, &["http", "https"])?;
        let ws_endpoint = match &config.ws_endpoint {
            Some(raw) => parse_endpoint(raw, &["ws", "wss"])?,
            None => websocket_url(&endpoint)?,
        };
        Ok(Self {
            http: Client::new(),
            endpoint,
            ws_endpoint,
            api_key: config.api_key,
            next_subscription_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn ws_endpoint(&self) -> &Url {
        &self.ws_endpoint
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: &GraphqlRequest,
        operation: &'static str,
    ) -> std::result::Result<T, ClientError> {
        let mut builder = self.http.post(self.endpoint.clone()).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, api_key);
        }
        let response: GraphqlResponse<T> = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.errors.is_empty() {
            return Err(ApiException::from_graphql_errors(&response.errors).into());
        }
        response.data.ok_or(ClientError::MissingData { operation })
    }
}

#[async_trait]
impl TalkApi for GraphqlTalkClient {
    async fn list_talks(&self) -> Result<Vec<Talk>> {
        let data: ListTalksData = self
            .execute(&GraphqlRequest::list_talks(), "listTalks")
            .await?;
        let talks = data.list_talks.items;
        debug!(count = talks.len(), "listTalks returned");
        Ok(talks)
    }

    async fn create_talk(&self, input: TalkInput) -> Result<Talk> {
        let data: CreateTalkData = self
            .execute(&GraphqlRequest::create_talk(&input), "createTalk")
            .await?;
        info!(name = %data.create_talk.name, "talk created");
        Ok(data.create_talk)
    }

    async fn subscribe_on_create_talk(&self) -> Result<TalkFeed> {
        let subscription_id = self
            .next_subscription_id
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let feed = subscription::open_talk_feed(
            self.ws_endpoint.as_str(),
            self.api_key.as_deref(),
            subscription_id,
        )
        .await?;
        Ok(feed)
    }
}

fn parse_endpoint(raw: &str, schemes: &[&str]) -> std::result::Result<Url, ClientError> {
    let url = Url::parse(raw.trim()).map_err(|err| ClientError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ClientError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: format!("scheme must be one of {}", schemes.join(", ")),
        });
    }
    Ok(url)
}

/// Derives the subscription socket URL from the HTTP endpoint by swapping
/// `http`/`https` for `ws`/`wss`; path and query are kept.
pub fn websocket_url(endpoint: &Url) -> std::result::Result<Url, ClientError> {
    let scheme = match endpoint.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ClientError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: format!("cannot derive websocket url from scheme {other}"),
            })
        }
    };
    let mut ws_url = endpoint.clone();
    ws_url
        .set_scheme(scheme)
        .map_err(|_| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "failed to rewrite scheme".into(),
        })?;
    Ok(ws_url)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
