//! GraphQL documents, HTTP envelopes and the `graphql-transport-ws` frames.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Talk, TalkInput},
    error::GraphqlError,
};

pub const LIST_TALKS: &str = "query ListTalks {
  listTalks {
    items {
      clientId
      name
      description
      speakerName
      speakerBio
    }
  }
}";

pub const CREATE_TALK: &str = "mutation CreateTalk($input: CreateTalkInput!) {
  createTalk(input: $input) {
    clientId
    name
    description
    speakerName
    speakerBio
  }
}";

pub const ON_CREATE_TALK: &str = "subscription OnCreateTalk {
  onCreateTalk {
    clientId
    name
    description
    speakerName
    speakerBio
  }
}";

/// Sub-protocol name sent in the websocket handshake.
pub const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphqlRequest {
    pub fn new(query: &str, operation_name: &str) -> Self {
        Self {
            query: query.to_string(),
            operation_name: Some(operation_name.to_string()),
            variables: None,
        }
    }

    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn list_talks() -> Self {
        Self::new(LIST_TALKS, "ListTalks")
    }

    pub fn create_talk(input: &TalkInput) -> Self {
        Self::new(CREATE_TALK, "CreateTalk")
            .with_variables(serde_json::json!({ "input": input }))
    }

    pub fn on_create_talk() -> Self {
        Self::new(ON_CREATE_TALK, "OnCreateTalk")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkConnection {
    pub items: Vec<Talk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTalksData {
    pub list_talks: TalkConnection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTalkData {
    pub create_talk: Talk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnCreateTalkData {
    pub on_create_talk: Talk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Subscribe {
        id: String,
        payload: GraphqlRequest,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Next {
        id: String,
        payload: GraphqlResponse<serde_json::Value>,
    },
    Error {
        id: String,
        payload: Vec<GraphqlError>,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_talk_request_wraps_input_variable() {
        let input = TalkInput {
            name: "A".into(),
            description: "B".into(),
            speaker_name: "C".into(),
            speaker_bio: "D".into(),
            client_id: "cid".into(),
        };
        let request = GraphqlRequest::create_talk(&input);
        let value = serde_json::to_value(&request).expect("json");
        assert_eq!(value["operationName"], "CreateTalk");
        assert_eq!(value["variables"]["input"]["speakerName"], "C");
        assert_eq!(value["variables"]["input"]["clientId"], "cid");
    }

    #[test]
    fn list_talks_response_decodes_items_in_order() {
        let body = serde_json::json!({
            "data": { "listTalks": { "items": [
                { "name": "T1", "description": "d1", "speakerName": "s1", "speakerBio": "b1", "clientId": "x" },
                { "name": "T2", "description": "d2", "speakerName": "s2", "speakerBio": "b2", "clientId": "y" }
            ], "nextToken": null } }
        });
        let response: GraphqlResponse<ListTalksData> =
            serde_json::from_value(body).expect("decode");
        let names: Vec<_> = response
            .data
            .expect("data")
            .list_talks
            .items
            .into_iter()
            .map(|talk| talk.name)
            .collect();
        assert_eq!(names, vec!["T1", "T2"]);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn list_talks_keeps_items_with_null_client_id() {
        let body = serde_json::json!({
            "data": { "listTalks": { "items": [
                { "name": "T1", "description": "d1", "speakerName": "s1", "speakerBio": "b1", "clientId": "x" },
                { "name": "T2", "description": "d2", "speakerName": "s2", "speakerBio": "b2", "clientId": null }
            ] } }
        });
        let response: GraphqlResponse<ListTalksData> =
            serde_json::from_value(body).expect("decode");
        let items = response.data.expect("data").list_talks.items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].client_id, "x");
        assert_eq!(items[1].name, "T2");
        assert_eq!(items[1].client_id, "");
    }

    #[test]
    fn ws_frames_use_protocol_type_tags() {
        let init = serde_json::to_value(ClientMessage::ConnectionInit { payload: None })
            .expect("json");
        assert_eq!(init, serde_json::json!({ "type": "connection_init" }));

        let frame: ServerMessage = serde_json::from_str(
            r#"{"type":"next","id":"1","payload":{"data":{"onCreateTalk":{"name":"n"}}}}"#,
        )
        .expect("decode");
        match frame {
            ServerMessage::Next { id, payload } => {
                assert_eq!(id, "1");
                assert!(payload.data.is_some());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
