use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of the origin's search route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub question: String,
}

/// Query string of the relay's search route (`?query=...`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

impl From<SearchQuery> for SearchRequest {
    fn from(q: SearchQuery) -> Self {
        Self { question: q.query }
    }
}

/// Body of the chat routes on both the origin and the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub property_details: Map<String, Value>,
    pub user_question: String,
    #[serde(default)]
    pub chat_history: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_history_defaults_to_empty() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"property_details":{"address":"123 Main Street"},"user_question":"Is it quiet?"}"#,
        )
        .unwrap();
        assert!(req.chat_history.is_empty());
        assert_eq!(req.property_details["address"], "123 Main Street");
    }

    #[test]
    fn search_query_converts() {
        let req = SearchRequest::from(SearchQuery {
            query: "homes near me".into(),
        });
        assert_eq!(req.question, "homes near me");
    }
}
