use conduit_core::ChatRequest;

/// Produces the full answer text for a chat request. The token source
/// splits it into words and paces them.
pub trait ChatResponder: Send + Sync {
    fn answer(&self, request: &ChatRequest) -> String;
}

/// Canned property-assistant reply built around the lowercased question.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateResponder;

impl ChatResponder for TemplateResponder {
    fn answer(&self, request: &ChatRequest) -> String {
        format!(
            "Based on the property details you've shared, {}. \
             This property features excellent amenities and is located in a prime area. \
             The neighborhood offers great schools, shopping centers, and easy access to public transportation. \
             The property has been well-maintained and represents excellent value for the price. \
             Would you like to know more about any specific aspect of this property?",
            request.user_question.to_lowercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn answer_embeds_lowercased_question() {
        let request = ChatRequest {
            property_details: Map::new(),
            user_question: "Tell me about this property".into(),
            chat_history: Vec::new(),
        };
        let answer = TemplateResponder.answer(&request);
        assert!(answer.starts_with(
            "Based on the property details you've shared, tell me about this property. This property"
        ));
        assert!(answer.ends_with("any specific aspect of this property?"));
        assert!(!answer.contains("  "));
    }
}
