/// Derives the ordered progress narration for a search query.
pub trait StageSelector: Send + Sync {
    fn select(&self, query: &str) -> Vec<String>;
}

struct KeywordGroup {
    keywords: &'static [&'static str],
    stages: &'static [&'static str],
}

// Matched against the lowercased query as plain substrings, in this order.
const GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        keywords: &["nearby", "close", "distance", "location"],
        stages: &[
            "Identifying location requirements...",
            "Searching properties by location...",
            "Calculating distances to amenities...",
        ],
    },
    KeywordGroup {
        keywords: &["price", "cost", "budget", "affordable", "cheap", "expensive"],
        stages: &["Filtering by price range...", "Analyzing property values..."],
    },
    KeywordGroup {
        keywords: &["bedroom", "bathroom", "room", "size", "square"],
        stages: &[
            "Matching property specifications...",
            "Filtering by size requirements...",
        ],
    },
    KeywordGroup {
        keywords: &["school", "education", "university", "college"],
        stages: &["Finding nearby schools...", "Gathering school ratings..."],
    },
    KeywordGroup {
        keywords: &["park", "mall", "shopping", "restaurant", "amenity"],
        stages: &[
            "Searching nearby amenities...",
            "Enriching with landmark data...",
        ],
    },
];

const FALLBACK: &[&str] = &[
    "Searching property database...",
    "Filtering results by criteria...",
    "Ranking properties by relevance...",
    "Enriching with additional data...",
];

/// Keyword heuristic over the query text. Always opens with an
/// `Analyzing your search` stage; falls back to a generic list when no
/// keyword group matches.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordStageSelector;

impl StageSelector for KeywordStageSelector {
    fn select(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut stages = vec![format!("Analyzing your search: '{query}'")];

        for group in GROUPS {
            if group.keywords.iter().any(|k| lowered.contains(k)) {
                stages.extend(group.stages.iter().map(|s| s.to_string()));
            }
        }

        if stages.len() == 1 {
            stages.extend(FALLBACK.iter().map(|s| s.to_string()));
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homes_near_me_uses_fallback() {
        let stages = KeywordStageSelector.select("homes near me");
        assert_eq!(
            stages,
            vec![
                "Analyzing your search: 'homes near me'",
                "Searching property database...",
                "Filtering results by criteria...",
                "Ranking properties by relevance...",
                "Enriching with additional data...",
            ]
        );
    }

    #[test]
    fn price_query_adds_price_stages() {
        let stages = KeywordStageSelector.select("What is the price of condos?");
        assert_eq!(stages[0], "Analyzing your search: 'What is the price of condos?'");
        assert_eq!(
            &stages[1..],
            &["Filtering by price range...", "Analyzing property values..."]
        );
    }

    #[test]
    fn groups_keep_fixed_order() {
        let stages = KeywordStageSelector.select("Cheap 3 BEDROOM house close to a good school");
        assert_eq!(
            &stages[1..],
            &[
                "Identifying location requirements...",
                "Searching properties by location...",
                "Calculating distances to amenities...",
                "Filtering by price range...",
                "Analyzing property values...",
                "Matching property specifications...",
                "Filtering by size requirements...",
                "Finding nearby schools...",
                "Gathering school ratings...",
            ]
        );
    }

    #[test]
    fn query_text_is_kept_verbatim_in_first_stage() {
        let stages = KeywordStageSelector.select("Parks & Malls");
        assert_eq!(stages[0], "Analyzing your search: 'Parks & Malls'");
        assert_eq!(stages.len(), 3);
    }

    #[test]
    fn empty_query_still_has_stages() {
        let stages = KeywordStageSelector.select("");
        assert_eq!(stages[0], "Analyzing your search: ''");
        assert_eq!(stages.len(), 5);
    }
}
