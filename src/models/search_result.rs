// file: src/models/search_result.rs
// description: typed view over Elasticsearch search hits for display
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/search-search.html

use serde_json::Value;

/// One hit from a search response. The library API returns the engine's
/// response unmodified; this view only exists so the CLI can render results.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub index: String,
    pub score: Option<f64>,
    pub source: Value,
}

impl SearchHit {
    /// Extracts the hits from a raw `_search` response. Responses without a
    /// `hits.hits` array yield an empty list.
    pub fn from_response(response: &Value) -> Vec<SearchHit> {
        let Some(hits) = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        hits.iter()
            .map(|hit| SearchHit {
                id: hit["_id"].as_str().unwrap_or_default().to_string(),
                index: hit["_index"].as_str().unwrap_or_default().to_string(),
                score: hit["_score"].as_f64(),
                source: hit.get("_source").cloned().unwrap_or(Value::Null),
            })
            .collect()
    }

    /// Total hit count reported by the engine, when present.
    pub fn total(response: &Value) -> Option<u64> {
        response.pointer("/hits/total/value").and_then(Value::as_u64)
    }

    /// Format as a summary string for display. Truncation counts characters,
    /// not bytes, so multibyte text never splits mid-character.
    pub fn format_summary(&self, text_field: &str, max_content_len: usize) -> String {
        let content = self.source[text_field].as_str().unwrap_or("");
        let preview = match content.char_indices().nth(max_content_len) {
            Some((cut, _)) => format!("{}...", &content[..cut]),
            None => content.to_string(),
        };

        match self.score {
            Some(score) => format!("Score: {:.4} | {}\n{}\n", score, self.id, preview),
            None => format!("{}\n{}\n", self.id, preview),
        }
    }
}
