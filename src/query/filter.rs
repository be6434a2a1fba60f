//! Filter/sort/offset query codec
//!
//! The search route keeps its state in the URL. `encode` rewrites an
//! existing query string in place: recognized keys with a real value are set
//! (overwriting, first position wins), sentinel values ("all" or empty,
//! meaning "no constraint") delete the key, and unrecognized keys pass
//! through untouched so the route's other parameters survive a form submit.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// The recognized query keys, a contract with the backend search endpoint
const KEYS: [&str; 9] = [
    "school_class",
    "condition",
    "publisher",
    "subject",
    "author",
    "min_price",
    "max_price",
    "sort",
    "offset",
];

/// A value meaning "apply no constraint"; never serialized
fn is_sentinel(value: &str) -> bool {
    value.is_empty() || value == "all"
}

/// Structured filter/sort/pagination state for the search route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Grade filter; enum-like, defaults to "all"
    pub school_class: String,
    /// Condition filter; enum-like, defaults to "all"
    pub condition: String,
    pub publisher: String,
    pub subject: String,
    pub author: String,
    pub min_price: String,
    pub max_price: String,
    pub sort: String,
    /// Result offset as a string, as it travels in the URL
    pub offset: String,
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            school_class: "all".to_string(),
            condition: "all".to_string(),
            publisher: String::new(),
            subject: String::new(),
            author: String::new(),
            min_price: String::new(),
            max_price: String::new(),
            sort: String::new(),
            offset: String::new(),
        }
    }
}

impl FilterQuery {
    fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("school_class", &self.school_class),
            ("condition", &self.condition),
            ("publisher", &self.publisher),
            ("subject", &self.subject),
            ("author", &self.author),
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
            ("sort", &self.sort),
            ("offset", &self.offset),
        ]
    }

    /// Parse a query string; missing keys fall back to their defaults,
    /// the last occurrence of a repeated key wins.
    pub fn decode(query: &str) -> Self {
        let mut state = Self::default();
        let query = query.trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match &*key {
                "school_class" => state.school_class = value,
                "condition" => state.condition = value,
                "publisher" => state.publisher = value,
                "subject" => state.subject = value,
                "author" => state.author = value,
                "min_price" => state.min_price = value,
                "max_price" => state.max_price = value,
                "sort" => state.sort = value,
                "offset" => state.offset = value,
                _ => {}
            }
        }
        state
    }

    /// Rewrite `current_query` with this state.
    ///
    /// Keys carrying a sentinel value are removed rather than left stale;
    /// set keys keep their original position; keys outside [`KEYS`] are
    /// preserved unchanged.
    pub fn encode(&self, current_query: &str) -> String {
        let current_query = current_query.trim_start_matches('?');
        let mut pairs: Vec<(String, String)> = form_urlencoded::parse(current_query.as_bytes())
            .into_owned()
            .collect();

        for (key, value) in self.entries() {
            if is_sentinel(value) {
                pairs.retain(|(k, _)| k != key);
            } else if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                pairs[pos].1 = value.to_string();
                // Collapse any repeated occurrences after the first
                let mut index = pos + 1;
                while index < pairs.len() {
                    if pairs[index].0 == key {
                        pairs.remove(index);
                    } else {
                        index += 1;
                    }
                }
            } else {
                pairs.push((key.to_string(), value.to_string()));
            }
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Whether any recognized key carries a real value
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, v)| is_sentinel(v))
    }
}
