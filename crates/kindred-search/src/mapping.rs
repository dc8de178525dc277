//! Index mapping applied when the profile index is created.

use serde_json::{json, Value};

/// Keyword fields for exact lookups, text fields for term similarity.
/// `photo` is stored but not indexed.
pub fn profile_index_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "name": {"type": "text"},
                "email": {"type": "keyword"},
                "interests": {"type": "text"},
                "hobbies": {"type": "text"},
                "age": {"type": "integer"},
                "address": {"type": "text"},
                "gender": {"type": "keyword"},
                "status": {"type": "keyword"},
                "photo": {"type": "keyword", "index": false}
            }
        }
    })
}
