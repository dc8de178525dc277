//! Bulk-write wire format.
//!
//! A bulk payload is newline-delimited JSON: for each profile, one
//! write-intent line followed by the serialized profile, in record order.
//! Every line, including the last, ends with `\n`.
//!
//! ```text
//! {"index":{"_index":"users","_id":"3f1c..."}}
//! {"id":"3f1c...","name":"...","interests":["music","travel"],...}
//! ```
//!
//! The write intent carries the profile id as the document id so a retried
//! batch overwrites instead of duplicating, and so similarity queries can
//! reference a subject by its own id.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::types::UserProfile;

#[derive(Debug, Serialize, Deserialize)]
struct WriteIntent {
    index: IntentTarget,
}

#[derive(Debug, Serialize, Deserialize)]
struct IntentTarget {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
}

/// An encoded bulk request body for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPayload {
    body: String,
    documents: usize,
}

impl BulkPayload {
    /// Encode `profiles` as write intents against `collection`.
    pub fn encode(collection: &str, profiles: &[UserProfile]) -> Result<Self, serde_json::Error> {
        let mut body = String::with_capacity(profiles.len() * 256);
        for profile in profiles {
            let intent = WriteIntent {
                index: IntentTarget {
                    index: collection.to_string(),
                    id: profile.id.clone(),
                },
            };
            body.push_str(&serde_json::to_string(&intent)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(profile)?);
            body.push('\n');
        }

        Ok(Self {
            body,
            documents: profiles.len(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of documents carried (half the number of lines).
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Decode the payload back into `(collection, profile)` pairs.
    ///
    /// Used by in-process stores; a real backend parses the body itself.
    pub fn decode(&self) -> StoreResult<Vec<(String, UserProfile)>> {
        let mut lines = self.body.lines();
        let mut decoded = Vec::with_capacity(self.documents);

        while let Some(intent_line) = lines.next() {
            let intent: WriteIntent = serde_json::from_str(intent_line)?;
            let source = lines.next().ok_or_else(|| {
                StoreError::UnexpectedShape("write intent without a document line".to_string())
            })?;
            let profile: UserProfile = serde_json::from_str(source)?;
            if profile.id != intent.index.id {
                return Err(StoreError::UnexpectedShape(format!(
                    "intent id '{}' does not match document id '{}'",
                    intent.index.id, profile.id
                )));
            }
            decoded.push((intent.index.index, profile));
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            interests: vec!["music".into(), "travel".into()],
            hobbies: vec!["books".into()],
            age: 25,
            address: "12 Elm Street".into(),
            gender: None,
            status: None,
            photo: None,
        }
    }

    #[test]
    fn test_encode_emits_intent_then_document_per_profile() {
        let payload = BulkPayload::encode("users", &[profile("a"), profile("b")]).unwrap();
        let lines: Vec<&str> = payload.body().lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(payload.documents(), 2);
        assert_eq!(lines[0], r#"{"index":{"_index":"users","_id":"a"}}"#);
        assert!(lines[1].contains(r#""id":"a""#));
        assert_eq!(lines[2], r#"{"index":{"_index":"users","_id":"b"}}"#);
        assert!(lines[3].contains(r#""id":"b""#));
        assert!(payload.body().ends_with('\n'));
    }

    #[test]
    fn test_decode_preserves_order() {
        let profiles = vec![profile("x"), profile("y"), profile("z")];
        let payload = BulkPayload::encode("users", &profiles).unwrap();
        let decoded = payload.decode().unwrap();

        let ids: Vec<&str> = decoded.iter().map(|(_, p)| p.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert!(decoded.iter().all(|(c, _)| c == "users"));
    }

    #[test]
    fn test_empty_batch_encodes_to_empty_body() {
        let payload = BulkPayload::encode("users", &[]).unwrap();
        assert!(payload.body().is_empty());
        assert!(payload.decode().unwrap().is_empty());
    }
}
