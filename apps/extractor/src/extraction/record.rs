use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// A finalized, template-shaped extraction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub document_id: Uuid,
    /// The enforced `ResumeParserData` object.
    pub resume_data: Value,
}

/// Result of processing one document.
///
/// `Unreadable` serializes as `{}` so it stays distinguishable from a sparse
/// record, which always carries the template's defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Parsed(ParsedDocument),
    Unreadable,
}

impl ExtractionOutcome {
    pub fn is_unreadable(&self) -> bool {
        matches!(self, ExtractionOutcome::Unreadable)
    }

    pub fn parsed(&self) -> Option<&ParsedDocument> {
        match self {
            ExtractionOutcome::Parsed(doc) => Some(doc),
            ExtractionOutcome::Unreadable => None,
        }
    }

    /// Artifact body: two-space indented JSON.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for ExtractionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExtractionOutcome::Parsed(doc) => doc.serialize(serializer),
            ExtractionOutcome::Unreadable => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unreadable_serializes_as_empty_object() {
        assert_eq!(ExtractionOutcome::Unreadable.to_pretty_json().unwrap(), "{}");
    }

    #[test]
    fn test_parsed_serializes_with_id_then_data() {
        let id = Uuid::new_v4();
        let outcome = ExtractionOutcome::Parsed(ParsedDocument {
            document_id: id,
            resume_data: json!({"Hobbies": "chess"}),
        });

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"document_id": id.to_string(), "resume_data": {"Hobbies": "chess"}})
        );

        let text = outcome.to_pretty_json().unwrap();
        assert!(text.find("document_id").unwrap() < text.find("resume_data").unwrap());
        assert!(text.contains("\n  \"resume_data\""));
    }
}
