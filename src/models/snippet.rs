use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ShareError;

/// A snippet as published behind a shareable link.
///
/// Built only through [`SharedSnippet::from_record`], so every instance has its
/// required fields present and well typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSnippet {
    pub id: String,
    pub shareable_link: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub code: String,
    pub language: SnippetLanguage,
    pub is_public: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_counter")]
    pub views: u64,
    #[serde(default, deserialize_with = "deserialize_counter")]
    pub likes: u64,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default, rename = "creatorPhotoURL")]
    pub creator_photo_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Untyped record as returned by a snippet store.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetRecord(pub serde_json::Value);

impl From<&SharedSnippet> for SnippetRecord {
    fn from(snippet: &SharedSnippet) -> Self {
        // Serializing a plain struct of strings, numbers and timestamps cannot fail.
        SnippetRecord(serde_json::to_value(snippet).unwrap_or(serde_json::Value::Null))
    }
}

impl SnippetRecord {
    /// Whether the raw record is flagged public. Anything other than a literal
    /// `true` counts as private, so visibility is known before validation.
    pub fn is_public(&self) -> bool {
        self.0.get("isPublic").and_then(serde_json::Value::as_bool) == Some(true)
    }
}

impl SharedSnippet {
    /// Validate a raw store record.
    pub fn from_record(record: SnippetRecord) -> Result<Self, ShareError> {
        let snippet: SharedSnippet = serde_json::from_value(record.0)
            .map_err(|e| ShareError::MalformedRecord(e.to_string()))?;

        if snippet.id.trim().is_empty() {
            return Err(ShareError::MalformedRecord("empty id".to_string()));
        }
        if snippet.shareable_link.trim().is_empty() {
            return Err(ShareError::MalformedRecord(
                "empty shareableLink".to_string(),
            ));
        }

        Ok(snippet)
    }

    pub fn creator_display_name(&self) -> &str {
        self.creator_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Anonymous User")
    }

    /// Avatar fallback letter used when there is no usable photo.
    pub fn creator_initial(&self) -> char {
        self.creator_name
            .as_deref()
            .and_then(|name| name.chars().next())
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }

    /// Route of the creator's public profile.
    pub fn profile_route(&self) -> Option<String> {
        self.creator_username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.user_id.as_deref().filter(|s| !s.is_empty()))
            .map(|handle| format!("/{}", handle))
    }

    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match WireTimestamp::deserialize(deserializer)? {
        WireTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
        WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("bad timestamp '{}': {}", text, e))),
    }
}

// A null counter reads as zero; a negative one is rejected by u64.
fn deserialize_counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SnippetLanguage {
    Rust,
    JavaScript,
    TypeScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    PHP,
    Ruby,
    Swift,
    Kotlin,
    HTML,
    CSS,
    SQL,
    Bash,
    Yaml,
    Json,
    Markdown,
    Text,
    Other(String),
}

impl SnippetLanguage {
    /// Parse a language name the way the editor stores it ("python", "c++", "cpp", ...).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "rust" | "rs" => SnippetLanguage::Rust,
            "javascript" | "js" | "node" => SnippetLanguage::JavaScript,
            "typescript" | "ts" => SnippetLanguage::TypeScript,
            "python" | "python3" | "py" => SnippetLanguage::Python,
            "go" | "golang" => SnippetLanguage::Go,
            "java" => SnippetLanguage::Java,
            "c" => SnippetLanguage::C,
            "cpp" | "c++" | "cxx" => SnippetLanguage::Cpp,
            "csharp" | "c#" | "cs" => SnippetLanguage::CSharp,
            "php" => SnippetLanguage::PHP,
            "ruby" | "rb" => SnippetLanguage::Ruby,
            "swift" => SnippetLanguage::Swift,
            "kotlin" | "kt" => SnippetLanguage::Kotlin,
            "html" => SnippetLanguage::HTML,
            "css" => SnippetLanguage::CSS,
            "sql" => SnippetLanguage::SQL,
            "bash" | "sh" | "shell" => SnippetLanguage::Bash,
            "yaml" | "yml" => SnippetLanguage::Yaml,
            "json" => SnippetLanguage::Json,
            "markdown" | "md" => SnippetLanguage::Markdown,
            "text" | "plaintext" | "txt" | "" => SnippetLanguage::Text,
            _ => SnippetLanguage::Other(name.trim().to_string()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SnippetLanguage::Rust => "Rust",
            SnippetLanguage::JavaScript => "JavaScript",
            SnippetLanguage::TypeScript => "TypeScript",
            SnippetLanguage::Python => "Python",
            SnippetLanguage::Go => "Go",
            SnippetLanguage::Java => "Java",
            SnippetLanguage::C => "C",
            SnippetLanguage::Cpp => "C++",
            SnippetLanguage::CSharp => "C#",
            SnippetLanguage::PHP => "PHP",
            SnippetLanguage::Ruby => "Ruby",
            SnippetLanguage::Swift => "Swift",
            SnippetLanguage::Kotlin => "Kotlin",
            SnippetLanguage::HTML => "HTML",
            SnippetLanguage::CSS => "CSS",
            SnippetLanguage::SQL => "SQL",
            SnippetLanguage::Bash => "Bash",
            SnippetLanguage::Yaml => "YAML",
            SnippetLanguage::Json => "JSON",
            SnippetLanguage::Markdown => "Markdown",
            SnippetLanguage::Text => "Text",
            SnippetLanguage::Other(name) => name,
        }
    }

    /// Name of the matching syntect syntax definition.
    pub fn syntax_name(&self) -> &'static str {
        match self {
            SnippetLanguage::Rust => "Rust",
            SnippetLanguage::JavaScript => "JavaScript",
            SnippetLanguage::TypeScript => "TypeScript",
            SnippetLanguage::Python => "Python",
            SnippetLanguage::Go => "Go",
            SnippetLanguage::Java => "Java",
            SnippetLanguage::C => "C",
            SnippetLanguage::Cpp => "C++",
            SnippetLanguage::CSharp => "C#",
            SnippetLanguage::PHP => "PHP",
            SnippetLanguage::Ruby => "Ruby",
            SnippetLanguage::HTML => "HTML",
            SnippetLanguage::CSS => "CSS",
            SnippetLanguage::SQL => "SQL",
            SnippetLanguage::Bash => "Bourne Again Shell (bash)",
            SnippetLanguage::Yaml => "YAML",
            SnippetLanguage::Json => "JSON",
            SnippetLanguage::Markdown => "Markdown",
            _ => "Plain Text",
        }
    }
}

impl From<String> for SnippetLanguage {
    fn from(name: String) -> Self {
        SnippetLanguage::from_name(&name)
    }
}

impl From<SnippetLanguage> for String {
    fn from(language: SnippetLanguage) -> Self {
        match language {
            SnippetLanguage::Other(name) => name,
            SnippetLanguage::Cpp => "cpp".to_string(),
            SnippetLanguage::CSharp => "csharp".to_string(),
            known => known.display_name().to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({
            "id": "snip-1",
            "shareableLink": "abc123",
            "title": "Quick sort",
            "description": "In-place quick sort",
            "code": "def qs(xs):\n    return xs\n",
            "language": "python",
            "isPublic": true,
            "createdAt": "2025-03-01T10:00:00Z",
            "updatedAt": 1740823200000i64,
            "views": 5,
            "likes": 2,
            "creatorName": "ada",
            "userId": "u-42"
        })
    }

    #[test]
    fn parses_a_complete_record() {
        let snippet = SharedSnippet::from_record(SnippetRecord(record())).unwrap();
        assert_eq!(snippet.id, "snip-1");
        assert_eq!(snippet.language, SnippetLanguage::Python);
        assert_eq!(snippet.views, 5);
        assert_eq!(snippet.updated_at.timestamp_millis(), 1740823200000);
        assert_eq!(snippet.line_count(), 2);
    }

    #[test]
    fn missing_counters_read_as_zero() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("views");
        raw["likes"] = serde_json::Value::Null;
        let snippet = SharedSnippet::from_record(SnippetRecord(raw)).unwrap();
        assert_eq!((snippet.views, snippet.likes), (0, 0));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("isPublic");
        let err = SharedSnippet::from_record(SnippetRecord(raw)).unwrap_err();
        assert!(matches!(err, ShareError::MalformedRecord(msg) if msg.contains("isPublic")));
    }

    #[test]
    fn negative_counter_is_malformed() {
        let mut raw = record();
        raw["views"] = json!(-3);
        assert!(matches!(
            SharedSnippet::from_record(SnippetRecord(raw)),
            Err(ShareError::MalformedRecord(_))
        ));
    }

    #[test]
    fn visibility_is_read_from_the_raw_record() {
        assert!(SnippetRecord(record()).is_public());
        assert!(!SnippetRecord(json!({"isPublic": false})).is_public());
        assert!(!SnippetRecord(json!({"isPublic": null})).is_public());
        assert!(!SnippetRecord(json!({"id": "x"})).is_public());
    }

    #[test]
    fn blank_id_is_malformed() {
        let mut raw = record();
        raw["id"] = json!("  ");
        assert!(SharedSnippet::from_record(SnippetRecord(raw)).is_err());
    }

    #[test]
    fn attribution_fallbacks() {
        let mut snippet = SharedSnippet::from_record(SnippetRecord(record())).unwrap();
        assert_eq!(snippet.creator_display_name(), "ada");
        assert_eq!(snippet.creator_initial(), 'A');
        assert_eq!(snippet.profile_route().as_deref(), Some("/u-42"));

        snippet.creator_name = None;
        snippet.creator_username = Some("lovelace".into());
        assert_eq!(snippet.creator_display_name(), "Anonymous User");
        assert_eq!(snippet.creator_initial(), 'U');
        assert_eq!(snippet.profile_route().as_deref(), Some("/lovelace"));
    }

    #[test]
    fn record_round_trips_through_the_wire_shape() {
        let snippet = SharedSnippet::from_record(SnippetRecord(record())).unwrap();
        let again = SharedSnippet::from_record(SnippetRecord::from(&snippet)).unwrap();
        assert_eq!(snippet, again);
    }
}
