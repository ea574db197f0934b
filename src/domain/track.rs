use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Catalog identifier of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represent a quiz question: a track whose title has to be guessed.
///
/// Immutable once fetched from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    /// canonical answer
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Track {
    pub fn new(id: &str, name: &str, artist: &str, preview_url: Option<&str>) -> Self {
        Self {
            id: TrackId(id.to_string()),
            name: name.to_string(),
            artist: artist.to_string(),
            preview_url: preview_url.map(str::to_string),
        }
    }

    pub fn has_preview(&self) -> bool {
        self.preview_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_json_uses_camel_case_preview_url() -> anyhow::Result<()> {
        let json = r#"{"id":"t1","name":"Dynamite","artist":"BTS","previewUrl":"https://p/1.mp3"}"#;

        let track: Track = serde_json::from_str(json)?;

        assert_eq!(track.id, TrackId("t1".to_string()));
        assert_eq!(track.preview_url.as_deref(), Some("https://p/1.mp3"));
        assert!(serde_json::to_string(&track)?.contains("\"previewUrl\""));

        Ok(())
    }

    #[test]
    fn test_track_without_preview() -> anyhow::Result<()> {
        let json = r#"{"id":"t2","name":"Butter","artist":"BTS"}"#;

        let track: Track = serde_json::from_str(json)?;

        assert_eq!(track.preview_url, None);

        Ok(())
    }
}
