//! Wire types of the catalog Web API.

use serde::Deserialize;

const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

fn default_expires_in() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

/// One page of `GET /playlists/{id}/tracks`.
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    /// null for removed or local tracks
    pub track: Option<WireTrack>,
}

#[derive(Debug, Deserialize)]
pub struct WireTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ArtistInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistInfo {
    pub id: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_page() -> anyhow::Result<()> {
        let json = r#"{
            "items": [
                {"track": {"id": "t1", "name": "Dynamite", "preview_url": "https://p/1",
                           "artists": [{"id": "a1", "name": "BTS"}]}},
                {"track": null}
            ],
            "next": "https://api/next"
        }"#;

        let page: PlaylistPage = serde_json::from_str(json)?;

        assert_eq!(page.items.len(), 2);
        assert!(page.items[1].track.is_none());
        let track = page.items[0].track.as_ref().unwrap();
        assert_eq!(track.artists[0].name, "BTS");
        assert_eq!(page.next.as_deref(), Some("https://api/next"));

        Ok(())
    }

    #[test]
    fn test_token_default_ttl() -> anyhow::Result<()> {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "abc"}"#)?;

        assert_eq!(token.expires_in, DEFAULT_TOKEN_TTL_SECS);

        Ok(())
    }
}
