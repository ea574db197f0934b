//! Blocking Web API client using the client-credentials grant.

use std::time::{Duration, Instant};

use base64::{Engine, engine::general_purpose::STANDARD};
use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::catalog::{
    CatalogApi,
    error::CatalogError,
    model::{ArtistInfo, ArtistsResponse, PlaylistPage, TokenResponse},
};

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

const USER_AGENT: &str = concat!("songquiz/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// refresh this long before the token actually expires
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Value of the `Authorization` header for the token request.
    pub fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_MARGIN < self.expires_at
    }
}

pub struct SpotifyClient {
    agent: ureq::Agent,
    accounts_url: String,
    api_url: String,
    credentials: Credentials,
    token: Option<AccessToken>,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials, accounts_url: &str, api_url: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .user_agent(USER_AGENT)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
            token: None,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn fetch_token(&self) -> Result<AccessToken, CatalogError> {
        let url = format!("{}/api/token", self.accounts_url);
        let http_err = |source| CatalogError::Http {
            url: url.clone(),
            source,
        };

        let mut resp = self
            .agent
            .post(&url)
            .header("Authorization", self.credentials.basic_auth())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send("grant_type=client_credentials")
            .map_err(http_err)?;
        let token: TokenResponse = resp.body_mut().read_json().map_err(http_err)?;

        info!("obtained catalog access token, valid for {}s", token.expires_in);
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    fn bearer(&mut self) -> Result<String, CatalogError> {
        if !self.token.as_ref().is_some_and(AccessToken::is_fresh) {
            self.token = Some(self.fetch_token()?);
        }
        let token = self.token.as_ref().map(|t| t.value.as_str()).unwrap_or_default();
        Ok(format!("Bearer {token}"))
    }

    fn get_json<T: DeserializeOwned>(&mut self, url: &str) -> Result<T, CatalogError> {
        let bearer = self.bearer()?;
        let http_err = |source| CatalogError::Http {
            url: url.to_string(),
            source,
        };
        debug!("GET {url}");

        let mut resp = self
            .agent
            .get(url)
            .header("Authorization", bearer)
            .call()
            .map_err(http_err)?;
        resp.body_mut().read_json().map_err(http_err)
    }
}

impl CatalogApi for SpotifyClient {
    fn playlist_page(&mut self, url: &str) -> Result<PlaylistPage, CatalogError> {
        self.get_json(url)
    }

    fn artists(&mut self, ids: &[String]) -> Result<Vec<ArtistInfo>, CatalogError> {
        let url = format!("{}/artists?ids={}", self.api_url, ids.join(","));
        let resp: ArtistsResponse = self.get_json(&url)?;
        Ok(resp.artists.into_iter().flatten().collect())
    }
}
