use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{
    catalog::{
        PlaylistQuery,
        client::{Credentials, DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL},
        error::CatalogError,
    },
    quiz::{
        aliases::AliasTable,
        round::{DEFAULT_REVEAL_SECS, DEFAULT_ROUND_SECS, DEFAULT_VOLUME, RoundSettings},
    },
};

pub const CLIENT_ID_ENV: &str = "SONGQUIZ_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SONGQUIZ_CLIENT_SECRET";

const DEFAULT_QUESTION_COUNT: usize = 10;
/// longest allowed pause on the revealed answer
const MAX_REVEAL_SECS: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Reads the TOML file, applies credential overrides from the
    /// environment and validates the result.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::parse(&contents)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        toml::from_str(contents).with_context(|| "Failed to parse config TOML")
    }

    /// Environment values win over the file.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
            self.catalog.client_id = Some(id);
        }
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.catalog.client_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.quiz.round_secs == 0 {
            bail!("quiz.round_secs must be positive");
        }
        if !(1..=MAX_REVEAL_SECS).contains(&self.quiz.reveal_secs) {
            bail!(
                "quiz.reveal_secs must be within 1..={MAX_REVEAL_SECS}, got {}",
                self.quiz.reveal_secs
            );
        }
        if !(0.0..=1.0).contains(&self.quiz.volume) {
            bail!("quiz.volume must be within 0.0..=1.0, got {}", self.quiz.volume);
        }
        if self.quiz.question_count == 0 {
            bail!("quiz.question_count must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub playlist_id: Option<String>,
    pub required_genre: Option<String>,
    /// use exported questions instead of the remote catalog
    pub questions_file: Option<PathBuf>,
    pub accounts_url: Option<String>,
    pub api_url: Option<String>,
}

impl CatalogConfig {
    pub fn credentials(&self) -> Result<Credentials, CatalogError> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Ok(Credentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => Err(CatalogError::MissingCredentials),
        }
    }

    pub fn accounts_url(&self) -> &str {
        self.accounts_url.as_deref().unwrap_or(DEFAULT_ACCOUNTS_URL)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn playlist_query(&self) -> Result<PlaylistQuery, CatalogError> {
        let playlist_id = self
            .playlist_id
            .clone()
            .ok_or(CatalogError::MissingPlaylist)?;
        Ok(PlaylistQuery {
            api_url: self.api_url().to_string(),
            playlist_id,
            required_genre: self.required_genre.clone(),
        })
    }
}

fn default_round_secs() -> u32 {
    DEFAULT_ROUND_SECS
}

fn default_reveal_secs() -> u32 {
    DEFAULT_REVEAL_SECS
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_question_count() -> usize {
    DEFAULT_QUESTION_COUNT
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuizConfig {
    #[serde(default = "default_round_secs")]
    pub round_secs: u32,
    #[serde(default = "default_reveal_secs")]
    pub reveal_secs: u32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    pub alias_file: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            round_secs: DEFAULT_ROUND_SECS,
            reveal_secs: DEFAULT_REVEAL_SECS,
            volume: DEFAULT_VOLUME,
            question_count: DEFAULT_QUESTION_COUNT,
            alias_file: None,
            seed: None,
        }
    }
}

impl QuizConfig {
    pub fn round_settings(&self) -> RoundSettings {
        RoundSettings {
            round_secs: self.round_secs,
            reveal_secs: self.reveal_secs,
            volume: self.volume,
        }
    }

    /// The configured alias file, or the built-in table.
    pub fn alias_table(&self) -> anyhow::Result<AliasTable> {
        match &self.alias_file {
            Some(path) => AliasTable::load(path)
                .with_context(|| format!("Failed to load alias table {}", path.display())),
            None => AliasTable::builtin().with_context(|| "Built-in alias table is invalid"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
