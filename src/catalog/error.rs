use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog credentials are not configured")]
    MissingCredentials,

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("playlist id is not configured")]
    MissingPlaylist,

    #[error("questions file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid questions file: {0}")]
    Json(#[from] serde_json::Error),
}
