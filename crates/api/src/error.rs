/// Everything that can go wrong talking to the read API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("Status code: {0}")]
    StatusCode(u16),

    #[error("Client channel closed: {0}")]
    Channel(String),

    #[error("Invalid response")]
    InvalidResponse,

    #[error("No cached response")]
    NoCachedResponse,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::StatusCode(404))
    }
}
