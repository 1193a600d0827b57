use crate::settings::SettingsError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] chanview_api::error::Error),

    #[error("Failed to load settings: {0}")]
    Load(#[source] SettingsError),

    #[error("Failed to save settings: {0}")]
    Save(#[source] SettingsError),

    #[error("Unknown tag {0:?}, add it in settings first")]
    UnknownTag(String),

    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    #[error("No board selected")]
    NoBoard,
}
