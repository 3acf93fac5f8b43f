#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown layer setting: {0}")]
    UnknownSetting(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
