use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A scripted weight produced something other than a number.
    #[error("Non-numeric weight for doc {doc}: {value}")]
    NonNumericWeight { doc: u32, value: String },

    /// A collector was driven outside its state machine.
    #[error("Invalid collector state: {0}")]
    InvalidState(String),

    #[error("Collection aborted: {0}")]
    CollectionAborted(String),

    /// Shard tables of different shape were offered to a merge.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

pub type Result<T> = std::result::Result<T, Error>;
