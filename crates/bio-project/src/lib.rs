//! bio-project: run configuration, namelist parsing and turbine bookkeeping.

pub mod config;
pub mod namelist;
pub mod physics;
pub mod turbine;

pub use config::RunConfig;
pub use namelist::{ConfigParser, NamelistParser};
pub use physics::PhysicsSummary;
pub use turbine::{SortKey, Turbine, TurbineArray};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Namelist parse error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Missing configuration key: {key}")]
    MissingKey { key: String },

    #[error("Configuration key {key} has the wrong type, expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Turbine directory not found: {path}")]
    TurbineDirNotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<RunConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_json(path: &std::path::Path, config: &RunConfig) -> ProjectResult<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
