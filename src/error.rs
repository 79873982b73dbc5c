use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegLabelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("labeler name could not be determined. Please specify a user name with --user")]
    MissingLabeler,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("viewer launch failed: {0}")]
    ViewerLaunch(String),

    #[error("volume error: {0}")]
    Volume(String),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] seglabel_common::Error),
}

pub type Result<T> = std::result::Result<T, SegLabelError>;
