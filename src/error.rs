use phoenix_common::PartitionKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhoenixError {
    #[error("No device detected. Connect your Rabbit R1 in the correct mode and try again. ({0})")]
    NoDevice(String),

    #[error("Missing image for {0}. Place the required image in the firmware/ folder.")]
    MissingImage(PartitionKey),

    #[error("Firmware incomplete, missing: {}", labels(.0))]
    NotReady(Vec<PartitionKey>),

    #[error("Another action is still running")]
    Busy,

    #[error("Cancelled by user")]
    Declined,

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Could not launch {0}")]
    Launch(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] phoenix_common::Error),
}

impl From<phoenix_common::RestoreError> for PhoenixError {
    fn from(err: phoenix_common::RestoreError) -> Self {
        PhoenixError::Common(err.into())
    }
}

fn labels(keys: &[PartitionKey]) -> String {
    keys.iter().map(|k| k.label()).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, PhoenixError>;
