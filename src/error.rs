use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {path}")]
    Status { status: u16, path: String },

    #[error("authentication failed")]
    AuthFailed,

    #[error("token provider error: {0}")]
    Token(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("device has no {0} capability")]
    MissingCapability(String),

    #[error("characteristic {0} is not settable")]
    NotSettable(String),

    #[error("invalid option {value} for {name}")]
    InvalidOption { name: String, value: String },

    #[error("setpoint {value} outside range [{min}, {max}]")]
    InvalidSetpoint { value: f64, min: f64, max: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
