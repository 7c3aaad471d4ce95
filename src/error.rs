#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("account index {index} out of range for table of {len} keys")]
    AccountIndexOutOfRange { index: usize, len: usize },

    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: String, reason: String },

    #[error("role {role} could not be resolved from account index {index}")]
    RoleResolutionFailed { role: &'static str, index: usize },

    #[error("instruction did not supply required role {role}")]
    MissingRole { role: &'static str },

    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("transaction {signature} unavailable after {attempts} attempts")]
    TransactionUnavailable { signature: String, attempts: u32 },

    #[error("fetch of transaction {signature} cancelled")]
    Cancelled { signature: String },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
