#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("ERR unknown command {0}")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgCount(String),

    #[error("ERR Pattern '{0}' not supported")]
    PatternNotSupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Render this error as the single-line wire form clients receive.
    pub fn to_wire_message(&self) -> String {
        match self {
            EngineError::Io(e) => format!("ERR {e}"),
            other => format!("{other}"),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
