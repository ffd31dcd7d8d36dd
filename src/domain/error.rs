//! Engine error types.

/// A parse error with position information for indicator spec parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Character offset into the input.
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for samta.
#[derive(Debug, thiserror::Error)]
pub enum SamtaError {
    /// A derivation was set up with parameters it cannot honor.
    #[error("invalid configuration for {name}: {reason}")]
    Config { name: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// A catch-up traversal could not line up with its cached partial result.
    #[error("expected contiguous data: {reason}")]
    Structural { reason: String },

    #[error("series #{id} is not in the cache")]
    UnknownSeries { id: u64 },

    #[error("refill failed during {operation}")]
    Refill {
        operation: String,
        #[source]
        source: Box<SamtaError>,
    },

    #[error("data source missed its deadline of {timeout_ms}ms")]
    RefillTimeout { timeout_ms: u64 },

    /// Context added by each composite derivation as an error propagates up.
    #[error("{name}")]
    Derivation {
        name: String,
        #[source]
        source: Box<SamtaError>,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    IndicatorParse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SamtaError {
    /// Wraps `self` with the name of the derivation it passed through.
    pub fn within(self, name: impl Into<String>) -> Self {
        SamtaError::Derivation {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error after peeling off derivation context.
    pub fn root(&self) -> &SamtaError {
        match self {
            SamtaError::Derivation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Derivation names from outermost to innermost.
    pub fn trail(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut err = self;
        while let SamtaError::Derivation { name, source } = err {
            names.push(name.as_str());
            err = source;
        }
        names
    }
}

impl From<&SamtaError> for std::process::ExitCode {
    fn from(err: &SamtaError) -> Self {
        let code: u8 = match err.root() {
            SamtaError::Io(_) => 1,
            SamtaError::ConfigParse { .. }
            | SamtaError::ConfigMissing { .. }
            | SamtaError::ConfigInvalid { .. }
            | SamtaError::Config { .. } => 2,
            SamtaError::Data { .. }
            | SamtaError::Refill { .. }
            | SamtaError::RefillTimeout { .. } => 3,
            SamtaError::IndicatorParse(_) => 4,
            SamtaError::Structural { .. }
            | SamtaError::UnknownSeries { .. }
            | SamtaError::Derivation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
