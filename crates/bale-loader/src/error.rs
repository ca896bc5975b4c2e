use thiserror::Error;

/// A failed script request, as reported by the [`Fetcher`](crate::Fetcher)'s
/// host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkError {
    /// HTTP status, when the failure was an HTTP response.
    pub status: Option<u16>,
    pub message: String,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Errors delivered to import callbacks.
///
/// Errors are cloned to every pending import that depends on the failed
/// module, so they carry strings rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The script holding the module could not be fetched.
    #[error("Failed to fetch {id} from {url}: {source}")]
    NetworkFailure {
        id: String,
        url: String,
        #[source]
        source: NetworkError,
    },

    /// The script was fetched but did not register the module.
    #[error("{url} does not define {id}")]
    NotDefined { id: String, url: String },

    /// A module this one depends on failed.
    #[error("{id} depends on {failed}, which failed: {cause}")]
    Dependency {
        id: String,
        failed: String,
        cause: Box<LoaderError>,
    },

    /// The module's factory returned an error.
    #[error("Error while executing {id}: {message}")]
    Factory { id: String, message: String },

    /// `require` was called with a specifier the module never declared.
    #[error("{id} requires '{specifier}', which is not one of its declared dependencies")]
    Undeclared { id: String, specifier: String },
}

impl LoaderError {
    /// Id of the module the error was reported for.
    pub fn id(&self) -> &str {
        match self {
            LoaderError::NetworkFailure { id, .. }
            | LoaderError::NotDefined { id, .. }
            | LoaderError::Dependency { id, .. }
            | LoaderError::Factory { id, .. }
            | LoaderError::Undeclared { id, .. } => id,
        }
    }

    /// The error at the bottom of a dependency chain.
    pub fn root_cause(&self) -> &LoaderError {
        match self {
            LoaderError::Dependency { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
