////////////////////////////////////////// GenerationError /////////////////////////////////////////

/// Errors that terminate policy generation.
///
/// Everything else in the pipeline degrades to an empty or default value; only the model call
/// that writes the policy itself is allowed to fail the request.
#[derive(Debug)]
pub enum GenerationError {
    /// The generative model could not be reached or refused the request.
    Model(claudius::Error),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Model(err) => write!(f, "Failed to generate policy: {err}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Model(err) => Some(err),
        }
    }
}

impl From<claudius::Error> for GenerationError {
    fn from(err: claudius::Error) -> Self {
        Self::Model(err)
    }
}

/////////////////////////////////////////// CatalogError ///////////////////////////////////////////

/// Errors that occur while reading a policy catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    Io {
        /// The path that was read.
        path: String,
        /// The underlying I/O error.
        err: std::io::Error,
    },
    /// The catalog is not valid JSON.
    Json(serde_json::Error),
    /// The catalog is JSON but not shaped like a catalog.
    Shape {
        /// What was wrong with it.
        message: String,
    },
}

impl CatalogError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io { path, err } => write!(f, "could not read catalog {path}: {err}"),
            CatalogError::Json(err) => write!(f, "catalog is not valid JSON: {err}"),
            CatalogError::Shape { message } => write!(
                f,
                "malformed catalog: {message}\n\
                 Suggestion: map each category to a list of template files or to a map of \
                 subcategory to a list of template files"
            ),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { err, .. } => Some(err),
            CatalogError::Json(err) => Some(err),
            CatalogError::Shape { .. } => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

////////////////////////////////////////// ValidationError /////////////////////////////////////////

/// A generated policy that failed the permissive structural check.
#[derive(Debug)]
pub enum ValidationError {
    /// The text is not well-formed YAML.
    Yaml(serde_yaml::Error),
    /// The document is YAML but its top level is not a sequence of resources.
    NotASequence {
        /// The kind of node found at the top level.
        found: &'static str,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Yaml(err) => write!(f, "policy is not valid YAML: {err}"),
            ValidationError::NotASequence { found } => {
                write!(f, "policy should be a sequence of resources but is a {found}")
            }
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::Yaml(err) => Some(err),
            ValidationError::NotASequence { .. } => None,
        }
    }
}

impl From<serde_yaml::Error> for ValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}

///////////////////////////////////////// PullRequestError /////////////////////////////////////////

/// Input errors for pull-request creation, raised before any pipeline work happens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PullRequestError {
    /// One or more required parameters were empty.
    MissingParameters {
        /// The names of the missing parameters.
        missing: Vec<&'static str>,
    },
    /// The repository is neither `owner/repo` nor a GitHub URL.
    InvalidRepository {
        /// The repository as given.
        repository: String,
    },
}

impl std::fmt::Display for PullRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestError::MissingParameters { missing } => {
                write!(f, "Missing required parameters: {}", missing.join(", "))
            }
            PullRequestError::InvalidRepository { repository } => write!(
                f,
                "Invalid repository format: {repository}\n\
                 Suggestion: use owner/repo or https://github.com/owner/repo"
            ),
        }
    }
}

impl std::error::Error for PullRequestError {}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
