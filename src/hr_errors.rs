use thiserror::Error;

use crate::constants::SourceId;

/// Coarse classification of [`HrError`] used by callers to decide between
/// skipping a region and aborting a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The catalog call failed, timed out, or returned malformed data.
    Retrieval,
    /// Thresholds, run parameters or target table are malformed. Raised before any remote call.
    Configuration,
    /// Local file system failure.
    Io,
    /// The plotting backend failed.
    Render,
}

#[derive(Error, Debug)]
pub enum HrError {
    #[error("Catalog query failed: {0}")]
    CatalogQueryFailed(String),

    #[error("HTTP ureq error: {0}")]
    UreqHttpError(#[from] ureq::Error),

    #[error("Malformed catalog response, missing column: {0}")]
    MissingColumn(String),

    #[error("Malformed catalog response, unexpected column: {0}")]
    UnexpectedColumn(String),

    #[error("Malformed catalog response at row {row}: {message}")]
    MalformedRow { row: u64, message: String },

    #[error("Duplicate source_id in result set: {0}")]
    DuplicateSourceId(SourceId),

    #[error("Catalog returned {returned} rows for a row limit of {row_limit}")]
    RowLimitExceeded { returned: usize, row_limit: usize },

    #[error("Invalid filter parameter: {0}")]
    InvalidFilterParameter(String),

    #[error("Invalid pipeline parameter: {0}")]
    InvalidPipelineParameter(String),

    #[error("Invalid sky position: {0}")]
    InvalidSkyPosition(String),

    #[error("Invalid search radius: {0}")]
    InvalidSearchRadius(String),

    #[error("Unknown catalog field: {0}")]
    UnknownCatalogField(String),

    #[error("Invalid batch target file: {0}")]
    InvalidBatchFile(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Plot rendering failed: {0}")]
    RenderError(String),
}

impl HrError {
    /// Classify the error.
    ///
    /// Return
    /// ----------
    /// * [`ErrorKind::Retrieval`] for every failure at the catalog boundary,
    ///   [`ErrorKind::Configuration`] for invalid inputs detected before the remote call.
    pub fn kind(&self) -> ErrorKind {
        use HrError::*;
        match self {
            CatalogQueryFailed(_)
            | UreqHttpError(_)
            | MissingColumn(_)
            | UnexpectedColumn(_)
            | MalformedRow { .. }
            | DuplicateSourceId(_)
            | RowLimitExceeded { .. } => ErrorKind::Retrieval,

            InvalidFilterParameter(_)
            | InvalidPipelineParameter(_)
            | InvalidSkyPosition(_)
            | InvalidSearchRadius(_)
            | UnknownCatalogField(_)
            | InvalidBatchFile(_) => ErrorKind::Configuration,

            IoError(_) => ErrorKind::Io,
            RenderError(_) => ErrorKind::Render,
        }
    }

    pub fn is_retrieval(&self) -> bool {
        self.kind() == ErrorKind::Retrieval
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

impl PartialEq for HrError {
    fn eq(&self, other: &Self) -> bool {
        use HrError::*;
        match (self, other) {
            (CatalogQueryFailed(a), CatalogQueryFailed(b)) => a == b,
            (MissingColumn(a), MissingColumn(b)) => a == b,
            (UnexpectedColumn(a), UnexpectedColumn(b)) => a == b,
            (
                MalformedRow { row: ra, message: ma },
                MalformedRow { row: rb, message: mb },
            ) => ra == rb && ma == mb,
            (DuplicateSourceId(a), DuplicateSourceId(b)) => a == b,
            (
                RowLimitExceeded {
                    returned: ra,
                    row_limit: la,
                },
                RowLimitExceeded {
                    returned: rb,
                    row_limit: lb,
                },
            ) => ra == rb && la == lb,
            (InvalidFilterParameter(a), InvalidFilterParameter(b)) => a == b,
            (InvalidPipelineParameter(a), InvalidPipelineParameter(b)) => a == b,
            (InvalidSkyPosition(a), InvalidSkyPosition(b)) => a == b,
            (InvalidSearchRadius(a), InvalidSearchRadius(b)) => a == b,
            (UnknownCatalogField(a), UnknownCatalogField(b)) => a == b,
            (InvalidBatchFile(a), InvalidBatchFile(b)) => a == b,
            (RenderError(a), RenderError(b)) => a == b,

            // not comparable: equal when same variant
            (UreqHttpError(_), UreqHttpError(_)) => true,
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
