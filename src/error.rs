//! Pipeline error taxonomy.
//!
//! Every variant here is contained within a single file's processing task:
//! the task logs it, its in-flight claim is released, and the source file
//! stays in the watch folder for a future event to retry. Only startup
//! failures (watcher attach, missing credential) are fatal to the process.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::analysis::types::FileState;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file disappeared while we were waiting for it to settle,
    /// e.g. consumed by a racing process.
    #[error("file disappeared while settling: {}", .0.display())]
    SourceVanished(PathBuf),

    /// The file's size kept changing (or stayed at zero) for the whole
    /// maximum wait.
    #[error("file did not settle within {max_wait:?}: {}", .path.display())]
    StabilityTimeout { path: PathBuf, max_wait: Duration },

    /// Transport-level failure talking to the model backend.
    #[error("request to model backend failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("model backend returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The uploaded file never left the remote processing state.
    #[error("remote store did not finish processing within {max_wait:?}")]
    RemoteProcessingTimeout { max_wait: Duration },

    /// The remote store finished processing in a non-ready state.
    #[error("remote store left file in state {state:?}")]
    RemoteProcessingFailed { state: FileState },

    /// The model returned no candidates or no text content.
    #[error("model returned no usable content")]
    EmptyResponse,

    /// The reply decoded neither as a record nor as a list of records.
    #[error("response is neither a record nor a list of records: {raw}")]
    UnparsableResponse { raw: String },

    /// Filesystem watcher error during setup.
    #[error("filesystem watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
