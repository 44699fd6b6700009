use thiserror::Error;

/// Failure of a single endpoint attempt. Recovered inside the fallback client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("response body is not JSON: {0}")]
    InvalidBody(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("response is not a displayable image: {0}")]
    UndecodableImage(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{}", describe_both_failed(.primary.as_ref(), .fallback))]
    BothEndpointsFailed {
        /// `None` when the primary endpoint was skipped by policy.
        primary: Option<EndpointError>,
        fallback: EndpointError,
    },
}

fn describe_both_failed(primary: Option<&EndpointError>, fallback: &EndpointError) -> String {
    match primary {
        Some(primary) => {
            format!("both endpoints failed (primary: {primary}; fallback: {fallback})")
        }
        None => format!("fallback endpoint failed: {fallback}"),
    }
}
