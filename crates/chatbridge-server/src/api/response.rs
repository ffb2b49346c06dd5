use serde::Serialize;

/// JSON body for non-streaming error responses.
#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
