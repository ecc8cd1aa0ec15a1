use serde::Deserialize;
use thiserror::Error;

// Helper structs to parse the JSON error response from ORS
#[derive(Deserialize, Debug)]
pub struct OrsErrorDetail {
    pub code: u32,
    pub message: String,
}
#[derive(Deserialize, Debug)]
pub struct OrsErrorPayload {
    pub error: OrsErrorDetail,
}

#[derive(Error, Debug)]
pub enum RoutingError {
    // This variant hold the structured error from the API
    #[error("API Error (Code {code}): {message}")]
    Api { code: u32, message: String },

    // A fallback for when we get an error that isn't in the expected JSON format
    #[error("Unstructured API Error (HTTP {status}): {body}")]
    RawApi { status: u16, body: String },

    #[error("Underlying request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed encoded polyline at byte {0}")]
    Polyline(usize),

    #[error("No route found in success response")]
    EmptyRoute,

    #[error("At least two coordinates are required, got {0}")]
    TooFewCoordinates(usize),

    #[error("Routing failed: {reason}")]
    Exhausted { reason: String },
}

impl RoutingError {
    /// Classifies a non-success provider response.
    pub fn from_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<OrsErrorPayload>(body) {
            Ok(payload) => RoutingError::Api {
                code: payload.error.code,
                message: payload.error.message,
            },
            Err(_) => {
                log::error!(
                    "API returned non-success status: {}. Unparseable Body: {}",
                    status,
                    body
                );
                RoutingError::RawApi {
                    status,
                    body: body.to_string(),
                }
            }
        }
    }
}
