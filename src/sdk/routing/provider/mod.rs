pub mod local;
pub mod remote;
pub mod types;

pub use local::LocalOrsProvider;
pub use remote::RemoteOrsProvider;

use super::error::RoutingError;
use super::service::{RawResponse, ResponseFormat};
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde_json::Value;

fn directions_url(endpoint: &str, format: ResponseFormat) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), format.path_segment())
}

/// Sends a prepared directions POST and reads status + body.
async fn send_directions(
    request: RequestBuilder,
    url: &str,
    format: ResponseFormat,
    body: &Value,
) -> Result<RawResponse, RoutingError> {
    let response = match request.header(ACCEPT, format.accept()).json(body).send().await {
        Ok(resp) => resp,
        Err(e) => {
            log::error!(
                "Failed to send POST request. URL: {}\nBody: {}\nError: {}",
                url,
                serde_json::to_string_pretty(body).unwrap_or_default(),
                e
            );
            return Err(e.into());
        }
    };

    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(RawResponse { status, body })
}
