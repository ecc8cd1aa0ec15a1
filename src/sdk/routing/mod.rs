pub mod client;
pub mod error;
pub mod provider;
pub mod route;
pub mod service;

pub use client::RoutingClient;
pub use error::RoutingError;
pub use provider::{LocalOrsProvider, RemoteOrsProvider};
pub use route::{FeatureCollection, RouteFeature, RouteResult, RouteSummary};
pub use service::{RawResponse, ResponseFormat, RouteTransport};
