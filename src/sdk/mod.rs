pub mod board;
pub mod catalog;
pub mod config;
pub mod gesture;
pub mod ledger;
pub mod presentation;
pub mod relay;
pub mod roster;
pub mod routing;
pub mod store;
pub mod util;
pub mod waypoints;
