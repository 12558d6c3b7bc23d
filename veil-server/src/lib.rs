//! Veil Server
//!
//! Thin HTTP layer over the two core pipelines:
//! - `POST /api/v2/chat/message` answers analyst queries through the gateway
//! - `GET /api/v1/vendors[/{id}]` serves scored vendors
//! - `GET /api/health` reports registry and gateway counters

pub mod api;
pub mod server;

pub use api::*;
pub use server::*;
