//! tokenlens Server - HTTP API for transformer token visualization
//!
//! This crate serves the visualization pipeline over HTTP: text goes in
//! as JSON, and the response carries 3D scatter geometry for the token
//! embeddings, a blended attention heatmap matrix, and model metadata.
//!
//! # Features
//!
//! - **Visualization endpoint**: tokenize → embed → reduce to 3D → plot
//!   geometry, in one request
//! - **Middleware**: compression, CORS, request ID tracking, structured
//!   logging, timeouts
//! - **Configuration**: environment variable and file-based configuration
//! - **Health & Metrics**: liveness/readiness probes and Prometheus
//!   metrics
//! - **Graceful Shutdown**: proper signal handling
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /api/v1/metadata` - Server metadata
//! - `POST /api/v1/visualize` - Visualize one text

pub mod assemble;
pub mod config;
pub mod error;
pub mod middleware;
pub mod plot;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
