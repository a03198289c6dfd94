//! # logbook-server
//!
//! HTTP API for the operations logbook, built on axum.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logbook_server::{LogbookServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = LogbookServer::new(ServerConfig::default());
//!     // server.serve().await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/health` | GET | Liveness |
//! | `/logs` | GET | Search, entries only |
//! | `/logs/search` | GET | Search with hit count |
//! | `/logs` | PUT | Create an entry |
//! | `/logs/{id}` | GET / POST | Get or replace an entry |
//! | `/logbooks`, `/tags`, `/properties` | GET | List records (`?inactive=true`) |
//! | `/logbooks/{name}` … | GET / PUT / DELETE | Get, save or deactivate a record |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Args, LogFormat, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::LogbookServer;
pub use state::AppState;
