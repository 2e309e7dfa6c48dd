//! Meeting store and request handler.
//!
//! This crate provides the service layer around the expansion engine:
//! - An in-memory store of organizations, members and meetings, loaded from
//!   JSON snapshots
//! - Permission checks for meeting management
//! - A request handler answering protocol requests
//!
//! # Example
//!
//! ```rust,no_run
//! use campusmeet_service::{MeetingStore, RequestHandler, Snapshot, new_shared_store};
//! use campusmeet_protocol::Request;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MeetingStore::from_snapshot(Snapshot::load("snapshot.json")?)?;
//!     let handler = RequestHandler::new(new_shared_store(store));
//!     let response = handler.handle(&Request::Ping).await;
//!     println!("{response:?}");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod store;

pub use config::{DEFAULT_MAX_WINDOW_DAYS, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use handler::{RequestHandler, SharedStore, new_shared_store};
pub use store::{MeetingStore, Snapshot};
