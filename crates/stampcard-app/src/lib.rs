//! Stamp Card - Study Progress Boards
//!
//! Users log study sessions, earn stamp-card slots from their totals, and
//! press stamps onto each other's boards.
//!
//! # Architecture
//!
//! - **Models**: Typed documents (UserProfile, StudyRecord, NotificationEvent, etc.)
//! - **Store**: Document store abstraction with an in-memory implementation
//! - **Service**: Record logging, unlock evaluation, stamp placement
//! - **Live**: Boards re-derived on every store change
//! - **Auth / Media**: Caller identity and stamp image uploads
//!
//! The rules themselves (totals, unlocks, board layout) live in
//! `stampcard-core` and have no I/O.
//!
//! # Example
//!
//! ```no_run
//! use stampcard::{Caller, MemoryStore, NewRecord, StampCard, StampCardConfig};
//! use stampcard_core::MetricKind;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = StampCard::new(Arc::new(MemoryStore::new()), StampCardConfig::default());
//!     let aki = Caller::new("aki").with_display_name("Aki");
//!     card.ensure_profile(&aki).await?;
//!     card.log_record(&aki, NewRecord::new("Kanji deck", MetricKind::Pages, 20.0)).await?;
//!     println!("{} slots unlocked", card.unlocked_count("aki").await?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod live;
pub mod media;
pub mod models;
pub mod paths;
pub mod service;
pub mod store;

pub use auth::{AuthProvider, Caller, SessionAuth};
pub use config::StampCardConfig;
pub use error::{Error, Result};
pub use live::{BoardSnapshot, LiveBoard};
pub use media::{HttpMediaUploader, MediaUploader};
pub use models::{
    MaterialList, NewRecord, NotificationEvent, ProfileUpdate, StampSettings, StampTarget,
    StudyRecord, UserProfile,
};
pub use service::{PlacementOutcome, StampCard};
pub use store::{DocumentStore, MemoryStore};
