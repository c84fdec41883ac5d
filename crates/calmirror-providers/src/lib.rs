//! CalendarGateway trait and implementations.
//!
//! This crate provides the abstraction layer between the reconciler and a
//! calendar store:
//!
//! - [`CalendarGateway`] - resolve, list, create, delete against one store
//! - [`MemoryGateway`] - an in-process store with failure injection
//! - [`google::GoogleGateway`] - Google Calendar API v3 (feature `google`)
//! - [`ProviderError`] - Error types for gateway operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Google API     │    │  process memory │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ GoogleGateway   │    │ MemoryGateway   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │   CalendarGateway    │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼
//!              ┌─────────────┐
//!              │ EventRecord │
//!              └─────────────┘
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::{MemoryGateway, MemoryOperation};
pub use provider::{BoxFuture, CalendarGateway, CalendarHandle, CalendarInfo};
