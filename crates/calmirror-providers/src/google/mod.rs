//! Google Calendar gateway.
//!
//! [`GoogleGateway`] implements [`CalendarGateway`](crate::CalendarGateway)
//! over Calendar API v3.
//!
//! # Authentication Flow
//!
//! 1. The user registers their own OAuth client (Google requires one)
//! 2. A local HTTP server is bound on a loopback port
//! 3. The browser opens Google's consent page with a PKCE challenge
//! 4. Google redirects back to the loopback server with a code
//! 5. The code and verifier are exchanged for access and refresh tokens
//! 6. Tokens are persisted and refreshed automatically on later runs
//!
//! # Example
//!
//! ```ignore
//! use calmirror_providers::google::{GoogleConfig, GoogleGateway, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! );
//! let gateway = GoogleGateway::new(GoogleConfig::new(credentials))?;
//!
//! if gateway.needs_reauth().await {
//!     gateway.authenticate().await?;
//! }
//!
//! let calendar = gateway.resolve_calendar("primary").await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::CalendarListEntry;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleGateway;
pub use tokens::{TokenInfo, TokenStorage};
