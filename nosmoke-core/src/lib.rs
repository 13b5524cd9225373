//! Client-side core of the NoSmoke dashboard.
//!
//! Everything that talks to the detection backend or holds application
//! state lives here so the desktop frontend and the CLI share one
//! implementation:
//!
//! - [`session::SessionStore`]: sign-in/sign-up/sign-out and session restore
//! - [`store::DomainStore`]: student roster, detection log, derived stats
//! - [`stream::DetectionController`]: live camera streaming over WebSocket
//! - [`filter`] and [`export`]: pure helpers used by the roster and history views

pub mod api;
pub mod camera;
pub mod config;
pub mod export;
pub mod filter;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;
pub mod stream;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use session::{AuthError, SessionState, SessionStore};
pub use store::{DomainState, DomainStore, StoreError};
pub use stream::{DetectionController, LiveStatus, StreamEvent, StreamPhase};
