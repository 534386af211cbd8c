//! Session store, issuer and validator.
//!
//! Sessions are opaque bearer tokens held server-side. The store only ever
//! sees the SHA-256 digest of a token.

mod clock;
mod models;
mod repository;
mod service;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use models::{CredentialMethod, IssuedSession, Session};
pub use repository::SessionRepository;
pub use service::{SessionService, generate_token, hash_token};
pub use store::SessionStore;
