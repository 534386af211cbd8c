//! Identity directory.
//!
//! Identity records (email, role, division, region) and the storage seam
//! that the credential verifier, external exchanger and admin handlers read.

mod models;
mod repository;
mod service;
mod store;

pub use models::{
    CreateUserRequest, Division, IdentityChanges, NewIdentity, Region, UpdateUserRequest, User,
    UserInfo, UserListQuery, UserRole,
};
pub use repository::UserRepository;
pub use service::{UserService, is_valid_email, normalize_email};
pub use store::IdentityStore;
