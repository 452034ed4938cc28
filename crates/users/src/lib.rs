//! Users domain module.
//!
//! Entity, change sets, input rules and the service that enforces them. Storage
//! is behind [`UserStore`]; adapters live in `marketplace-infra`.

pub mod service;
pub mod store;
pub mod user;
pub mod validation;

pub use service::UserService;
pub use store::UserStore;
pub use user::{NewUser, User, UserChanges, UserFilter};
pub use validation::ValidationConfig;
