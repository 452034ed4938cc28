pub mod auth;
pub mod products;
pub mod system;
pub mod users;
