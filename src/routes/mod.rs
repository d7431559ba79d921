pub mod code;
pub mod comments;
pub mod health;
pub mod interviews;
pub mod notifications;
pub mod questions;
pub mod users;
pub mod votes;
