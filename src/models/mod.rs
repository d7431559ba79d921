pub mod assessment;
pub mod comment;
pub mod interview;
pub mod notification;
pub mod question;
pub mod user;
pub mod vote;
