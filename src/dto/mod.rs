pub mod code_dto;
pub mod comment_dto;
pub mod interview_dto;
pub mod notification_dto;
pub mod question_dto;
pub mod user_dto;
pub mod vote_dto;
