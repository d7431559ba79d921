pub mod code_execution_service;
pub mod comment_service;
pub mod interview_service;
pub mod notification_service;
pub mod outcome_service;
pub mod plagiarism_service;
pub mod question_service;
pub mod user_service;
pub mod vote_service;
