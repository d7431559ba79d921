pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    code_execution_service::{CodeExecutionService, CodeRunner, PistonRunner},
    comment_service::CommentService,
    interview_service::InterviewService,
    notification_service::NotificationService,
    outcome_service::OutcomeNotifier,
    plagiarism_service::{GeminiClassifier, PlagiarismClassifier, PlagiarismService},
    question_service::QuestionService,
    user_service::UserService,
    vote_service::VoteService,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub store_kind: &'static str,
    pub jwt_secret: String,
    pub user_service: UserService,
    pub interview_service: InterviewService,
    pub vote_service: VoteService,
    pub comment_service: CommentService,
    pub notification_service: NotificationService,
    pub question_service: QuestionService,
    pub code_execution_service: CodeExecutionService,
    pub plagiarism_service: PlagiarismService,
}

impl AppState {
    /// Wires the services against `store` with the HTTP adapters from `config`.
    pub fn new(store: Arc<dyn Store>, store_kind: &'static str, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.adapter_timeout + Duration::from_secs(5))
            .build()?;

        let runner: Arc<dyn CodeRunner> = Arc::new(PistonRunner::new(
            http_client.clone(),
            config.piston_api_url.clone(),
        ));
        let classifier: Option<Arc<dyn PlagiarismClassifier>> =
            config.gemini_api_key.clone().map(|key| {
                Arc::new(GeminiClassifier::new(
                    http_client,
                    key,
                    config.gemini_model.clone(),
                )) as Arc<dyn PlagiarismClassifier>
            });

        Ok(Self::assemble(store, store_kind, config, runner, classifier))
    }

    /// Same as [`AppState::new`] but with the external adapters supplied.
    pub fn assemble(
        store: Arc<dyn Store>,
        store_kind: &'static str,
        config: &Config,
        runner: Arc<dyn CodeRunner>,
        classifier: Option<Arc<dyn PlagiarismClassifier>>,
    ) -> Self {
        let notification_service = NotificationService::new(store.clone());
        let outcomes = OutcomeNotifier::new(store.clone(), notification_service.clone());
        let interview_service =
            InterviewService::new(store.clone(), notification_service.clone(), outcomes);
        let vote_service = VoteService::new(
            store.clone(),
            interview_service.clone(),
            config.decision_policy,
        );

        Self {
            user_service: UserService::new(store.clone()),
            comment_service: CommentService::new(store.clone()),
            question_service: QuestionService::new(store.clone()),
            code_execution_service: CodeExecutionService::new(runner, config.adapter_timeout),
            plagiarism_service: PlagiarismService::new(classifier, config.adapter_timeout),
            jwt_secret: config.jwt_secret.clone(),
            interview_service,
            vote_service,
            notification_service,
            store,
            store_kind,
        }
    }
}

/// Builds the full HTTP surface. Everything under `/api` needs a bearer token
/// and shares one rate limiter.
pub fn build_router(state: AppState, api_rps: u32) -> Router {
    let api = Router::new()
        .route("/api/users", get(routes::users::list_users))
        .route("/api/users/me", axum::routing::put(routes::users::sync_me))
        .route("/api/users/:id", get(routes::users::get_user))
        .route(
            "/api/interviews",
            get(routes::interviews::list_interviews).post(routes::interviews::create_interview),
        )
        .route(
            "/api/interviews/mine",
            get(routes::interviews::list_my_interviews),
        )
        .route(
            "/api/interviews/by-call/:stream_call_id",
            get(routes::interviews::get_interview_by_call),
        )
        .route(
            "/api/interviews/:id",
            get(routes::interviews::get_interview)
                .patch(routes::interviews::update_interview)
                .delete(routes::interviews::delete_interview),
        )
        .route(
            "/api/interviews/:id/status",
            post(routes::interviews::set_status),
        )
        .route(
            "/api/interviews/:id/reminders",
            post(routes::interviews::send_reminder),
        )
        .route(
            "/api/interviews/:id/votes",
            get(routes::votes::list_votes).post(routes::votes::submit_vote),
        )
        .route("/api/interviews/:id/votes/mine", get(routes::votes::my_vote))
        .route(
            "/api/interviews/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::add_comment),
        )
        .route("/api/comments/:id", delete(routes::comments::delete_comment))
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications)
                .delete(routes::notifications::delete_all_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:id",
            delete(routes::notifications::delete_notification),
        )
        .route(
            "/api/notifications/:id/read",
            post(routes::notifications::mark_read),
        )
        .route(
            "/api/questions",
            get(routes::questions::list_questions).post(routes::questions::create_question),
        )
        .route(
            "/api/questions/:id",
            get(routes::questions::get_question)
                .put(routes::questions::update_question)
                .delete(routes::questions::delete_question),
        )
        .route("/api/code/execute", post(routes::code::execute_code))
        .route("/api/code/analyze", post(routes::code::analyze_code))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_caller,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(api_rps),
            middleware::rate_limit::rate_limit,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .with_state(state)
}
