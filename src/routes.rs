// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, auth, exams, questions, topics},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: registration, verification, login, topics, exams.
/// * Token routes: current user and attempts.
/// * Admin routes: auth first, then the admin check.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let user_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/verify", post(auth::verify))
        .route("/activate", get(auth::activate))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/token/refresh", post(auth::refresh_token))
                .layer(auth_layer.clone()),
        );

    let topic_routes = Router::new().route("/", get(topics::topic_tree));

    let exam_routes = Router::new()
        .route("/", get(exams::list_public_exams))
        .route("/{slug}", get(exams::get_public_exam));

    let attempt_routes = Router::new()
        .route(
            "/",
            get(attempts::list_my_attempts).post(attempts::start_attempt),
        )
        .route("/{id}", get(attempts::get_attempt))
        .route("/{id}/responses", post(attempts::record_response))
        .route("/{id}/submit", post(attempts::submit_attempt))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route(
            "/topics",
            get(topics::list_topics).post(topics::create_topic),
        )
        .route(
            "/topics/{id}",
            get(topics::get_topic)
                .put(topics::update_topic)
                .delete(topics::delete_topic),
        )
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/questions/{id}/options", put(questions::replace_options))
        .route("/exams", get(exams::list_exams).post(exams::create_exam))
        .route(
            "/exams/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route(
            "/exams/{id}/questions",
            get(exams::list_exam_questions).post(exams::add_exam_question),
        )
        .route(
            "/exams/{id}/questions/{question_id}",
            put(exams::update_exam_question).delete(exams::remove_exam_question),
        )
        .route("/attempts/{id}/grade", post(attempts::grade_attempt))
        // Double middleware protection: Auth first, then Admin check
        .layer(
            ServiceBuilder::new()
                .layer(auth_layer)
                .layer(middleware::from_fn(admin_middleware)),
        );

    Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/topics", topic_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
