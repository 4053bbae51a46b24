//! Route definitions for the registry API

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallet/connect", post(connect_wallet))
        .route("/api/wallet/disconnect", post(disconnect_wallet))
        .route("/api/wallet/account", get(wallet_account))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users", post(add_user))
        .route("/api/users/:address", get(get_user))
        .route("/api/users/:address/role", axum::routing::put(update_user_role))
        .route("/api/users/:address/deactivate", post(deactivate_user))
        .route("/api/users/:address/reactivate", post(reactivate_user))
        .route("/api/students", get(list_students))
}

pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/certificates", get(list_certificates))
        .route("/api/certificates", post(issue_certificate))
        .route("/api/certificates/:id", get(get_certificate))
        .route("/api/certificates/:id/verify", post(verify_certificate))
        .route("/api/certificates/:id/verification", get(verification_status))
        .route("/api/courses/:id/certificates", get(certificates_by_course))
}

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/api/courses", get(list_courses))
        .route("/api/courses", post(add_course))
        .route("/api/courses/:id/activate", post(activate_course))
        .route("/api/courses/:id/deactivate", post(deactivate_course))
        .route("/api/courses/:id/deactivatable", get(course_deactivatable))
}

pub fn teacher_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/teachers/:address/courses",
            get(teacher_courses),
        )
        .route(
            "/api/teachers/:address/courses/:id",
            post(assign_teacher).delete(revoke_teacher).get(is_teacher_assigned),
        )
        .route(
            "/api/teachers/:address/assignments",
            get(assignment_matrix),
        )
}

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audit", get(recent_audit_logs))
        .route("/api/audit/:id", get(get_audit_log))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(dashboard_snapshot))
        .route("/api/stats/courses/:name", get(course_statistic))
        .route("/api/stats/teachers/:address", get(teacher_statistic))
}
