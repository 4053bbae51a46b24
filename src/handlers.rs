//! API handlers over the registry client

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::RegistryError;
use crate::models::{
    is_valid_address, AddCourseRequest, AddUserRequest, ApiResponse, AuditLogEntry, Certificate,
    CertificateSummary, Course, CourseCertificate, IssueCertificateRequest, IssuedCertificate,
    Page, PaginationParams, Student, TeacherCourse, UpdateRoleRequest, User, VerificationStatus,
};
use crate::services::dashboard::DashboardSnapshot;

const DEFAULT_PAGE_SIZE: u64 = 10;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

/// Every error maps to one status so no handler leaves the caller without a
/// definitive response.
pub fn status_for(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::NotConnected => StatusCode::CONFLICT,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::Policy(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::RemoteCall { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn failure<T>(err: RegistryError) -> (StatusCode, Json<ApiResponse<T>>) {
    (status_for(&err), Json(ApiResponse::err(err.to_string())))
}

fn bad_request<T>(message: String) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::err(message)))
}

fn pages(params: &PaginationParams) -> (u64, u64) {
    (
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

// ===== Wallet =====

pub async fn connect_wallet(State(state): State<AppState>) -> ApiResult<String> {
    match state.registry.connect().await {
        Ok(account) => Ok(Json(ApiResponse::ok(account))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn disconnect_wallet(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.registry.disconnect().await;
    Json(ApiResponse::ok(()))
}

pub async fn wallet_account(State(state): State<AppState>) -> Json<ApiResponse<Option<String>>> {
    Json(ApiResponse::ok(state.registry.current_account()))
}

// ===== Users =====

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Page<User>> {
    let (page, page_size) = pages(&params);
    match state.registry.get_users(page, page_size).await {
        Ok(users) => Ok(Json(ApiResponse::ok(users))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<User> {
    match state.registry.get_user(&address).await {
        Ok(user) => Ok(Json(ApiResponse::ok(user))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn add_user(
    State(state): State<AppState>,
    Json(request): Json<AddUserRequest>,
) -> ApiResult<String> {
    if let Err(err) = request.validate() {
        return Err(bad_request(format!("Validation error: {err}")));
    }
    if !is_valid_address(&request.address) {
        return Err(bad_request(format!(
            "{} is not a wallet address",
            request.address
        )));
    }

    match state
        .registry
        .add_user(&request.address, &request.name, request.role)
        .await
    {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<String> {
    match state.registry.update_user_role(&address, request.role).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<String> {
    match state.registry.deactivate_user(&address).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn reactivate_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<String> {
    match state.registry.reactivate_user(&address).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn list_students(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    match state.registry.get_all_students().await {
        Ok(students) => Ok(Json(ApiResponse::ok(students))),
        Err(err) => Err(failure(err)),
    }
}

// ===== Certificates =====

pub async fn list_certificates(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Page<CertificateSummary>> {
    let (page, page_size) = pages(&params);
    match state.registry.get_certificates(page, page_size).await {
        Ok(certificates) => Ok(Json(ApiResponse::ok(certificates))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Certificate> {
    match state.registry.get_certificate(id).await {
        Ok(certificate) => Ok(Json(ApiResponse::ok(certificate))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn issue_certificate(
    State(state): State<AppState>,
    Json(request): Json<IssueCertificateRequest>,
) -> ApiResult<IssuedCertificate> {
    if let Err(err) = request.validate() {
        return Err(bad_request(format!("Validation error: {err}")));
    }
    if !is_valid_address(&request.student_address) {
        return Err(bad_request(format!(
            "{} is not a wallet address",
            request.student_address
        )));
    }

    match state.registry.issue_certificate_with_metadata(&request).await {
        Ok(issued) => Ok(Json(ApiResponse::ok(issued))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<String> {
    match state.registry.verify_certificate(id).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn verification_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<VerificationStatus> {
    match state.registry.verification_status(id).await {
        Ok(status) => Ok(Json(ApiResponse::ok(status))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn certificates_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Vec<CourseCertificate>> {
    let (page, page_size) = pages(&params);
    match state
        .registry
        .get_certificates_by_course(course_id, page, page_size)
        .await
    {
        Ok(certificates) => Ok(Json(ApiResponse::ok(certificates))),
        Err(err) => Err(failure(err)),
    }
}

// ===== Courses =====

pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Page<Course>> {
    let (page, page_size) = pages(&params);
    match state.registry.get_courses(page, page_size).await {
        Ok(courses) => Ok(Json(ApiResponse::ok(courses))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn add_course(
    State(state): State<AppState>,
    Json(request): Json<AddCourseRequest>,
) -> ApiResult<String> {
    if let Err(err) = request.validate() {
        return Err(bad_request(format!("Validation error: {err}")));
    }

    match state.registry.add_course(&request.name).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn activate_course(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> ApiResult<String> {
    match state.registry.activate_course(course_id).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn deactivate_course(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> ApiResult<String> {
    match state.registry.deactivate_course(course_id).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

/// Exposed so the rendering layer can disable the action instead of
/// round-tripping a refusal.
pub async fn course_deactivatable(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::ok(
        state.registry.can_deactivate_course(course_id),
    ))
}

// ===== Teacher-course assignments =====

#[derive(Debug, Deserialize)]
pub struct MatrixParams {
    /// Comma-separated course ids to probe
    pub course_ids: String,
}

pub async fn assign_teacher(
    State(state): State<AppState>,
    Path((address, course_id)): Path<(String, u64)>,
) -> ApiResult<String> {
    match state.registry.assign_teacher(&address, course_id).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn revoke_teacher(
    State(state): State<AppState>,
    Path((address, course_id)): Path<(String, u64)>,
) -> ApiResult<String> {
    match state.registry.revoke_teacher(&address, course_id).await {
        Ok(tx_hash) => Ok(Json(ApiResponse::ok(tx_hash))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn is_teacher_assigned(
    State(state): State<AppState>,
    Path((address, course_id)): Path<(String, u64)>,
) -> ApiResult<bool> {
    match state.registry.is_teacher_assigned(&address, course_id).await {
        Ok(assigned) => Ok(Json(ApiResponse::ok(assigned))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn assignment_matrix(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<MatrixParams>,
) -> ApiResult<Vec<(u64, bool)>> {
    let course_ids: Vec<u64> = params
        .course_ids
        .split(',')
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| bad_request("course_ids must be a comma-separated list of ids".to_string()))?;

    match state.registry.assignment_matrix(&address, &course_ids).await {
        Ok(matrix) => Ok(Json(ApiResponse::ok(matrix))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn teacher_courses(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Vec<TeacherCourse>> {
    let (page, page_size) = pages(&params);
    match state
        .registry
        .get_teacher_courses(&address, page, page_size)
        .await
    {
        Ok(courses) => Ok(Json(ApiResponse::ok(courses))),
        Err(err) => Err(failure(err)),
    }
}

// ===== Audit log & statistics =====

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    pub window: Option<u64>,
}

pub async fn recent_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditParams>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let window = params.window.unwrap_or_else(|| state.registry.audit_window());
    match state.registry.recent_audit_logs(window).await {
        Ok(entries) => Ok(Json(ApiResponse::ok(entries))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn get_audit_log(
    State(state): State<AppState>,
    Path(log_id): Path<u64>,
) -> ApiResult<AuditLogEntry> {
    match state.registry.get_audit_log(log_id).await {
        Ok(entry) => Ok(Json(ApiResponse::ok(entry))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn dashboard_snapshot(
    State(state): State<AppState>,
) -> Json<ApiResponse<Option<DashboardSnapshot>>> {
    Json(ApiResponse::ok(state.dashboard.snapshot()))
}

pub async fn course_statistic(
    State(state): State<AppState>,
    Path(course_name): Path<String>,
) -> ApiResult<u64> {
    match state.registry.course_statistic(&course_name).await {
        Ok(count) => Ok(Json(ApiResponse::ok(count))),
        Err(err) => Err(failure(err)),
    }
}

pub async fn teacher_statistic(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<u64> {
    match state.registry.teacher_statistic(&address).await {
        Ok(count) => Ok(Json(ApiResponse::ok(count))),
        Err(err) => Err(failure(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryClient;
    use crate::routes;
    use crate::services::dashboard::DashboardService;
    use crate::testing::{test_config, MockTransport, StaticWallet, TEACHER_ADDR};
    use crate::uploader::NoopUploader;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_app(transport: Arc<MockTransport>) -> (Router, Arc<RegistryClient>) {
        let registry = Arc::new(RegistryClient::new(
            transport,
            Arc::new(StaticWallet {
                accounts: vec![TEACHER_ADDR.to_string()],
            }),
            Box::new(NoopUploader),
            test_config(),
        ));
        let dashboard = Arc::new(DashboardService::new(Arc::clone(&registry), 10));
        let app = Router::new()
            .merge(routes::wallet_routes())
            .merge(routes::certificate_routes())
            .merge(routes::course_routes())
            .with_state(AppState::new(Arc::clone(&registry), dashboard));
        (app, registry)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn error_status_mapping_is_definitive() {
        assert_eq!(
            status_for(&RegistryError::NotConnected),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&RegistryError::not_found("user")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&RegistryError::Policy("protected".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&RegistryError::remote("reverted")),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn protected_course_check_is_exposed_over_http() {
        let (app, _) = test_app(Arc::new(MockTransport::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/2/deactivatable")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"], json!(false));
    }

    #[tokio::test]
    async fn certificate_lookup_before_connect_maps_to_conflict() {
        let (app, _) = test_app(Arc::new(MockTransport::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/certificates/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn connect_endpoint_returns_the_primary_account() {
        let (app, registry) = test_app(Arc::new(MockTransport::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/wallet/connect")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"], json!(TEACHER_ADDR));
        assert_eq!(registry.current_account().as_deref(), Some(TEACHER_ADDR));
    }

    #[tokio::test]
    async fn malformed_student_address_is_rejected_before_the_ledger() {
        let transport = Arc::new(MockTransport::default());
        let (app, registry) = test_app(Arc::clone(&transport));
        registry.connect().await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/certificates")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "student_address": "not-an-address",
                            "course_id": 7,
                            "issue_date": "2026-05-01"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.submit_calls(), 0);
    }
}
