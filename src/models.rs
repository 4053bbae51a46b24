//! Data models for the certificate registry

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Course ids at or below this value are seed courses that the client must
/// never offer to deactivate.
pub const PROTECTED_COURSE_ID_MAX: u64 = 3;

/// Role codes as stored on the ledger
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    None,
    Admin,
    Teacher,
    Student,
    /// Fallback for role codes the ledger may introduce later
    Guest,
}

impl Role {
    /// Total mapping: every numeric input yields a role, unknown codes fall
    /// back to `Guest`.
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Role::None,
            1 => Role::Admin,
            2 => Role::Teacher,
            3 => Role::Student,
            _ => Role::Guest,
        }
    }

    pub fn code(self) -> u64 {
        match self {
            Role::None => 0,
            Role::Admin => 1,
            Role::Teacher => 2,
            Role::Student => 3,
            Role::Guest => u64::MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::None => "NONE",
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Guest => "Guest",
        }
    }
}

/// Certificate record as returned by the point lookup
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Certificate {
    pub id: u64,
    pub student_name: String,
    pub student_email_or_id: String,
    pub course_id: u64,
    pub course_name: String,
    pub issue_date: String,
    pub extra_info: String,
    pub issuer: String,
    /// Content-addressed hash of the off-ledger metadata blob, empty when absent
    pub ipfs_hash: String,
    pub is_verified: bool,
    pub timestamp: u64,
}

/// Row shape of the bulk certificate listing. The bulk accessor carries the
/// student wallet address directly, so listing a page never needs a per-row
/// user lookup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CertificateSummary {
    pub id: u64,
    pub student_name: String,
    pub course_name: String,
    pub student_address: String,
    pub timestamp: u64,
}

/// Row shape of the per-course certificate listing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CourseCertificate {
    pub id: u64,
    pub student_name: String,
    pub timestamp: u64,
}

/// Verification state of a certificate
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationStatus {
    pub is_verified: bool,
    pub verifier: String,
    pub timestamp: u64,
}

/// Result of a successful issuance transaction
#[derive(Debug, Serialize, Clone)]
pub struct IssuedCertificate {
    pub certificate_id: u64,
    pub tx_hash: String,
}

/// User record keyed by wallet address
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub address: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created: u64,
}

/// Minimal student row used by issuance forms
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Student {
    pub address: String,
    pub name: String,
}

/// Course record
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Course {
    pub id: u64,
    pub name: String,
    pub is_active: bool,
}

/// Course assigned to a teacher
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TeacherCourse {
    pub id: u64,
    pub name: String,
}

/// Append-only audit log entry; certificate_id 0 means the action had no
/// associated certificate.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLogEntry {
    pub id: u64,
    pub actor: String,
    pub action: String,
    pub certificate_id: u64,
    pub timestamp: u64,
}

/// Paginated result of a clamped read
#[derive(Debug, Serialize, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn empty(page_size: u64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size,
        }
    }
}

/// Request DTO for issuing a certificate
#[derive(Debug, Deserialize, Validate)]
pub struct IssueCertificateRequest {
    #[validate(length(min = 1))]
    pub student_address: String,
    #[validate(range(min = 1))]
    pub course_id: u64,
    #[validate(length(min = 1))]
    pub issue_date: String,
    #[serde(default)]
    pub extra_info: String,
    /// Optional metadata attached to the upload blob
    #[serde(default)]
    pub student_name: String,
}

/// Request DTO for adding a user
#[derive(Debug, Deserialize, Validate)]
pub struct AddUserRequest {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub role: u64,
}

/// Request DTO for a role change
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: u64,
}

/// Request DTO for adding a course
#[derive(Debug, Deserialize, Validate)]
pub struct AddCourseRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// The ledger reports "no entry at this position" with the zero address.
pub fn is_zero_address(address: &str) -> bool {
    let trimmed = address.trim_start_matches("0x");
    trimmed.is_empty() || trimmed.chars().all(|c| c == '0')
}

/// Loose sanity check for wallet addresses: 0x-prefixed, 20 bytes of hex.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
        None => false,
    }
}
