//! Versioned decoders for the contract's positional tuple responses
//!
//! Field order at the ledger boundary is positional, not named, and has
//! drifted between contract revisions. All layout knowledge lives here so
//! drift is caught at one boundary instead of scattered across call sites.

use serde_json::Value;

use crate::error::{RegistryError, Result};
use crate::models::{
    AuditLogEntry, Certificate, CertificateSummary, Course, CourseCertificate, Role,
    TeacherCourse, User, VerificationStatus,
};

/// Tuple layout spoken by the deployed contract.
///
/// `R3` is the target revision: bulk certificate listings carry the student
/// wallet address and point lookups include `courseId` and `ipfsHash`. `R2`
/// is the older 9-slot layout kept for ledgers that were never migrated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContractRevision {
    R2,
    #[default]
    R3,
}

impl ContractRevision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "r2" | "v2" | "2" => Some(Self::R2),
            "r3" | "v3" | "3" => Some(Self::R3),
            _ => None,
        }
    }
}

fn shape_err(what: &str) -> RegistryError {
    RegistryError::remote(format!("unexpected response shape: {what}"))
}

/// Ledger nodes return numbers either as JSON numbers or decimal strings.
fn as_u64(value: &Value, slot: &str) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| shape_err(slot)),
        Value::String(s) => s.parse().map_err(|_| shape_err(slot)),
        _ => Err(shape_err(slot)),
    }
}

fn as_bool(value: &Value, slot: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(shape_err(slot)),
    }
}

fn as_str(value: &Value, slot: &str) -> Result<String> {
    value
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| shape_err(slot))
}

fn slots<'a>(value: &'a Value, expected: usize, what: &str) -> Result<&'a Vec<Value>> {
    let arr = value.as_array().ok_or_else(|| shape_err(what))?;
    if arr.len() != expected {
        return Err(shape_err(&format!(
            "{what}: expected {expected} slots, got {}",
            arr.len()
        )));
    }
    Ok(arr)
}

/// Parallel-array column set; all columns must agree on row count.
fn columns<'a>(value: &'a Value, expected: usize, what: &str) -> Result<Vec<&'a Vec<Value>>> {
    let outer = slots(value, expected, what)?;
    let cols: Vec<&Vec<Value>> = outer
        .iter()
        .map(|col| col.as_array().ok_or_else(|| shape_err(what)))
        .collect::<Result<_>>()?;
    let rows = cols[0].len();
    if cols.iter().any(|col| col.len() != rows) {
        return Err(shape_err(&format!("{what}: ragged column lengths")));
    }
    Ok(cols)
}

/// Totals and statistics come back as a single-slot tuple or a bare value.
pub fn scalar_u64(value: &Value, what: &str) -> Result<u64> {
    match value {
        Value::Array(arr) if arr.len() == 1 => as_u64(&arr[0], what),
        other => as_u64(other, what),
    }
}

pub fn scalar_bool(value: &Value, what: &str) -> Result<bool> {
    match value {
        Value::Array(arr) if arr.len() == 1 => as_bool(&arr[0], what),
        other => as_bool(other, what),
    }
}

pub fn certificate(revision: ContractRevision, value: &Value) -> Result<Certificate> {
    match revision {
        ContractRevision::R3 => {
            let t = slots(value, 11, "getCertificate")?;
            Ok(Certificate {
                id: as_u64(&t[0], "certificate.id")?,
                student_name: as_str(&t[1], "certificate.studentName")?,
                student_email_or_id: as_str(&t[2], "certificate.studentEmailOrId")?,
                course_id: as_u64(&t[3], "certificate.courseId")?,
                course_name: as_str(&t[4], "certificate.courseName")?,
                issue_date: as_str(&t[5], "certificate.issueDate")?,
                extra_info: as_str(&t[6], "certificate.extraInfo")?,
                issuer: as_str(&t[7], "certificate.issuer")?,
                ipfs_hash: as_str(&t[8], "certificate.ipfsHash")?,
                is_verified: as_bool(&t[9], "certificate.isVerified")?,
                timestamp: as_u64(&t[10], "certificate.timestamp")?,
            })
        }
        ContractRevision::R2 => {
            let t = slots(value, 9, "getCertificate")?;
            Ok(Certificate {
                id: as_u64(&t[0], "certificate.id")?,
                student_name: as_str(&t[1], "certificate.studentName")?,
                student_email_or_id: as_str(&t[2], "certificate.studentEmailOrId")?,
                course_id: 0,
                course_name: as_str(&t[3], "certificate.courseName")?,
                issue_date: as_str(&t[4], "certificate.issueDate")?,
                extra_info: as_str(&t[5], "certificate.extraInfo")?,
                issuer: as_str(&t[6], "certificate.issuer")?,
                ipfs_hash: String::new(),
                is_verified: as_bool(&t[7], "certificate.isVerified")?,
                timestamp: as_u64(&t[8], "certificate.timestamp")?,
            })
        }
    }
}

/// Bulk certificate listing. Both revisions return five parallel arrays; in
/// R3 the fourth column is the student wallet address, in R2 it still holds
/// the free-text student email/id.
pub fn certificate_rows(value: &Value) -> Result<Vec<CertificateSummary>> {
    let cols = columns(value, 5, "getCertificates")?;
    (0..cols[0].len())
        .map(|i| {
            Ok(CertificateSummary {
                id: as_u64(&cols[0][i], "certificates.id")?,
                student_name: as_str(&cols[1][i], "certificates.studentName")?,
                course_name: as_str(&cols[2][i], "certificates.courseName")?,
                student_address: as_str(&cols[3][i], "certificates.studentAddress")?,
                timestamp: as_u64(&cols[4][i], "certificates.timestamp")?,
            })
        })
        .collect()
}

pub fn course_certificate_rows(value: &Value) -> Result<Vec<CourseCertificate>> {
    let cols = columns(value, 3, "getCertificatesByCourse")?;
    (0..cols[0].len())
        .map(|i| {
            Ok(CourseCertificate {
                id: as_u64(&cols[0][i], "courseCertificates.id")?,
                student_name: as_str(&cols[1][i], "courseCertificates.studentName")?,
                timestamp: as_u64(&cols[2][i], "courseCertificates.timestamp")?,
            })
        })
        .collect()
}

pub fn verification_status(value: &Value) -> Result<VerificationStatus> {
    let t = slots(value, 3, "getCertificateVerificationStatus")?;
    Ok(VerificationStatus {
        is_verified: as_bool(&t[0], "verification.isVerified")?,
        verifier: as_str(&t[1], "verification.verifier")?,
        timestamp: as_u64(&t[2], "verification.timestamp")?,
    })
}

pub fn user(value: &Value) -> Result<User> {
    let t = slots(value, 5, "getUser")?;
    Ok(User {
        address: as_str(&t[0], "user.address")?,
        name: as_str(&t[1], "user.name")?,
        role: Role::from_code(as_u64(&t[2], "user.role")?),
        is_active: as_bool(&t[3], "user.isActive")?,
        created: as_u64(&t[4], "user.createdDate")?,
    })
}

pub fn user_rows(value: &Value) -> Result<Vec<User>> {
    let cols = columns(value, 5, "getUsers")?;
    (0..cols[0].len())
        .map(|i| {
            Ok(User {
                address: as_str(&cols[0][i], "users.address")?,
                name: as_str(&cols[1][i], "users.name")?,
                role: Role::from_code(as_u64(&cols[2][i], "users.role")?),
                is_active: as_bool(&cols[3][i], "users.isActive")?,
                created: as_u64(&cols[4][i], "users.createdDate")?,
            })
        })
        .collect()
}

pub fn course_rows(value: &Value) -> Result<Vec<Course>> {
    let cols = columns(value, 3, "getCourses")?;
    (0..cols[0].len())
        .map(|i| {
            Ok(Course {
                id: as_u64(&cols[0][i], "courses.id")?,
                name: as_str(&cols[1][i], "courses.name")?,
                is_active: as_bool(&cols[2][i], "courses.isActive")?,
            })
        })
        .collect()
}

pub fn teacher_course_rows(value: &Value) -> Result<Vec<TeacherCourse>> {
    let cols = columns(value, 2, "getTeacherCourses")?;
    (0..cols[0].len())
        .map(|i| {
            Ok(TeacherCourse {
                id: as_u64(&cols[0][i], "teacherCourses.id")?,
                name: as_str(&cols[1][i], "teacherCourses.name")?,
            })
        })
        .collect()
}

pub fn audit_log(value: &Value) -> Result<AuditLogEntry> {
    let t = slots(value, 5, "getAuditLog")?;
    Ok(AuditLogEntry {
        id: as_u64(&t[0], "auditLog.id")?,
        actor: as_str(&t[1], "auditLog.actor")?,
        action: as_str(&t[2], "auditLog.action")?,
        certificate_id: as_u64(&t[3], "auditLog.certificateId")?,
        timestamp: as_u64(&t[4], "auditLog.timestamp")?,
    })
}
