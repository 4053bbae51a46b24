//! Registry client - the single point of contact with the certificate ledger
//!
//! Every other part of the application goes through this component. It owns
//! no domain state beyond the connected account and the memoized contract
//! binding; every view is re-fetched on demand and rendered from transient
//! copies.

use std::sync::{Arc, OnceLock, RwLock};

use futures_util::future::join_all;
use serde_json::{json, Value};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::ledger::decode::{self, ContractRevision};
use crate::ledger::transport::{LedgerTransport, TxReceipt};
use crate::ledger::wallet::WalletProvider;
use crate::models::{
    is_zero_address, AuditLogEntry, Certificate, CertificateSummary, Course, CourseCertificate,
    IssueCertificateRequest, IssuedCertificate, Page, Role, Student, TeacherCourse, User,
    VerificationStatus, PROTECTED_COURSE_ID_MAX,
};
use crate::uploader::MetadataUploader;

/// Batch size used when aggregating the full student list client-side
pub const STUDENT_BATCH_SIZE: u64 = 100;

const ISSUED_EVENT: &str = "CertificateIssued";

/// Contract handle, bound once and kept across disconnects so reconnecting
/// is cheap.
struct ContractBinding {
    address: String,
    revision: ContractRevision,
}

pub struct RegistryClient {
    transport: Arc<dyn LedgerTransport>,
    wallet: Arc<dyn WalletProvider>,
    uploader: Box<dyn MetadataUploader>,
    config: RegistryConfig,
    binding: OnceLock<ContractBinding>,
    account: RwLock<Option<String>>,
}

/// Effective page for a 1-indexed paginated read: never past the last page,
/// never below 1.
pub fn effective_page(page: u64, total: u64, page_size: u64) -> u64 {
    let last = total.div_ceil(page_size.max(1)).max(1);
    page.max(1).min(last)
}

impl RegistryClient {
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        wallet: Arc<dyn WalletProvider>,
        uploader: Box<dyn MetadataUploader>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            transport,
            wallet,
            uploader,
            config,
            binding: OnceLock::new(),
            account: RwLock::new(None),
        }
    }

    // ===== Connection lifecycle =====

    /// Request account access from the wallet provider. The contract binding
    /// is initialized on first connect and reused afterwards.
    pub async fn connect(&self) -> Result<String> {
        let accounts = self.wallet.request_accounts().await?;
        let primary = accounts
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::remote("wallet returned no accounts"))?;

        self.binding.get_or_init(|| ContractBinding {
            address: self.config.contract_address.clone(),
            revision: self.config.contract_revision,
        });

        *self.account.write().expect("account lock poisoned") = Some(primary.clone());
        tracing::info!(account = %primary, "wallet connected");
        Ok(primary)
    }

    /// Best-effort provider disconnect, then clear the local account. The
    /// contract binding is kept so a later reconnect skips initialization.
    pub async fn disconnect(&self) {
        match self.wallet.disconnect().await {
            Ok(true) => tracing::info!("wallet provider disconnected"),
            Ok(false) => {}
            Err(err) => tracing::debug!(error = %err, "ignoring provider disconnect failure"),
        }
        *self.account.write().expect("account lock poisoned") = None;
    }

    pub fn current_account(&self) -> Option<String> {
        self.account.read().expect("account lock poisoned").clone()
    }

    /// True once the contract binding exists, i.e. after the first connect.
    pub fn is_initialized(&self) -> bool {
        self.binding.get().is_some()
    }

    fn binding(&self) -> Result<&ContractBinding> {
        self.binding.get().ok_or(RegistryError::NotConnected)
    }

    fn signer(&self) -> Result<String> {
        self.account
            .read()
            .expect("account lock poisoned")
            .clone()
            .ok_or(RegistryError::NotConnected)
    }

    fn revision(&self) -> Result<ContractRevision> {
        Ok(self.binding()?.revision)
    }

    async fn view(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let binding = self.binding()?;
        self.transport.call(&binding.address, method, args).await
    }

    async fn transact(&self, method: &str, args: Vec<Value>) -> Result<TxReceipt> {
        let binding = self.binding()?;
        let from = self.signer()?;
        self.transport
            .submit(&binding.address, &from, method, args)
            .await
    }

    /// Total-count read followed by a clamped page fetch. A total of zero
    /// short-circuits without touching the paginated accessor.
    async fn fetch_page(
        &self,
        total_method: &str,
        list_method: &str,
        leading_args: Vec<Value>,
        page: u64,
        page_size: u64,
    ) -> Result<(u64, u64, Option<Value>)> {
        let page_size = page_size.max(1);
        let total = decode::scalar_u64(&self.view(total_method, vec![]).await?, total_method)?;
        if total == 0 {
            return Ok((0, 1, None));
        }

        let effective = effective_page(page, total, page_size);
        let mut args = leading_args;
        args.push(json!(effective));
        args.push(json!(page_size));
        let raw = self.view(list_method, args).await?;
        Ok((total, effective, Some(raw)))
    }

    // ===== Users =====

    pub async fn total_users(&self) -> Result<u64> {
        decode::scalar_u64(&self.view("getTotalUsers", vec![]).await?, "getTotalUsers")
    }

    pub async fn get_user(&self, address: &str) -> Result<User> {
        let raw = self.view("getUser", vec![json!(address)]).await?;
        let user = decode::user(&raw)?;
        if is_zero_address(&user.address) {
            return Err(RegistryError::not_found("user"));
        }
        Ok(user)
    }

    pub async fn get_users(&self, page: u64, page_size: u64) -> Result<Page<User>> {
        let page_size = page_size.max(1);
        let (total, effective, raw) = self
            .fetch_page("getTotalUsers", "getUsers", vec![], page, page_size)
            .await?;
        let Some(raw) = raw else {
            return Ok(Page::empty(page_size));
        };

        // Empty trailing slots come back as the zero address.
        let items = decode::user_rows(&raw)?
            .into_iter()
            .filter(|user| !is_zero_address(&user.address))
            .collect();
        Ok(Page {
            items,
            total,
            page: effective,
            page_size,
        })
    }

    /// Client-side aggregate standing in for a bulk query the contract does
    /// not offer: page through the full user set and keep active students.
    pub async fn get_all_students(&self) -> Result<Vec<Student>> {
        let total = self.total_users().await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let pages = total.div_ceil(STUDENT_BATCH_SIZE);
        let mut students = Vec::new();
        for page in 1..=pages {
            let raw = self
                .view("getUsers", vec![json!(page), json!(STUDENT_BATCH_SIZE)])
                .await?;
            for user in decode::user_rows(&raw)? {
                if user.role == Role::Student && user.is_active && !is_zero_address(&user.address)
                {
                    students.push(Student {
                        address: user.address,
                        name: user.name,
                    });
                }
            }
        }
        Ok(students)
    }

    /// Roles the client will ever submit. Promotion to ADMIN is never
    /// offered; unknown codes are refused outright.
    pub fn can_assign_role(&self, role_code: u64) -> bool {
        matches!(
            Role::from_code(role_code),
            Role::None | Role::Teacher | Role::Student
        )
    }

    fn ensure_assignable(&self, role_code: u64) -> Result<()> {
        if !self.can_assign_role(role_code) {
            return Err(RegistryError::Policy(format!(
                "role {} cannot be assigned from this client",
                Role::from_code(role_code).name()
            )));
        }
        Ok(())
    }

    pub async fn add_user(&self, address: &str, name: &str, role_code: u64) -> Result<String> {
        self.ensure_assignable(role_code)?;
        let receipt = self
            .transact(
                "addUser",
                vec![json!(address), json!(name), json!(role_code)],
            )
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn update_user_role(&self, address: &str, new_role_code: u64) -> Result<String> {
        self.ensure_assignable(new_role_code)?;
        let receipt = self
            .transact("updateUserRole", vec![json!(address), json!(new_role_code)])
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn deactivate_user(&self, address: &str) -> Result<String> {
        let receipt = self.transact("deactivateUser", vec![json!(address)]).await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn reactivate_user(&self, address: &str) -> Result<String> {
        let receipt = self.transact("reactivateUser", vec![json!(address)]).await?;
        Ok(receipt.transaction_hash)
    }

    // ===== Certificates =====

    pub async fn total_certificates(&self) -> Result<u64> {
        decode::scalar_u64(
            &self.view("getTotalCertificates", vec![]).await?,
            "getTotalCertificates",
        )
    }

    /// Submit an issuance transaction and read the new certificate id out of
    /// the emitted event. A receipt without the event is an error, never a
    /// fabricated id.
    pub async fn issue_certificate(
        &self,
        student_address: &str,
        course_id: u64,
        issue_date: &str,
        extra_info: &str,
        ipfs_hash: &str,
    ) -> Result<IssuedCertificate> {
        let receipt = self
            .transact(
                "issueCertificate",
                vec![
                    json!(student_address),
                    json!(course_id),
                    json!(issue_date),
                    json!(extra_info),
                    json!(ipfs_hash),
                ],
            )
            .await?;

        let event = receipt.event(ISSUED_EVENT).ok_or_else(|| {
            RegistryError::remote(format!(
                "transaction {} carried no {ISSUED_EVENT} event",
                receipt.transaction_hash
            ))
        })?;
        let certificate_id = event
            .values
            .first()
            .ok_or_else(|| RegistryError::remote(format!("{ISSUED_EVENT} event carried no id")))
            .and_then(|value| decode::scalar_u64(value, "issuedCertificate.id"))?;

        Ok(IssuedCertificate {
            certificate_id,
            tx_hash: receipt.transaction_hash,
        })
    }

    /// Issuance with an optional off-ledger metadata blob. Upload failure is
    /// a warning, not a blocker: the certificate goes out with an empty hash.
    pub async fn issue_certificate_with_metadata(
        &self,
        request: &IssueCertificateRequest,
    ) -> Result<IssuedCertificate> {
        let metadata = json!({
            "studentAddress": request.student_address,
            "studentName": request.student_name,
            "courseId": request.course_id,
            "issueDate": request.issue_date,
            "extraInfo": request.extra_info,
        });
        let ipfs_hash = match self.uploader.upload(&metadata).await {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(error = %err, "metadata upload failed, issuing with empty hash");
                String::new()
            }
        };

        self.issue_certificate(
            &request.student_address,
            request.course_id,
            &request.issue_date,
            &request.extra_info,
            &ipfs_hash,
        )
        .await
    }

    pub async fn get_certificate(&self, id: u64) -> Result<Certificate> {
        let revision = self.revision()?;
        let raw = self.view("getCertificate", vec![json!(id)]).await?;
        let certificate = decode::certificate(revision, &raw)?;
        // id 0 is the contract's "no such certificate" sentinel
        if certificate.id == 0 {
            return Err(RegistryError::not_found("certificate"));
        }
        Ok(certificate)
    }

    pub async fn get_certificates(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<Page<CertificateSummary>> {
        let page_size = page_size.max(1);
        let (total, effective, raw) = self
            .fetch_page(
                "getTotalCertificates",
                "getCertificates",
                vec![],
                page,
                page_size,
            )
            .await?;
        let Some(raw) = raw else {
            return Ok(Page::empty(page_size));
        };

        let items = decode::certificate_rows(&raw)?
            .into_iter()
            .filter(|row| row.id != 0)
            .collect();
        Ok(Page {
            items,
            total,
            page: effective,
            page_size,
        })
    }

    pub async fn get_certificates_by_course(
        &self,
        course_id: u64,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<CourseCertificate>> {
        let raw = self
            .view(
                "getCertificatesByCourse",
                vec![json!(course_id), json!(page.max(1)), json!(page_size.max(1))],
            )
            .await?;
        Ok(decode::course_certificate_rows(&raw)?
            .into_iter()
            .filter(|row| row.id != 0)
            .collect())
    }

    /// Verification is monotonic on the ledger; re-verifying is either
    /// accepted or rejected remotely, and a rejection surfaces as a normal
    /// remote-call error.
    pub async fn verify_certificate(&self, id: u64) -> Result<String> {
        let receipt = self.transact("verifyCertificate", vec![json!(id)]).await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn verification_status(&self, id: u64) -> Result<VerificationStatus> {
        let raw = self
            .view("getCertificateVerificationStatus", vec![json!(id)])
            .await?;
        decode::verification_status(&raw)
    }

    // ===== Courses =====

    pub async fn total_courses(&self) -> Result<u64> {
        decode::scalar_u64(
            &self.view("getTotalCourses", vec![]).await?,
            "getTotalCourses",
        )
    }

    pub async fn add_course(&self, name: &str) -> Result<String> {
        let receipt = self.transact("addCourse", vec![json!(name)]).await?;
        Ok(receipt.transaction_hash)
    }

    /// Seed courses (ids 1..=3) are never offered a deactivate action.
    pub fn can_deactivate_course(&self, course_id: u64) -> bool {
        course_id > PROTECTED_COURSE_ID_MAX
    }

    pub async fn deactivate_course(&self, course_id: u64) -> Result<String> {
        if !self.can_deactivate_course(course_id) {
            return Err(RegistryError::Policy(format!(
                "course {course_id} is a protected seed course"
            )));
        }
        let receipt = self
            .transact("deactivateCourse", vec![json!(course_id)])
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn activate_course(&self, course_id: u64) -> Result<String> {
        let receipt = self
            .transact("activateCourse", vec![json!(course_id)])
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn get_courses(&self, page: u64, page_size: u64) -> Result<Page<Course>> {
        let page_size = page_size.max(1);
        let (total, effective, raw) = self
            .fetch_page("getTotalCourses", "getCourses", vec![], page, page_size)
            .await?;
        let Some(raw) = raw else {
            return Ok(Page::empty(page_size));
        };

        let items = decode::course_rows(&raw)?
            .into_iter()
            .filter(|course| course.id != 0)
            .collect();
        Ok(Page {
            items,
            total,
            page: effective,
            page_size,
        })
    }

    // ===== Teacher-course assignments =====

    pub async fn assign_teacher(&self, teacher: &str, course_id: u64) -> Result<String> {
        let receipt = self
            .transact(
                "assignTeacherToCourse",
                vec![json!(teacher), json!(course_id)],
            )
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn revoke_teacher(&self, teacher: &str, course_id: u64) -> Result<String> {
        let receipt = self
            .transact(
                "revokeTeacherFromCourse",
                vec![json!(teacher), json!(course_id)],
            )
            .await?;
        Ok(receipt.transaction_hash)
    }

    pub async fn is_teacher_assigned(&self, teacher: &str, course_id: u64) -> Result<bool> {
        let raw = self
            .view(
                "isTeacherAssignedToCourse",
                vec![json!(teacher), json!(course_id)],
            )
            .await?;
        decode::scalar_bool(&raw, "isTeacherAssignedToCourse")
    }

    /// The interface has no bulk assignment query, so checkbox state is
    /// probed per (teacher, course) pair. Probes run in parallel; a failed
    /// probe is logged and excluded rather than failing the whole view.
    pub async fn assignment_matrix(
        &self,
        teacher: &str,
        course_ids: &[u64],
    ) -> Result<Vec<(u64, bool)>> {
        self.binding()?;
        let probes = course_ids
            .iter()
            .map(|&course_id| async move {
                match self.is_teacher_assigned(teacher, course_id).await {
                    Ok(assigned) => Some((course_id, assigned)),
                    Err(err) => {
                        tracing::warn!(course_id, error = %err, "assignment probe failed, skipping");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        Ok(join_all(probes).await.into_iter().flatten().collect())
    }

    pub async fn get_teacher_courses(
        &self,
        teacher: &str,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<TeacherCourse>> {
        let raw = self
            .view(
                "getTeacherCourses",
                vec![json!(teacher), json!(page.max(1)), json!(page_size.max(1))],
            )
            .await?;
        Ok(decode::teacher_course_rows(&raw)?
            .into_iter()
            .filter(|course| course.id != 0)
            .collect())
    }

    // ===== Audit log =====

    pub async fn total_audit_logs(&self) -> Result<u64> {
        decode::scalar_u64(
            &self.view("getTotalAuditLogs", vec![]).await?,
            "getTotalAuditLogs",
        )
    }

    pub async fn get_audit_log(&self, log_id: u64) -> Result<AuditLogEntry> {
        let raw = self.view("getAuditLog", vec![json!(log_id)]).await?;
        let entry = decode::audit_log(&raw)?;
        if entry.id == 0 {
            return Err(RegistryError::not_found("audit log"));
        }
        Ok(entry)
    }

    /// Trailing window of the append-only log, newest first. One failed
    /// fetch inside the window leaves a gap instead of aborting the view.
    pub async fn recent_audit_logs(&self, window: u64) -> Result<Vec<AuditLogEntry>> {
        let total = self.total_audit_logs().await?;
        if total == 0 || window == 0 {
            return Ok(Vec::new());
        }

        let start = total.saturating_sub(window - 1).max(1);
        let mut entries = Vec::new();
        for log_id in start..=total {
            match self.get_audit_log(log_id).await {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(log_id, error = %err, "audit log fetch failed, skipping");
                }
            }
        }
        entries.reverse();
        Ok(entries)
    }

    // ===== Statistics =====

    pub async fn course_statistic(&self, course_name: &str) -> Result<u64> {
        decode::scalar_u64(
            &self
                .view("getCourseStatistic", vec![json!(course_name)])
                .await?,
            "getCourseStatistic",
        )
    }

    pub async fn teacher_statistic(&self, teacher: &str) -> Result<u64> {
        decode::scalar_u64(
            &self
                .view("getTeacherStatistic", vec![json!(teacher)])
                .await?,
            "getTeacherStatistic",
        )
    }

    pub fn audit_window(&self) -> u64 {
        self.config.audit_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::transport::TxEvent;
    use crate::testing::{
        test_config, MockTransport, StaticWallet, STUDENT_ADDR, TEACHER_ADDR, ZERO_ADDR,
    };
    use crate::uploader::NoopUploader;
    use async_trait::async_trait;

    fn client(transport: Arc<MockTransport>) -> RegistryClient {
        RegistryClient::new(
            transport,
            Arc::new(StaticWallet {
                accounts: vec![TEACHER_ADDR.to_string()],
            }),
            Box::new(NoopUploader),
            test_config(),
        )
    }

    async fn connected(transport: Arc<MockTransport>) -> RegistryClient {
        let c = client(transport);
        c.connect().await.unwrap();
        c
    }

    fn user_columns(rows: &[(&str, &str, u64, bool)]) -> Value {
        json!([
            rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            rows.iter().map(|_| 1714550400u64).collect::<Vec<_>>(),
        ])
    }

    fn issued_receipt(id: u64) -> TxReceipt {
        TxReceipt {
            transaction_hash: "0xabc123".to_string(),
            status: true,
            events: vec![TxEvent {
                name: ISSUED_EVENT.to_string(),
                values: vec![json!(id)],
            }],
        }
    }

    #[test]
    fn clamp_rule_matches_specified_example() {
        assert_eq!(effective_page(10, 12, 5), 3);
        assert_eq!(effective_page(1, 12, 5), 1);
        assert_eq!(effective_page(0, 12, 5), 1);
        assert_eq!(effective_page(7, 0, 5), 1);
        assert_eq!(effective_page(2, 5, 5), 1);
        assert_eq!(effective_page(2, 6, 5), 2);
    }

    #[tokio::test]
    async fn reads_fail_before_first_connect() {
        let transport = Arc::new(MockTransport::default());
        let c = client(transport);
        let err = c.get_certificate(1).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_keeps_reads_working_but_blocks_writes() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalCertificates", json!([0]));
        let c = connected(Arc::clone(&transport)).await;

        c.disconnect().await;
        assert_eq!(c.current_account(), None);

        // binding survives the disconnect
        assert_eq!(c.total_certificates().await.unwrap(), 0);
        let err = c.add_course("Algorithms").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotConnected));
    }

    #[tokio::test]
    async fn certificate_list_skips_paginated_read_when_empty() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalCertificates", json!([0]));
        let c = connected(Arc::clone(&transport)).await;

        let page = c.get_certificates(1, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(transport.view_calls("getCertificates"), 0);
    }

    #[tokio::test]
    async fn certificate_page_request_is_clamped() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalCertificates", json!([12]));
        transport.stub(
            "getCertificates",
            json!([3, 5]),
            json!([
                [11, 12],
                ["Alice", "Bob"],
                ["Algorithms", "Databases"],
                [STUDENT_ADDR, STUDENT_ADDR],
                [1714550400u64, 1714550401u64]
            ]),
        );
        let c = connected(Arc::clone(&transport)).await;

        let page = c.get_certificates(10, 5).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 2);
        assert_eq!(
            transport.last_view_args("getCertificates").unwrap(),
            vec![json!(3), json!(5)]
        );
    }

    #[tokio::test]
    async fn absent_certificate_surfaces_as_not_found() {
        let transport = Arc::new(MockTransport::default());
        transport.stub(
            "getCertificate",
            json!([42]),
            json!([0, "", "", 0, "", "", "", ZERO_ADDR, "", false, 0]),
        );
        let c = connected(Arc::clone(&transport)).await;

        let err = c.get_certificate(42).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn issuance_extracts_id_from_emitted_event() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_receipt(issued_receipt(17));
        let c = connected(Arc::clone(&transport)).await;

        let issued = c
            .issue_certificate(STUDENT_ADDR, 7, "2026-05-01", "", "")
            .await
            .unwrap();
        assert_eq!(issued.certificate_id, 17);
        assert_eq!(issued.tx_hash, "0xabc123");
    }

    #[tokio::test]
    async fn issuance_fails_loudly_when_event_is_missing() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_receipt(TxReceipt {
            transaction_hash: "0xdead".to_string(),
            status: true,
            events: vec![],
        });
        let c = connected(Arc::clone(&transport)).await;

        let err = c
            .issue_certificate(STUDENT_ADDR, 7, "2026-05-01", "", "")
            .await
            .unwrap_err();
        assert!(err.to_string().contains(ISSUED_EVENT));
    }

    #[tokio::test]
    async fn repeat_verification_is_idempotent_or_a_plain_remote_error() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_receipt(TxReceipt {
            transaction_hash: "0xv1".to_string(),
            status: true,
            events: vec![],
        });
        let c = connected(Arc::clone(&transport)).await;

        assert!(c.verify_certificate(5).await.is_ok());
        assert!(c.verify_certificate(5).await.is_ok());

        transport.fail_submits();
        let err = c.verify_certificate(5).await.unwrap_err();
        assert!(matches!(err, RegistryError::RemoteCall { .. }));
        assert!(err.to_string().contains("already verified"));
    }

    #[tokio::test]
    async fn all_students_with_zero_users_reads_only_the_total() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalUsers", json!([0]));
        let c = connected(Arc::clone(&transport)).await;

        assert!(c.get_all_students().await.unwrap().is_empty());
        assert_eq!(transport.view_calls("getTotalUsers"), 1);
        assert_eq!(transport.view_calls("getUsers"), 0);
    }

    #[tokio::test]
    async fn all_students_pages_in_fixed_batches() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalUsers", json!([250]));
        transport.stub(
            "getUsers",
            json!([1, 100]),
            user_columns(&[
                (STUDENT_ADDR, "Student One", 3, true),
                (TEACHER_ADDR, "Teacher", 2, true),
            ]),
        );
        transport.stub(
            "getUsers",
            json!([2, 100]),
            user_columns(&[
                ("0x2222222222222222222222222222222222222222", "Inactive", 3, false),
                ("0x3333333333333333333333333333333333333333", "Student Two", 3, true),
            ]),
        );
        transport.stub(
            "getUsers",
            json!([3, 100]),
            user_columns(&[
                ("0x4444444444444444444444444444444444444444", "Student Three", 3, true),
                (ZERO_ADDR, "", 0, false),
            ]),
        );
        let c = connected(Arc::clone(&transport)).await;

        let students = c.get_all_students().await.unwrap();
        assert_eq!(transport.view_calls("getUsers"), 3);
        let names: Vec<&str> = students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Student One", "Student Two", "Student Three"]);
    }

    #[tokio::test]
    async fn user_pages_filter_sentinel_slots() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalUsers", json!([2]));
        transport.stub(
            "getUsers",
            json!([1, 10]),
            user_columns(&[
                (STUDENT_ADDR, "Student One", 3, true),
                (ZERO_ADDR, "", 0, false),
            ]),
        );
        let c = connected(Arc::clone(&transport)).await;

        let page = c.get_users(1, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Student One");
    }

    #[tokio::test]
    async fn admin_promotion_is_refused_without_a_transaction() {
        let transport = Arc::new(MockTransport::default());
        let c = connected(Arc::clone(&transport)).await;

        assert!(!c.can_assign_role(1));
        assert!(c.can_assign_role(2));
        assert!(c.can_assign_role(3));
        assert!(!c.can_assign_role(9));

        let err = c.update_user_role(STUDENT_ADDR, 1).await.unwrap_err();
        assert!(matches!(err, RegistryError::Policy(_)));
        assert_eq!(transport.submit_calls(), 0);
    }

    #[tokio::test]
    async fn protected_courses_cannot_be_deactivated() {
        let transport = Arc::new(MockTransport::default());
        let c = connected(Arc::clone(&transport)).await;

        assert!(!c.can_deactivate_course(1));
        assert!(!c.can_deactivate_course(3));
        assert!(c.can_deactivate_course(4));

        let err = c.deactivate_course(2).await.unwrap_err();
        assert!(matches!(err, RegistryError::Policy(_)));
        assert_eq!(transport.submit_calls(), 0);

        transport.stub_receipt(issued_receipt(0));
        assert!(c.deactivate_course(4).await.is_ok());
        assert_eq!(transport.submit_calls(), 1);
    }

    #[tokio::test]
    async fn audit_window_tolerates_a_failed_entry() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalAuditLogs", json!([5]));
        for id in [3u64, 5u64] {
            transport.stub(
                "getAuditLog",
                json!([id]),
                json!([id, TEACHER_ADDR, "Certificate Issued", id, 1714550400u64 + id]),
            );
        }
        transport.fail_view("getAuditLog", json!([4]));
        let c = connected(Arc::clone(&transport)).await;

        let entries = c.recent_audit_logs(3).await.unwrap();
        let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        // newest first, the failed id 4 is simply a gap
        assert_eq!(ids, vec![5, 3]);
    }

    #[tokio::test]
    async fn audit_window_clamps_to_the_log_start() {
        let transport = Arc::new(MockTransport::default());
        transport.stub_any("getTotalAuditLogs", json!([2]));
        for id in [1u64, 2u64] {
            transport.stub(
                "getAuditLog",
                json!([id]),
                json!([id, TEACHER_ADDR, "User Added", 0, 1714550400u64]),
            );
        }
        let c = connected(Arc::clone(&transport)).await;

        let entries = c.recent_audit_logs(20).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 2);
    }

    #[tokio::test]
    async fn assignment_matrix_skips_failed_probes() {
        let transport = Arc::new(MockTransport::default());
        transport.stub(
            "isTeacherAssignedToCourse",
            json!([TEACHER_ADDR, 1]),
            json!([true]),
        );
        transport.stub(
            "isTeacherAssignedToCourse",
            json!([TEACHER_ADDR, 2]),
            json!([false]),
        );
        transport.fail_view("isTeacherAssignedToCourse", json!([TEACHER_ADDR, 3]));
        let c = connected(Arc::clone(&transport)).await;

        let matrix = c.assignment_matrix(TEACHER_ADDR, &[1, 2, 3]).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert!(matrix.contains(&(1, true)));
        assert!(matrix.contains(&(2, false)));
    }

    #[tokio::test]
    async fn metadata_issuance_survives_uploader_failure() {
        struct FailingUploader;

        #[async_trait]
        impl MetadataUploader for FailingUploader {
            async fn upload(&self, _metadata: &Value) -> Result<String> {
                Err(RegistryError::remote("pinning service unavailable"))
            }
        }

        let transport = Arc::new(MockTransport::default());
        transport.stub_receipt(issued_receipt(9));
        let c = RegistryClient::new(
            Arc::clone(&transport) as Arc<dyn LedgerTransport>,
            Arc::new(StaticWallet {
                accounts: vec![TEACHER_ADDR.to_string()],
            }),
            Box::new(FailingUploader),
            test_config(),
        );
        c.connect().await.unwrap();

        let request = IssueCertificateRequest {
            student_address: STUDENT_ADDR.to_string(),
            course_id: 7,
            issue_date: "2026-05-01".to_string(),
            extra_info: String::new(),
            student_name: "Alice".to_string(),
        };
        let issued = c.issue_certificate_with_metadata(&request).await.unwrap();
        assert_eq!(issued.certificate_id, 9);

        // the issuance transaction went out with an empty hash
        let submits = transport.submit_log.lock().unwrap();
        assert_eq!(submits[0].1[4], json!(""));
    }
}
