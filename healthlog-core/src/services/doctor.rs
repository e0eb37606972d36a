//! Doctor service - database health checks

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::adapters::argon2_hasher::Argon2Hasher;
use crate::adapters::duckdb::DuckDbRepository;
use crate::ports::{PostFilter, Repository};

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = HashMap::new();

        // BMI results whose user row is gone
        let orphaned_bmi = self.repository.orphaned_bmi_results()?;
        checks.insert("orphaned_bmi_results".to_string(), CheckResult {
            status: if orphaned_bmi.is_empty() { "pass" } else { "error" }.to_string(),
            message: if orphaned_bmi.is_empty() {
                "No orphaned BMI results found".to_string()
            } else {
                format!("{} BMI result(s) reference missing users", orphaned_bmi.len())
            },
            details: if orphaned_bmi.is_empty() {
                None
            } else {
                Some(orphaned_bmi.iter().map(|id| json!({"bmi_result_id": id})).collect())
            },
        });

        let orphaned_posts = self.repository.find_posts(&PostFilter::UserId(None))?;
        checks.insert("orphaned_posts".to_string(), CheckResult {
            status: if orphaned_posts.is_empty() { "pass" } else { "warning" }.to_string(),
            message: if orphaned_posts.is_empty() {
                "All posts have an author".to_string()
            } else {
                format!("{} post(s) have no author", orphaned_posts.len())
            },
            details: if orphaned_posts.is_empty() {
                None
            } else {
                Some(orphaned_posts.iter().map(|p| json!({"post_id": p.id})).collect())
            },
        });

        let users = self.repository.list_users()?;

        // Stored passwords must be argon2 PHC strings, never plaintext
        let bad_digests: Vec<i64> = users
            .iter()
            .filter(|u| !Argon2Hasher::is_digest(&u.password))
            .filter_map(|u| u.id)
            .collect();
        checks.insert("password_digests".to_string(), CheckResult {
            status: if bad_digests.is_empty() { "pass" } else { "error" }.to_string(),
            message: if bad_digests.is_empty() {
                "All passwords are stored as Argon2 digests".to_string()
            } else {
                format!("{} user(s) have a password that is not an Argon2 digest", bad_digests.len())
            },
            details: if bad_digests.is_empty() {
                None
            } else {
                Some(bad_digests.iter().map(|id| json!({"user_id": id})).collect())
            },
        });

        // The unique index is case sensitive
        let mut by_email: HashMap<String, Vec<i64>> = HashMap::new();
        for user in &users {
            if let Some(id) = user.id {
                by_email.entry(user.email.to_lowercase()).or_default().push(id);
            }
        }
        let mut duplicates: Vec<(String, Vec<i64>)> =
            by_email.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
        duplicates.sort();
        checks.insert("duplicate_emails".to_string(), CheckResult {
            status: if duplicates.is_empty() { "pass" } else { "warning" }.to_string(),
            message: if duplicates.is_empty() {
                "No duplicate emails found".to_string()
            } else {
                format!("{} email(s) are shared by accounts differing only in case", duplicates.len())
            },
            details: if duplicates.is_empty() {
                None
            } else {
                Some(duplicates.iter().map(|(_, ids)| json!({"user_ids": ids})).collect())
            },
        });

        // Calculate summary
        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary { passed, warnings, errors },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
