//! Teardown: remove every fixture from both orgs.

use leadsync_flow::{LeadStore, SaveResult};
use tracing::{info, instrument, warn};

use crate::fixtures::Fixtures;

/// A teardown step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupIssue {
    pub step: String,
    pub message: String,
}

impl std::fmt::Display for CleanupIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// What teardown removed and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ids deleted from the source org.
    pub source_deleted: Vec<String>,
    /// Ids deleted from the target org.
    pub target_deleted: Vec<String>,
    /// Fixture Emails with no record in the target org.
    pub target_missing: Vec<String>,
    pub errors: Vec<CleanupIssue>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn issue(&mut self, step: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(step, %message, "Cleanup step failed");
        self.errors.push(CleanupIssue {
            step: step.to_string(),
            message,
        });
    }

    fn record_deletes(&mut self, step: &str, ids: &[String], results: &[SaveResult], target: bool) {
        if results.len() != ids.len() {
            self.issue(
                step,
                format!("{} results for {} ids", results.len(), ids.len()),
            );
        }
        for (id, result) in ids.iter().zip(results) {
            if result.success {
                if target {
                    self.target_deleted.push(id.clone());
                } else {
                    self.source_deleted.push(id.clone());
                }
            } else {
                let message = result
                    .error_message()
                    .unwrap_or_else(|| "delete failed".to_string());
                self.issue(step, format!("{id}: {message}"));
            }
        }
    }
}

/// Delete the fixtures: source leads by id, then every fixture Email found in
/// the target. Never fails; problems are collected in the report so one bad
/// step does not stop the rest.
#[instrument(skip_all, fields(source = %source.name(), target = %target.name()))]
pub async fn teardown<S: LeadStore, T: LeadStore>(
    source: &S,
    target: &T,
    fixtures: &Fixtures,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let source_ids = fixtures.source_ids();
    if !source_ids.is_empty() {
        match source.delete_leads(&source_ids).await {
            Ok(results) => report.record_deletes("delete source", &source_ids, &results, false),
            Err(err) => report.issue("delete source", err.to_string()),
        }
    }

    let mut target_ids = Vec::new();
    for email in fixtures.emails() {
        match target.find_by_email(email).await {
            Ok(Some(lead)) => match lead.id {
                Some(id) if !target_ids.contains(&id) => target_ids.push(id),
                Some(_) => {}
                None => report.issue("resolve target", format!("{email}: record has no id")),
            },
            Ok(None) => report.target_missing.push(email.to_string()),
            Err(err) => report.issue("resolve target", format!("{email}: {err}")),
        }
    }

    if !target_ids.is_empty() {
        match target.delete_leads(&target_ids).await {
            Ok(results) => report.record_deletes("delete target", &target_ids, &results, true),
            Err(err) => report.issue("delete target", err.to_string()),
        }
    }

    info!(
        source_deleted = report.source_deleted.len(),
        target_deleted = report.target_deleted.len(),
        target_missing = report.target_missing.len(),
        errors = report.errors.len(),
        "Teardown finished"
    );
    report
}
