//! Moderation reports.
//!
//! Reports index by status so the moderation queue is a single listing.
//! Reviewing a report moves it between status indexes in the same plan as
//! the document merge.

use chrono::Utc;
use tracing::debug;

use super::{collect_index_all, fetch_record, hydrate_records, score_of};
use crate::errors::StoreError;
use crate::id::generate_record_id;
use crate::keys::Keys;
use crate::runtime::{
    Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition, encode_doc, field, record_from_doc,
};
use crate::session::Session;
use crate::types::{Mutation, Report, ReportReason, ReportStatus, User};

pub struct ReportStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> ReportStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    /// Files a report against a post. Duplicate reports from the same user
    /// are allowed; the queue is deduplicated by moderators, not the store.
    pub async fn create(
        &mut self,
        session: &Session,
        post_id: &str,
        reason: ReportReason,
    ) -> Result<Report, StoreError> {
        let report = Report {
            id: generate_record_id(),
            reporter_id: session.user_id().to_string(),
            post_id: post_id.to_string(),
            reason,
            status: ReportStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.post(post_id),
            })
            .command(MutationCommand::PutDoc {
                key: self.keys.report(&report.id),
                fields: encode_doc(&report)?,
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.reports_by_status(ReportStatus::Pending),
                member: report.id.clone(),
                score: score_of(report.created_at),
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(report_id = %report.id, post_id, "filed report");
                Ok(report)
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    pub async fn get(&mut self, report_id: &str) -> Result<Option<Report>, StoreError> {
        fetch_record(&mut self.backend, &self.keys.report(report_id)).await
    }

    /// The moderation queue for one status, newest first. Admin-only.
    pub async fn list_by_status(
        &mut self,
        session: &Session,
        status: ReportStatus,
    ) -> Result<Vec<Report>, StoreError> {
        self.require_admin(session).await?;
        let entries = collect_index_all(&mut self.backend, &self.keys.reports_by_status(status)).await?;
        let keys: Vec<String> = entries.iter().map(|(id, _)| self.keys.report(id)).collect();
        hydrate_records(&mut self.backend, &keys).await
    }

    /// Resolves a report. The reviewer must be an admin; the status switch
    /// and the index move land atomically.
    pub async fn review(
        &mut self,
        session: &Session,
        report_id: &str,
        status: ReportStatus,
    ) -> Result<Mutation<Report>, StoreError> {
        if status == ReportStatus::Pending {
            return Err(StoreError::invalid("a report cannot be reviewed back to pending"));
        }
        self.require_admin(session).await?;

        let current = self
            .get(report_id)
            .await?
            .ok_or_else(|| StoreError::not_found("report", report_id))?;

        let mut next = current.clone();
        next.status = status;
        next.reviewed_at = Some(Utc::now());
        next.reviewed_by = Some(session.user_id().to_string());

        let report_key = self.keys.report(report_id);
        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: report_key.clone(),
            })
            .capture(report_key.clone())
            .command(MutationCommand::MergeDoc {
                key: report_key,
                fields: vec![
                    field("status", &next.status)?,
                    field("reviewed_at", &next.reviewed_at)?,
                    field("reviewed_by", &next.reviewed_by)?,
                ],
            })
            .command(MutationCommand::ZsetRemove {
                key: self.keys.reports_by_status(current.status),
                member: report_id.to_string(),
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.reports_by_status(status),
                member: report_id.to_string(),
                score: score_of(current.created_at),
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { previous } => {
                let previous = match previous {
                    Some(doc) => record_from_doc(doc)?,
                    None => current,
                };
                debug!(report_id, status = status.as_str(), "reviewed report");
                Ok(Mutation {
                    record: next,
                    previous,
                })
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("report", report_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    async fn require_admin(&mut self, session: &Session) -> Result<(), StoreError> {
        let user: User = fetch_record(&mut self.backend, &self.keys.user(session.user_id()))
            .await?
            .ok_or_else(|| StoreError::not_found("user", session.user_id()))?;
        if !user.is_admin {
            return Err(StoreError::forbidden("moderation requires an admin account"));
        }
        Ok(())
    }
}
