//! # Reports
//!
//! Users flag posts, threads or profiles; moderators work through the
//! pending queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use domains::{
    Clock, DomainError, DomainResult, NewReport, PostRepository, ProfileRepository, Report,
    ReportRepository, ReportReview, ReportStatus, ReportType, RequestContext, ThreadRepository,
};

use crate::authz::require_moderator;
use crate::content::optional_text;

const MIN_REASON_CHARS: usize = 3;
const MAX_REASON_CHARS: usize = 500;
const MAX_DETAILS_CHARS: usize = 2000;
const MAX_QUEUE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub reported_type: ReportType,
    pub reported_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub status: ReportStatus,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reports,
            threads,
            posts,
            profiles,
            clock,
        }
    }

    pub async fn file_report(&self, ctx: &RequestContext, input: FileReport) -> DomainResult<Report> {
        let actor = ctx.contributor()?;
        let reason = input.reason.trim();
        let len = reason.chars().count();
        if !(MIN_REASON_CHARS..=MAX_REASON_CHARS).contains(&len) {
            return Err(DomainError::validation(format!(
                "the reason must be between {MIN_REASON_CHARS} and {MAX_REASON_CHARS} characters"
            )));
        }
        let details = optional_text(input.details, "details", MAX_DETAILS_CHARS)?;

        let exists = match input.reported_type {
            ReportType::Post => self.posts.find_post(input.reported_id).await?.is_some(),
            ReportType::Thread => self.threads.find_thread(input.reported_id).await?.is_some(),
            ReportType::Profile => self.profiles.find_profile(input.reported_id).await?.is_some(),
        };
        if !exists {
            return Err(DomainError::not_found(
                input.reported_type.as_str(),
                input.reported_id,
            ));
        }

        let report = self
            .reports
            .insert_report(NewReport {
                id: Uuid::new_v4(),
                reported_type: input.reported_type,
                reported_id: input.reported_id,
                reporter_id: actor.id,
                reason: reason.to_string(),
                details,
                created_at: self.clock.now(),
            })
            .await?;
        info!(
            report_id = %report.id,
            reported_type = %report.reported_type,
            reported_id = %report.reported_id,
            "report filed"
        );
        Ok(report)
    }

    pub async fn pending_reports(
        &self,
        ctx: &RequestContext,
        limit: Option<u32>,
    ) -> DomainResult<Vec<Report>> {
        require_moderator(ctx.actor()?, "read reports")?;
        self.reports
            .pending_reports(limit.unwrap_or(50).clamp(1, MAX_QUEUE))
            .await
    }

    pub async fn review_report(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
        review: ReviewReport,
    ) -> DomainResult<Report> {
        let actor = ctx.actor()?;
        require_moderator(actor, "review reports")?;
        if review.status == ReportStatus::Pending {
            return Err(DomainError::validation(
                "a review must move the report out of pending",
            ));
        }
        let notes = optional_text(review.notes, "review notes", MAX_DETAILS_CHARS)?;

        self.reports
            .find_report(report_id)
            .await?
            .ok_or_else(|| DomainError::not_found("report", report_id))?;

        let report = self
            .reports
            .review_report(
                report_id,
                ReportReview {
                    status: review.status,
                    reviewed_by: actor.id,
                    reviewed_at: self.clock.now(),
                    review_notes: notes,
                },
            )
            .await?;
        info!(%report_id, status = %report.status, reviewer = %actor.id, "report reviewed");
        Ok(report)
    }
}
