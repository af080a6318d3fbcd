use crate::components::calendar::models::CalendarEvent;
use crate::components::calendar::CalendarApi;
use crate::components::case_sync::models::{
    CaseField, CaseMutation, CaseMutationKind, CasePatch, SurgicalCase, SyncOrigin,
};
use crate::components::case_sync::store::CaseStore;
use crate::error::SyncResult;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, warn};

/// One-way case-to-calendar synchronization for the active user.
///
/// The case record is the source of truth and the calendar a
/// best-effort mirror: every calendar failure is downgraded to a
/// warning here, so case CRUD never fails or rolls back because the
/// mirror did.
pub struct SyncOrchestrator {
    calendar: Arc<dyn CalendarApi>,
    cases: Arc<dyn CaseStore>,
    zone: Tz,
}

impl SyncOrchestrator {
    pub fn new(calendar: Arc<dyn CalendarApi>, cases: Arc<dyn CaseStore>, zone: Tz) -> Self {
        Self {
            calendar,
            cases,
            zone,
        }
    }

    /// Single entry point for case mutations.
    ///
    /// Sync-originated mutations return immediately: the id-persisting
    /// write this orchestrator issues after a create comes back through
    /// here tagged `SyncInitiated` and must not loop.
    pub async fn handle_mutation(&self, mutation: CaseMutation) {
        if mutation.origin == SyncOrigin::SyncInitiated {
            return;
        }

        let case_id = mutation.case_id().to_string();
        let result = match mutation.kind {
            CaseMutationKind::Created(case) => self.on_case_created(&case).await,
            CaseMutationKind::Updated(case, changed_fields) => {
                self.on_case_updated(&case, &changed_fields).await
            }
            CaseMutationKind::Deleted {
                calendar_event_id, ..
            } => self.on_case_deleted(&case_id, calendar_event_id.as_deref()).await,
            CaseMutationKind::InvitationAccepted(case) => {
                self.on_invitation_accepted(&case).await
            }
        };

        if let Err(e) = result {
            // The case write is already committed; the mirror catches up
            // on a later mutation or not at all
            warn!("Calendar sync failed for case {}: {:?}", case_id, e);
        }
    }

    /// Mirror a new case into the calendar
    async fn on_case_created(&self, case: &SurgicalCase) -> SyncResult<()> {
        let event = match case.to_calendar_event(self.zone)? {
            Some(event) => event,
            None => {
                debug!("Case {} has no surgery time; nothing to mirror", case.id);
                return Ok(());
            }
        };

        self.create_and_link(case, event).await
    }

    /// Push calendar-relevant case edits to the mirror event
    async fn on_case_updated(&self, case: &SurgicalCase, changed_fields: &[CaseField]) -> SyncResult<()> {
        if !changed_fields.iter().any(CaseField::affects_calendar) {
            return Ok(());
        }

        let event = match case.to_calendar_event(self.zone)? {
            Some(event) => event,
            None => {
                debug!("Case {} has no surgery time; nothing to mirror", case.id);
                return Ok(());
            }
        };

        match case.calendar_event_id.as_deref() {
            // Linked: full replace of the existing event
            Some(event_id) => self.calendar.update_event(event_id, event).await,
            // Unlinked, e.g. the case was created while disconnected
            None => self.create_and_link(case, event).await,
        }
    }

    /// Best-effort removal of the mirror event; runs before the host
    /// drops the case record, and the deletion proceeds regardless
    async fn on_case_deleted(&self, case_id: &str, event_id: Option<&str>) -> SyncResult<()> {
        let event_id = match event_id {
            Some(id) => id,
            None => {
                debug!("Case {} was never linked to an event", case_id);
                return Ok(());
            }
        };

        self.calendar.delete_event(event_id).await
    }

    /// A second participant accepted collaboration: mirror the case into
    /// the accepting user's own calendar. This orchestrator is bound to
    /// the active user, so the event is independent of the inviter's.
    async fn on_invitation_accepted(&self, case: &SurgicalCase) -> SyncResult<()> {
        self.on_case_created(case).await
    }

    async fn create_and_link(&self, case: &SurgicalCase, event: CalendarEvent) -> SyncResult<()> {
        let event_id = self.calendar.create_event(event).await?;

        self.cases
            .update_case(
                &case.id,
                CasePatch {
                    calendar_event_id: Some(event_id),
                },
                SyncOrigin::SyncInitiated,
            )
            .await
    }
}
