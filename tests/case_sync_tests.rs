use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Europe::Helsinki;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use surgisync::components::calendar::models::CalendarEvent;
use surgisync::components::calendar::CalendarApi;
use surgisync::components::case_sync::{
    CaseField, CaseMutation, CaseMutationKind, CasePatch, CaseStore, SurgicalCase,
    SyncOrchestrator, SyncOrigin,
};
use surgisync::error::{operation_error, SyncResult};

/// Calendar double that counts calls and can be told to fail
#[derive(Default)]
struct MockCalendar {
    fail_create: bool,
    fail_delete: bool,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    last_update: Mutex<Option<(String, CalendarEvent)>>,
    deleted_ids: Mutex<Vec<String>>,
}

#[async_trait]
impl CalendarApi for MockCalendar {
    async fn list_events(
        &self,
        _range_start: DateTime<Utc>,
        _range_end: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>> {
        Ok(Vec::new())
    }

    async fn create_event(&self, _event: CalendarEvent) -> SyncResult<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(operation_error("calendar offline"));
        }
        Ok("evt-900".to_string())
    }

    async fn update_event(&self, event_id: &str, event: CalendarEvent) -> SyncResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some((event_id.to_string(), event));
        Ok(())
    }

    async fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(operation_error("calendar offline"));
        }
        self.deleted_ids.lock().unwrap().push(event_id.to_string());
        Ok(())
    }

    async fn check_connection(&self) -> SyncResult<bool> {
        Ok(true)
    }
}

/// Case store double that applies patches and records every write
#[derive(Default)]
struct RecordingCaseStore {
    cases: Mutex<HashMap<String, SurgicalCase>>,
    patches: Mutex<Vec<(String, CasePatch, SyncOrigin)>>,
}

impl RecordingCaseStore {
    fn with_case(case: SurgicalCase) -> Self {
        let store = Self::default();
        store.cases.lock().unwrap().insert(case.id.clone(), case);
        store
    }

    fn stored_event_id(&self, case_id: &str) -> Option<String> {
        self.cases
            .lock()
            .unwrap()
            .get(case_id)
            .and_then(|case| case.calendar_event_id.clone())
    }
}

#[async_trait]
impl CaseStore for RecordingCaseStore {
    async fn get_case(&self, case_id: &str) -> SyncResult<Option<SurgicalCase>> {
        Ok(self.cases.lock().unwrap().get(case_id).cloned())
    }

    async fn update_case(
        &self,
        case_id: &str,
        patch: CasePatch,
        origin: SyncOrigin,
    ) -> SyncResult<()> {
        if let Some(case) = self.cases.lock().unwrap().get_mut(case_id) {
            if let Some(event_id) = &patch.calendar_event_id {
                case.calendar_event_id = Some(event_id.clone());
            }
        }
        self.patches
            .lock()
            .unwrap()
            .push((case_id.to_string(), patch, origin));
        Ok(())
    }

    async fn delete_case(&self, case_id: &str) -> SyncResult<()> {
        self.cases.lock().unwrap().remove(case_id);
        Ok(())
    }
}

fn scheduled_case() -> SurgicalCase {
    SurgicalCase {
        id: "case-17".to_string(),
        patient_name: "Aino Virtanen".to_string(),
        surgery_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        surgery_time: Some("09:00".to_string()),
        surgery_end_time: None,
        hospital_name: "Mehiläinen Töölö".to_string(),
        diagnosis: Some("Meniscus tear".to_string()),
        procedures: vec!["Knee arthroscopy".to_string()],
        calendar_event_id: None,
    }
}

fn user_mutation(kind: CaseMutationKind) -> CaseMutation {
    CaseMutation {
        origin: SyncOrigin::UserInitiated,
        kind,
    }
}

fn orchestrator_over(
    calendar: &Arc<MockCalendar>,
    store: &Arc<RecordingCaseStore>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        Arc::clone(calendar) as Arc<dyn CalendarApi>,
        Arc::clone(store) as Arc<dyn CaseStore>,
        Helsinki,
    )
}

/// A new scheduled case is mirrored and the event id written back
#[tokio::test]
async fn test_created_case_is_mirrored_and_linked() {
    let calendar = Arc::new(MockCalendar::default());
    let store = Arc::new(RecordingCaseStore::with_case(scheduled_case()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Created(scheduled_case())))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 1);

    let patches = store.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    let (case_id, patch, origin) = &patches[0];
    assert_eq!(case_id, "case-17");
    assert_eq!(patch.calendar_event_id.as_deref(), Some("evt-900"));
    assert_eq!(*origin, SyncOrigin::SyncInitiated);
    drop(patches);

    assert_eq!(store.stored_event_id("case-17").as_deref(), Some("evt-900"));
}

/// A case without a surgery time has nothing to put on a calendar
#[tokio::test]
async fn test_unscheduled_case_is_not_mirrored() {
    let calendar = Arc::new(MockCalendar::default());
    let mut case = scheduled_case();
    case.surgery_time = None;
    let store = Arc::new(RecordingCaseStore::with_case(case.clone()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Created(case)))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
    assert!(store.patches.lock().unwrap().is_empty());
}

/// Mutations the orchestrator itself caused are not reacted to
#[tokio::test]
async fn test_sync_initiated_mutations_are_ignored() {
    let calendar = Arc::new(MockCalendar::default());
    let store = Arc::new(RecordingCaseStore::with_case(scheduled_case()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(CaseMutation {
            origin: SyncOrigin::SyncInitiated,
            kind: CaseMutationKind::Created(scheduled_case()),
        })
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
    assert!(store.patches.lock().unwrap().is_empty());
}

/// Case store double that reports every committed write back into the
/// orchestrator, the way the host's mutation pipeline does
struct ReentrantCaseStore {
    case: Mutex<SurgicalCase>,
    patches: Mutex<Vec<(String, CasePatch, SyncOrigin)>>,
    redispatched: AtomicUsize,
    orchestrator: Mutex<Option<Arc<SyncOrchestrator>>>,
}

#[async_trait]
impl CaseStore for ReentrantCaseStore {
    async fn get_case(&self, case_id: &str) -> SyncResult<Option<SurgicalCase>> {
        let case = self.case.lock().unwrap().clone();
        Ok((case.id == case_id).then_some(case))
    }

    async fn update_case(
        &self,
        case_id: &str,
        patch: CasePatch,
        origin: SyncOrigin,
    ) -> SyncResult<()> {
        let updated = {
            let mut case = self.case.lock().unwrap();
            if let Some(event_id) = &patch.calendar_event_id {
                case.calendar_event_id = Some(event_id.clone());
            }
            case.clone()
        };
        self.patches
            .lock()
            .unwrap()
            .push((case_id.to_string(), patch, origin));

        // Every committed write comes back around as a mutation carrying
        // its origin tag
        let orchestrator = self.orchestrator.lock().unwrap().clone();
        if let Some(orchestrator) = orchestrator {
            self.redispatched.fetch_add(1, Ordering::SeqCst);
            orchestrator
                .handle_mutation(CaseMutation {
                    origin,
                    kind: CaseMutationKind::Updated(updated, vec![CaseField::SurgeryTime]),
                })
                .await;
        }
        Ok(())
    }

    async fn delete_case(&self, _case_id: &str) -> SyncResult<()> {
        Ok(())
    }
}

/// Writing the event id back must not re-trigger synchronization, even
/// though the write flows through the same mutation pipeline
#[tokio::test]
async fn test_persisting_the_link_does_not_loop() {
    let calendar = Arc::new(MockCalendar::default());
    let store = Arc::new(ReentrantCaseStore {
        case: Mutex::new(scheduled_case()),
        patches: Mutex::new(Vec::new()),
        redispatched: AtomicUsize::new(0),
        orchestrator: Mutex::new(None),
    });
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&calendar) as Arc<dyn CalendarApi>,
        Arc::clone(&store) as Arc<dyn CaseStore>,
        Helsinki,
    ));
    *store.orchestrator.lock().unwrap() = Some(Arc::clone(&orchestrator));

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Created(scheduled_case())))
        .await;

    // The link write went back through the pipeline exactly once and
    // caused no further calendar traffic
    assert_eq!(store.redispatched.load(Ordering::SeqCst), 1);
    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.patches.lock().unwrap().len(), 1);
}

/// Notes and billing edits never touch the calendar
#[tokio::test]
async fn test_unrelated_edits_stay_off_the_calendar() {
    let calendar = Arc::new(MockCalendar::default());
    let mut case = scheduled_case();
    case.calendar_event_id = Some("evt-1".to_string());
    let store = Arc::new(RecordingCaseStore::with_case(case.clone()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Updated(
            case,
            vec![CaseField::Notes, CaseField::Billing],
        )))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
}

/// A calendar-relevant edit replaces the linked event wholesale
#[tokio::test]
async fn test_relevant_edit_replaces_the_linked_event() {
    let calendar = Arc::new(MockCalendar::default());
    let mut case = scheduled_case();
    case.calendar_event_id = Some("evt-1".to_string());
    case.surgery_time = Some("13:00".to_string());
    let store = Arc::new(RecordingCaseStore::with_case(case.clone()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Updated(
            case,
            vec![CaseField::SurgeryTime],
        )))
        .await;

    assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 1);
    let last_update = calendar.last_update.lock().unwrap();
    let (event_id, event) = last_update.as_ref().expect("an update was sent");
    assert_eq!(event_id, "evt-1");
    assert_eq!(
        event.start.as_ref().unwrap().date_time.as_deref(),
        Some("2025-06-10T13:00:00+03:00")
    );

    // Replacing an existing event writes nothing back to the case
    assert!(store.patches.lock().unwrap().is_empty());
}

/// An edit to a case that was never mirrored creates the event late
#[tokio::test]
async fn test_relevant_edit_links_when_never_mirrored() {
    let calendar = Arc::new(MockCalendar::default());
    let case = scheduled_case();
    let store = Arc::new(RecordingCaseStore::with_case(case.clone()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Updated(
            case,
            vec![CaseField::Hospital],
        )))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.stored_event_id("case-17").as_deref(), Some("evt-900"));
}

/// Deleting a linked case removes its mirror event
#[tokio::test]
async fn test_deleted_case_removes_the_mirror_event() {
    let calendar = Arc::new(MockCalendar::default());
    let store = Arc::new(RecordingCaseStore::default());
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Deleted {
            case_id: "case-17".to_string(),
            calendar_event_id: Some("evt-1".to_string()),
        }))
        .await;

    assert_eq!(calendar.delete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        calendar.deleted_ids.lock().unwrap().as_slice(),
        ["evt-1".to_string()]
    );
}

/// Deleting a case that was never linked makes no calendar calls
#[tokio::test]
async fn test_deleted_case_without_link_makes_no_calls() {
    let calendar = Arc::new(MockCalendar::default());
    let store = Arc::new(RecordingCaseStore::default());
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Deleted {
            case_id: "case-17".to_string(),
            calendar_event_id: None,
        }))
        .await;

    assert_eq!(calendar.delete_calls.load(Ordering::SeqCst), 0);
}

/// A failed mirror removal never blocks deleting the case itself
#[tokio::test]
async fn test_failed_mirror_removal_does_not_block_deletion() {
    let calendar = Arc::new(MockCalendar {
        fail_delete: true,
        ..Default::default()
    });
    let mut case = scheduled_case();
    case.calendar_event_id = Some("evt-1".to_string());
    let store = Arc::new(RecordingCaseStore::with_case(case));
    let orchestrator = orchestrator_over(&calendar, &store);

    // handle_mutation downgrades the failure to a warning
    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Deleted {
            case_id: "case-17".to_string(),
            calendar_event_id: Some("evt-1".to_string()),
        }))
        .await;
    assert_eq!(calendar.delete_calls.load(Ordering::SeqCst), 1);

    // The host then drops the case record regardless
    store.delete_case("case-17").await.unwrap();
    assert!(store.get_case("case-17").await.unwrap().is_none());
}

/// A failed create leaves the case unlinked but otherwise untouched
#[tokio::test]
async fn test_failed_create_leaves_case_usable() {
    let calendar = Arc::new(MockCalendar {
        fail_create: true,
        ..Default::default()
    });
    let store = Arc::new(RecordingCaseStore::with_case(scheduled_case()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::Created(scheduled_case())))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 1);
    assert!(store.patches.lock().unwrap().is_empty());
    assert_eq!(store.stored_event_id("case-17"), None);
}

/// Accepting a collaboration invitation mirrors the case into the
/// accepting user's calendar as a fresh event
#[tokio::test]
async fn test_accepted_invitation_creates_an_independent_event() {
    let calendar = Arc::new(MockCalendar::default());
    let mut case = scheduled_case();
    // The inviter's own mirror event; the accepting user never touches it
    case.calendar_event_id = Some("inviter-evt".to_string());
    let store = Arc::new(RecordingCaseStore::with_case(case.clone()));
    let orchestrator = orchestrator_over(&calendar, &store);

    orchestrator
        .handle_mutation(user_mutation(CaseMutationKind::InvitationAccepted(case)))
        .await;

    assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.stored_event_id("case-17").as_deref(), Some("evt-900"));
}
