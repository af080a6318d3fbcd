use crate::components::calendar::models::CalendarEvent;
use crate::components::calendar::time::{event_datetime, event_window};
use crate::error::SyncResult;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Who caused a case mutation.
///
/// The orchestrator only reacts to `UserInitiated` mutations and tags
/// every write it issues itself as `SyncInitiated`, so persisting a new
/// event id can never re-trigger synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOrigin {
    UserInitiated,
    SyncInitiated,
}

/// Case fields the host can report as changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseField {
    PatientName,
    SurgeryDate,
    SurgeryTime,
    SurgeryEndTime,
    Hospital,
    Diagnosis,
    Procedures,
    Notes,
    Billing,
}

impl CaseField {
    /// Whether a change to this field must reach the calendar
    pub fn affects_calendar(&self) -> bool {
        matches!(
            self,
            CaseField::PatientName
                | CaseField::SurgeryDate
                | CaseField::SurgeryTime
                | CaseField::SurgeryEndTime
                | CaseField::Hospital
                | CaseField::Diagnosis
                | CaseField::Procedures
        )
    }
}

/// The subset of a surgical case this subsystem consumes.
///
/// `calendar_event_id` is a weak back-reference: it locates the mirror
/// event when one exists, and a missing or stale value is a recoverable
/// state, never an integrity failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgicalCase {
    pub id: String,
    pub patient_name: String,
    pub surgery_date: NaiveDate,
    /// Wall-clock HH:MM in the clinic timezone; unset means unscheduled
    pub surgery_time: Option<String>,
    pub surgery_end_time: Option<String>,
    pub hospital_name: String,
    pub diagnosis: Option<String>,
    pub procedures: Vec<String>,
    pub calendar_event_id: Option<String>,
}

impl SurgicalCase {
    /// Build the event body mirroring this case, or `None` when the case
    /// has no surgery time yet and so nothing to put on a calendar
    pub fn to_calendar_event(&self, zone: Tz) -> SyncResult<Option<CalendarEvent>> {
        let start_time = match self.surgery_time.as_deref() {
            Some(time) => time,
            None => return Ok(None),
        };

        let (start, end) = event_window(
            zone,
            self.surgery_date,
            start_time,
            self.surgery_end_time.as_deref(),
        )?;

        let summary = if self.procedures.is_empty() {
            format!("Surgery: {}", self.patient_name)
        } else {
            format!("{}: {}", self.procedures.join(", "), self.patient_name)
        };

        let mut description_parts = Vec::new();
        if let Some(diagnosis) = &self.diagnosis {
            description_parts.push(format!("Diagnosis: {}", diagnosis));
        }
        if !self.procedures.is_empty() {
            description_parts.push(format!("Procedures: {}", self.procedures.join(", ")));
        }
        let description = if description_parts.is_empty() {
            None
        } else {
            Some(description_parts.join("\n"))
        };

        Ok(Some(CalendarEvent {
            summary: Some(summary),
            description,
            location: Some(self.hospital_name.clone()),
            start: Some(event_datetime(&start, zone)),
            end: Some(event_datetime(&end, zone)),
            ..Default::default()
        }))
    }
}

/// Partial update the orchestrator writes back through the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasePatch {
    pub calendar_event_id: Option<String>,
}

/// One case mutation reported by the host
#[derive(Debug, Clone)]
pub struct CaseMutation {
    pub origin: SyncOrigin,
    pub kind: CaseMutationKind,
}

#[derive(Debug, Clone)]
pub enum CaseMutationKind {
    Created(SurgicalCase),
    Updated(SurgicalCase, Vec<CaseField>),
    Deleted {
        case_id: String,
        calendar_event_id: Option<String>,
    },
    InvitationAccepted(SurgicalCase),
}

impl CaseMutation {
    /// Id of the case this mutation concerns
    pub fn case_id(&self) -> &str {
        match &self.kind {
            CaseMutationKind::Created(case) => &case.id,
            CaseMutationKind::Updated(case, _) => &case.id,
            CaseMutationKind::Deleted { case_id, .. } => case_id,
            CaseMutationKind::InvitationAccepted(case) => &case.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Helsinki;

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

    #[test]
    fn billing_and_notes_changes_stay_off_the_calendar() {
        assert!(!CaseField::Notes.affects_calendar());
        assert!(!CaseField::Billing.affects_calendar());
        assert!(CaseField::SurgeryTime.affects_calendar());
        assert!(CaseField::Procedures.affects_calendar());
    }

    #[test]
    fn event_mirrors_the_case_fields() {
        let event = scheduled_case()
            .to_calendar_event(Helsinki)
            .unwrap()
            .expect("scheduled case builds an event");

        assert_eq!(
            event.summary.as_deref(),
            Some("Knee arthroscopy: Aino Virtanen")
        );
        assert_eq!(
            event.description.as_deref(),
            Some("Diagnosis: Meniscus tear\nProcedures: Knee arthroscopy")
        );
        assert_eq!(event.location.as_deref(), Some("Mehiläinen Töölö"));

        let start = event.start.expect("start set");
        assert_eq!(start.date_time.as_deref(), Some("2025-06-10T09:00:00+03:00"));
        assert_eq!(start.time_zone.as_deref(), Some("Europe/Helsinki"));

        // No explicit end time: two hours by default
        let end = event.end.expect("end set");
        assert_eq!(end.date_time.as_deref(), Some("2025-06-10T11:00:00+03:00"));
    }

    #[test]
    fn unscheduled_case_builds_no_event() {
        let mut case = scheduled_case();
        case.surgery_time = None;
        assert_eq!(case.to_calendar_event(Helsinki).unwrap(), None);
    }

    #[test]
    fn explicit_end_time_is_used_verbatim() {
        let mut case = scheduled_case();
        case.surgery_end_time = Some("12:30".to_string());
        let event = case.to_calendar_event(Helsinki).unwrap().unwrap();
        assert_eq!(
            event.end.unwrap().date_time.as_deref(),
            Some("2025-06-10T12:30:00+03:00")
        );
    }
}
