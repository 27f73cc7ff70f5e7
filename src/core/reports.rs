//! Report assembly over the events/shifts/signups/attendances collections.
//!
//! Every report follows the same join pattern: one indexed query per join
//! key (events by owner, then shifts/signups/attendances by `event_id`),
//! with grouping and counting done in memory. Counts are exact
//! cardinalities of the matching query results.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Months;
use serde::Serialize;
use serde_json::Value;

use crate::core::dates;
use crate::core::volunteers::VolunteerResolver;
use crate::error::ApiError;
use crate::models::{
    Attendance, AttendanceStatus, Event, EventStatus, Organization, Shift, Signup, User, Volunteer,
};
use crate::store::Store;

#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_signups: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_checkins: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ShiftDetail {
    pub shift_id: String,
    #[serde(flatten)]
    pub shift: Shift,
}

#[derive(Debug, Serialize)]
pub struct ShiftRollup {
    pub shift_id: String,
    #[serde(flatten)]
    pub shift: Shift,
    pub total_signups: usize,
    pub total_checkins: usize,
}

#[derive(Debug, Serialize)]
pub struct EventWithShifts<S> {
    pub event: EventView,
    pub shifts: Vec<S>,
}

/// Fixed projection returned by the per-event attendance report.
#[derive(Debug, Serialize)]
pub struct AttendanceRow {
    pub approved_by_approver_id: String,
    pub attendance_status: AttendanceStatus,
    pub coordinator_email: String,
    pub coordinator_name: String,
    pub event_date: String,
    pub event_id: String,
    pub event_name: String,
    pub hours_approved: f64,
    pub hours_attended: f64,
    pub hours_rejected: f64,
    pub organization_name: String,
    pub shift_id: String,
    pub shift_name: String,
    pub signup_id: String,
    pub user_id: String,
    pub volunteer_name: String,
}

impl From<Attendance> for AttendanceRow {
    fn from(attendance: Attendance) -> Self {
        Self {
            approved_by_approver_id: attendance.approved_by_approver_id,
            attendance_status: attendance.attendance_status,
            coordinator_email: attendance.coordinator_email,
            coordinator_name: attendance.coordinator_name,
            event_date: attendance.event_date,
            event_id: attendance.event_id,
            event_name: attendance.event_name,
            hours_approved: attendance.hours_approved,
            hours_attended: attendance.hours_attended,
            hours_rejected: attendance.hours_rejected,
            organization_name: attendance.organization_name,
            shift_id: attendance.shift_id,
            shift_name: attendance.shift_name,
            signup_id: attendance.signup_id,
            user_id: attendance.user_id,
            volunteer_name: attendance.volunteer_name,
        }
    }
}

/// One attendance entry inside a user's volunteering history.
#[derive(Debug, Serialize)]
pub struct VolunteerActivity {
    pub organization_name: String,
    pub event_id: String,
    pub event_date: String,
    pub event_name: String,
    pub shift_id: String,
    pub shift_name: String,
    pub coordinator_name: String,
    pub coordinator_email: String,
    pub hours_attended: f64,
    pub hours_approved: f64,
    pub hours_rejected: f64,
    pub signup_id: String,
    pub approved_by_approver_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by_approver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by_approver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by_approver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<String>,
    pub attendance_status: AttendanceStatus,
}

/// A user's activity under one volunteer identity. The same user shows up
/// once per identity when they volunteer for several organizations.
#[derive(Debug, Serialize)]
pub struct VolunteerHistory {
    pub user_id: String,
    pub volunteer_name: String,
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    pub attendances: BTreeMap<String, VolunteerActivity>,
}

fn or_na(value: &str) -> String {
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

fn event_view(event_id: &str, mut event: Event) -> EventView {
    event.event_id = Some(event_id.to_string());
    EventView {
        event,
        org_name: None,
        cause_name: None,
        total_signups: None,
        total_checkins: None,
    }
}

async fn org_name(store: &Store, org_id: &str) -> Result<String, ApiError> {
    let org: Option<Organization> = store.get(&format!("organizations/{org_id}")).await?;
    Ok(org
        .map(|org| org.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown organization".to_string()))
}

async fn cause_name(store: &Store, cause_id: Option<&str>) -> Result<String, ApiError> {
    let cause: Option<crate::models::Cause> = match cause_id {
        Some(cause_id) => store.get(&format!("causes/{cause_id}")).await?,
        None => None,
    };
    Ok(cause
        .map(|cause| cause.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown cause".to_string()))
}

/// Shift rollups for one event plus event-level totals. Three indexed
/// queries regardless of how many shifts the event has.
async fn shift_rollups(
    store: &Store,
    event_id: &str,
) -> Result<(Vec<ShiftRollup>, usize, usize), ApiError> {
    let shifts: BTreeMap<String, Shift> = store.query("shifts", "event_id", event_id).await?;
    let signups: BTreeMap<String, Signup> = store.query("signups", "event_id", event_id).await?;
    let attendances: BTreeMap<String, Attendance> =
        store.query("attendances", "event_id", event_id).await?;

    let mut signups_by_shift: HashMap<&str, usize> = HashMap::new();
    for signup in signups.values() {
        *signups_by_shift.entry(signup.shift_id.as_str()).or_default() += 1;
    }
    let mut checkins_by_shift: HashMap<&str, usize> = HashMap::new();
    for attendance in attendances.values() {
        *checkins_by_shift
            .entry(attendance.shift_id.as_str())
            .or_default() += 1;
    }

    let mut total_signups = 0;
    let mut total_checkins = 0;
    let rollups = shifts
        .into_iter()
        .map(|(shift_id, shift)| {
            let shift_signups = signups_by_shift.get(shift_id.as_str()).copied().unwrap_or(0);
            let shift_checkins = checkins_by_shift
                .get(shift_id.as_str())
                .copied()
                .unwrap_or(0);
            total_signups += shift_signups;
            total_checkins += shift_checkins;
            ShiftRollup {
                shift_id,
                shift,
                total_signups: shift_signups,
                total_checkins: shift_checkins,
            }
        })
        .collect();

    Ok((rollups, total_signups, total_checkins))
}

async fn shift_details(
    store: &Store,
    event_id: &str,
    only: Option<&BTreeSet<String>>,
) -> Result<Vec<ShiftDetail>, ApiError> {
    let shifts: BTreeMap<String, Shift> = store.query("shifts", "event_id", event_id).await?;
    Ok(shifts
        .into_iter()
        .filter(|(shift_id, _)| only.is_none_or(|wanted| wanted.contains(shift_id)))
        .map(|(shift_id, shift)| ShiftDetail { shift_id, shift })
        .collect())
}

/// Attendance report for one event, inclusively filtered on `event_date`
/// when bounds are given. Comparison is on the full timestamp value.
pub async fn event_attendance_report(
    store: &Store,
    event_id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<BTreeMap<String, AttendanceRow>, ApiError> {
    let attendances: BTreeMap<String, Attendance> =
        store.query("attendances", "event_id", event_id).await?;
    if attendances.is_empty() {
        return Err(ApiError::not_found(
            "No attendance records found for the event",
        ));
    }

    let start = start.and_then(dates::parse_when);
    let end = end.and_then(dates::parse_when);

    Ok(attendances
        .into_iter()
        .filter(|(_, attendance)| {
            let event_date = dates::parse_when(&attendance.event_date);
            let after_start = match start {
                None => true,
                Some(bound) => event_date.is_some_and(|date| date >= bound),
            };
            let before_end = match end {
                None => true,
                Some(bound) => event_date.is_some_and(|date| date <= bound),
            };
            after_start && before_end
        })
        .map(|(attendance_id, attendance)| (attendance_id, AttendanceRow::from(attendance)))
        .collect())
}

/// Volunteering history for one user, grouped by volunteer identity.
/// Bounds are compared at day granularity so boundary dates land inside
/// the range.
pub async fn user_volunteering_report(
    store: &Store,
    user_id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<BTreeMap<String, VolunteerHistory>, ApiError> {
    let attendances: BTreeMap<String, Attendance> =
        store.query("attendances", "user_id", user_id).await?;
    if attendances.is_empty() {
        return Err(ApiError::not_found(
            "No attendance records found for the user",
        ));
    }

    let start = start.and_then(dates::parse_day);
    let end = end.and_then(dates::parse_day);

    let mut report: BTreeMap<String, VolunteerHistory> = BTreeMap::new();
    for (attendance_id, attendance) in attendances {
        let event_day = dates::parse_day(&attendance.event_date);
        let after_start = match start {
            None => true,
            Some(bound) => event_day.is_some_and(|day| day >= bound),
        };
        let before_end = match end {
            None => true,
            Some(bound) => event_day.is_some_and(|day| day <= bound),
        };
        if !(after_start && before_end) {
            continue;
        }

        let volunteer_id = attendance
            .volunteer_id
            .clone()
            .unwrap_or_else(|| user_id.to_string());
        let first_name = attendance.volunteer_first_name.clone().unwrap_or_default();
        let last_name = attendance.volunteer_last_name.clone().unwrap_or_default();
        let entry = report
            .entry(volunteer_id)
            .or_insert_with(|| VolunteerHistory {
                user_id: user_id.to_string(),
                volunteer_name: format!("{first_name} {last_name}"),
                first_name,
                last_name,
                attendances: BTreeMap::new(),
            });

        entry.attendances.insert(
            attendance_id,
            VolunteerActivity {
                organization_name: attendance.organization_name,
                event_id: attendance.event_id,
                event_date: attendance.event_date,
                event_name: attendance.event_name,
                shift_id: attendance.shift_id,
                shift_name: attendance.shift_name,
                coordinator_name: or_na(&attendance.coordinator_name),
                coordinator_email: or_na(&attendance.coordinator_email),
                hours_attended: attendance.hours_attended,
                hours_approved: attendance.hours_approved,
                hours_rejected: attendance.hours_rejected,
                signup_id: attendance.signup_id,
                approved_by_approver_id: attendance.approved_by_approver_id,
                approved_by_approver_name: attendance.approved_by_approver_name,
                approved_date: attendance.approved_date,
                rejected_by_approver_id: attendance.rejected_by_approver_id,
                rejected_by_approver_name: attendance.rejected_by_approver_name,
                rejected_date: attendance.rejected_date,
                attendance_status: attendance.attendance_status,
            },
        );
    }

    Ok(report)
}

/// Upcoming-events rollup for an organization user. With no bounds, events
/// from now onward are selected. Events whose shifts collect zero signups
/// in total are left out of this view; the sibling rollups below keep
/// them.
pub async fn org_upcoming_report(
    store: &Store,
    org_user_id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<BTreeMap<String, EventWithShifts<ShiftRollup>>, ApiError> {
    let events: BTreeMap<String, Event> =
        store.query("events", "org_user_id", org_user_id).await?;

    let now = dates::now();
    let start = start.and_then(dates::parse_when);
    let end = end.and_then(dates::parse_when);

    let mut report = BTreeMap::new();
    for (event_id, event) in events {
        let Some(event_start) = dates::parse_when(&event.start_date) else {
            continue;
        };
        let selected = match start {
            None => event_start >= now,
            Some(bound) => {
                event_start >= bound && end.is_none_or(|end_bound| event_start <= end_bound)
            }
        };
        if !selected {
            continue;
        }

        let (shifts, total_signups, total_checkins) = shift_rollups(store, &event_id).await?;
        if total_signups == 0 {
            continue;
        }

        let mut view = event_view(&event_id, event);
        view.org_name = Some(org_name(store, &view.event.org_id).await?);
        view.cause_name = Some(cause_name(store, view.event.cause_id.as_deref()).await?);
        view.total_signups = Some(total_signups);
        view.total_checkins = Some(total_checkins);
        report.insert(event_id, EventWithShifts { event: view, shifts });
    }

    Ok(report)
}

/// Past-events rollup backing the check-in approval screen: same shape as
/// the upcoming report, restricted to events that have started, with the
/// same zero-signup suppression.
pub async fn approval_report(
    store: &Store,
    org_user_id: &str,
) -> Result<BTreeMap<String, EventWithShifts<ShiftRollup>>, ApiError> {
    let events: BTreeMap<String, Event> =
        store.query("events", "org_user_id", org_user_id).await?;
    if events.is_empty() {
        return Err(ApiError::not_found("No events found"));
    }

    let now = dates::now();
    let mut report = BTreeMap::new();
    for (event_id, event) in events {
        let started = dates::parse_when(&event.start_date)
            .is_some_and(|event_start| event_start <= now);
        if !started {
            continue;
        }

        let (shifts, total_signups, total_checkins) = shift_rollups(store, &event_id).await?;
        if total_signups == 0 {
            continue;
        }

        let mut view = event_view(&event_id, event);
        view.org_name = Some(org_name(store, &view.event.org_id).await?);
        view.cause_name = Some(cause_name(store, view.event.cause_id.as_deref()).await?);
        view.total_signups = Some(total_signups);
        view.total_checkins = Some(total_checkins);
        report.insert(event_id, EventWithShifts { event: view, shifts });
    }

    Ok(report)
}

/// Events with per-shift rollups, filtered by creator or organization. No
/// zero-signup suppression here.
pub async fn events_with_shifts(
    store: &Store,
    org_user_id: Option<&str>,
    org_id: Option<&str>,
) -> Result<BTreeMap<String, EventWithShifts<ShiftRollup>>, ApiError> {
    let events: BTreeMap<String, Event> = if let Some(org_user_id) = org_user_id {
        store.query("events", "created_by", org_user_id).await?
    } else if let Some(org_id) = org_id {
        store.query("events", "org_id", org_id).await?
    } else {
        store.get_map("events").await?
    };
    if events.is_empty() {
        return Err(ApiError::not_found("No events found for the given filters."));
    }

    let mut report = BTreeMap::new();
    for (event_id, event) in events {
        let (shifts, total_signups, total_checkins) = shift_rollups(store, &event_id).await?;
        let mut view = event_view(&event_id, event);
        view.total_signups = Some(total_signups);
        view.total_checkins = Some(total_checkins);
        report.insert(event_id, EventWithShifts { event: view, shifts });
    }

    Ok(report)
}

/// One event with its shifts, keyed by event id like the list endpoints.
pub async fn event_with_shifts(
    store: &Store,
    event_id: &str,
) -> Result<BTreeMap<String, EventWithShifts<ShiftDetail>>, ApiError> {
    let event: Event = store
        .get(&format!("events/{event_id}"))
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    let mut view = event_view(event_id, event);
    view.org_name = Some(org_name(store, &view.event.org_id).await?);
    let shifts = shift_details(store, event_id, None).await?;

    Ok(BTreeMap::from([(
        event_id.to_string(),
        EventWithShifts { event: view, shifts },
    )]))
}

/// Events one of the user's volunteer identities signed up for, with the
/// shifts restricted to the signed-up set. Both bounds select an inclusive
/// range; a lone start bound matches that calendar day exactly; no bounds
/// means today onward.
pub async fn my_upcoming_events(
    store: &Store,
    volunteers: &VolunteerResolver,
    user_id: &str,
    volunteer_id: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<BTreeMap<String, EventWithShifts<ShiftDetail>>, ApiError> {
    let volunteer_ids = match volunteer_id {
        Some(volunteer_id) => vec![volunteer_id.to_string()],
        None => {
            let active = volunteers.active_for_user(user_id).await?;
            if active.is_empty() {
                return Err(ApiError::not_found(
                    "No active volunteer records found for this user_id",
                ));
            }
            active
        }
    };

    // event -> shifts the user signed up for, one indexed query per
    // volunteer identity.
    let mut shifts_by_event: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for volunteer_id in &volunteer_ids {
        let signups: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id.as_str())
            .await?;
        for signup in signups.into_values() {
            shifts_by_event
                .entry(signup.event_id)
                .or_default()
                .insert(signup.shift_id);
        }
    }
    if shifts_by_event.is_empty() {
        return Err(ApiError::not_found(
            "No signups found for the given volunteer IDs",
        ));
    }

    let today = dates::now();
    let start_bound = start.and_then(dates::parse_when);
    let end_bound = end.and_then(dates::parse_when);

    let mut report = BTreeMap::new();
    for (event_id, shift_ids) in shifts_by_event {
        let event: Option<Event> = store.get(&format!("events/{event_id}")).await?;
        let Some(event) = event else {
            continue;
        };
        let Some(event_start) = dates::parse_when(&event.start_date) else {
            continue;
        };
        let selected = match (start_bound, end_bound) {
            (Some(from), Some(to)) => event_start >= from && event_start <= to,
            (Some(day), None) => event_start.date() == day.date(),
            (None, _) => event_start >= today,
        };
        if !selected {
            continue;
        }

        let mut view = event_view(&event_id, event);
        view.org_name = Some(org_name(store, &view.event.org_id).await?);
        view.cause_name = Some(cause_name(store, view.event.cause_id.as_deref()).await?);
        let shifts = shift_details(store, &event_id, Some(&shift_ids)).await?;
        report.insert(event_id, EventWithShifts { event: view, shifts });
    }

    Ok(report)
}

/// Discovery feed: upcoming events from the user's parent-org family and
/// the organizations they volunteer for, minus canceled events and events
/// they already signed up for.
pub async fn interest_events(
    store: &Store,
    user_id: &str,
    current_date: Option<&str>,
) -> Result<BTreeMap<String, EventWithShifts<ShiftDetail>>, ApiError> {
    let user: User = store
        .get(&format!("users/{user_id}"))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let home_org_id = user
        .school_home_org_id
        .filter(|org_id| !org_id.is_empty())
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;
    let home_org: Organization = store
        .get(&format!("organizations/{home_org_id}"))
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    // Sibling organizations under the same parent grouping, or just the
    // home org when it has none.
    let mut org_ids: BTreeSet<String> = match home_org
        .parent_org
        .as_deref()
        .filter(|parent| !parent.is_empty())
    {
        Some(parent) => {
            let siblings: BTreeMap<String, Organization> = store
                .query("organizations", "parent_org", parent)
                .await?;
            siblings.into_keys().collect()
        }
        None => BTreeSet::from([home_org_id.clone()]),
    };

    let volunteer_records: BTreeMap<String, Volunteer> =
        store.query("volunteers", "user_id", user_id).await?;
    org_ids.extend(
        volunteer_records
            .values()
            .map(|volunteer| volunteer.org_id.clone()),
    );

    // Events over the next month, capped like the mobile feed expects.
    let window_start = current_date
        .and_then(dates::parse_when)
        .unwrap_or_else(dates::now);
    let window_end = window_start
        .checked_add_months(Months::new(1))
        .unwrap_or(window_start);
    let events: BTreeMap<String, Event> = store
        .query_range(
            "events",
            "start_date",
            Some(Value::String(dates::to_iso(window_start))),
            Some(Value::String(dates::to_iso(window_end))),
            Some(100),
        )
        .await?;

    // Events any of the user's volunteer identities already signed up for.
    let mut signed_up_events: BTreeSet<String> = BTreeSet::new();
    for volunteer_id in volunteer_records.keys() {
        let signups: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id.as_str())
            .await?;
        signed_up_events.extend(signups.into_values().map(|signup| signup.event_id));
    }

    let mut report = BTreeMap::new();
    for (event_id, event) in events {
        if !org_ids.contains(&event.org_id)
            || event.event_status == EventStatus::Canceled
            || signed_up_events.contains(&event_id)
        {
            continue;
        }

        let mut view = event_view(&event_id, event);
        view.org_name = Some(org_name(store, &view.event.org_id).await?);
        view.cause_name = Some(cause_name(store, view.event.cause_id.as_deref()).await?);
        let shifts = shift_details(store, &event_id, None).await?;
        report.insert(event_id, EventWithShifts { event: view, shifts });
    }

    Ok(report)
}
