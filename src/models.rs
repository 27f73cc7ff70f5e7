//! Record schemas for every collection in the document tree.
//!
//! The store itself is schemaless; these structs are the one place where
//! absent fields get defaulted. Field names match the wire records exactly,
//! including the legacy `"First Name"`/`"Last Name"` user keys.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Volunteer,
    Organization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrgRole {
    Admin,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolunteerStatus {
    #[default]
    Active,
    #[serde(rename = "withdrawal")]
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "First Name", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "Last Name", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_home_org_id: Option<String>,
    /// FCM device registration token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }

    /// Collapse empty strings to absent fields, mirroring how unfilled form
    /// fields arrive from the mobile client.
    pub fn normalized(mut self) -> Self {
        fn clean(field: &mut Option<String>) {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        clean(&mut self.first_name);
        clean(&mut self.last_name);
        clean(&mut self.email);
        clean(&mut self.school_home_org_id);
        clean(&mut self.token);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub name: String,
    /// Grouping key shared by sibling organizations (e.g. a school
    /// district); not a reference to another record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cause {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUser {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(rename = "user_role_in_Org", default, skip_serializing_if = "Option::is_none")]
    pub role_in_org: Option<OrgRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volunteer {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub status: VolunteerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_sign_update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_withdrawal_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_user_id: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub event_status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The store key, duplicated into the record for client convenience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shift {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// A volunteer's registration for one shift within one event. Signups are
/// never deleted; withdrawal is a soft flag so history survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signup {
    #[serde(default)]
    pub volunteer_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub shift_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_up_date_time: Option<String>,
    #[serde(default)]
    pub withdrawal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Check-in record, denormalized across user/volunteer/event/shift/org so
/// reports never have to chase references at read time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_id: Option<String>,
    #[serde(default)]
    pub volunteer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_last_name: Option<String>,
    #[serde(default)]
    pub attendance_status: AttendanceStatus,
    #[serde(default)]
    pub coordinator_name: String,
    #[serde(default)]
    pub coordinator_email: String,
    #[serde(default)]
    pub hours_attended: f64,
    #[serde(default)]
    pub hours_approved: f64,
    #[serde(default)]
    pub hours_rejected: f64,
    #[serde(default)]
    pub approved_by_approver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by_approver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by_approver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by_approver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<String>,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub shift_id: String,
    #[serde(default)]
    pub shift_name: String,
    #[serde(default)]
    pub signup_id: String,
    /// Day the event took place, `YYYY-MM-DD`.
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub event_name: String,
}

/// Notification inbox record. `id` is assigned by the client and is what
/// bulk deletion looks records up by, not the store key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "eventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "isRead", default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}
