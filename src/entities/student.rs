//! Student directory records, resolved for display and receipt delivery

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub candidate_name: String,
    pub email: String,
    pub mobile_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_of_programme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Student, "student", "students");

impl Student {
    pub fn new(
        candidate_name: impl Into<String>,
        email: impl Into<String>,
        mobile_no: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            candidate_name: candidate_name.into(),
            email: email.into(),
            mobile_no: mobile_no.into(),
            name_of_programme: None,
            created_at: now,
            updated_at: now,
        }
    }
}
