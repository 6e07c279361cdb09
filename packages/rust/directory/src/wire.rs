//! Microsoft Graph JSON shapes for `/users` responses.

use serde::Deserialize;

use orgchart_shared::{UserRecord, UserType};

/// One page of `GET /users`.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphUsersResponse {
    #[serde(default)]
    pub value: Vec<GraphUser>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// A user object as returned with our `$select`/`$expand`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub manager: Option<ManagerRef>,
}

/// `$expand=manager($select=id)` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ManagerRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl From<GraphUser> for UserRecord {
    fn from(user: GraphUser) -> Self {
        let manager_id = user
            .manager
            .and_then(|m| m.id)
            .filter(|id| !id.trim().is_empty());

        Self {
            id: user.id,
            display_name: user.display_name.unwrap_or_default(),
            mail: user.mail,
            job_title: user.job_title,
            // Unknown status is never treated as enabled.
            account_enabled: user.account_enabled.unwrap_or(false),
            user_type: UserType::from_wire(user.user_type.as_deref()),
            manager_id,
            user_principal_name: user.user_principal_name,
            department: user.department,
        }
    }
}
