use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub username: String,

    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub email_notifications_enabled: bool,
    #[serde(default)]
    pub sms_notifications_enabled: bool,

    #[serde(default)]
    pub email_subscription_arn: Option<String>,
    #[serde(default)]
    pub sms_subscription_arn: Option<String>,
}

fn has_value(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl User {
    pub fn email_deliverable(&self) -> bool {
        self.email_notifications_enabled && has_value(&self.email)
    }

    pub fn sms_deliverable(&self) -> bool {
        self.sms_notifications_enabled && has_value(&self.phone_number)
    }

    /// True when at least one channel is switched on and has somewhere to
    /// deliver to. Nothing is published for users without one.
    pub fn has_deliverable_channel(&self) -> bool {
        self.email_deliverable() || self.sms_deliverable()
    }
}

/// The authenticated caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub username: String,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
        }
    }
}
