use mongodb::bson::{doc, oid::ObjectId};
use thiserror::Error;

use crate::{
    error::{NotifyError, StoreError},
    models::User,
    AppState,
};

use super::{
    alert_store::USERS,
    notifier::{validate_destination, Category, Channel, NotificationGateway},
};

#[derive(Error, Debug)]
pub enum NotificationsError {
    #[error("User not found")]
    UserNotFound,

    #[error("No notification methods are enabled")]
    NoChannelEnabled,

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Requested notification settings, as submitted from the settings page.
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub email_enabled: bool,
    pub sms_enabled: bool,
}

impl PreferencesUpdate {
    pub fn normalized(self) -> Self {
        Self {
            email: normalize(self.email),
            phone_number: normalize(self.phone_number),
            ..self
        }
    }

    /// Rejects a malformed destination on an enabled channel. Disabled
    /// channels may hold anything, including nothing.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.email_enabled {
            if let Some(email) = &self.email {
                validate_destination(Channel::Email, email)?;
            }
        }
        if self.sms_enabled {
            if let Some(phone) = &self.phone_number {
                validate_destination(Channel::Sms, phone)?;
            }
        }
        Ok(())
    }
}

fn normalize(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelState {
    pub destination: Option<String>,
    pub enabled: bool,
    pub subscription: Option<String>,
}

/// A channel whose settings changed: the state to store and the
/// subscription it replaces.
struct ChannelChange {
    next: ChannelState,
    replaced: Option<String>,
}

/// Subscribes the requested destination when the channel's settings
/// changed. The previous subscription is left alone so that a later failure
/// can still roll back to it. `None` means nothing changed.
async fn prepare_channel(
    notifier: &dyn NotificationGateway,
    channel: Channel,
    current: &ChannelState,
    destination: Option<String>,
    enabled: bool,
) -> Result<Option<ChannelChange>, NotifyError> {
    if current.destination == destination && current.enabled == enabled {
        return Ok(None);
    }

    let mut next = ChannelState {
        destination,
        enabled,
        subscription: None,
    };

    if next.enabled {
        if let Some(dest) = next.destination.as_deref() {
            next.subscription = Some(notifier.subscribe(channel, dest).await?);
        }
    }

    Ok(Some(ChannelChange {
        next,
        replaced: current.subscription.clone(),
    }))
}

/// Drops a subscription. Failures are only logged.
async fn release(notifier: &dyn NotificationGateway, channel: Channel, subscription: Option<&str>) {
    let Some(handle) = subscription.filter(|s| !s.is_empty()) else {
        return;
    };

    if let Err(e) = notifier.unsubscribe(handle).await {
        tracing::warn!(protocol = channel.protocol(), error = %e, "failed to unsubscribe destination");
    }
}

/// New channel states from `reconcile_preferences`. The subscriptions they
/// replace stay live until `commit`, so a failed save can `roll_back`.
#[derive(Debug)]
pub struct PreferencesChange {
    pub email: ChannelState,
    pub sms: ChannelState,
    created: Vec<(Channel, String)>,
    replaced: Vec<(Channel, String)>,
}

impl PreferencesChange {
    /// Drops the replaced subscriptions. Call once the new state is stored.
    pub async fn commit(self, notifier: &dyn NotificationGateway) {
        for (channel, handle) in &self.replaced {
            release(notifier, *channel, Some(handle.as_str())).await;
        }
    }

    /// Drops the subscriptions created for this change. The replaced ones
    /// are untouched.
    pub async fn roll_back(self, notifier: &dyn NotificationGateway) {
        for (channel, handle) in &self.created {
            release(notifier, *channel, Some(handle.as_str())).await;
        }
    }
}

/// Subscribes whatever the update needs on both channels. If a subscribe
/// fails, the ones already created for this update are dropped again and the
/// error is returned; the current subscriptions are never touched here.
pub async fn reconcile_preferences(
    notifier: &dyn NotificationGateway,
    email: ChannelState,
    sms: ChannelState,
    update: &PreferencesUpdate,
) -> Result<PreferencesChange, NotifyError> {
    let mut change = PreferencesChange {
        email,
        sms,
        created: Vec::new(),
        replaced: Vec::new(),
    };

    let requested = [
        (Channel::Email, update.email.clone(), update.email_enabled),
        (Channel::Sms, update.phone_number.clone(), update.sms_enabled),
    ];

    for (channel, destination, enabled) in requested {
        let current = match channel {
            Channel::Email => &change.email,
            Channel::Sms => &change.sms,
        };

        let prepared = match prepare_channel(notifier, channel, current, destination, enabled).await {
            Ok(prepared) => prepared,
            Err(e) => {
                change.roll_back(notifier).await;
                return Err(e);
            }
        };

        let Some(ChannelChange { next, replaced }) = prepared else {
            continue;
        };

        if let Some(handle) = next.subscription.clone() {
            change.created.push((channel, handle));
        }
        if let Some(handle) = replaced {
            change.replaced.push((channel, handle));
        }

        match channel {
            Channel::Email => change.email = next,
            Channel::Sms => change.sms = next,
        }
    }

    Ok(change)
}

async fn find_user(state: &AppState, user_id: ObjectId) -> Result<User, NotificationsError> {
    state
        .db
        .collection::<User>(USERS)
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(StoreError::from)?
        .ok_or(NotificationsError::UserNotFound)
}

pub async fn get_preferences(state: &AppState, user_id: ObjectId) -> Result<User, NotificationsError> {
    find_user(state, user_id).await
}

pub async fn update_preferences(
    state: &AppState,
    user_id: ObjectId,
    update: PreferencesUpdate,
) -> Result<(), NotificationsError> {
    let update = update.normalized();
    update.validate()?;

    let user = find_user(state, user_id).await?;

    let notifier = state.notifier.as_ref();
    let change = reconcile_preferences(
        notifier,
        ChannelState {
            destination: user.email,
            enabled: user.email_notifications_enabled,
            subscription: user.email_subscription_arn,
        },
        ChannelState {
            destination: user.phone_number,
            enabled: user.sms_notifications_enabled,
            subscription: user.sms_subscription_arn,
        },
        &update,
    )
    .await?;

    let (email, sms) = (&change.email, &change.sms);
    let saved = state
        .db
        .collection::<User>(USERS)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": {
                "email": email.destination.clone(),
                "email_notifications_enabled": email.enabled,
                "email_subscription_arn": email.subscription.clone(),
                "phone_number": sms.destination.clone(),
                "sms_notifications_enabled": sms.enabled,
                "sms_subscription_arn": sms.subscription.clone(),
            } },
            None,
        )
        .await;

    if let Err(e) = saved {
        change.roll_back(notifier).await;
        return Err(StoreError::from(e).into());
    }
    change.commit(notifier).await;

    tracing::info!(user_id = %user_id, "notification preferences updated");
    Ok(())
}

pub async fn send_test_notification(state: &AppState, user_id: ObjectId) -> Result<(), NotificationsError> {
    let user = find_user(state, user_id).await?;

    if !user.has_deliverable_channel() {
        return Err(NotificationsError::NoChannelEnabled);
    }

    state
        .notifier
        .publish(
            "This is a test notification from your Trading Journal.",
            "Trading Journal - Test Notification",
            Category::Test,
        )
        .await?;

    Ok(())
}

/// Publishes to `user_id` if they have a deliverable channel. Failures are
/// logged and swallowed: callers have already committed their own write.
pub async fn notify_user(state: &AppState, user_id: ObjectId, subject: &str, message: &str, category: Category) {
    let user = match find_user(state, user_id).await {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "cannot load user for notification");
            return;
        }
    };

    if !user.has_deliverable_channel() {
        return;
    }

    if let Err(e) = state.notifier.publish(message, subject, category).await {
        tracing::warn!(user_id = %user_id, category = category.as_str(), error = %e, "notification failed");
    }
}
