use std::sync::LazyLock;

use async_trait::async_trait;
use aws_sdk_sns::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    types::MessageAttributeValue,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::Settings, error::NotifyError};

/// SNS returns this instead of an ARN until the recipient confirms an email
/// subscription.
pub const PENDING_CONFIRMATION: &str = "pending confirmation";

const NOTIFICATION_TYPE_ATTR: &str = "notificationType";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("phone regex"));

/// Message category, sent as the `notificationType` attribute so that
/// subscription filter policies can select on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Trade,
    Alert,
    Test,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Trade, Category::Alert, Category::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Trade => "trade",
            Category::Alert => "alert",
            Category::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    /// SNS subscription protocol name.
    pub fn protocol(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

pub fn validate_destination(channel: Channel, destination: &str) -> Result<(), NotifyError> {
    let re = match channel {
        Channel::Email => &EMAIL_RE,
        Channel::Sms => &PHONE_RE,
    };

    if re.is_match(destination.trim()) {
        Ok(())
    } else {
        Err(NotifyError::InvalidDestination {
            channel: channel.protocol(),
            destination: destination.to_string(),
        })
    }
}

pub fn filter_policy() -> String {
    let types: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    json!({ NOTIFICATION_TYPE_ATTR: types }).to_string()
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Subscribes `destination` to the notification topic and returns the
    /// subscription handle needed to unsubscribe later.
    async fn subscribe(&self, channel: Channel, destination: &str) -> Result<String, NotifyError>;

    async fn unsubscribe(&self, subscription: &str) -> Result<(), NotifyError>;

    async fn publish(&self, message: &str, subject: &str, category: Category) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct SnsGateway {
    client: Client,
    topic_arn: String,
}

impl SnsGateway {
    pub async fn from_settings(settings: &Settings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()));

        match (&settings.aws_access_key_id, &settings.aws_secret_access_key) {
            (Some(key), Some(secret)) => {
                let session = settings.aws_session_token.clone();
                tracing::info!(
                    session = session.is_some(),
                    "using configured AWS credentials"
                );
                loader = loader.credentials_provider(Credentials::new(
                    key.clone(),
                    secret.clone(),
                    session,
                    None,
                    "tradejournal-settings",
                ));
            }
            _ => tracing::info!("using environment AWS credentials"),
        }

        let sdk_config = loader.load().await;

        if settings.sns_topic_arn.trim().is_empty() {
            tracing::warn!("SNS_TOPIC_ARN is empty; notifications are disabled");
        }

        Self {
            client: Client::new(&sdk_config),
            topic_arn: settings.sns_topic_arn.trim().to_string(),
        }
    }

    fn topic(&self) -> Result<&str, NotifyError> {
        if self.topic_arn.is_empty() {
            return Err(NotifyError::NotConfigured);
        }
        Ok(&self.topic_arn)
    }
}

#[async_trait]
impl NotificationGateway for SnsGateway {
    async fn subscribe(&self, channel: Channel, destination: &str) -> Result<String, NotifyError> {
        let topic = self.topic()?;
        validate_destination(channel, destination)?;

        let res = self
            .client
            .subscribe()
            .topic_arn(topic)
            .protocol(channel.protocol())
            .endpoint(destination.trim())
            .attributes("FilterPolicy", filter_policy())
            .send()
            .await
            .map_err(|e| NotifyError::Sns(DisplayErrorContext(&e).to_string()))?;

        let handle = res
            .subscription_arn()
            .unwrap_or(PENDING_CONFIRMATION)
            .to_string();

        tracing::info!(protocol = channel.protocol(), subscription = %handle, "subscribed");
        Ok(handle)
    }

    async fn unsubscribe(&self, subscription: &str) -> Result<(), NotifyError> {
        if subscription.is_empty() || subscription == PENDING_CONFIRMATION {
            return Ok(());
        }

        self.client
            .unsubscribe()
            .subscription_arn(subscription)
            .send()
            .await
            .map_err(|e| NotifyError::Sns(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(subscription, "unsubscribed");
        Ok(())
    }

    async fn publish(&self, message: &str, subject: &str, category: Category) -> Result<(), NotifyError> {
        let topic = self.topic()?;

        let attr = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(category.as_str())
            .build()
            .map_err(|e| NotifyError::Sns(e.to_string()))?;

        self.client
            .publish()
            .topic_arn(topic)
            .message(message)
            .subject(subject)
            .message_attributes(NOTIFICATION_TYPE_ATTR, attr)
            .send()
            .await
            .map_err(|e| NotifyError::Sns(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(category = category.as_str(), "published notification");
        Ok(())
    }
}
