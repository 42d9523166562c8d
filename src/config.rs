use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub alert_check_interval: Duration,

    pub aws_region: String,
    pub sns_topic_arn: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "tradejournal".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());

    let interval_secs = env::var("ALERT_CHECK_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5)
        .max(1);

    let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let sns_topic_arn = env::var("SNS_TOPIC_ARN").unwrap_or_default();

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        alert_check_interval: Duration::from_secs(interval_secs),
        aws_region,
        sns_topic_arn,
        aws_access_key_id: non_empty_var("AWS_ACCESS_KEY_ID"),
        aws_secret_access_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
        aws_session_token: non_empty_var("AWS_SESSION_TOKEN"),
    }
}
