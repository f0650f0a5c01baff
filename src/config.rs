use std::path::PathBuf;
use time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub seed: Option<PathBuf>,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Eventboard".to_string(),
            seed: None,
            auth: AuthConfig {
                // base64url of "eventboard-test-secret"
                key: "ZXZlbnRib2FyZC10ZXN0LXNlY3JldA".to_string(),
                token_ttl: Duration::days(1),
                cookie_name: "eventboard_auth".to_string(),
                cookie_secure: false,
            },
        }
    }
}
