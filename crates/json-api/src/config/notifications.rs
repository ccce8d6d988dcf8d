//! Notifications Config

use std::time::Duration;

use cartkeeper_app::domain::notifications::NotificationServiceConfig;
use clap::Args;

/// Notification service settings.
#[derive(Debug, Args)]
pub struct NotificationsConfig {
    /// Notification service base URL
    #[arg(
        long,
        env = "NOTIFICATION_SERVICE_URL",
        default_value = "http://notification-service:8090"
    )]
    pub notification_service_url: String,

    /// Storefront base URL used in recovery links
    #[arg(long, env = "STOREFRONT_URL", default_value = "http://localhost:3000")]
    pub storefront_url: String,

    /// Notification service request timeout in seconds
    #[arg(long, env = "NOTIFICATION_TIMEOUT_SECONDS", default_value_t = 10)]
    pub notification_timeout_seconds: u64,
}

impl NotificationsConfig {
    pub(crate) fn client(&self) -> NotificationServiceConfig {
        NotificationServiceConfig {
            base_url: self.notification_service_url.clone(),
            storefront_url: self.storefront_url.clone(),
            timeout: Duration::from_secs(self.notification_timeout_seconds),
        }
    }
}
