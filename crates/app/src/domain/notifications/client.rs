//! HTTP client for the notification service.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{
    carts::messages::format_amount,
    catalog::client::INTERNAL_SERVICE_NAME,
    notifications::{errors::NotificationError, models::ReminderNotification},
};

/// Configuration for connecting to the notification service.
#[derive(Debug, Clone)]
pub struct NotificationServiceConfig {
    /// Base address, e.g. `"http://notification-service:8090"`.
    pub base_url: String,

    /// Storefront the recovery links point at.
    pub storefront_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

#[automock]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Send an abandoned-cart reminder. Returns the delivery reference the
    /// service assigned, when it reports one.
    async fn send_reminder(
        &self,
        notification: &ReminderNotification,
    ) -> Result<Option<String>, NotificationError>;
}

#[derive(Debug, Clone)]
pub struct HttpNotificationSender {
    base_url: String,
    storefront_url: String,
    http: Client,
}

impl HttpNotificationSender {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: NotificationServiceConfig) -> Result<Self, NotificationError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            storefront_url: config.storefront_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn recovery_url(&self, notification: &ReminderNotification) -> String {
        format!(
            "{}/cart?recover={}",
            self.storefront_url, notification.cart_uuid
        )
    }

    fn build_request(&self, notification: &ReminderNotification) -> NotificationRequest {
        let cart_items: Vec<Value> = notification
            .items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "price": format_amount(item.price),
                    "quantity": item.quantity,
                    "image": item.image,
                })
            })
            .collect();

        let mut variables = json!({
            "customerName": notification.customer_name(),
            "customerEmail": notification.recipient_email,
            "cartItems": cart_items,
            "cartTotal": format_amount(notification.subtotal),
            "itemCount": notification.item_count,
            "storefrontUrl": self.storefront_url,
            "cartRecoveryUrl": self.recovery_url(notification),
            "reminderNumber": notification.reminder_number,
        });

        if let (Some(code), Some(map)) = (&notification.discount_code, variables.as_object_mut())
        {
            map.insert("discountCode".to_string(), Value::String(code.clone()));
        }

        NotificationRequest {
            channel: "EMAIL",
            recipient_email: notification.recipient_email.clone(),
            subject: notification.subject(),
            template_name: notification.template_name.clone(),
            variables,
            tenant_id: notification.tenant_uuid.to_string(),
            user_id: notification.customer_uuid.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send_reminder(
        &self,
        notification: &ReminderNotification,
    ) -> Result<Option<String>, NotificationError> {
        let url = format!("{}/api/v1/notifications/send", self.base_url);
        let body = self.build_request(notification);

        let response = self
            .http
            .post(&url)
            .header("X-Tenant-ID", &body.tenant_id)
            .header("X-Internal-Service", INTERNAL_SERVICE_NAME)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(NotificationError::UnexpectedResponse(format!(
                "send failed with status {status}: {text}"
            )));
        }

        let parsed: SendResponse = response.json().await.unwrap_or_default();

        Ok(parsed.reference())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRequest {
    channel: &'static str,
    recipient_email: String,
    subject: &'static str,
    template_name: String,
    variables: Value,
    tenant_id: String,
    user_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    data: Option<SendResponseData>,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponseData {
    #[serde(default)]
    id: Option<String>,
}

impl SendResponse {
    fn reference(self) -> Option<String> {
        self.data.and_then(|data| data.id).or(self.id)
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::domain::{
        abandoned_carts::models::AbandonedCartUuid,
        carts::{
            data::NewCartItem,
            models::{CartItems, CartUuid},
        },
        customers::records::CustomerUuid,
        notifications::models::DISCOUNT_SUBJECT,
        tenants::records::TenantUuid,
    };

    use super::*;

    fn sender() -> TestResult<HttpNotificationSender> {
        Ok(HttpNotificationSender::new(NotificationServiceConfig {
            base_url: "http://notifications.test/".to_string(),
            storefront_url: "https://shop.test/".to_string(),
            timeout: Duration::from_secs(1),
        })?)
    }

    fn reminder(number: u32, discount: Option<&str>) -> ReminderNotification {
        let items: CartItems = [NewCartItem::test_item("mug", 1_250, 2)]
            .into_iter()
            .map(|item| item.into_item(Timestamp::now()))
            .collect();

        ReminderNotification {
            tenant_uuid: TenantUuid::new(),
            customer_uuid: CustomerUuid::new(),
            abandoned_cart_uuid: AbandonedCartUuid::new(),
            cart_uuid: CartUuid::new(),
            recipient_email: "shopper@example.com".to_string(),
            first_name: Some("Sam".to_string()),
            last_name: Some("Lee".to_string()),
            items,
            subtotal: 2_500,
            item_count: 2,
            reminder_number: number,
            template_name: format!("abandoned_cart_reminder_{number}"),
            discount_code: discount.map(ToString::to_string),
        }
    }

    #[test]
    fn subjects_follow_reminder_number() {
        assert_eq!(reminder(1, None).subject(), "You left something behind!");
        assert_eq!(reminder(2, None).subject(), "Still thinking about it?");
        assert_eq!(
            reminder(5, None).subject(),
            "Last chance to complete your order!"
        );
        assert_eq!(reminder(2, Some("SAVE10")).subject(), DISCOUNT_SUBJECT);
    }

    #[test]
    fn request_carries_recovery_link_and_snapshot() -> TestResult {
        let notification = reminder(2, Some("SAVE10"));
        let request = sender()?.build_request(&notification);

        assert_eq!(request.template_name, "abandoned_cart_reminder_2");
        assert_eq!(request.recipient_email, "shopper@example.com");
        assert_eq!(
            request.variables["cartRecoveryUrl"],
            format!("https://shop.test/cart?recover={}", notification.cart_uuid)
        );
        assert_eq!(request.variables["customerName"], "Sam Lee");
        assert_eq!(request.variables["cartTotal"], "25.00");
        assert_eq!(request.variables["discountCode"], "SAVE10");
        assert_eq!(request.variables["cartItems"][0]["quantity"], 2);

        Ok(())
    }

    #[test]
    fn request_omits_discount_when_none_offered() -> TestResult {
        let request = sender()?.build_request(&reminder(1, None));

        assert!(
            request.variables.get("discountCode").is_none(),
            "no discount variable expected"
        );

        Ok(())
    }

    #[test]
    fn reference_prefers_nested_id() -> TestResult {
        let nested: SendResponse =
            serde_json::from_str(r#"{"data": {"id": "msg-1"}, "id": "outer"}"#)?;
        let flat: SendResponse = serde_json::from_str(r#"{"id": "msg-2"}"#)?;
        let empty: SendResponse = serde_json::from_str("{}")?;

        assert_eq!(nested.reference().as_deref(), Some("msg-1"));
        assert_eq!(flat.reference().as_deref(), Some("msg-2"));
        assert_eq!(empty.reference(), None);

        Ok(())
    }
}
