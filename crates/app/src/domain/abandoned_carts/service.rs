//! Abandoned cart recovery.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::domain::{
    abandoned_carts::{
        data::{NewAbandonedCart, NewRecoveryAttempt, ReminderClaim},
        errors::AbandonedCartsServiceError,
        models::{
            AbandonedCart, AbandonedCartDetails, AbandonedCartFilter, AbandonedCartPage,
            AbandonedCartSettings, AbandonedCartStats, AbandonedCartUuid, RecoveryAttempt,
            RecoveryAttemptStatus, RecoveryAttemptUuid, RecoveryChannel, RecoveryDetails,
        },
        store::AbandonedCartStore,
    },
    carts::{
        CartsService,
        models::{Cart, CartUuid},
    },
    customers::CustomersService,
    notifications::{NotificationSender, models::ReminderNotification},
    tenants::records::TenantUuid,
};

/// Most inactive carts considered by one detection pass.
pub const DETECTION_BATCH_SIZE: u32 = 500;

/// Most due reminders sent by one pass.
pub const REMINDER_BATCH_SIZE: u32 = 200;

/// Counts from one reminder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderRun {
    /// Reminders the notification service accepted.
    pub sent: u64,

    /// Reminders recorded as failed attempts.
    pub failed: u64,

    /// Records passed over: capped, already claimed or errored.
    pub skipped: u64,
}

pub struct RecoveryEngine {
    store: Arc<dyn AbandonedCartStore>,
    carts: Arc<dyn CartsService>,
    customers: Arc<dyn CustomersService>,
    notifier: Arc<dyn NotificationSender>,
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryEngine").finish_non_exhaustive()
    }
}

impl RecoveryEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn AbandonedCartStore>,
        carts: Arc<dyn CartsService>,
        customers: Arc<dyn CustomersService>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            carts,
            customers,
            notifier,
        }
    }

    /// Claim, send and record the next reminder of one record.
    async fn remind(
        &self,
        settings: &AbandonedCartSettings,
        record: AbandonedCart,
        run: &mut ReminderRun,
    ) -> Result<(), AbandonedCartsServiceError> {
        let tenant = record.tenant_uuid;

        if record.reminder_count >= settings.max_reminders {
            debug!(%tenant, abandoned_cart = %record.uuid, "reminder cap reached");
            run.skipped += 1;

            return Ok(());
        }

        let reminder_number = record.reminder_count + 1;
        let now = Timestamp::now();

        let claim = ReminderClaim {
            abandoned_cart_uuid: record.uuid,
            expected_count: record.reminder_count,
            sent_at: now,
            next_reminder_at: settings
                .delay_after(reminder_number)
                .map(|delay| now + delay),
        };

        let Some(claimed) = self.store.claim_reminder(tenant, claim).await? else {
            debug!(%tenant, abandoned_cart = %record.uuid, "reminder already claimed");
            run.skipped += 1;

            return Ok(());
        };

        let template_name = settings.template_for(reminder_number).to_string();
        let discount_code = settings.discount_for(reminder_number).map(ToString::to_string);

        let notification = ReminderNotification {
            tenant_uuid: tenant,
            customer_uuid: claimed.customer_uuid,
            abandoned_cart_uuid: claimed.uuid,
            cart_uuid: claimed.cart_uuid,
            recipient_email: claimed.customer_email.clone(),
            first_name: claimed.customer_first_name.clone(),
            last_name: claimed.customer_last_name.clone(),
            items: claimed.items.clone(),
            subtotal: claimed.subtotal,
            item_count: claimed.item_count,
            reminder_number,
            template_name: template_name.clone(),
            discount_code: discount_code.clone(),
        };

        let (status, external_id, error_message) =
            match self.notifier.send_reminder(&notification).await {
                Ok(reference) => {
                    run.sent += 1;
                    (RecoveryAttemptStatus::Sent, reference, None)
                }
                Err(error) => {
                    warn!(
                        %tenant,
                        abandoned_cart = %claimed.uuid,
                        attempt = reminder_number,
                        %error,
                        "failed to send reminder"
                    );
                    run.failed += 1;
                    (RecoveryAttemptStatus::Failed, None, Some(error.to_string()))
                }
            };

        self.store
            .record_attempt(
                tenant,
                NewRecoveryAttempt {
                    abandoned_cart_uuid: claimed.uuid,
                    channel: RecoveryChannel::Email,
                    attempt_number: reminder_number,
                    status,
                    template_name,
                    discount_code,
                    external_id,
                    error_message,
                    sent_at: now,
                },
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl AbandonedCartsService for RecoveryEngine {
    async fn detect(&self, tenant: TenantUuid) -> Result<u64, AbandonedCartsServiceError> {
        let settings = self.store.get_settings(tenant).await?;

        if !settings.enabled {
            debug!(%tenant, "cart recovery disabled");
            return Ok(0);
        }

        let now = Timestamp::now();

        let records = self
            .carts
            .list_inactive_carts(
                tenant,
                now - settings.abandonment_threshold(),
                DETECTION_BATCH_SIZE,
            )
            .await?;

        let carts: Vec<Cart> = records
            .into_iter()
            .filter_map(|record| {
                let uuid = record.uuid;

                match Cart::try_from(record) {
                    Ok(cart) => Some(cart),
                    Err(error) => {
                        warn!(%tenant, cart = %uuid, %error, "skipping unreadable cart");
                        None
                    }
                }
            })
            .collect();

        if carts.is_empty() {
            return Ok(0);
        }

        let uuids: Vec<CartUuid> = carts.iter().map(|cart| cart.uuid).collect();

        let open: FxHashSet<CartUuid> = self
            .store
            .find_open_carts(tenant, &uuids)
            .await?
            .into_iter()
            .collect();

        let next_reminder_at = Some(now + settings.first_reminder_delay());
        let mut detected = 0;

        for cart in carts.iter().filter(|cart| !open.contains(&cart.uuid)) {
            let contact = match self.customers.get_contact(tenant, cart.customer_uuid).await {
                Ok(contact) => contact,
                Err(error) => {
                    warn!(
                        %tenant,
                        cart = %cart.uuid,
                        customer = %cart.customer_uuid,
                        %error,
                        "no contact for abandoned cart, skipping"
                    );
                    continue;
                }
            };

            let new = NewAbandonedCart::snapshot(cart, contact, now, next_reminder_at);

            match self.store.create(tenant, new).await {
                Ok(Some(_)) => detected += 1,
                Ok(None) => debug!(%tenant, cart = %cart.uuid, "cart already abandoned"),
                Err(error) => {
                    warn!(%tenant, cart = %cart.uuid, %error, "failed to record abandoned cart");
                }
            }
        }

        if detected > 0 {
            info!(%tenant, detected, "detected abandoned carts");
        }

        Ok(detected)
    }

    async fn send_reminders(
        &self,
        tenant: TenantUuid,
        abandoned_carts: Option<Vec<AbandonedCartUuid>>,
    ) -> Result<ReminderRun, AbandonedCartsServiceError> {
        let settings = self.store.get_settings(tenant).await?;

        if !settings.enabled {
            return Ok(ReminderRun::default());
        }

        let records = match abandoned_carts {
            Some(uuids) => self.store.list_open(tenant, &uuids).await?,
            None => {
                self.store
                    .list_due(
                        tenant,
                        Timestamp::now(),
                        settings.max_reminders,
                        REMINDER_BATCH_SIZE,
                    )
                    .await?
            }
        };

        let mut run = ReminderRun::default();

        for record in records {
            let uuid = record.uuid;

            if let Err(error) = self.remind(&settings, record, &mut run).await {
                warn!(%tenant, abandoned_cart = %uuid, %error, "reminder failed");
                run.skipped += 1;
            }
        }

        if run.sent + run.failed > 0 {
            info!(
                %tenant,
                sent = run.sent,
                failed = run.failed,
                skipped = run.skipped,
                "sent abandoned cart reminders"
            );
        }

        Ok(run)
    }

    async fn mark_recovered(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        details: RecoveryDetails,
    ) -> Result<bool, AbandonedCartsServiceError> {
        let recovered = self
            .store
            .mark_recovered(tenant, cart, details, Timestamp::now())
            .await?;

        if recovered {
            info!(%tenant, %cart, "abandoned cart recovered");
        } else {
            debug!(%tenant, %cart, "no open abandoned cart to recover");
        }

        Ok(recovered)
    }

    async fn expire(&self, tenant: TenantUuid) -> Result<u64, AbandonedCartsServiceError> {
        let settings = self.store.get_settings(tenant).await?;
        let now = Timestamp::now();

        let expired = self
            .store
            .expire(tenant, now - settings.expiration(), now)
            .await?;

        if expired > 0 {
            info!(%tenant, expired, "expired abandoned carts");
        }

        Ok(expired)
    }

    async fn list(
        &self,
        tenant: TenantUuid,
        filter: AbandonedCartFilter,
    ) -> Result<AbandonedCartPage, AbandonedCartsServiceError> {
        self.store.list(tenant, filter).await
    }

    async fn get(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<AbandonedCartDetails, AbandonedCartsServiceError> {
        self.store.get(tenant, abandoned_cart).await
    }

    async fn stats(
        &self,
        tenant: TenantUuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<AbandonedCartStats, AbandonedCartsServiceError> {
        self.store.stats(tenant, from, to).await
    }

    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError> {
        self.store.get_settings(tenant).await
    }

    async fn update_settings(
        &self,
        tenant: TenantUuid,
        settings: AbandonedCartSettings,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError> {
        self.store.upsert_settings(tenant, settings).await
    }

    async fn delete(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<(), AbandonedCartsServiceError> {
        self.store.delete(tenant, abandoned_cart).await
    }

    async fn update_attempt_status(
        &self,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
        status: RecoveryAttemptStatus,
        error_message: Option<String>,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError> {
        self.store
            .update_attempt_status(tenant, attempt, status, error_message)
            .await
    }
}

#[automock]
#[async_trait]
pub trait AbandonedCartsService: Send + Sync {
    /// Record every inactive cart of a tenant that has no open abandoned
    /// cart yet. Returns how many were recorded.
    async fn detect(&self, tenant: TenantUuid) -> Result<u64, AbandonedCartsServiceError>;

    /// Send the next reminder for the given abandoned carts, or for every
    /// record whose reminder is due when `abandoned_carts` is `None`.
    ///
    /// A failed send is recorded as a failed attempt and still advances the
    /// record.
    async fn send_reminders(
        &self,
        tenant: TenantUuid,
        abandoned_carts: Option<Vec<AbandonedCartUuid>>,
    ) -> Result<ReminderRun, AbandonedCartsServiceError>;

    /// Close the open abandoned cart of `cart` after an order. Returns
    /// `false` when there was nothing open to close.
    async fn mark_recovered(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        details: RecoveryDetails,
    ) -> Result<bool, AbandonedCartsServiceError>;

    /// Expire open abandoned carts older than the tenant's expiration window.
    async fn expire(&self, tenant: TenantUuid) -> Result<u64, AbandonedCartsServiceError>;

    async fn list(
        &self,
        tenant: TenantUuid,
        filter: AbandonedCartFilter,
    ) -> Result<AbandonedCartPage, AbandonedCartsServiceError>;

    async fn get(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<AbandonedCartDetails, AbandonedCartsServiceError>;

    async fn stats(
        &self,
        tenant: TenantUuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<AbandonedCartStats, AbandonedCartsServiceError>;

    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError>;

    async fn update_settings(
        &self,
        tenant: TenantUuid,
        settings: AbandonedCartSettings,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError>;

    async fn delete(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<(), AbandonedCartsServiceError>;

    async fn update_attempt_status(
        &self,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
        status: RecoveryAttemptStatus,
        error_message: Option<String>,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError>;
}
