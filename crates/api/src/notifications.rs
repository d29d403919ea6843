//! Wiring between the booking tables and the notification dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use salon_core::types::DbId;
use salon_db::repositories::{
    AppointmentItemRepo, AppointmentRepo, CustomerRepo, LocationRepo, ServiceRepo, StaffRepo,
};
use salon_db::DbPool;
use salon_events::{
    CircuitBreaker, ContextError, EmailConfig, EmailSender, NotificationContext,
    NotificationContextSource, NotificationDispatcher, SmsConfig, SmsSender, WhatsAppConfig,
    WhatsAppSender,
};

use crate::config::ServerConfig;

/// Reads notification context straight from Postgres.
pub struct PgNotificationContextSource {
    pool: DbPool,
}

impl PgNotificationContextSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_context(
        &self,
        appointment_id: DbId,
    ) -> Result<Option<NotificationContext>, sqlx::Error> {
        let Some(appointment) = AppointmentRepo::find_by_id(&self.pool, appointment_id).await? else {
            return Ok(None);
        };
        let Some(location) = LocationRepo::find_by_id(&self.pool, appointment.location_id).await?
        else {
            return Ok(None);
        };
        let customer = match appointment.customer_id {
            Some(id) => CustomerRepo::find_by_id(&self.pool, id).await?,
            None => None,
        };
        let items = AppointmentItemRepo::list_for_appointment(&self.pool, appointment_id).await?;
        let services = ServiceRepo::list_active(&self.pool, location.id).await?;

        let mut service_names: Vec<String> = Vec::new();
        for item in &items {
            if let Some(service) = services.iter().find(|s| s.id == item.service_id) {
                if !service_names.contains(&service.name) {
                    service_names.push(service.name.clone());
                }
            }
        }

        let mut staff_ids: Vec<DbId> = items.iter().filter_map(|i| i.staff_id).collect();
        staff_ids.sort_unstable();
        staff_ids.dedup();
        let mut staff_names = Vec::with_capacity(staff_ids.len());
        for id in staff_ids {
            if let Some(staff) = StaffRepo::find_by_id(&self.pool, id).await? {
                staff_names.push(staff.first_name);
            }
        }

        let (customer_name, customer_email, customer_phone, whatsapp_opt_in) = match &customer {
            Some(c) => (
                c.display_name(),
                c.email.clone(),
                c.phone.clone(),
                c.parsed_metadata().whatsapp_opt_in,
            ),
            None => (String::new(), None, None, false),
        };

        Ok(Some(NotificationContext {
            appointment_id,
            location_name: location.name,
            location_phone: location.phone,
            utc_offset_minutes: location.utc_offset_minutes,
            starts_at: appointment.starts_at,
            ends_at: appointment.ends_at,
            customer_name,
            customer_email,
            customer_phone,
            whatsapp_opt_in,
            service_names,
            staff_names,
            notify_email: location.notify_email,
            notify_sms: location.notify_sms,
            notify_whatsapp: location.notify_whatsapp,
        }))
    }
}

#[async_trait]
impl NotificationContextSource for PgNotificationContextSource {
    async fn load(&self, appointment_id: DbId) -> Result<Option<NotificationContext>, ContextError> {
        self.load_context(appointment_id)
            .await
            .map_err(|e| ContextError(e.to_string()))
    }
}

/// Build a dispatcher with every channel whose provider settings are present
/// in the environment. Channels that fail to initialize are logged and left out.
pub fn build_dispatcher(pool: DbPool, config: &ServerConfig) -> NotificationDispatcher {
    let source = Arc::new(PgNotificationContextSource::new(pool));
    let mut dispatcher = NotificationDispatcher::new(source);

    match EmailConfig::from_env() {
        Some(email) => {
            let breaker = CircuitBreaker::new(
                config.mail_breaker_threshold,
                Duration::from_secs(config.mail_breaker_cooldown_secs),
            );
            dispatcher = dispatcher.with_email(Arc::new(EmailSender::new(email)), breaker);
            tracing::info!("Email notifications enabled");
        }
        None => tracing::info!("SMTP not configured, email notifications disabled"),
    }

    if let Some(sms) = SmsConfig::from_env() {
        match SmsSender::new(sms) {
            Ok(sender) => {
                dispatcher = dispatcher.with_sms(Arc::new(sender));
                tracing::info!("SMS notifications enabled");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to build SMS client"),
        }
    }

    if let Some(whatsapp) = WhatsAppConfig::from_env() {
        match WhatsAppSender::new(whatsapp) {
            Ok(sender) => {
                dispatcher = dispatcher.with_whatsapp(Arc::new(sender));
                tracing::info!("WhatsApp notifications enabled");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to build WhatsApp client"),
        }
    }

    dispatcher
}
