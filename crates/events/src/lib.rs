//! Domain events and customer notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying [`DomainEvent`]s.
//! - [`NotificationDispatcher`]: subscribes to the bus and sends
//!   confirmation / cancellation messages over email, SMS and WhatsApp.
//! - [`CircuitBreaker`]: stops hammering a failing mail provider.
//! - [`delivery`]: the channel senders.

pub mod breaker;
pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod message;

pub use breaker::{BreakerState, CircuitBreaker};
pub use bus::{DomainEvent, EventBus};
pub use delivery::email::{EmailConfig, EmailSender};
pub use delivery::sms::{SmsConfig, SmsSender};
pub use delivery::whatsapp::{WhatsAppConfig, WhatsAppSender};
pub use delivery::{DeliveryError, MessageSender};
pub use dispatcher::{ContextError, NotificationContextSource, NotificationDispatcher};
pub use message::{NotificationContext, NotificationKind, NotificationMessage};
