//! Notification dispatch. One logical event fans out to zero or more
//! channels; a channel fires only when the caller requested it, the
//! global settings allow it, and (for email/SMS) the recipient has
//! contact data for it. Delivery is at-most-once: failures are reported
//! per channel, never retried, and never fail the mutation that
//! triggered them.

use std::env;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::NotificationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    InApp,
    Sms,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::InApp => "in-app",
            Channel::Sms => "sms",
        }
    }
}

/// Per-call subset of channels the caller wants. Actual delivery still
/// depends on the global settings and recipient contact data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelRequest {
    pub email: bool,
    pub in_app: bool,
    pub sms: bool,
}

impl ChannelRequest {
    pub fn all() -> Self {
        ChannelRequest {
            email: true,
            in_app: true,
            sms: true,
        }
    }

    pub fn in_app_only() -> Self {
        ChannelRequest {
            in_app: true,
            ..Default::default()
        }
    }
}

/// Result of one attempted channel. Channels that were gated off or had
/// no contact data are skipped silently and produce no entry.
#[derive(Debug)]
pub enum ChannelOutcome {
    Sent,
    Failed(String),
}

/// External email capability. The real transport (SMTP or otherwise)
/// lives outside the core; the dispatcher only needs send-or-fail.
pub trait EmailTransport {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// External SMS capability. No provider is wired in; the shipped stub
/// succeeds once the message is delegated.
pub trait SmsTransport {
    fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

impl<T: EmailTransport + ?Sized> EmailTransport for &T {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        (**self).send(to, subject, body)
    }
}

/// SMTP connection settings, injected into whatever email transport the
/// host application wires up. Opaque to the dispatcher itself.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SmtpConfig {
    /// Reads TASKDECK_SMTP_HOST, TASKDECK_SMTP_PORT (default 587),
    /// TASKDECK_SMTP_USER and TASKDECK_SMTP_PASSWORD. Returns `None`
    /// when no host is configured.
    pub fn from_env() -> Option<Self> {
        let host = env::var("TASKDECK_SMTP_HOST").ok()?;
        let port = env::var("TASKDECK_SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        Some(SmtpConfig {
            host,
            port,
            username: env::var("TASKDECK_SMTP_USER").unwrap_or_default(),
            password: env::var("TASKDECK_SMTP_PASSWORD").unwrap_or_default(),
        })
    }
}

/// Email stub used when no real transport is wired up. Logs the send and
/// reports success.
pub struct LogEmail {
    pub config: Option<SmtpConfig>,
}

impl EmailTransport for LogEmail {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        match &self.config {
            Some(cfg) => info!(to, subject, body, host = %cfg.host, port = cfg.port, "email dispatched"),
            None => info!(to, subject, body, "email dispatched (no SMTP configured)"),
        }
        Ok(())
    }
}

pub struct LogSms;

impl SmsTransport for LogSms {
    fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        info!(to, body, "sms dispatched");
        Ok(())
    }
}

/// Routes events to channels. Holds the store handle for settings,
/// contact lookups and in-app records, plus the injected transports.
pub struct Notifier<'a> {
    db: &'a Database,
    email: Box<dyn EmailTransport + 'a>,
    sms: Box<dyn SmsTransport + 'a>,
}

impl<'a> Notifier<'a> {
    pub fn new(
        db: &'a Database,
        email: Box<dyn EmailTransport + 'a>,
        sms: Box<dyn SmsTransport + 'a>,
    ) -> Self {
        Notifier { db, email, sms }
    }

    /// Notifier with the logging stubs, SMTP settings taken from the
    /// environment.
    pub fn with_stubs(db: &'a Database) -> Self {
        Notifier::new(
            db,
            Box::new(LogEmail {
                config: SmtpConfig::from_env(),
            }),
            Box::new(LogSms),
        )
    }

    pub fn settings(&self) -> Result<NotificationSettings> {
        self.db.notification_settings()
    }

    pub fn update_settings(&self, settings: NotificationSettings) -> Result<()> {
        self.db.update_notification_settings(settings)
    }

    /// Fans one event out to the requested channels. Returns an entry per
    /// attempted channel; a store failure on the in-app write is the only
    /// error that propagates.
    pub fn dispatch(
        &self,
        recipient_id: i64,
        subject: &str,
        message: &str,
        requested: ChannelRequest,
    ) -> Result<Vec<(Channel, ChannelOutcome)>> {
        let settings = self.db.notification_settings()?;
        let recipient = self
            .db
            .get_user(recipient_id)?
            .ok_or(Error::UserNotFound(recipient_id))?;

        let mut results = Vec::new();

        if requested.email && settings.email {
            match recipient.email.as_deref().filter(|a| !a.is_empty()) {
                Some(address) => {
                    let outcome = match self.email.send(address, subject, message) {
                        Ok(()) => ChannelOutcome::Sent,
                        Err(e) => {
                            warn!(recipient = recipient_id, error = %e, "email delivery failed");
                            ChannelOutcome::Failed(e.to_string())
                        }
                    };
                    results.push((Channel::Email, outcome));
                }
                None => debug!(recipient = recipient_id, "no email address, skipping email"),
            }
        }

        if requested.in_app && settings.in_app {
            self.db.add_notification(recipient_id, message)?;
            results.push((Channel::InApp, ChannelOutcome::Sent));
        }

        if requested.sms && settings.sms {
            match recipient.phone.as_deref().filter(|p| !p.is_empty()) {
                Some(phone) => {
                    let outcome = match self.sms.send(phone, message) {
                        Ok(()) => ChannelOutcome::Sent,
                        Err(e) => {
                            warn!(recipient = recipient_id, error = %e, "sms delivery failed");
                            ChannelOutcome::Failed(e.to_string())
                        }
                    };
                    results.push((Channel::Sms, outcome));
                }
                None => debug!(recipient = recipient_id, "no phone number, skipping sms"),
            }
        }

        Ok(results)
    }

    /// Broadcasts to every admin, in-app only. Bypasses the global
    /// settings: the admin audit trail stays on even when in-app
    /// notifications are switched off for regular dispatch.
    pub fn notify_admins(&self, message: &str) -> Result<usize> {
        let admins = self.db.admin_ids()?;
        for admin_id in &admins {
            self.db.add_notification(*admin_id, message)?;
        }
        Ok(admins.len())
    }
}
