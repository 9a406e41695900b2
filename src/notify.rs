use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, Address, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::MailConfig;
use crate::directory::Directory;

// A nudge for the player whose move an active game is waiting on
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub user_name: String,
    pub email: String,
    pub game_key: String,
}

impl Reminder {
    pub fn subject(&self) -> &'static str {
        "Your turn!"
    }

    pub fn body(&self) -> String {
        format!("Hello {}, it's your turn to move on Battleship!", self.user_name)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn remind(&self, reminder: &Reminder) -> anyhow::Result<()>;
}

/// Sends reminders as mail over an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from = config
            .email_from
            .parse::<Mailbox>()
            .context("$EMAIL_FROM is not a valid mailbox")?;

        // Open a remote connection using STARTTLS
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .context("$SMTP_HOST is not usable as a relay")?
            .credentials(creds)
            .build();

        Ok(SmtpNotifier { from, mailer })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn remind(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let address = reminder
            .email
            .parse::<Address>()
            .with_context(|| format!("invalid mail address for {}", reminder.user_name))?;

        // Construct the mail message
        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(reminder.user_name.clone()), address))
            .subject(reminder.subject())
            .body(reminder.body())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Reminds every player an active game is waiting on. A failed send is logged and
/// skipped. Returns how many reminders went out.
pub async fn send_reminders(directory: &Directory, notifier: &dyn Notifier) -> anyhow::Result<usize> {
    let reminders = directory.pending_reminders().await?;
    let mut sent = 0;
    for reminder in &reminders {
        match notifier.remind(reminder).await {
            Ok(()) => {
                debug!("Reminded {} about game {}", reminder.user_name, reminder.game_key);
                sent += 1;
            }
            Err(err) => error!("Error while sending reminder to {}: {:?}", reminder.user_name, err),
        }
    }
    info!("Sent {} of {} turn reminders", sent, reminders.len());
    Ok(sent)
}

// Runs forever, one round of reminders per period. The first round waits a full period.
pub async fn remind_periodically(directory: Arc<Directory>, notifier: Arc<dyn Notifier>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(err) = send_reminders(&directory, notifier.as_ref()).await {
            error!("Reminder round failed: {:?}", err);
        }
    }
}
