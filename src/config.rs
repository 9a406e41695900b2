use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use log::LevelFilter;

use crate::models::coord::DEFAULT_GRID_SIZE;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 24 * 60 * 60;

// SMTP settings for turn reminders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub email_from: String,
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Falls back to the in-memory store when unset.
    pub database_url: Option<String>,
    pub grid_size: u8,
    pub log_level: LevelFilter,
    pub reminder_interval: Duration,
    /// Reminders are only sent when this is set.
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source. Unset and empty variables are
    /// treated alike.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("$LISTEN_ADDR is not a socket address")?;

        let grid_size = match get("GRID_SIZE") {
            Some(value) => value.parse::<u8>().context("$GRID_SIZE is not numeric")?,
            None => DEFAULT_GRID_SIZE,
        };
        if !(8..=16).contains(&grid_size) {
            bail!("Board size must be between 8 and 16, got {}", grid_size);
        }

        let log_level = match get("LOG_LEVEL") {
            Some(value) => value
                .parse::<LevelFilter>()
                .with_context(|| format!("$LOG_LEVEL {:?} is not a log level", value))?,
            None => LevelFilter::Info,
        };

        let reminder_interval = match get("REMINDER_INTERVAL_SECS") {
            Some(value) => value
                .parse::<u64>()
                .context("$REMINDER_INTERVAL_SECS is not numeric")?,
            None => DEFAULT_REMINDER_INTERVAL_SECS,
        };
        if reminder_interval == 0 {
            bail!("$REMINDER_INTERVAL_SECS must be positive");
        }

        let mail_keys = ["EMAIL_FROM", "SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD"];
        let mail_values: Vec<Option<String>> = mail_keys.iter().map(|key| get(*key)).collect();
        let mail = if mail_values.iter().all(Option::is_none) {
            None
        } else if let [Some(email_from), Some(smtp_host), Some(smtp_username), Some(smtp_password)] =
            mail_values.as_slice()
        {
            Some(MailConfig {
                email_from: email_from.clone(),
                smtp_host: smtp_host.clone(),
                smtp_username: smtp_username.clone(),
                smtp_password: smtp_password.clone(),
            })
        } else {
            let missing: Vec<&str> = mail_keys
                .iter()
                .zip(&mail_values)
                .filter(|(_, value)| value.is_none())
                .map(|(key, _)| *key)
                .collect();
            bail!("Mail settings are incomplete, missing: {}", missing.join(", "));
        };

        Ok(Config {
            listen_addr,
            database_url: get("DATABASE_URL"),
            grid_size,
            log_level,
            reminder_interval: Duration::from_secs(reminder_interval),
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.grid_size, 10);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.reminder_interval, Duration::from_secs(86400));
        assert!(config.database_url.is_none());
        assert!(config.mail.is_none());
    }

    #[test]
    fn values_are_read() {
        let config = config(&[
            ("GRID_SIZE", "12"),
            ("LOG_LEVEL", "debug"),
            ("DATABASE_URL", "mysql://localhost/battleship"),
            ("EMAIL_FROM", "noreply@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "user"),
            ("SMTP_PASSWORD", "secret"),
        ])
        .unwrap();
        assert_eq!(config.grid_size, 12);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.database_url.as_deref(), Some("mysql://localhost/battleship"));
        assert_eq!(config.mail.unwrap().smtp_host, "smtp.example.com");
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config(&[("GRID_SIZE", "7")]).is_err());
        assert!(config(&[("GRID_SIZE", "17")]).is_err());
        assert!(config(&[("GRID_SIZE", "ten")]).is_err());
        assert!(config(&[("LOG_LEVEL", "loud")]).is_err());
        assert!(config(&[("LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config(&[("REMINDER_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn partial_mail_settings_are_rejected() {
        let err = config(&[("SMTP_HOST", "smtp.example.com")]).unwrap_err();
        assert!(err.to_string().contains("EMAIL_FROM"));
    }
}
