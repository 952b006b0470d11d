use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub rabbitmq_url: String,

    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    pub database_url: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Any message equal to this fails on every channel. Empty disables it.
    #[serde(default = "default_simulated_failure_message")]
    pub simulated_failure_message: String,
}

fn default_queue_name() -> String {
    "notifications".to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_server_port() -> u16 {
    8000
}

fn default_simulated_failure_message() -> String {
    "force_fail".to_string()
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn simulated_failure(&self) -> Option<String> {
        if self.simulated_failure_message.is_empty() {
            None
        } else {
            Some(self.simulated_failure_message.clone())
        }
    }
}
