use std::env;

use apg_common::{helpers::parse_boolean_flag, Secret};
use arkpay_api::ArkPayConfig;
use chrono::Duration;
use log::*;

const DEFAULT_APG_HOST: &str = "127.0.0.1";
const DEFAULT_APG_PORT: u16 = 8360;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::seconds(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long the server waits for in-flight requests when shutting down.
    pub shutdown_timeout: Duration,
    /// Credentials and endpoint for the outbound ArkPay merchant API. The same secret key verifies inbound
    /// webhook signatures.
    pub arkpay: ArkPayConfig,
    /// The full public URL of the webhook endpoint. The processor signs `POST {url}\n{body}`, so this must match
    /// what ArkPay has on record, not what the reverse proxy rewrites it to.
    pub webhook_url: String,
    /// If false, webhook signature checks are skipped entirely. For local development only.
    pub signature_checks: bool,
    /// Base URL of the storefront's order-received page. Customers returning from the hosted payment page are
    /// redirected to `{base}/{order_id}/?key={order_key}`.
    pub order_received_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_APG_HOST.to_string(),
            port: DEFAULT_APG_PORT,
            database_url: String::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            arkpay: ArkPayConfig::default(),
            webhook_url: String::default(),
            signature_checks: true,
            order_received_url: String::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("APG_HOST").ok().unwrap_or_else(|| DEFAULT_APG_HOST.into());
        let port = env::var("APG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for APG_PORT. {e} Using the default, {DEFAULT_APG_PORT}, instead."
                    );
                    DEFAULT_APG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_APG_PORT);
        let database_url = env::var("APG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ APG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let shutdown_timeout = configure_shutdown_timeout();
        let arkpay = ArkPayConfig::new_from_env_or_default();
        let webhook_url = env::var("APG_WEBHOOK_URL").ok().unwrap_or_else(|| {
            error!(
                "🪛️ APG_WEBHOOK_URL is not set. Webhook signatures are computed over this URL, so signature checks \
                 will fail until it is configured."
            );
            String::default()
        });
        let signature_checks = parse_boolean_flag(env::var("APG_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!(
                "🚨️🚨️🚨️ Webhook signature checks are DISABLED. Anyone who can reach this server can forge \
                 transaction status events. Do not run like this in production. 🚨️🚨️🚨️"
            );
        }
        let order_received_url = env::var("APG_ORDER_RECEIVED_URL").ok().unwrap_or_else(|| {
            error!(
                "🪛️ APG_ORDER_RECEIVED_URL is not set. Customers returning from the hosted payment page cannot be \
                 redirected to the storefront."
            );
            String::default()
        });
        Self {
            host,
            port,
            database_url,
            shutdown_timeout,
            arkpay,
            webhook_url,
            signature_checks,
            order_received_url,
        }
    }

    /// The secret key used to verify inbound webhook signatures.
    pub fn webhook_secret(&self) -> Secret<String> {
        self.arkpay.secret_key.clone()
    }
}

fn configure_shutdown_timeout() -> Duration {
    env::var("APG_SHUTDOWN_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ APG_SHUTDOWN_TIMEOUT is not set. Using the default value of {} s.",
                DEFAULT_SHUTDOWN_TIMEOUT.num_seconds()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::seconds)
                .map_err(|e| warn!("🪛️ Invalid configuration value for APG_SHUTDOWN_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub order_received_url: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { order_received_url: config.order_received_url.clone() }
    }
}
