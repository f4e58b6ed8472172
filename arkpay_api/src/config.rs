use apg_common::Secret;
use log::*;

pub const DEFAULT_API_URL: &str = "https://api-arkpay.exnihilo.dev/api/v1";

#[derive(Debug, Clone)]
pub struct ArkPayConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
}

impl Default for ArkPayConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), api_key: Secret::default(), secret_key: Secret::default() }
    }
}

impl ArkPayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("APG_ARKPAY_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ APG_ARKPAY_API_URL not set, using the production ArkPay endpoint");
            DEFAULT_API_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("APG_ARKPAY_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ APG_ARKPAY_API_KEY not set, using a placeholder that will fail authentication");
            "arkpay_api_key_unset".to_string()
        }));
        let secret_key = Secret::new(std::env::var("APG_ARKPAY_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ APG_ARKPAY_SECRET_KEY not set, using a placeholder that will fail authentication");
            "arkpay_secret_key_unset".to_string()
        }));
        Self { api_url, api_key, secret_key }
    }
}
