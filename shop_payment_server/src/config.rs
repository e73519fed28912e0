use std::{env, time::Duration};

use log::*;
use tsg_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_TSG_HOST: &str = "127.0.0.1";
const DEFAULT_TSG_PORT: u16 = 5000;
const DEFAULT_APP_URL: &str = "http://localhost:5000";
const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_EVENT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The public base URL of the checkout frontend. Payment links sent to buyers are built from this.
    pub app_url: String,
    /// How long processed webhook event ids are remembered for duplicate suppression.
    pub event_retention: Duration,
    pub stripe: StripeConfig,
    pub telegram: TelegramConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TSG_HOST.to_string(),
            port: DEFAULT_TSG_PORT,
            app_url: DEFAULT_APP_URL.to_string(),
            event_retention: DEFAULT_EVENT_RETENTION,
            stripe: StripeConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TSG_HOST").ok().unwrap_or_else(|| DEFAULT_TSG_HOST.into());
        let port = env::var("TSG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TSG_PORT. {e} Using the default, {DEFAULT_TSG_PORT}, instead."
                    );
                    DEFAULT_TSG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TSG_PORT);
        let app_url = env::var("TSG_APP_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TSG_APP_URL is not set. Payment links will point at {DEFAULT_APP_URL}.");
            DEFAULT_APP_URL.into()
        });
        let event_retention = configure_event_retention();
        let stripe = StripeConfig::from_env_or_default();
        let telegram = TelegramConfig::from_env_or_default();
        Self { host, port, app_url, event_retention, stripe, telegram }
    }
}

//-------------------------------------------------  StripeConfig  -----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct StripeConfig {
    /// The Stripe API secret key (`sk_...`). Used to authenticate calls to the payment intent API.
    pub secret_key: Secret<String>,
    /// The webhook endpoint signing secret (`whsec_...`).
    pub webhook_secret: Secret<String>,
    /// If false, the middleware will not check webhook signatures and always allow the call.
    pub signature_checks: bool,
    pub api_url: String,
}

impl StripeConfig {
    pub fn from_env_or_default() -> Self {
        let secret_key = env::var("TSG_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ TSG_STRIPE_SECRET_KEY is not set. Payment intent creation will fail.");
            String::default()
        });
        let webhook_secret = env::var("TSG_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_default();
        let mut signature_checks =
            parse_boolean_flag(env::var("TSG_STRIPE_SIGNATURE_CHECKS").ok(), true);
        if signature_checks && webhook_secret.is_empty() {
            warn!(
                "🚨️ TSG_STRIPE_WEBHOOK_SECRET is not set. Webhook signature checks are DISABLED. Do not run a \
                 production instance like this."
            );
            signature_checks = false;
        }
        let api_url = env::var("TSG_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.into());
        Self {
            secret_key: Secret::new(secret_key),
            webhook_secret: Secret::new(webhook_secret),
            signature_checks,
            api_url,
        }
    }
}

//------------------------------------------------  TelegramConfig  ----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct TelegramConfig {
    /// The bot token issued by BotFather.
    pub bot_token: Secret<String>,
    /// The secret token expected in the `X-Telegram-Bot-Api-Secret-Token` header. Empty means the header is not
    /// checked.
    pub webhook_secret: Secret<String>,
    pub api_url: String,
}

impl TelegramConfig {
    pub fn from_env_or_default() -> Self {
        let bot_token = env::var("TSG_TELEGRAM_BOT_TOKEN").ok().unwrap_or_else(|| {
            error!("🪛️ TSG_TELEGRAM_BOT_TOKEN is not set. Buyer notifications will fail.");
            String::default()
        });
        let webhook_secret = env::var("TSG_TELEGRAM_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            info!("🪛️ TSG_TELEGRAM_WEBHOOK_SECRET is not set. Telegram webhook calls will not be authenticated.");
            String::default()
        });
        let api_url = env::var("TSG_TELEGRAM_API_URL").ok().unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.into());
        Self { bot_token: Secret::new(bot_token), webhook_secret: Secret::new(webhook_secret), api_url }
    }
}

fn configure_event_retention() -> Duration {
    env::var("TSG_EVENT_RETENTION")
        .map_err(|_| {
            info!(
                "🪛️ TSG_EVENT_RETENTION is not set. Using the default value of {} minutes.",
                DEFAULT_EVENT_RETENTION.as_secs() / 60
            )
        })
        .and_then(|s| {
            s.parse::<u64>()
                .map(|mins| Duration::from_secs(mins * 60))
                .map_err(|e| warn!("🪛️ Invalid configuration value for TSG_EVENT_RETENTION. {e}"))
        })
        .unwrap_or(DEFAULT_EVENT_RETENTION)
}
