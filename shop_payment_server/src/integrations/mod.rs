mod stripe;
mod telegram;

pub use stripe::{StripeApi, MINIMUM_CHARGE_MINOR_UNITS};
pub use telegram::TelegramApi;
