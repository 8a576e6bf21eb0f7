use aws_config::{AppName, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_types::{region::Region, sdk_config};
use std::env;
use tokio::sync::OnceCell;

const APP_NAME: &str = "lambda-envelope";

/// The process-wide AWS configuration.
///
/// Explicit keys and region are taken from `ENVELOPE_AWS_ACCESS_KEY_ID`,
/// `ENVELOPE_AWS_SECRET_ACCESS_KEY` and `ENVELOPE_AWS_REGION` when set;
/// anything missing falls back to the default provider chain.
pub async fn config() -> &'static sdk_config::SdkConfig {
    static CONFIG: OnceCell<sdk_config::SdkConfig> = OnceCell::const_new();
    CONFIG.get_or_init(load).await
}

async fn load() -> sdk_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Ok(app_name) = AppName::new(APP_NAME) {
        loader = loader.app_name(app_name);
    }

    if let (Ok(key_id), Ok(secret)) = (
        env::var("ENVELOPE_AWS_ACCESS_KEY_ID"),
        env::var("ENVELOPE_AWS_SECRET_ACCESS_KEY"),
    ) {
        loader = loader.credentials_provider(Credentials::from_keys(key_id, secret, None));
    }

    if let Ok(region) = env::var("ENVELOPE_AWS_REGION") {
        loader = loader.region(Region::new(region));
    }

    loader.load().await
}
