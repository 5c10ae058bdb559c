//! Gateway configuration
//!
//! Settings are scoped by mode: credentials and the location of the sandbox
//! account never leak into live requests. Configuration comes either from
//! environment variables or from the host application's settings store.
//! Loading a `.env` file is left to the binary, before `from_env` runs.

use crate::error::{GatewayError, GatewayResult};
use crate::store::LocalStore;
use crate::types::Mode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "ARMATURE_GATEWAY";

/// Processor API version sent with every request
pub const DEFAULT_API_VERSION: &str = "2024-10-17";

/// Version tag attached to order metadata
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Platform fee taken from each charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplicationFeePolicy {
    pub enabled: bool,
    /// Fraction of the charge, `0.02` is 2%
    pub rate: Decimal,
}

impl ApplicationFeePolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn rate(rate: Decimal) -> Self {
        Self {
            enabled: true,
            rate,
        }
    }

    /// Fee in minor units for a charge, `None` when disabled or zero
    pub fn fee_for(&self, amount: i64) -> Option<i64> {
        if !self.enabled {
            return None;
        }
        (Decimal::from(amount) * self.rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .filter(|fee| *fee > 0)
    }
}

/// Gateway configuration for one mode
#[derive(Debug)]
pub struct GatewayConfig {
    pub mode: Mode,
    pub access_token: SecretString,
    /// Merchant location every order is created under
    pub location_id: String,
    /// Settlement currency, checkout in anything else is rejected
    pub merchant_currency: String,
    pub application_fee: ApplicationFeePolicy,
    /// Override for the processor base URL
    pub base_url: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
    pub plugin_version: String,
}

impl GatewayConfig {
    /// Create a configuration with defaults for the optional settings
    pub fn new(
        mode: Mode,
        access_token: impl Into<String>,
        location_id: impl Into<String>,
        merchant_currency: impl Into<String>,
    ) -> Self {
        let access_token: String = access_token.into();
        Self {
            mode,
            access_token: SecretString::new(access_token.into_boxed_str()),
            location_id: location_id.into(),
            merchant_currency: merchant_currency.into().to_uppercase(),
            application_fee: ApplicationFeePolicy::disabled(),
            base_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
            plugin_version: PLUGIN_VERSION.to_string(),
        }
    }

    /// Set the application fee policy
    pub fn with_application_fee(mut self, policy: ApplicationFeePolicy) -> Self {
        self.application_fee = policy;
        self
    }

    /// Override the processor base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from environment variables under `prefix`
    ///
    /// Reads `<PREFIX>_MODE`, `<PREFIX>_<MODE>_ACCESS_TOKEN`,
    /// `<PREFIX>_<MODE>_LOCATION_ID`, `<PREFIX>_CURRENCY`, and optionally
    /// `<PREFIX>_APP_FEE_RATE`, `<PREFIX>_BASE_URL`, `<PREFIX>_TIMEOUT_SECS`.
    pub fn from_env(prefix: &str) -> GatewayResult<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Load from a `.env`-style file without touching the process environment
    pub fn from_env_file(prefix: &str, path: impl AsRef<std::path::Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<Result<HashMap<String, String>, _>>())
            .map_err(|e| GatewayError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_lookup(prefix, |key| vars.get(key).cloned())
    }

    /// Load from any key lookup using the `from_env` variable names
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(&format!("{}_{}", prefix, key)).filter(|v| !v.trim().is_empty())
        };

        let mode = match var("MODE") {
            Some(raw) => raw.parse::<Mode>()?,
            None => Mode::default(),
        };
        let scoped = mode.as_str().to_uppercase();

        let access_token = var(&format!("{scoped}_ACCESS_TOKEN")).unwrap_or_default();
        let location_id = var(&format!("{scoped}_LOCATION_ID")).unwrap_or_default();
        let currency = var("CURRENCY").unwrap_or_default();

        let mut config = Self::new(mode, access_token, location_id, currency);
        if let Some(rate) = var("APP_FEE_RATE") {
            config.application_fee = parse_fee_rate(&rate)?;
        }
        if let Some(url) = var("BASE_URL") {
            config.base_url = Some(url);
        }
        if let Some(secs) = var("TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| GatewayError::Config(format!("invalid timeout: {secs}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from the settings store for a mode
    pub async fn from_store<S: LocalStore + ?Sized>(store: &S, mode: Mode) -> GatewayResult<Self> {
        let access_token = store.get_setting(mode, "access_token").await?.unwrap_or_default();
        let location_id = store.get_setting(mode, "location_id").await?.unwrap_or_default();
        let currency = store.get_setting(mode, "currency").await?.unwrap_or_default();

        let mut config = Self::new(mode, access_token, location_id, currency);
        if let Some(rate) = store.get_setting(mode, "application_fee_rate").await? {
            config.application_fee = parse_fee_rate(&rate)?;
        }
        config.base_url = store.get_setting(mode, "base_url").await?;

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before any remote call is attempted
    pub fn validate(&self) -> GatewayResult<()> {
        if self.access_token.expose_secret().trim().is_empty() {
            return Err(GatewayError::Config(format!(
                "missing {} access token",
                self.mode
            )));
        }
        if self.location_id.trim().is_empty() {
            return Err(GatewayError::Config(format!(
                "missing {} location id",
                self.mode
            )));
        }
        if self.merchant_currency.len() != 3
            || !self.merchant_currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(GatewayError::Config(format!(
                "invalid merchant currency: {:?}",
                self.merchant_currency
            )));
        }
        let rate = self.application_fee.rate;
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(GatewayError::Config(format!(
                "application fee rate out of range: {rate}"
            )));
        }
        if let Some(base) = &self.base_url {
            let parsed = url::Url::parse(base)
                .map_err(|e| GatewayError::Config(format!("invalid base url {base}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(GatewayError::Config(format!(
                    "unsupported base url scheme: {}",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }
}

fn parse_fee_rate(raw: &str) -> GatewayResult<ApplicationFeePolicy> {
    let rate = Decimal::from_str(raw.trim())
        .map_err(|_| GatewayError::Config(format!("invalid application fee rate: {raw}")))?;
    if rate.is_zero() {
        Ok(ApplicationFeePolicy::disabled())
    } else {
        Ok(ApplicationFeePolicy::rate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    #[test]
    fn test_application_fee() {
        let policy = ApplicationFeePolicy::rate(dec!(0.02));
        assert_eq!(policy.fee_for(4999), Some(100));
        assert_eq!(policy.fee_for(25), Some(1));
        assert_eq!(policy.fee_for(10), None);
        assert_eq!(ApplicationFeePolicy::disabled().fee_for(4999), None);
    }

    #[test]
    fn test_validate() {
        let ok = GatewayConfig::new(Mode::Sandbox, "token", "LOC", "usd");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.merchant_currency, "USD");

        let no_token = GatewayConfig::new(Mode::Sandbox, " ", "LOC", "USD");
        assert!(matches!(no_token.validate(), Err(GatewayError::Config(_))));

        let no_location = GatewayConfig::new(Mode::Live, "token", "", "USD");
        assert!(no_location.validate().is_err());

        let bad_currency = GatewayConfig::new(Mode::Live, "token", "LOC", "US");
        assert!(bad_currency.validate().is_err());

        let bad_fee = GatewayConfig::new(Mode::Live, "token", "LOC", "USD")
            .with_application_fee(ApplicationFeePolicy::rate(dec!(1.5)));
        assert!(bad_fee.validate().is_err());

        let bad_url = GatewayConfig::new(Mode::Live, "token", "LOC", "USD").with_base_url("ftp://x");
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GatewayConfig::new(Mode::Sandbox, "super-secret-token", "LOC", "USD");
        assert!(!format!("{config:?}").contains("super-secret-token"));
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_lookup() {
        let vars = vars(&[
            ("GW_MODE", "live"),
            ("GW_LIVE_ACCESS_TOKEN", "live-token"),
            ("GW_LIVE_LOCATION_ID", "LIVE-LOC"),
            ("GW_SANDBOX_LOCATION_ID", "SBX-LOC"),
            ("GW_CURRENCY", "cad"),
            ("GW_APP_FEE_RATE", "0.01"),
            ("GW_TIMEOUT_SECS", "5"),
        ]);

        let config = GatewayConfig::from_lookup("GW", |key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.access_token.expose_secret(), "live-token");
        assert_eq!(config.location_id, "LIVE-LOC");
        assert_eq!(config.merchant_currency, "CAD");
        assert_eq!(config.application_fee, ApplicationFeePolicy::rate(dec!(0.01)));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let base = [
            ("GW_SANDBOX_ACCESS_TOKEN", "t"),
            ("GW_SANDBOX_LOCATION_ID", "L"),
            ("GW_CURRENCY", "USD"),
        ];
        for bad in [("GW_MODE", "staging"), ("GW_APP_FEE_RATE", "lots"), ("GW_TIMEOUT_SECS", "-1")] {
            let mut pairs = base.to_vec();
            pairs.push(bad);
            let vars = vars(&pairs);
            let result = GatewayConfig::from_lookup("GW", |key| vars.get(key).cloned());
            assert!(matches!(result, Err(GatewayError::Config(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let vars = vars(&[
            ("GW_MODE", " "),
            ("GW_SANDBOX_ACCESS_TOKEN", "t"),
            ("GW_SANDBOX_LOCATION_ID", "L"),
            ("GW_CURRENCY", "USD"),
            ("GW_BASE_URL", ""),
        ]);
        let config = GatewayConfig::from_lookup("GW", |key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.mode, Mode::Sandbox);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_from_env_missing_credentials() {
        let result = GatewayConfig::from_env("GW_CFG_MISSING_99999");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_from_env_file() {
        let path = std::env::temp_dir().join(format!("gw-config-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "GWF_SANDBOX_ACCESS_TOKEN=file-token\nGWF_SANDBOX_LOCATION_ID=FILE-LOC\nGWF_CURRENCY=usd\n",
        )
        .unwrap();

        let config = GatewayConfig::from_env_file("GWF", &path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.location_id, "FILE-LOC");
        assert_eq!(config.access_token.expose_secret(), "file-token");
        assert!(std::env::var("GWF_SANDBOX_ACCESS_TOKEN").is_err());

        assert!(GatewayConfig::from_env_file("GWF", "/nonexistent/gateway.env").is_err());
    }

    #[tokio::test]
    async fn test_from_store_uses_mode_scope() {
        let store = MemoryStore::new();
        store.put_setting(Mode::Sandbox, "access_token", "sbx-token");
        store.put_setting(Mode::Sandbox, "location_id", "SBX-LOC");
        store.put_setting(Mode::Sandbox, "currency", "USD");
        store.put_setting(Mode::Live, "location_id", "LIVE-LOC");

        let config = GatewayConfig::from_store(&store, Mode::Sandbox).await.unwrap();
        assert_eq!(config.location_id, "SBX-LOC");
        assert!(!config.application_fee.enabled);

        assert!(GatewayConfig::from_store(&store, Mode::Live).await.is_err());
    }
}
