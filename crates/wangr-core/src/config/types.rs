//! Configuration type definitions for the dashboard core
//!
//! Every section carries `#[serde(default)]`, so an empty TOML file (or no
//! file at all) yields the production endpoints and the stock refresh cadence.
//! Users only spell out what they want to change.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::executor::TimeoutProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoints: Endpoints,
    pub refresh: RefreshConfig,
    pub limits: Limits,
    /// Coin symbols whose mark prices are requested.
    pub tracked_coins: TrackedCoins,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub frontpage_url: String,
    pub btc_whales_url: String,
    pub eth_whales_url: String,
    pub sol_whales_url: String,
    pub woi_tracked_users_url: String,
    pub arbitrage_url: String,
    pub hyperliquid_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            frontpage_url: "https://polymarket-api.wangr.com/frontpage/".to_string(),
            btc_whales_url: "https://api3.wangr.com/whales".to_string(),
            eth_whales_url: "https://ethwhalesapi.wangr.com/whales".to_string(),
            sol_whales_url: "https://solwhalesapi.wangr.com/whales".to_string(),
            woi_tracked_users_url: "https://api2899.wangr.com/woi/tracked-users".to_string(),
            arbitrage_url: "https://arb.wangr.com".to_string(),
            hyperliquid_url: "https://api.hyperliquid.xyz/info".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one base URL. Used by tests and local mocks.
    pub fn all_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            frontpage_url: format!("{base}/frontpage/"),
            btc_whales_url: format!("{base}/whales/btc"),
            eth_whales_url: format!("{base}/whales/eth"),
            sol_whales_url: format!("{base}/whales/sol"),
            woi_tracked_users_url: format!("{base}/woi/tracked-users"),
            arbitrage_url: format!("{base}/arb"),
            hyperliquid_url: format!("{base}/info"),
        }
    }

    fn named(&self) -> [(&'static str, &str); 7] {
        [
            ("frontpage_url", &self.frontpage_url),
            ("btc_whales_url", &self.btc_whales_url),
            ("eth_whales_url", &self.eth_whales_url),
            ("sol_whales_url", &self.sol_whales_url),
            ("woi_tracked_users_url", &self.woi_tracked_users_url),
            ("arbitrage_url", &self.arbitrage_url),
            ("hyperliquid_url", &self.hyperliquid_url),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between periodic refreshes of an open view.
    pub interval_secs: u64,
    /// Bound for background polling fetches.
    pub poll_timeout_secs: u64,
    /// Bound for user-initiated interactive queries.
    pub interactive_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            poll_timeout_secs: 10,
            interactive_timeout_secs: 120,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self, profile: TimeoutProfile) -> Duration {
        match profile {
            TimeoutProfile::Polling => Duration::from_secs(self.poll_timeout_secs),
            TimeoutProfile::Interactive => Duration::from_secs(self.interactive_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    pub whales_per_coin: usize,
    pub woi_users: usize,
    pub arbitrage_top: usize,
    pub arbitrage_min_net_pct: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            whales_per_coin: 30,
            woi_users: 400,
            arbitrage_top: 50,
            arbitrage_min_net_pct: -999.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TrackedCoins(pub Vec<String>);

impl Default for TrackedCoins {
    fn default() -> Self {
        Self(vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()])
    }
}

impl TrackedCoins {
    pub fn contains(&self, symbol: &str) -> bool {
        self.0.iter().any(|coin| coin.eq_ignore_ascii_case(symbol))
    }
}

impl DashboardConfig {
    /// Rejects values that would make the refresh cycle degenerate or a
    /// request unroutable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.refresh.poll_timeout_secs == 0 || self.refresh.interactive_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh timeouts must be greater than zero".to_string(),
            ));
        }

        for (name, url) in self.endpoints.named() {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("endpoints.{} is empty", name)));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "endpoints.{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.tracked_coins.0.is_empty() {
            return Err(ConfigError::Invalid(
                "tracked_coins must name at least one coin".to_string(),
            ));
        }

        if self.limits.whales_per_coin == 0
            || self.limits.woi_users == 0
            || self.limits.arbitrage_top == 0
        {
            return Err(ConfigError::Invalid(
                "limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
