//! Source catalogue
//!
//! Every endpoint the dashboard talks to is one variant of [`Source`]. A
//! variant knows how to build its request, how to parse the response into a
//! [`Document`], and which empty default stands in for it when the fetch
//! fails. Adding a source means adding a variant; the compiler then points at
//! every match that needs a rule for it.

use serde_json::{json, Map, Value};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

use crate::config::DashboardConfig;
use crate::document::Document;
use crate::errors::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Coin {
    Btc,
    Eth,
    Sol,
}

impl Coin {
    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Market {
    Futures,
    Spot,
}

impl Market {
    fn path_prefix(&self) -> &'static str {
        match self {
            Market::Futures => "/futures",
            Market::Spot => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Frontpage,
    Whales(Coin),
    WoiUsers,
    ArbitrageHealth(Market),
    ArbitrageTop(Market),
    ArbitrageDex,
    MarkPrices,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Frontpage => write!(f, "frontpage"),
            Source::Whales(coin) => write!(f, "whales_{}", coin.symbol().to_lowercase()),
            Source::WoiUsers => write!(f, "woi_users"),
            Source::ArbitrageHealth(market) => write!(f, "arb_health_{}", market),
            Source::ArbitrageTop(market) => write!(f, "arb_top_{}", market),
            Source::ArbitrageDex => write!(f, "arb_dex"),
            Source::MarkPrices => write!(f, "mark_prices"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything a fetcher needs to issue the request for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

impl Source {
    /// Every source in the catalogue.
    pub fn all() -> Vec<Source> {
        let mut sources = vec![Source::Frontpage];
        sources.extend(Coin::iter().map(Source::Whales));
        sources.push(Source::WoiUsers);
        for market in Market::iter() {
            sources.push(Source::ArbitrageHealth(market));
            sources.push(Source::ArbitrageTop(market));
        }
        sources.push(Source::ArbitrageDex);
        sources.push(Source::MarkPrices);
        sources
    }

    pub fn request(&self, config: &DashboardConfig) -> RequestSpec {
        let endpoints = &config.endpoints;
        let limits = &config.limits;
        let arb_base = endpoints.arbitrage_url.trim_end_matches('/');

        match self {
            Source::Frontpage => RequestSpec::get(&endpoints.frontpage_url),
            Source::Whales(Coin::Btc) => RequestSpec::get(&endpoints.btc_whales_url),
            Source::Whales(Coin::Eth) => RequestSpec::get(&endpoints.eth_whales_url),
            Source::Whales(Coin::Sol) => RequestSpec::get(&endpoints.sol_whales_url),
            Source::WoiUsers => RequestSpec::get(&endpoints.woi_tracked_users_url)
                .with_query("limit", limits.woi_users),
            Source::ArbitrageHealth(market) => {
                RequestSpec::get(format!("{}{}/health", arb_base, market.path_prefix()))
            }
            Source::ArbitrageTop(market) => {
                RequestSpec::get(format!("{}{}/arbitrage/top", arb_base, market.path_prefix()))
                    .with_query("limit", limits.arbitrage_top)
                    .with_query("min_net_pct", limits.arbitrage_min_net_pct)
            }
            Source::ArbitrageDex => RequestSpec::get(format!("{}/dex/arbitrage", arb_base)),
            Source::MarkPrices => RequestSpec {
                method: Method::Post,
                url: endpoints.hyperliquid_url.clone(),
                query: Vec::new(),
                body: Some(json!({"type": "metaAndAssetCtxs"})),
            },
        }
    }

    /// Turns a raw response body into this source's document, keeping only the
    /// part the dashboard consumes.
    pub fn parse(&self, raw: Value, config: &DashboardConfig) -> Result<Document, FetchError> {
        match self {
            Source::Frontpage => {
                expect_object(self, &raw)?;
                Ok(Document::new(raw))
            }
            Source::ArbitrageHealth(_) if raw.is_null() => Ok(Document::null()),
            Source::ArbitrageHealth(_) => {
                expect_object(self, &raw)?;
                Ok(Document::new(raw))
            }
            Source::Whales(_) => {
                let mut whales = take_array(self, raw, "active_whales")?;
                whales.truncate(config.limits.whales_per_coin);
                Ok(Document::new(Value::Array(whales)))
            }
            Source::WoiUsers => Ok(Document::new(Value::Array(take_array(self, raw, "users")?))),
            Source::ArbitrageTop(_) => {
                if raw.is_array() {
                    Ok(Document::new(raw))
                } else {
                    Err(malformed(self, "an array", &raw))
                }
            }
            Source::ArbitrageDex => parse_dex(self, raw),
            Source::MarkPrices => parse_mark_prices(self, raw, config),
        }
    }

    /// What a failed fetch contributes to an aggregated snapshot.
    pub fn empty_default(&self) -> Document {
        match self {
            Source::Frontpage | Source::MarkPrices | Source::ArbitrageDex => {
                Document::new(json!({}))
            }
            Source::Whales(_) | Source::WoiUsers | Source::ArbitrageTop(_) => {
                Document::new(json!([]))
            }
            Source::ArbitrageHealth(_) => Document::null(),
        }
    }

    /// Rows of the sortable list this source's document carries.
    pub fn list_rows<'a>(&self, document: &'a Document) -> &'a [Value] {
        match self {
            Source::ArbitrageDex => document
                .get("pairs")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => document.rows(),
        }
    }

    /// The coin whose mark price derived columns should use, if any.
    pub fn coin(&self) -> Option<Coin> {
        match self {
            Source::Whales(coin) => Some(*coin),
            _ => None,
        }
    }
}

fn malformed(source: &Source, expected: &str, got: &Value) -> FetchError {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    FetchError::MalformedPayload(format!("{}: expected {}, got {}", source, expected, kind))
}

fn expect_object(source: &Source, raw: &Value) -> Result<(), FetchError> {
    if raw.is_object() {
        Ok(())
    } else {
        Err(malformed(source, "an object", raw))
    }
}

/// Pulls an array field out of an object. A missing or null field is an empty
/// list; a field of the wrong type is malformed.
fn take_array(source: &Source, raw: Value, field: &str) -> Result<Vec<Value>, FetchError> {
    let Value::Object(mut map) = raw else {
        return Err(malformed(source, "an object", &raw));
    };
    match map.remove(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(malformed(source, &format!("'{}' to be an array", field), &other)),
    }
}

fn parse_dex(source: &Source, raw: Value) -> Result<Document, FetchError> {
    let Value::Object(map) = raw else {
        return Err(malformed(source, "an object", &raw));
    };

    let base_token = map.get("base_token").and_then(Value::as_str);
    let pairs = map
        .get("pairs")
        .and_then(Value::as_array)
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(Value::as_object)
                .map(|pair| normalize_dex_pair(pair, base_token))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let missing_pairs = match map.get("missing_pairs") {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        _ => json!([]),
    };

    Ok(Document::new(json!({
        "base_token": map.get("base_token").cloned().unwrap_or(Value::Null),
        "amount_in_wei": map.get("amount_in_wei").cloned().unwrap_or(Value::Null),
        "pairs": pairs,
        "missing_pairs": missing_pairs,
    })))
}

/// Reshapes one DEX pair into the same row shape the CEX tables use: the
/// cheapest venue is the buy side, the dearest the sell side.
fn normalize_dex_pair(pair: &Map<String, Value>, base_token: Option<&str>) -> Value {
    let mut buy: Option<(String, f64)> = None;
    let mut sell: Option<(String, f64)> = None;

    for (key, value) in pair {
        let Some(venue) = key.strip_suffix("_price") else {
            continue;
        };
        let Some(price) = value.as_f64() else {
            continue;
        };
        let venue = title_case(&venue.replace('_', " "));
        if buy.as_ref().map_or(true, |(_, p)| price < *p) {
            buy = Some((venue.clone(), price));
        }
        if sell.as_ref().map_or(true, |(_, p)| price > *p) {
            sell = Some((venue, price));
        }
    }

    let spread_pct = pair.get("spread_pct").and_then(number_like).unwrap_or(0.0);
    let spread_value = pair.get("spread").and_then(number_like).unwrap_or(0.0);
    let profitable = pair.get("arbitrage").is_some_and(truthy);
    let token = pair.get("token").and_then(Value::as_str).unwrap_or("?");
    let symbol = match base_token {
        Some(base) => format!("{}/{}", token, base),
        None => token.to_string(),
    };
    let (buy_exchange, buy_price) = buy.unwrap_or_else(|| ("Unknown".to_string(), 0.0));
    let (sell_exchange, sell_price) = sell.unwrap_or_else(|| ("Unknown".to_string(), 0.0));

    json!({
        "symbol": symbol,
        "buy_exchange": buy_exchange,
        "sell_exchange": sell_exchange,
        "gross_spread_pct": spread_pct,
        "net_spread_pct": if profitable { spread_pct } else { -spread_pct },
        "spread_value": spread_value,
        "buy_price": buy_price,
        "sell_price": sell_price,
        "status": if profitable { "Profitable" } else { "Not Profitable" },
    })
}

/// Loose flag reading: null, false, zero and empty strings or containers
/// are false, anything else is true.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads numbers and numeric strings; anything else is absent.
pub(crate) fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// `metaAndAssetCtxs` answers `[{"universe": [{"name": ..}, ..]}, [{"markPx": ..}, ..]]`
/// with the two lists aligned by index.
fn parse_mark_prices(
    source: &Source,
    raw: Value,
    config: &DashboardConfig,
) -> Result<Document, FetchError> {
    let Value::Array(parts) = raw else {
        return Err(malformed(source, "an array", &raw));
    };
    let universe = parts
        .first()
        .and_then(|meta| meta.get("universe"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FetchError::MalformedPayload(format!("{}: missing 'universe' metadata", source))
        })?;
    let contexts = parts.get(1).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    let mut prices = Map::new();
    for (asset, ctx) in universe.iter().zip(contexts) {
        let Some(name) = asset.get("name").and_then(Value::as_str) else {
            continue;
        };
        if !config.tracked_coins.contains(name) {
            continue;
        }
        if let Some(price) = ctx.get("markPx").and_then(number_like) {
            prices.insert(name.to_string(), json!(price));
        }
    }

    Ok(Document::new(Value::Object(prices)))
}
