//! Sortable column tables for each list the dashboard shows

use serde_json::Value;

use super::{SortContext, SortKey};
use crate::sources::{number_like, Market};

/// How a column's sort key is read from a row.
#[derive(Clone, Copy)]
pub enum ColumnKind {
    /// Case-insensitive text at a path.
    Text(&'static [&'static str]),
    /// Number (or numeric string) at a path.
    Number(&'static [&'static str]),
    /// Top-level field named by the column key, read generically.
    Field,
    /// Computed from the row and the surrounding context.
    Derived(fn(&Value, &SortContext) -> SortKey),
}

#[derive(Clone, Copy)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    kind: ColumnKind,
}

impl ColumnSpec {
    const fn new(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self { key, label, kind }
    }

    const fn field(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, ColumnKind::Field)
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn sort_key(&self, row: &Value, ctx: &SortContext) -> SortKey {
        match self.kind {
            ColumnKind::Text(path) => lookup(row, path)
                .and_then(Value::as_str)
                .map(SortKey::text)
                .unwrap_or(SortKey::Missing),
            ColumnKind::Number(path) => SortKey::number(lookup(row, path)),
            ColumnKind::Field => SortKey::field(row.get(self.key)),
            ColumnKind::Derived(extract) => extract(row, ctx),
        }
    }
}

impl std::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColumnSpec({})", self.key)
    }
}

fn lookup<'a>(row: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(row, |value, key| value.get(key))
}

fn number_at(row: &Value, path: &[&str]) -> Option<f64> {
    lookup(row, path).and_then(number_like)
}

/// Unrealized PnL as a percentage of entry, signed by position side.
fn whale_upnl_pct(row: &Value, ctx: &SortContext) -> SortKey {
    let entry = number_at(row, &["position", "entry_px"]).filter(|e| *e > 0.0);
    let price = ctx.mark_price.filter(|p| *p > 0.0);
    let (Some(entry), Some(price)) = (entry, price) else {
        return SortKey::Missing;
    };
    let long = row
        .get("side")
        .and_then(Value::as_str)
        .is_some_and(|side| side.eq_ignore_ascii_case("long"));
    let pct = if long {
        (price - entry) / entry * 100.0
    } else {
        (entry - price) / entry * 100.0
    };
    SortKey::Number(pct)
}

/// Wins x win rate x realized PnL (in thousands), scaled down by 1000.
/// Users who are not in profit have no heat.
fn woi_heat(row: &Value, _ctx: &SortContext) -> SortKey {
    let (Some(wins), Some(win_rate), Some(pnl)) = (
        number_at(row, &["winning_positions"]),
        number_at(row, &["win_rate"]),
        number_at(row, &["total_realized_pnl"]),
    ) else {
        return SortKey::Missing;
    };
    let pnl_k = pnl / 1000.0;
    if pnl_k <= 0.0 {
        return SortKey::Number(0.0);
    }
    SortKey::Number(wins * win_rate * pnl_k / 1000.0)
}

fn woi_pnl_per_trade(row: &Value, _ctx: &SortContext) -> SortKey {
    let Some(pnl) = number_at(row, &["total_realized_pnl"]) else {
        return SortKey::Missing;
    };
    match number_at(row, &["total_positions"]) {
        Some(trades) if trades > 0.0 => SortKey::Number(pnl / trades),
        _ => SortKey::Number(0.0),
    }
}

const WHALE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("wallet", "Wallet", ColumnKind::Text(&["wallet"])),
    ColumnSpec::new("side", "Side", ColumnKind::Text(&["side"])),
    ColumnSpec::new("size", "Size", ColumnKind::Number(&["size"])),
    ColumnSpec::new("entry", "Entry", ColumnKind::Number(&["position", "entry_px"])),
    ColumnSpec::new("lev", "Lev", ColumnKind::Number(&["position", "leverage_value"])),
    ColumnSpec::new("upnl_usd", "uPnL (USD)", ColumnKind::Number(&["position", "unrealized_pnl"])),
    ColumnSpec::new("upnl_pct", "uPnL (%)", ColumnKind::Derived(whale_upnl_pct)),
    ColumnSpec::new("rpnl", "rPnL (USD)", ColumnKind::Number(&["initial_stats", "total_realized_pnl"])),
    ColumnSpec::new("wr", "Win Rate", ColumnKind::Number(&["initial_stats", "win_rate"])),
    ColumnSpec::new("trades", "Trades", ColumnKind::Number(&["initial_stats", "total_trades"])),
    ColumnSpec::new("liq", "Liquidation", ColumnKind::Number(&["position", "liquidation_px"])),
];

const WOI_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("wallet", "Wallet", ColumnKind::Text(&["wallet"])),
    ColumnSpec::new("heat", "Heat", ColumnKind::Derived(woi_heat)),
    ColumnSpec::new("total_positions", "Trades", ColumnKind::Number(&["total_positions"])),
    ColumnSpec::new("winning_positions", "Wins", ColumnKind::Number(&["winning_positions"])),
    ColumnSpec::new("win_rate", "Win %", ColumnKind::Number(&["win_rate"])),
    ColumnSpec::new("total_realized_pnl", "PnL", ColumnKind::Number(&["total_realized_pnl"])),
    ColumnSpec::new("pnl_per_trade", "PnL/Trade", ColumnKind::Derived(woi_pnl_per_trade)),
    ColumnSpec::new("long_count", "Longs", ColumnKind::Number(&["long_count"])),
    ColumnSpec::new("short_count", "Shorts", ColumnKind::Number(&["short_count"])),
    ColumnSpec::new("avg_hold_minutes", "Avg Hold", ColumnKind::Number(&["avg_hold_minutes"])),
    ColumnSpec::new("first_open_time", "First Open", ColumnKind::Number(&["first_open_time"])),
    ColumnSpec::new("last_close_time", "Last Close", ColumnKind::Number(&["last_close_time"])),
    ColumnSpec::new("symbols_count", "Symbols", ColumnKind::Number(&["symbols_count"])),
];

const ARBITRAGE_FUTURES_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::field("symbol", "Symbol"),
    ColumnSpec::field("buy_exchange", "Buy"),
    ColumnSpec::field("sell_exchange", "Sell"),
    ColumnSpec::field("gross_spread_pct", "Gross"),
    ColumnSpec::field("net_spread_pct", "Net"),
    ColumnSpec::field("funding_rate_diff", "Funding Δ"),
    ColumnSpec::field("net_after_funding_pct", "Net + Fund"),
    ColumnSpec::field("buy_price", "Buy Price"),
    ColumnSpec::field("sell_price", "Sell Price"),
    ColumnSpec::field("status", "Status"),
];

const ARBITRAGE_SPOT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::field("symbol", "Symbol"),
    ColumnSpec::field("buy_exchange", "Buy"),
    ColumnSpec::field("sell_exchange", "Sell"),
    ColumnSpec::field("gross_spread_pct", "Gross"),
    ColumnSpec::field("net_spread_pct", "Net"),
    ColumnSpec::field("buy_price", "Buy Price"),
    ColumnSpec::field("sell_price", "Sell Price"),
    ColumnSpec::field("status", "Status"),
];

const DEX_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::field("symbol", "Pair"),
    ColumnSpec::field("buy_exchange", "Buy"),
    ColumnSpec::field("sell_exchange", "Sell"),
    ColumnSpec::field("gross_spread_pct", "Spread %"),
    ColumnSpec::field("net_spread_pct", "Net %"),
    ColumnSpec::field("spread_value", "Δ (USD)"),
    ColumnSpec::field("buy_price", "Buy Price"),
    ColumnSpec::field("sell_price", "Sell Price"),
    ColumnSpec::field("status", "Status"),
];

/// The sortable columns of one table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSet {
    columns: &'static [ColumnSpec],
}

impl ColumnSet {
    pub fn whales() -> Self {
        Self { columns: WHALE_COLUMNS }
    }

    pub fn woi() -> Self {
        Self { columns: WOI_COLUMNS }
    }

    pub fn arbitrage(market: Market) -> Self {
        let columns = match market {
            Market::Futures => ARBITRAGE_FUTURES_COLUMNS,
            Market::Spot => ARBITRAGE_SPOT_COLUMNS,
        };
        Self { columns }
    }

    pub fn dex() -> Self {
        Self { columns: DEX_COLUMNS }
    }

    pub fn find(&self, key: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|spec| spec.key == key)
    }

    pub fn first(&self) -> Option<&'static ColumnSpec> {
        self.columns.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.columns.iter()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.columns.iter().map(|spec| spec.key).collect()
    }
}
