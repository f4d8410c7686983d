//! View catalogue
//!
//! Each [`ViewKind`] names the sources it refreshes, the cache domain it
//! reads and writes, and the sortable list (if any) it shows.

use std::fmt;

use crate::aggregator::SourceSet;
use crate::cache::CacheKey;
use crate::executor::TimeoutProfile;
use crate::sort::{ColumnSet, SortDirection, SortState};
use crate::sources::{Coin, Market, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Dashboard,
    WhalesFull,
    WoiFull,
    Arbitrage(Market),
    ArbitrageDex,
}

impl ViewKind {
    pub fn all() -> Vec<ViewKind> {
        vec![
            ViewKind::Dashboard,
            ViewKind::WhalesFull,
            ViewKind::WoiFull,
            ViewKind::Arbitrage(Market::Futures),
            ViewKind::Arbitrage(Market::Spot),
            ViewKind::ArbitrageDex,
        ]
    }

    /// Views whose data is fetched into the cache at startup.
    pub fn preloaded() -> Vec<ViewKind> {
        Self::all()
            .into_iter()
            .filter(|kind| *kind != ViewKind::Dashboard)
            .collect()
    }

    pub fn sources(&self) -> SourceSet {
        match self {
            ViewKind::Dashboard => SourceSet::Single(Source::Frontpage),
            ViewKind::WhalesFull => SourceSet::new(vec![
                Source::Whales(Coin::Btc),
                Source::Whales(Coin::Eth),
                Source::Whales(Coin::Sol),
                Source::MarkPrices,
            ]),
            ViewKind::WoiFull => SourceSet::new(vec![Source::WoiUsers, Source::Frontpage]),
            ViewKind::Arbitrage(market) => SourceSet::new(vec![
                Source::ArbitrageHealth(*market),
                Source::ArbitrageTop(*market),
            ]),
            ViewKind::ArbitrageDex => SourceSet::Single(Source::ArbitrageDex),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match self {
            ViewKind::Dashboard => CacheKey::Frontpage,
            ViewKind::WhalesFull => CacheKey::WhalesFull,
            ViewKind::WoiFull => CacheKey::WoiFull,
            ViewKind::Arbitrage(Market::Futures) => CacheKey::ArbitrageFutures,
            ViewKind::Arbitrage(Market::Spot) => CacheKey::ArbitrageSpot,
            ViewKind::ArbitrageDex => CacheKey::ArbitrageDex,
        }
    }

    /// Every view refreshes on the polling budget. [`TimeoutProfile::Interactive`]
    /// is the longer budget reserved for user-initiated queries, which no
    /// view issues.
    pub fn timeout_profile(&self) -> TimeoutProfile {
        TimeoutProfile::Polling
    }

    /// Lists the user can switch the table between. The first is shown on
    /// open.
    pub fn lists(&self) -> Vec<Source> {
        match self {
            ViewKind::Dashboard => Vec::new(),
            ViewKind::WhalesFull => vec![
                Source::Whales(Coin::Btc),
                Source::Whales(Coin::Eth),
                Source::Whales(Coin::Sol),
            ],
            ViewKind::WoiFull => vec![Source::WoiUsers],
            ViewKind::Arbitrage(market) => vec![Source::ArbitrageTop(*market)],
            ViewKind::ArbitrageDex => vec![Source::ArbitrageDex],
        }
    }

    pub fn default_list(&self) -> Option<Source> {
        self.lists().first().copied()
    }

    pub fn columns(&self) -> Option<ColumnSet> {
        match self {
            ViewKind::Dashboard => None,
            ViewKind::WhalesFull => Some(ColumnSet::whales()),
            ViewKind::WoiFull => Some(ColumnSet::woi()),
            ViewKind::Arbitrage(market) => Some(ColumnSet::arbitrage(*market)),
            ViewKind::ArbitrageDex => Some(ColumnSet::dex()),
        }
    }

    pub fn default_sort(&self) -> SortState {
        match self {
            ViewKind::WoiFull => SortState::by("heat", SortDirection::Descending),
            ViewKind::Arbitrage(_) | ViewKind::ArbitrageDex => {
                SortState::by("net_spread_pct", SortDirection::Descending)
            }
            ViewKind::Dashboard | ViewKind::WhalesFull => SortState::unsorted(),
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Dashboard => write!(f, "dashboard"),
            ViewKind::WhalesFull => write!(f, "whales"),
            ViewKind::WoiFull => write!(f, "woi"),
            ViewKind::Arbitrage(market) => write!(f, "arbitrage_{}", market),
            ViewKind::ArbitrageDex => write!(f, "arbitrage_dex"),
        }
    }
}
