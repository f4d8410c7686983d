//! Table sorting
//!
//! Sorting is a pure function of the rows, a column and a direction, so it can
//! be reapplied to every fresh snapshot without remembering anything but the
//! [`SortState`]. Rows whose sort value is missing sort as the minimum. Ties
//! keep their input order in both directions.

pub mod columns;

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use strum::IntoEnumIterator;

use crate::document::DataSnapshot;
use crate::sources::{number_like, Coin, Source};

pub use columns::{ColumnKind, ColumnSet, ColumnSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn is_descending(self) -> bool {
        self == SortDirection::Descending
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// Comparable value extracted from one row for one column.
///
/// Ordering across kinds is `Missing < Number < Text`. Numbers compare by
/// total order; text compares case-insensitively.
#[derive(Debug, Clone)]
pub enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        SortKey::Text(value.to_lowercase())
    }

    /// Numeric reading of a value; anything non-numeric is missing.
    pub fn number(value: Option<&Value>) -> Self {
        value
            .and_then(number_like)
            .map(SortKey::Number)
            .unwrap_or(SortKey::Missing)
    }

    /// Generic reading used by tables whose columns are plain fields: numbers
    /// and numeric strings are numbers, other strings are text.
    pub fn field(value: Option<&Value>) -> Self {
        match value {
            Some(value @ Value::String(text)) => match number_like(value) {
                Some(n) => SortKey::Number(n),
                None => SortKey::text(text),
            },
            Some(Value::Bool(b)) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
            other => SortKey::number(other),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Values outside the row that derived columns depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SortContext {
    pub mark_price: Option<f64>,
}

/// Last known price per coin.
///
/// A snapshot's frontpage summary (`{"btc": {"price": ..}}`) seeds prices and
/// its mark prices override them. Coins a snapshot does not price keep the
/// value they had, so a failed price fetch does not blank derived columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBook {
    prices: HashMap<Coin, f64>,
}

impl PriceBook {
    pub fn update(&mut self, snapshot: &DataSnapshot) {
        let frontpage = snapshot.get(&Source::Frontpage);
        let marks = snapshot.get(&Source::MarkPrices);
        for coin in Coin::iter() {
            let from_frontpage = frontpage
                .and_then(|doc| doc.get(&coin.symbol().to_lowercase()))
                .and_then(|summary| summary.get("price"))
                .and_then(number_like);
            let from_marks = marks
                .and_then(|doc| doc.get(&coin.symbol()))
                .and_then(number_like);
            if let Some(price) = from_marks.or(from_frontpage).filter(|price| *price > 0.0) {
                self.prices.insert(coin, price);
            }
        }
    }

    pub fn price(&self, coin: Coin) -> Option<f64> {
        self.prices.get(&coin).copied()
    }

    /// Context for sorting `list`: the price of its coin, if it has one.
    pub fn context_for(&self, list: Source) -> SortContext {
        SortContext {
            mark_price: list.coin().and_then(|coin| self.price(coin)),
        }
    }
}

/// Stable sort of `items` by `key`. Descending reverses the comparison, not
/// the output, so equal keys stay in input order either way.
pub fn sort_by_key<T, F>(items: &[T], key: F, direction: SortDirection) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> SortKey,
{
    let mut keyed: Vec<(SortKey, &T)> = items.iter().map(|item| (key(item), item)).collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = a.cmp(b);
        if direction.is_descending() {
            ordering.reverse()
        } else {
            ordering
        }
    });
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Column and direction the user picked for a table. Survives refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    column: Option<String>,
    direction: SortDirection,
}

impl SortState {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(column: &str, direction: SortDirection) -> Self {
        Self {
            column: Some(column.to_string()),
            direction,
        }
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Applies a sort request from the column picker. With `toggle` the
    /// direction flips as well; otherwise the current direction is kept.
    /// Returns false and leaves the state alone for unknown columns.
    pub fn request(&mut self, column: &str, toggle: bool, columns: &ColumnSet) -> bool {
        if columns.find(column).is_none() {
            log::warn!("Ignoring sort on unknown column '{}'", column);
            return false;
        }
        self.column = Some(column.to_string());
        if toggle {
            self.direction = self.direction.toggled();
        }
        true
    }

    /// Clicking the active column's header flips direction; clicking another
    /// header sorts by it, largest first.
    pub fn header_clicked(&mut self, column: &str, columns: &ColumnSet) -> bool {
        if self.column() == Some(column) {
            self.direction = self.direction.toggled();
            return true;
        }
        if !self.request(column, false, columns) {
            return false;
        }
        self.direction = SortDirection::Descending;
        true
    }

    /// Flips direction. An unsorted table starts sorting by its first column.
    pub fn toggle_direction(&mut self, columns: &ColumnSet) {
        if self.column.is_none() {
            self.column = columns.first().map(|spec| spec.key.to_string());
        }
        self.direction = self.direction.toggled();
    }

    /// Rows in display order. Unsorted (or an unknown column) keeps input
    /// order.
    pub fn apply(&self, rows: &[Value], columns: &ColumnSet, ctx: &SortContext) -> Vec<Value> {
        match self.column().and_then(|key| columns.find(key)) {
            Some(spec) => sort_by_key(rows, |row| spec.sort_key(row, ctx), self.direction),
            None => rows.to_vec(),
        }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{} {}", column, self.direction),
            None => write!(f, "unsorted"),
        }
    }
}
