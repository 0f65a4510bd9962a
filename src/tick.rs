//! The `Tick` entity and its wire-level JSON serialization.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One quoted trade/quote update for the instrument, as delivered by the
/// upstream SDK's on-tick callback. Ephemeral: received, serialized,
/// enqueued, discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub code: String,
    pub datetime: DateTime<FixedOffset>,

    pub open: f64,
    pub underlying_price: f64,
    pub avg_price: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub amount: f64,
    pub total_amount: f64,
    pub price_chg: f64,
    pub pct_chg: f64,

    pub volume: i64,
    pub total_volume: i64,
    pub tick_type: i32,
    pub chg_type: i32,
    pub bid_side_total_vol: i64,
    pub ask_side_total_vol: i64,
    pub simtrade: i32,
}

impl Tick {
    /// Serialize to the compact self-describing wire form (UTF-8 JSON,
    /// required numeric fields coerced to IEEE-754 double by construction).
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
