//! Market session classification
//!
//! The cache layer only distinguishes open from closed: weekends and local
//! hours outside the trading window count as closed.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// First hour of the trading window (inclusive)
pub const TRADING_OPEN_HOUR: u32 = 9;
/// First hour past the trading window
pub const TRADING_CLOSE_HOUR: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSession {
    Open,
    Closed,
}

impl MarketSession {
    /// Classify a local timestamp: Saturday/Sunday or an hour outside
    /// [9, 16) is closed.
    pub fn classify(now: NaiveDateTime) -> Self {
        let is_weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let hour = now.hour();
        let is_afterhours = hour < TRADING_OPEN_HOUR || hour >= TRADING_CLOSE_HOUR;
        if is_weekend || is_afterhours {
            MarketSession::Closed
        } else {
            MarketSession::Open
        }
    }
}
