//! Breadth Screener Engine — indicators, strategies, and market breadth
//!
//! Computes technical indicators over daily OHLCV series, evaluates per-row
//! entry strategies and cross-sectional breadth gauges, and serves the
//! caller-facing market-status payload through a session-aware result cache.

pub mod breadth;
pub mod enrich;
pub mod indicators;
pub mod ingest;
pub mod screener;
pub mod session;
pub mod strategies;
pub mod types;

// Re-exports for convenience
pub use breadth::{BreadthHistory, BreadthSnapshot, DayBreadth};
pub use enrich::enrich_bars;
pub use ingest::{populate, DataSource, PopulateMode};
pub use screener::Screener;
pub use session::MarketSession;
pub use strategies::{collect_entries, RowSignals};
pub use types::{Bar, EntriesPayload, IndicatorRow, StatusPayload};
