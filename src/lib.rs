//! Multi-network gas fee tracker: per-network pollers feed a shared store
//! whose history is aggregated into OHLC candles for charting.
pub mod candles;
pub mod config;
pub mod error;
pub mod network;
pub mod normalize;
pub mod oracle;
pub mod poller;
pub mod scheduler;
pub mod simulate;
pub mod source;
pub mod store;
pub mod ui;
