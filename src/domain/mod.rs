//! Core domain types and logic.

pub mod ohlcv;
pub mod event;
pub mod event_queue;
pub mod bar_store;
pub mod stats;
pub mod strategy;
pub mod sizing;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod performance;
pub mod backtest;
pub mod config_validation;
pub mod error;
