//! Core askme library (answer formatting, conversation, providers, ports, config).

pub mod answer;
pub mod config;
pub mod conversation;
pub mod logging;
pub mod model;
pub mod ports;
pub mod providers;
pub mod speech;
pub mod storage;
