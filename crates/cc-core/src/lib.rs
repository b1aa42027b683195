//! cc-core: shared configuration and error types
//!
//! カレンダー集約エンジンの設定読み込みと共通エラー型を提供します。

pub mod config;
pub mod error;

pub use config::{CalendarConfig, CalendarSource, Config};
pub use error::{Error, Result};
