//! リフレッシュスケジュールモジュール
//!
//! カレンダーソースを一定間隔で再取得し、スナップショットを更新します。
//! 実行中のリフレッシュと重なったトリガーは 1 回にまとめられます。

mod config;
mod error;
mod scheduler;

pub use config::RefreshConfig;
pub use error::{Result, ScheduleError};
pub use scheduler::{RefreshScheduler, SchedulerHandle, SchedulerState, TriggerOutcome};
