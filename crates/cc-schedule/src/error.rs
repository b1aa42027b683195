//! エラー型定義 (cc-schedule)

use std::time::Duration;

use thiserror::Error;

/// cc-schedule のエラー型
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("無効なリフレッシュ間隔: {0:?}")]
    InvalidInterval(Duration),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, ScheduleError>;
