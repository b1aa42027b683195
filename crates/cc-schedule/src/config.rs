//! リフレッシュ設定

use std::time::Duration;

use cc_core::CalendarConfig;

use crate::error::{Result, ScheduleError};

/// リフレッシュスケジュールの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// リフレッシュ間隔
    pub interval: Duration,

    /// 起動直後にリフレッシュするか
    pub refresh_on_start: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            refresh_on_start: true,
        }
    }
}

impl RefreshConfig {
    /// 指定間隔で設定を作成
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// カレンダー設定から作成
    pub fn from_calendar(config: &CalendarConfig) -> Self {
        Self::new(config.refresh_interval())
    }

    /// 起動時リフレッシュの有無を設定
    pub fn with_refresh_on_start(mut self, enabled: bool) -> Self {
        self.refresh_on_start = enabled;
        self
    }

    /// 設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ScheduleError::InvalidInterval(self.interval));
        }
        Ok(())
    }
}
