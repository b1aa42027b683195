//! リフレッシュスケジューラー
//!
//! 起動時とタイマーごとに [`EventStore::refresh`] を実行します。
//! 状態は Idle / Refreshing の 2 つで、Refreshing 中のトリガーは破棄されます。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cc_calendar::{EventStore, RefreshReport};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::config::RefreshConfig;
use crate::error::Result;

/// スケジューラーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Refreshing,
}

/// トリガーの結果
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// リフレッシュを実行した
    Completed(RefreshReport),
    /// 実行中のリフレッシュにまとめられた
    Coalesced,
}

impl TriggerOutcome {
    pub fn is_coalesced(&self) -> bool {
        matches!(self, TriggerOutcome::Coalesced)
    }
}

/// トリガー種別（ログ用）
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Startup,
    Timer,
    Manual,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
        }
    }
}

/// ループとハンドルで共有する状態
struct Shared {
    store: Arc<EventStore>,
    refreshing: AtomicBool,
}

/// 終了時に Refreshing フラグを戻す
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Shared {
    fn state(&self) -> SchedulerState {
        if self.refreshing.load(Ordering::SeqCst) {
            SchedulerState::Refreshing
        } else {
            SchedulerState::Idle
        }
    }

    async fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        // Idle -> Refreshing は 1 つの呼び出しだけが成功する
        if self.refreshing.swap(true, Ordering::SeqCst) {
            debug!(trigger = trigger.as_str(), "リフレッシュ実行中のためトリガーをまとめました");
            return TriggerOutcome::Coalesced;
        }
        let _guard = RefreshGuard(&self.refreshing);

        debug!(trigger = trigger.as_str(), "リフレッシュを開始");
        let report = self.store.refresh().await;

        if report.retained_previous {
            error!(
                trigger = trigger.as_str(),
                failed = report.failed(),
                elapsed_ms = report.elapsed_ms,
                "リフレッシュ失敗: 全ソースの取得に失敗したため前回のスナップショットを維持します"
            );
        } else if report.failed() > 0 {
            warn!(
                trigger = trigger.as_str(),
                succeeded = report.succeeded,
                failed = report.failed(),
                events = report.definition_count,
                elapsed_ms = report.elapsed_ms,
                "リフレッシュ完了（一部ソースが失敗）"
            );
        } else {
            info!(
                trigger = trigger.as_str(),
                sources = report.total_sources,
                events = report.definition_count,
                elapsed_ms = report.elapsed_ms,
                "リフレッシュ完了"
            );
        }

        TriggerOutcome::Completed(report)
    }
}

/// スケジューラーのハンドル
pub struct SchedulerHandle {
    /// スケジューラータスクの終了送信
    shutdown_tx: broadcast::Sender<()>,
    /// 実行中のタスクハンドル
    handle: JoinHandle<()>,
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// 現在の状態
    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// 即時リフレッシュ（実行中なら Coalesced）
    pub async fn refresh_now(&self) -> TriggerOutcome {
        self.shared.trigger(Trigger::Manual).await
    }

    /// スケジューラーを停止
    ///
    /// 待機中のタイマーは破棄し、実行中のリフレッシュは完了まで待ちます。
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// リフレッシュスケジューラー
pub struct RefreshScheduler {
    config: RefreshConfig,
    store: Arc<EventStore>,
}

impl RefreshScheduler {
    /// 新しいスケジューラーを作成
    pub fn new(store: Arc<EventStore>, config: RefreshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// スケジューラーを開始
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let shared = Arc::new(Shared {
            store: self.store,
            refreshing: AtomicBool::new(false),
        });

        let period = self.config.interval;
        let refresh_on_start = self.config.refresh_on_start;
        let first_tick = if refresh_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let loop_shared = Arc::clone(&shared);
        let handle = tokio::spawn(async move {
            info!(
                interval_secs = period.as_secs(),
                sources = loop_shared.store.sources().len(),
                "スケジューラーを開始しました"
            );

            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut trigger = if refresh_on_start {
                Trigger::Startup
            } else {
                Trigger::Timer
            };

            loop {
                // タイマーを待機（シャットダウン要求を優先）
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("シャットダウン要求を受信");
                        break;
                    }
                    _ = ticker.tick() => {
                        // リフレッシュ中はシャットダウンを受け付けない
                        loop_shared.trigger(trigger).await;
                        trigger = Trigger::Timer;
                    }
                }
            }

            info!("スケジューラーを停止しました");
        });

        SchedulerHandle {
            shutdown_tx,
            handle,
            shared,
        }
    }
}
