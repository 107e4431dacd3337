//! # Realtime モジュール
//!
//! 実時間でシミュレーションを駆動するドライバです。3つの独立したタスクが
//! `SharedSimulation` を介して同じ状態にアクセスします。
//!
//! - **クロック**: 一定周期でティックを発行し、実測した経過時間を `dt` として渡す
//! - **コマンド**: シナリオの予定時刻に合わせてコマンドを適用する
//! - **パブリッシャ**: 砲身角度とスコアを一定周期で出力する
//!
//! 終了時刻に達するか、全ターゲット撃破かつ飛翔中の砲弾が無くなった時点で終了します。

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::shared::{CommandError, SharedSimulation};
use crate::simulation::SimulationSummary;

/// 角度パブリッシュ周期（約30Hz）
pub const PUBLISH_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub tick_interval: Duration,
    pub publish_interval: Duration,
    pub duration: Duration,
}

impl RealtimeConfig {
    /// 秒単位の設定から作成
    ///
    /// `Duration` に変換できない値と、ナノ秒未満に丸められて0になる刻みは拒否します。
    pub fn new(dt_s: f64, t_max_s: f64) -> Result<Self, CommandError> {
        let tick_interval = Duration::try_from_secs_f64(dt_s)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(CommandError::InvalidTimeStep(dt_s))?;
        let duration = Duration::try_from_secs_f64(t_max_s)
            .map_err(|_| CommandError::InvalidDuration(t_max_s))?;

        Ok(Self {
            tick_interval,
            publish_interval: PUBLISH_INTERVAL,
            duration,
        })
    }
}

pub struct RealtimeDriver {
    shared: SharedSimulation,
    config: RealtimeConfig,
}

impl RealtimeDriver {
    pub fn new(shared: SharedSimulation, config: RealtimeConfig) -> Self {
        Self { shared, config }
    }

    pub async fn run(self) -> Result<SimulationSummary, CommandError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let start = Instant::now();

        info!(
            tick_interval_ms = self.config.tick_interval.as_millis() as u64,
            duration_s = self.config.duration.as_secs_f64(),
            "=== リアルタイム実行開始 ==="
        );

        let clock = tokio::spawn(run_clock(
            self.shared.clone(),
            self.config.clone(),
            start,
            shutdown_tx,
        ));
        let commands = tokio::spawn(run_commands(self.shared.clone(), start, shutdown_rx.clone()));
        let publisher = tokio::spawn(run_publisher(
            self.shared.clone(),
            self.config.publish_interval,
            shutdown_rx,
        ));

        let (clock, commands, publisher) = tokio::join!(clock, commands, publisher);
        for result in [clock, commands, publisher] {
            result.map_err(|e| CommandError::TaskFailed(e.to_string()))??;
        }

        let summary = self.shared.summary()?;
        info!(
            elapsed = summary.elapsed,
            ticks = summary.ticks,
            score = summary.score,
            "=== リアルタイム実行完了 ==="
        );
        Ok(summary)
    }
}

async fn run_clock(
    shared: SharedSimulation,
    config: RealtimeConfig,
    start: Instant,
    shutdown: watch::Sender<bool>,
) -> Result<(), CommandError> {
    let mut interval = time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // interval の初回は即時に完了する
    let mut last = interval.tick().await;

    let result = loop {
        let now = interval.tick().await;
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        if let Err(e) = shared.tick(dt) {
            break Err(e);
        }

        if now.duration_since(start) >= config.duration {
            break Ok(());
        }
        match shared.is_settled() {
            Ok(true) => {
                debug!("全ターゲット撃破、クロックを停止します");
                break Ok(());
            }
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // 受信側が既に終了していても問題ない
    let _ = shutdown.send(true);
    result
}

async fn run_commands(
    shared: SharedSimulation,
    start: Instant,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), CommandError> {
    while let Some(at_s) = shared.next_command_time()? {
        let deadline = start + Duration::from_secs_f64(at_s.max(0.0));

        tokio::select! {
            _ = time::sleep_until(deadline) => {
                shared.dispatch_commands_until(at_s)?;
            }
            _ = shutdown.changed() => break,
        }
    }
    Ok(())
}

async fn run_publisher(
    shared: SharedSimulation,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), CommandError> {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let angle = shared.current_angle()?;
                let score = shared.score()?;
                debug!(angle, score, "CANNON_STATE: 砲身角度[rad]");
            }
            _ = shutdown.changed() => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{CommandAction, ScenarioConfig, ScheduledCommand};
    use crate::simulation::SimulationEngine;

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_clears_targets() {
        let mut config = ScenarioConfig::default();
        config.targets.positions = Some(vec![900.0, 1200.0, 1500.0]);
        config.sim.t_max_s = 10.0;
        config.commands = (0..10)
            .map(|_| ScheduledCommand { at_s: 0.0, action: CommandAction::FireSpeed { increase: true } })
            .chain((0..3).map(|i| ScheduledCommand {
                at_s: 0.5 + i as f64,
                action: CommandAction::FireAt { target_index: i },
            }))
            .collect();

        let mut engine = SimulationEngine::new(config.clone(), 0);
        engine.initialize().unwrap();
        let shared = SharedSimulation::new(engine);

        let driver = RealtimeDriver::new(
            shared.clone(),
            RealtimeConfig::new(config.sim.dt_s, config.sim.t_max_s).unwrap(),
        );
        let summary = driver.run().await.unwrap();

        assert_eq!(summary.shots_fired, 3);
        assert_eq!(summary.score, 3);
        assert_eq!(shared.score(), Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_stops_at_duration() {
        let mut config = ScenarioConfig::default();
        config.sim.t_max_s = 1.0;

        let mut engine = SimulationEngine::new(config.clone(), 0);
        engine.initialize().unwrap();
        let shared = SharedSimulation::new(engine);

        let summary = RealtimeDriver::new(shared, RealtimeConfig::new(config.sim.dt_s, config.sim.t_max_s).unwrap())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.shots_fired, 0);
        assert!(summary.elapsed >= 1.0 - 1e-6);
        assert!(summary.elapsed < 1.1);
    }

    #[test]
    fn test_config_rejects_unrepresentable_durations() {
        assert!(RealtimeConfig::new(1.0 / 60.0, 20.0).is_ok());
        assert_eq!(RealtimeConfig::new(1e30, 20.0).err(), Some(CommandError::InvalidTimeStep(1e30)));
        assert_eq!(RealtimeConfig::new(1e-12, 20.0).err(), Some(CommandError::InvalidTimeStep(1e-12)));
        assert!(matches!(RealtimeConfig::new(f64::NAN, 20.0), Err(CommandError::InvalidTimeStep(_))));
        assert_eq!(RealtimeConfig::new(1.0 / 60.0, -1.0).err(), Some(CommandError::InvalidDuration(-1.0)));
        assert!(matches!(
            RealtimeConfig::new(1.0 / 60.0, f64::INFINITY),
            Err(CommandError::InvalidDuration(_))
        ));
    }
}
