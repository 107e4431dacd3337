//! # Shared モジュール
//!
//! 外部コラボレータ（クロック、コマンド受信、クエリ応答、描画）が独立に
//! アクセスするシミュレーション状態を、単一のミューテックスで保護したハンドルです。
//!
//! - 各操作はロックを1回だけ取得するため、`tick` とコマンドが部分的に
//!   交錯することはありません
//! - 非有限の `dt`・負の `dt`・非有限の回転量や問い合わせ座標はここで拒否し、
//!   物理コアには渡しません（コア自体は入力を検証しません）

use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::collision::HitEvent;
use crate::scenario::CommandAction;
use crate::simulation::{RenderSnapshot, SimulationEngine, SimulationSummary};

#[derive(Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<SimulationEngine>>,
}

impl SharedSimulation {
    pub fn new(engine: SimulationEngine) -> Self {
        Self { inner: Arc::new(Mutex::new(engine)) }
    }

    /// ロックを取得して処理を実行
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut SimulationEngine) -> T) -> Result<T, CommandError> {
        let mut engine = self.inner.lock().map_err(|_| CommandError::LockPoisoned)?;
        Ok(f(&mut engine))
    }

    // ---- クロック ----

    pub fn tick(&self, dt: f64) -> Result<Vec<HitEvent>, CommandError> {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "INPUT_REJECTED: 不正な時間刻みを拒否しました");
            return Err(CommandError::InvalidTimeStep(dt));
        }
        self.with_engine(|engine| engine.tick(dt))
    }

    // ---- コマンド ----

    pub fn rotate(&self, delta_degrees: f64) -> Result<(), CommandError> {
        if !delta_degrees.is_finite() {
            warn!(delta_degrees, "INPUT_REJECTED: 非有限の回転量を拒否しました");
            return Err(CommandError::NonFiniteRotation(delta_degrees));
        }
        self.with_engine(|engine| engine.rotate(delta_degrees))
    }

    pub fn adjust_fire_speed(&self, increase: bool) -> Result<(), CommandError> {
        self.with_engine(|engine| engine.adjust_fire_speed(increase))
    }

    pub fn fire(&self) -> Result<String, CommandError> {
        self.with_engine(|engine| engine.fire())
    }

    /// スケジュール済みコマンドの適用（境界検証付き）
    pub fn apply(&self, action: &CommandAction) -> Result<(), CommandError> {
        match action {
            CommandAction::Rotate { delta_deg } => self.rotate(*delta_deg),
            CommandAction::Solve { target_x } => self.solve(*target_x).map(|_| ()),
            other => self.with_engine(|engine| engine.apply_command(other)),
        }
    }

    /// 指定時刻までの予定コマンドを `apply` 経由で適用
    ///
    /// 境界検証で拒否されたコマンドは読み飛ばし、適用できた件数を返します。
    pub fn dispatch_commands_until(&self, time_s: f64) -> Result<usize, CommandError> {
        let due = self.with_engine(|engine| engine.take_due_commands(time_s))?;

        let mut applied = 0;
        for action in &due {
            match self.apply(action) {
                Ok(()) => applied += 1,
                Err(CommandError::LockPoisoned) => return Err(CommandError::LockPoisoned),
                Err(_) => {}
            }
        }
        Ok(applied)
    }

    // ---- クエリ ----

    pub fn current_angle(&self) -> Result<f64, CommandError> {
        self.with_engine(|engine| engine.current_angle())
    }

    pub fn target_positions(&self) -> Result<Vec<f64>, CommandError> {
        self.with_engine(|engine| engine.target_positions())
    }

    pub fn solve(&self, target_x: f64) -> Result<f64, CommandError> {
        if !target_x.is_finite() {
            warn!(target_x, "INPUT_REJECTED: 非有限のターゲット座標を拒否しました");
            return Err(CommandError::NonFiniteTarget(target_x));
        }
        self.with_engine(|engine| engine.solve(target_x))
    }

    pub fn score(&self) -> Result<u32, CommandError> {
        self.with_engine(|engine| engine.score())
    }

    pub fn next_command_time(&self) -> Result<Option<f64>, CommandError> {
        self.with_engine(|engine| engine.next_command_time())
    }

    pub fn is_settled(&self) -> Result<bool, CommandError> {
        self.with_engine(|engine| engine.is_settled())
    }

    pub fn snapshot(&self) -> Result<RenderSnapshot, CommandError> {
        self.with_engine(|engine| engine.snapshot())
    }

    pub fn summary(&self) -> Result<SimulationSummary, CommandError> {
        self.with_engine(|engine| engine.summary())
    }
}

/// 境界での入力エラー
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    InvalidTimeStep(f64),
    InvalidDuration(f64),
    NonFiniteRotation(f64),
    NonFiniteTarget(f64),
    LockPoisoned,
    TaskFailed(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::InvalidTimeStep(dt) => write!(f, "不正な時間刻み: {}", dt),
            CommandError::InvalidDuration(secs) => write!(f, "不正な実行時間: {}", secs),
            CommandError::NonFiniteRotation(delta) => write!(f, "非有限の回転量: {}", delta),
            CommandError::NonFiniteTarget(x) => write!(f, "非有限のターゲット座標: {}", x),
            CommandError::LockPoisoned => write!(f, "シミュレーション状態のロックが破損しています"),
            CommandError::TaskFailed(msg) => write!(f, "タスクが異常終了しました: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioConfig, ScheduledCommand};
    use std::thread;

    fn shared_engine() -> SharedSimulation {
        let mut config = ScenarioConfig::default();
        config.targets.positions = Some(vec![900.0, 1200.0, 1500.0]);
        let mut engine = SimulationEngine::new(config, 0);
        engine.initialize().expect("setup should succeed");
        SharedSimulation::new(engine)
    }

    #[test]
    fn test_rejects_malformed_inputs_at_boundary() {
        let shared = shared_engine();

        assert_eq!(shared.tick(-0.1), Err(CommandError::InvalidTimeStep(-0.1)));
        assert!(matches!(shared.tick(f64::NAN), Err(CommandError::InvalidTimeStep(_))));
        assert!(matches!(shared.tick(f64::INFINITY), Err(CommandError::InvalidTimeStep(_))));
        assert!(matches!(shared.rotate(f64::NAN), Err(CommandError::NonFiniteRotation(_))));
        assert!(matches!(shared.solve(f64::NEG_INFINITY), Err(CommandError::NonFiniteTarget(_))));
        assert!(matches!(
            shared.apply(&CommandAction::Rotate { delta_deg: f64::INFINITY }),
            Err(CommandError::NonFiniteRotation(_))
        ));

        assert_eq!(shared.current_angle(), Ok(0.0));
        assert!(shared.tick(0.0).is_ok());
        assert_eq!(shared.with_engine(|e| e.step_count), Ok(1));
    }

    #[test]
    fn test_dispatch_skips_rejected_commands() {
        let mut config = ScenarioConfig::default();
        config.targets.positions = Some(vec![900.0, 1200.0, 1500.0]);
        // validate() を経由しない構成なので非有限の引数がそのまま予定に入る
        config.commands = vec![
            ScheduledCommand { at_s: 0.0, action: CommandAction::Rotate { delta_deg: f64::NAN } },
            ScheduledCommand { at_s: 0.0, action: CommandAction::Rotate { delta_deg: 20.0 } },
            ScheduledCommand { at_s: 0.5, action: CommandAction::Solve { target_x: f64::INFINITY } },
            ScheduledCommand { at_s: 0.5, action: CommandAction::Fire },
        ];
        let mut engine = SimulationEngine::new(config, 0);
        engine.initialize().expect("setup should succeed");
        let shared = SharedSimulation::new(engine);

        assert_eq!(shared.dispatch_commands_until(0.0), Ok(1));
        assert_eq!(shared.with_engine(|e| e.cannon.angle_degrees), Ok(20.0));

        assert_eq!(shared.dispatch_commands_until(1.0), Ok(1));
        assert_eq!(shared.with_engine(|e| e.projectiles.len()), Ok(1));
        assert_eq!(shared.next_command_time(), Ok(None));
    }

    #[test]
    fn test_queries_through_handle() {
        let shared = shared_engine();
        assert_eq!(shared.target_positions(), Ok(vec![900.0, 1200.0, 1500.0]));
        assert_eq!(shared.solve(146.0), Ok(-1.0));

        shared.rotate(90.0).unwrap();
        let angle = shared.current_angle().unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_concurrent_commands_and_ticks_keep_invariants() {
        let shared = shared_engine();
        for _ in 0..10 {
            shared.adjust_fire_speed(true).unwrap();
        }

        let clock = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut last_score = 0;
                for _ in 0..2000 {
                    shared.tick(1.0 / 60.0).unwrap();
                    let score = shared.score().unwrap();
                    assert!(score >= last_score);
                    last_score = score;
                }
            })
        };

        let commander = {
            let shared = shared.clone();
            thread::spawn(move || {
                for round in 0..30 {
                    shared.apply(&CommandAction::FireAt { target_index: round % 3 }).unwrap();
                    shared.rotate(-5.0).unwrap();
                    shared.fire().unwrap();
                }
            })
        };

        clock.join().expect("clock thread panicked");
        commander.join().expect("command thread panicked");

        let (score, remaining, count) = shared
            .with_engine(|e| (e.score(), e.targets.remaining_count(), e.targets.len()))
            .unwrap();
        assert!(score <= 3);
        assert_eq!(score as usize + remaining, count);

        let snapshot = shared.snapshot().unwrap();
        assert_eq!(snapshot.score, score);
    }
}
