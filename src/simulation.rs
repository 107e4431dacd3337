//! # Simulation モジュール
//!
//! 大砲シミュレーションの中核となるシミュレーションエンジンを提供します。
//!
//! エンジンは大砲・砲弾・ターゲット・スコアを単一の集約として所有し、
//! 外部クロックからの `tick(dt)`、コマンド（回転・発射速度変更・発射）、
//! クエリ（角度・ターゲット位置・弾道計算）の契約を提供します。
//!
//! ## ティック処理順序
//!
//! 1. **砲弾処理**: 飛翔中の砲弾のみ運動を積分（着地判定を含む）
//! 2. **衝突処理**: 飛翔中の砲弾と未命中ターゲットの重なり判定、スコア加算
//!
//! 位置更新の後に衝突判定を行うため、更新前の位置で命中が計上されることはありません。
//! 終端状態（着地・命中）の砲弾は描画用に保持されますが、以降は一切更新されません。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use cannonsim::simulation::SimulationEngine;
//! use cannonsim::scenario::ScenarioConfig;
//!
//! let mut engine = SimulationEngine::new(ScenarioConfig::default(), 1);
//! engine.initialize()?;
//! engine.adjust_fire_speed(true);
//! engine.fire();
//! engine.tick(1.0 / 60.0);
//! ```

use crate::ballistics::BallisticsSolver;
use crate::collision::{CollisionDetector, HitEvent, log_hit};
use crate::models::*;
use crate::scenario::{CommandAction, ScenarioConfig, ScheduledCommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn, debug, trace};

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub seed: u64,
    pub step_count: u64,

    pub cannon: Cannon,
    pub projectiles: Vec<Projectile>,
    pub targets: TargetRegistry,
    pub score: u32,

    pub solver: BallisticsSolver,
    pub collision: CollisionDetector,
    pub projectile_params: ProjectileParams,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,

    schedule: Vec<ScheduledCommand>,
    next_command: usize,
    initialized: bool,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let dt = scenario.sim.dt_s;
        let max_time = scenario.sim.t_max_s;
        let seed = scenario.sim.seed;

        let cannon = Cannon::from_config(&scenario.cannon);
        let solver = BallisticsSolver::new(scenario.world.gravity);
        let projectile_params = scenario.projectile_params();

        let mut schedule = scenario.commands.clone();
        schedule.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));

        Self {
            current_time: 0.0,
            dt,
            max_time,
            seed,
            step_count: 0,
            cannon,
            projectiles: Vec::new(),
            targets: TargetRegistry::default(),
            score: 0,
            solver,
            collision: CollisionDetector::new(),
            projectile_params,
            scenario_config: scenario,
            verbose_level,
            schedule,
            next_command: 0,
            initialized: false,
        }
    }

    /// セットアップ（ターゲット配置、to-hit集合とスコアの初期化）
    ///
    /// ターゲット配置が試行回数上限に達した場合は致命的エラーとして返します。
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        let placement = self.scenario_config.target_placement();
        let xs = match &self.scenario_config.targets.positions {
            Some(fixed) => fixed.clone(),
            None => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                placement.generate_positions(&mut rng)?
            }
        };

        let target_box = self.scenario_config.hitboxes.target;
        self.targets = TargetRegistry::new(
            &xs,
            placement.y,
            target_box.half_width,
            target_box.half_height,
        );
        self.projectiles.clear();
        self.score = 0;
        self.initialized = true;

        info!(
            target_positions = ?self.targets.positions(),
            seed = self.seed,
            "SIMULATION_INITIALIZED: ターゲットの配置が完了しました"
        );

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  大砲: 支点({:.0}, {:.0}) 発射速度 {:.0}",
                  self.cannon.base_position.x, self.cannon.base_position.y, self.cannon.fire_speed);
            info!("  ターゲット: {}基", self.targets.len());
            info!("  スケジュール済みコマンド: {}件", self.schedule.len());
        }

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ---- コマンド ----

    /// 砲身を回転[deg]
    pub fn rotate(&mut self, delta_degrees: f64) {
        self.cannon.rotate(delta_degrees);
    }

    /// 発射速度の増減
    pub fn adjust_fire_speed(&mut self, increase: bool) {
        self.cannon.adjust_fire_speed(increase);
    }

    /// 現在の大砲状態で砲弾を発射し、砲弾IDを返す
    pub fn fire(&mut self) -> String {
        let projectile = self.cannon.fire(self.current_time, self.projectile_params);
        let id = projectile.get_id();
        self.projectiles.push(projectile);
        id
    }

    /// 指定ターゲットを狙って発射
    ///
    /// 弾道ソルバーの角度まで砲身を回転してから発射します。
    /// 到達不能または存在しないターゲットの場合は何もせず `None` を返します。
    pub fn fire_at(&mut self, target_index: usize) -> Option<String> {
        let Some(target_x) = self.targets.get(target_index).map(|t| t.position.x) else {
            warn!(target_index, "FIRE_AT_SKIPPED: 存在しないターゲットです");
            return None;
        };

        let Some(angle) = self.firing_angle(target_x) else {
            warn!(
                target_index,
                target_x,
                fire_speed = self.cannon.fire_speed,
                "FIRE_AT_SKIPPED: 現在の発射速度ではターゲットに到達できません"
            );
            return None;
        };

        let delta = math_utils::rad_to_deg(angle) - self.cannon.angle_degrees;
        self.rotate(delta);
        Some(self.fire())
    }

    /// スケジュールされたコマンドの適用
    pub fn apply_command(&mut self, action: &CommandAction) {
        match action {
            CommandAction::Rotate { delta_deg } => self.rotate(*delta_deg),
            CommandAction::FireSpeed { increase } => self.adjust_fire_speed(*increase),
            CommandAction::Fire => {
                self.fire();
            }
            CommandAction::Solve { target_x } => {
                let angle = self.solve(*target_x);
                info!(target_x, angle, "BALLISTICS_QUERY: 弾道計算を実行しました");
            }
            CommandAction::FireAt { target_index } => {
                self.fire_at(*target_index);
            }
        }
    }

    /// 現在時刻までに予定されたコマンドを順に適用
    pub fn dispatch_due_commands(&mut self) -> usize {
        self.dispatch_commands_until(self.current_time)
    }

    /// 指定時刻までに予定されたコマンドを順に適用
    pub fn dispatch_commands_until(&mut self, time_s: f64) -> usize {
        let due = self.take_due_commands(time_s);
        for action in &due {
            self.apply_command(action);
        }
        due.len()
    }

    /// 指定時刻までに予定されたコマンドを適用せずに取り出す（予定時刻順）
    pub fn take_due_commands(&mut self, time_s: f64) -> Vec<CommandAction> {
        let pending = &self.schedule[self.next_command..];
        let due = pending.partition_point(|c| c.at_s <= time_s);
        self.next_command += due;
        pending[..due].iter().map(|c| c.action.clone()).collect()
    }

    /// 次に予定されているコマンドの時刻
    pub fn next_command_time(&self) -> Option<f64> {
        self.schedule.get(self.next_command).map(|c| c.at_s)
    }

    pub fn pending_commands(&self) -> usize {
        self.schedule.len() - self.next_command
    }

    // ---- クロック ----

    /// 1ティックの処理
    ///
    /// `dt` は検証しません（境界での検証は `SharedSimulation` が担当）。
    pub fn tick(&mut self, dt: f64) -> Vec<HitEvent> {
        self.process_projectiles(dt);
        let hits = self.process_collisions();

        self.current_time += dt;
        self.step_count += 1;

        hits
    }

    fn process_projectiles(&mut self, dt: f64) {
        for projectile in &mut self.projectiles {
            if projectile.is_active() {
                projectile.tick(dt);
            }
        }
    }

    fn process_collisions(&mut self) -> Vec<HitEvent> {
        let hits = self.collision.detect(&mut self.projectiles, &mut self.targets);
        for hit in &hits {
            self.score += 1;
            log_hit(hit, self.score);
        }
        hits
    }

    /// ヘッドレス実行（固定時間刻み）
    pub fn run(&mut self) -> Result<SimulationSummary, SimulationError> {
        if !self.initialized {
            return Err(SimulationError::NotInitialized);
        }

        info!("=== シミュレーション実行開始 ===");

        while self.current_time < self.max_time {
            self.dispatch_due_commands();
            self.tick(self.dt);

            if self.verbose_level > 2 {
                trace!("時刻: {:.3}秒 (ステップ: {})", self.current_time, self.step_count);
            }

            if self.step_count % 600 == 0 && self.verbose_level > 0 {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!("進行状況: {:.1}% ({:.1}/{:.1}秒) スコア: {}",
                      progress, self.current_time, self.max_time, self.score);
            }

            if self.is_settled() {
                debug!("全ターゲット撃破、飛翔中の砲弾なし");
                break;
            }
        }

        let summary = self.summary();
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.2}秒", summary.elapsed);
        info!("総ステップ数: {}", summary.ticks);
        info!("発射数: {}  スコア: {}  残りターゲット: {}",
              summary.shots_fired, summary.score, summary.remaining_targets);

        Ok(summary)
    }

    /// 全ターゲット撃破済みで、飛翔中の砲弾も予定コマンドも残っていない
    pub fn is_settled(&self) -> bool {
        self.targets.remaining_count() == 0
            && self.pending_commands() == 0
            && !self.projectiles.iter().any(|p| p.is_active())
    }

    // ---- クエリ ----

    /// 現在の砲身角度[rad]
    pub fn current_angle(&self) -> f64 {
        self.cannon.current_angle_radians()
    }

    /// ターゲットのx座標（配置順）
    pub fn target_positions(&self) -> Vec<f64> {
        self.targets.positions()
    }

    /// 弾道クエリ: 発射角[rad]、到達不能なら -1
    pub fn solve(&self, target_x: f64) -> f64 {
        self.solver.solve(&self.cannon, target_x)
    }

    pub fn firing_angle(&self, target_x: f64) -> Option<f64> {
        self.solver.firing_angle(&self.cannon, target_x)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// 描画用スナップショット（読み取り専用）
    pub fn snapshot(&self) -> RenderSnapshot {
        let mut sprites = Vec::with_capacity(2 + self.projectiles.len() + self.targets.len());

        sprites.push(SpriteRecord {
            id: "wheel".to_string(),
            kind: SpriteKind::CannonWheel,
            position: self.cannon.base_position,
            active: true,
            state: None,
        });
        sprites.push(SpriteRecord {
            id: "arm".to_string(),
            kind: SpriteKind::CannonArm,
            position: self.cannon.arm_center(),
            active: true,
            state: None,
        });
        sprites.extend(self.projectiles.iter().map(|p| SpriteRecord {
            id: p.get_id(),
            kind: SpriteKind::Projectile,
            position: p.get_position(),
            active: p.is_active(),
            state: Some(p.state),
        }));
        sprites.extend(self.targets.targets.iter().map(|t| SpriteRecord {
            id: t.id.clone(),
            kind: SpriteKind::Target,
            position: t.position,
            active: !t.hit,
            state: None,
        }));

        RenderSnapshot {
            time: self.current_time,
            cannon_angle_degrees: self.cannon.angle_degrees,
            fire_speed: self.cannon.fire_speed,
            score: self.score,
            sprites,
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        let count_state = |state: ProjectileState| {
            self.projectiles.iter().filter(|p| p.state == state).count()
        };

        SimulationSummary {
            elapsed: self.current_time,
            ticks: self.step_count,
            shots_fired: self.projectiles.len(),
            score: self.score,
            remaining_targets: self.targets.remaining_count(),
            grounded: count_state(ProjectileState::Grounded),
            hits: count_state(ProjectileState::HitTarget),
        }
    }
}

/// 描画コラボレータ向けのスプライトレコード
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRecord {
    pub id: String,
    pub kind: SpriteKind,
    pub position: Position2D,
    pub active: bool,
    /// 砲弾のライフサイクル状態（砲弾以外は `None`）
    pub state: Option<ProjectileState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub time: f64,
    pub cannon_angle_degrees: f64,
    pub fire_speed: f64,
    pub score: u32,
    pub sprites: Vec<SpriteRecord>,
}

impl RenderSnapshot {
    pub fn of_kind(&self, kind: SpriteKind) -> impl Iterator<Item = &SpriteRecord> {
        self.sprites.iter().filter(move |s| s.kind == kind)
    }
}

/// 実行結果の集計
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub elapsed: f64,
    pub ticks: u64,
    pub shots_fired: usize,
    pub score: u32,
    pub remaining_targets: usize,
    pub grounded: usize,
    pub hits: usize,
}

/// シミュレーションエラー
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    TargetPlacementExhausted {
        placed: usize,
        required: usize,
        attempts: u32,
    },
    NotInitialized,
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::TargetPlacementExhausted { placed, required, attempts } => {
                write!(f, "ターゲット配置に失敗しました: {}/{}基 ({}回試行)", placed, required, attempts)
            }
            SimulationError::NotInitialized => {
                write!(f, "シミュレーションが初期化されていません")
            }
        }
    }
}

impl std::error::Error for SimulationError {}
