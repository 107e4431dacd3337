use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;

use crate::models::{ProjectileParams, TargetPlacement, GRAVITY, GROUND_LEVEL};

/// 時間刻みの下限[s]
pub const MIN_TIME_STEP_S: f64 = 1e-6;

/// 時間設定の上限[s]（約1年）
pub const MAX_TIME_S: f64 = 3.2e7;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "標準の大砲シミュレーション（ターゲット3基）".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    pub seed: u64,
    pub max_placement_attempts: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_s: 1.0 / 60.0,
            t_max_s: 20.0,
            seed: 0,
            max_placement_attempts: 10_000,
        }
    }
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    pub field_width: f64,
    pub field_height: f64,
    pub ground_level: f64,
    pub gravity: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            field_width: 1700.0,
            field_height: 500.0,
            ground_level: GROUND_LEVEL,
            gravity: GRAVITY,
        }
    }
}

/// 大砲設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CannonConfig {
    pub base_x: f64,
    pub base_y: f64,
    pub arm_offset: f64,
    pub initial_angle_deg: f64,
    pub initial_fire_speed: f64,
    pub fire_speed_step: f64,
    pub launch_scale: f64,
    pub solver_scale: f64,
}

impl Default for CannonConfig {
    fn default() -> Self {
        Self {
            base_x: 50.0,
            base_y: 30.0,
            arm_offset: 48.0,
            initial_angle_deg: 0.0,
            initial_fire_speed: 10000.0,
            fire_speed_step: 500.0,
            launch_scale: 0.078,
            solver_scale: 0.01,
        }
    }
}

/// ターゲット配置設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub count: usize,
    pub min_separation: f64,
    pub right_margin: f64,
    pub y: f64,
    /// 固定配置（指定時は乱数配置の代わりに使用）
    pub positions: Option<Vec<f64>>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            count: 3,
            min_separation: 200.0,
            right_margin: 20.0,
            y: 40.0,
            positions: None,
        }
    }
}

/// 当たり判定の半幅/半高
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct HalfExtents {
    pub half_width: f64,
    pub half_height: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HitboxConfig {
    pub projectile: HalfExtents,
    pub target: HalfExtents,
}

impl Default for HitboxConfig {
    fn default() -> Self {
        Self {
            projectile: HalfExtents { half_width: 8.0, half_height: 8.0 },
            target: HalfExtents { half_width: 20.0, half_height: 30.0 },
        }
    }
}

/// スケジュールされたコマンド
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandAction {
    /// 砲身回転[deg]
    Rotate { delta_deg: f64 },
    /// 発射速度の増減
    FireSpeed { increase: bool },
    /// 現在の姿勢で発射
    Fire,
    /// 弾道クエリ（結果はログ出力のみ）
    Solve { target_x: f64 },
    /// 指定ターゲットを狙って発射（弾道計算 → 回転 → 発射）
    FireAt { target_index: usize },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScheduledCommand {
    pub at_s: f64,
    pub action: CommandAction,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub world: WorldConfig,
    pub cannon: CannonConfig,
    pub targets: TargetsConfig,
    pub hitboxes: HitboxConfig,
    pub commands: Vec<ScheduledCommand>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証（実時間ドライバで Duration に変換できる範囲）
        if !(self.sim.dt_s >= MIN_TIME_STEP_S && self.sim.dt_s <= MAX_TIME_S) {
            return Err(ScenarioError::ValidationError(format!(
                "dt_s must be within [{}, {}]", MIN_TIME_STEP_S, MAX_TIME_S
            )));
        }
        if !(self.sim.t_max_s > 0.0 && self.sim.t_max_s <= MAX_TIME_S) {
            return Err(ScenarioError::ValidationError(format!(
                "t_max_s must be within (0, {}]", MAX_TIME_S
            )));
        }
        if self.sim.max_placement_attempts == 0 {
            return Err(ScenarioError::ValidationError(
                "max_placement_attempts must be at least 1".to_string(),
            ));
        }

        // フィールドの検証
        if !(self.world.field_width > 0.0) || !(self.world.field_height > 0.0) {
            return Err(ScenarioError::ValidationError("Invalid field dimensions".to_string()));
        }

        // ターゲット配置領域の検証
        if self.targets.count == 0 {
            return Err(ScenarioError::ValidationError("targets.count must be at least 1".to_string()));
        }
        let (x_min, x_max) = self.spawn_region();
        if x_min.ceil() > x_max.floor() {
            return Err(ScenarioError::ValidationError(format!(
                "Empty target spawn region [{}, {}]",
                x_min, x_max
            )));
        }

        // 固定配置の検証
        if let Some(positions) = &self.targets.positions {
            self.validate_fixed_positions(positions, x_min, x_max)?;
        }

        // 当たり判定の検証
        let boxes = [self.hitboxes.projectile, self.hitboxes.target];
        if boxes.iter().any(|b| b.half_width < 0.0 || b.half_height < 0.0) {
            return Err(ScenarioError::ValidationError("Hitbox extents must be non-negative".to_string()));
        }

        // コマンド時刻の検証
        for command in &self.commands {
            if !(command.at_s >= 0.0 && command.at_s <= self.sim.t_max_s) {
                return Err(ScenarioError::ValidationError(format!(
                    "Command {:?} at {}s is outside [0, {}]",
                    command.action, command.at_s, self.sim.t_max_s
                )));
            }
            let finite = match &command.action {
                CommandAction::Rotate { delta_deg } => delta_deg.is_finite(),
                CommandAction::Solve { target_x } => target_x.is_finite(),
                _ => true,
            };
            if !finite {
                return Err(ScenarioError::ValidationError(format!(
                    "Command {:?} has a non-finite argument", command.action
                )));
            }
        }

        Ok(())
    }

    fn validate_fixed_positions(&self, positions: &[f64], x_min: f64, x_max: f64) -> Result<(), ScenarioError> {
        if positions.len() != self.targets.count {
            return Err(ScenarioError::ValidationError(format!(
                "targets.positions has {} entries, expected {}",
                positions.len(), self.targets.count
            )));
        }
        let placement = self.target_placement();
        for (i, &x) in positions.iter().enumerate() {
            if !(x >= x_min && x <= x_max) {
                return Err(ScenarioError::ValidationError(format!(
                    "Target position {} outside spawn region [{}, {}]", x, x_min, x_max
                )));
            }
            if !placement.is_separated(&positions[..i], x) {
                return Err(ScenarioError::ValidationError(format!(
                    "Target position {} closer than {} to another target", x, self.targets.min_separation
                )));
            }
        }
        Ok(())
    }

    /// ターゲット配置領域（フィールド右半分）
    pub fn spawn_region(&self) -> (f64, f64) {
        (
            self.world.field_width / 2.0,
            self.world.field_width - self.targets.right_margin,
        )
    }

    pub fn target_placement(&self) -> TargetPlacement {
        let (x_min, x_max) = self.spawn_region();
        TargetPlacement {
            count: self.targets.count,
            min_separation: self.targets.min_separation,
            x_min,
            x_max,
            y: self.targets.y,
            max_attempts: self.sim.max_placement_attempts,
        }
    }

    pub fn projectile_params(&self) -> ProjectileParams {
        ProjectileParams {
            gravity: self.world.gravity,
            ground_level: self.world.ground_level,
            half_width: self.hitboxes.projectile.half_width,
            half_height: self.hitboxes.projectile.half_height,
        }
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.4}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("シード値: {}", self.sim.seed);
        println!();

        println!("=== 大砲 ===");
        println!("支点: ({:.0}, {:.0})  砲身長: {:.0}", self.cannon.base_x, self.cannon.base_y, self.cannon.arm_offset);
        println!("初期角度: {:.1}度  発射速度: {:.0} (±{:.0})",
                 self.cannon.initial_angle_deg, self.cannon.initial_fire_speed, self.cannon.fire_speed_step);
        println!();

        println!("=== ターゲット ===");
        let (x_min, x_max) = self.spawn_region();
        println!("数: {}基  配置範囲: [{:.0}, {:.0}]  最小間隔: {:.0}",
                 self.targets.count, x_min, x_max, self.targets.min_separation);
        println!("スケジュール済みコマンド: {}件", self.commands.len());
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
