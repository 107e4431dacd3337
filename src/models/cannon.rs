use crate::models::{
    common::{Position2D, Velocity2D, math_utils},
    projectile::{Projectile, ProjectileParams},
};
use crate::scenario::CannonConfig;
use tracing::{info, debug, trace};

/// 発射記録
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub timestamp: f64,
    pub projectile_id: String,
    pub spawn_position: Position2D,
    pub velocity: Velocity2D,
    pub angle_degrees: f64,
    pub fire_speed: f64,
}

/// 発射統計情報
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchStats {
    pub total_launches: usize,
    pub current_angle_degrees: f64,
    pub current_fire_speed: f64,
    pub last_launch_time: Option<f64>,
}

/// 大砲
///
/// 固定された支点を中心に回転し、砲口から砲弾を発射します。
/// 角度は度単位で無制限に累積し（0〜360に正規化しない）、発射速度にも
/// 上下限はありません。
#[derive(Debug, Clone)]
pub struct Cannon {
    /// 支点（車輪中心）
    pub base_position: Position2D,
    /// 支点から砲身中心までの距離
    pub arm_offset: f64,
    /// 砲身角度[deg]
    pub angle_degrees: f64,
    /// 発射速度（抽象単位）
    pub fire_speed: f64,
    /// 発射速度の増減幅
    pub fire_speed_step: f64,
    /// 発射速度 → 初速の変換係数
    pub launch_scale: f64,
    /// 弾道計算用の変換係数（発射用とは別の経験値）
    pub solver_scale: f64,
    pub shot_counter: u32,
    pub launch_history: Vec<LaunchRecord>,
}

impl Cannon {
    /// 支点と砲身長以外は `CannonConfig::default()` の値で作成
    pub fn new(base_position: Position2D, arm_offset: f64) -> Self {
        Self::from_config(&CannonConfig {
            base_x: base_position.x,
            base_y: base_position.y,
            arm_offset,
            ..CannonConfig::default()
        })
    }

    pub fn from_config(config: &CannonConfig) -> Self {
        Self {
            base_position: Position2D::new(config.base_x, config.base_y),
            arm_offset: config.arm_offset,
            angle_degrees: config.initial_angle_deg,
            fire_speed: config.initial_fire_speed,
            fire_speed_step: config.fire_speed_step,
            launch_scale: config.launch_scale,
            solver_scale: config.solver_scale,
            shot_counter: 0,
            launch_history: Vec::new(),
        }
    }

    /// 砲身を回転（角度はそのまま加算）
    pub fn rotate(&mut self, delta_degrees: f64) {
        self.angle_degrees += delta_degrees;

        trace!(
            delta_degrees,
            angle_degrees = self.angle_degrees,
            "CANNON_ROTATED: 砲身が回転しました"
        );
    }

    /// 発射速度を一定量だけ増減
    pub fn adjust_fire_speed(&mut self, increase: bool) {
        if increase {
            self.fire_speed += self.fire_speed_step;
        } else {
            self.fire_speed -= self.fire_speed_step;
        }

        debug!(
            increase,
            fire_speed = self.fire_speed,
            "FIRE_SPEED_CHANGED: 発射速度が変更されました"
        );
    }

    /// 現在の砲身角度[rad]
    pub fn current_angle_radians(&self) -> f64 {
        math_utils::deg_to_rad(self.angle_degrees)
    }

    /// 砲口位置（支点から砲身長の2倍）
    pub fn muzzle_position(&self) -> Position2D {
        self.base_position
            .offset_polar(2.0 * self.arm_offset, self.current_angle_radians())
    }

    /// 描画用の砲身中心位置
    pub fn arm_center(&self) -> Position2D {
        self.base_position
            .offset_polar(self.arm_offset, self.current_angle_radians())
    }

    /// 弾道計算上の発射原点のx座標
    pub fn effective_origin_x(&self) -> f64 {
        self.base_position.x + 2.0 * self.arm_offset
    }

    /// 現在の発射速度での初速
    pub fn launch_speed(&self) -> f64 {
        self.fire_speed * self.launch_scale
    }

    /// 砲弾の発射
    ///
    /// 砲口位置（整数に切り捨て）から、現在の角度と発射速度で砲弾を生成します。
    pub fn fire(&mut self, current_time: f64, params: ProjectileParams) -> Projectile {
        self.shot_counter += 1;
        let projectile_id = format!("P{:04}", self.shot_counter);

        let spawn_position = self.muzzle_position().trunc();
        let velocity = Velocity2D::from_polar(self.launch_speed(), self.current_angle_radians());

        let projectile = Projectile::new(projectile_id.clone(), spawn_position, velocity, params);

        self.launch_history.push(LaunchRecord {
            timestamp: current_time,
            projectile_id: projectile_id.clone(),
            spawn_position,
            velocity,
            angle_degrees: self.angle_degrees,
            fire_speed: self.fire_speed,
        });

        info!(
            projectile_id = %projectile_id,
            spawn_x = spawn_position.x,
            spawn_y = spawn_position.y,
            velocity_x = velocity.x,
            velocity_y = velocity.y,
            angle_degrees = self.angle_degrees,
            fire_speed = self.fire_speed,
            "CANNON_FIRED: 砲弾が発射されました"
        );

        projectile
    }

    /// 発射統計の取得
    pub fn get_launch_stats(&self) -> LaunchStats {
        LaunchStats {
            total_launches: self.launch_history.len(),
            current_angle_degrees: self.angle_degrees,
            current_fire_speed: self.fire_speed,
            last_launch_time: self.launch_history.last().map(|r| r.timestamp),
        }
    }
}
