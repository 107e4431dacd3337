use crate::models::{
    traits::{IAgent, IMovable, ICollision},
    common::{Position2D, Velocity2D, BoundingBox, GRAVITY, GROUND_LEVEL},
};
use tracing::debug;

/// 砲弾のライフサイクル状態
///
/// `Grounded` と `HitTarget` は終端状態で、互いに排他です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileState {
    /// 飛翔中（物理演算・衝突判定の対象）
    Flying,
    /// 地面に着地して停止
    Grounded,
    /// ターゲットに命中して停止
    HitTarget,
}

impl ProjectileState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProjectileState::Flying)
    }
}

/// 砲弾の物理パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileParams {
    /// 1ティックあたりの鉛直速度減少量
    pub gravity: f64,
    /// 着地判定の高さ
    pub ground_level: f64,
    /// 当たり判定の半幅
    pub half_width: f64,
    /// 当たり判定の半高
    pub half_height: f64,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            ground_level: GROUND_LEVEL,
            half_width: 8.0,
            half_height: 8.0,
        }
    }
}

/// 砲弾エージェント
///
/// 大砲から発射され、重力下で放物運動します。着地またはターゲット命中で
/// 速度が (0,0) に固定され、以降のティックでは一切更新されません。
/// 描画と集計のため、終端状態になっても破棄はされません。
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: String,
    pub position: Position2D,
    pub velocity: Velocity2D,
    pub state: ProjectileState,
    pub params: ProjectileParams,
    /// 飛翔時間（秒）
    pub flight_time: f64,
    /// 飛翔ティック数
    pub flight_ticks: u64,
}

impl Projectile {
    pub fn new(
        id: String,
        spawn_position: Position2D,
        velocity: Velocity2D,
        params: ProjectileParams,
    ) -> Self {
        Self {
            id,
            position: spawn_position,
            velocity,
            state: ProjectileState::Flying,
            params,
            flight_time: 0.0,
            flight_ticks: 0,
        }
    }

    /// 運動状態の更新
    ///
    /// 1. 水平位置の積分 → 2. 重力による鉛直速度の減少（dtに依存しない固定量）
    /// → 3. 鉛直位置の積分 → 4. 着地判定
    pub fn update_kinematics(&mut self, dt: f64) {
        self.position.x += self.velocity.x * dt;
        self.velocity.y -= self.params.gravity;
        self.position.y += self.velocity.y * dt;

        self.flight_time += dt;
        self.flight_ticks += 1;

        if self.position.y <= self.params.ground_level {
            self.position.y = self.params.ground_level;
            self.velocity = Velocity2D::zero();
            self.state = ProjectileState::Grounded;

            debug!(
                projectile_id = %self.id,
                landing_x = self.position.x,
                flight_time = self.flight_time,
                flight_ticks = self.flight_ticks,
                "PROJECTILE_GROUNDED: 砲弾が着地しました"
            );
        }
    }

    /// ターゲット命中による停止
    pub fn mark_hit(&mut self) {
        self.velocity = Velocity2D::zero();
        self.state = ProjectileState::HitTarget;
    }
}

impl IAgent for Projectile {
    fn tick(&mut self, dt: f64) {
        if self.state != ProjectileState::Flying {
            return;
        }
        self.update_kinematics(dt);
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.state == ProjectileState::Flying
    }
}

impl IMovable for Projectile {
    fn get_position(&self) -> Position2D {
        self.position
    }

    fn get_velocity(&self) -> Velocity2D {
        self.velocity
    }
}

impl ICollision for Projectile {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.position, self.params.half_width, self.params.half_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile_at(x: f64, y: f64, vx: f64, vy: f64) -> Projectile {
        Projectile::new(
            "P0001".to_string(),
            Position2D::new(x, y),
            Velocity2D::new(vx, vy),
            ProjectileParams::default(),
        )
    }

    #[test]
    fn test_single_tick_kinematics() {
        let mut p = projectile_at(146.0, 30.0, 780.0, 0.0);
        p.tick(1.0 / 30.0);

        assert!((p.position.x - 172.0).abs() < 1e-9);
        assert!((p.velocity.y + 9.8).abs() < 1e-12);
        assert!((p.position.y - (30.0 - 9.8 / 30.0)).abs() < 1e-9);
        assert_eq!(p.state, ProjectileState::Flying);
    }

    #[test]
    fn test_gravity_is_not_scaled_by_dt() {
        let mut a = projectile_at(0.0, 100.0, 0.0, 0.0);
        let mut b = projectile_at(0.0, 100.0, 0.0, 0.0);
        a.tick(0.01);
        b.tick(0.5);
        assert_eq!(a.velocity.y, b.velocity.y);
    }

    #[test]
    fn test_grounding_freezes_projectile() {
        let mut p = projectile_at(0.0, 11.0, 100.0, 0.0);
        p.tick(1.0);

        assert_eq!(p.state, ProjectileState::Grounded);
        assert_eq!(p.position.y, GROUND_LEVEL);
        assert!(p.velocity.is_zero());

        let frozen = p.position;
        for _ in 0..10 {
            p.tick(1.0 / 30.0);
        }
        assert_eq!(p.position, frozen);
        assert!(p.velocity.is_zero());
        assert_eq!(p.flight_ticks, 1);
    }

    #[test]
    fn test_exactly_at_ground_level_grounds() {
        // vy = 9.8 の上昇が重力で打ち消され、y はちょうど地面の高さに留まる
        let mut p = projectile_at(0.0, 10.0, 0.0, 9.8);
        p.tick(1.0);
        assert_eq!(p.state, ProjectileState::Grounded);
    }

    #[test]
    fn test_hit_target_is_terminal() {
        let mut p = projectile_at(500.0, 40.0, 300.0, 50.0);
        p.mark_hit();
        assert!(p.state.is_terminal());
        assert!(!p.is_active());

        p.tick(1.0 / 30.0);
        assert_eq!(p.position, Position2D::new(500.0, 40.0));
        assert!(p.get_velocity().is_zero());
    }
}
