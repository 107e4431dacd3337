//! # Collision モジュール
//!
//! 飛翔中の砲弾と未命中ターゲットの重なり判定を、ティックごとに1回実行します。
//!
//! - 判定は軸平行バウンディングボックス同士の交差で行います
//! - 1つの砲弾につき1ティックで計上される命中は最大1件です（最初に見つかった
//!   ターゲット、すなわちインデックスの最も小さいものが優先されます）
//! - 命中したターゲットはto-hit集合から除かれ、以降は判定対象になりません

use crate::models::{ICollision, IAgent, Projectile, TargetRegistry};
use tracing::info;

/// 命中イベント
#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub projectile_id: String,
    pub target_index: usize,
    pub target_x: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionDetector;

impl CollisionDetector {
    pub fn new() -> Self {
        Self
    }

    /// 衝突判定を実行し、命中を記録する
    ///
    /// 命中した砲弾は `HitTarget` に遷移して停止し、ターゲットはto-hit集合から除かれます。
    /// 戻り値は今回のティックで新たに発生した命中の一覧です。
    pub fn detect(
        &self,
        projectiles: &mut [Projectile],
        registry: &mut TargetRegistry,
    ) -> Vec<HitEvent> {
        let mut hits = Vec::new();

        for projectile in projectiles.iter_mut().filter(|p| p.is_active()) {
            let struck = registry.remaining().find(|&index| {
                registry
                    .get(index)
                    .is_some_and(|target| projectile.collides_with(target))
            });

            let Some(index) = struck else {
                continue;
            };

            if registry.register_hit(index) {
                projectile.mark_hit();

                let target_x = registry.get(index).map_or(f64::NAN, |t| t.position.x);
                hits.push(HitEvent {
                    projectile_id: projectile.get_id(),
                    target_index: index,
                    target_x,
                });
            }
        }

        hits
    }
}

/// 命中イベントのログ出力
pub fn log_hit(event: &HitEvent, score: u32) {
    info!(
        projectile_id = %event.projectile_id,
        target_index = event.target_index,
        target_x = event.target_x,
        score,
        "TARGET_HIT: 砲弾がターゲットに命中しました"
    );
}
