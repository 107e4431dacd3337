use std::collections::BTreeSet;
use rand::Rng;
use tracing::{debug, error};
use crate::models::{
    traits::ICollision,
    common::{Position2D, BoundingBox},
};
use crate::simulation::SimulationError;

/// 静止ターゲット
///
/// セットアップ時に一度だけ配置され、移動も再生成もされません。
/// 一度 `hit` になったターゲットが元に戻ることはありません。
#[derive(Debug, Clone)]
pub struct Target {
    /// ターゲットの一意識別子
    pub id: String,
    /// 配置順のインデックス
    pub index: usize,
    /// ターゲットの位置（yは固定）
    pub position: Position2D,
    /// 命中済みかどうか
    pub hit: bool,
    /// 当たり判定の半幅
    pub half_width: f64,
    /// 当たり判定の半高
    pub half_height: f64,
}

impl Target {
    pub fn new(index: usize, x: f64, y: f64, half_width: f64, half_height: f64) -> Self {
        Self {
            id: format!("T{:03}", index + 1),
            index,
            position: Position2D::new(x, y),
            hit: false,
            half_width,
            half_height,
        }
    }
}

impl ICollision for Target {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.position, self.half_width, self.half_height)
    }
}

/// ターゲット配置のパラメータ
///
/// x座標は `[x_min, x_max]` の整数から一様に抽選し、既に配置済みの
/// 全ターゲットとの距離が `min_separation` を厳密に上回る候補のみ採用します。
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlacement {
    pub count: usize,
    pub min_separation: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub y: f64,
    pub max_attempts: u32,
}

impl TargetPlacement {
    /// 候補位置が全ての既存ターゲットから十分離れているか
    pub fn is_separated(&self, placed: &[f64], candidate: f64) -> bool {
        placed.iter().all(|x| (x - candidate).abs() > self.min_separation)
    }

    /// ターゲットのx座標を生成（配置順）
    ///
    /// 試行回数が `max_attempts` に達しても必要数を配置できなかった場合は
    /// `SimulationError::TargetPlacementExhausted` を返します。
    pub fn generate_positions<R: Rng>(&self, rng: &mut R) -> Result<Vec<f64>, SimulationError> {
        let lo = self.x_min.ceil() as i64;
        let hi = self.x_max.floor() as i64;

        let mut positions: Vec<f64> = Vec::with_capacity(self.count);
        let mut attempts = 0u32;

        while positions.len() < self.count {
            if attempts >= self.max_attempts || lo > hi {
                error!(
                    placed = positions.len(),
                    required = self.count,
                    attempts,
                    x_min = self.x_min,
                    x_max = self.x_max,
                    min_separation = self.min_separation,
                    "TARGET_PLACEMENT_EXHAUSTED: ターゲット配置の試行回数上限に達しました"
                );
                return Err(SimulationError::TargetPlacementExhausted {
                    placed: positions.len(),
                    required: self.count,
                    attempts,
                });
            }
            attempts += 1;

            let candidate = rng.gen_range(lo..=hi) as f64;
            if self.is_separated(&positions, candidate) {
                debug!(
                    index = positions.len(),
                    x = candidate,
                    attempts,
                    "TARGET_PLACED: ターゲットが配置されました"
                );
                positions.push(candidate);
            }
        }

        Ok(positions)
    }
}

/// ターゲット一覧と未命中集合（to-hit集合）を管理
///
/// to-hit集合は単調に縮小し、衝突判定はこの集合に残るターゲットのみを対象とします。
/// インデックス昇順で走査されるため、同時に重なった場合は若いインデックスが優先されます。
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    pub targets: Vec<Target>,
    to_hit: BTreeSet<usize>,
}

impl TargetRegistry {
    pub fn new(xs: &[f64], y: f64, half_width: f64, half_height: f64) -> Self {
        let targets: Vec<Target> = xs
            .iter()
            .enumerate()
            .map(|(index, &x)| Target::new(index, x, y, half_width, half_height))
            .collect();
        let to_hit = (0..targets.len()).collect();

        Self { targets, to_hit }
    }

    /// 配置順のターゲットx座標
    pub fn positions(&self) -> Vec<f64> {
        self.targets.iter().map(|t| t.position.x).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Target> {
        self.targets.get(index)
    }

    /// 未命中ターゲットのインデックス（昇順）
    pub fn remaining(&self) -> impl Iterator<Item = usize> + '_ {
        self.to_hit.iter().copied()
    }

    pub fn remaining_count(&self) -> usize {
        self.to_hit.len()
    }

    pub fn is_pending(&self, index: usize) -> bool {
        self.to_hit.contains(&index)
    }

    /// 命中を記録
    ///
    /// to-hit集合から取り除けた場合のみ `true` を返します。既に命中済み、
    /// または存在しないインデックスに対しては何も変更せず `false` を返します。
    pub fn register_hit(&mut self, index: usize) -> bool {
        if !self.to_hit.remove(&index) {
            return false;
        }
        if let Some(target) = self.targets.get_mut(index) {
            target.hit = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reference_placement() -> TargetPlacement {
        TargetPlacement {
            count: 3,
            min_separation: 200.0,
            x_min: 850.0,
            x_max: 1680.0,
            y: 40.0,
            max_attempts: 10_000,
        }
    }

    #[test]
    fn test_placement_separation_and_bounds() {
        let placement = reference_placement();
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let xs = placement.generate_positions(&mut rng).expect("placement should succeed");

            assert_eq!(xs.len(), 3);
            for (i, a) in xs.iter().enumerate() {
                assert!(*a >= 850.0 && *a <= 1680.0, "seed {} x {}", seed, a);
                for b in xs.iter().skip(i + 1) {
                    assert!((a - b).abs() > 200.0, "seed {} pair {} {}", seed, a, b);
                }
            }
        }
    }

    #[test]
    fn test_placement_is_deterministic_per_seed() {
        let placement = reference_placement();
        let a = placement.generate_positions(&mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let b = placement.generate_positions(&mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_placement_exhaustion_is_an_error() {
        // 幅100の区間に間隔200で3個は配置不可能
        let placement = TargetPlacement {
            x_min: 900.0,
            x_max: 1000.0,
            max_attempts: 500,
            ..reference_placement()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        match placement.generate_positions(&mut rng) {
            Err(SimulationError::TargetPlacementExhausted { placed, required, attempts }) => {
                assert_eq!(placed, 1);
                assert_eq!(required, 3);
                assert_eq!(attempts, 500);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_register_hit_is_at_most_once() {
        let mut registry = TargetRegistry::new(&[900.0, 1200.0, 1500.0], 40.0, 20.0, 30.0);
        assert_eq!(registry.remaining().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(registry.get(1).map(|t| t.id.as_str()), Some("T002"));

        assert!(registry.register_hit(1));
        assert!(!registry.register_hit(1));
        assert!(!registry.register_hit(7));

        assert!(registry.targets[1].hit);
        assert!(!registry.is_pending(1));
        assert_eq!(registry.remaining_count(), 2);
        assert_eq!(registry.positions(), vec![900.0, 1200.0, 1500.0]);
    }
}
