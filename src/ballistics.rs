//! # Ballistics モジュール
//!
//! 「現在の発射速度で、水平位置 `target_x` のターゲットに当てるには何度で撃てばよいか」
//! に閉形式で答えるソルバーを提供します。
//!
//! 射程方程式 `R = v² sin(2θ) / g` を逆に解き、低角側の解のみを返します。
//! 高角側の解（`90° - θ`）は提示しません。
//!
//! ```text
//! R     = target_x - (base_x + 2 * arm_offset)
//! v     = fire_speed * solver_scale
//! value = R * g / v²
//! 0 < value <= 1  →  θ = asin(value) / 2
//! それ以外          →  到達不能
//! ```

use crate::models::{Cannon, GRAVITY};

/// 到達不能を表す番兵値
pub const UNREACHABLE_ANGLE: f64 = -1.0;

/// 弾道ソルバー（状態を持たない純粋関数の集まり）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticsSolver {
    pub gravity: f64,
}

impl Default for BallisticsSolver {
    fn default() -> Self {
        Self { gravity: GRAVITY }
    }
}

impl BallisticsSolver {
    pub fn new(gravity: f64) -> Self {
        Self { gravity }
    }

    /// 射程方程式の正規化値 `R * g / v²`
    pub fn range_ratio(&self, cannon: &Cannon, target_x: f64) -> f64 {
        let range = target_x - cannon.effective_origin_x();
        let speed = cannon.fire_speed * cannon.solver_scale;
        range * self.gravity / speed.powi(2)
    }

    /// 低角側の発射角[rad]。到達不能なら `None`
    ///
    /// `value == 0`（ターゲットが発射原点と一致）も到達不能として扱います。
    pub fn firing_angle(&self, cannon: &Cannon, target_x: f64) -> Option<f64> {
        let value = self.range_ratio(cannon, target_x);
        if value > 0.0 && value <= 1.0 {
            Some(0.5 * value.asin())
        } else {
            None
        }
    }

    /// 外部クエリ向け: 発射角[rad]、到達不能なら `UNREACHABLE_ANGLE`
    pub fn solve(&self, cannon: &Cannon, target_x: f64) -> f64 {
        self.firing_angle(cannon, target_x).unwrap_or(UNREACHABLE_ANGLE)
    }

    /// 現在の発射速度での最大射程（45°）に対応するx座標
    pub fn max_reach_x(&self, cannon: &Cannon) -> f64 {
        let speed = cannon.fire_speed * cannon.solver_scale;
        cannon.effective_origin_x() + speed.powi(2) / self.gravity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position2D;
    use std::f64::consts::FRAC_PI_4;

    fn reference_cannon() -> Cannon {
        Cannon::new(Position2D::new(50.0, 30.0), 48.0)
    }

    #[test]
    fn test_round_trip_low_angle() {
        let cannon = reference_cannon();
        let solver = BallisticsSolver::default();
        let speed = cannon.fire_speed * cannon.solver_scale;

        for degrees in [5.0f64, 15.0, 30.0, 44.0] {
            let theta = degrees.to_radians();
            let x = cannon.effective_origin_x() + speed.powi(2) * (2.0 * theta).sin() / GRAVITY;
            let solved = solver.solve(&cannon, x);
            assert!((solved - theta).abs() < 1e-9, "{} deg → {}", degrees, solved);
        }
    }

    #[test]
    fn test_high_angle_maps_to_low_angle_complement() {
        let cannon = reference_cannon();
        let solver = BallisticsSolver::default();
        let speed = cannon.fire_speed * cannon.solver_scale;

        let high = 70.0f64.to_radians();
        let x = cannon.effective_origin_x() + speed.powi(2) * (2.0 * high).sin() / GRAVITY;
        let solved = solver.solve(&cannon, x);
        assert!((solved - 20.0f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_origin_is_unreachable() {
        let cannon = reference_cannon();
        let solver = BallisticsSolver::default();
        assert_eq!(solver.solve(&cannon, 146.0), UNREACHABLE_ANGLE);
        assert_eq!(solver.solve(&cannon, 100.0), UNREACHABLE_ANGLE);
    }

    #[test]
    fn test_beyond_max_range_is_unreachable() {
        let cannon = reference_cannon();
        let solver = BallisticsSolver::default();
        // v = 100, 最大射程 = 10000 / 9.8 ≈ 1020.4
        assert_eq!(solver.solve(&cannon, 146.0 + 1021.0), UNREACHABLE_ANGLE);
        assert_eq!(solver.solve(&cannon, 1.0e9), UNREACHABLE_ANGLE);
        assert!(solver.firing_angle(&cannon, 146.0 + 1020.0).is_some());
    }

    #[test]
    fn test_exact_unit_ratio_boundary() {
        let cannon = reference_cannon();
        // g = v² / R になるよう選ぶと value がちょうど 1.0
        let solver = BallisticsSolver::new(10000.0 / 1000.0);
        assert_eq!(solver.range_ratio(&cannon, 1146.0), 1.0);
        assert!((solver.solve(&cannon, 1146.0) - FRAC_PI_4).abs() < 1e-15);

        assert!(solver.range_ratio(&cannon, 1146.0 + 1e-9) > 1.0);
        assert_eq!(solver.solve(&cannon, 1146.0 + 1e-9), UNREACHABLE_ANGLE);
    }

    #[test]
    fn test_negative_fire_speed_uses_squared_speed() {
        let mut cannon = reference_cannon();
        cannon.fire_speed = -10000.0;
        let solver = BallisticsSolver::default();
        assert!(solver.firing_angle(&cannon, 600.0).is_some());
        assert!(solver.max_reach_x(&cannon) > 1166.0);
    }
}
