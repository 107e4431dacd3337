use crate::models::common::*;

/// シミュレーションクロックで時間発展するエージェントの基本インターフェース
pub trait IAgent {
    /// 1ティックの処理実行
    fn tick(&mut self, dt: f64);

    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブ（物理演算・衝突判定の対象）かどうか
    fn is_active(&self) -> bool;
}

/// 移動可能なエージェントのインターフェース
pub trait IMovable {
    /// 現在位置の取得
    fn get_position(&self) -> Position2D;

    /// 現在速度の取得
    fn get_velocity(&self) -> Velocity2D;
}

/// 衝突判定対象のインターフェース
pub trait ICollision {
    /// 現在位置でのバウンディングボックス
    fn bounding_box(&self) -> BoundingBox;

    /// 他オブジェクトとの重なり判定
    fn collides_with(&self, other: &dyn ICollision) -> bool {
        self.bounding_box().overlaps(&other.bounding_box())
    }
}
