// 基本的なデータ型と数学ユーティリティ
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// 各モデルの実装
pub mod cannon;
pub mod projectile;
pub mod target;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use cannon::{Cannon, LaunchRecord, LaunchStats};
pub use projectile::{Projectile, ProjectileParams, ProjectileState};
pub use target::{Target, TargetPlacement, TargetRegistry};
