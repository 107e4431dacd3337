/// 重力定数（1ティックあたりの鉛直速度減少量、dtでスケールしない）
pub const GRAVITY: f64 = 9.8;

/// 地面の高さ（これ以下で砲弾は着地）
pub const GROUND_LEVEL: f64 = 10.0;

/// 2次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position2D {
    pub x: f64,
    pub y: f64,
}

impl Position2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 各成分を0方向に切り捨て（スポーン位置の整数化）
    pub fn trunc(&self) -> Self {
        Self::new(self.x.trunc(), self.y.trunc())
    }

    /// 原点から角度方向へ `length` だけ伸ばした点
    pub fn offset_polar(&self, length: f64, angle_rad: f64) -> Self {
        Self::new(
            self.x + length * angle_rad.cos(),
            self.y + length * angle_rad.sin(),
        )
    }
}

/// 2次元速度を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity2D {
    pub x: f64,
    pub y: f64,
}

impl Velocity2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 大きさと角度（ラジアン）から速度ベクトルを作成
    pub fn from_polar(magnitude: f64, angle_rad: f64) -> Self {
        Self::new(magnitude * angle_rad.cos(), magnitude * angle_rad.sin())
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// 軸平行バウンディングボックス（中心 + 半幅/半高）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center: Position2D,
    pub half_width: f64,
    pub half_height: f64,
}

impl BoundingBox {
    pub fn new(center: Position2D, half_width: f64, half_height: f64) -> Self {
        Self { center, half_width, half_height }
    }

    /// 両軸で区間が交差する場合に重なりと判定（境界接触を含む）
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (self.center.x - other.center.x).abs() <= self.half_width + other.half_width
            && (self.center.y - other.center.y).abs() <= self.half_height + other.half_height
    }
}

/// スプライト種別（描画側が参照するジオメトリタグ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    CannonWheel,
    CannonArm,
    Projectile,
    Target,
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }

    /// 許容誤差付きの比較
    pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }
}
