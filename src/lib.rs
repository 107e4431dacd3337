//! 回転する大砲と静止ターゲットの弾道・衝突シミュレーション
//!
//! - [`simulation::SimulationEngine`]: ティック・コマンド・クエリの契約を提供する中核
//! - [`ballistics::BallisticsSolver`]: 「このターゲットに当てられるか」の閉形式ソルバー
//! - [`shared::SharedSimulation`]: 外部コラボレータ向けの同期ハンドル
//! - [`realtime::RealtimeDriver`]: tokio による実時間ドライバ

pub mod ballistics;
pub mod collision;
pub mod logging;
pub mod models;
pub mod realtime;
pub mod scenario;
pub mod shared;
pub mod simulation;
