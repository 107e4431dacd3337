use cannonsim::logging::{self, LogConfig, LogOutput};
use cannonsim::realtime::{RealtimeConfig, RealtimeDriver};
use cannonsim::scenario::ScenarioConfig;
use cannonsim::shared::SharedSimulation;
use cannonsim::simulation::{SimulationEngine, SimulationSummary};
use clap::{Arg, ArgAction, Command};
use std::str::FromStr;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("cannonsim")
        .version("0.1.0")
        .about("大砲シミュレーション (Cannon Simulator)")
        .long_about("回転する大砲から重力下で砲弾を発射し、静止ターゲットへの命中を判定します。\n\
                     シナリオファイルで大砲・ターゲット・予定コマンドを設定できます。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みの標準シナリオで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("realtime")
                .short('r')
                .long("realtime")
                .action(ArgAction::SetTrue)
                .help("実時間ドライバで実行（既定は固定刻みのヘッドレス実行）")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("X")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true)
                .help("セットアップ後にターゲットx座標の弾道解を表示して終了（複数指定可）")
                .conflicts_with_all(["info", "realtime"])
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let output = match matches.get_one::<String>("log-output").map(|s| LogOutput::from_str(s)) {
        Some(Ok(output)) => output,
        Some(Err(e)) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        None => LogOutput::Console,
    };
    let base_level = matches
        .get_one::<String>("log-level")
        .map(|s| logging::parse_log_level(s))
        .unwrap_or(tracing::Level::INFO);

    let log_config = LogConfig {
        level: logging::level_for_verbosity(verbose_level, base_level),
        output,
        ..LogConfig::default()
    };
    let _log_guard = match logging::init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    let options = RunOptions {
        info_only: matches.get_flag("info"),
        realtime: matches.get_flag("realtime"),
        queries: matches
            .get_many::<f64>("query")
            .map(|values| values.copied().collect())
            .unwrap_or_default(),
        verbose_level,
    };

    if let Err(e) = run(matches.get_one::<String>("scenario").map(String::as_str), options) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

struct RunOptions {
    info_only: bool,
    realtime: bool,
    queries: Vec<f64>,
    verbose_level: u8,
}

fn run(scenario_path: Option<&str>, options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    // シナリオの読み込み
    let scenario = match scenario_path {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            if options.verbose_level > 0 {
                println!("シナリオファイル読み込み完了: {}", path);
            }
            scenario
        }
        None => ScenarioConfig::default(),
    };

    // 情報表示のみの場合
    if options.info_only {
        scenario.print_summary();
        return Ok(());
    }

    let mut engine = SimulationEngine::new(scenario.clone(), options.verbose_level);
    engine.initialize()?;

    println!("ターゲット位置: {:?}", engine.target_positions());

    if !options.queries.is_empty() {
        for x in &options.queries {
            let angle = engine.solve(*x);
            if angle < 0.0 {
                println!("x = {:.1}: 到達不能 ({})", x, angle);
            } else {
                println!("x = {:.1}: {:.6} rad ({:.2}度)", x, angle, angle.to_degrees());
            }
        }
        return Ok(());
    }

    let summary = if options.realtime {
        let shared = SharedSimulation::new(engine);
        let driver = RealtimeDriver::new(
            shared,
            RealtimeConfig::new(scenario.sim.dt_s, scenario.sim.t_max_s)?,
        );
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .build()?;
        runtime.block_on(driver.run())?
    } else {
        engine.run()?
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SimulationSummary) {
    println!();
    println!("=== 実行結果 ===");
    println!("経過時間: {:.2}秒 ({}ティック)", summary.elapsed, summary.ticks);
    println!("発射数: {}", summary.shots_fired);
    println!("スコア: {}", summary.score);
    println!("残りターゲット: {}", summary.remaining_targets);
    println!("砲弾: 命中 {} / 着地 {}", summary.hits, summary.grounded);
}
