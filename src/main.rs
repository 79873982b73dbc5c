use anyhow::Context;
use clap::Parser;
use seglabel::cli::{Cli, Commands};
use seglabel::config::{self, Config, LaunchSettings, Timing};
use seglabel::prompt::ConsoleInput;
use seglabel::scratch;
use seglabel::session::LabelingSession;
use seglabel::store::ResultsStore;
use seglabel::viewer::{Freeview, WindowManager};
use seglabel_common::{MethodPair, PathMapping, Worklist};
use std::path::PathBuf;

struct LabelArgs {
    method1: String,
    method2: String,
    output: PathBuf,
    user: Option<String>,
    input: PathBuf,
    diff_maps_dir: PathBuf,
    viewer_home: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
    path_map: Vec<PathMapping>,
    no_window_automation: bool,
    warmup_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to initialize logger")?;

    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Label {
            method1,
            method2,
            output,
            user,
            input,
            diff_maps_dir,
            viewer_home,
            scratch_dir,
            path_map,
            no_window_automation,
            warmup_secs,
        } => {
            let args = LabelArgs {
                method1,
                method2,
                output,
                user,
                input,
                diff_maps_dir,
                viewer_home,
                scratch_dir,
                path_map,
                no_window_automation,
                warmup_secs,
            };
            run_label(config, args).await?;
        }

        Commands::Status { output } => {
            let store = ResultsStore::new(&output);
            if !store.exists() {
                println!("結果ファイルが存在しません: {}", output.display());
                return Ok(());
            }

            let summary = store.summarize()?;
            println!("集計: {}", output.display());
            println!("  レコード数: {}", summary.total);
            if summary.malformed > 0 {
                println!("  [WARNING] 読み取れない行: {}", summary.malformed);
            }
            println!("  ラベラー:");
            for (labeler, count) in &summary.by_labeler {
                println!("    {}: {}", labeler, count);
            }
            println!("  選ばれた回数:");
            for (method, count) in &summary.wins {
                println!("    {}: {}", method, count);
            }
            println!("  確信度:");
            for (confidence, count) in &summary.confidence {
                println!("    {}: {}", confidence, count);
            }
            println!("  失敗あり: {}", summary.failures);
            println!("  平均回答時間: {:.1}s", summary.mean_elapsed_secs);
        }

        Commands::Scratch { dir, clean } => {
            let dir = dir.unwrap_or_else(|| config.scratch_dir.clone());
            if !dir.exists() {
                println!("スクラッチディレクトリが存在しません: {}", dir.display());
                return Ok(());
            }

            let files = scratch::scan_scratch(&dir)?;
            let bytes: u64 = files.iter().map(|f| f.bytes).sum();
            println!("スクラッチ: {}", dir.display());
            println!("  ファイル数: {}", files.len());
            println!("  サイズ: {} bytes", bytes);

            if clean {
                let (removed, freed) = scratch::clean_scratch(&dir)?;
                println!("✔ {}件 ({} bytes) を削除しました", removed, freed);
            }
        }

        Commands::Config { show, set_viewer_home, add_path_map, clear_path_map } => {
            let mut config = config;
            let mut changed = false;

            if let Some(home) = set_viewer_home {
                config.viewer_home = Some(home);
                changed = true;
            }
            if clear_path_map {
                config.path_map = Default::default();
                changed = true;
            }
            for mapping in add_path_map {
                config.add_path_mapping(mapping);
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!(
                    "  FreeSurfer: {}",
                    config
                        .viewer_home
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".to_string())
                );
                println!("  スクラッチ: {}", config.scratch_dir.display());
                println!(
                    "  ウィンドウ操作: {}",
                    if config.window_automation { "有効" } else { "無効" }
                );
                println!("  パス置換:");
                for mapping in config.path_map.entries() {
                    println!("    {} -> {}", mapping.from, mapping.to);
                }
                println!("  起動待ち: {}s", config.timing.warmup_secs);
            }
        }
    }

    Ok(())
}

async fn run_label(config: Config, args: LabelArgs) -> anyhow::Result<()> {
    let methods = MethodPair::new(args.method1, args.method2)?;

    let env_user = std::env::var("USER")
        .ok()
        .or_else(|| std::env::var("USERNAME").ok());
    let labeler = config::resolve_labeler(args.user.as_deref(), env_user.as_deref())?;

    let env_home = std::env::var("FREESURFER_HOME").ok();
    let viewer_home =
        config::resolve_viewer_home(args.viewer_home.as_deref(), &config, env_home.as_deref())?;

    let mut path_map = config.path_map.clone();
    for mapping in args.path_map {
        path_map.push(mapping);
    }

    let mut timing_config = config.timing.clone();
    if let Some(secs) = args.warmup_secs {
        timing_config.warmup_secs = secs;
    }

    let settings = LaunchSettings {
        viewer_home,
        scratch_dir: args.scratch_dir.unwrap_or_else(|| config.scratch_dir.clone()),
        diff_maps_dir: Some(args.diff_maps_dir),
        path_map,
        window_automation: config.window_automation && !args.no_window_automation,
        timing: Timing::from(&timing_config),
    };

    let executable = settings.viewer_executable();
    if !executable.exists() {
        anyhow::bail!("freeview not found: {}", executable.display());
    }

    println!("[INFO] Labeler: {}", labeler);
    let store = ResultsStore::new(&args.output);
    let labeled = store
        .labeled_subjects()
        .with_context(|| format!("failed to read {}", args.output.display()))?;

    let mut worklist = Worklist::from_csv(&args.input, &methods)
        .with_context(|| format!("failed to load worklist {}", args.input.display()))?;
    if worklist.duplicates() > 0 {
        println!("[WARNING] {} duplicate subjects ignored", worklist.duplicates());
    }
    worklist.exclude_labeled(&labeled);
    println!(
        "[INFO] {} subjects in worklist, {} already labeled, {} remaining",
        worklist.total(),
        worklist.already_labeled(),
        worklist.len()
    );
    if worklist.is_empty() {
        println!("✔ Nothing left to label");
        return Ok(());
    }

    let windows = if settings.window_automation {
        let detected = WindowManager::detect(settings.timing.automation_timeout).await;
        if detected.is_none() {
            println!("[WARNING] xdotool not found, viewer windows will not be hidden");
        }
        detected
    } else {
        None
    };

    let timing = settings.timing;
    let already_labeled = worklist.already_labeled();
    let total = worklist.total();
    let viewer = Freeview::new(settings, windows);
    let mut session = LabelingSession::new(
        viewer,
        ConsoleInput::spawn(),
        store,
        methods,
        labeler,
        timing,
    )
    .with_progress(already_labeled, total);

    let summary = session.run(worklist.into_rows()).await?;

    if summary.skipped > 0 {
        println!("[WARNING] {} subjects skipped (viewer launch failed)", summary.skipped);
    }
    if summary.stopped {
        println!("[INFO] Labeling stopped. {} subjects labeled this run", summary.labeled);
    } else {
        println!("\n✅ Labeling complete. {} subjects labeled this run", summary.labeled);
    }
    Ok(())
}
