use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info, warn};
use std::path::Path;

use scena::app::PlayerSession;
use scena::cli::{self, Args};
use scena::config::{self, PathConfig};
use scena::core::assets::{AssetSource, DirSource};
use scena::core::scheduler::{FrameScheduler, IntervalScheduler};
use scena::engine::{Engine, ScriptedEngine};
use scena::entities::{AssetDescriptor, AttrKind, AttrValue};
use scena::settings::PlayerSettings;
use scena::widgets::ae::{EditInput, EditOutcome};

fn init_logging(args: &Args, paths: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, paths));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Respects RUST_LOG if set
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

/// Read a scene from disk and load it.
fn load_path<E: Engine, S: FrameScheduler>(
    session: &mut PlayerSession<E, S>,
    path: &Path,
    source: &dyn AssetSource,
) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read scene {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    session.load(&bytes, &name, source)?;
    Ok(())
}

/// Turn `--set` text into the input the control for `kind` takes.
fn edit_input(kind: &AttrKind, text: &str) -> EditInput {
    match kind {
        AttrKind::Font => {
            let (family, style) = text.split_once(':').unwrap_or((text, "Regular"));
            EditInput::Font {
                family: family.to_string(),
                style: style.to_string(),
            }
        }
        _ => EditInput::Text(text.to_string()),
    }
}

fn apply_sets<E: Engine, S: FrameScheduler>(session: &mut PlayerSession<E, S>, sets: &[String]) -> Result<()> {
    for assignment in sets {
        let Some((key, text)) = cli::parse_assignment(assignment) else {
            bail!("Invalid --set '{}', expected LAYER.ATTR=VALUE", assignment);
        };
        let Some(kind) = session.controls().get(key).map(|c| c.kind.clone()) else {
            warn!("No control {}, --set ignored", key);
            continue;
        };
        if let EditOutcome::Reverted(e) = session.edit(key, edit_input(&kind, text)) {
            warn!("--set {} rejected: {}", key, e);
        }
    }
    Ok(())
}

fn apply_replacements<E: Engine, S: FrameScheduler>(
    session: &mut PlayerSession<E, S>,
    specs: &[String],
) -> Result<()> {
    for spec in specs {
        let Some((asset, path)) = AssetDescriptor::parse_spec(spec) else {
            bail!("Invalid --replace '{}', expected ID:KIND:PATH", spec);
        };
        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read asset {}", path))?;
        let outcome = session.replace_asset(&asset, &bytes);
        debug!("Replace {}: {:?}", asset.asset_id, outcome);
    }
    Ok(())
}

fn display_value(value: Option<&AttrValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_report<E: Engine, S: FrameScheduler>(session: &PlayerSession<E, S>) {
    println!("Scene: {}", session.scene_name().unwrap_or("-"));
    let size = session.surface_size();
    println!("Surface: {}x{}", size.width, size.height);

    if session.controls().is_empty() {
        println!("Controls: none");
    } else {
        println!("Controls ({}):", session.controls().len());
        for control in session.controls().controls() {
            println!(
                "  {:<20} {:<28} {:<11} {}",
                control.label,
                control.key,
                control.widget.name(),
                display_value(control.value.as_ref())
            );
        }
    }

    let tl = session.timeline();
    println!("Timeline: {} [{}..={}] {}", tl.value, tl.min, tl.max, tl.label.as_str());
    if let Some(err) = session.error() {
        println!("Error: {}", err);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }
    init_logging(&args, &path_config)?;

    info!("Scena v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        config::config_file(config::SETTINGS_FILE, &path_config).display()
    );

    let mut settings = PlayerSettings::load(&path_config);
    if args.no_autoplay {
        settings.autoplay = false;
    }
    if let Some(size) = &args.size {
        let Some((w, h)) = cli::parse_size(size) else {
            bail!("Invalid --size '{}', expected WxH", size);
        };
        settings.viewport_width = w;
        settings.viewport_height = h;
    }

    let asset_dir = args
        .asset_dir
        .clone()
        .or_else(|| args.scene.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let source = DirSource::new(asset_dir);
    debug!("Assets resolved from {}", source.root().display());

    let scheduler = IntervalScheduler::new(settings.display_fps);
    let interval = scheduler.interval_ms();
    let mut session = PlayerSession::new(ScriptedEngine::new(), scheduler, settings);

    load_path(&mut session, &args.scene, &source)?;
    apply_replacements(&mut session, &args.replace)?;
    apply_sets(&mut session, &args.set)?;
    if let Some(frame) = args.seek {
        session.seek(frame);
    }

    let mut ticks = 0;
    for i in 0..args.frames {
        if session.on_display_frame(i as f64 * interval) {
            ticks += 1;
        }
        session.pump_events();
    }
    session.pump_events();
    info!("Ran {} display frames, {} ticks", args.frames, ticks);

    print_report(&session);
    Ok(())
}
