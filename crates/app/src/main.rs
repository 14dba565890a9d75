use std::fs;
use std::path::Path;

use anyhow::Context as _;
use directories::ProjectDirs;
use plotshelf_application::AppContext;
use plotshelf_ui::Ui;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dirs =
        ProjectDirs::from("dev", "plotshelf", "plotshelf").context("resolve project dirs")?;

    let settings = plotshelf_loader::load_settings(project_dirs.config_dir())?;
    let _log_guard = init_logging(project_dirs.data_local_dir(), &settings.log_level)?;

    let cwd = std::env::current_dir().context("get cwd")?;
    let manifest_path = settings.manifest_path(&cwd);
    tracing::info!(manifest = %manifest_path.display(), "starting plotshelf");

    let ctx = AppContext::new(settings);
    let ctx = match plotshelf_loader::load_manifest(&manifest_path) {
        Ok(manifest) => ctx.with_manifest(manifest),
        Err(err) => {
            tracing::error!(%err, "manifest unavailable");
            ctx.with_load_error(err.to_string())
        }
    };

    let mut ui = Ui::new(ctx, cwd);
    ui.run()?;
    tracing::info!("plotshelf exited");
    Ok(())
}

// The terminal belongs to the UI, so logs go to a file.
fn init_logging(log_dir: &Path, default_level: &str) -> anyhow::Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(log_dir, "plotshelf.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install logger: {err}"))?;
    Ok(guard)
}
