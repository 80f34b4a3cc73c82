use std::path::PathBuf;
use std::time::SystemTime;

use color_eyre::Result;
use color_eyre::eyre::Context;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Route `log` (and `tracing` through its `log` feature) to stderr and an
/// optional log file, each with its own level.
pub fn setup_logging(
    console_level: LevelFilter,
    log_file: Option<PathBuf>,
    file_level: LevelFilter,
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().chain(console);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
        let file = fern::Dispatch::new()
            .level(file_level)
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {} {}] {}",
                    humantime::format_rfc3339_millis(SystemTime::now()),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(
                fern::log_file(&path)
                    .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?,
            );
        dispatch = dispatch.chain(file);
    }

    dispatch
        .apply()
        .wrap_err("Failed to install the global logger")?;
    Ok(())
}
