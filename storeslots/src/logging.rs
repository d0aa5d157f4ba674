use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use env_logger::{Builder, Env, Target};

const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Install the global logger. `RUST_LOG` overrides the default
/// `storeslots=info` filter. With a `data_dir`, output goes to
/// `storeslots.log` there instead of stderr; a file over 2MB is rotated to
/// `storeslots.old.log` first.
///
/// Calling this more than once is harmless.
pub fn init(data_dir: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("storeslots=info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {:<5} {}: {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(dir) = data_dir {
        match open_log_file(dir) {
            Ok((file, path)) => {
                builder.target(Target::Pipe(Box::new(file)));
                let _ = LOG_PATH.set(path);
            }
            Err(e) => eprintln!("storeslots: cannot open log file in {}: {}", dir.display(), e),
        }
    }

    if builder.try_init().is_ok() {
        log::info!("=== storeslots v{} started ===", env!("CARGO_PKG_VERSION"));
        if let Some(path) = log_path() {
            log::info!("Log file: {}", path.display());
        }
    }
}

fn open_log_file(dir: &Path) -> std::io::Result<(std::fs::File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("storeslots.log");

    if let Ok(meta) = std::fs::metadata(&path) {
        if meta.len() > MAX_LOG_BYTES {
            let _ = std::fs::rename(&path, dir.join("storeslots.old.log"));
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

pub fn log_path() -> Option<&'static Path> {
    LOG_PATH.get().map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_log_is_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storeslots.log");
        std::fs::write(&path, vec![b'x'; (MAX_LOG_BYTES + 1) as usize]).unwrap();

        let (_file, opened) = open_log_file(dir.path()).unwrap();
        assert_eq!(opened, path);
        assert!(dir.path().join("storeslots.old.log").exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
