use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub db_path: PathBuf,
}

/// Creates the log and data directories and checks that both are writable.
pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&cfg.logs_dir)?;
    let data_dir = ensure_dir(&cfg.data_dir)?;
    probe_writable(&logs_dir)?;
    probe_writable(&data_dir)?;

    Ok(ResolvedPaths {
        logs_dir,
        db_path: data_dir.join(&cfg.db_filename),
    })
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {path}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o755);
            let _ = fs::set_permissions(&dir, perms);
        }
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}

fn probe_writable(dir: &Path) -> Result<()> {
    let probe = dir.join(".write-test");
    fs::write(&probe, b"ok").with_context(|| format!("{} is not writable", dir.display()))?;
    fs::remove_file(&probe)?;
    Ok(())
}
