use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::{ENV_FILE_NAME, PARLEY_DIR_NAME};

pub fn get_parley_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home_dir.join(PARLEY_DIR_NAME))
}

/// Outcome of loading the `.env` files at startup. Logging is not set up yet
/// at that point, so the caller reports it afterwards.
#[derive(Debug, Default)]
pub struct EnvFiles {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<anyhow::Error>,
}

/// Load `.env` from the working directory, then `~/.parley/.env`.
///
/// dotenvy never overrides a variable that is already set, so the process
/// environment wins over both files and the working-directory file wins over
/// the home file.
pub fn load_env_files() -> EnvFiles {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(ENV_FILE_NAME));
    }
    if let Ok(dir) = get_parley_dir() {
        candidates.push(dir.join(ENV_FILE_NAME));
    }
    load_candidates(candidates)
}

fn load_candidates(candidates: Vec<PathBuf>) -> EnvFiles {
    let mut files = EnvFiles::default();
    for path in candidates {
        match load_env_file(&path) {
            Ok(true) => files.loaded.push(path),
            Ok(false) => {}
            Err(e) => files.failed.push(e),
        }
    }
    files
}

fn load_env_file(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }

    dotenvy::from_path(path)
        .with_context(|| format!("Failed to load env file: {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_load_env_file_sets_missing_vars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PARLEY_TEST_ENV_FILE_VAR=from-file\n").unwrap();
        unsafe { env::remove_var("PARLEY_TEST_ENV_FILE_VAR") };

        assert!(load_env_file(&path).unwrap());
        assert_eq!(env::var("PARLEY_TEST_ENV_FILE_VAR").unwrap(), "from-file");

        unsafe { env::remove_var("PARLEY_TEST_ENV_FILE_VAR") };
    }

    #[test]
    #[serial]
    fn test_load_env_file_keeps_existing_vars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PARLEY_TEST_ENV_KEEP=from-file\n").unwrap();
        unsafe { env::set_var("PARLEY_TEST_ENV_KEEP", "from-process") };

        assert!(load_env_file(&path).unwrap());
        assert_eq!(env::var("PARLEY_TEST_ENV_KEEP").unwrap(), "from-process");

        unsafe { env::remove_var("PARLEY_TEST_ENV_KEEP") };
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let loaded = load_env_file(&dir.path().join(".env")).unwrap();
        assert!(!loaded);
    }

    #[test]
    #[serial]
    fn test_malformed_env_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.env");
        fs::write(&broken, "PARLEY_TEST_ENV_BROKEN=\"unterminated\nX").unwrap();
        let good = dir.path().join("good.env");
        fs::write(&good, "PARLEY_TEST_ENV_GOOD=ok\n").unwrap();
        unsafe { env::remove_var("PARLEY_TEST_ENV_GOOD") };

        let files = load_candidates(vec![
            broken.clone(),
            dir.path().join("missing.env"),
            good.clone(),
        ]);

        assert_eq!(files.loaded, vec![good]);
        assert_eq!(files.failed.len(), 1);
        let message = format!("{:#}", files.failed[0]);
        assert!(message.contains("Failed to load env file"));
        assert!(message.contains("broken.env"));

        unsafe {
            env::remove_var("PARLEY_TEST_ENV_GOOD");
            env::remove_var("PARLEY_TEST_ENV_BROKEN");
        }
    }
}
