//! Layered settings: optional TOML file, then `LANDINGS_*` environment
//! variables, then command-line flags (applied by the caller).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  /// Directory scanned by `import` for `landing_report_*` documents.
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,

  /// How many files `import` processes between progress lines.
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,
}

fn default_store_path() -> PathBuf { PathBuf::from("landings.db") }

fn default_data_dir() -> PathBuf { PathBuf::from("data/landing_reports") }

fn default_batch_size() -> usize { 50 }

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("LANDINGS"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;

    settings.store_path = expand_tilde(&settings.store_path);
    settings.data_dir = expand_tilde(&settings.data_dir);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(settings.batch_size, 50);
    assert_eq!(settings.data_dir, PathBuf::from("data/landing_reports"));
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("landings.toml");
    std::fs::write(
      &path,
      "store_path = \"/var/lib/landings/store.db\"\nbatch_size = 10\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.store_path, PathBuf::from("/var/lib/landings/store.db"));
    assert_eq!(settings.batch_size, 10);
    assert_eq!(settings.data_dir, PathBuf::from("data/landing_reports"));
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/reports")),
      PathBuf::from(home).join("reports")
    );
    assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
  }
}
