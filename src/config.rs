use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use dialoguer::{theme::ColorfulTheme, Select, Confirm, Input};
use colored::*;
use crate::colors;
use crate::eraser::DEFAULT_MAX_DEPTH;

const CONFIG_FILE: &str = ".sharesweep.json";
const DEFAULT_TOKEN_ENV: &str = "SHAREPOINT_TOKEN";
const DEFAULT_LOG_SHEET: &str = "SharePoint_Logs.csv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: Backend,

    /// CSV sheet that listings and actions are appended to
    pub log_sheet: PathBuf,

    /// Source folder name -> destination folder name, used when copying folders
    #[serde(default)]
    pub folder_mapping: BTreeMap<String, String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Where this config was loaded from; not persisted
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    #[serde(rename = "sharepoint")]
    SharePoint(SharePointSettings),
    Local(LocalSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointSettings {
    /// e.g. https://contoso.sharepoint.com/sites/team
    pub site_url: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    pub root: PathBuf,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Get the path to the default config file
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not find home directory")?;
        Ok(home.join(CONFIG_FILE))
    }

    fn backup_path(config_path: &Path) -> PathBuf {
        config_path.with_extension("json.backup")
    }

    /// Config for a local folder tree, logging next to the working directory
    pub fn local(root: PathBuf) -> Self {
        Config {
            backend: Backend::Local(LocalSettings { root }),
            log_sheet: PathBuf::from(DEFAULT_LOG_SHEET),
            folder_mapping: BTreeMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            source: None,
        }
    }

    /// Load the default config, running the first-time wizard if there is none
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        println!("{}", "=".repeat(60).color(colors::HEADER));
        println!("{}", "   🧹 SHARESWEEP - FIRST TIME SETUP   ".bold());
        println!("{}", "=".repeat(60).color(colors::HEADER));
        println!();

        let mut config = Self::run_first_time_wizard()?;
        config.save_to(&config_path)?;
        config.source = Some(config_path);

        println!();
        println!("{} Setup complete! Your settings are saved.", "✅".green());
        println!("{} Try: {}", "💡".cyan(), "sharesweep browse".bold());
        println!();

        Ok(config)
    }

    /// Load config from a specific file, falling back to its backup if corrupted
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let mut config: Config = match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} Config corrupted, trying backup...", "⚠️".yellow());
                let backup = Self::load_backup(config_path)
                    .map_err(|_| anyhow::Error::from(e).context("Failed to parse config file"))?;
                eprintln!("{} Restored from backup", "✅".green());
                backup
            }
        };
        config.source = Some(config_path.to_path_buf());
        Ok(config)
    }

    fn load_backup(config_path: &Path) -> Result<Self> {
        let backup_path = Self::backup_path(config_path);
        if backup_path.exists() {
            let data = fs::read_to_string(&backup_path)
                .context("Failed to read backup file")?;
            serde_json::from_str(&data).context("Failed to parse backup file")
        } else {
            Err(anyhow::anyhow!("No backup file found"))
        }
    }

    /// Save config to disk with backup
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let backup_path = Self::backup_path(config_path);

        if config_path.exists() {
            fs::copy(config_path, &backup_path)
                .context("Failed to create backup")?;
        }

        // Write to temp file first, then rename over the old one
        let temp_path = config_path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&temp_path, &data)
            .context("Failed to write temp config")?;
        fs::rename(&temp_path, config_path)
            .context("Failed to finalize config")?;

        Ok(())
    }

    fn run_first_time_wizard() -> Result<Self> {
        let theme = ColorfulTheme::default();

        // 1. Backend
        println!("{}", "1. DOCUMENT STORE".bold());
        let backend_items = &["SharePoint document library", "Local folder tree"];
        let backend_idx = Select::with_theme(&theme)
            .items(backend_items)
            .default(0)
            .interact()?;

        let backend = match backend_idx {
            0 => {
                let site_url: String = Input::with_theme(&theme)
                    .with_prompt("Site URL (https://<tenant>.sharepoint.com/sites/<site>)")
                    .interact_text()?;
                let token_env: String = Input::with_theme(&theme)
                    .with_prompt("Environment variable holding the access token")
                    .default(DEFAULT_TOKEN_ENV.to_string())
                    .interact_text()?;
                Backend::SharePoint(SharePointSettings {
                    site_url,
                    token_env,
                    max_retries: default_max_retries(),
                    timeout_secs: default_timeout_secs(),
                })
            }
            _ => {
                let root: String = Input::with_theme(&theme)
                    .with_prompt("Root folder")
                    .interact_text()?;
                Backend::Local(LocalSettings { root: PathBuf::from(root) })
            }
        };

        println!();

        // 2. Log sheet
        println!("{}", "2. LOG SHEET".bold());
        let log_sheet: String = Input::with_theme(&theme)
            .with_prompt("Log sheet file")
            .default(DEFAULT_LOG_SHEET.to_string())
            .interact_text()?;

        println!();

        // 3. Folder mapping
        println!("{}", "3. FOLDER MAPPING".bold());
        println!("Folders with these names are renamed when copied.");
        let mut folder_mapping = BTreeMap::new();
        loop {
            let add = Confirm::with_theme(&theme)
                .with_prompt("Add a folder mapping?")
                .default(false)
                .interact()?;

            if !add {
                break;
            }

            let from: String = Input::with_theme(&theme)
                .with_prompt("Source folder name")
                .interact_text()?;
            let to: String = Input::with_theme(&theme)
                .with_prompt("Destination folder name")
                .interact_text()?;
            folder_mapping.insert(from, to);
        }

        Ok(Config {
            backend,
            log_sheet: PathBuf::from(log_sheet),
            folder_mapping,
            max_depth: DEFAULT_MAX_DEPTH,
            source: None,
        })
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("{}", "🔧 CURRENT CONFIGURATION".bold().color(colors::HEADER));
        println!();

        if let Some(source) = &self.source {
            println!("{} Loaded from: {}", "•".cyan(), source.display());
        }

        match &self.backend {
            Backend::SharePoint(settings) => {
                println!("{} Store: SharePoint {}", "•".cyan(), settings.site_url.color(colors::PATH));
                println!("{} Token variable: {}", "•".cyan(), settings.token_env);
                println!("{} Retries: {} (timeout {}s)", "•".cyan(), settings.max_retries, settings.timeout_secs);
            }
            Backend::Local(settings) => {
                println!("{} Store: local folder {}", "•".cyan(),
                    settings.root.display().to_string().color(colors::PATH));
            }
        }

        println!("{} Log sheet: {}", "•".cyan(), self.log_sheet.display());
        println!("{} Max erase depth: {}", "•".cyan(), self.max_depth);

        println!();
        println!("{} Folder mapping ({}):", "•".cyan(), self.folder_mapping.len());
        for (from, to) in &self.folder_mapping {
            println!("  - {} → {}", from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip_keeps_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::local(dir.path().to_path_buf());
        config.folder_mapping.insert("Source_A".into(), "Dest_A".into());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.folder_mapping.get("Source_A").map(String::as_str), Some("Dest_A"));
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert!(matches!(loaded.backend, Backend::Local(_)));
    }

    #[test]
    fn sharepoint_defaults_fill_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "backend": { "kind": "sharepoint", "site_url": "https://contoso.sharepoint.com/sites/hr" },
                "log_sheet": "logs.csv"
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        match config.backend {
            Backend::SharePoint(settings) => {
                assert_eq!(settings.token_env, "SHAREPOINT_TOKEN");
                assert_eq!(settings.max_retries, 3);
                assert_eq!(settings.timeout_secs, 30);
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.folder_mapping.is_empty());
    }

    #[test]
    fn corrupted_config_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::local(dir.path().to_path_buf());
        config.save_to(&path).unwrap();
        config.max_depth = 7;
        config.save_to(&path).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let restored = Config::load_from(&path).unwrap();
        assert_eq!(restored.max_depth, DEFAULT_MAX_DEPTH);
    }
}
