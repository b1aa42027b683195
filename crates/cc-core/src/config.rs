//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. cc-agenda.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::Error;

/// Default config file name looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "cc-agenda.toml";

/// A configured calendar feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarSource {
    /// Identifier shown in results and errors (e.g. "work")
    pub name: String,
    /// Feed URL (http, https or webcal)
    pub url: String,
}

impl CalendarSource {
    /// Create a new calendar source
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Calendar aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Feeds to aggregate
    #[serde(default)]
    pub sources: Vec<CalendarSource>,

    /// Seconds between background refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-source fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Hard cap on generated recurrence candidates per definition and query
    #[serde(default = "default_max_recurrence_candidates")]
    pub max_recurrence_candidates: usize,

    /// Keyword search lookahead when no end date is given
    #[serde(default = "default_search_lookahead_days")]
    pub search_lookahead_days: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_recurrence_candidates: default_max_recurrence_candidates(),
            search_lookahead_days: default_search_lookahead_days(),
        }
    }
}

impl CalendarConfig {
    /// Interval between background refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Timeout applied to each source fetch
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_recurrence_candidates() -> usize {
    100_000
}

fn default_search_lookahead_days() -> i64 {
    90
}

/// Upper bound for `search_lookahead_days` (100 years)
pub const MAX_SEARCH_LOOKAHEAD_DAYS: i64 = 36_500;

/// Main configuration for cc-agenda
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Calendar aggregation configuration
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// # 環境変数展開
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)?;

        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 既存の環境変数で上書き（環境変数が優先）
        cfg.apply_env_overrides()?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// TOML 文字列から設定を構築する（環境変数の上書きは行わない）
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml_config: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml_config))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// 1. `./cc-agenda.toml`
    /// 2. 見つからない場合は環境変数のみ
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let calendar = toml.calendar.unwrap_or_default();

        Config {
            calendar: CalendarConfig {
                sources: calendar
                    .sources
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| CalendarSource::new(s.name.trim(), s.url.trim()))
                    .collect(),
                refresh_interval_secs: calendar
                    .refresh_interval_secs
                    .unwrap_or_else(default_refresh_interval_secs),
                fetch_timeout_secs: calendar
                    .fetch_timeout_secs
                    .unwrap_or_else(default_fetch_timeout_secs),
                max_recurrence_candidates: calendar
                    .max_recurrence_candidates
                    .unwrap_or_else(default_max_recurrence_candidates),
                search_lookahead_days: calendar
                    .search_lookahead_days
                    .unwrap_or_else(default_search_lookahead_days),
            },
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(sources) = std::env::var("CALENDAR_SOURCES") {
            if !sources.trim().is_empty() {
                self.calendar.sources = parse_sources_list(&sources)?;
            }
        }

        if let Some(secs) = env_number("CALENDAR_REFRESH_INTERVAL_SECS")? {
            self.calendar.refresh_interval_secs = secs;
        }
        if let Some(secs) = env_number("CALENDAR_FETCH_TIMEOUT_SECS")? {
            self.calendar.fetch_timeout_secs = secs;
        }
        if let Some(cap) = env_number("CALENDAR_MAX_RECURRENCE_CANDIDATES")? {
            self.calendar.max_recurrence_candidates = cap;
        }
        if let Some(days) = env_number("CALENDAR_SEARCH_LOOKAHEAD_DAYS")? {
            self.calendar.search_lookahead_days = days;
        }

        Ok(())
    }

    /// 設定値を検証する
    pub fn validate(&self) -> crate::Result<()> {
        let calendar = &self.calendar;
        let mut seen = HashSet::new();

        for source in &calendar.sources {
            if source.name.is_empty() {
                return Err(Error::Config("Calendar source name must not be empty".to_string()));
            }
            if source.url.is_empty() {
                return Err(Error::Config(format!(
                    "Calendar source '{}' has an empty url",
                    source.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate calendar source name: {}",
                    source.name
                )));
            }
        }

        if calendar.refresh_interval_secs == 0 {
            return Err(Error::Config("refresh_interval_secs must be positive".to_string()));
        }
        if calendar.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be positive".to_string()));
        }
        if calendar.max_recurrence_candidates == 0 {
            return Err(Error::Config(
                "max_recurrence_candidates must be positive".to_string(),
            ));
        }
        if calendar.search_lookahead_days <= 0 {
            return Err(Error::Config("search_lookahead_days must be positive".to_string()));
        }
        if calendar.search_lookahead_days > MAX_SEARCH_LOOKAHEAD_DAYS {
            return Err(Error::Config(format!(
                "search_lookahead_days must be at most {}",
                MAX_SEARCH_LOOKAHEAD_DAYS
            )));
        }

        Ok(())
    }
}

/// `name=url,name=url` 形式のソース一覧をパース
fn parse_sources_list(value: &str) -> crate::Result<Vec<CalendarSource>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                Error::Config(format!("Invalid CALENDAR_SOURCES entry (expected name=url): {}", entry))
            })?;
            Ok(CalendarSource::new(name.trim(), url.trim()))
        })
        .collect()
}

/// 数値の環境変数を読み込む（未設定・空の場合は None）
fn env_number<T: std::str::FromStr>(key: &str) -> crate::Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value))),
        _ => Ok(None),
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize)]
struct TomlConfig {
    /// カレンダー設定
    calendar: Option<TomlCalendarConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCalendarConfig {
    /// 取得するフィード
    #[serde(default)]
    sources: Option<Vec<TomlSourceConfig>>,
    /// 更新間隔（秒）
    #[serde(default)]
    refresh_interval_secs: Option<u64>,
    /// 取得タイムアウト（秒）
    #[serde(default)]
    fetch_timeout_secs: Option<u64>,
    /// 繰り返し展開の上限
    #[serde(default)]
    max_recurrence_candidates: Option<usize>,
    /// キーワード検索の先読み日数
    #[serde(default)]
    search_lookahead_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TomlSourceConfig {
    name: String,
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_config_default() {
        let config = CalendarConfig::default();
        assert!(config.sources.is_empty());
        assert_eq!(config.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_recurrence_candidates, 100_000);
        assert_eq!(config.search_lookahead_days, 90);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("CC_AGENDA_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${CC_AGENDA_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        // 存在しない環境変数
        let result = Config::expand_env_vars("prefix_${NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("CC_AGENDA_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        let result = Config::expand_env_vars("no_vars_here $HOME");
        assert_eq!(result, "no_vars_here $HOME");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[calendar]
refresh_interval_secs = 600
fetch_timeout_secs = 5

[[calendar.sources]]
name = "work"
url = "https://calendar.example.com/work.ics"

[[calendar.sources]]
name = " home "
url = "webcal://calendar.example.com/home.ics"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.calendar.sources.len(), 2);
        assert_eq!(config.calendar.sources[0].name, "work");
        assert_eq!(config.calendar.sources[1].name, "home");
        assert_eq!(config.calendar.refresh_interval_secs, 600);
        assert_eq!(config.calendar.fetch_timeout_secs, 5);
        // 未指定の値はデフォルト
        assert_eq!(config.calendar.max_recurrence_candidates, 100_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.calendar.sources.is_empty());
        assert_eq!(config.calendar.refresh_interval_secs, 3600);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cc-agenda.toml");
        std::fs::write(
            &path,
            "[[calendar.sources]]\nname = \"team\"\nurl = \"https://example.com/team.ics\"\n",
        )
        .unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.calendar.sources.len(), 1);
        assert_eq!(config.calendar.sources[0].url, "https://example.com/team.ics");
    }

    #[test]
    fn test_missing_toml_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config = Config::default();
        config.calendar.sources = vec![
            CalendarSource::new("work", "https://a.example.com/a.ics"),
            CalendarSource::new("work", "https://b.example.com/b.ics"),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = Config::default();
        config.calendar.sources = vec![CalendarSource::new("work", "")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.calendar.refresh_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_search_lookahead() {
        let mut config = Config::default();
        config.calendar.search_lookahead_days = MAX_SEARCH_LOOKAHEAD_DAYS;
        assert!(config.validate().is_ok());

        config.calendar.search_lookahead_days = i64::MAX;
        assert!(config.validate().is_err());
        config.calendar.search_lookahead_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_sources_list() {
        let sources =
            parse_sources_list("work=https://a.example.com/a.ics, home = https://b.example.com/b.ics,")
                .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1], CalendarSource::new("home", "https://b.example.com/b.ics"));

        assert!(parse_sources_list("missing-separator").is_err());
    }
}
