use anyhow::{Context, Result};
use harmony_adapters::{LineBudgets, OutputLimits, PatchOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "harmony.toml";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub llm: LlmConfig,
    pub exec: ExecConfig,
    pub output: OutputConfig,
    pub patch: PatchConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Working root; `~` is expanded
    pub workspace: String,
    pub max_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workspace: ".".to_string(),
            max_iterations: 25,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    /// Empty lets the server pick
    pub model: String,
    /// Empty falls back to HARMONY_API_KEY, then OPENAI_API_KEY
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: harmony_runtime::llm::openai::DEFAULT_API_URL.to_string(),
            model: String::new(),
            api_key: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        ["HARMONY_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecConfig {
    pub timeout_secs: u64,
    pub python_bin: String,
    pub dry_run: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            python_bin: "python3".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub model_max_chars: usize,
    pub model_max_lines: usize,
    pub model_strict_lines: usize,
    pub model_search_lines: usize,
    pub model_max_line_length: usize,
    pub display_max_lines: usize,
    pub display_stream_lines: usize,
    pub display_max_line_length: usize,
    pub cache_preview_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let limits = OutputLimits::default();
        Self {
            model_max_chars: limits.model_max_chars,
            model_max_lines: limits.model_lines.default,
            model_strict_lines: limits.model_lines.strict,
            model_search_lines: limits.model_lines.search,
            model_max_line_length: limits.model_max_line_length,
            display_max_lines: limits.display_max_lines,
            display_stream_lines: limits.display_stream_lines,
            display_max_line_length: limits.display_max_line_length,
            cache_preview_lines: harmony_adapters::output_cache::DEFAULT_PREVIEW_LINES,
        }
    }
}

impl OutputConfig {
    pub fn limits(&self) -> OutputLimits {
        OutputLimits {
            model_max_chars: self.model_max_chars,
            model_lines: LineBudgets {
                default: self.model_max_lines,
                strict: self.model_strict_lines,
                search: self.model_search_lines,
            },
            model_max_line_length: self.model_max_line_length,
            display_max_lines: self.display_max_lines,
            display_stream_lines: self.display_stream_lines,
            display_max_line_length: self.display_max_line_length,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PatchConfig {
    pub add_overwrites_existing: bool,
    pub max_diff_lines: usize,
    pub max_sections: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        let options = PatchOptions::default();
        Self {
            add_overwrites_existing: options.add_overwrites_existing,
            max_diff_lines: options.max_diff_lines,
            max_sections: options.max_sections,
        }
    }
}

impl Config {
    /// Patch options, sharing the output section's character and line caps.
    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions {
            add_overwrites_existing: self.patch.add_overwrites_existing,
            max_diff_lines: self.patch.max_diff_lines,
            max_sections: self.patch.max_sections,
            model_max_chars: self.output.model_max_chars,
            display_max_lines: self.output.display_max_lines,
        }
    }

    /// Working root with `--workspace` taking precedence and `~` expanded.
    pub fn workspace(&self, cli_override: Option<&Path>) -> PathBuf {
        match cli_override {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(shellexpand::tilde(&self.runtime.workspace).into_owned()),
        }
    }
}

/// Load config from `path`, else `./harmony.toml` if present, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content =
        fs::read_to_string(&path).context(format!("Failed to read config file: {:?}", path))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).context("Failed to parse TOML config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config("[exec]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(config.exec.timeout_secs, 5);
        assert_eq!(config.exec.python_bin, "python3");
        assert_eq!(config.output.model_max_chars, 25_000);
        assert_eq!(config.runtime.max_iterations, 25);
        assert!(!config.patch.add_overwrites_existing);
    }

    #[test]
    fn test_output_section_maps_to_limits() {
        let config = parse_config("[output]\nmodel_strict_lines = 10\ndisplay_max_lines = 5\n").unwrap();
        let limits = config.output.limits();
        assert_eq!(limits.model_lines.strict, 10);
        assert_eq!(limits.model_lines.default, 120);
        assert_eq!(config.patch_options().display_max_lines, 5);
    }

    #[test]
    fn test_malformed_toml_is_rejected_with_context() {
        let err = parse_config("[exec\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_cli_workspace_wins() {
        let config = Config::default();
        assert_eq!(
            config.workspace(Some(Path::new("/srv/project"))),
            PathBuf::from("/srv/project")
        );
        assert_eq!(config.workspace(None), PathBuf::from("."));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
