use anyhow::{Context, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# Harmony configuration

[runtime]
# Working root for every tool; paths outside it are refused
workspace = "."
max_iterations = 25

[llm]
# Any OpenAI-compatible chat completions endpoint
api_url = "http://localhost:8080/v1/chat/completions"
model = ""
# Leave empty to read HARMONY_API_KEY or OPENAI_API_KEY
api_key = ""
max_tokens = 4096
temperature = 0.7

[exec]
timeout_secs = 30
python_bin = "python3"
dry_run = false

[output]
model_max_chars = 25000
model_max_lines = 120
model_strict_lines = 40
model_search_lines = 80
model_max_line_length = 400
display_max_lines = 25
display_stream_lines = 25
display_max_line_length = 1000
cache_preview_lines = 10

[patch]
add_overwrites_existing = false
max_diff_lines = 300
max_sections = 12
"#;

/// Initialize a new config file
pub fn run_init(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {:?}", path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG).context(format!("Failed to write config: {:?}", path))?;
    println!("Created config at {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_default_config_parses_to_defaults() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.exec.timeout_secs, 30);
        assert_eq!(config.output.cache_preview_lines, 10);
        assert_eq!(config.patch.max_sections, 12);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/harmony.toml");
        run_init(&path).unwrap();
        assert!(path.exists());
        assert!(run_init(&path).is_err());
    }
}
