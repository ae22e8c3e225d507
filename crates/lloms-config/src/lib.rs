//! YAML configuration with environment overrides for LLoms.
//!
//! The base file is `config.yml` (override the path with `LLOMS_CONFIG`).
//! Each key can be overridden independently through the environment; an
//! override that fails to parse falls back to the file value. A missing or
//! unparseable file is fatal before the session loop starts.

use lloms_mcp::McpServerConfig;
use lloms_types::{ConfigError, ModelOptions};
use serde::Deserialize;
use std::path::Path;

/// Default config file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// System prompt used when the file does not set one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are LLoms, a helpful assistant that answers briefly";

/// Endpoint used when the file does not set one.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Number of trailing history entries sent per turn.
pub const DEFAULT_HISTORY_WINDOW: i64 = 4;

/// Context length requested on every chat call.
const NUM_CTX: u32 = 25920;

/// Raw shape of the YAML file. Everything is optional so env overrides and
/// defaults can fill the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub ollama_url: Option<String>,
    pub chat_model: Option<String>,
    pub tools_model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub enable_mcp: bool,
    pub temperature: Option<f32>,
    pub repeat_last_n: Option<i32>,
    pub repeat_penalty: Option<f32>,
    pub tools_temperature: Option<f32>,
    pub tools_repeat_last_n: Option<i32>,
    pub tools_repeat_penalty: Option<f32>,
    pub history_window: Option<i64>,
    #[serde(default)]
    pub mcp: McpSection,
}

/// The `mcp:` section of the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpSection {
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

/// Resolved configuration for one session.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub chat_model: String,
    pub tools_model: String,
    pub system_prompt: String,
    pub enable_mcp: bool,
    pub temperature: Option<f32>,
    pub repeat_last_n: Option<i32>,
    pub repeat_penalty: Option<f32>,
    pub tools_temperature: Option<f32>,
    pub tools_repeat_last_n: Option<i32>,
    pub tools_repeat_penalty: Option<f32>,
    pub history_window: i64,
    pub mcp_servers: Vec<McpServerConfig>,
}

impl Config {
    /// Load the file at `path`, apply environment overrides, fill defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let file: ConfigFile =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("Loaded config from {}", path.display());
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Apply env overrides (via `get`) and defaults to a parsed file.
    pub fn resolve(
        file: ConfigFile,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let chat_model = env_str(&get, "LLM_CHAT")
            .or(file.chat_model)
            .ok_or_else(|| ConfigError::MissingKey {
                key: "chat_model".to_string(),
            })?;

        let tools_model = env_str(&get, "LLM_WITH_TOOLS_SUPPORT")
            .or(file.tools_model)
            .unwrap_or_else(|| chat_model.clone());

        Ok(Self {
            ollama_url: env_str(&get, "OLLAMA_HOST")
                .or(file.ollama_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            chat_model,
            tools_model,
            system_prompt: env_str(&get, "SYSTEM_PROMPT")
                .or(file.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            enable_mcp: env_parse(&get, "ENABLE_MCP").unwrap_or(file.enable_mcp),
            temperature: env_parse(&get, "TEMPERATURE").or(file.temperature),
            repeat_last_n: env_parse(&get, "REPEAT_LAST_N").or(file.repeat_last_n),
            repeat_penalty: env_parse(&get, "REPEAT_PENALTY").or(file.repeat_penalty),
            tools_temperature: env_parse(&get, "TOOLS_TEMPERATURE").or(file.tools_temperature),
            tools_repeat_last_n: env_parse(&get, "TOOLS_REPEAT_LAST_N")
                .or(file.tools_repeat_last_n),
            tools_repeat_penalty: env_parse(&get, "TOOLS_REPEAT_PENALTY")
                .or(file.tools_repeat_penalty),
            history_window: file.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW),
            mcp_servers: file.mcp.servers,
        })
    }

    /// Sampling options for the free-chat model: adaptive sampling with a
    /// wide target, plus whatever the file/env configured.
    pub fn chat_options(&self) -> ModelOptions {
        ModelOptions {
            temperature: self.temperature,
            repeat_last_n: self.repeat_last_n,
            repeat_penalty: self.repeat_penalty,
            num_ctx: Some(NUM_CTX),
            mirostat: Some(1),
            mirostat_tau: Some(5.0),
            mirostat_eta: Some(0.1),
            ..ModelOptions::default()
        }
    }

    /// Sampling options for the tools-capable model: tighter target and
    /// truncated sampling, so tool-call JSON stays well formed.
    pub fn tools_options(&self) -> ModelOptions {
        ModelOptions {
            temperature: self.tools_temperature,
            repeat_last_n: self.tools_repeat_last_n,
            repeat_penalty: self.tools_repeat_penalty,
            num_ctx: Some(NUM_CTX),
            mirostat: Some(1),
            mirostat_tau: Some(1.0),
            mirostat_eta: Some(0.1),
            top_k: Some(40),
            top_p: Some(0.9),
        }
    }
}

fn env_str(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).filter(|v| !v.is_empty())
}

/// Parse an env override; unparseable values fall back to the file value.
fn env_parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let value = env_str(get, key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {key} override: {value:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
ollama_url: "http://models.local:11434"
chat_model: "qwen2.5:3b"
tools_model: "qwen2.5:7b"
system_prompt: "Be brief"
enable_mcp: true
temperature: 0.8
repeat_last_n: 64
repeat_penalty: 1.1
tools_temperature: 0.0
tools_repeat_last_n: 8
tools_repeat_penalty: 1.0
mcp:
  servers:
    - name: filesystem
      command: npx
      args: ["-y", "@modelcontextprotocol/server-filesystem"]
"#;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn parse(yaml: &str) -> ConfigFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn full_file_parses() {
        let config = Config::resolve(parse(SAMPLE), no_env).unwrap();
        assert_eq!(config.ollama_url, "http://models.local:11434");
        assert_eq!(config.chat_model, "qwen2.5:3b");
        assert_eq!(config.tools_model, "qwen2.5:7b");
        assert_eq!(config.system_prompt, "Be brief");
        assert!(config.enable_mcp);
        assert_eq!(config.temperature, Some(0.8));
        assert_eq!(config.mcp_servers.len(), 1);
        assert_eq!(config.mcp_servers[0].name, "filesystem");
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let get = env_of(&[
            ("OLLAMA_HOST", "http://override:11434"),
            ("LLM_CHAT", "llama3.2"),
            ("TEMPERATURE", "0.2"),
            ("ENABLE_MCP", "false"),
        ]);
        let config = Config::resolve(parse(SAMPLE), get).unwrap();
        assert_eq!(config.ollama_url, "http://override:11434");
        assert_eq!(config.chat_model, "llama3.2");
        assert_eq!(config.temperature, Some(0.2));
        assert!(!config.enable_mcp);
        // Non-overridden keys keep their file values.
        assert_eq!(config.tools_model, "qwen2.5:7b");
    }

    #[test]
    fn unparseable_env_override_falls_back_to_file() {
        let get = env_of(&[("TEMPERATURE", "not-a-number")]);
        let config = Config::resolve(parse(SAMPLE), get).unwrap();
        assert_eq!(config.temperature, Some(0.8));
    }

    #[test]
    fn missing_chat_model_is_fatal() {
        let err = Config::resolve(parse("system_prompt: hi"), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key } if key == "chat_model"));
    }

    #[test]
    fn defaults_fill_omitted_keys() {
        let config = Config::resolve(parse("chat_model: llama3.2"), no_env).unwrap();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.tools_model, "llama3.2");
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert!(!config.enable_mcp);
        assert!(config.mcp_servers.is_empty());
        assert_eq!(config.temperature, None);
    }

    #[test]
    fn chat_and_tools_options_differ() {
        let config = Config::resolve(parse(SAMPLE), no_env).unwrap();
        let chat = config.chat_options();
        let tools = config.tools_options();

        assert_eq!(chat.mirostat_tau, Some(5.0));
        assert_eq!(tools.mirostat_tau, Some(1.0));
        assert_eq!(chat.top_k, None);
        assert_eq!(tools.top_k, Some(40));
        assert_eq!(tools.top_p, Some(0.9));
        assert_eq!(chat.temperature, Some(0.8));
        assert_eq!(tools.temperature, Some(0.0));
        assert_eq!(chat.num_ctx, tools.num_ctx);
    }

    #[test]
    fn load_missing_file_is_fatal() {
        let err = Config::load(Path::new("/nonexistent/lloms-config.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_unparseable_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chat_model: [unclosed").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.chat_model, "qwen2.5:3b");
    }
}
