use perfetto_format::BenchmarkMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub benchmark: Option<BenchmarkConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Written as a chrome `clock-domain` metadata packet ahead of the events.
    #[serde(default)]
    pub clock_domain: Option<String>,

    /// Fail on the first event that cannot be encoded instead of skipping it.
    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            clock_domain: None,
            strict: false,
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub story_name: String,
    #[serde(default)]
    pub story_tags: Vec<String>,
    #[serde(default)]
    pub story_run_index: i32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub benchmark_start_time_us: Option<i64>,
    #[serde(default)]
    pub story_run_time_us: Option<i64>,
}

impl BenchmarkConfig {
    /// Missing run times fall back to `trace_start_us`.
    pub fn to_metadata(&self, trace_start_us: i64) -> BenchmarkMetadata {
        BenchmarkMetadata::builder()
            .benchmark_start_time_us(self.benchmark_start_time_us.unwrap_or(trace_start_us))
            .story_run_time_us(self.story_run_time_us.unwrap_or(trace_start_us))
            .benchmark_name(self.name.as_str())
            .benchmark_description(self.description.as_str())
            .story_name(self.story_name.as_str())
            .story_tags(self.story_tags.clone())
            .story_run_index(self.story_run_index)
            .label(self.label.as_str())
            .build()
    }
}

fn default_buffer_size() -> usize {
    1 << 20
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
