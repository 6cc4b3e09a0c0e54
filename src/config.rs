use serde::Deserialize;
use std::path::PathBuf;

use crate::error::Result;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_document_root() -> PathBuf {
    PathBuf::from("./www")
}

fn default_blog_dir() -> PathBuf {
    PathBuf::from("./data/blogs")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("./tmpl")
}

fn default_indexer_period_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_document_root")]
    pub document_root: PathBuf,
    #[serde(default = "default_blog_dir")]
    pub blog_dir: PathBuf,
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
    #[serde(default = "default_indexer_period_secs")]
    pub indexer_period_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_address: default_bind_address(),
            port: default_port(),
            worker_count: default_worker_count(),
            document_root: default_document_root(),
            blog_dir: default_blog_dir(),
            template_dir: default_template_dir(),
            indexer_period_secs: default_indexer_period_secs(),
        }
    }
}

impl AppConfig {
    pub fn from_str(s: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(s)?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn display_config(&self) {
        proxy_log::info!("-------------------------------------------");
        proxy_log::info!(" aehttpd starting");
        proxy_log::info!(" listen        : {}:{}", self.bind_address, self.port);
        proxy_log::info!(" workers       : {}", self.worker_count);
        proxy_log::info!(" document root : {}", self.document_root.display());
        proxy_log::info!(" blog dir      : {}", self.blog_dir.display());
        proxy_log::info!(" template dir  : {}", self.template_dir.display());
        proxy_log::info!(" indexer period: {}s", self.indexer_period_secs);
        proxy_log::info!("-------------------------------------------");
    }
}
