use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FILE: &str = "index.html";
pub const FILE_NOT_FOUND: &str = "404.html";
pub const METHOD_NOT_SUPPORTED: &str = "not_supported.html";

/// Server settings. Built once before the listener starts and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    pub port: u16,
    pub web_root: PathBuf,
    pub default_file: String,
    pub verbose: bool,
    /// Applied to every accepted socket. `None` lets a stalled client block its handler.
    pub read_timeout: Option<Duration>,
    pub max_body_bytes: usize,
    /// Files with this extension are run instead of served.
    pub delegate_extension: String,
    /// Command prefix used to run a delegated file, e.g. `["java", "-jar"]`.
    /// Empty means the file is executed directly.
    pub launcher: Vec<String>,
    pub not_found_page: String,
    pub not_supported_page: String,
}

impl Config {
    pub fn new(web_root: PathBuf) -> Config {
        Config {
            web_root,
            ..Config::default()
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            address: "127.0.0.1".to_string(),
            port: 8080,
            web_root: PathBuf::from("."),
            default_file: DEFAULT_FILE.to_string(),
            verbose: false,
            read_timeout: None,
            max_body_bytes: 1024 * 1024,
            delegate_extension: "cgi".to_string(),
            launcher: Vec::new(),
            not_found_page: FILE_NOT_FOUND.to_string(),
            not_supported_page: METHOD_NOT_SUPPORTED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::path::PathBuf;

    #[test]
    fn address_joins_host_and_port() {
        let mut config = Config::new(PathBuf::from("www"));
        config.port = 9000;
        assert_eq!("127.0.0.1:9000", config.address());
        assert_eq!(PathBuf::from("www"), config.web_root);
        assert_eq!("index.html", config.default_file);
    }
}
