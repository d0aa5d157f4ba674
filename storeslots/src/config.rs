use std::path::PathBuf;

/// Default configuration service URL.
/// Override at build time: STORESLOTS_SERVICE_URL=https://example.com cargo build
pub const SERVICE_URL: &str = match option_env!("STORESLOTS_SERVICE_URL") {
    Some(url) => url,
    None => "http://localhost:3000",
};

/// Runtime settings for an editor host.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub service_url: String,
    /// Where the draft cache and log file live; `None` keeps both off disk.
    pub data_dir: Option<PathBuf>,
    /// File to seed first drafts from instead of the built-in layouts.
    pub baseline_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: SERVICE_URL.to_string(),
            data_dir: None,
            baseline_file: None,
        }
    }
}

impl ClientConfig {
    /// Reads `STORESLOTS_SERVICE_URL`, `STORESLOTS_DATA_DIR` and
    /// `STORESLOTS_BASELINE` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            service_url: non_empty("STORESLOTS_SERVICE_URL")
                .unwrap_or_else(|| SERVICE_URL.to_string()),
            data_dir: non_empty("STORESLOTS_DATA_DIR").map(PathBuf::from),
            baseline_file: non_empty("STORESLOTS_BASELINE").map(PathBuf::from),
        }
    }

    pub fn baseline(&self) -> crate::persistence::Baseline {
        match &self.baseline_file {
            Some(path) => crate::persistence::Baseline::File(path.clone()),
            None => crate::persistence::Baseline::BuiltIn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Baseline;

    #[test]
    fn falls_back_to_compiled_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert!(matches!(config.baseline(), Baseline::BuiltIn));
    }

    #[test]
    fn reads_overrides_and_ignores_blanks() {
        let config = ClientConfig::from_lookup(|key| match key {
            "STORESLOTS_SERVICE_URL" => Some("https://slots.example.com".into()),
            "STORESLOTS_DATA_DIR" => Some("  ".into()),
            "STORESLOTS_BASELINE" => Some("/etc/storeslots/cart.json".into()),
            _ => None,
        });
        assert_eq!(config.service_url, "https://slots.example.com");
        assert_eq!(config.data_dir, None);
        assert!(matches!(config.baseline(), Baseline::File(_)));
    }
}
