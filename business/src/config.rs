use serde::Deserialize;
use ustr::Ustr;

/// Prefix of the environment variables read by [`BusinessConfig::from_env`].
pub const ENV_PREFIX: &str = "CAMPUS_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessConfig {
    pub api_base_url: String,
    /// Optional bearer token forwarded on every request.
    ///
    /// Obtaining it is the host's concern; this layer only attaches it.
    pub api_token: Option<String>,
}

// Intermediate struct for deserializing environment variables, where every
// field is optional and falls back to the build default.
#[derive(Debug, Deserialize)]
struct RawConfig {
    api_base_url: Option<String>,
    api_token: Option<String>,
}

impl BusinessConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            api_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Reads `CAMPUS_API_BASE_URL` and `CAMPUS_API_TOKEN`.
    pub fn from_env() -> Result<Self, serde_env::Error> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the config from `(name, value)` pairs; names without the
    /// `CAMPUS_` prefix are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, serde_env::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let scoped: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|k| (k.to_owned(), v.as_ref().to_owned()))
            })
            .collect();
        let raw: RawConfig = serde_env::from_iter(scoped)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: raw
                .api_base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.api_base_url),
            api_token: raw.api_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn api_url(&self) -> Ustr {
        if self.api_base_url.is_empty() {
            Ustr::from("/api")
        } else {
            Ustr::from(&format!("{}/api", self.api_base_url))
        }
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            api_base_url: if cfg!(target_arch = "wasm32") {
                String::new()
            } else if cfg!(feature = "env_test") {
                "https://campus-test.example.edu".to_owned()
            } else if cfg!(feature = "env_nightly") {
                "https://campus-nightly.example.edu".to_owned()
            } else {
                "http://localhost:8080".to_owned()
            },
            api_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_urls() {
        let config = BusinessConfig::default();

        if cfg!(target_arch = "wasm32") {
            assert_eq!(config.api_url(), Ustr::from("/api"));
        } else if cfg!(feature = "env_test") {
            assert_eq!(
                config.api_url(),
                Ustr::from("https://campus-test.example.edu/api")
            );
        } else if cfg!(feature = "env_nightly") {
            assert_eq!(
                config.api_url(),
                Ustr::from("https://campus-nightly.example.edu/api")
            );
        } else {
            assert_eq!(config.api_url(), Ustr::from("http://localhost:8080/api"));
        }
    }

    #[test]
    fn test_from_vars_overrides_defaults() {
        let config = BusinessConfig::from_vars(vec![
            ("CAMPUS_API_BASE_URL", "https://school.example.org/"),
            ("CAMPUS_API_TOKEN", "secret"),
            ("HOME", "/root"),
        ])
        .expect("config should deserialize");

        assert_eq!(config.api_base_url, "https://school.example.org");
        assert_eq!(config.api_token(), Some("secret"));
        assert_eq!(
            config.api_url(),
            Ustr::from("https://school.example.org/api")
        );
    }

    #[test]
    fn test_from_vars_without_overrides_uses_defaults() {
        let config = BusinessConfig::from_vars(Vec::<(String, String)>::new())
            .expect("empty env should deserialize");
        assert_eq!(config, BusinessConfig::default());
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let config = BusinessConfig::from_vars(vec![("CAMPUS_API_TOKEN", "  ")])
            .expect("config should deserialize");
        assert!(config.api_token().is_none());
    }

    #[test]
    fn test_empty_base_url_is_relative() {
        assert_eq!(BusinessConfig::new("").api_url(), Ustr::from("/api"));
    }
}
