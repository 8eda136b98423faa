use anyhow::{Context, Result};
use derive_builder::Builder;
use strum::{AsRefStr, Display, EnumString};

pub mod env_file;
pub mod load;

/// Host serving both the REST and the streaming chat endpoints.
pub const DEFAULT_SURF_HOST: &str = "api.asksurf.ai";

/// Chat mode requested when a session is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum SessionType {
    #[default]
    #[strum(serialize = "V2")]
    V2,
    #[strum(serialize = "V2_INSTANT")]
    V2Instant,
    #[strum(serialize = "V2_THINKING")]
    V2Thinking,
}

#[derive(Builder, Clone, Debug)]
pub struct ServiceConfig {
    /// Base URL for REST calls, e.g. `https://api.asksurf.ai`
    #[builder(setter(into))]
    pub(crate) api_base: String,
    /// Base URL for streaming sessions, e.g. `wss://api.asksurf.ai`
    #[builder(setter(into))]
    pub(crate) ws_base: String,
    #[builder(default)]
    pub(crate) session_type: SessionType,
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// TLS endpoints on a single host.
    pub fn for_host(host: &str, session_type: SessionType) -> Result<Self> {
        Self::builder()
            .api_base(format!("https://{host}"))
            .ws_base(format!("wss://{host}"))
            .session_type(session_type)
            .build()
            .context("Failed to build service configuration")
    }

    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn ws_base(&self) -> &str {
        self.ws_base.trim_end_matches('/')
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_type_round_trips_wire_names() {
        assert_eq!(SessionType::from_str("V2").unwrap(), SessionType::V2);
        assert_eq!(
            SessionType::from_str("v2_thinking").unwrap(),
            SessionType::V2Thinking
        );
        assert_eq!(SessionType::V2Instant.to_string(), "V2_INSTANT");
        assert!(SessionType::from_str("V3").is_err());
    }

    #[test]
    fn for_host_builds_tls_endpoints() {
        let config = ServiceConfig::for_host(DEFAULT_SURF_HOST, SessionType::V2).unwrap();
        assert_eq!(config.api_base(), "https://api.asksurf.ai");
        assert_eq!(config.ws_base(), "wss://api.asksurf.ai");
    }

    #[test]
    fn builder_requires_endpoints() {
        assert!(ServiceConfig::builder().api_base("http://x").build().is_err());
    }
}
