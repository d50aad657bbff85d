use crate::push::PushConfig;
use clap::Parser;
use lead_api::DEFAULT_API_URL;
use lead_core::push_wire::{socket_url, DEFAULT_CHANNEL};
use lead_core::Portal;
use std::io;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "lead-desk", about = "Terminal desk for billing, insurance and manager lead work")]
pub struct Args {
    /// Backend base URL.
    #[arg(long, env = "LEAD_DESK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// billing, insurance, manager or other.
    #[arg(long, env = "LEAD_DESK_PORTAL", default_value = "billing")]
    pub portal: String,

    /// Operator name used as the chat sender.
    #[arg(long, env = "LEAD_DESK_AGENT")]
    pub agent: Option<String>,

    #[arg(long, env = "PUSHER_KEY")]
    pub pusher_key: Option<String>,

    #[arg(long, env = "PUSHER_CLUSTER", default_value = "ap1")]
    pub pusher_cluster: String,

    /// Full websocket URL; overrides key and cluster.
    #[arg(long, env = "LEAD_DESK_PUSHER_URL")]
    pub pusher_url: Option<String>,

    #[arg(long, default_value = DEFAULT_CHANNEL)]
    pub channel: String,

    #[arg(long, env = "LEAD_DESK_MANAGER_TOKEN")]
    pub manager_token: Option<String>,

    /// Disable the terminal bell for sound cues.
    #[arg(long)]
    pub mute: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid portal: {0}")]
    Portal(String),
    #[error("invalid api url {url}: {source}")]
    ApiUrl { url: String, source: url::ParseError },
    #[error("invalid push url {url}: {source}")]
    PushUrl { url: String, source: url::ParseError },
    #[error("push url must use ws or wss, got {0}")]
    PushScheme(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub portal: Portal,
    pub agent: Option<String>,
    /// `None` disables the realtime channel.
    pub push: Option<PushConfig>,
    pub manager_token: Option<String>,
    pub sound: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let portal = args.portal.parse::<Portal>().map_err(ConfigError::Portal)?;
        Url::parse(&args.api_url).map_err(|source| ConfigError::ApiUrl {
            url: args.api_url.clone(),
            source,
        })?;

        let raw_push_url = match (non_empty(args.pusher_url), non_empty(args.pusher_key)) {
            (Some(url), _) => Some(url),
            (None, Some(key)) => Some(socket_url(&key, args.pusher_cluster.trim())),
            (None, None) => None,
        };
        let push = match raw_push_url {
            Some(raw) => {
                let url = Url::parse(&raw).map_err(|source| ConfigError::PushUrl {
                    url: raw.clone(),
                    source,
                })?;
                if !matches!(url.scheme(), "ws" | "wss") {
                    return Err(ConfigError::PushScheme(url.scheme().to_string()));
                }
                Some(PushConfig::new(url, args.channel.trim()))
            }
            None => None,
        };

        Ok(Self {
            api_url: args.api_url,
            portal,
            agent: non_empty(args.agent),
            push,
            manager_token: non_empty(args.manager_token),
            sound: !args.mute,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// The terminal belongs to the UI, so logs are dropped unless
/// `LEAD_DESK_LOG_STDOUT` is set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = std::env::var("LEAD_DESK_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false);
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["lead-desk"];
        argv.extend_from_slice(extra);
        Config::from_args(Args::try_parse_from(argv).expect("args"))
    }

    #[test]
    fn parse_bool_flag_accepts_common_values() {
        assert_eq!(parse_bool_flag(" YES "), Some(true));
        assert_eq!(parse_bool_flag("off"), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }

    #[test]
    fn pusher_key_builds_cluster_socket_url() {
        let config = parse(&[
            "--portal",
            "insurance",
            "--pusher-key",
            "abc123",
            "--pusher-cluster",
            "eu",
            "--agent",
            "  Areeb ",
        ])
        .expect("config");
        assert_eq!(config.portal, Portal::Insurance);
        assert_eq!(config.agent.as_deref(), Some("Areeb"));
        let push = config.push.expect("push enabled");
        assert_eq!(push.url.scheme(), "wss");
        assert_eq!(push.url.host_str(), Some("ws-eu.pusher.com"));
        assert!(push.url.path().ends_with("/abc123"));
        assert_eq!(push.channel, DEFAULT_CHANNEL);
    }

    #[test]
    fn explicit_url_overrides_key_and_must_be_websocket() {
        let config = parse(&[
            "--pusher-key",
            "abc",
            "--pusher-url",
            "ws://127.0.0.1:6001/app/local",
        ])
        .expect("config");
        assert_eq!(
            config.push.expect("push").url.as_str(),
            "ws://127.0.0.1:6001/app/local"
        );

        assert!(matches!(
            parse(&["--pusher-url", "http://example.com/app/x"]),
            Err(ConfigError::PushScheme(_))
        ));
    }

    #[test]
    fn missing_key_disables_push_and_bad_portal_fails() {
        let config = parse(&["--manager-token", " "]).expect("config");
        assert!(config.push.is_none());
        assert!(config.manager_token.is_none());
        assert!(config.sound);

        assert!(matches!(
            parse(&["--portal", "kiosk"]),
            Err(ConfigError::Portal(_))
        ));
        assert!(matches!(
            parse(&["--api-url", "not a url"]),
            Err(ConfigError::ApiUrl { .. })
        ));
    }
}
