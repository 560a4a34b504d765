use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 5005;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Start with the seed posts instead of an empty store.
    pub seed_posts: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            seed_posts: true,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and `SEED_POSTS`. Invalid values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: parse_or_default("HOST", lookup("HOST"), defaults.host),
            port: parse_or_default("PORT", lookup("PORT"), defaults.port),
            seed_posts: parse_or_default("SEED_POSTS", lookup("SEED_POSTS"), defaults.seed_posts),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
{
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => {
                info!("Using {} from environment variable {}.", parsed, name);
                parsed
            }
            Err(_) => {
                warn!(
                    "Invalid {} value '{}' in environment variable. Using default {}.",
                    name, value, default
                );
                default
            }
        },
        None => {
            info!(
                "{} environment variable not set. Using default {}.",
                name, default
            );
            default
        }
    }
}
