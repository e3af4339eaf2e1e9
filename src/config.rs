use crate::errors::{ClientError, ClientResult};

use clap::{ArgAction, Parser};
use icb_protocol::{DEFAULT_PORT, NICKNAME_MAX};
use std::env;
use std::path::PathBuf;

/// Command line of the client.
#[derive(Parser, Debug)]
#[command(name = "oicb", about = "ICB chat client")]
pub struct Cli {
    /// Increase debug verbosity (repeatable)
    #[arg(short = 'd', action = ArgAction::Count)]
    pub debug: u8,

    /// Disable history logging
    #[arg(short = 'H')]
    pub no_history: bool,

    /// Network timeout in seconds, 0 disables keep-alive probing
    #[arg(short = 't', value_name = "secs", default_value_t = 30)]
    pub net_timeout: u64,

    /// Server to connect to
    #[arg(value_name = "[nick@]host[:port]")]
    pub server: String,

    /// Room to join after logging in
    #[arg(value_name = "room")]
    pub room: String,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub nick: String,
    pub hostname: String,
    pub port: u16,
    /// Whether a port was spelled out on the command line; the status
    /// summary only mentions the port when it was.
    pub port_explicit: bool,
    pub room: String,
    pub net_timeout: u64,
    pub history_enabled: bool,
    pub debug: u8,
    /// Directory history files for this server land in.
    pub history_root: PathBuf,
}

impl ClientConfig {
    pub fn from_cli(cli: Cli) -> ClientResult<Self> {
        let (nick, host_port) = match cli.server.split_once('@') {
            Some((nick, rest)) => {
                if rest.is_empty() {
                    return Err(ClientError::Usage(
                        "invalid hostname specification".to_string(),
                    ));
                }
                (nick.to_string(), rest)
            }
            None => (login_name()?, cli.server.as_str()),
        };

        if nick.len() >= NICKNAME_MAX {
            return Err(ClientError::Usage("too long nickname".to_string()));
        }

        // Known limitation: an IPv6 literal with an explicit port is split
        // at its first colon.
        let (hostname, port, port_explicit) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ClientError::Usage(format!("invalid port {:?}", port))
                })?;
                (host.to_string(), port, true)
            }
            None => (host_port.to_string(), DEFAULT_PORT, false),
        };
        if hostname.is_empty() {
            return Err(ClientError::Usage(
                "invalid hostname specification".to_string(),
            ));
        }

        let history_enabled = !cli.no_history;
        let history_root = if history_enabled {
            let home = env::var("HOME")
                .map_err(|_| ClientError::Usage("HOME is not set".to_string()))?;
            PathBuf::from(home)
                .join(".oicb")
                .join("logs")
                .join(&hostname)
        } else {
            PathBuf::new()
        };

        Ok(ClientConfig {
            nick,
            hostname,
            port,
            port_explicit,
            room: cli.room,
            net_timeout: cli.net_timeout,
            history_enabled,
            debug: cli.debug,
            history_root,
        })
    }
}

fn login_name() -> ClientResult<String> {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .map_err(|_| ClientError::Usage("cannot determine login name".to_string()))
}
