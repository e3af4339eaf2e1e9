use oicb::client::ChatClient;
use oicb::config::{Cli, ClientConfig};
use oicb::errors::{ClientError, ClientResult};
use oicb::history::HistoryWriter;
use oicb::net;
use oicb::session::Session;

use clap::Parser;
use crossterm::terminal;
use jiff::Timestamp;
use std::process;

/// Keeps the terminal usable no matter which path the process exits on.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> ClientResult<Self> {
        terminal::enable_raw_mode().map_err(ClientError::Terminal)?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    match run(cli) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("oicb: {}", err);
            process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> ClientResult<()> {
    let config = ClientConfig::from_cli(cli)?;
    let history = HistoryWriter::new(
        config.history_root.clone(),
        &config.room,
        config.history_enabled,
    );
    let mut session = Session::new(config, history);

    let socket = net::dial(&session.config.hostname, session.config.port)?;
    session.mark_connected(Timestamp::now().as_second());

    let _raw = RawModeGuard::enable()?;
    ChatClient::new(session, socket).run()
}
