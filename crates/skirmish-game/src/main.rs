//! The `skirmish` binary: parse the player identity, connect, and run
//! the game to its terminal state.
//!
//! Exit code 0 on a finished game, 1 when the connection cannot be
//! established after the allotted retries.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use skirmish_game::Game;
use skirmish_net::NetConfig;
use skirmish_sim::player::PlayerId;

/// Two-player lockstep arena over UDP.
#[derive(Debug, Parser)]
#[command(name = "skirmish")]
struct Cli {
    /// Player identity: "1" hosts the match, "2" discovers and joins.
    #[arg(value_parser = parse_player)]
    player: PlayerId,

    /// Run both peers on this machine (loopback discovery).
    #[arg(long)]
    local: bool,

    /// Base UDP port; control, discovery, and data channels derive from
    /// it.
    #[arg(long, default_value_t = skirmish_net::BASE_PORT)]
    port: u16,
}

fn parse_player(raw: &str) -> Result<PlayerId, String> {
    raw.parse()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = NetConfig {
        base_port: cli.port,
        local_test: cli.local,
        ..Default::default()
    };

    let mut game = match Game::connect(cli.player, config) {
        Ok(game) => game,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(1);
        }
    };

    let outcome = game.run();
    info!(?outcome, "exiting");
    ExitCode::SUCCESS
}
