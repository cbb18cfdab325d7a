use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cosign-node")]
#[command(version, about = "Gossip-based signature collector for Stellar transactions", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags layered over file and environment configuration.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    #[arg(long, global = true, help = "HTTP ingress port")]
    pub port_http: Option<u16>,

    #[arg(long, global = true, help = "libp2p TCP port")]
    pub port_p2p: Option<u16>,

    #[arg(long, global = true, help = "Horizon base URL")]
    pub horizon: Option<String>,

    #[arg(long, global = true, help = "Path to the SQLite signature store")]
    pub db: Option<String>,

    #[arg(long, global = true, help = "Comma-separated bootstrap peer multiaddrs")]
    pub peers: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the node (default mode)
    Run,

    /// Show the stored signatures for a transaction
    Status {
        #[arg(long, help = "Transaction hash (hex)")]
        tx: String,
    },

    /// Delete records that have not changed for a while
    Prune {
        #[arg(long, help = "Prune records idle for longer than this many hours")]
        older_than_hours: u64,
    },

    /// Print the effective configuration
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_run() {
        let cli = Cli::try_parse_from(["cosign-node"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cosign-node",
            "run",
            "--port-http",
            "8080",
            "--peers",
            "/ip4/127.0.0.1/tcp/4001",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Run)));
        assert_eq!(cli.overrides.port_http, Some(8080));
        assert_eq!(cli.overrides.peers.as_deref(), Some("/ip4/127.0.0.1/tcp/4001"));
    }

    #[test]
    fn test_parse_prune() {
        let cli = Cli::try_parse_from(["cosign-node", "prune", "--older-than-hours", "24"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Prune { older_than_hours: 24 })
        ));
    }
}
