use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "convertbox")]
#[command(about = "Image conversion and PDF compression/merge service", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $CONVERTBOX_CONFIG or config/convertbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Report which Ghostscript executable PDF compression would use
    Locate,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to, overriding `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_address() {
        let cli =
            Cli::try_parse_from(["convertbox", "serve", "--address", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.address, Some("127.0.0.1:9000".parse().unwrap()))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["convertbox", "locate", "--config", "custom.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Locate));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["convertbox"]).is_err());
    }
}
