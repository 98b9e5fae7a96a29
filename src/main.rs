// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use clap::{Args, Parser, Subcommand};
use operator_console::console::config::ServerOptions;
use operator_console::run_console;
use std::path::PathBuf;

shadow_rs::shadow!(build);

#[derive(Parser)]
#[command(name = "operator-console")]
#[command(about = "Operator web console", long_about = None)]
#[command(version = build::PKG_VERSION, long_version = build::CLAP_LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console server
    Ui(UiArgs),
}

#[derive(Args, Debug, Default)]
struct UiArgs {
    /// Bind address, all interfaces when empty
    #[arg(long)]
    host: Option<String>,

    /// HTTP port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=65535))]
    port: Option<u16>,

    /// HTTPS port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=65535))]
    tls_port: Option<u16>,

    /// Redirect HTTP to HTTPS when certificates are present
    #[arg(long, value_parser = parse_on_off)]
    tls_redirect: Option<bool>,

    /// Certificate directory, defaults to ${HOME}/.console/certs
    #[arg(long)]
    certs_dir: Option<PathBuf>,

    #[arg(long)]
    tls_certificate: Option<PathBuf>,

    #[arg(long)]
    tls_key: Option<PathBuf>,

    /// Additional CA certificate trusted by outbound clients
    #[arg(long)]
    tls_ca: Option<PathBuf>,
}

impl From<UiArgs> for ServerOptions {
    fn from(args: UiArgs) -> Self {
        ServerOptions {
            host: args.host,
            port: args.port,
            tls_port: args.tls_port,
            tls_redirect: args.tls_redirect,
            certs_dir: args.certs_dir,
            tls_certificate: args.tls_certificate,
            tls_key: args.tls_key,
            tls_ca: args.tls_ca,
        }
    }
}

fn parse_on_off(value: &str) -> Result<bool, String> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("'{}' is not 'on' or 'off'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ui(args) => run_console(args.into()).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ui(args: &[&str]) -> Result<UiArgs, clap::Error> {
        let argv = ["operator-console", "ui"].iter().chain(args);
        Cli::try_parse_from(argv).map(|cli| match cli.command {
            Commands::Ui(args) => args,
        })
    }

    #[test]
    fn test_ui_flags() {
        let args = ui(&["--port", "9091", "--tls-redirect", "off", "--certs-dir", "/certs"]).unwrap();
        assert_eq!(args.port, Some(9091));
        assert_eq!(args.tls_redirect, Some(false));

        let options = ServerOptions::from(args);
        assert_eq!(options.certs_dir, Some(PathBuf::from("/certs")));
        assert_eq!(options.tls_port, None);
    }

    #[test]
    fn test_invalid_flags() {
        assert!(ui(&["--port", "0"]).is_err());
        assert!(ui(&["--port", "65536"]).is_err());
        assert!(ui(&["--tls-port", "http"]).is_err());

        let error = ui(&["--tls-redirect", "yes"]).unwrap_err().to_string();
        assert!(error.contains("'yes' is not 'on' or 'off'"));
    }
}
