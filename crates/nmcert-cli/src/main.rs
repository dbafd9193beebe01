//! nmcert - TLS certificates for Namecoin domains

mod commands;
mod error;
mod parse;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use nmcert_pki::DEFAULT_AIA_BASE;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nmcert")]
#[command(about = "Generate TLS certificates and dehydrated records for Namecoin domains")]
#[command(version)]
pub struct Cli {
    /// Comma-separated hostnames to generate a certificate for
    #[arg(long, default_value = "")]
    pub host: String,

    /// Creation date formatted as "Jan 2 15:04:05 2006" (UTC); defaults to now
    #[arg(long)]
    pub start_date: Option<String>,

    /// Validity duration, e.g. 8760h or 365d
    #[arg(long, default_value = "365d")]
    pub duration: String,

    /// ECDSA curve to use: P224, P256, P384 or P521
    #[arg(long)]
    pub ecdsa_curve: Option<String>,

    /// Use Ed25519 keys
    #[arg(long)]
    pub ed25519: bool,

    /// Issue the certificate from a CA instead of self-signing it
    #[arg(long)]
    pub use_ca: bool,

    /// Existing CA private key (PKCS#8 PEM)
    #[arg(long)]
    pub parent_key: Option<String>,

    /// Existing CA chain (PEM); requires --parent-key
    #[arg(long)]
    pub parent_chain: Option<String>,

    /// Existing grandparent CA private key (PKCS#8 PEM)
    #[arg(long)]
    pub grandparent_key: Option<String>,

    /// Existing grandparent CA chain (PEM), bundled into chain.pem
    #[arg(long)]
    pub grandparent_chain: Option<String>,

    /// Reference the grandparent CA through AIA instead of bundling it
    #[arg(long)]
    pub use_aia: bool,

    /// AIA resolver host and path
    #[arg(long, default_value = DEFAULT_AIA_BASE)]
    pub aia_base: String,

    /// Also issue a false certificate for this hostname
    #[arg(long)]
    pub false_host: Option<String>,

    /// Directory to write output files to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match commands::issue::handle(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_integrity_failure() {
                tracing::error!("round-trip check failed; do not use the generated certificate");
            }
            eprintln!("{} {e}", "error:".red());
            ExitCode::FAILURE
        }
    }
}
