use std::path::PathBuf;

use colored::Colorize;
use nmcert_pki::prelude::*;
use time::OffsetDateTime;

use crate::{
    error::CliResult,
    parse::{parse_duration, parse_start_date},
    Cli,
};

pub fn handle(cli: Cli) -> CliResult<()> {
    let output_dir = cli.output_dir.clone();
    let options = options_from_cli(cli)?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let config = IssueConfig::from_options(options, now)?;
    let primary_host = config.primary_host().to_string();

    let issuance = issue(config)?;
    let paths = write_artifacts(&output_dir, &issuance.artifacts()?)?;

    println!(
        "{} issued certificate for {}",
        "✓".green(),
        issuance.hosts.join(", ").cyan()
    );
    for path in &paths {
        println!("  {}", path.display());
    }
    if let Some(record) = &issuance.namecoin_record {
        println!();
        println!("{}", format!("Namecoin tls value for {primary_host}:").cyan());
        println!("  {}", record.to_json());
    }
    if issuance.false_certificate.is_some() {
        println!(
            "{} false certificate written; a correct validator must reject it",
            "!".yellow()
        );
    }

    Ok(())
}

fn options_from_cli(cli: Cli) -> CliResult<IssueOptions> {
    let start = cli.start_date.as_deref().map(parse_start_date).transpose()?;
    let duration_secs = parse_duration(&cli.duration)?;

    Ok(IssueOptions {
        hosts: cli.host,
        ecdsa_curve: cli.ecdsa_curve,
        ed25519: cli.ed25519,
        start,
        duration_secs,
        use_ca: cli.use_ca,
        parent_key: cli.parent_key.map(PathBuf::from),
        parent_chain: cli.parent_chain.map(PathBuf::from),
        grandparent_key: cli.grandparent_key.map(PathBuf::from),
        grandparent_chain: cli.grandparent_chain.map(PathBuf::from),
        use_aia: cli.use_aia,
        aia_base: cli.aia_base,
        false_host: cli.false_host,
    })
}
