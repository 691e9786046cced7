mod cli;
mod envelope;
mod logging;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use futures_util::future::join_all;
use sitepeek_engine::{Fetcher, ReqwestFetcher};
use sitepeek_logging::{peek_error, peek_info};

use crate::cli::Cli;
use crate::envelope::{validate_url, Envelope};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::initialize(cli.log_destination(), cli.log_level.into()) {
        eprintln!("Warning: {err:#}");
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            peek_error!("{err:#}");
            eprintln!("sitepeek: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every URL produced metadata.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let envelopes = runtime.block_on(collect(cli));

    let mut stdout = std::io::stdout().lock();
    for envelope in &envelopes {
        let line = if cli.pretty {
            serde_json::to_string_pretty(envelope)?
        } else {
            serde_json::to_string(envelope)?
        };
        writeln!(stdout, "{line}").context("failed to write result")?;
    }

    Ok(envelopes.iter().all(Envelope::is_success))
}

/// Runs one independent pipeline per URL, concurrently, keeping input order.
async fn collect(cli: &Cli) -> Vec<Envelope> {
    let fetcher = ReqwestFetcher::new();
    let jobs = cli.urls.iter().map(|raw| {
        let fetcher = &fetcher;
        async move {
            let site = match validate_url(raw) {
                Ok(site) => site,
                Err(err) => return Envelope::invalid_url(raw, &err),
            };
            let config = cli.fetch_config(&site);
            let result = fetcher.site_info(&config).await;
            match &result {
                Ok(info) => peek_info!("{} fetched in {}", site, info.request_cost()),
                Err(err) => peek_info!("{} failed: {}", site, err),
            }
            Envelope::from_result(&site, result)
        }
    });
    join_all(jobs).await
}
