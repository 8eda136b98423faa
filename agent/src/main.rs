use crate::cli::{AgentArgs, Command, Settings};
use crate::news::NewsAggregator;
use crate::orchestrator::{Pacing, RunOrchestrator};
use crate::questions::QuestionSynthesizer;
use crate::schedule::Scheduler;
use crate::utils::logging::init_logging;
use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::console::style;
use std::io::IsTerminal;
use std::path::Path;
use surf_chat::{
    load_credentials, prompt_credentials, CredentialStore, EnvFile, ServiceConfig, SessionClient,
    TokenClient, ACCESS_TOKEN_KEY, DEVICE_ID_KEY, REFRESH_TOKEN_KEY,
};
use tracing::{debug, info, warn};

mod cli;
mod news;
mod orchestrator;
mod questions;
mod schedule;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    // First pass only locates the env file; the second sees its values.
    let env_file = AgentArgs::parse().env_file;
    let env_loaded = dotenvy::from_path(&env_file);
    let args = AgentArgs::parse();

    let _log_guard = init_logging(args.log_dir.as_deref()).context("initializing logging")?;
    match env_loaded {
        Ok(()) => debug!(path = %env_file.display(), "configuration loaded"),
        Err(e) if e.not_found() => debug!(path = %env_file.display(), "no configuration file"),
        Err(e) => warn!("Failed to load {}: {e}", env_file.display()),
    }

    print_welcome();

    match args.command.unwrap_or(Command::Schedule) {
        Command::Init => init(&args.env_file).await,
        Command::Run => {
            let mut orchestrator = build_orchestrator(&args.settings, &args.env_file)?;
            orchestrator.run().await;
            Ok(())
        }
        Command::Schedule => {
            let mut orchestrator = build_orchestrator(&args.settings, &args.env_file)?;
            let scheduler = Scheduler::new(
                args.settings.schedule_cron.clone(),
                args.settings.schedule_timezone,
            );
            tokio::select! {
                result = scheduler.run(&mut orchestrator) => result,
                signal = tokio::signal::ctrl_c() => {
                    signal.context("listening for Ctrl-C")?;
                    info!(target: "plain", "\n{}", style("Scheduler stopped").dim());
                    Ok(())
                }
            }
        }
    }
}

fn build_orchestrator(settings: &Settings, env_file: &Path) -> Result<RunOrchestrator> {
    let credentials = load_credentials(
        settings.access_token.clone(),
        settings.refresh_token.clone(),
        settings.device_id.clone(),
    )?;

    let service = ServiceConfig::for_host(&settings.surf_host, settings.session_type)?;
    let store = CredentialStore::new(
        credentials.pair,
        credentials.device_id,
        EnvFile::new(env_file),
        TokenClient::new(service.api_base())?,
    );

    let news = NewsAggregator::with_default_sources(settings.cryptocompare_api_key.clone())?;
    let synthesizer = QuestionSynthesizer::new(
        settings.llm_api_key.clone(),
        settings.llm_api_base_url.clone(),
        settings.llm_model.clone(),
    )?;
    let pacing = match settings.question_interval {
        Some(range) => Pacing::Minutes(range),
        None => Pacing::None,
    };

    info!(
        session_type = %settings.session_type,
        question_count = %settings.question_count,
        model = %settings.llm_model,
        "agent configured"
    );

    Ok(RunOrchestrator::new(
        store,
        news,
        synthesizer,
        SessionClient::new(service),
        settings.question_count,
        pacing,
    ))
}

/// Write the template and, on a terminal, fill in the credentials.
async fn init(path: &Path) -> Result<()> {
    let env_file = EnvFile::new(path);
    if env_file.write_template().await? {
        info!(target: "plain", "{} Created {}", style("✔").green(), path.display());
    } else {
        info!(target: "plain", "{} {} already exists, keeping its settings", style("◆").cyan(), path.display());
    }

    if !std::io::stdin().is_terminal() {
        info!(target: "plain", "{}", style("Fill in ACCESS_TOKEN, REFRESH_TOKEN, DEVICE_ID and LLM_API_KEY to finish setup.").dim());
        return Ok(());
    }

    let credentials = prompt_credentials()?;
    env_file
        .update(&[
            (ACCESS_TOKEN_KEY, credentials.pair.access_token()),
            (REFRESH_TOKEN_KEY, credentials.pair.refresh_token()),
            (DEVICE_ID_KEY, credentials.device_id.as_str()),
        ])
        .await?;
    info!(target: "plain", "{} Credentials saved to {}", style("✔").green(), path.display());
    Ok(())
}

fn print_welcome() {
    let sep = style("◆").blue().bold();
    let title = style("Surf Agent").bold();
    let subtitle = style("Daily crypto news, turned into questions for Surf AI.").dim();

    info!(target: "plain", "\n{sep} {title} {sep}\n{subtitle}\n");
}
