use anyhow::{bail, Context};
use clap::Parser;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartrisk_core::optimizer::error::OptimizerDiagnosticsError;
use smartrisk_core::optimizer::{HttpOptimizerClient, OptimizerClient};
use smartrisk_core::questionnaire::{Catalog, QuestionnaireFlow, RiskScoreResult};
use smartrisk_core::session::{Completion, PortfolioSession};

mod args;
mod report;

use args::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = smartrisk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args.command, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }
    Ok(())
}

async fn run(command: Command, settings: &smartrisk_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::Questions => {
            println!("{}", serde_json::to_string_pretty(&Catalog::standard())?);
        }
        Command::Score { answers } => {
            let raw: BTreeMap<_, _> = answers.into_iter().collect();
            let result = QuestionnaireFlow::standard()
                .complete_with(&raw)
                .context("questionnaire is incomplete or invalid")?;
            println!("{}", report::risk_profile(&result));
        }
        Command::Skip => {
            println!("{}", report::risk_profile(&QuestionnaireFlow::standard().skip()));
        }
        Command::Stocks => {
            let client = HttpOptimizerClient::from_settings(settings)?;
            let records = match client.fetch_stocks().await {
                Ok(records) => records,
                Err(err) => {
                    if let Some(diag) = err.downcast_ref::<OptimizerDiagnosticsError>() {
                        tracing::warn!(
                            stage = diag.stage,
                            status = ?diag.status,
                            raw_body = diag.raw_body.as_deref().unwrap_or(""),
                            "optimizer rejected stocks request"
                        );
                    }
                    tracing::warn!(error = %err, "stock reference data unavailable");
                    Vec::new()
                }
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Allocate {
            objective,
            risk,
            from_score,
            cash,
            stocks,
            dry_run,
        } => {
            let mut session = match from_score {
                Some(score) => {
                    PortfolioSession::from_risk_profile(&RiskScoreResult::from_score(score))
                }
                None => PortfolioSession::new(),
            };
            session.set_objective(objective);
            if from_score.is_none() {
                session.set_risk_target(risk);
            }
            session.set_investable_cash(cash);
            session.set_asset_count(stocks.len())?;
            for (index, (symbol, minimum_weight)) in stocks.iter().enumerate() {
                session.set_slot_symbol(index, symbol)?;
                session.require_slot_minimum_weight(index, *minimum_weight)?;
            }

            if dry_run {
                let ticket = session.begin_submission()?;
                tracing::info!(ticket = %ticket.id, dry_run = true, "allocation request prepared");
                println!("{}", serde_json::to_string_pretty(&ticket.wire)?);
                return Ok(());
            }

            let client = HttpOptimizerClient::from_settings(settings)?;
            if session.load_candidates(&client).await > 0 {
                for (symbol, _) in &stocks {
                    if !session.candidates().iter().any(|c| &c.symbol == symbol) {
                        tracing::warn!(%symbol, "symbol not in optimizer reference data");
                    }
                }
            }

            match session.submit(&client).await? {
                Completion::Applied => {
                    let Some(projected) = session.last_result() else {
                        bail!("optimizer result missing");
                    };
                    print!("{}", report::portfolio(projected));
                }
                Completion::Failed => {
                    bail!(
                        "portfolio computation failed: {}",
                        session.last_error().unwrap_or("unknown error")
                    );
                }
                Completion::Discarded => bail!("portfolio request was superseded"),
            }
        }
    }
    Ok(())
}

fn init_sentry(settings: &smartrisk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
