//! Operator tool for the destructive bulk actions on the leads table.
//!
//! Usage: `manage_leads <clear|reset> [--yes]`

use dialoguer::{theme::ColorfulTheme, Confirm};
use dotenvy::dotenv;
use lead_scoring_api::bulk::{self, Confirmed, CLEAR_ALL_PROMPT, RESET_PROMPT};
use lead_scoring_api::config::validate_database_url;
use lead_scoring_api::db::Database;
use lead_scoring_api::store::PgLeadStore;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Clear,
    Reset,
}

impl Action {
    fn prompt(&self) -> &'static str {
        match self {
            Action::Clear => CLEAR_ALL_PROMPT,
            Action::Reset => RESET_PROMPT,
        }
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<(Action, bool)> {
    let mut action = None;
    let mut assume_yes = false;

    for arg in args {
        match arg.as_str() {
            "clear" => action = Some(Action::Clear),
            "reset" => action = Some(Action::Reset),
            "--yes" | "-y" => assume_yes = true,
            other => anyhow::bail!("Unknown argument '{}'", other),
        }
    }

    let action =
        action.ok_or_else(|| anyhow::anyhow!("Usage: manage_leads <clear|reset> [--yes]"))?;
    Ok((action, assume_yes))
}

/// Asks the operator (unless `--yes`) and runs the chosen bulk action.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (action, assume_yes) = parse_args(&args)?;

    let confirmed = assume_yes
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(action.prompt())
            .default(false)
            .interact()?;
    if !confirmed {
        tracing::info!("Aborted, no changes made.");
        return Ok(());
    }
    let token = Confirmed::from_answer(confirmed)?;

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    validate_database_url(&database_url)?;

    let db = Database::new(&database_url).await?;
    let store = PgLeadStore::new(db.pool.clone());
    tracing::info!("Connected to database. Running {:?}...", action);

    let result = match action {
        Action::Clear => bulk::clear_all(&store, token).await,
        Action::Reset => bulk::reset_to_demo_data(&store, token).await,
    }?;

    tracing::info!(
        "Done. Deleted {} leads, inserted {} demo leads.",
        result.deleted,
        result.inserted
    );

    Ok(())
}
