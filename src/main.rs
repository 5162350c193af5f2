mod cli;

use clap::Parser;
use cli::{AccountsAction, Cli, Commands, SettingsAction};
use colored::*;
use farm_reward_bot::{
    analytics::{self, PlantCatalog, SortKey},
    error::{self, BotError},
    prefs::{settings::QuietHoursPatch, AccountInput, AccountStore, SettingsStore},
    rewards::{
        ClaimClient, ClaimOrchestrator, HistoryReporter, ReporterSet, SystemClock,
        TracingReporter,
    },
    rpc::HttpTransport,
    storage::Database,
    utils, Config,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

type MailboxOrchestrator = ClaimOrchestrator<ClaimClient<HttpTransport>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("farm_reward_bot=debug,farm_bot=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(Some(&cli.config)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Check { force } => run_check(&config, force).await,

        Commands::Auto { interval } => {
            info!("Starting automated mailbox service (interval: {}s)", interval);
            run_auto_service(&config, interval).await
        }

        Commands::History { limit, format } => show_history(&config, limit, &format),

        Commands::Stats { format } => show_stats(&config, &format),

        Commands::Settings { action } => manage_settings(&config, action),

        Commands::Accounts { action } => manage_accounts(&config, action),

        Commands::Rankings {
            catalog,
            sort,
            limit,
            format,
        } => show_rankings(&catalog, &sort, limit, &format),

        Commands::Init => initialize(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn build_orchestrator(config: &Config) -> error::Result<MailboxOrchestrator> {
    let transport = HttpTransport::new(&config.server.base_url, config.request_timeout())?;
    let api = Arc::new(ClaimClient::new(Arc::new(transport)));

    let db = Database::new(&config.database.path)?;
    let reporter = ReporterSet::new()
        .with(TracingReporter)
        .with(HistoryReporter::new(db));

    Ok(ClaimOrchestrator::from_config(
        api,
        config,
        Arc::new(SystemClock),
        Arc::new(reporter),
    )?)
}

async fn run_check(config: &Config, force: bool) -> error::Result<()> {
    let mut orchestrator = build_orchestrator(config)?;
    let outcome = orchestrator.check_and_claim(force).await;
    let status = orchestrator.status();

    println!("\n{}", "=== Mailbox Check ===".cyan().bold());
    println!("Claimed:       {}", outcome.claimed.to_string().green());
    println!("Reward items:  {}", outcome.reward_items);
    println!(
        "Done today:    {}",
        if status.done_today {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    Ok(())
}

async fn run_auto_service(config: &Config, interval: u64) -> error::Result<()> {
    println!("{}", "Starting automated mailbox service...".green());
    println!("Interval: {} seconds", interval);

    let mut orchestrator = build_orchestrator(config)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping mailbox service");
                break;
            }
        }

        // Re-read so toggles changed from another shell take effect
        let settings = SettingsStore::open(config.store_file());
        if !settings.settings().automation.task {
            debug!("Task automation is off, skipping mailbox check");
            continue;
        }

        let outcome = orchestrator.check_and_claim(false).await;
        let status = orchestrator.status();
        debug!(
            claimed = outcome.claimed,
            reward_items = outcome.reward_items,
            done_today = status.done_today,
            "Mailbox check finished"
        );
    }

    Ok(())
}

fn show_history(config: &Config, limit: usize, format: &str) -> error::Result<()> {
    let db = Database::new(&config.database.path)?;
    let history = db.get_cycle_history(Some(limit))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("{}", "No claim cycles recorded yet".yellow());
        return Ok(());
    }

    let offset = config.reference_offset()?;
    println!("{}", "Recent Claim Cycles:".yellow());
    utils::print_table_border(100);
    utils::print_table_row(&["Time", "Result", "Claimed", "Message"], &[26, 8, 8, 50]);
    utils::print_table_border(100);

    for record in &history {
        utils::print_table_row(
            &[
                &utils::format_timestamp(&record.recorded_at, offset),
                &utils::format_result(record.result),
                &record.claimed.to_string(),
                &utils::truncate(&record.message, 50),
            ],
            &[26, 8, 8, 50],
        );
    }
    utils::print_table_border(100);
    Ok(())
}

fn show_stats(config: &Config, format: &str) -> error::Result<()> {
    let db = Database::new(&config.database.path)?;
    let stats = db.get_stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let offset = config.reference_offset()?;
    println!("{}", "=== Mailbox Reward Statistics ===".cyan().bold());
    println!("\nCycles:");
    println!("  Total:      {}", stats.total_cycles);
    println!("  Claimed:    {}", stats.ok_cycles.to_string().green());
    println!("  Nothing:    {}", stats.empty_cycles.to_string().yellow());
    println!("  Errors:     {}", stats.error_cycles.to_string().red());
    println!("  Success:    {:.1}%", stats.success_rate());
    println!("\nMails claimed: {}", stats.total_claimed);
    if let Some(last) = stats.last_success {
        println!("Last success:  {}", utils::format_timestamp(&last, offset));
    }
    Ok(())
}

/// CLI values are parsed as JSON when possible so `30`, `true` and `"x"`
/// reach the settings store with their natural types.
fn cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn manage_settings(config: &Config, action: SettingsAction) -> error::Result<()> {
    let mut store = SettingsStore::open(config.store_file());

    let updated = match action {
        SettingsAction::Show => store.settings().clone(),
        SettingsAction::Automation { key, value } => {
            store.set_automation(&key, cli_value(&value))?
        }
        SettingsAction::Interval { kind, seconds } => {
            store.set_interval(&kind, cli_value(&seconds))?
        }
        SettingsAction::Strategy { strategy } => store.set_planting_strategy(&strategy)?,
        SettingsAction::Seed { seed_id } => store.set_preferred_seed(cli_value(&seed_id))?,
        SettingsAction::QuietHours {
            enabled,
            start,
            end,
        } => store.set_quiet_hours(QuietHoursPatch {
            enabled: enabled.map(Value::Bool),
            start,
            end,
        })?,
        SettingsAction::Theme { theme } => store.set_theme(&theme)?,
    };

    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}

fn manage_accounts(config: &Config, action: AccountsAction) -> error::Result<()> {
    let store = AccountStore::new(config.accounts_file());

    match action {
        AccountsAction::List => {
            let data = store.load();
            if data.accounts.is_empty() {
                println!("{}", "No accounts registered".yellow());
                return Ok(());
            }
            utils::print_table_border(70);
            utils::print_table_row(&["Id", "Name", "Platform", "Uin"], &[6, 30, 10, 16]);
            utils::print_table_border(70);
            for account in &data.accounts {
                utils::print_table_row(
                    &[
                        &account.id,
                        &utils::truncate(&account.name, 30),
                        &account.platform,
                        &account.uin,
                    ],
                    &[6, 30, 10, 16],
                );
            }
            utils::print_table_border(70);
        }

        AccountsAction::Add {
            id,
            name,
            code,
            platform,
            uin,
        } => {
            let data = store.add_or_update(AccountInput {
                id,
                name,
                code,
                platform,
                uin,
                ..Default::default()
            })?;
            println!(
                "{} ({} accounts)",
                "✓ Account saved".green(),
                data.accounts.len()
            );
        }

        AccountsAction::Remove { id, yes } => {
            if store.load().find(&id).is_none() {
                return Err(BotError::AccountNotFound(id));
            }
            if !yes && !utils::confirm_action(&format!("Remove account {}?", id)) {
                println!("Cancelled");
                return Ok(());
            }
            store.delete(&id)?;
            println!("{}", "✓ Account removed".green());
        }
    }

    Ok(())
}

fn show_rankings(
    catalog_path: &str,
    sort: &str,
    limit: Option<usize>,
    format: &str,
) -> error::Result<()> {
    let sort: SortKey = sort.parse().map_err(BotError::Config)?;
    let catalog = PlantCatalog::load(catalog_path)?;
    let mut rankings = analytics::plant_rankings(&catalog, sort);
    if let Some(limit) = limit {
        rankings.truncate(limit);
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&rankings)?);
        return Ok(());
    }

    utils::print_table_border(96);
    utils::print_table_row(
        &["Seed", "Name", "Lv", "Grow", "Exp/h", "Fert Exp/h", "Gold/h", "Profit/h"],
        &[6, 16, 4, 8, 10, 10, 10, 10],
    );
    utils::print_table_border(96);
    for r in &rankings {
        utils::print_table_row(
            &[
                &r.seed_id.to_string(),
                &utils::truncate(&r.name, 16),
                &r.level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
                &r.grow_time_str,
                &format!("{:.2}", r.exp_per_hour),
                &format!("{:.2}", r.normal_fertilizer_exp_per_hour),
                &format!("{:.2}", r.gold_per_hour),
                &format!("{:.2}", r.profit_per_hour),
            ],
            &[6, 16, 4, 8, 10, 10, 10, 10],
        );
    }
    utils::print_table_border(96);
    Ok(())
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing farm bot...".green());
    std::fs::create_dir_all(&config.storage.data_dir)?;
    let _db = Database::new(&config.database.path)?;
    println!("{}", "✓ History database initialized".green());

    let settings = SettingsStore::open(config.store_file());
    if !settings.path().exists() {
        settings.save()?;
        println!("{}", "✓ Default settings written".green());
    }
    println!("{}", "✓ Configuration loaded".green());

    println!("\n{}", "Configuration:".cyan());
    println!("  Server:         {}", config.server.base_url);
    println!("  Sources:        {:?}", config.rewards.sources);
    println!("  Primary:        {}", config.rewards.primary_source);
    println!("  Cooldown:       {}s", config.rewards.cooldown_secs);
    println!("  UTC offset:     {:+}h", config.rewards.utc_offset_hours);
    println!(
        "  Task automation: {}",
        utils::format_flag(settings.settings().automation.task)
    );

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to claim today's mailbox rewards", "farm-bot check".yellow());
    println!("  {} to keep claiming on a schedule", "farm-bot auto".yellow());
    println!("  {} to view statistics", "farm-bot stats".yellow());
    Ok(())
}
