use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod access;
mod analytics;
mod auth;
mod dates;
mod db;
mod filters;
mod masking;
mod models;
mod provision;
mod report;
mod watch;

use auth::{AuthError, AuthProvider, PgAuthProvider};
use db::PgSettingsStore;
use filters::{CallFilter, LeadFilter};
use masking::{MaskedView, EMPTY_PLACEHOLDER};
use models::{CallRecord, LeadRecord, CALLS_COLLECTION};
use provision::{AccessStore, AdminCredentials, ProvisionError, ProvisionRequest};

#[derive(Parser)]
#[command(name = "call-analytics")]
#[command(about = "Call and lead analytics over the document store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = analytics::DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Render values under this user's masking policy.
    #[arg(long)]
    as_user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import records from a CSV file
    Import {
        #[arg(long, value_enum)]
        collection: db::ImportTarget,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List call records with spreadsheet-style filters
    Calls {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        call_type: Option<String>,
        #[arg(long)]
        lead_stage: Option<String>,
        #[arg(long)]
        disposition: Option<String>,
        #[arg(long)]
        min_score: Option<i64>,
        #[arg(long)]
        max_score: Option<i64>,
        #[arg(long)]
        min_duration: Option<i64>,
        #[arg(long)]
        max_duration: Option<i64>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// List hot and warm leads
    Leads {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        lead_stage: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Overview metrics across all calls
    Summary,
    /// Per-counselor call volume and scores
    Performance {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Distinct values available for each filter
    Options,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Poll the call collection and print a summary per tick
    Watch {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
    /// Manage the masked-view access list
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
    /// Create a login and add it to the access list
    Provision {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// New users default to the masked view.
        #[arg(long)]
        unmasked: bool,
        #[arg(long)]
        admin_email: String,
        #[arg(long)]
        admin_password: String,
    },
}

#[derive(Subcommand)]
enum AccessAction {
    /// Show the access list
    List,
    /// Add an existing login to the list
    Add {
        email: String,
        #[arg(long)]
        unmasked: bool,
    },
    /// Remove a user from the list
    Remove { email: String },
    /// Change whether a listed user sees masked data
    SetMask { email: String, masked: bool },
    /// Reset a login to a generated temporary password
    ResetPassword { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { collection, csv } => {
            let inserted = db::import_csv(&pool, collection, &csv).await?;
            println!("Imported {inserted} records from {}.", csv.display());
        }
        Commands::Calls {
            search,
            owner,
            city,
            state,
            course,
            call_type,
            lead_stage,
            disposition,
            min_score,
            max_score,
            min_duration,
            max_duration,
            start_date,
            end_date,
            paging,
        } => {
            let filter = CallFilter {
                search,
                owner,
                city,
                state,
                course,
                call_type,
                lead_stage,
                disposition,
                min_score,
                max_score,
                min_duration,
                max_duration,
                start_date,
                end_date,
            };
            let calls = load_calls(&pool).await?;
            let view = resolve_view(&pool, paging.as_user.as_deref()).await?;
            print_calls(&calls, &filter, &paging, view);
        }
        Commands::Leads {
            search,
            tag,
            city,
            state,
            lead_stage,
            publisher,
            start_date,
            end_date,
            paging,
        } => {
            let filter = LeadFilter {
                search,
                tag,
                city,
                state,
                lead_stage,
                publisher,
                start_date,
                end_date,
            };
            let leads = load_leads(&pool).await?;
            let view = resolve_view(&pool, paging.as_user.as_deref()).await?;
            print_leads(&leads, &filter, &paging, view);
        }
        Commands::Summary => {
            let calls = load_calls(&pool).await?;
            let metrics = analytics::call_metrics(&calls);
            println!("Total calls:    {}", metrics.total_calls);
            println!("Average score:  {}", metrics.average_score);
            println!("Interested:     {}", metrics.interested);
            println!("Not interested: {}", metrics.not_interested);
        }
        Commands::Performance { limit } => {
            let calls = load_calls(&pool).await?;
            let stats = analytics::owner_stats(&calls);
            if stats.is_empty() {
                println!("No calls recorded.");
            } else {
                println!("Counselors by call volume:");
                for entry in stats.iter().take(limit) {
                    println!(
                        "- {}: {} calls, avg score {}, max score {}",
                        entry.owner, entry.total_calls, entry.avg_score, entry.max_score
                    );
                }
            }
        }
        Commands::Options => {
            let calls = load_calls(&pool).await?;
            let leads = load_leads(&pool).await?;
            println!("Call filters:");
            for (field, values) in analytics::call_options(&calls) {
                println!("  {field}: {}", values.join(", "));
            }
            println!("Lead filters:");
            for (field, values) in analytics::lead_options(&leads) {
                println!("  {field}: {}", values.join(", "));
            }
            println!("  tag: Hot, Warm");
        }
        Commands::Report { out } => {
            let calls = load_calls(&pool).await?;
            let leads = load_leads(&pool).await?;
            let report = report::build_report(&calls, &leads, None);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch { interval_secs } => {
            watch::run(&pool, interval_secs).await?;
        }
        Commands::Access { action } => {
            run_access(&pool, action).await?;
        }
        Commands::Provision {
            email,
            password,
            unmasked,
            admin_email,
            admin_password,
        } => {
            let store = PgSettingsStore::new(pool.clone());
            let auth = PgAuthProvider::new(pool.clone());
            let admin = AdminCredentials {
                email: admin_email,
                password: admin_password,
            };
            let request = ProvisionRequest {
                email,
                password,
                masked: !unmasked,
            };
            match provision::provision_user(&store, &auth, &admin, &request).await {
                Ok(()) => println!("User created and added to the access list."),
                Err(e) => {
                    print_provision_error(&e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn load_calls(pool: &PgPool) -> anyhow::Result<Vec<CallRecord>> {
    let docs = db::fetch_collection(pool, CALLS_COLLECTION).await?;
    Ok(docs.iter().map(CallRecord::from_doc).collect())
}

async fn load_leads(pool: &PgPool) -> anyhow::Result<Vec<LeadRecord>> {
    let docs = db::fetch_hot_warm_leads(pool).await?;
    Ok(docs.iter().map(LeadRecord::from_doc).collect())
}

async fn resolve_view(pool: &PgPool, as_user: Option<&str>) -> anyhow::Result<MaskedView> {
    let Some(email) = as_user else {
        return Ok(MaskedView::new(false));
    };
    let list = PgSettingsStore::new(pool.clone()).load().await?;
    Ok(MaskedView::new(list.should_mask(email)))
}

fn print_calls(calls: &[CallRecord], filter: &CallFilter, paging: &PageArgs, view: MaskedView) {
    let kept = filters::filter_calls(calls, filter);
    let total = analytics::total_pages(kept.len(), paging.page_size);
    let page = analytics::clamp_page(paging.page, total);
    let slice = analytics::page_slice(&kept, paging.page_size, page);

    println!("Showing {} of {} calls (page {page} of {total})", slice.len(), kept.len());
    for call in slice {
        let date = call
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string());
        let summary = view.text(&call.summary);
        let score = if call.confidence.is_empty() {
            format!("score {}", call.score)
        } else {
            format!("score {} ({})", call.score, call.confidence)
        };
        println!(
            "- [{date}] {} | {} | {} | {} | {score} | {}s | {}",
            call.name,
            or_dash(&call.owner),
            or_dash(&call.city),
            or_dash(&call.disposition),
            call.duration_seconds,
            if summary.is_empty() {
                EMPTY_PLACEHOLDER.to_string()
            } else {
                summary
            }
        );
        if !call.recording_url.is_empty() {
            println!("    recording: {}", call.recording_url);
        }
    }
}

fn print_leads(leads: &[LeadRecord], filter: &LeadFilter, paging: &PageArgs, view: MaskedView) {
    let kept = filters::filter_leads(leads, filter);
    let total = analytics::total_pages(kept.len(), paging.page_size);
    let page = analytics::clamp_page(paging.page, total);
    let slice = analytics::page_slice(&kept, paging.page_size, page);

    println!("Showing {} of {} leads (page {page} of {total})", slice.len(), kept.len());
    for lead in slice {
        let date = lead
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string());
        println!(
            "- [{date}] {} ({}) | {} | {} | {} | {} | {} activities",
            or_dash(&lead.name),
            lead.display_id(),
            or_dash(&lead.tag),
            view.email(&lead.email),
            view.phone(&lead.mobile),
            or_dash(&lead.lead_stage),
            lead.activities.len()
        );
        for activity in &lead.activities {
            println!("    · {}", view.text(activity));
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        EMPTY_PLACEHOLDER
    } else {
        value
    }
}

async fn run_access(pool: &PgPool, action: AccessAction) -> anyhow::Result<()> {
    let store = PgSettingsStore::new(pool.clone());
    match action {
        AccessAction::List => {
            let list = store.load().await?;
            if list.entries.is_empty() {
                println!("Access list is empty; every user sees full data.");
            } else {
                for entry in &list.entries {
                    let mode = if entry.masked { "masked" } else { "full" };
                    println!("- {} ({mode})", entry.email);
                }
            }
        }
        AccessAction::Add { email, unmasked } => {
            let mut list = store.load().await?;
            list.add(&email, !unmasked)?;
            store.save(&list).await?;
            println!("Added {} to the access list.", email.trim().to_lowercase());
        }
        AccessAction::Remove { email } => {
            let mut list = store.load().await?;
            list.remove(&email)?;
            store.save(&list).await?;
            println!("Removed {} from the access list.", email.trim().to_lowercase());
        }
        AccessAction::SetMask { email, masked } => {
            let mut list = store.load().await?;
            list.set_masked(&email, masked)?;
            store.save(&list).await?;
            println!(
                "{} now sees {} data.",
                email.trim().to_lowercase(),
                if masked { "masked" } else { "full" }
            );
        }
        AccessAction::ResetPassword { email } => {
            let auth = PgAuthProvider::new(pool.clone());
            let temporary = auth.reset_password(&email).await?;
            println!("Temporary password for {}: {temporary}", email.trim().to_lowercase());
            println!("Share it manually; it must be changed after sign-in.");
        }
    }
    Ok(())
}

fn print_provision_error(error: &ProvisionError) {
    match error {
        ProvisionError::CreateAccount(AuthError::EmailAlreadyInUse) => {
            eprintln!(
                "This email is already registered. Use `access add` to put the existing \
                 user on the list; they keep their current password."
            );
        }
        ProvisionError::ReauthenticateAdmin(AuthError::InvalidCredentials) => {
            eprintln!("Your admin password was incorrect. Try again with the correct password.");
        }
        other => eprintln!("{other}"),
    }
}
