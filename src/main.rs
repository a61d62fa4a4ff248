mod analysis;
mod config;
mod db;
mod extractor;
mod identity;
mod model;
mod publisher;
mod render;
mod sync;
#[cfg(test)]
mod testing;
mod transport;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::analysis::Analyzer;
use crate::config::Settings;
use crate::db::{PublishAction, PublishedRow};
use crate::extractor::{Extractor, PageContext};
use crate::identity::{IdentitySource, IdentityStore};
use crate::render::{render_document, RenderOptions};
use crate::sync::Syncer;
use crate::transport::ReqwestTransport;

#[derive(Parser)]
#[command(name = "leetsync", about = "Publish accepted LeetCode solutions to a GitHub repository")]
struct Cli {
    /// Settings file (default: ./leetsync.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageArgs {
    /// Problem or submission page URL
    url: String,
    /// Saved HTML of the page, searched for editor contents
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Local file holding the solution, tried before the snapshot
    #[arg(long)]
    code_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, analyze, render and publish one problem
    Sync {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Print the extracted problem record as JSON
    Extract {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Render the README locally without publishing
    Render {
        #[command(flatten)]
        page: PageArgs,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Sign in to GitHub (prints the authorize URL when no code is given)
    Login {
        /// Authorization code from the OAuth redirect
        #[arg(long)]
        code: Option<String>,
    },
    /// Forget the stored GitHub credential
    Logout,
    /// Show the authenticated GitHub account
    Whoami,
    /// Recently published solutions
    History {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show publishing statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Sync { page } => {
            let conn = open_ledger(&settings)?;
            let transport = ReqwestTransport::new(&settings.client_id)?;
            let identity = IdentityStore::new(&transport, &settings, &conn);
            let page = page_context(&page)?;

            let spinner = spinner(&format!("Syncing {}", page.url));
            let outcome = Syncer::new(&transport, &settings, &identity).sync(&page).await;
            spinner.finish_and_clear();
            let report = outcome?;

            let row = PublishedRow {
                path: report.path.clone(),
                owner: report.owner.clone(),
                repo: report.repo.clone(),
                sha: report.sha.clone(),
                question_id: report.question_id.clone(),
                title: report.title.clone(),
                action: if report.created {
                    PublishAction::Created
                } else {
                    PublishAction::Updated
                },
            };
            if let Err(e) = db::record_publish(&conn, &row) {
                warn!("Failed to record sync in ledger: {:#}", e);
            }

            println!(
                "{} {}/{}/{}",
                if report.created { "Created" } else { "Updated" },
                report.owner,
                report.repo,
                report.path
            );
            if let Some(code_path) = &report.code_path {
                println!("Code:    {}/{}/{}", report.owner, report.repo, code_path);
            }
            Ok(())
        }
        Commands::Extract { page } => {
            let transport = ReqwestTransport::new(&settings.client_id)?;
            let record = Extractor::new(&transport, &settings)
                .extract(&page_context(&page)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Render { page, out } => {
            let transport = ReqwestTransport::new(&settings.client_id)?;
            let record = Extractor::new(&transport, &settings)
                .extract(&page_context(&page)?)
                .await?;
            let analysis = Analyzer::new(
                &transport,
                &settings.endpoints.analyzer_url,
                Duration::from_secs(settings.analysis_timeout_secs),
            )
            .annotate(&record, settings.ai_features)
            .await;
            let document = render_document(
                &record,
                analysis.as_ref(),
                &RenderOptions::from_settings(&settings),
                Utc::now(),
            );
            match out {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", document),
            }
            Ok(())
        }
        Commands::Login { code } => {
            let conn = open_ledger(&settings)?;
            let transport = ReqwestTransport::new(&settings.client_id)?;
            let store = IdentityStore::new(&transport, &settings, &conn);
            match code {
                None => {
                    let state = format!("{:x}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
                    println!("Open this URL and approve access:\n\n  {}\n", store.authorize_url(&state)?);
                    println!("Then run: leetsync login --code <code from the redirect>");
                }
                Some(code) => {
                    let identity = store.authenticate(&code).await?;
                    println!("Logged in as {}", identity.profile.login);
                }
            }
            Ok(())
        }
        Commands::Logout => {
            let conn = open_ledger(&settings)?;
            let transport = ReqwestTransport::new(&settings.client_id)?;
            if IdentityStore::new(&transport, &settings, &conn).logout()? {
                println!("Logged out.");
            } else {
                println!("No stored credential.");
            }
            Ok(())
        }
        Commands::Whoami => {
            let conn = open_ledger(&settings)?;
            let transport = ReqwestTransport::new(&settings.client_id)?;
            match IdentityStore::new(&transport, &settings, &conn)
                .current_identity()
                .await
            {
                Some(identity) => {
                    let p = &identity.profile;
                    println!("Login: {}", p.login);
                    if let Some(name) = &p.name {
                        println!("Name:  {}", name);
                    }
                    if let Some(url) = &p.html_url {
                        println!("URL:   {}", url);
                    }
                }
                None => println!("Not authenticated. Run 'login' first."),
            }
            Ok(())
        }
        Commands::History { limit } => {
            let conn = open_ledger(&settings)?;
            let rows = db::fetch_history(&conn, limit)?;
            if rows.is_empty() {
                println!("Nothing synced yet.");
                return Ok(());
            }

            println!(
                "{:>5} | {:<32} | {:<24} | {:<7} | {:<19}",
                "#", "Problem", "Repository", "Action", "Synced (UTC)"
            );
            println!("{}", "-".repeat(99));
            for r in &rows {
                println!(
                    "{:>5} | {:<32} | {:<24} | {:<7} | {:<19}",
                    r.question_id,
                    truncate(&r.title, 32),
                    truncate(&r.repo, 24),
                    r.action,
                    r.synced_at
                );
            }
            println!("\n{} entries | latest: {}", rows.len(), rows[0].path);
            Ok(())
        }
        Commands::Stats => {
            let conn = open_ledger(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Syncs:     {}", s.syncs);
            println!("Problems:  {}", s.problems);
            println!("Created:   {}", s.created);
            println!("Updated:   {}", s.updated);
            println!("Last sync: {}", s.last_sync.as_deref().unwrap_or("-"));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_ledger(settings: &Settings) -> anyhow::Result<rusqlite::Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn page_context(args: &PageArgs) -> anyhow::Result<PageContext> {
    let mut page = PageContext::new(args.url.as_str());
    if let Some(path) = &args.code_file {
        page = page.with_code_file(path.clone());
    }
    if let Some(path) = &args.snapshot {
        page = page.with_snapshot(&read_snapshot(path)?);
    }
    Ok(page)
}

fn read_snapshot(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read snapshot {}", path.display()))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
