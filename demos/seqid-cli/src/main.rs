//! `seqid` - operator CLI for the ID counter table.
//!
//! Connects with `DATABASE_*` environment variables (see `PostgresConfig::from_env`)
//! and logs according to `RUST_LOG`.
//!
//! ```text
//! seqid migrate
//! seqid allocate user          # US00001
//! seqid allocate GT -n 3       # GT00001 GT00002 GT00003
//! seqid show EV
//! seqid show --json
//! seqid kinds
//! ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use seqid_core::{EntityKind, IdAllocator};
use seqid_postgres::{PostgresConfig, PostgresCounterStore};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct KindRow {
    kind: EntityKind,
    code: &'static str,
}

#[derive(Serialize)]
struct ShowRow {
    code: String,
    seq: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::Kinds = cli.command {
        return print_kinds(cli.json);
    }

    let config = PostgresConfig::from_env();
    tracing::debug!(
        max_connections = config.max_connections,
        "Connecting to counter database"
    );
    let store = PostgresCounterStore::connect(&config)
        .await
        .context("Failed to connect to the counter database")?;

    match cli.command {
        Command::Migrate => {
            store.migrate().await?;
            println!("id_counters table is up to date");
        }
        Command::Allocate { target, count } => {
            let allocator = IdAllocator::new(Arc::new(store)).with_min_width(cli.min_width);
            let code = resolve_code(&target);
            let ids = if count == 1 {
                vec![allocator.allocate(&code).await?]
            } else {
                allocator.allocate_batch(&code, count).await?
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in ids {
                    println!("{id}");
                }
            }
        }
        Command::Show { target } => {
            let allocator = IdAllocator::new(Arc::new(store));
            let rows = match target {
                Some(target) => {
                    let code = resolve_code(&target);
                    let seq = allocator.peek(&code).await?;
                    vec![ShowRow { code, seq }]
                }
                None => allocator
                    .counters()
                    .await?
                    .into_iter()
                    .map(|r| ShowRow {
                        code: r.code.into_inner(),
                        seq: r.seq,
                    })
                    .collect(),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    println!("{:<6} {}", row.code, row.seq);
                }
            }
        }
        Command::Kinds => {}
    }

    Ok(())
}

/// Map a kind name to its code; anything else is passed through as a raw code.
fn resolve_code(target: &str) -> String {
    target
        .parse::<EntityKind>()
        .map_or_else(|_| target.to_string(), |kind| kind.code().to_string())
}

fn print_kinds(json: bool) -> Result<()> {
    let rows: Vec<_> = EntityKind::ALL
        .iter()
        .map(|&kind| KindRow {
            kind,
            code: kind.code(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in rows {
            println!("{:<6} {}", row.code, row.kind.name());
        }
    }
    Ok(())
}
