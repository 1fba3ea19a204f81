//! Command-line driver for the item store.
//!
//! # Responsibility
//! - Expose save/list/show/complete/delete/watch over one database file.
//! - Print items as JSON lines so output can be piped.

use clap::{Parser, Subcommand};
use item_store_core::{
    default_log_level, init_logging, Item, ItemId, ItemService, ItemStore, LiveQuery, LogLevel,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "item-store", version, about = "Local SQLite item store")]
struct Cli {
    /// SQLite database file, created on first use.
    #[arg(long, env = "ITEM_STORE_DB", default_value = "items.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "ITEM_STORE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "ITEM_STORE_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save a new item.
    Add {
        #[arg(long)]
        titulo: String,
        #[arg(long)]
        descripcion: String,
        #[arg(long)]
        clasificacion: String,
        /// Due time in epoch milliseconds.
        #[arg(long)]
        due: Option<i64>,
        /// Explicit id; the database assigns one when omitted.
        #[arg(long)]
        id: Option<i64>,
    },
    /// Print every item, or the items of one classification.
    List {
        #[arg(long)]
        clasificacion: Option<String>,
    },
    /// Print one item.
    Show { id: i64 },
    /// Mark an item as complete.
    Complete { id: i64 },
    /// Delete an item.
    Delete { id: i64 },
    /// Print a snapshot every time the items change.
    Watch {
        #[arg(long)]
        clasificacion: Option<String>,
        /// Stop after this many snapshots.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    if let Some(log_dir) = cli.log_dir.as_ref() {
        init_logging(cli.log_level.unwrap_or_else(default_log_level), log_dir)?;
    }

    let service = ItemService::new(ItemStore::open(&cli.db)?);

    match cli.command {
        Command::Add {
            titulo,
            descripcion,
            clasificacion,
            due,
            id,
        } => {
            let id = id.map(ItemId::new).transpose()?.unwrap_or(ItemId::UNASSIGNED);
            let mut item = Item::with_id(id, titulo, descripcion, clasificacion);
            item.hora_cumplimiento = due;
            match service.save_item(&item).await? {
                Some(id) => println!("{id}"),
                None => println!("ignored"),
            }
        }
        Command::List { clasificacion } => {
            let items = match clasificacion {
                Some(clasificacion) => {
                    service
                        .items_by_classification_stream(clasificacion)
                        .first()
                        .await?
                }
                None => service.all_items_stream().first().await?,
            };
            for item in &items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
        Command::Show { id } => match service.item_stream(ItemId::new(id)?).first().await? {
            Some(item) => println!("{}", serde_json::to_string(&item)?),
            None => {
                println!("not found");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Complete { id } => {
            let item = service.complete_item(ItemId::new(id)?).await?;
            println!("{}", serde_json::to_string(&item)?);
        }
        Command::Delete { id } => match service.item_stream(ItemId::new(id)?).first().await? {
            Some(item) => {
                service.delete_item(&item).await?;
                println!("{}", serde_json::to_string(&item)?);
            }
            None => println!("not found"),
        },
        Command::Watch {
            clasificacion,
            count,
        } => {
            let query = match clasificacion {
                Some(clasificacion) => service.items_by_classification_stream(clasificacion),
                None => service.all_items_stream(),
            };
            watch(query, count).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn watch(mut query: LiveQuery<Vec<Item>>, count: Option<u64>) -> CliResult<()> {
    let mut printed: u64 = 0;
    while let Some(snapshot) = query.next().await {
        let items = snapshot?;
        println!("{}", serde_json::to_string(&items)?);
        printed += 1;
        if count.is_some_and(|limit| printed >= limit) {
            break;
        }
    }
    Ok(())
}
