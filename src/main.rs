use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod format;
mod helpers;
mod search;
mod sync;

use crate::sync::SyncArgs;

#[derive(Parser)]
#[clap(version, about = "Plan and apply course edits against a LearnHub store")]
struct Synchronizer {
    /// JSON snapshot of the document store
    #[clap(
        long,
        value_parser,
        value_name = "PATH",
        env = "LEARNHUB_STORE",
        default_value = "learnhub-store.json",
        global = true
    )]
    store: PathBuf,

    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the store writes a pending-changes file would cause
    Plan {
        #[clap(short, long, value_parser)]
        course: String,
        #[clap(long, value_parser, value_name = "PATH")]
        changes: PathBuf,
        #[clap(long)]
        publish: bool,
    },
    /// Apply a pending-changes file to the store
    Apply {
        #[clap(short, long, value_parser)]
        course: String,
        #[clap(long, value_parser, value_name = "PATH")]
        changes: PathBuf,
        #[clap(long)]
        publish: bool,
    },
    /// Validate course tree files and renumber their sections and lessons
    Format {
        #[clap(short, long, value_parser, value_name = "PATH")]
        data_path: PathBuf,
    },
    /// Search published courses
    Search {
        #[clap(value_parser)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "env-file")]
    dotenvy::dotenv().ok();

    let synchronizer = Synchronizer::parse();

    let default_level = if synchronizer.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store_path = synchronizer.store.as_path();

    match synchronizer.command {
        Command::Plan {
            course,
            changes,
            publish,
        } => {
            let plan = sync::plan(SyncArgs {
                store_path,
                course_id: &course,
                changes_path: &changes,
                publish,
            })
            .await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Apply {
            course,
            changes,
            publish,
        } => {
            let plan = sync::apply(SyncArgs {
                store_path,
                course_id: &course,
                changes_path: &changes,
                publish,
            })
            .await?;
            println!("applied {} operation(s)", plan.len());
        }
        Command::Format { data_path } => format::format(data_path)?,
        Command::Search { query } => {
            for course in search::search(store_path, &query.join(" ")).await? {
                println!("{}", search::describe(&course));
            }
        }
    }

    Ok(())
}
