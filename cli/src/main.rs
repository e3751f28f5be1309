mod commands;
mod config;
mod remote;
mod server;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    Catalog, cmd_check, cmd_have, cmd_item_add, cmd_item_remove, cmd_item_toggle, cmd_list,
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list, cmd_recipe_show,
    cmd_recipe_update, cmd_reorder,
};
use crate::config::Config;
use crate::remote::{API_KEY_ENV, RemoteCatalog};
use cookie_core::db::Database;
use cookie_core::models::RecipeId;
use cookie_core::service::ShoppingService;

#[derive(Parser)]
#[command(
    name = "cookie",
    version,
    about = "Pick recipes, get a shopping list",
    long_about = "Pick the recipes you are making this week and cookie builds one \
                  shopping list from them, guessing which staples you already have."
)]
struct Cli {
    /// Read recipes from a remote Cookie API (e.g. http://pantry.local:3000).
    /// Shopping state stays local. The bearer token is read from COOKIE_API_KEY.
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the recipe catalog
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Toggle whether you are making a recipe
    Check {
        /// Recipe ID
        id: RecipeId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the shopping list for every checked recipe
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an ingredient between "need" and "have"
    Have {
        /// Ingredient name as shown on the list (case-insensitive)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage extra items that are not part of any recipe
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Set the display order of recipes
    Reorder {
        /// Recipe IDs, first to last
        #[arg(required = true)]
        ids: Vec<RecipeId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes in display order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with ingredients and directions
    Show {
        /// Recipe ID
        id: RecipeId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a recipe from a JSON file
    Add {
        /// Path to the JSON recipe
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Title override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a recipe from a JSON file; present lists replace the stored ones
    Update {
        /// Recipe ID
        id: RecipeId,
        /// Path to the JSON fields to change
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe ID
        id: RecipeId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add an item to the shopping list
    Add {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an item between "need" and "have"
    Toggle {
        /// Item ID (shown by `cookie list`)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item
    Remove {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(default_filter: &str) {
    let filter = std::env::var("COOKIE_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_filter = if matches!(cli.command, Commands::Serve { .. }) {
        "info,tower_http=info"
    } else {
        "warn"
    };
    init_tracing(default_filter);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?)
            };
            server::start_server(db, port, &bind, api_key).await
        }
        command => {
            let catalog = match &cli.server {
                Some(url) => {
                    Catalog::Remote(RemoteCatalog::new(url, std::env::var(API_KEY_ENV).ok())?)
                }
                None => Catalog::Local(&db),
            };
            run_command(command, &catalog, &db).await
        }
    }
}

async fn run_command(command: Commands, catalog: &Catalog<'_>, db: &Database) -> Result<()> {
    let mut shopping = ShoppingService::load(db);

    match command {
        Commands::Recipe { command } => match command {
            RecipeCommands::List { json } => cmd_recipe_list(catalog, &mut shopping, json).await,
            RecipeCommands::Show { id, json } => cmd_recipe_show(catalog, &shopping, id, json).await,
            RecipeCommands::Add { file, json } => {
                cmd_recipe_add(catalog.local("recipe add")?, &file, json)
            }
            RecipeCommands::Import {
                file,
                name,
                servings,
                json,
            } => cmd_recipe_import(catalog.local("recipe import")?, &file, name, servings, json),
            RecipeCommands::Update { id, file, json } => {
                cmd_recipe_update(catalog.local("recipe update")?, id, &file, json)
            }
            RecipeCommands::Delete { id, json } => {
                cmd_recipe_delete(catalog.local("recipe delete")?, id, json)
            }
        },
        Commands::Check { id, json } => cmd_check(catalog, &mut shopping, id, json).await,
        Commands::List { json } => cmd_list(catalog, &mut shopping, json).await,
        Commands::Have { name, json } => cmd_have(catalog, &mut shopping, &name, json).await,
        Commands::Item { command } => match command {
            ItemCommands::Add { name, json } => cmd_item_add(&mut shopping, &name, json),
            ItemCommands::Toggle { id, json } => cmd_item_toggle(&mut shopping, &id, json),
            ItemCommands::Remove { id, json } => cmd_item_remove(&mut shopping, &id, json),
        },
        Commands::Reorder { ids, json } => cmd_reorder(&mut shopping, ids, json),
        Commands::Serve { .. } => bail!("`serve` cannot run as a catalog command"),
    }
}
