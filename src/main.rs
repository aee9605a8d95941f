use anyhow::Context;
use api_client::{ApiError, PriceListClient, ProductApi};
use clap::{Parser, Subcommand};
use configuration::AppEnvironment;
use core_types::{BulkUpdateItem, NewProduct, ProductPatch, ProductQuery};
use rust_decimal::Decimal;
use std::path::PathBuf;

mod session;
mod table;

/// The main entry point for the price list application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut settings = configuration::load_settings().context("Failed to load settings")?;
    if let Some(url) = cli.api_url {
        settings.client.api_base_url = url;
    }
    if let Commands::Serve(args) = &cli.command {
        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if let Some(environment) = args.env {
            settings.server.environment = environment;
        }
    }
    let _log_guard = configuration::init_tracing(settings.server.environment, &settings.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve(_) => web_server::run_server(settings).await,
        command => {
            tracing::debug!(api = %settings.client.api_base_url, "Running client command");
            let client = PriceListClient::new(&settings.client)?;
            run_client_command(command, client).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Manage the products of a price list.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the API including `/api` (overrides API_BASE_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve(ServeArgs),
    /// List products, newest first.
    List(ListArgs),
    /// Show a single product.
    Show {
        id: i32,
    },
    /// Create a product.
    Create(CreateArgs),
    /// Change some fields of a product.
    Update(UpdateArgs),
    /// Delete a product.
    Delete {
        id: i32,
    },
    /// Apply a JSON file of updates: `{"updates": [{"id": 1, "price": "10"}]}` or a bare array.
    BulkUpdate {
        file: PathBuf,
    },
    /// Edit the price list interactively.
    Edit,
}

#[derive(Parser)]
struct ServeArgs {
    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Deployment environment (overrides APP_ENV / NODE_ENV).
    #[arg(long, value_enum)]
    env: Option<AppEnvironment>,
}

#[derive(Parser)]
struct ListArgs {
    /// Only products whose article number contains this text.
    #[arg(long)]
    article: Option<String>,

    /// Only products whose name contains this text.
    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u32>,
}

#[derive(Parser)]
struct CreateArgs {
    article_no: String,
    product_service: String,

    #[arg(long)]
    in_price: Option<Decimal>,

    #[arg(long)]
    price: Option<Decimal>,

    /// Defaults to "pieces".
    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    in_stock: Option<i32>,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Parser)]
struct UpdateArgs {
    id: i32,

    #[arg(long)]
    article_no: Option<String>,

    #[arg(long)]
    product_service: Option<String>,

    #[arg(long)]
    in_price: Option<Decimal>,

    #[arg(long)]
    price: Option<Decimal>,

    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    in_stock: Option<i32>,

    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,

    /// Remove the description.
    #[arg(long)]
    clear_description: bool,
}

impl From<CreateArgs> for NewProduct {
    fn from(args: CreateArgs) -> Self {
        NewProduct {
            article_no: Some(args.article_no),
            product_service: Some(args.product_service),
            in_price: args.in_price,
            price: args.price,
            unit: args.unit,
            in_stock: args.in_stock,
            description: args.description,
        }
    }
}

impl UpdateArgs {
    fn patch(&self) -> ProductPatch {
        let mut patch = ProductPatch::new();
        if let Some(v) = &self.article_no {
            patch = patch.article_no(v);
        }
        if let Some(v) = &self.product_service {
            patch = patch.product_service(v);
        }
        if let Some(v) = self.in_price {
            patch = patch.in_price(v);
        }
        if let Some(v) = self.price {
            patch = patch.price(v);
        }
        if let Some(v) = &self.unit {
            patch = patch.unit(v);
        }
        if let Some(v) = self.in_stock {
            patch = patch.in_stock(v);
        }
        if let Some(v) = &self.description {
            patch = patch.description(Some(v.clone()));
        }
        if self.clear_description {
            patch = patch.description(None);
        }
        patch
    }
}

// ==============================================================================
// Client Command Logic
// ==============================================================================

async fn run_client_command(command: Commands, client: PriceListClient) -> anyhow::Result<()> {
    match command {
        Commands::List(args) => {
            let query = ProductQuery {
                search_article: args.article,
                search_product: args.product,
                limit: args.limit,
                offset: args.offset,
            };
            let page = client.list_products(&query).await.map_err(explain)?;
            println!("{}", table::products(&page.products, None));
            println!(
                "Showing {} of {} products (offset {}).",
                page.products.len(),
                page.total,
                page.offset
            );
        }
        Commands::Show { id } => {
            let product = client.get_product(id).await.map_err(explain)?;
            println!("{}", table::details(&product));
        }
        Commands::Create(args) => {
            let product = client
                .create_product(&NewProduct::from(args))
                .await
                .map_err(explain)?;
            println!("Product created successfully");
            println!("{}", table::products(std::slice::from_ref(&product), None));
        }
        Commands::Update(args) => {
            let patch = args.patch();
            if patch.is_empty() {
                anyhow::bail!("Nothing to update: pass at least one field option.");
            }
            let product = client
                .update_product(args.id, &patch)
                .await
                .map_err(explain)?;
            println!("Product updated successfully");
            println!("{}", table::products(std::slice::from_ref(&product), None));
        }
        Commands::Delete { id } => {
            client.delete_product(id).await.map_err(explain)?;
            println!("Product deleted successfully");
        }
        Commands::BulkUpdate { file } => {
            let items = read_bulk_file(&file)?;
            let results = client.bulk_update(&items).await.map_err(explain)?;
            let failed = results.iter().filter(|r| !r.success).count();
            println!("{}", table::bulk_results(&results));
            println!(
                "Bulk update completed: {} updated, {} failed.",
                results.len() - failed,
                failed
            );
        }
        Commands::Edit => session::run(client).await?,
        Commands::Serve(_) => anyhow::bail!("`serve` does not run against the API client"),
    }
    Ok(())
}

/// Reads either `{"updates": [...]}` or a bare array of updates.
fn read_bulk_file(path: &PathBuf) -> anyhow::Result<Vec<BulkUpdateItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if let Some(updates) = value.get_mut("updates") {
        value = updates.take();
    }
    let items = serde_json::from_value(value)
        .with_context(|| format!("{} does not hold an array of updates", path.display()))?;
    Ok(items)
}

/// Adds the server's field-level validation messages to the error.
fn explain(err: ApiError) -> anyhow::Error {
    let details: Vec<String> = err
        .details()
        .iter()
        .map(|d| format!("  {}: {}", d.field, d.message))
        .collect();
    if details.is_empty() {
        anyhow::Error::new(err)
    } else {
        anyhow::anyhow!("{err}\n{}", details.join("\n"))
    }
}
