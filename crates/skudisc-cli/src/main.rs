mod discounts;
mod editor;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use skudisc_core::DiscountType;
use tracing_subscriber::EnvFilter;

use crate::discounts::DiscountCommands;

#[derive(Debug, Parser)]
#[command(name = "skudisc")]
#[command(about = "Per-SKU discount configuration for Shopify app discounts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Identifies the discount whose configuration metafield is edited.
#[derive(Debug, Args)]
struct Target {
    /// Discount node GID, e.g. gid://shopify/DiscountAutomaticNode/123
    #[arg(long)]
    discount: String,
    /// Discount code label for a configuration that has none yet
    #[arg(long)]
    code: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check pasted `SKU, value` lines without contacting the store
    Validate {
        /// Read lines from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "type", default_value = "percentage", value_parser = parse_discount_type)]
        discount_type: DiscountType,
    },
    /// Bulk-import `SKU, value` lines into a discount and save it
    Import {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "type", default_value = "percentage", value_parser = parse_discount_type)]
        discount_type: DiscountType,
        /// Report what would be added without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Add products or variants by GID at value 0
    Pick {
        #[command(flatten)]
        target: Target,
        /// Whole product GID (repeatable)
        #[arg(long = "product")]
        products: Vec<String>,
        /// Variant GID (repeatable)
        #[arg(long = "variant")]
        variants: Vec<String>,
        #[arg(long = "type", default_value = "percentage", value_parser = parse_discount_type)]
        discount_type: DiscountType,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the saved configuration
    Show {
        #[command(flatten)]
        target: Target,
        /// Re-resolve product details for records loaded from older formats
        #[arg(long)]
        refresh: bool,
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Change one record's value and/or type and save
    Set {
        #[command(flatten)]
        target: Target,
        /// Record identifier (variant GID, SKU or title)
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long = "type", value_parser = parse_discount_type)]
        discount_type: Option<DiscountType>,
    },
    /// Remove records and save
    Remove {
        #[command(flatten)]
        target: Target,
        /// Record identifier (repeatable)
        #[arg(long = "identifier", required_unless_present = "all")]
        identifiers: Vec<String>,
        /// Remove every record
        #[arg(long, conflicts_with = "identifiers")]
        all: bool,
    },
    /// Compute a discounted price offline
    Price {
        #[arg(long)]
        price: String,
        #[arg(long = "type", default_value = "percentage", value_parser = parse_discount_type)]
        discount_type: DiscountType,
        #[arg(long)]
        value: f64,
    },
    /// Create the discount metafield definition if it is missing
    Setup,
    /// List and (de)activate the app's discounts
    Discounts {
        #[command(subcommand)]
        command: DiscountCommands,
    },
}

fn parse_discount_type(raw: &str) -> Result<DiscountType, String> {
    DiscountType::parse(raw)
        .ok_or_else(|| format!("unknown discount type '{raw}' (expected percentage or fixedAmount)"))
}

fn init_tracing() -> anyhow::Result<()> {
    let fallback = std::env::var("SKUDISC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate {
            file,
            discount_type,
        } => editor::run_validate(file.as_deref(), discount_type),
        Commands::Price {
            price,
            discount_type,
            value,
        } => editor::run_price(&price, discount_type, value),
        Commands::Import {
            target,
            file,
            discount_type,
            dry_run,
        } => {
            let ctx = editor::Context::connect(&target)?;
            editor::run_import(&ctx, file.as_deref(), discount_type, dry_run).await
        }
        Commands::Pick {
            target,
            products,
            variants,
            discount_type,
            dry_run,
        } => {
            let ctx = editor::Context::connect(&target)?;
            editor::run_pick(&ctx, &products, &variants, discount_type, dry_run).await
        }
        Commands::Show {
            target,
            refresh,
            json,
        } => {
            let ctx = editor::Context::connect(&target)?;
            editor::run_show(&ctx, refresh, json).await
        }
        Commands::Set {
            target,
            identifier,
            value,
            discount_type,
        } => {
            let ctx = editor::Context::connect(&target)?;
            editor::run_set(&ctx, &identifier, value, discount_type).await
        }
        Commands::Remove {
            target,
            identifiers,
            all,
        } => {
            let ctx = editor::Context::connect(&target)?;
            editor::run_remove(&ctx, &identifiers, all).await
        }
        Commands::Setup => editor::run_setup().await,
        Commands::Discounts { command } => discounts::run(command).await,
    }
}
