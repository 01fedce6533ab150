//! Discount index commands: the list the merchant picks a discount from,
//! plus activation toggles.

use anyhow::{bail, Context as _};
use clap::Subcommand;
use skudisc_admin::AdminClient;
use skudisc_core::listing::{self, DiscountSummary, SortOrder, StatusTab};

/// Sub-commands available under `discounts`.
#[derive(Debug, Subcommand)]
pub enum DiscountCommands {
    /// List app discounts
    List {
        /// Status tab: all, active or scheduled
        #[arg(long, default_value = "all", value_parser = parse_tab)]
        tab: StatusTab,
        /// Case-insensitive title filter
        #[arg(long)]
        search: Option<String>,
        /// Sort order, e.g. "createdAt desc" or "title asc"
        #[arg(long, default_value = "createdAt desc")]
        sort: SortOrder,
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
        /// Include discounts backed by other functions
        #[arg(long)]
        all_apps: bool,
    },
    /// Activate a discount
    Activate {
        /// Discount node GID
        #[arg(long)]
        discount: String,
    },
    /// Deactivate a discount
    Deactivate {
        #[arg(long)]
        discount: String,
    },
}

pub(crate) fn parse_tab(raw: &str) -> Result<StatusTab, String> {
    match raw.to_ascii_lowercase().as_str() {
        "all" => Ok(StatusTab::All),
        "active" => Ok(StatusTab::Active),
        "scheduled" => Ok(StatusTab::Scheduled),
        _ => Err(format!("unknown tab '{raw}' (expected all, active or scheduled)")),
    }
}

fn fmt_date(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value.map_or_else(
        || "\u{2014}".to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}

fn print_table(discounts: &[DiscountSummary]) {
    println!(
        "{:<48}{:<32}{:<11}{:<12}{:<12}{:>7}  CODE",
        "ID", "TITLE", "STATUS", "STARTS", "ENDS", "USES"
    );
    for d in discounts {
        println!(
            "{:<48}{:<32}{:<11}{:<12}{:<12}{:>7}  {}",
            d.discount_id,
            d.title,
            d.status,
            fmt_date(d.starts_at),
            fmt_date(d.ends_at),
            d.async_usage_count,
            d.code.as_deref().unwrap_or("\u{2014}")
        );
    }
}

async fn set_active(client: &AdminClient, discount_id: &str, active: bool) -> anyhow::Result<()> {
    let discounts = client.list_discounts().await.context("listing discounts")?;
    let Some(target) = discounts.iter().find(|d| d.discount_id == discount_id) else {
        bail!("no app discount with id {discount_id}");
    };
    client
        .set_discount_active(discount_id, target.kind, active)
        .await
        .with_context(|| format!("updating {discount_id}"))?;
    println!(
        "{} {}",
        if active { "activated" } else { "deactivated" },
        target.title
    );
    Ok(())
}

pub(crate) async fn run(command: DiscountCommands) -> anyhow::Result<()> {
    let config = skudisc_core::load_app_config().context("loading configuration")?;
    let client = AdminClient::new(&config).context("building Admin API client")?;

    match command {
        DiscountCommands::List {
            tab,
            search,
            sort,
            csv,
            all_apps,
        } => {
            let mut discounts = client.list_discounts().await.context("listing discounts")?;
            if let (Some(function_id), false) = (config.discount_function_id.as_deref(), all_apps) {
                discounts = listing::for_function(discounts, function_id);
            }

            let counts = listing::tab_counts(&discounts);
            let shown = listing::view(&discounts, tab, search.as_deref(), sort);
            if csv {
                print!("{}", listing::to_csv(&shown).context("rendering CSV")?);
                return Ok(());
            }

            println!(
                "all {}  active {}  scheduled {}",
                counts.all, counts.active, counts.scheduled
            );
            if shown.is_empty() {
                println!("no discounts match");
            } else {
                print_table(&shown);
            }
            Ok(())
        }
        DiscountCommands::Activate { discount } => set_active(&client, &discount, true).await,
        DiscountCommands::Deactivate { discount } => set_active(&client, &discount, false).await,
    }
}
