//! Configuration editing commands: each one loads the discount's metafield
//! into an editor session, applies one action, and saves when it changed
//! something.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context as _};
use skudisc_admin::{AdminClient, DiscountMetafield};
use skudisc_core::{import, pricing, serialize};
use skudisc_core::{AppConfig, DiscountType, EditorSession, ReconcileError, ResolvedProduct};

use crate::Target;

pub(crate) struct Context {
    pub config: AppConfig,
    pub client: AdminClient,
    pub discount_id: String,
    pub code: String,
}

impl Context {
    pub fn connect(target: &Target) -> anyhow::Result<Self> {
        let config = skudisc_core::load_app_config().context("loading configuration")?;
        let client = AdminClient::new(&config).context("building Admin API client")?;
        tracing::debug!(endpoint = %client.endpoint(), discount_id = %target.discount, "connected");
        Ok(Self {
            client,
            discount_id: target.discount.clone(),
            code: target.code.clone().unwrap_or_else(|| target.discount.clone()),
            config,
        })
    }

    fn store(&self) -> DiscountMetafield<'_> {
        DiscountMetafield::new(
            &self.client,
            self.discount_id.as_str(),
            self.config.metafield_namespace.as_str(),
            self.config.metafield_key.as_str(),
        )
    }

    /// Fails when the metafield cannot be read; nothing may be saved then.
    async fn load(&self) -> anyhow::Result<EditorSession> {
        let (session, err) = EditorSession::load(&self.store(), &self.code)
            .await
            .with_context(|| format!("loading configuration for {}", self.discount_id))?;
        if let Some(err) = err {
            eprintln!("warning: {err}; starting from an empty configuration");
        }
        Ok(session)
    }

    async fn save(&self, session: &mut EditorSession) -> anyhow::Result<()> {
        session
            .save(&self.store())
            .await
            .with_context(|| format!("saving configuration for {}", self.discount_id))?;
        println!(
            "saved {} record(s) to {}",
            session.configuration().len(),
            self.discount_id
        );
        Ok(())
    }
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading stdin")?;
            Ok(raw)
        }
    }
}

fn report_rejection(err: &ReconcileError) {
    if let ReconcileError::Validation(errors) = err {
        for line in errors {
            eprintln!("{line}");
        }
    }
}

pub(crate) fn run_validate(file: Option<&Path>, discount_type: DiscountType) -> anyhow::Result<()> {
    let raw = read_input(file)?;
    match import::parse_batch(&raw, discount_type) {
        Ok(batch) => {
            println!(
                "{} SKU(s) ready to import as {discount_type}",
                batch.entries.len()
            );
            Ok(())
        }
        Err(err) => {
            report_rejection(&err);
            Err(err.into())
        }
    }
}

pub(crate) fn run_price(price: &str, discount_type: DiscountType, value: f64) -> anyhow::Result<()> {
    let Some(original) = pricing::parse_price(price) else {
        bail!("'{price}' is not a valid price");
    };
    if !discount_type.is_in_range(value) {
        bail!(
            "discount value {value} is outside 0-{} for {discount_type}",
            discount_type.max_value()
        );
    }
    let (Some(final_price), Some(savings)) = (
        pricing::final_price(Some(price), discount_type, value),
        pricing::savings(Some(price), discount_type, value),
    ) else {
        bail!("discount value {value} is not a finite number");
    };
    println!(
        "original {}  final {}  savings {}",
        pricing::format_money(original),
        pricing::format_money(final_price),
        pricing::format_money(savings)
    );
    Ok(())
}

pub(crate) async fn run_import(
    ctx: &Context,
    file: Option<&Path>,
    discount_type: DiscountType,
    dry_run: bool,
) -> anyhow::Result<()> {
    let raw = read_input(file)?;
    let mut session = ctx.load().await?;
    session.global_discount_type = discount_type;

    let result = match session
        .bulk_import(&raw, &ctx.client, ctx.config.lookup_options())
        .await
    {
        Ok(result) => result,
        Err(err) => {
            report_rejection(&err);
            return Err(err.into());
        }
    };

    println!("added {} record(s)", result.added_count);
    for warning in result.warnings() {
        println!("warning: {warning}");
    }

    if dry_run {
        println!("dry run; nothing saved");
        return Ok(());
    }
    if result.changed() {
        ctx.save(&mut session).await?;
    }
    Ok(())
}

pub(crate) async fn run_pick(
    ctx: &Context,
    products: &[String],
    variants: &[String],
    discount_type: DiscountType,
    dry_run: bool,
) -> anyhow::Result<()> {
    if products.is_empty() && variants.is_empty() {
        bail!("nothing to pick; pass --product and/or --variant");
    }

    let mut selection: Vec<ResolvedProduct> = ctx
        .client
        .products_by_id(products)
        .await
        .context("looking up products")?
        .into_iter()
        .map(|mut product| {
            // A whole-product pick is one record, not one per variant.
            product.variants.clear();
            product
        })
        .collect();
    selection.extend(
        ctx.client
            .variants_by_id(variants)
            .await
            .context("looking up variants")?,
    );

    let mut session = ctx.load().await?;
    session.global_discount_type = discount_type;
    let result = session.add_picked(&selection);

    println!("added {} record(s) at value 0", result.added);
    if !result.duplicates.is_empty() {
        println!("already in list: {}", result.duplicates.join(", "));
    }

    if dry_run {
        println!("dry run; nothing saved");
        return Ok(());
    }
    if result.added > 0 {
        ctx.save(&mut session).await?;
    }
    Ok(())
}

pub(crate) async fn run_show(ctx: &Context, refresh: bool, json: bool) -> anyhow::Result<()> {
    let mut session = ctx.load().await?;
    if refresh {
        let refreshed = session
            .refresh_details(&ctx.client, ctx.config.lookup_options())
            .await
            .context("refreshing product details")?;
        eprintln!("refreshed details for {refreshed} record(s)");
    }

    let configuration = session.configuration();
    if json {
        println!("{}", serialize::to_json(configuration)?);
        return Ok(());
    }

    println!("discount code: {}", configuration.discount_code);
    if configuration.is_empty() {
        println!("no products configured");
        return Ok(());
    }
    println!(
        "{:<44}{:<16}{:<32}{:<14}{:>10}{:>12}{:>12}",
        "IDENTIFIER", "SKU", "TITLE", "TYPE", "VALUE", "PRICE", "FINAL"
    );
    for record in configuration.records() {
        let title = if record.title.chars().count() > 30 {
            format!("{}...", record.title.chars().take(27).collect::<String>())
        } else {
            record.title.clone()
        };
        let price = record.price.clone().unwrap_or_else(|| "-".to_string());
        let final_price = record
            .final_price()
            .map_or_else(|| "-".to_string(), pricing::format_money);
        println!(
            "{:<44}{:<16}{:<32}{:<14}{:>10}{:>12}{:>12}",
            record.identifier,
            record.sku,
            title,
            record.discount_type.as_str(),
            record.discount_value,
            price,
            final_price
        );
    }

    let unresolved = configuration.unresolved_skus();
    if !unresolved.is_empty() && !refresh {
        println!(
            "{} record(s) lack product details; rerun with --refresh",
            unresolved.len()
        );
    }
    Ok(())
}

pub(crate) async fn run_set(
    ctx: &Context,
    identifier: &str,
    value: Option<f64>,
    discount_type: Option<DiscountType>,
) -> anyhow::Result<()> {
    if value.is_none() && discount_type.is_none() {
        bail!("nothing to change; pass --value and/or --type");
    }
    let mut session = ctx.load().await?;

    if let Some(discount_type) = discount_type {
        session.set_type(identifier, discount_type)?;
    }
    if let Some(value) = value {
        let stored = session.set_value(identifier, value)?;
        if (stored - value).abs() > f64::EPSILON {
            println!("value {value} clamped to {stored}");
        }
    }

    ctx.save(&mut session).await
}

pub(crate) async fn run_remove(ctx: &Context, identifiers: &[String], all: bool) -> anyhow::Result<()> {
    let mut session = ctx.load().await?;
    if all {
        session.clear();
    } else {
        for identifier in identifiers {
            session.remove(identifier)?;
        }
    }
    ctx.save(&mut session).await
}

pub(crate) async fn run_setup() -> anyhow::Result<()> {
    let config = skudisc_core::load_app_config().context("loading configuration")?;
    let client = AdminClient::new(&config).context("building Admin API client")?;
    let created = client
        .ensure_metafield_definition(&config.metafield_namespace, &config.metafield_key)
        .await
        .context("ensuring metafield definition")?;
    if created {
        println!(
            "created metafield definition {}.{}",
            config.metafield_namespace, config.metafield_key
        );
    } else {
        println!("metafield definition already exists");
    }
    Ok(())
}
