use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use sewing_costing::{
    config,
    db,
    models::{AuditContext, LineKind},
    services::{
        fill_from::FillOutcome, recalculation::Recalculation, CostEngine, ServiceFactory,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;
    let ctx = match cli.user {
        Some(id) => AuditContext::user(id),
        None => AuditContext::system(),
    };

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(context.services.db_pool()).await?;
            println!("Migrations applied");
        }
        Commands::Breakdown { variant_id } => {
            let breakdown =
                CostEngine::compute_for_variant(&**context.services.db_pool(), variant_id)
                    .await
                    .with_context(|| format!("failed to price variant {}", variant_id))?;
            if cli.json {
                print_json(&breakdown)?;
            } else {
                println!("Variant {}", variant_id);
                println!("  materials     {}", breakdown.materials_cost);
                println!("  accessories   {}", breakdown.accessories_cost);
                println!("  fixed costs   {}", breakdown.fixed_costs);
                println!("  base          {}", breakdown.base);
                println!("  markup        {}", breakdown.markup);
                println!("  discount      {}", breakdown.discount);
                println!("  unit price    {}", breakdown.unit_price);
            }
        }
        Commands::RecalcVariant { variant_id } => {
            let result = context
                .services
                .coordinator()
                .on_cost_line_changed(&ctx, variant_id)
                .await
                .with_context(|| format!("failed to recompute variant {}", variant_id))?;
            render_recalculations(&[result], cli.json)?;
        }
        Commands::RecalcProduct { product_id } => {
            let results = context
                .services
                .coordinator()
                .on_product_pricing_changed(&ctx, product_id)
                .await
                .with_context(|| format!("failed to recompute product {}", product_id))?;
            render_recalculations(&results, cli.json)?;
        }
        Commands::CloneVariant { variant_id } => {
            let cloned = context
                .services
                .cloner()
                .clone_variant(&ctx, variant_id)
                .await
                .with_context(|| format!("failed to clone variant {}", variant_id))?;
            if cli.json {
                print_json(&cloned)?;
            } else {
                println!(
                    "Cloned variant {} as {} \"{}\" (unit price {})",
                    variant_id, cloned.id, cloned.name, cloned.unit_price
                );
            }
        }
        Commands::FillFrom {
            target,
            source,
            kind,
            replace,
        } => {
            let report = context
                .services
                .fill_from()
                .fill_from(&ctx, target, source, kind, replace)
                .await
                .with_context(|| format!("failed to fill variant {} from {}", target, source))?;
            if cli.json {
                print_json(&report)?;
            } else {
                match report.outcome() {
                    FillOutcome::Copied => println!("Copied {} {}", report.created, kind),
                    FillOutcome::Partial => println!(
                        "Copied {} {}, skipped {} already present",
                        report.created, kind, report.skipped
                    ),
                    FillOutcome::NothingToCopy => {
                        println!("Variant {} has no {} to copy", source, kind)
                    }
                }
            }
        }
        Commands::RecomputeOrder { order_id } => {
            let totals = context
                .services
                .aggregator()
                .recompute_order(order_id)
                .await
                .with_context(|| format!("failed to recompute order {}", order_id))?;
            if cli.json {
                print_json(&totals)?;
            } else {
                println!(
                    "Order {}: {} pcs, {} ({})",
                    order_id,
                    totals.total_qty,
                    totals.total_amount,
                    if totals.written { "updated" } else { "unchanged" }
                );
            }
        }
        Commands::Audit => {
            let report = context
                .services
                .auditor()
                .audit()
                .await
                .context("consistency audit failed")?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Checked {} variants and {} orders",
                    report.variants_checked, report.orders_checked
                );
                for issue in &report.issues {
                    println!("- {}", issue);
                }
            }
            if !report.is_clean() {
                bail!("{} consistency issue(s) found", report.issues.len());
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "sewing-cli", about = "Recompute and audit sewing cost data", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(long, global = true, help = "User id recorded on the rows a command writes")]
    user: Option<i32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Show every term of a variant's price without writing it
    Breakdown { variant_id: i32 },
    /// Recompute one variant's unit price
    RecalcVariant { variant_id: i32 },
    /// Recompute every variant of a product
    RecalcProduct { product_id: i32 },
    /// Deep-copy a variant under a fresh name
    CloneVariant { variant_id: i32 },
    /// Copy accessories or operations from one variant onto another
    FillFrom {
        target: i32,
        source: i32,
        #[arg(long, help = "accessories or operations")]
        kind: LineKind,
        #[arg(long, action = ArgAction::SetTrue, help = "Drop the target's lines first")]
        replace: bool,
    },
    /// Recompute an order's item quantities and totals
    RecomputeOrder { order_id: i32 },
    /// Report cached prices and totals that diverge from their inputs
    Audit,
}

struct CliContext {
    services: ServiceFactory,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }

        let services = ServiceFactory::new(Arc::new(db_pool), config.costing.clone())
            .context("invalid costing configuration")?;

        Ok(Self { services })
    }
}

fn render_recalculations(results: &[Recalculation], json: bool) -> Result<()> {
    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("No variants to recompute");
    }
    for r in results {
        println!(
            "- Variant {} • {} -> {} • {:?}",
            r.variant_id, r.previous, r.current, r.status
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
