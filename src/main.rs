// src/main.rs - Command line entry point

use std::path::{Path, PathBuf};
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;

use storefront_core::admin::{csv_file_name, OrderFilter};
use storefront_core::catalog::{self, CatalogFilter, SortMode};
use storefront_core::config::{AppConfig, ConfigManager};
use storefront_core::error::{Error, Result, ResultExt};
use storefront_core::logging::{self, LogLevel};
use storefront_core::manager::Manager;
use storefront_core::shop::{compute_totals, CartItem, Coupon, OrderStatus};
use storefront_core::utils::Time;
use storefront_core::Storefront;

#[derive(Parser)]
#[command(
    name = "storefront",
    version = storefront_core::VERSION,
    about = "Storefront client core: catalog, cart pricing and admin order tools",
    long_about = None
)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session token for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// List catalog products
    Products {
        #[arg(short, long, default_value = "")]
        q: String,
        #[arg(long, default_value = catalog::filter::ALL_CATEGORIES)]
        category: String,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        min_rating: f64,
        #[arg(long, default_value = "relevance")]
        sort: SortMode,
        #[arg(long)]
        deals: bool,
    },
    /// List orders as an admin
    Orders {
        #[arg(short, long, default_value = "")]
        q: String,
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        /// Write the filtered orders as CSV; a directory gets a dated file name
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },
    /// Price a cart stored as a JSON array of lines
    Totals {
        cart: PathBuf,
        #[arg(long)]
        coupon: Option<String>,
    },
    /// Validate configuration
    ValidateConfig,
}

fn parse_log_level(value: &str) -> std::result::Result<LogLevel, String> {
    value.parse::<LogLevel>().map_err(|e| e.message)
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut manager = ConfigManager::with_config_file(cli.config.as_ref())?;
    if let Some(level) = cli.log_level {
        manager.add_memory_layer("cli", json!({ "logging": { "level": level.as_str() } }), 30);
    }
    manager.load()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ValidateConfig = cli.command {
        return validate_config(&cli);
    }

    let config = load_config(&cli)?;
    let _guard = logging::init(&config.logging)?;
    tracing::info!("Starting storefront v{}", storefront_core::VERSION);

    if let Commands::Totals { cart, coupon } = &cli.command {
        return print_totals(&config, cart, coupon.as_deref()).await;
    }

    let app = Storefront::native(config)?;
    app.initialize().await?;

    let outcome = match cli.command {
        Commands::Login { email, password } => app
            .session()
            .login(&email, &password)
            .await
            .map(|user| println!("Signed in as {} <{}> ({:?})", user.name, user.email, user.role)),
        Commands::Logout => app
            .session()
            .logout()
            .await
            .map(|()| println!("Signed out")),
        Commands::Products {
            q,
            category,
            min_price,
            max_price,
            min_rating,
            sort,
            deals,
        } => {
            let filter = CatalogFilter {
                q,
                category,
                min_price,
                max_price,
                min_rating,
                sort,
                deals_only: deals,
            };
            list_products(&app, &filter);
            Ok(())
        }
        Commands::Orders {
            q,
            status,
            from,
            to,
            page,
            page_size,
            csv,
        } => {
            let filter = OrderFilter { q, status, from, to };
            list_orders(&app, filter, page, page_size, csv.as_deref()).await
        }
        Commands::Totals { .. } | Commands::ValidateConfig => Ok(()),
    };

    for toast in app.notifications().toasts() {
        eprintln!("{}: {}", toast.title.as_deref().unwrap_or("Notice"), toast.message);
    }
    app.shutdown().await?;
    outcome
}

fn list_products(app: &Storefront, filter: &CatalogFilter) {
    let products = catalog::apply(&app.catalog().products(), filter);
    for product in &products {
        let deal = if product.is_deal() {
            format!(" (-{}%)", product.discount_percent())
        } else {
            String::new()
        };
        println!(
            "{:>5}  {:<40} {:<12} {:>10.2}{}  ★{:.1}  stock {}",
            product.id, product.title, product.category, product.price, deal, product.rating, product.stock
        );
    }
    println!("{} product(s)", products.len());
}

async fn list_orders(
    app: &Storefront,
    filter: OrderFilter,
    page: usize,
    page_size: Option<usize>,
    csv: Option<&Path>,
) -> Result<()> {
    if !app.session().is_admin() {
        return Err(Error::authorization(
            "orders",
            "list",
            "Sign in with an admin account first",
        ));
    }

    let mut view = app.admin_orders_view();
    view.set_filter(filter);
    if let Some(size) = page_size {
        view.set_page_size(size);
    }
    view.set_page(page);

    for order in view.page_items() {
        println!(
            "{:<12} {:<20} {:>10.2}  {:<10} {}",
            order.id,
            order.customer_name,
            order.amount,
            order.status,
            order.placed_at.map(|t| t.to_rfc3339()).unwrap_or_default()
        );
    }
    let summary = view.summary();
    let pages = view.pagination();
    println!(
        "Page {}/{}  orders {}  revenue {:.2}  pending {}",
        pages.page(),
        pages.total_pages(),
        summary.count,
        summary.revenue,
        summary.pending
    );

    if let Some(path) = csv {
        let target = if path.is_dir() {
            path.join(csv_file_name(Time::now().date_naive()))
        } else {
            path.to_path_buf()
        };
        tokio::fs::write(&target, view.export_csv())
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("Exported {} order(s) to {}", summary.count, target.display());
    }
    Ok(())
}

async fn print_totals(config: &AppConfig, cart: &Path, coupon: Option<&str>) -> Result<()> {
    let raw = tokio::fs::read_to_string(cart)
        .await
        .with_context(|| format!("Failed to read {}", cart.display()))?;
    let items: Vec<CartItem> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid cart file {}", cart.display()))?;

    let coupon = match coupon {
        Some(code) => Some(Coupon::parse(code).ok_or_else(|| {
            Error::business(
                storefront_core::error::BusinessRule::InvalidCoupon,
                format!("Unknown coupon '{}'", code),
            )
        })?),
        None => None,
    };

    let totals = compute_totals(&items, coupon, &config.pricing);
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

fn validate_config(cli: &Cli) -> Result<()> {
    println!("Validating configuration...");
    match load_config(cli) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("   Environment: {}", config.app.environment);
            println!("   API: {}", config.api.base_url);
            println!("   Version: {}", storefront_core::VERSION);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration is invalid: {}", e);
            if let storefront_core::ErrorKind::Configuration {
                validation_errors, ..
            } = &e.kind
            {
                for problem in validation_errors {
                    eprintln!("   - {}", problem);
                }
            }
            process::exit(1);
        }
    }
}
