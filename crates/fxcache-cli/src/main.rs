//! fxcache - cached exchange rates from the command line
//!
//! Usage:
//!   fxcache rates                    # Current USD rates (cached for 30 minutes)
//!   fxcache rates --refresh          # Force a fetch
//!   fxcache convert 100 USD EUR      # Convert an amount
//!   fxcache format 1234.5 JPY        # Locale-aware display string
//!   fxcache select EUR               # Persist the display currency
//!   fxcache serve                    # JSON-RPC over stdin/stdout

mod server;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use fxcache_core::{Currency, CurrencyContext, FxConfig, RateOutcome};

#[derive(Parser, Debug)]
#[command(name = "fxcache")]
#[command(about = "Cached exchange rates and currency conversion", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for stored rates and preferences
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Primary provider URL (queried as URL/BASE)
    #[arg(long, value_name = "URL", global = true)]
    primary_url: Option<String>,

    /// Fallback provider URL (queried as URL?base=BASE)
    #[arg(long, value_name = "URL", global = true)]
    fallback_url: Option<String>,

    /// Per-provider timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show exchange rates
    Rates {
        /// Base currency
        #[arg(short, long, default_value = "USD")]
        base: String,

        /// Ignore the cache and fetch now
        #[arg(short, long)]
        refresh: bool,
    },
    /// Convert an amount between currencies
    Convert {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        from: String,
        to: String,
    },
    /// Format an amount for display
    Format {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        /// Currency code (defaults to the selected currency)
        code: Option<String>,
    },
    /// List supported currencies, optionally filtered
    Currencies { search: Option<String> },
    /// Set the display currency
    Select { code: String },
    /// Show cache freshness and the selected currency
    Status,
    /// Run the JSON-RPC server on stdin/stdout
    Serve,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let mut ctx = CurrencyContext::from_config(&config)?;
    let rt = tokio::runtime::Runtime::new()?;

    match args.command {
        Command::Rates { base, refresh } => {
            let base: Currency = base.parse()?;
            let outcome = if refresh {
                rt.block_on(ctx.refresh_exchange_rates(base))
            } else {
                rt.block_on(ctx.get_exchange_rates(base))
            };
            print_rates(&outcome);
            if ctx.rates_stale() {
                eprintln!("Warning: rates may be stale ({})", ctx.last_updated_label());
            }
        }
        Command::Convert { amount, from, to } => {
            let converted = rt.block_on(ctx.convert_currency(amount, &from, &to));
            println!(
                "{} = {}",
                ctx.format_currency(Some(amount), &from),
                ctx.format_currency(Some(converted), &to)
            );
        }
        Command::Format { amount, code } => match code {
            Some(code) => println!("{}", ctx.format_currency(Some(amount), &code)),
            None => println!("{}", ctx.format_selected(Some(amount))),
        },
        Command::Currencies { search } => {
            for meta in ctx.search_currencies(search.as_deref().unwrap_or("")) {
                println!(
                    "{} {}  {:<4} {}",
                    meta.flag, meta.code, meta.symbol, meta.display_name
                );
            }
        }
        Command::Select { code } => {
            let currency = ctx.select_currency(&code)?;
            println!("Selected {} ({})", currency, currency.name());
        }
        Command::Status => {
            let status = ctx.status();
            println!("Selected:     {}", status.selected);
            match status.base {
                Some(base) => println!("Base:         {base}"),
                None => println!("Base:         -"),
            }
            println!("Last updated: {}", status.label);
            println!("Fresh:        {}", if status.valid { "yes" } else { "no" });
            println!("Stale:        {}", if status.stale { "yes" } else { "no" });
        }
        Command::Serve => server::run_server(&mut ctx, &rt)?,
    }

    Ok(())
}

/// Config file (if any), then command-line overrides
fn build_config(args: &Args) -> Result<FxConfig> {
    let mut config = match &args.config {
        Some(path) => FxConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FxConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(url) = &args.primary_url {
        config.primary_url = url.clone();
    }
    if let Some(url) = &args.fallback_url {
        config.fallback_url = url.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

fn print_rates(outcome: &RateOutcome) {
    let snapshot = &outcome.snapshot;
    println!("Base {} ({:?})", snapshot.base_currency, outcome.source);
    for (currency, rate) in &snapshot.rates {
        if *currency != snapshot.base_currency {
            println!("  {currency}  {rate:>14.6}");
        }
    }
}
