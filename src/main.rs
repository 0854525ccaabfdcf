use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use podash::analytics::format::{
    format_compact, format_days, format_grouped_int, format_money, format_percent,
};
use podash::analytics::{
    aggregate, enrich, monthly_trend, percentage, prepare, project_analytics, vendor_analytics,
    AggregateOptions, DashboardSummary, MonthlyTrend, ProjectAnalytics, SystemClock, TimeFrame,
    VendorAnalytics,
};
use podash::api::{build_source, fetch_listing, load_history, load_purchase_orders, PoSource};
use podash::config::{config_dir, expand_path, init_config, load_config, Config};
use podash::error::{PodashError, Result};
use podash::export::{filter_rows, to_csv};
use podash::filter::{has_inward_status, PoFilter};
use podash::history::{group_revisions, paginate, HistoryView};
use podash::model::{EnrichedOrder, InwardStatus, PoStatus, PurchaseOrder};

#[derive(Parser)]
#[command(name = "podash")]
#[command(version, about = "Purchase-order analytics dashboard", long_about = None)]
struct Cli {
    /// Path to config directory (default: $PODASH_CONFIG_DIR, XDG config dir or ~/.podash)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Read data from a JSON snapshot instead of the REST API
    #[arg(long, global = true, value_name = "FILE")]
    from_file: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory with a template config.toml
    Init,

    /// Show configuration and data source
    Status,

    /// Show the full analytics dashboard
    Dashboard {
        /// Time window: all, 3months, 6months, 1year (default from config)
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Number of vendors to show
        #[arg(long)]
        top: Option<usize>,

        /// Trailing months in the monthly trend
        #[arg(long)]
        months: Option<usize>,

        /// Print the dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Vendor rollup sorted by total value
    Vendors {
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Number of vendors to show (default from config)
        #[arg(long)]
        top: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Project rollup sorted by total value
    Projects {
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Number of projects to show (default: all)
        #[arg(long)]
        top: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Monthly PO count and value over trailing months
    Trend {
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Trailing months to show (default from config)
        #[arg(long)]
        months: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List purchase orders with optional filters
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Only orders with this inward status (open, partially_inwarded, completed)
        #[arg(long)]
        inward: Option<String>,

        /// Number of orders to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show grouped revision history for a requisition batch
    History {
        /// Batch identifier
        batch_id: String,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        json: bool,
    },

    /// Export purchase orders as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Substring match on PO number, vendor or project
    #[arg(short, long)]
    search: Option<String>,

    /// PO status (pending_approval, approved, rejected, ordered, delivered, cancelled)
    #[arg(long)]
    status: Option<String>,

    /// Exact vendor name (case-insensitive)
    #[arg(long)]
    vendor: Option<String>,

    /// Exact project code (case-insensitive)
    #[arg(long)]
    project: Option<String>,

    /// Only approved orders
    #[arg(long)]
    approved_only: bool,
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.status.is_none()
            && self.vendor.is_none()
            && self.project.is_none()
            && !self.approved_only
    }

    fn into_filter(self) -> Result<PoFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<PoStatus>)
            .transpose()?;
        Ok(PoFilter {
            search: self.search,
            status,
            vendor: self.vendor,
            project: self.project,
            approved_only: self.approved_only,
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries tables, JSON and CSV
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,podash=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Everything a data command needs: settings, a source, and a clock
struct Context {
    config: Config,
    source: Box<dyn PoSource>,
    clock: SystemClock,
}

impl Context {
    fn load(cfg_dir: &Path, from_file: Option<&str>) -> Result<Self> {
        let config = load_config(cfg_dir)?;
        let snapshot = from_file.map(expand_path);
        let source = build_source(&config.api, snapshot.as_deref())?;
        Ok(Self {
            config,
            source,
            clock: SystemClock,
        })
    }

    fn timeframe(&self, arg: Option<&str>) -> Result<TimeFrame> {
        arg.unwrap_or(&self.config.dashboard.timeframe).parse()
    }

    /// Listing, then approval/time filter, then inward status enrichment
    fn enriched_orders(&self, timeframe: TimeFrame) -> Result<Vec<EnrichedOrder>> {
        let orders = load_purchase_orders(self.source.as_ref(), self.config.api.retries)?;
        prepare(
            self.source.as_ref(),
            orders,
            timeframe,
            &self.clock,
            self.config.api.concurrency,
        )
    }

    fn currency(&self) -> &str {
        &self.config.dashboard.currency_symbol
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let load = || Context::load(&cfg_dir, cli.from_file.as_deref());

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir, cli.from_file.as_deref()),
        Commands::Dashboard {
            timeframe,
            top,
            months,
            json,
        } => cmd_dashboard(&load()?, timeframe.as_deref(), top, months, json),
        Commands::Vendors {
            timeframe,
            top,
            json,
        } => cmd_vendors(&load()?, timeframe.as_deref(), top, json),
        Commands::Projects {
            timeframe,
            top,
            json,
        } => cmd_projects(&load()?, timeframe.as_deref(), top, json),
        Commands::Trend {
            timeframe,
            months,
            json,
        } => cmd_trend(&load()?, timeframe.as_deref(), months, json),
        Commands::List {
            filter,
            inward,
            limit,
        } => cmd_list(&load()?, filter, inward.as_deref(), limit),
        Commands::History {
            batch_id,
            page,
            json,
        } => cmd_history(&load()?, &batch_id, page, json),
        Commands::Export { filter, output } => cmd_export(&load()?, filter, output),
    }
}

/// Initialize config directory with the template
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    let path = init_config(cfg_dir)?;

    println!("Initialized podash config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Point at your API:  $EDITOR {}", path.display());
    println!("  2. Show the dashboard: podash dashboard");
    println!();
    println!("Or work offline from an exported snapshot:");
    println!("  podash --from-file snapshot.json dashboard");

    Ok(())
}

/// Show configuration and data source
fn cmd_status(cfg_dir: &Path, from_file: Option<&str>) -> Result<()> {
    let config = load_config(cfg_dir)?;

    let source = match (from_file, config.api.base_url.as_deref()) {
        (Some(file), _) => format!("snapshot {}", expand_path(file).display()),
        (None, Some(url)) if !url.trim().is_empty() => url.to_string(),
        _ => "not configured".to_string(),
    };
    let top_vendors = config
        .dashboard
        .top_vendors
        .map_or("all".to_string(), |n| n.to_string());
    let top_projects = config
        .dashboard
        .top_projects
        .map_or("all".to_string(), |n| n.to_string());

    println!("podash Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Data source:      {}", source);
    println!(
        "Timeout:          {}s ({} retries)",
        config.api.timeout_secs, config.api.retries
    );
    println!("Lookups:          {} parallel", config.api.concurrency);
    println!("Time frame:       {}", config.dashboard.timeframe);
    println!("Top vendors:      {}", top_vendors);
    println!("Top projects:     {}", top_projects);
    println!("Trend months:     {}", config.dashboard.trend_months);
    println!("History page:     {}", config.history.page_size);
    println!("Export excludes:  {}", config.export.exclude.join(", "));

    Ok(())
}

fn print_json<T: Serialize>(value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PodashError::Encode {
        what: what.to_string(),
        reason: e.to_string(),
    })?;
    println!("{json}");
    Ok(())
}

/// Render any row type as a rounded table, or a message when there are no rows
fn print_table<R: Tabled>(rows: Vec<R>, empty_message: &str) {
    if rows.is_empty() {
        println!("{empty_message}");
    } else {
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

// Table row structs for tabled
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "POS")]
    count: usize,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "SHARE")]
    share: String,
}

#[derive(Tabled)]
struct VendorRow {
    #[tabled(rename = "VENDOR")]
    vendor: String,
    #[tabled(rename = "POS")]
    total_pos: usize,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "COMPLETED")]
    completed: usize,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "TURNAROUND")]
    turnaround: String,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "PROJECT")]
    project: String,
    #[tabled(rename = "POS")]
    total_pos: usize,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "AVG PO")]
    average: String,
    #[tabled(rename = "RATE")]
    rate: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "MONTH")]
    month: String,
    #[tabled(rename = "POS")]
    total_pos: usize,
    #[tabled(rename = "COMPLETED")]
    completed: usize,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "")]
    bar: String,
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "PO")]
    po_number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "VENDOR")]
    vendor: String,
    #[tabled(rename = "PROJECT")]
    project: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "INWARD")]
    inward: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "OLD")]
    old_value: String,
    #[tabled(rename = "NEW")]
    new_value: String,
}

const BAR_WIDTH: usize = 24;

fn trend_rows(trend: &[MonthlyTrend], currency: &str) -> Vec<TrendRow> {
    let max = trend.iter().map(|m| m.total_value).fold(0.0, f64::max);
    trend
        .iter()
        .map(|m| {
            let width = if max > 0.0 {
                (m.total_value / max * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            TrendRow {
                month: m.month.clone(),
                total_pos: m.total_pos,
                completed: m.completed_pos,
                value: format_compact(m.total_value, currency),
                bar: "█".repeat(width),
            }
        })
        .collect()
}

fn vendor_rows(vendors: &[VendorAnalytics], currency: &str) -> Vec<VendorRow> {
    vendors
        .iter()
        .map(|v| VendorRow {
            vendor: v.vendor_name.clone(),
            total_pos: v.total_pos,
            value: format_money(v.total_value, currency),
            completed: v.completed_pos,
            rate: format_percent(v.completion_rate),
            turnaround: format_days(v.avg_turnaround_days),
        })
        .collect()
}

fn project_rows(projects: &[ProjectAnalytics], currency: &str) -> Vec<ProjectRow> {
    projects
        .iter()
        .map(|p| ProjectRow {
            project: p.project_code.clone(),
            total_pos: p.total_pos,
            value: format_money(p.total_value, currency),
            average: format_money(p.avg_po_value, currency),
            rate: format_percent(p.completion_rate),
        })
        .collect()
}

fn print_dashboard(summary: &DashboardSummary, timeframe: TimeFrame, currency: &str) {
    let totals = &summary.status_totals;

    println!("Purchase Order Dashboard ({timeframe})");
    println!("{}", "-".repeat(50));
    println!(
        "Total POs:           {:>6}   {}",
        format_grouped_int(totals.total_pos as i64),
        format_money(totals.total_value, currency)
    );
    println!(
        "Completed:           {:>6}   {}",
        format_grouped_int(totals.completed_pos as i64),
        format_money(totals.completed_value, currency)
    );
    println!(
        "Partially inwarded:  {:>6}   {}",
        format_grouped_int(totals.partially_inwarded_pos as i64),
        format_money(totals.partially_inwarded_value, currency)
    );
    println!(
        "Open:                {:>6}   {}",
        format_grouped_int(totals.open_pos as i64),
        format_money(totals.open_value, currency)
    );
    println!(
        "Completion rate:     {:>6}",
        format_percent(percentage(totals.completed_pos, totals.total_pos))
    );

    if totals.total_pos == 0 {
        println!();
        println!("No approved purchase orders in this time frame.");
        return;
    }

    println!();
    println!("Status distribution");
    let status_rows: Vec<StatusRow> = summary
        .status_distribution
        .iter()
        .map(|b| StatusRow {
            status: b.status.label().to_string(),
            count: b.count,
            value: format_money(b.value, currency),
            share: format_percent(percentage(b.count, totals.total_pos)),
        })
        .collect();
    print_table(status_rows, "No orders.");

    println!();
    println!("Top vendors");
    print_table(vendor_rows(&summary.vendors, currency), "No vendors.");

    println!();
    println!("Projects");
    print_table(project_rows(&summary.projects, currency), "No projects.");

    println!();
    println!("Monthly trend");
    print_table(trend_rows(&summary.monthly_trend, currency), "No months.");
}

/// Show the full dashboard
fn cmd_dashboard(
    ctx: &Context,
    timeframe: Option<&str>,
    top: Option<usize>,
    months: Option<usize>,
    json: bool,
) -> Result<()> {
    let timeframe = ctx.timeframe(timeframe)?;
    let options = AggregateOptions {
        top_vendors: top.or(ctx.config.dashboard.top_vendors),
        top_projects: ctx.config.dashboard.top_projects,
        trend_months: months.unwrap_or(ctx.config.dashboard.trend_months),
    };

    let orders = ctx.enriched_orders(timeframe)?;
    let summary = aggregate(&orders, &options, &ctx.clock);

    if json {
        return print_json(&summary, "dashboard");
    }
    print_dashboard(&summary, timeframe, ctx.currency());
    Ok(())
}

fn cmd_vendors(
    ctx: &Context,
    timeframe: Option<&str>,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let timeframe = ctx.timeframe(timeframe)?;
    let orders = ctx.enriched_orders(timeframe)?;
    let limit = top.or(ctx.config.dashboard.top_vendors);
    let vendors = vendor_analytics(&orders, &ctx.clock, limit);

    if json {
        return print_json(&vendors, "vendor analytics");
    }
    print_table(vendor_rows(&vendors, ctx.currency()), "No approved purchase orders.");
    Ok(())
}

fn cmd_projects(
    ctx: &Context,
    timeframe: Option<&str>,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let timeframe = ctx.timeframe(timeframe)?;
    let orders = ctx.enriched_orders(timeframe)?;
    let limit = top.or(ctx.config.dashboard.top_projects);
    let projects = project_analytics(&orders, &ctx.clock, limit);

    if json {
        return print_json(&projects, "project analytics");
    }
    print_table(project_rows(&projects, ctx.currency()), "No approved purchase orders.");
    Ok(())
}

fn cmd_trend(
    ctx: &Context,
    timeframe: Option<&str>,
    months: Option<usize>,
    json: bool,
) -> Result<()> {
    let timeframe = ctx.timeframe(timeframe)?;
    let months = months.unwrap_or(ctx.config.dashboard.trend_months);
    let orders = ctx.enriched_orders(timeframe)?;
    let trend = monthly_trend(&orders, &ctx.clock, months);

    if json {
        return print_json(&trend, "monthly trend");
    }
    print_table(trend_rows(&trend, ctx.currency()), "No months to show.");
    Ok(())
}

/// List purchase orders matching the filters
fn cmd_list(
    ctx: &Context,
    args: FilterArgs,
    inward: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = args.into_filter()?;
    let inward = inward.map(str::parse::<InwardStatus>).transpose()?;

    let orders = load_purchase_orders(ctx.source.as_ref(), ctx.config.api.retries)?;
    let total = orders.len();
    let matched: Vec<PurchaseOrder> = filter.apply(&orders).into_iter().cloned().collect();

    // inward status costs one request per order
    let rows: Vec<(PurchaseOrder, Option<InwardStatus>)> = match inward {
        Some(wanted) => enrich(ctx.source.as_ref(), matched, ctx.config.api.concurrency)?
            .into_iter()
            .filter(|e| has_inward_status(Some(wanted), e.inward_status))
            .map(|e| (e.order, Some(e.inward_status)))
            .collect(),
        None => matched.into_iter().map(|po| (po, None)).collect(),
    };

    let shown = limit.map_or(rows.len(), |n| n.min(rows.len()));
    let currency = ctx.currency();
    let table_rows: Vec<OrderRow> = rows
        .iter()
        .take(shown)
        .enumerate()
        .map(|(idx, (po, status))| OrderRow {
            index: idx + 1,
            po_number: po.po_number.clone(),
            date: po.po_date.to_string(),
            vendor: po.vendor_name.clone(),
            project: po.project_code.clone(),
            status: po.status.to_string(),
            amount: format_money(po.total_amount, currency),
            inward: status.map_or("-".to_string(), |s| s.to_string()),
        })
        .collect();

    print_table(table_rows, "No purchase orders match the given filters.");
    println!();
    println!("Showing {} of {} purchase orders", shown, total);
    Ok(())
}

/// Show one page of grouped revisions for a batch
fn cmd_history(ctx: &Context, batch_id: &str, page: usize, json: bool) -> Result<()> {
    let records = load_history(ctx.source.as_ref(), batch_id, ctx.config.api.retries)?;
    let view = paginate(group_revisions(records), page, ctx.config.history.page_size)?;

    if json {
        return print_json(&view, "revision history");
    }

    match view {
        HistoryView::Empty => println!("No history recorded for batch {batch_id}."),
        HistoryView::Page(page) => {
            println!(
                "Revision history for batch {} (page {}/{}, {} revisions)",
                batch_id, page.page, page.total_pages, page.total_revisions
            );
            for revision in page.revisions {
                println!();
                println!(
                    "Revision #{} by {} at {}",
                    revision.number,
                    revision.changed_by,
                    revision.minute.format("%Y-%m-%d %H:%M UTC")
                );
                let rows: Vec<ChangeRow> = revision
                    .changes
                    .iter()
                    .map(|c| ChangeRow {
                        field: c.field_name.clone(),
                        old_value: c.old_value.clone().unwrap_or_else(|| "-".to_string()),
                        new_value: c.new_value.clone().unwrap_or_else(|| "-".to_string()),
                    })
                    .collect();
                print_table(rows, "No field changes.");
            }
        }
    }
    Ok(())
}

/// Export the raw listing as CSV, optionally filtered
fn cmd_export(ctx: &Context, args: FilterArgs, output: Option<PathBuf>) -> Result<()> {
    let unfiltered = args.is_empty();
    let filter = args.into_filter()?;
    let rows = fetch_listing(ctx.source.as_ref(), ctx.config.api.retries)?;

    let rows = if unfiltered {
        rows
    } else {
        filter_rows(rows, &filter)
    };

    let csv = to_csv(&rows, &ctx.config.export.exclude)?;

    match output {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!("Exported {} purchase orders to {}", rows.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
