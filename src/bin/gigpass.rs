//! CLI binary for smoke-testing the GigPass marketplace core.

use std::io::{self, BufRead as _, Write as _};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use gigpass_rs::backend::RestBackend;
use gigpass_rs::marketplace::{GigPass, TicketFilter};
use gigpass_rs::models::{
    NaiveDate, NaiveTime, Ticket, TicketDraft, TicketId, TicketPatch, TicketStatus, UserId,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Environment variable name for the API key.
const API_KEY_ENV: &str = "GIGPASS_API_KEY";

/// Environment variable name for the base URL override.
const BASE_URL_ENV: &str = "GIGPASS_URL";

/// GigPass marketplace CLI — browse and manage ticket listings.
#[derive(Debug, Parser)]
#[command(name = "gigpass", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Browse available listings, optionally filtered.
    Browse(BrowseArgs),
    /// List the signed-in user's added and purchased tickets.
    Mine,
    /// Create a new listing.
    Add(AddArgs),
    /// Edit an existing listing.
    Update(UpdateArgs),
    /// Delete a listing (asks for confirmation).
    Delete {
        /// Ticket id to delete.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Purchase a listing (simulated; no payment runs).
    Buy {
        /// Ticket id to purchase.
        id: String,
    },
}

/// Arguments for the `browse` subcommand.
#[derive(Debug, Args)]
struct BrowseArgs {
    /// Filter by category name (case-insensitive).
    #[arg(long)]
    category: Option<String>,
    /// Filter by venue substring (case-insensitive).
    #[arg(long)]
    venue: Option<String>,
    /// Filter by title substring (case-insensitive).
    #[arg(long)]
    title: Option<String>,
    /// Minimum unit price. Requires --max-price.
    #[arg(long, requires = "max_price")]
    min_price: Option<f64>,
    /// Maximum unit price. Requires --min-price.
    #[arg(long, requires = "min_price")]
    max_price: Option<f64>,
    /// Earliest event date (YYYY-MM-DD). Requires --to.
    #[arg(long, requires = "to", value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Latest event date (YYYY-MM-DD). Requires --from.
    #[arg(long, requires = "from", value_parser = parse_date)]
    to: Option<NaiveDate>,
}

impl BrowseArgs {
    /// Converts the CLI arguments into a ticket filter.
    fn into_filter(self) -> TicketFilter {
        let mut filter = TicketFilter::new();
        if let Some(category) = self.category {
            filter = filter.category(category);
        }
        if let Some(venue) = self.venue {
            filter = filter.venue(venue);
        }
        if let Some(title) = self.title {
            filter = filter.title_contains(title);
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            filter = filter.unit_price_range(min, max);
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            filter = filter.event_date_range(from, to);
        }
        filter
    }
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Listing title.
    title: String,
    /// Price per ticket.
    price_per_unit: f64,
    /// Number of tickets.
    quantity: u32,
    /// Category name.
    #[arg(long)]
    category: Option<String>,
    /// Venue name.
    #[arg(long)]
    venue: Option<String>,
    /// Free-form description.
    #[arg(long)]
    description: Option<String>,
    /// Event date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// Event start time (HH:MM).
    #[arg(long, value_parser = parse_time)]
    time: Option<NaiveTime>,
    /// Attachment path previously uploaded.
    #[arg(long)]
    file: Option<String>,
}

/// Arguments for the `update` subcommand.
#[derive(Debug, Args)]
struct UpdateArgs {
    /// Ticket id to update.
    id: String,
    /// New title.
    #[arg(long)]
    title: Option<String>,
    /// New price per ticket.
    #[arg(long)]
    price_per_unit: Option<f64>,
    /// New quantity.
    #[arg(long)]
    quantity: Option<u32>,
    /// New category name.
    #[arg(long)]
    category: Option<String>,
    /// New venue name.
    #[arg(long)]
    venue: Option<String>,
    /// New description.
    #[arg(long)]
    description: Option<String>,
    /// New event date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// New event start time (HH:MM).
    #[arg(long, value_parser = parse_time)]
    time: Option<NaiveTime>,
    /// Replacement attachment path.
    #[arg(long)]
    file: Option<String>,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a time string in `HH:MM` format for clap.
fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|err| format!("{err}"))
}

/// Reads the API key from the environment.
fn read_api_key() -> io::Result<Option<String>> {
    match std::env::var(API_KEY_ENV) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => {
            let mut err = io::stderr().lock();
            writeln!(
                err,
                "{} {} environment variable is not set",
                "error:".red().bold(),
                API_KEY_ENV.bold()
            )?;
            writeln!(
                err,
                "  {} create a .env file with {}=<your_key>",
                "hint:".cyan(),
                API_KEY_ENV
            )?;
            Ok(None)
        }
    }
}

/// Entry point: builds the client, then dispatches on a runtime.
fn main() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let Some(api_key) = read_api_key()? else {
        return Ok(ExitCode::FAILURE);
    };

    let mut builder = RestBackend::builder().api_key(api_key);
    if let Ok(url) = std::env::var(BASE_URL_ENV) {
        builder = builder.base_url(url);
    }
    let backend = match builder.build() {
        Ok(backend) => backend,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build backend: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = match GigPass::builder().backend(backend).build() {
        Ok(client) => client,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build client: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(&client, cli.command))
}

/// Dispatches to the appropriate subcommand handler.
async fn dispatch(client: &GigPass<RestBackend>, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Browse(args) => cmd_browse(client, args.into_filter()).await,
        Command::Mine => cmd_mine(client).await,
        Command::Add(args) => cmd_add(client, args).await,
        Command::Update(args) => cmd_update(client, args).await,
        Command::Delete { id, yes } => cmd_delete(client, TicketId::new(id), yes).await,
        Command::Buy { id } => cmd_buy(client, TicketId::new(id)).await,
    }
}

/// Creates a spinner for an in-flight request.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner
}

/// Prints a failure line to stderr.
fn report_error(context: &str, err: &gigpass_rs::error::GigPassError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Renders listings as a table.
fn print_tickets(tickets: &[Ticket]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if tickets.is_empty() {
        return writeln!(out, "no tickets");
    }

    let mut table = Table::new();
    let _table = table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Title", "Category", "Venue", "Date", "Qty", "Unit", "Total", "Status",
    ]);
    for ticket in tickets {
        let status = match ticket.status {
            TicketStatus::Available => Cell::new("available").fg(Color::Green),
            TicketStatus::Sold => Cell::new("sold").fg(Color::Yellow),
            TicketStatus::Expired => Cell::new("expired").fg(Color::DarkGrey),
            TicketStatus::Cancelled => Cell::new("cancelled").fg(Color::Red),
        };
        let _table = table.add_row(vec![
            Cell::new(ticket.id.as_inner()),
            Cell::new(&ticket.title),
            Cell::new(ticket.category.as_deref().unwrap_or("-")),
            Cell::new(ticket.venue.as_deref().unwrap_or("-")),
            Cell::new(
                ticket
                    .event_date
                    .map_or_else(|| "-".to_owned(), |d| d.to_string()),
            ),
            Cell::new(ticket.quantity),
            Cell::new(format!("{:.2}", ticket.price_per_unit)),
            Cell::new(format!("{:.2}", ticket.price)),
            status,
        ]);
    }
    writeln!(out, "{table}")
}

/// Executes the `browse` subcommand.
async fn cmd_browse(client: &GigPass<RestBackend>, filter: TicketFilter) -> io::Result<ExitCode> {
    let spinner = make_spinner("Browsing listings...");
    match client.browse(&filter).await {
        Ok(tickets) => {
            spinner.finish_and_clear();
            print_tickets(&tickets)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("browse failed", &err)
        }
    }
}

/// Executes the `mine` subcommand.
async fn cmd_mine(client: &GigPass<RestBackend>) -> io::Result<ExitCode> {
    let user = match client.current_session().await {
        Ok(Some(session)) => session.user_id,
        Ok(None) => {
            writeln!(
                io::stderr().lock(),
                "{} not signed in",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return report_error("session read failed", &err),
    };

    let spinner = make_spinner("Fetching your tickets...");
    match client.tickets_for(&user).await {
        Ok(collection) => {
            spinner.finish_and_clear();
            let mut out = io::stdout().lock();
            writeln!(out, "{}", "Added".bold())?;
            drop(out);
            print_tickets(&collection.added)?;
            let mut out = io::stdout().lock();
            writeln!(out, "{}", "Purchased".bold())?;
            drop(out);
            print_tickets(&collection.purchased)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("fetch failed", &err)
        }
    }
}

/// Executes the `add` subcommand.
async fn cmd_add(client: &GigPass<RestBackend>, args: AddArgs) -> io::Result<ExitCode> {
    let mut draft = TicketDraft::new(args.title, args.price_per_unit, args.quantity);
    if let Some(category) = args.category {
        draft = draft.category(category);
    }
    if let Some(venue) = args.venue {
        draft = draft.venue(venue);
    }
    if let Some(description) = args.description {
        draft = draft.description(description);
    }
    if let Some(date) = args.date {
        draft = draft.event_date(date);
    }
    if let Some(time) = args.time {
        draft = draft.event_time(time);
    }
    if let Some(file) = args.file {
        draft = draft.file_path(file);
    }

    let spinner = make_spinner("Creating listing...");
    match client.add_ticket(draft).await {
        Ok(ticket) => {
            spinner.finish_and_clear();
            writeln!(
                io::stdout().lock(),
                "{} listed {} at {:.2}",
                "created:".green().bold(),
                ticket.id,
                ticket.price
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("create failed", &err)
        }
    }
}

/// Executes the `update` subcommand.
async fn cmd_update(client: &GigPass<RestBackend>, args: UpdateArgs) -> io::Result<ExitCode> {
    let id = TicketId::new(args.id);
    let mut patch = TicketPatch::new();
    if let Some(title) = args.title {
        patch = patch.title(title);
    }
    if let Some(value) = args.price_per_unit {
        patch = patch.price_per_unit(value);
    }
    if let Some(value) = args.quantity {
        patch = patch.quantity(value);
    }
    if let Some(category) = args.category {
        patch = patch.category(category);
    }
    if let Some(venue) = args.venue {
        patch = patch.venue(venue);
    }
    if let Some(description) = args.description {
        patch = patch.description(description);
    }
    if let Some(date) = args.date {
        patch = patch.event_date(date);
    }
    if let Some(time) = args.time {
        patch = patch.event_time(time);
    }
    if let Some(file) = args.file {
        patch = patch.file_path(file);
    }

    if patch.is_empty() {
        writeln!(io::stderr().lock(), "{} nothing to change", "error:".red().bold())?;
        return Ok(ExitCode::FAILURE);
    }

    let spinner = make_spinner("Updating listing...");
    match client.update_ticket(&id, patch).await {
        Ok(ticket) => {
            spinner.finish_and_clear();
            writeln!(
                io::stdout().lock(),
                "{} {} now {} x {:.2} = {:.2}",
                "updated:".green().bold(),
                ticket.id,
                ticket.quantity,
                ticket.price_per_unit,
                ticket.price
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("update failed", &err)
        }
    }
}

/// Executes the `delete` subcommand through the confirmation workflow.
async fn cmd_delete(
    client: &GigPass<RestBackend>,
    id: TicketId,
    yes: bool,
) -> io::Result<ExitCode> {
    let workflow = client.delete_workflow();
    match workflow.open(id.clone()) {
        Ok(true) => {}
        Ok(false) => {
            writeln!(
                io::stderr().lock(),
                "{} another delete is in flight",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return report_error("delete failed", &err),
    }

    if !yes && !prompt_confirmation(&id)? {
        if let Err(err) = workflow.cancel() {
            return report_error("delete failed", &err);
        }
        writeln!(io::stdout().lock(), "cancelled")?;
        return Ok(ExitCode::SUCCESS);
    }

    let spinner = make_spinner("Deleting listing...");
    match workflow.confirm().await {
        Ok(Some(deleted)) => {
            spinner.finish_and_clear();
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "deleted:".green().bold(),
                deleted
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            spinner.finish_and_clear();
            writeln!(io::stdout().lock(), "nothing pending")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("delete failed", &err)
        }
    }
}

/// Asks the user to confirm a delete on stdin.
fn prompt_confirmation(id: &TicketId) -> io::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "Delete ticket {id}? [y/N] ")?;
    out.flush()?;
    drop(out);

    let mut answer = String::new();
    let _read = io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Executes the `buy` subcommand.
async fn cmd_buy(client: &GigPass<RestBackend>, id: TicketId) -> io::Result<ExitCode> {
    let spinner = make_spinner("Purchasing...");
    match client.purchase_ticket(&id).await {
        Ok(ticket) => {
            spinner.finish_and_clear();
            let buyer = ticket
                .buyer_id
                .map_or_else(|| "-".to_owned(), |b: UserId| b.to_string());
            writeln!(
                io::stdout().lock(),
                "{} {} to {buyer} for {:.2}",
                "sold:".green().bold(),
                ticket.id,
                ticket.price
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_error("purchase failed", &err)
        }
    }
}
