//! Interactive shell for edgequake-invoice2sql.
//!
//! Maps startup flags to `AppConfig`, then reads one command per line from
//! stdin and runs it against a single `Session`. Each line is parsed by clap
//! in multicall mode, so `help` and `<command> --help` work as usual.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use edgequake_invoice2sql::{
    AppConfig, InvoiceApp, InvoiceError, InvoiceFilter, LineItem, Screen, Session, UploadedFile,
    WorkspaceStage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &str, message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix.to_string());
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"SHELL COMMANDS:
  login <user> [password]       Log in (INVOICE2SQL_PASSWORD, else a visible prompt)
  upload <file>...              Stage PDFs / JPEGs / PNGs, replacing the last batch
  extract [instruction...]      Send all staged pages to the model
  show                          Print the model reply and the parsed invoice
  edit <file>                   Replace the reply with the JSON in <file> (admins)
  insert                        Validate and ask for confirmation
  confirm | cancel              Answer the confirmation
  clear                         Drop staged pages and the reply
  history [--id X|--customer X] List stored invoices
  details <invoice-id>          Show one invoice with its items
  ask <question...>             Natural-language query (needs --enable-nl-query)
  add-user <user> <pw> [--admin], users, audit      Administration (admins)
  screen <name>, status, logout, quit

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY              Google Gemini API key (default provider)
  OPENAI_API_KEY              OpenAI API key
  ANTHROPIC_API_KEY           Anthropic API key
  EDGEQUAKE_LLM_PROVIDER      Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL             Override model ID
  PDFIUM_LIB_PATH             Path to an existing libpdfium, skips auto-download
  PDFIUM_AUTO_CACHE_DIR       Override the default pdfium cache directory

  Variables are also read from a `.env` file in the working directory.
"#;

#[derive(Parser, Debug)]
#[command(
    name = "invoice2sql",
    version,
    about = "Extract invoices from PDFs and images with Vision LLMs and store them in SQLite",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// SQLite database file; created on first start.
    #[arg(long, env = "INVOICE2SQL_DATABASE", default_value = "invoices.db")]
    database: PathBuf,

    /// Vision model. Default: gemini-2.5-flash.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider. Auto-detected from API key env vars if not set.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Render resolution for PDF pages.
    #[arg(long, env = "INVOICE2SQL_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    #[arg(long, env = "INVOICE2SQL_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    #[arg(long, env = "INVOICE2SQL_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// File with a replacement extraction instruction.
    #[arg(long, env = "INVOICE2SQL_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Allow `ask`. Generated SQL always runs read-only.
    #[arg(long, env = "INVOICE2SQL_ENABLE_NL_QUERY")]
    enable_nl_query: bool,

    /// Entries shown by `audit`.
    #[arg(long, env = "INVOICE2SQL_AUDIT_LIMIT", default_value_t = 50)]
    audit_limit: usize,

    /// Account seeded into an empty database.
    #[arg(long, env = "INVOICE2SQL_ADMIN_USER", default_value = "admin")]
    admin_user: String,

    #[arg(long, env = "INVOICE2SQL_ADMIN_PASSWORD", default_value = "admin123",
          hide_env_values = true)]
    admin_password: String,

    /// Print records as JSON.
    #[arg(long, env = "INVOICE2SQL_JSON")]
    json: bool,

    #[arg(short, long, env = "INVOICE2SQL_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "INVOICE2SQL_QUIET")]
    quiet: bool,
}

/// One shell line.
#[derive(Parser, Debug)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Log in.
    Login {
        username: String,
        #[arg(env = "INVOICE2SQL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and drop everything staged.
    Logout,
    /// Switch screen.
    Screen { screen: ScreenArg },
    /// Show who is logged in and what is staged.
    Status,
    /// Stage files for extraction.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Extract one invoice from all staged pages.
    Extract { instruction: Vec<String> },
    /// Print the current reply and its parsed form.
    Show,
    /// Replace the reply with the contents of a file.
    Edit { file: PathBuf },
    /// Validate the reply and ask for confirmation.
    Insert,
    /// Store the pending invoice.
    #[command(alias = "yes")]
    Confirm,
    /// Discard the pending confirmation.
    #[command(alias = "no")]
    Cancel,
    /// Drop staged pages and the reply.
    Clear,
    /// List stored invoices.
    History {
        #[arg(long, conflicts_with = "customer")]
        id: Option<String>,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Show one invoice with its line items.
    Details { invoice_id: String },
    /// Ask a question about the stored invoices.
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Add an account.
    AddUser {
        username: String,
        password: String,
        #[arg(long)]
        admin: bool,
    },
    /// List accounts.
    Users,
    /// Show recent audit entries.
    Audit,
    /// Leave the shell.
    #[command(alias = "exit")]
    Quit,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScreenArg {
    Extraction,
    History,
    Query,
    Users,
}

impl From<ScreenArg> for Screen {
    fn from(v: ScreenArg) -> Self {
        match v {
            ScreenArg::Extraction => Screen::Extraction,
            ScreenArg::History => Screen::History,
            ScreenArg::Query => Screen::Query,
            ScreenArg::Users => Screen::UserAdmin,
        }
    }
}

struct Shell {
    app: InvoiceApp,
    session: Session,
    lines: Lines<BufReader<Stdin>>,
    json: bool,
    quiet: bool,
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ───────────────────────────────────
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;
            dl_bar.finish_with_message("ready ✓");
        } else {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    let config = build_config(&cli)?;
    let app = InvoiceApp::open(config).context("Failed to start the invoice workspace")?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold("invoice2sql"),
            dim(&format!("database: {}", cli.database.display()))
        );
        eprintln!("{}", dim("Type `help` for commands, `login <user>` to start."));
    }

    let mut shell = Shell {
        app,
        session: Session::new(),
        lines: BufReader::new(tokio::io::stdin()).lines(),
        json: cli.json,
        quiet: cli.quiet,
    };
    shell.run().await
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut builder = AppConfig::builder()
        .database_path(&cli.database)
        .render_dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .audit_log_limit(cli.audit_limit)
        .enable_nl_query(cli.enable_nl_query)
        .seed_admin(&cli.admin_user, &cli.admin_password);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.extraction_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read extraction prompt {}", path.display()))?;
        builder = builder.extraction_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

impl Shell {
    async fn run(&mut self) -> Result<()> {
        loop {
            self.prompt()?;
            let Some(line) = self.lines.next_line().await.context("Failed to read stdin")? else {
                break;
            };

            let words = match split_words(&line) {
                Ok(w) if w.is_empty() => continue,
                Ok(w) => w,
                Err(e) => {
                    eprintln!("{} {}", red("✗"), e);
                    continue;
                }
            };

            let parsed = match ShellLine::try_parse_from(&words) {
                Ok(p) => p,
                Err(e) => {
                    // Help and usage errors both land here.
                    e.print().ok();
                    continue;
                }
            };

            match self.dispatch(parsed.command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => report(&e),
            }
        }

        if self.session.is_authenticated() {
            self.app.logout(&mut self.session).ok();
        }
        Ok(())
    }

    fn prompt(&self) -> Result<()> {
        let who = match self.session.user {
            Some(ref u) if u.is_admin => format!("{}*", u.username),
            Some(ref u) => u.username.clone(),
            None => "anonymous".to_string(),
        };
        let mut out = io::stdout().lock();
        write!(
            out,
            "{} ",
            cyan(&format!("{who}@{}>", screen_name(self.session.screen)))
        )?;
        out.flush()?;
        Ok(())
    }

    async fn dispatch(&mut self, command: ShellCommand) -> Result<Flow, InvoiceError> {
        let app = &self.app;
        let session = &mut self.session;
        let (json, quiet) = (self.json, self.quiet);

        match command {
            ShellCommand::Login { username, password } => {
                let password = match password {
                    Some(p) => p,
                    None => {
                        eprint!("Password {}: ", dim("(input is visible)"));
                        io::stderr().flush().ok();
                        self.lines
                            .next_line()
                            .await
                            .map_err(|e| InvoiceError::Internal(e.to_string()))?
                            .unwrap_or_default()
                    }
                };
                let user = app.login(session, &username, &password)?;
                ok(&format!(
                    "Welcome, {}{}",
                    bold(&user.username),
                    if user.is_admin { " (admin)" } else { "" }
                ));
            }
            ShellCommand::Logout => {
                app.logout(session)?;
                ok("Logged out");
            }
            ShellCommand::Screen { screen } => {
                app.navigate(session, screen.into())?;
                ok(session.screen.label());
            }
            ShellCommand::Status => {
                let who = session.username().unwrap_or("not logged in");
                println!("User:    {who}");
                println!("Screen:  {}", session.screen.label());
                println!("Stage:   {}", stage_name(session.stage()));
                println!("Pages:   {}", session.staged_pages.len());
                for issue in &session.upload_issues {
                    println!("  {} {}", red("✗"), issue);
                }
            }
            ShellCommand::Upload { files } => {
                let (uploads, unreadable) = read_uploads(&files).await;
                for e in &unreadable {
                    report(e);
                }
                if uploads.is_empty() {
                    return Err(InvoiceError::NothingStaged);
                }
                let bar = (!quiet).then(|| spinner("Rendering", &format!("{} file(s)", files.len())));
                let staged = app.stage_uploads(session, uploads).await;
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
                let staged = staged?;
                for issue in &staged.issues {
                    eprintln!("  {} {}", red("✗"), issue);
                }
                for page in &session.staged_pages {
                    println!(
                        "  {} {} page {}  {}",
                        green("✓"),
                        page.source,
                        page.page_num,
                        dim(&format!("{}x{}", page.image.width(), page.image.height()))
                    );
                }
                ok(&format!("Total pages/images: {}", staged.pages));
            }
            ShellCommand::Extract { instruction } => {
                let instruction = instruction.join(" ");
                let pages = session.staged_pages.len();
                let bar = (!quiet).then(|| spinner("Extracting", &format!("{pages} page(s)")));
                let reply = app.extract(session, &instruction).await;
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
                let reply = reply?;
                println!("{reply}");
                ok(&format!("Extracted from {pages} page(s). Use `show` to check the JSON."));
            }
            ShellCommand::Show => {
                let raw = session
                    .raw_response
                    .as_deref()
                    .ok_or(InvoiceError::NothingExtracted)?;
                if session.is_admin() {
                    println!("{}", dim("Raw reply (editable with `edit <file>`):"));
                    println!("{raw}");
                }
                let invoice = app.preview(session)?;
                ok("JSON is valid");
                print_record(json, &invoice, || {
                    print_header(
                        invoice.invoice_id.as_deref().unwrap_or("?"),
                        invoice.customer.as_deref(),
                        invoice.invoice_date.as_deref(),
                        invoice.total,
                    );
                    print_items(&invoice.items);
                });
            }
            ShellCommand::Edit { file } => {
                let text = std::fs::read_to_string(&file).map_err(|source| InvoiceError::FileRead {
                    path: file.display().to_string(),
                    source,
                })?;
                app.edit_response(session, &text)?;
                ok("Reply replaced");
            }
            ShellCommand::Insert => {
                let invoice = app.request_insert(session)?;
                print_record(json, &invoice, || {
                    print_header(
                        &invoice.invoice_id,
                        invoice.customer.as_deref(),
                        invoice.invoice_date.as_deref(),
                        invoice.total,
                    );
                    print_items(&invoice.items);
                });
                println!(
                    "{} Are you sure you want to insert this data into the database? {}",
                    cyan("⚠"),
                    dim("(confirm / cancel)")
                );
            }
            ShellCommand::Confirm => {
                let invoice = app.confirm_insert(session)?;
                ok(&format!(
                    "Invoice {} inserted with {} item(s)",
                    bold(&invoice.invoice_id),
                    invoice.items.len()
                ));
            }
            ShellCommand::Cancel => {
                app.cancel_insert(session)?;
                ok("Insert cancelled");
            }
            ShellCommand::Clear => {
                app.clear(session)?;
                ok("Workspace cleared");
            }
            ShellCommand::History { id, customer } => {
                let filter = match (id, customer) {
                    (Some(id), _) => InvoiceFilter::InvoiceId(id),
                    (None, Some(c)) => InvoiceFilter::Customer(c),
                    (None, None) => InvoiceFilter::All,
                };
                let invoices = app.search_invoices(session, &filter)?;
                print_record(json, &invoices, || {
                    if invoices.is_empty() {
                        println!("No invoices found.");
                    }
                    for inv in &invoices {
                        println!(
                            "  {:<16} {:<28} {:<12} {:>12}  {}",
                            inv.invoice_id,
                            inv.customer.as_deref().unwrap_or("-"),
                            inv.invoice_date.as_deref().unwrap_or("-"),
                            money(inv.total),
                            dim(&format!("{} {}", inv.created_by, inv.created_at)),
                        );
                    }
                });
            }
            ShellCommand::Details { invoice_id } => {
                match app.invoice_details(session, &invoice_id)? {
                    Some((header, items)) => {
                        #[derive(Serialize)]
                        struct Details<'a> {
                            #[serde(flatten)]
                            header: &'a edgequake_invoice2sql::InvoiceRecord,
                            items: &'a [LineItem],
                        }
                        let details = Details {
                            header: &header,
                            items: &items,
                        };
                        print_record(json, &details, || {
                            print_header(
                                &header.invoice_id,
                                header.customer.as_deref(),
                                header.invoice_date.as_deref(),
                                header.total,
                            );
                            println!("  Created:   {} by {}", header.created_at, header.created_by);
                            print_items(&items);
                        });
                    }
                    None => println!("Invoice '{invoice_id}' not found."),
                }
            }
            ShellCommand::Ask { question } => {
                let question = question.join(" ");
                let bar = (!quiet).then(|| spinner("Querying", "converting to SQL…"));
                let answer = app.ask(session, &question).await;
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
                let (sql, result) = answer?;
                if json {
                    print_json(&serde_json::json!({ "sql": sql, "result": result }));
                } else {
                    println!("{}", dim("Generated SQL:"));
                    println!("  {sql}");
                    if result.is_empty() {
                        println!("No results found for your query.");
                    } else {
                        println!("  {}", bold(&result.columns.join(" | ")));
                        for row in &result.rows {
                            let cells: Vec<String> = row.iter().map(cell).collect();
                            println!("  {}", cells.join(" | "));
                        }
                    }
                }
            }
            ShellCommand::AddUser {
                username,
                password,
                admin,
            } => {
                app.add_user(session, &username, &password, admin)?;
                ok(&format!("User '{username}' added successfully!"));
            }
            ShellCommand::Users => {
                let users = app.list_users(session)?;
                print_record(json, &users, || {
                    for u in &users {
                        println!(
                            "  {:<20} {:<8} {}",
                            u.username,
                            if u.is_admin { "admin" } else { "user" },
                            dim(&format!("created {}", u.created_at))
                        );
                    }
                });
            }
            ShellCommand::Audit => {
                let entries = app.audit_log(session)?;
                print_record(json, &entries, || {
                    if entries.is_empty() {
                        println!("No audit logs found.");
                    }
                    for e in &entries {
                        println!(
                            "  {}  {:<12} {}  {}",
                            dim(&e.timestamp),
                            e.username,
                            e.action,
                            dim(&e.details)
                        );
                    }
                });
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

/// JSON in `--json` mode, otherwise whatever `human` prints.
fn print_record<T: Serialize + ?Sized>(json: bool, record: &T, human: impl FnOnce()) {
    if json {
        print_json(record);
    } else {
        human();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{} {}", red("✗"), e),
    }
}

/// Read every path, keeping the ones that load and the errors of the rest.
async fn read_uploads(paths: &[PathBuf]) -> (Vec<UploadedFile>, Vec<InvoiceError>) {
    let mut uploads = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();
    for path in paths {
        match UploadedFile::from_path(path).await {
            Ok(file) => uploads.push(file),
            Err(e) => failures.push(e),
        }
    }
    (uploads, failures)
}

fn ok(msg: &str) {
    eprintln!("{} {}", green("✔"), msg);
}

fn report(e: &InvoiceError) {
    eprintln!(
        "{} {}  {}",
        red("✗"),
        e,
        dim(&format!("[{:?}]", e.category()).to_lowercase())
    );
}

fn print_header(id: &str, customer: Option<&str>, date: Option<&str>, total: Option<f64>) {
    println!("  Invoice:   {}", bold(id));
    println!("  Customer:  {}", customer.unwrap_or("-"));
    println!("  Date:      {}", date.unwrap_or("-"));
    println!("  Total:     {}", money(total));
}

fn print_items(items: &[LineItem]) {
    if items.is_empty() {
        println!("  (no line items)");
        return;
    }
    for item in items {
        println!(
            "    {:<36} {:>8} × {:>10}",
            item.description.as_deref().unwrap_or("-"),
            item.quantity.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
            money(item.price),
        );
    }
}

fn money(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn screen_name(screen: Screen) -> &'static str {
    match screen {
        Screen::Extraction => "extraction",
        Screen::History => "history",
        Screen::Query => "query",
        Screen::UserAdmin => "users",
    }
}

fn stage_name(stage: WorkspaceStage) -> &'static str {
    match stage {
        WorkspaceStage::Idle => "idle",
        WorkspaceStage::ImagesStaged => "images staged",
        WorkspaceStage::Extracted => "extracted",
        WorkspaceStage::Edited => "edited",
        WorkspaceStage::ConfirmationPending => "confirmation pending",
    }
}

/// Split a shell line into words. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                let next = chars.next().ok_or("Trailing backslash")?;
                current.push(next);
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unterminated quote".into());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
