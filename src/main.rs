use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use facture_pdf::{
    Action, AppConfig, Client, Document, DocumentKind, DocumentStatus, DocumentStore,
    DraftDocument, Error, LineItem, RenderRequest, documents, format_money,
};

#[derive(Parser)]
#[command(name = "facture-pdf")]
#[command(version, about = "Render invoices and quotes to PDF", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a stored document to a PDF file
    Render {
        #[arg(short, long, default_value = "facture")]
        kind: DocumentKind,
        #[arg(long)]
        id: String,
        /// Mark the file as an attachment rather than inline
        #[arg(long)]
        download: bool,
        /// Output file (defaults to KIND_number.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the number the next document of a kind would get
    NextNumber {
        #[arg(short, long, default_value = "facture")]
        kind: DocumentKind,
        /// Document date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Register or replace a client from a JSON file
    AddClient {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Create a numbered document from a JSON draft
    Create {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Replace the line items of a document from a JSON array
    Amend {
        #[arg(short, long, default_value = "facture")]
        kind: DocumentKind,
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Change the status of a document (draft, sent, accepted)
    Status {
        #[arg(short, long, default_value = "facture")]
        kind: DocumentKind,
        #[arg(long)]
        id: String,
        status: DocumentStatus,
    },
    /// List stored documents of a kind
    List {
        #[arg(short, long, default_value = "facture")]
        kind: DocumentKind,
    },
    /// Convert a quote into a new invoice
    Convert {
        #[arg(long)]
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Serve GET /api/pdf over HTTP
    #[cfg(feature = "server")]
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::Validation(format!("{}: {e}", path.display())))
}

fn sum_of(document: &Document) -> i64 {
    document.line_items.iter().map(LineItem::amount_cents).sum()
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let store = Arc::new(config.open_store()?);

    match cli.command {
        Command::Render {
            kind,
            id,
            download,
            output,
        } => {
            let action = if download { Action::Download } else { Action::View };
            let renderer = config.renderer(store);
            let rendered = renderer.render(&RenderRequest::new(kind, id, action))?;
            let output = output.unwrap_or_else(|| PathBuf::from(&rendered.file_name));
            std::fs::write(&output, &rendered.bytes)?;
            println!(
                "{} ({} page(s), {} bytes)",
                output.display(),
                rendered.page_count,
                rendered.bytes.len()
            );
            if let Some(artifact) = rendered.artifact {
                println!("stored as {}", artifact.url.unwrap_or(artifact.path));
            }
        }
        Command::NextNumber { kind, date } => {
            let scheme = config.numbering.scheme(kind);
            let date = date.unwrap_or_else(today);
            let existing = store.numbers_in_period(kind, &scheme.period_prefix(date))?;
            println!("{}", scheme.next_number(date, &existing));
        }
        Command::AddClient { input } => {
            let client: Client = read_json(&input)?;
            let id = client.id.clone();
            store.insert_client(client)?;
            println!("client {id} saved");
        }
        Command::Create { input } => {
            let draft: DraftDocument = read_json(&input)?;
            let scheme = config.numbering.scheme(draft.kind);
            let document = documents::create(&*store, &draft, scheme)?;
            println!("{} {} ({})", document.kind, document.number, document.id);
        }
        Command::Amend { kind, id, input } => {
            let items: Vec<LineItem> = read_json(&input)?;
            let document = documents::amend(&*store, kind, &id, items)?;
            println!(
                "{} {}: {} line(s), {}",
                document.kind,
                document.number,
                document.line_items.len(),
                format_money(sum_of(&document), &config.render.money)
            );
        }
        Command::Status { kind, id, status } => {
            let document = documents::set_status(&*store, kind, &id, status)?;
            println!("{} {} is {}", document.kind, document.number, document.status);
        }
        Command::List { kind } => {
            for document in store.list_documents(kind)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    document.number,
                    document.date,
                    document.status,
                    format_money(sum_of(&document), &config.render.money),
                    document.id
                );
            }
        }
        Command::Convert { id, date } => {
            let invoice = documents::convert_quote(
                &*store,
                &id,
                date.unwrap_or_else(today),
                &config.numbering.invoice,
            )?;
            println!("{} {} ({})", invoice.kind, invoice.number, invoice.id);
        }
        #[cfg(feature = "server")]
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let renderer = config.renderer(store);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(facture_pdf::server::serve(renderer, &bind))?;
        }
    }
    Ok(())
}
