use clap::{Parser, Subcommand};
use rera_core::create_project_table;
use rera_scrapers::{fetch_wikipedia_summary, ScrapeController, ScrapeOptions, DEFAULT_LISTING_URL};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run the browser with a visible window instead of headless
    #[arg(long, global = true)]
    headed: bool,

    /// Listing URL to traverse (-u, --url)
    #[arg(short = 'u', long, global = true, default_value = DEFAULT_LISTING_URL)]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the project listing, following into every detail view
    Scrape(ScrapeCommand),

    /// Look up a single project by its registration number
    Find(FindCommand),

    /// List all projects by a developer (case-insensitive substring)
    Developer(DeveloperCommand),

    /// Print summary statistics over the full listing
    Summary,

    /// Scrape and export the record set to a file
    Export(ExportCommand),

    /// Fetch the lead paragraph of a Wikipedia article
    Wiki(WikiCommand),
}

#[derive(Parser)]
struct ScrapeCommand {
    /// Maximum number of listing pages to traverse (-c, --max-pages)
    #[arg(short = 'c', long)]
    max_pages: Option<u32>,

    /// Print the full result envelope as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct FindCommand {
    /// The regulator-issued registration number
    registration_number: String,
}

#[derive(Parser)]
struct DeveloperCommand {
    /// Developer name or fragment to search for
    name: String,
}

#[derive(Parser)]
struct ExportCommand {
    /// Output format (-f, --format): json, csv, or tsv
    #[arg(short = 'f', long, default_value = "json")]
    format: String,

    /// Output file path (-o, --output); defaults to a timestamped name
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Maximum number of listing pages to traverse (-c, --max-pages)
    #[arg(short = 'c', long)]
    max_pages: Option<u32>,
}

#[derive(Parser)]
struct WikiCommand {
    /// Article title, underscores for spaces (e.g. Albert_Einstein)
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    let controller = ScrapeController::new(ScrapeOptions {
        headless: !cli.headed,
        listing_url: cli.url.clone(),
    });

    match cli.command {
        Commands::Scrape(cmd) => {
            let result = controller.get_projects(cmd.max_pages).await;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.message);
                if !result.data.is_empty() {
                    println!("{}", create_project_table(&result.data));
                }
                println!(
                    "{} projects, {} detail URLs in {:.1}s",
                    result.total_projects, result.total_urls, result.execution_time
                );
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Find(cmd) => {
            let lookup = controller
                .get_project_by_registration(&cmd.registration_number)
                .await;
            println!("{}", serde_json::to_string_pretty(&lookup)?);
            if !lookup.success {
                std::process::exit(1);
            }
        }
        Commands::Developer(cmd) => {
            let search = controller.get_projects_by_developer(&cmd.name).await;
            println!("{}", search.message);
            if !search.data.is_empty() {
                println!("{}", create_project_table(&search.data));
            }
            if !search.success {
                std::process::exit(1);
            }
        }
        Commands::Summary => {
            let summary = controller.get_projects_summary().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if !summary.success {
                std::process::exit(1);
            }
        }
        Commands::Export(cmd) => {
            let outcome = controller
                .export_projects(&cmd.format, cmd.output.as_deref(), cmd.max_pages)
                .await;
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::Wiki(cmd) => {
            let summary = fetch_wikipedia_summary(&cmd.title, !cli.headed).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if !summary.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
