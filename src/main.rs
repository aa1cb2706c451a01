mod tui;

use anyhow::Context;
use clap::{Parser, Subcommand};
use course_rag::{AnswerResult, Assistant, Config};

#[derive(Parser)]
#[command(name = "pantherbot", version, about = "PantherBot – UWM course assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal chat (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Print the full answer record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Embed the course catalog into the vector index
    Index,
    /// Show raw nearest-neighbour results without generating an answer
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(short, default_value_t = 3)]
        k: usize,
    },
    /// Catalog size and number of indexed documents
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat);
    init_tracing(matches!(command, Command::Chat));

    let cfg = Config::from_env();
    let assistant = Assistant::from_config(&cfg).context("failed to start PantherBot")?;
    tracing::debug!(?assistant, "assistant ready");

    match command {
        Command::Chat => tui::run(assistant)?,
        Command::Ask { question, json } => {
            let result = assistant.ask(&question.join(" "));
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_answer(&result);
            }
        }
        Command::Index => {
            let stored = assistant
                .index_catalog()
                .context("indexing the course catalog failed")?;
            println!("Indexed {stored} courses into `{}`.", cfg.collection);
        }
        Command::Search { query, k } => {
            let query = query.join(" ");
            let hits = assistant.search(&query, k)?;
            println!("Question: {query}");
            if hits.is_empty() {
                println!("(no matching documents)");
            }
            for hit in hits {
                println!("\n---\nTitle: {}\nURL:   {}", hit.title, hit.url);
                println!("Text:  {}", tui::preview(&hit.text, 400));
            }
        }
        Command::Stats => {
            match assistant.catalog() {
                Some(catalog) => println!(
                    "Catalog: {} courses from {}",
                    catalog.len(),
                    catalog
                        .source()
                        .map_or_else(|| "memory".to_string(), |p| p.display().to_string())
                ),
                None => println!("Catalog: not loaded (exact lookup disabled)"),
            }
            let count = assistant
                .indexed_count()
                .context("could not read the vector index")?;
            println!("Vector index `{}`: {count} documents", cfg.collection);
        }
    }

    Ok(())
}

fn print_answer(result: &AnswerResult) {
    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!("\nSources:");
        print!("{}", tui::render_sources(&result.sources));
    }
}

fn init_tracing(tui_active: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // The chat UI owns the terminal, so its logs go to a file.
    if tui_active {
        if let Ok(file) = std::fs::File::create("pantherbot.log") {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
            return;
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
