//! # notegraph CLI (`ng`)
//!
//! ## Usage
//!
//! ```bash
//! ng --config ./config/ng.toml [--project <name>] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ng init` | Create the SQLite database and the project home |
//! | `ng write-note` | Create or update a markdown note |
//! | `ng read-note <id>` | Print a note by path, title, or memory URL |
//! | `ng canvas` | Create or update a JSON Canvas file |
//! | `ng relate <from> <to>` | Record a typed relation |
//! | `ng build-context <url>` | Graph context around a memory URL |
//! | `ng recent-activity` | Graph context around recently updated entities |
//! | `ng continue` | Context for resuming work on a topic |
//! | `ng search "<query>"` | Full-text search |
//! | `ng scan` | Re-import files edited outside notegraph |
//! | `ng reindex` | Rebuild the search index from disk |
//!
//! Logs go to stderr; set `NG_LOG=debug` for per-step detail.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use notegraph::app::AppContext;
use notegraph::context::ContextOptions;
use notegraph::{canvas, config, context, migrate, note, relations, scan, search};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// notegraph: notes on disk, records and search in SQLite, graph context
/// for AI tools.
#[derive(Parser)]
#[command(name = "ng", version, about = "notegraph: a local-first knowledge graph for notes")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ng.toml")]
    config: PathBuf,

    /// Project to operate on. Defaults to `default_project` from the config.
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and the project home directory.
    ///
    /// Idempotent; running it repeatedly is safe.
    Init,

    /// Create or update a markdown note.
    ///
    /// Content comes from `--content` or, when absent, from piped stdin:
    /// `echo "# Hello" | ng write-note --title Hello --folder notes`.
    WriteNote {
        #[arg(long)]
        title: String,

        /// Folder relative to the project home.
        #[arg(long)]
        folder: String,

        #[arg(long)]
        content: Option<String>,

        /// Tags to record in the frontmatter. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Print a note by file path, title, or memory URL.
    ReadNote {
        identifier: String,

        /// Page of search suggestions when nothing matches exactly.
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },

    /// Create or update a JSON Canvas file.
    Canvas {
        /// JSON array of canvas nodes.
        #[arg(long)]
        nodes: String,

        /// JSON array of canvas edges.
        #[arg(long)]
        edges: String,

        /// Canvas title; saved as `<title>.canvas`.
        #[arg(long)]
        title: String,

        #[arg(long)]
        folder: String,
    },

    /// Record a relation between two entities.
    ///
    /// An unknown target is stored as a forward reference and resolved when
    /// an entity with that title is created.
    Relate {
        from: String,
        to: String,

        #[arg(long = "type", default_value = "relates_to")]
        relation_type: String,
    },

    /// Build graph context around a memory URL.
    ///
    /// `memory://notes/a.md` resolves by path, then path suffix, then title;
    /// `memory://notes/*` matches a glob.
    BuildContext {
        url: String,

        #[command(flatten)]
        options: ContextArgs,
    },

    /// Build graph context around recently updated entities.
    RecentActivity {
        /// Only these entity types (e.g. `note`, `canvas`). Repeatable.
        #[arg(long = "type")]
        types: Vec<String>,

        #[command(flatten)]
        options: ContextArgs,
    },

    /// Context for picking up where a previous session left off.
    Continue {
        /// Topic to search for. Without one, recent activity is used.
        #[arg(long)]
        topic: Option<String>,

        #[command(flatten)]
        options: ContextArgs,
    },

    /// Full-text search across notes and canvases.
    Search {
        query: String,

        /// Match titles only.
        #[arg(long)]
        title: bool,

        /// Only results updated within this window, e.g. `2d`, `1 week`.
        #[arg(long)]
        after_date: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },

    /// Re-import files edited outside notegraph.
    Scan,

    /// Rebuild the search index from the files on disk.
    Reindex,
}

/// Flags shared by the context commands. Unset values come from `[context]`.
#[derive(Args)]
struct ContextArgs {
    #[arg(long)]
    depth: Option<usize>,

    /// How far back to look, e.g. `7d`, `24h`, `2 weeks`, `today`.
    #[arg(long)]
    timeframe: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    max_related: Option<usize>,
}

impl From<ContextArgs> for ContextOptions {
    fn from(args: ContextArgs) -> Self {
        ContextOptions {
            depth: args.depth,
            timeframe: args.timeframe,
            page: args.page,
            page_size: args.page_size,
            max_related: args.max_related,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Note content from the flag, or from stdin when it is piped.
fn note_content(content: Option<String>) -> Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    if atty::is(atty::Stream::Stdin) {
        bail!("No content provided. Please provide content via --content or by piping to stdin.");
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read note content from stdin")?;
    Ok(buffer)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        let project = cfg.project(cli.project.as_deref())?;
        std::fs::create_dir_all(&project.home).with_context(|| {
            format!("Failed to create project home: {}", project.home.display())
        })?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let app = AppContext::open(&cfg, cli.project.as_deref()).await?;
    let result = run(&app, cli.command).await;
    app.close().await;
    result
}

async fn run(app: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {}
        Commands::WriteNote {
            title,
            folder,
            content,
            tags,
        } => {
            let content = note_content(content)?;
            note::run_write_note(app, &title, &folder, &content, &tags).await?;
        }
        Commands::ReadNote {
            identifier,
            page,
            page_size,
        } => {
            note::run_read_note(app, &identifier, page, page_size).await?;
        }
        Commands::Canvas {
            nodes,
            edges,
            title,
            folder,
        } => {
            canvas::run_canvas(app, &nodes, &edges, &title, &folder).await?;
        }
        Commands::Relate {
            from,
            to,
            relation_type,
        } => {
            relations::run_relate(app, &from, &to, &relation_type).await?;
        }
        Commands::BuildContext { url, options } => {
            context::run_build_context(app, &url, options.into()).await?;
        }
        Commands::RecentActivity { types, options } => {
            context::run_recent_activity(app, types, options.into()).await?;
        }
        Commands::Continue { topic, options } => {
            context::run_continue(app, topic.as_deref(), options.into()).await?;
        }
        Commands::Search {
            query,
            title,
            after_date,
            page,
            page_size,
        } => {
            search::run_search(app, &query, title, after_date.as_deref(), page, page_size).await?;
        }
        Commands::Scan => {
            scan::run_scan(app).await?;
        }
        Commands::Reindex => {
            scan::run_reindex(app).await?;
        }
    }
    Ok(())
}
