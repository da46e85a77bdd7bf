//! `ubr`: manage a page's builder sections from the terminal.
//!
//! Usage:
//!   # Against a site (nonce from a logged-in session)
//!   ubr --site https://example.com --page 42 --nonce 5f2c9a1b3e sections
//!   ubr --config ubr.ron move 7 0
//!
//!   # Host data dumped from the editor page (`{"currentPageId":42,"nonce":"..."}`)
//!   ubr --host-data ubr-data.json add 3 4
//!
//!   # Offline demo site; changes last for one invocation
//!   ubr --memory sections
//!
//! Logging goes to stderr, filtered by `RUST_LOG` (default `info`).

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use ubr_client::{
    BlocksApi, ClientConfig, HttpApi, MemoryApi, NoticeQueue, RemoteBlockCatalog, Sidebar,
};
use ubr_types::{BlockId, HostData, PageId, SectionId};

/// Page the in-memory demo site serves.
const DEMO_PAGE: u64 = 42;

#[derive(Parser, Debug)]
#[command(name = "ubr")]
#[command(about = "Manage Unicorn Builder page sections")]
struct Args {
    /// Site root, e.g. https://example.com
    #[arg(long, global = true)]
    site: Option<String>,

    /// Page (post) id whose sections to manage
    #[arg(long, global = true)]
    page: Option<u64>,

    /// Anti-forgery token sent as X-WP-Nonce
    #[arg(long, global = true)]
    nonce: Option<String>,

    /// REST base overriding {site}/wp-json/unicorn-builder/v1
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// RON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON host data with currentPageId and nonce
    #[arg(long, global = true)]
    host_data: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Use the built-in demo site instead of HTTP
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the page's sections in page order
    Sections,
    /// List blocks available for insertion
    Catalog,
    /// Attach catalog blocks to the page, in the given order
    Add {
        #[arg(required = true)]
        block_ids: Vec<String>,
    },
    /// Delete a section from the page
    Remove {
        section_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a section to a zero-based position
    Move { section_id: String, to: usize },
    /// Print the URL of the block editor for a section
    EditUrl { section_id: String },
}

impl Args {
    /// defaults < RON file < host data < environment < flags
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_ron(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(path) = &self.host_data {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading host data {}", path.display()))?;
            config.apply_host(&HostData::from_json(&text)?);
        }
        config.apply_env()?;

        if let Some(site) = &self.site {
            config.site_url = site.clone();
        }
        if let Some(page) = self.page {
            config.page_id = PageId::new(page);
        }
        if let Some(nonce) = &self.nonce {
            config.auth_token = nonce.clone();
        }
        if let Some(base) = &self.api_base {
            config.api_base_url = Some(base.clone());
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        if self.memory && !config.page_id.is_set() {
            config.page_id = PageId::new(DEMO_PAGE);
        }
        config.validate()?;
        Ok(config)
    }

    fn api(&self, config: &ClientConfig) -> Result<Arc<dyn BlocksApi>> {
        if self.memory {
            tracing::info!("Using in-memory demo site");
            return Ok(Arc::new(MemoryApi::demo().with_token(config.auth_token.clone())));
        }
        Ok(Arc::new(HttpApi::new(config)?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = args.client_config()?;
    let api = args.api(&config)?;
    let notices = Arc::new(NoticeQueue::new());
    let mut sidebar = Sidebar::new(api.clone(), &config, notices.clone())?;

    let result = run(&args.command, &mut sidebar, api, &config).await;
    for notice in notices.drain() {
        println!("[{}] {}", notice.level, notice.message);
    }
    result
}

async fn run(
    command: &Command,
    sidebar: &mut Sidebar,
    api: Arc<dyn BlocksApi>,
    config: &ClientConfig,
) -> Result<()> {
    match command {
        Command::Sections => {
            sidebar.start().await?;
            print_sections(sidebar);
        }
        Command::Catalog => {
            let catalog = RemoteBlockCatalog::new(api, config.request_timeout());
            for block in catalog.fetch().await? {
                match &block.description {
                    Some(description) => println!("{:>6}  {}  {}", block.id, block.name, description),
                    None => println!("{:>6}  {}", block.id, block.name),
                }
            }
        }
        Command::Add { block_ids } => {
            sidebar.start().await?;
            sidebar.open_add_flow().await;
            if sidebar.add_flow().is_blocked() {
                bail!("block catalog unavailable");
            }
            for id in block_ids {
                sidebar.toggle_block(BlockId::from(id.as_str()));
            }
            match sidebar.confirm_add().await {
                Some(outcome) if outcome.is_success() => print_sections(sidebar),
                Some(outcome) => bail!("{} of {} blocks failed", outcome.failed().len(), outcome.total()),
                None => bail!("nothing was added"),
            }
        }
        Command::Remove { section_id, yes } => {
            sidebar.start().await?;
            let id = SectionId::from(section_id.as_str());
            let Some(prompt) = sidebar.request_delete(&id) else {
                bail!("section {id} is not on page {}", config.page_id);
            };
            if !yes && !confirm(&prompt)? {
                sidebar.cancel_delete();
                return Ok(());
            }
            if let Some(result) = sidebar.confirm_delete().await {
                result?;
            }
        }
        Command::Move { section_id, to } => {
            sidebar.start().await?;
            let id = SectionId::from(section_id.as_str());
            let ids = sidebar.store().ids();
            let Some(from) = ids.iter().position(|s| s == &id) else {
                bail!("section {id} is not on page {}", config.page_id);
            };
            if *to >= ids.len() {
                bail!("position {to} is past the end of a {}-section page", ids.len());
            }
            sidebar.drag_start(from);
            match sidebar.drag_end(Some(*to)).await {
                Some(result) => result?,
                None => println!("{id} is already at position {to}"),
            }
            print_sections(sidebar);
        }
        Command::EditUrl { section_id } => {
            let url = sidebar.open_editor(SectionId::from(section_id.as_str()))?;
            println!("{url}");
        }
    }
    Ok(())
}

fn print_sections(sidebar: &Sidebar) {
    for (i, section) in sidebar.sections().iter().enumerate() {
        println!("{i:>3}. {:<24} id={:<6} type={}", section.title, section.id, section.kind);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
