use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;
use ytmcp::config::{ConfigLoader, Settings};
use ytmcp::types::SearchQuery;
use ytmcp::{relay, McpServer, ToolProvider, YouTubeClient};

/// YouTube search over the Model Context Protocol
///
/// Serves YouTube Data API searches as MCP tools, or relays searches to a
/// remote MCP tool server and merges the results.
#[derive(Parser, Debug)]
#[command(name = "ytmcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the YouTube search tool server
    Serve {
        /// Transport to serve on
        #[arg(long, value_enum, default_value_t = Mode::Stdio)]
        mode: Mode,

        /// Listen host for HTTP mode
        #[arg(long)]
        host: Option<String>,

        /// Listen port for HTTP mode
        #[arg(long)]
        port: Option<u16>,
    },

    /// Search through a remote MCP tool server
    Search {
        /// Search terms
        query: String,

        /// Content kind: all, video, channel or playlist
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// Results per content kind (clamped to 1-50)
        #[arg(short = 'n', long, default_value_t = 10)]
        max_results: i64,

        /// Tool server URL
        #[arg(long)]
        server_url: Option<Url>,
    },

    /// List the search tools a remote server advertises
    Tools {
        /// Tool server URL
        #[arg(long)]
        server_url: Option<Url>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Stdio,
    Http,
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // stdout carries the protocol in stdio mode, so logs never go there
    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

async fn serve(mut settings: Settings, mode: Mode, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    if settings.youtube.api_key.is_none() {
        tracing::warn!("No YouTube API key configured; every search will fail until YOUTUBE_API_KEY is set");
    }

    let youtube = YouTubeClient::new(
        settings.youtube.api_key.clone(),
        settings.youtube.base_url.as_str(),
        settings.client.request_timeout,
    )?;
    let tools = ToolProvider::new(Arc::new(youtube)).with_default_order(settings.youtube.default_order);
    let server = Arc::new(McpServer::new(tools));

    match mode {
        Mode::Stdio => {
            info!("ytmcp server starting - ready to accept MCP requests on stdio");
            server.run_stdio().await?;
        }
        Mode::Http => {
            let addr = settings.server.addr()?;
            server.run_http(addr).await?;
        }
    }

    info!("MCP server stopped normally");
    Ok(())
}

async fn search(mut settings: Settings, query: SearchQuery, server_url: Option<Url>) -> Result<()> {
    if let Some(url) = server_url {
        settings.client.server_url = url;
    }

    let aggregator = relay::connect(&settings.client)?;
    let outcome = aggregator.search(query).await.context("search failed")?;

    if outcome.partial {
        tracing::warn!("Partial results, failed kinds: {:?}", outcome.failed_kinds);
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn list_tools(mut settings: Settings, server_url: Option<Url>) -> Result<()> {
    if let Some(url) = server_url {
        settings.client.server_url = url;
    }

    let aggregator = relay::connect(&settings.client)?;
    let descriptors = aggregator
        .gateway()
        .catalog()
        .descriptors()
        .await
        .context("tool discovery failed")?;

    for descriptor in descriptors.iter() {
        let kind = descriptor.kind.map(|k| k.as_str()).unwrap_or("-");
        println!(
            "{:<28} {:<9} max {:<3} {}",
            descriptor.name, kind, descriptor.schema.max_results, descriptor.description
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.log_file)?;

    info!("Starting ytmcp v{}", env!("CARGO_PKG_VERSION"));

    let loader = ConfigLoader::new().context("failed to load configuration")?;
    let settings = loader.settings().context("invalid configuration")?;

    match args.command {
        Command::Serve { mode, host, port } => serve(settings, mode, host, port).await,
        Command::Search {
            query,
            kind,
            max_results,
            server_url,
        } => {
            let query = SearchQuery {
                q: query,
                kind,
                max_results,
            };
            search(settings, query, server_url).await
        }
        Command::Tools { server_url } => list_tools(settings, server_url).await,
    }
}
