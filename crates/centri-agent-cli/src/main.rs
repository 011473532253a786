use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;

use centri_agent::config::LoggingConfig;
use centri_agent::*;

#[derive(Parser)]
#[command(
    name = "centri-agent",
    about = "Call the Centrifugo server HTTP API from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// API base URL (overrides config and CENTRI_HOST)
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key (overrides config and CENTRI_KEY)
    #[arg(long, global = true)]
    key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: plain or json
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server node information
    Info,

    /// List active channels
    Channels {
        /// Only channels matching this pattern
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Publish JSON data into a channel
    Publish {
        #[arg(long)]
        channel: String,
        /// JSON payload
        #[arg(long)]
        data: String,
        #[arg(long)]
        idempotency_key: Option<String>,
        #[arg(long)]
        skip_history: bool,
    },

    /// Publish JSON data into several channels
    Broadcast {
        /// Target channel (repeatable)
        #[arg(long = "channel", required = true)]
        channels: Vec<String>,
        /// JSON payload
        #[arg(long)]
        data: String,
    },

    /// Subscribe a user to a channel
    Subscribe {
        #[arg(long)]
        user: String,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        client: Option<String>,
    },

    /// Unsubscribe a user from a channel
    Unsubscribe {
        #[arg(long)]
        user: String,
        #[arg(long)]
        channel: String,
    },

    /// Disconnect a user
    Disconnect {
        #[arg(long)]
        user: String,
        #[arg(long)]
        client: Option<String>,
    },

    /// Refresh a user's connection
    Refresh {
        #[arg(long)]
        user: String,
        /// New expiry, RFC 3339 (e.g. 2026-01-01T00:00:00Z)
        #[arg(long)]
        expire_at: Option<String>,
        /// Mark the connection as expired
        #[arg(long)]
        expired: bool,
    },

    /// Show clients subscribed to a channel
    Presence {
        #[arg(long)]
        channel: String,
    },

    /// Show client and user counts for a channel
    PresenceStats {
        #[arg(long)]
        channel: String,
    },

    /// Show channel history
    History {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        limit: Option<i32>,
        #[arg(long)]
        reverse: bool,
    },

    /// Remove channel history
    HistoryRemove {
        #[arg(long)]
        channel: String,
    },

    /// Run a batch of commands read from a JSON file ("-" for stdin)
    Batch {
        #[arg(long)]
        file: String,
    },

    /// Call any method with a raw JSON body
    Call {
        /// Method name, e.g. presence_stats
        method: String,
        /// JSON body (default: {})
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(AgentConfig::default_path);
    let mut config = if config_path.exists() {
        AgentConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        AgentConfig::from_env()
    };

    init_logging(&cli, config.logging.as_ref());

    if cli.url.is_some() {
        config.url = cli.url.clone();
    }
    if cli.key.is_some() {
        config.api_key = cli.key.clone();
    }

    let agent = CentriAgent::from_config(&config).context("Invalid client configuration")?;
    agent.hooks().observe(Arc::new(TracingObserver));
    tracing::debug!(base_url = agent.base_url(), "Using Centrifugo API");

    let output = run(&agent, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(cli: &Cli, logging: Option<&LoggingConfig>) {
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "warn".into())
    };
    let mut directives = vec![level];
    if let Some(l) = logging {
        directives.extend(l.filters.iter().cloned());
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives.join(",")));

    let to_stdout = logging.is_some_and(|l| l.output == "stdout");
    let writer = if to_stdout {
        tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout)
    } else {
        tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr)
    };

    let format = cli
        .log_format
        .clone()
        .or_else(|| logging.map(|l| l.format.clone()))
        .unwrap_or_else(|| "plain".into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_json(raw: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON"))
}

fn to_json<T: serde::Serialize>(value: T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn run(agent: &CentriAgent, command: Commands) -> anyhow::Result<Value> {
    match command {
        Commands::Info => to_json(agent.info(&InfoRequest {}).await?),

        Commands::Channels { pattern } => {
            let request = ChannelsRequest { pattern };
            to_json(agent.channels(&request).await?)
        }

        Commands::Publish {
            channel,
            data,
            idempotency_key,
            skip_history,
        } => {
            let mut request = PublishRequest::new(channel, parse_json(&data, "--data")?);
            request.idempotency_key = idempotency_key;
            if skip_history {
                request = request.skip_history(true);
            }
            to_json(agent.publish(&request).await?)
        }

        Commands::Broadcast { channels, data } => {
            let request = BroadcastRequest::new(channels, parse_json(&data, "--data")?);
            to_json(agent.broadcast(&request).await?)
        }

        Commands::Subscribe {
            user,
            channel,
            client,
        } => {
            let mut request = SubscribeRequest::new(user, channel);
            request.client = client;
            to_json(agent.subscribe(&request).await?)
        }

        Commands::Unsubscribe { user, channel } => {
            to_json(agent.unsubscribe(&UnsubscribeRequest::new(user, channel)).await?)
        }

        Commands::Disconnect { user, client } => {
            let mut request = DisconnectRequest::new(user);
            request.client = client;
            to_json(agent.disconnect(&request).await?)
        }

        Commands::Refresh {
            user,
            expire_at,
            expired,
        } => {
            let mut request = RefreshRequest::new(user);
            if let Some(at) = expire_at {
                let at = chrono::DateTime::parse_from_rfc3339(&at)
                    .with_context(|| format!("Invalid --expire-at: {at}"))?;
                request = request.expire_at_time(at.with_timezone(&chrono::Utc));
            }
            if expired {
                request = request.expired(true);
            }
            to_json(agent.refresh(&request).await?)
        }

        Commands::Presence { channel } => {
            to_json(agent.presence(&PresenceRequest::new(channel)).await?)
        }

        Commands::PresenceStats { channel } => {
            to_json(agent.presence_stats(&PresenceStatsRequest::new(channel)).await?)
        }

        Commands::History {
            channel,
            limit,
            reverse,
        } => {
            let mut request = HistoryRequest::new(channel);
            request.limit = limit;
            if reverse {
                request = request.reverse(true);
            }
            to_json(agent.history(&request).await?)
        }

        Commands::HistoryRemove { channel } => {
            to_json(agent.history_remove(&HistoryRemoveRequest::new(channel)).await?)
        }

        Commands::Batch { file } => {
            let request = read_batch(&file)?;
            let response = agent.batch(&request).await?;
            warn_on_misalignment(&request, &response);
            to_json(response)
        }

        Commands::Call { method, body } => {
            let (method, body) = call_target(&method, body.as_deref())?;
            Ok(agent.call(method.path(), &body).await?)
        }
    }
}

fn call_target(method: &str, body: Option<&str>) -> anyhow::Result<(Method, Value)> {
    let method: Method = method.parse()?;
    let body = match body {
        Some(raw) => parse_json(raw, "body")?,
        None => Value::Object(Default::default()),
    };
    Ok((method, body))
}

fn warn_on_misalignment(request: &BatchRequest, response: &BatchResponse) -> Option<AlignmentError> {
    let err = response.check_alignment(&request.commands).err()?;
    tracing::warn!(%err, "Batch replies do not line up with commands");
    Some(err)
}

/// Accepts `{"commands": [...]}` or a bare `[...]` of commands.
fn read_batch(file: &str) -> anyhow::Result<BatchRequest> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?
    };

    let value = parse_json(&raw, "batch file")?;
    let request = if value.is_array() {
        BatchRequest {
            commands: serde_json::from_value(value).context("Invalid batch commands")?,
        }
    } else {
        serde_json::from_value(value).context("Invalid batch request")?
    };
    if request.is_empty() {
        bail!("Batch file contains no commands");
    }
    Ok(request)
}
