//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use gas_core::collect::{
    AppEvent, AppView, EndpointTable, Event, Exception, Item, PageView, Social, Timing,
    Transaction,
};
use gas_core::config::parse_flag;
use gas_core::{
    GasConfig, Hit, HitSender, HttpHitSender, Result, Tracker, TrackerConfig, TrackerSettings,
};
use gas_sim::SimulatedHitSender;

/// Tracker settings given on the command line.
///
/// Flags override `GAS_*` environment variables, which override the JSON file.
#[derive(Args, Debug, Default)]
pub struct TrackerArgs {
    /// Tracking ID of the destination property
    #[arg(long, global = true)]
    pub tracking_id: Option<String>,

    /// Anonymous client ID; a random UUID is used when none is configured
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Default document hostname
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Send hits to the TLS endpoint; `--ssl=false` forces plain HTTP
    #[arg(
        long,
        global = true,
        value_parser = parse_ssl_flag,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub ssl: Option<bool>,

    /// Campaign source label
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// JSON settings file with trackingId, clientId, domainApp, useSSL, source
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Send to this collector URL instead of the public endpoints
    #[arg(long, global = true)]
    pub collector: Option<String>,

    /// Print the request instead of sending it
    #[arg(long, global = true)]
    pub dry_run: bool,
}

fn parse_ssl_flag(value: &str) -> std::result::Result<bool, String> {
    parse_flag(value).ok_or_else(|| format!("Invalid SSL flag: {value}"))
}

impl TrackerArgs {
    fn to_settings(&self) -> TrackerSettings {
        TrackerSettings {
            tracking_id: self.tracking_id.clone(),
            client_id: self.client_id.clone(),
            domain_app: self.domain.clone(),
            use_ssl: self.ssl,
            source: self.source.clone(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track a page view
    Pageview {
        /// Document hostname, defaults to the configured domain
        #[arg(long)]
        host: Option<String>,
        /// Document path
        #[arg(long, default_value = "/")]
        page: String,
        /// Document title, defaults to the page
        #[arg(long)]
        title: Option<String>,
    },
    /// Track an event
    Event {
        category: String,
        action: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    /// Track an e-commerce transaction
    Transaction {
        transaction_id: String,
        #[arg(long)]
        affiliation: Option<String>,
        #[arg(long)]
        revenue: Option<String>,
        #[arg(long)]
        shipping: Option<String>,
        #[arg(long)]
        tax: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Track an e-commerce item
    Item {
        transaction_id: String,
        name: String,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        variation: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Track a social interaction
    Social {
        action: String,
        network: String,
        target: String,
    },
    /// Track an exception
    Exception {
        #[arg(long)]
        description: Option<String>,
        /// Mark the exception as fatal; omitted sends an empty `exf`
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        fatal: Option<bool>,
    },
    /// Track a user timing
    Timing {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        variable: Option<String>,
        /// Time in milliseconds
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        dns: Option<String>,
        #[arg(long)]
        page_download: Option<String>,
        #[arg(long)]
        redirect: Option<String>,
        #[arg(long)]
        tcp: Option<String>,
        #[arg(long)]
        server_response: Option<String>,
    },
    /// Track a mobile app screen view
    Appview {
        app_name: String,
        app_version: String,
        screen: String,
    },
    /// Track a mobile app event
    AppEvent {
        app_name: String,
        category: String,
        action: String,
    },
    /// Print the collection endpoint hits would be sent to
    Endpoint,
}

impl Commands {
    /// Converts a tracking command into its hit; `None` for non-tracking commands.
    pub fn into_hit(self) -> Option<Hit> {
        let hit: Hit = match self {
            Commands::Pageview { host, page, title } => PageView {
                host,
                page: Some(page),
                title,
            }
            .into(),
            Commands::Event {
                category,
                action,
                label,
                value,
            } => Event {
                category,
                action,
                label,
                value,
            }
            .into(),
            Commands::Transaction {
                transaction_id,
                affiliation,
                revenue,
                shipping,
                tax,
                currency,
            } => Transaction {
                transaction_id,
                affiliation,
                revenue,
                shipping,
                tax,
                currency,
            }
            .into(),
            Commands::Item {
                transaction_id,
                name,
                price,
                quantity,
                code,
                variation,
                currency,
            } => Item {
                transaction_id,
                name,
                price,
                quantity,
                code,
                variation,
                currency,
            }
            .into(),
            Commands::Social {
                action,
                network,
                target,
            } => Social::new(action, network, target).into(),
            Commands::Exception { description, fatal } => Exception { description, fatal }.into(),
            Commands::Timing {
                category,
                variable,
                time,
                label,
                dns,
                page_download,
                redirect,
                tcp,
                server_response,
            } => Timing {
                category,
                variable,
                time,
                label,
                dns,
                page_download,
                redirect,
                tcp,
                server_response,
            }
            .into(),
            Commands::Appview {
                app_name,
                app_version,
                screen,
            } => AppView::new(app_name, app_version, screen).into(),
            Commands::AppEvent {
                app_name,
                category,
                action,
            } => AppEvent::new(app_name, category, action).into(),
            Commands::Endpoint => return None,
        };
        Some(hit)
    }
}

/// Layers file, environment and flag settings, then validates them.
///
/// # Errors
/// - `GasError::Configuration` - Settings file unreadable or required setting missing
pub fn resolve_tracker_config(
    args: &TrackerArgs,
    env_settings: TrackerSettings,
) -> Result<TrackerConfig> {
    let file_settings = match &args.config {
        Some(path) => TrackerSettings::from_json_file(path)?,
        None => TrackerSettings::default(),
    };

    let mut settings = file_settings.merge(env_settings).merge(args.to_settings());

    if settings.client_id.is_none() {
        let client_id = uuid::Uuid::new_v4().to_string();
        tracing::info!("No client ID configured, using {}", client_id);
        settings.client_id = Some(client_id);
    }

    Ok(TrackerConfig::from_settings(settings)?)
}

/// Handle the CLI command
///
/// # Errors
/// - `GasError::Configuration` - Tracker settings are incomplete
/// - `GasError::Transport` - The hit could not be delivered
pub async fn handle_command(args: TrackerArgs, command: Commands) -> Result<()> {
    let env_config = GasConfig::from_env();
    let config = resolve_tracker_config(&args, env_config.tracker)?;
    let endpoints = match &args.collector {
        Some(url) => EndpointTable::single(url.clone()),
        None => EndpointTable::default(),
    };

    if args.dry_run {
        let sender = Arc::new(SimulatedHitSender::new());
        let tracker = Tracker::with_config(config, Arc::clone(&sender)).with_endpoints(endpoints);
        run(&tracker, command).await?;

        if let Some(request) = sender.last_request() {
            println!("POST {}", request.url);
            println!("{}", request.form_body);
        }
        return Ok(());
    }

    let sender = HttpHitSender::new(&env_config.network)?;
    let tracker = Tracker::with_config(config, sender).with_endpoints(endpoints);
    if let Some(status) = run(&tracker, command).await? {
        println!("{status}");
    }

    Ok(())
}

async fn run<S: HitSender>(tracker: &Tracker<S>, command: Commands) -> Result<Option<u16>> {
    match command.into_hit() {
        Some(hit) => Ok(Some(tracker.track(&hit).await?)),
        None => {
            println!("{}", tracker.resolve_endpoint());
            Ok(None)
        }
    }
}
