//! nimbus: drive Nimbus cloud resources toward a declared state.
//!
//! Each invocation reconciles one resource (instance or load balancer):
//! look up by uuid or name, create it if missing, transition activation,
//! optionally block until converged. The result is printed as JSON with a
//! `changed` flag the calling automation layer can branch on.

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tabled::{Table, Tabled};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nimbus_api::{
    Backend, CloudApi, CreateSpec, DesiredState, HttpCloudApi, Identity, InstanceSpec,
    LoadBalancerSpec, Protocol, ResourceKind, ResourceState,
};
use nimbus_cli::config;
use nimbus_cli::reconciler::{ApplyOptions, ApplyOutcome, Reconciler};

/// CLI for the Nimbus cloud provisioner
#[derive(Parser)]
#[command(name = "nimbus", version, about, long_about = None)]
struct Cli {
    /// API endpoint base URL
    #[arg(long, default_value = "https://api.nimbus-cloud.net/v1")]
    endpoint: String,

    /// API key (falls back to NIMBUS_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API secret (falls back to NIMBUS_API_SECRET)
    #[arg(long)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive an instance toward a desired state
    Instance(InstanceArgs),
    /// Drive a load balancer toward a desired state
    Loadbalancer(LoadBalancerArgs),
    /// List resources of one kind
    List {
        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Instance,
    Loadbalancer,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Instance => ResourceKind::Instance,
            KindArg::Loadbalancer => ResourceKind::LoadBalancer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    /// Resource exists and is activated
    #[value(alias = "active")]
    Present,
    /// Resource is deleted
    #[value(alias = "deleted")]
    Absent,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => DesiredState::Present,
            StateArg::Absent => DesiredState::Absent,
        }
    }
}

/// Identity, desired state, and wait flags shared by both kinds.
#[derive(Args)]
struct CommonArgs {
    /// Resource uuid
    #[arg(long)]
    uuid: Option<String>,

    /// Resource name (also used as the creation name)
    #[arg(long)]
    name: Option<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    state: StateArg,

    /// Honor name-based lookup (assert names are unique)
    #[arg(long)]
    unique_name: bool,

    /// Block until the resource converges
    #[arg(long)]
    wait: bool,

    /// Wait timeout in seconds
    #[arg(long, default_value = "300")]
    wait_timeout: u64,
}

#[derive(Args)]
struct InstanceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Instance size, required to create
    #[arg(long)]
    size: Option<String>,

    /// Image identifier, required to create
    #[arg(long)]
    image: Option<String>,

    /// Network uuid to attach (repeatable)
    #[arg(long = "network")]
    networks: Vec<String>,

    /// SSH public key to install
    #[arg(long)]
    ssh_key: Option<String>,
}

#[derive(Args)]
struct LoadBalancerArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frontend protocol (http, https, tcp), required to create
    #[arg(long)]
    protocol: Option<Protocol>,

    /// Frontend port, required to create
    #[arg(long)]
    port: Option<u16>,

    /// Backend as ip:port[:weight] (repeatable)
    #[arg(long = "backend")]
    backends: Vec<Backend>,

    /// Domain to serve (repeatable)
    #[arg(long = "domain")]
    domains: Vec<String>,
}

impl CommonArgs {
    fn identity(&self) -> Identity {
        Identity {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
        }
    }

    fn options(&self) -> ApplyOptions {
        ApplyOptions {
            unique_name: self.unique_name,
            wait: self.wait,
            wait_timeout: Duration::from_secs(self.wait_timeout),
        }
    }
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ACTIVE")]
    active: String,
    #[tabled(rename = "ADDRESSES")]
    addresses: String,
}

impl From<ResourceState> for ResourceRow {
    fn from(state: ResourceState) -> Self {
        Self {
            uuid: state.uuid,
            name: state.name,
            active: (if state.active { "yes" } else { "no" }).to_string(),
            addresses: if state.addresses.is_empty() {
                "-".to_string()
            } else {
                state.addresses.join(", ")
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_cli=info,nimbus_api=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let creds = config::resolve_credentials(cli.api_key, cli.api_secret)?;
    let api = HttpCloudApi::new(&cli.endpoint, creds.key, creds.secret);

    match cli.command {
        Commands::Instance(args) => {
            let spec = CreateSpec::Instance(InstanceSpec {
                name: args.common.name.clone(),
                size: args.size,
                image: args.image,
                networks: args.networks,
                ssh_key: args.ssh_key,
            });
            let outcome = Reconciler::new(&api)
                .apply(
                    ResourceKind::Instance,
                    &args.common.identity(),
                    args.common.state.into(),
                    Some(&spec),
                    &args.common.options(),
                )
                .await?;
            print_outcome(&outcome)?;
        }
        Commands::Loadbalancer(args) => {
            let spec = CreateSpec::LoadBalancer(LoadBalancerSpec {
                name: args.common.name.clone(),
                protocol: args.protocol,
                port: args.port,
                backends: args.backends,
                domains: args.domains,
            });
            let outcome = Reconciler::new(&api)
                .apply(
                    ResourceKind::LoadBalancer,
                    &args.common.identity(),
                    args.common.state.into(),
                    Some(&spec),
                    &args.common.options(),
                )
                .await?;
            print_outcome(&outcome)?;
        }
        Commands::List { kind } => {
            let listing = api.list(kind.into()).await?;
            let rows: Vec<ResourceRow> = listing.into_iter().map(Into::into).collect();
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ApplyOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
