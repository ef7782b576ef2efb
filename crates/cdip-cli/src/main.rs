//! `cdip` command line tool
//!
//! A thin front over `cdip-client`: each subcommand maps to one client call
//! and prints the result as pretty JSON on stdout. Diagnostics go to stderr
//! so the output stays pipeable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use cdip_client::station::PARAMETER_VARS;
use cdip_client::{
    ClientConfig, DodsClient, Latest, NcHashes, PubSet, SeriesSpan, StationData, StationStats,
    dataset_urls, realtime_stations,
};
use cdip_common::{parse_datestring, parse_datetime, snapshot_dir, to_stamp};

#[derive(Parser)]
#[command(name = "cdip", version, about = "CDIP wave buoy data from the THREDDS server")]
struct Cli {
    /// THREDDS server base url
    #[arg(long, global = true, env = "CDIP_THREDDS_DOMAIN")]
    thredds_domain: Option<String>,

    /// CDIP web server base url (WMO ids, file hashes)
    #[arg(long, global = true, env = "CDIP_WEB_DOMAIN")]
    cdip_domain: Option<String>,

    /// Log client activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StationArgs {
    /// Station id (`100p1`) or bare number (`100`)
    #[arg(long)]
    station: String,

    /// Contributing organization, e.g. `ww3`
    #[arg(long)]
    org: Option<String>,
}

impl StationArgs {
    async fn open(&self, client: &DodsClient) -> anyhow::Result<StationData> {
        Ok(match &self.org {
            Some(org) => StationData::with_org(client, &self.station, org).await?,
            None => StationData::new(client, &self.station),
        })
    }
}

#[derive(Args)]
struct SpanArgs {
    /// Start time, `YYYY-MM-DD HH:MM:SS` or compact `YYYYMMDDhhmmss`
    #[arg(long)]
    start: Option<String>,

    /// End time; without it the most recent records are fetched
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Records after the start time instead of a window (negative for before)
    #[arg(long, requires = "start", conflicts_with = "end", allow_negative_numbers = true)]
    target_records: Option<i64>,
}

impl SpanArgs {
    fn resolve(&self) -> anyhow::Result<SeriesSpan> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Ok(SeriesSpan::Span {
                start: parse_time(start)?,
                end: parse_time(end)?,
            }),
            (Some(start), None) => Ok(SeriesSpan::Around {
                target: parse_time(start)?,
                records: self.target_records.unwrap_or(0),
            }),
            (None, _) => Ok(SeriesSpan::Recent),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Newest released observation of every realtime station
    Latest {
        #[arg(long, default_value = "public")]
        pub_set: String,
    },
    /// Wave parameter series for one station
    Series {
        #[command(flatten)]
        station: StationArgs,
        #[command(flatten)]
        span: SpanArgs,
        /// Comma separated variable names
        #[arg(long, value_delimiter = ',', default_values_t = PARAMETER_VARS.map(String::from))]
        vars: Vec<String>,
        #[arg(long, default_value = "public")]
        pub_set: String,
        /// Keep rows of every publication state
        #[arg(long)]
        no_mask: bool,
    },
    /// Spectral series for one station
    Spectra {
        #[command(flatten)]
        station: StationArgs,
        #[command(flatten)]
        span: SpanArgs,
        #[arg(long, default_value = "public")]
        pub_set: String,
        /// Keep rows of every publication state
        #[arg(long)]
        no_mask: bool,
    },
    /// Raw displacement series for one station
    Xyz {
        #[command(flatten)]
        station: StationArgs,
        #[command(flatten)]
        span: SpanArgs,
        #[arg(long, default_value = "public")]
        pub_set: String,
    },
    /// Station metadata
    Meta {
        #[command(flatten)]
        station: StationArgs,
    },
    /// Station numbers with realtime data on the server
    Stations,
    /// Every dataset url in the server catalog
    Datasets,
    /// Flag counts and deployment inventory for one station
    Stats {
        #[command(flatten)]
        station: StationArgs,
    },
    /// Archive files changed since the saved snapshot, refreshing it
    Changed {
        /// Snapshot directory (defaults to `$CDIP_SNAPSHOT_PATH` or `~/.cdip`)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ClientConfig::default();
    if let Some(domain) = &cli.thredds_domain {
        config = config.with_thredds_domain(domain.clone());
    }
    if let Some(domain) = &cli.cdip_domain {
        config = config.with_cdip_domain(domain.clone());
    }
    let client = DodsClient::new(config)?;

    match cli.command {
        Commands::Latest { pub_set } => {
            let stations = Latest::new(&client).fetch(PubSet::parse(&pub_set)).await?;
            print_json(&stations)?;
        }
        Commands::Series {
            station,
            span,
            vars,
            pub_set,
            no_mask,
        } => {
            let data = station.open(&client).await?;
            let vars: Vec<&str> = vars.iter().map(String::as_str).collect();
            let result = data
                .get_series(span.resolve()?, &vars, PubSet::parse(&pub_set), !no_mask)
                .await?;
            print_json(&result)?;
        }
        Commands::Spectra {
            station,
            span,
            pub_set,
            no_mask,
        } => {
            let data = station.open(&client).await?;
            let result = data
                .get_spectra(span.resolve()?, PubSet::parse(&pub_set), !no_mask)
                .await?;
            print_json(&result)?;
        }
        Commands::Xyz {
            station,
            span,
            pub_set,
        } => {
            let data = station.open(&client).await?;
            let result = data.get_xyz(span.resolve()?, PubSet::parse(&pub_set)).await?;
            print_json(&result)?;
        }
        Commands::Meta { station } => {
            let data = station.open(&client).await?;
            print_json(&data.get_stn_meta().await?)?;
        }
        Commands::Stations => {
            print_json(&realtime_stations(&client).await?)?;
        }
        Commands::Datasets => {
            print_json(&dataset_urls(&client).await?)?;
        }
        Commands::Stats { station } => {
            let stats = StationStats::new(station.open(&client).await?);
            print_json(&stats.make_stats().await?)?;
        }
        Commands::Changed { snapshot } => {
            let dir = snapshot.unwrap_or_else(snapshot_dir);
            let hashes = NcHashes::load(&client).await?;
            let changed = hashes.compare_snapshot(&dir)?;
            hashes.save_snapshot(&dir)?;
            print_json(&changed)?;
        }
    }
    Ok(())
}

/// Accept both the readable and the compact datestring forms
fn parse_time(s: &str) -> anyhow::Result<i64> {
    let dt = parse_datetime(s).or_else(|_| parse_datestring(s))?;
    Ok(to_stamp(dt))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "cdip_client=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(layer).init();
}
