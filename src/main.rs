use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use gpx_osgrid::{ProcessOptions, TrackProcessor, XmlNamespace, XmlOptions, to_feature_collection};
use log::{error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Tabular,
    Xml,
    Stats,
    Geojson,
}

/// Project GPX way-points onto the British National Grid and summarise the track
#[derive(Debug, Parser)]
#[command(name = "gpxstats", version)]
struct Cli {
    /// GPX file to read
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Tabular)]
    format: Format,

    /// Write a <rte> instead of a <trk> (xml format)
    #[arg(long)]
    route: bool,

    /// Add an xmlns attribute, the GPX 1.0 namespace unless a URI is given (xml format)
    #[arg(long, num_args = 0..=1, value_name = "URI")]
    namespace: Option<Option<String>>,

    /// Do not indent the rebuilt document (xml format)
    #[arg(long)]
    compact: bool,

    /// Ignore <time> elements
    #[arg(long)]
    no_time: bool,

    /// Emit distance, elevation and time deltas with each record
    #[arg(long)]
    deltas: bool,

    /// Discard way-points closer in time than this to the previous one (seconds, 0 disables)
    #[arg(long, value_name = "S")]
    time_tolerance: Option<i64>,

    /// Ignore elevation changes up to this size when summing gain and loss (metres)
    #[arg(long, value_name = "M")]
    elevation_tolerance: Option<f64>,

    /// Drop records within this Manhattan distance of the last one written (metres, 0 disables)
    #[arg(long, value_name = "M")]
    distance_tolerance: Option<f64>,

    /// Digits in the grid references
    #[arg(long, value_name = "D")]
    precision: Option<u8>,

    /// JSON file of processing options, overridden by the flags above
    #[arg(long, value_name = "FILE.json")]
    options: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Set logging level to debug, use a second time (e.g. -vv) to set logging to trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress info logging messages use a second time (e.g. -qq) to hide warnings
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

impl Cli {
    /// Return the verbose flag counts as a log level filter
    fn verbosity(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (1, _) => LevelFilter::Warn,
            (q, _) if q > 1 => LevelFilter::Error,
            (_, 1) => LevelFilter::Debug,
            (_, v) if v > 1 => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }

    fn process_options(&self) -> Result<ProcessOptions, gpx_osgrid::Error> {
        let mut options = match &self.options {
            Some(path) => {
                info!("loading options from {}", path.display());
                serde_json::from_str(&fs::read_to_string(path)?)?
            }
            None => ProcessOptions::default(),
        };
        if self.no_time {
            options.process_time = false;
        }
        if self.deltas {
            options.compute_deltas = true;
        }
        if let Some(t) = self.time_tolerance {
            options.time_tolerance = t;
        }
        if let Some(e) = self.elevation_tolerance {
            options.elevation_tolerance = e;
        }
        if let Some(d) = self.distance_tolerance {
            options.distance_tolerance = d;
        }
        if let Some(p) = self.precision {
            options.precision = p;
        }
        Ok(options)
    }

    fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            pretty: !self.compact,
            track: !self.route,
            namespace: match &self.namespace {
                None => XmlNamespace::None,
                Some(None) => XmlNamespace::Standard,
                Some(Some(uri)) => XmlNamespace::Custom(uri.clone()),
            },
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    TermLogger::init(cli.verbosity(), Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    let processor = TrackProcessor::open(&cli.file, cli.process_options()?)?;
    if !processor.is_valid() {
        error!("{} holds no way-points", cli.file.display());
        std::process::exit(1);
    }

    let output = match cli.format {
        Format::Tabular => processor.to_tabular(None, None)?,
        Format::Xml => processor.to_xml(&cli.xml_options())?,
        Format::Stats => processor.statistics_report(cli.verbose > 0)?,
        Format::Geojson => {
            let mut json = serde_json::to_string_pretty(&to_feature_collection(&processor)?)?;
            json.push('\n');
            json
        }
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, output)?;
            info!("wrote {}", path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}
