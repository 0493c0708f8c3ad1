//! Lists calendar events in start order.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use avl_multimap::ics::{self, Event};
use avl_multimap::multimap::Tree;
use chrono::{TimeZone, Utc};
use clap::Parser;
use tracing::{debug, info, Level};

/// Merge iCalendar calendars and list their events by start time.
#[derive(Parser, Debug)]
#[command(name = "next-week")]
#[command(version, about, long_about = None)]
struct Args {
    /// Calendars to read: `http://` or `https://` URLs, files, or `-` for standard input
    #[arg(required = true)]
    sources: Vec<String>,

    /// Only list events starting at or after this Unix timestamp
    #[arg(long)]
    upcoming_from: Option<i64>,

    /// More logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut tree = Tree::new();
    for source in args.sources.iter().map(|arg| Source::from_arg(arg)) {
        let document = source.read()?;
        let loaded = ics::load_events(&document, &mut tree);
        info!(%source, loaded, "loaded calendar");
    }

    tree.for_each(|start, events| {
        if args.upcoming_from.map_or(true, |from| *start >= from) {
            for event in events {
                println!("{}", describe(*start, event));
            }
        }
    });
    println!("{} distinct start times", tree.size());

    Ok(())
}

/// Where a calendar is read from.
#[derive(Debug, PartialEq, Eq)]
enum Source {
    Stdin,
    Url(String),
    File(PathBuf),
}

impl Source {
    fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_owned())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    fn read(&self) -> anyhow::Result<String> {
        match self {
            Self::Stdin => {
                let mut document = String::new();
                std::io::stdin()
                    .read_to_string(&mut document)
                    .context("Failed to read calendar from stdin")?;
                Ok(document)
            }
            Self::Url(url) => fetch(url),
            Self::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read calendar {}", path.display())),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("-"),
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn fetch(url: &str) -> anyhow::Result<String> {
    debug!(url, "fetching calendar");
    let response =
        reqwest::blocking::get(url).with_context(|| format!("Failed to fetch calendar {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        bail!("Calendar {} returned {}: {}", url, status, body);
    }

    response
        .text()
        .with_context(|| format!("Failed to read calendar body from {}", url))
}

fn describe(start: i64, event: &Event) -> String {
    let start = Utc
        .timestamp_opt(start, 0)
        .single()
        .map_or_else(|| start.to_string(), |time| time.to_rfc3339());
    format!(
        "{}  {}  {}",
        start,
        event.calendar.as_deref().unwrap_or("-"),
        event.summary().unwrap_or("(no summary)")
    )
}
