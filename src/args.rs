use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::record::{parse_utc_offset, Category, Month, ReportingZone};

#[derive(Parser, Debug)]
#[command(
    name = "headlindex",
    about = "Chart the monthly sentiment of collected news headlines for a search term",
    version,
    long_about = None
)]
pub struct Args {
    /// Search term the headlines were collected for
    #[arg(short, long)]
    pub search: String,

    /// How many days back the collection job should look (1-7)
    #[arg(short, long, default_value_t = 1)]
    pub days_back: u8,

    /// Run the remote collection job before charting
    #[arg(long)]
    pub collect: bool,

    /// Base URL of the collection service
    #[arg(long, env = "HEADLINDEX_API", default_value = "http://localhost:5000")]
    pub api: String,

    /// Read `<search>_<Category>.csv` files from this directory instead of the API
    #[arg(long, env = "HEADLINDEX_DATA_DIR", conflicts_with = "collect")]
    pub data_dir: Option<PathBuf>,

    /// Category tab to show
    #[arg(short, long, value_enum)]
    pub category: Option<Category>,

    /// Year to show instead of the default one
    #[arg(short, long)]
    pub year: Option<String>,

    /// Month to show tooltip counts for (Jan..Dec)
    #[arg(long)]
    pub hover: Option<Month>,

    /// Read months in UTC instead of the local zone
    #[arg(long, conflicts_with = "utc_offset")]
    pub utc: bool,

    /// Read months at a fixed UTC offset such as +09:00
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Print the chart as JSON
    #[arg(long)]
    pub json: bool,

    /// Print download links for every exported dataset and exit
    #[arg(long)]
    pub links: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn reporting_zone(&self) -> Result<ReportingZone> {
        if self.utc {
            return Ok(ReportingZone::Utc);
        }
        match &self.utc_offset {
            Some(raw) => parse_utc_offset(raw)
                .map(ReportingZone::Fixed)
                .with_context(|| format!("Invalid --utc-offset '{}', expected +HH:MM", raw)),
            None => Ok(ReportingZone::Local),
        }
    }
}
