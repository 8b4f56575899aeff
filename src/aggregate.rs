use std::time::Instant;
use tracing::debug;

use crate::record::{parse_timestamp, Category, RawRecord, ReportingZone, Sentiment};
use crate::stats::{CategorizedIndex, YearIndex};

/// Fold `records` for `target_category` into a year/month index.
///
/// Rows in another category, rows whose `datetime` does not parse, and rows
/// with an unrecognised sentiment label are skipped without error. Years and
/// months are read in `zone`, so the result only depends on the inputs; with
/// [`ReportingZone::Local`] it also depends on the host's zone.
pub fn aggregate(records: &[RawRecord], target_category: &str, zone: ReportingZone) -> YearIndex {
    let start_time = Instant::now();
    let mut index = YearIndex::default();
    let mut counted = 0usize;
    let mut other_category = 0usize;
    let mut bad_timestamp = 0usize;
    let mut unknown_sentiment = 0usize;

    for record in records {
        if !record.is_category(target_category) {
            other_category += 1;
            continue;
        }
        let Some((year, month)) = parse_timestamp(&record.datetime).and_then(|ts| zone.bucket_of(ts))
        else {
            bad_timestamp += 1;
            continue;
        };
        let Some(sentiment) = Sentiment::parse(&record.sentiment) else {
            unknown_sentiment += 1;
            continue;
        };

        index.tally_mut(year, month).record(sentiment);
        counted += 1;
    }

    debug!(
        action = "complete",
        component = "aggregate",
        category = target_category,
        zone = %zone,
        input = records.len(),
        counted,
        other_category,
        bad_timestamp,
        unknown_sentiment,
        duration_ms = start_time.elapsed().as_millis(),
        "Aggregated records"
    );

    index
}

impl CategorizedIndex {
    /// Aggregate both tracked categories from their own datasets.
    pub fn from_records(world: &[RawRecord], business: &[RawRecord], zone: ReportingZone) -> Self {
        Self::new(
            aggregate(world, Category::World.name(), zone),
            aggregate(business, Category::Business.name(), zone),
        )
    }
}
