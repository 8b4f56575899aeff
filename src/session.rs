use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

use crate::chart::ChartController;
use crate::record::ReportingZone;
use crate::source::{fetch_categorized, DirectorySource, HttpSource, RecordSource, Submission};
use crate::Args;

/// Result of one search cycle.
pub struct Session {
    pub chart: ChartController,
    /// Server message from the collection job, when one was triggered.
    pub collection_message: Option<String>,
}

/// Run one search cycle end to end: optionally trigger collection, fetch both
/// category datasets, and leave the chart in the state the arguments ask for.
pub fn run_session(args: &Args) -> Result<Session> {
    let total_start_time = Instant::now();
    let zone = args.reporting_zone()?;
    info!(action = "start", component = "session", search_word = %args.search, zone = %zone, "Starting sentiment session");

    let mut collection_message = None;
    let source: Box<dyn RecordSource> = match &args.data_dir {
        Some(dir) => Box::new(DirectorySource::new(dir)),
        None => {
            let http = HttpSource::new(&args.api)
                .with_context(|| format!("Invalid API base URL '{}'", args.api))?;
            if args.collect {
                let submission = Submission {
                    search_word: args.search.trim().to_string(),
                    days_back: args.days_back,
                };
                let message = http
                    .collect(&submission)
                    .context("Collection job failed")?;
                info!(action = "collect", component = "session", message = %message, "Collection reply received");
                collection_message = Some(message);
            }
            Box::new(http)
        }
    };

    let mut controller = ChartController::with_zone(zone);
    load_into(&mut controller, source.as_ref(), args.search.trim(), zone)?;
    apply_view_options(&mut controller, args)?;

    info!(
        action = "complete",
        component = "session",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Session completed"
    );
    Ok(Session {
        chart: controller,
        collection_message,
    })
}

/// Start a search cycle on `controller` and deliver the fetched data to it.
pub fn load_into(
    controller: &mut ChartController,
    source: &dyn RecordSource,
    search_word: &str,
    zone: ReportingZone,
) -> Result<()> {
    let ticket = controller.begin_search(search_word);
    let index = fetch_categorized(source, search_word, zone)
        .with_context(|| format!("Failed to load datasets for '{}'", search_word))?;
    controller.deliver(ticket, index);
    Ok(())
}

/// Category, year and hover overrides from the command line.
pub fn apply_view_options(controller: &mut ChartController, args: &Args) -> Result<()> {
    if let Some(category) = args.category {
        controller.set_active_category(category);
    }
    if let Some(year) = &args.year {
        controller.set_selected_year(year)?;
    }
    controller.set_hovered_month(args.hover);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::FixedClock;
    use crate::record::{Category, Month, RawRecord};
    use crate::source::SourceError;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    struct StaticSource;

    impl RecordSource for StaticSource {
        fn fetch(
            &self,
            _search_word: &str,
            category: Category,
        ) -> Result<Vec<RawRecord>, SourceError> {
            Ok(match category {
                Category::World => vec![
                    RawRecord::new("2023-02-01 00:00:00", "World", "positive"),
                    RawRecord::new("2024-05-01 00:00:00", "World", "negative"),
                ],
                Category::Business => {
                    vec![RawRecord::new("2022-09-01 00:00:00", "Business", "neutral")]
                }
            })
        }
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn fetch(&self, _: &str, category: Category) -> Result<Vec<RawRecord>, SourceError> {
            match category {
                Category::World => Ok(Vec::new()),
                Category::Business => Err(SourceError::NotFound("rates_Business.csv".into())),
            }
        }
    }

    fn controller() -> ChartController {
        ChartController::new(Box::new(FixedClock(2024)))
    }

    #[test]
    fn test_load_into_applies_defaults() {
        let mut chart = controller();
        load_into(&mut chart, &StaticSource, "rates", ReportingZone::Utc).unwrap();

        assert_eq!(chart.state().selected_year, "2024");
        assert_eq!(chart.current_slice().sorted_years, vec!["2023", "2024"]);
    }

    #[test]
    fn test_failed_fetch_leaves_chart_empty() {
        let mut chart = controller();
        assert!(load_into(&mut chart, &FailingSource, "rates", ReportingZone::Utc).is_err());
        assert!(!chart.current_slice().has_data());
        assert_eq!(chart.search_word(), Some("rates"));
    }

    #[test]
    fn test_view_options() {
        let mut chart = controller();
        load_into(&mut chart, &StaticSource, "rates", ReportingZone::Utc).unwrap();

        let args = Args::try_parse_from([
            "headlindex",
            "-s",
            "rates",
            "-c",
            "business",
            "--hover",
            "Sep",
        ])
        .unwrap();
        apply_view_options(&mut chart, &args).unwrap();

        assert_eq!(chart.state().active_category, Category::Business);
        assert_eq!(chart.state().selected_year, "2022");
        assert_eq!(chart.hovered_tally().unwrap().1.neutral, 1);
        assert_eq!(chart.state().hovered_month, Some(Month::Sep));
    }

    #[test]
    fn test_unknown_year_option_fails() {
        let mut chart = controller();
        load_into(&mut chart, &StaticSource, "rates", ReportingZone::Utc).unwrap();

        let args = Args::try_parse_from(["headlindex", "-s", "rates", "-y", "2019"]).unwrap();
        assert!(apply_view_options(&mut chart, &args).is_err());
        assert_eq!(chart.state().selected_year, "2024");
    }
}
