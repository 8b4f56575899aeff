//! Interactive chart state: which category tab is open, which year is shown
//! and which month the pointer is over.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{Category, Month, ReportingZone, MONTHS};
use crate::stats::{CategorizedIndex, MonthBucket, SentimentTally, YearIndex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("year '{year}' has no {category} data")]
    InvalidSelection { year: String, category: Category },
}

/// Source of "this year" for the year-default rule.
pub trait Clock {
    fn current_year(&self) -> i32;
}

/// Reads the wall clock in the reporting zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub zone: ReportingZone,
}

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        self.zone.current_year()
    }
}

/// Always reports the same year.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl Clock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartState {
    pub active_category: Category,
    /// Empty when the active category has no data.
    pub selected_year: String,
    pub hovered_month: Option<Month>,
}

/// Handle for one search cycle. Only the most recently issued ticket may
/// deliver data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    sequence: u64,
}

/// What the renderer draws for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub category: Category,
    pub sorted_years: Vec<String>,
    pub selected_year: String,
    pub visible_bucket: MonthBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthColumn {
    pub month: Month,
    #[serde(flatten)]
    pub tally: SentimentTally,
}

impl ChartSlice {
    /// All twelve months in calendar order, zero-filled where the bucket has
    /// no entry.
    pub fn month_columns(&self) -> Vec<MonthColumn> {
        MONTHS
            .iter()
            .map(|&month| MonthColumn {
                month,
                tally: self.visible_bucket.get(month),
            })
            .collect()
    }

    pub fn has_data(&self) -> bool {
        !self.sorted_years.is_empty()
    }
}

pub struct ChartController {
    data: CategorizedIndex,
    state: ChartState,
    search_word: Option<String>,
    sequence: u64,
    clock: Box<dyn Clock>,
}

impl ChartController {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            data: CategorizedIndex::default(),
            state: ChartState::default(),
            search_word: None,
            sequence: 0,
            clock,
        }
    }

    pub fn with_zone(zone: ReportingZone) -> Self {
        Self::new(Box::new(SystemClock { zone }))
    }

    pub fn state(&self) -> &ChartState {
        &self.state
    }

    pub fn data(&self) -> &CategorizedIndex {
        &self.data
    }

    pub fn search_word(&self) -> Option<&str> {
        self.search_word.as_deref()
    }

    /// Start a new search cycle: drop the previous data, reset the chart to
    /// its defaults and invalidate every earlier ticket.
    pub fn begin_search(&mut self, search_word: &str) -> SearchTicket {
        self.sequence += 1;
        self.search_word = Some(search_word.to_string());
        self.data = CategorizedIndex::default();
        self.state = ChartState::default();
        info!(
            action = "begin",
            component = "chart",
            search_word,
            sequence = self.sequence,
            "Started search cycle"
        );
        SearchTicket {
            sequence: self.sequence,
        }
    }

    /// Apply data for `ticket` if it belongs to the latest search cycle.
    /// Returns `false` and leaves state untouched for a superseded ticket.
    pub fn deliver(&mut self, ticket: SearchTicket, data: CategorizedIndex) -> bool {
        if ticket.sequence != self.sequence {
            warn!(
                action = "discard",
                component = "chart",
                stale_sequence = ticket.sequence,
                current_sequence = self.sequence,
                "Discarding data from superseded search"
            );
            return false;
        }
        self.on_data_arrived(data);
        true
    }

    /// Replace both category indexes and pick the default year.
    pub fn on_data_arrived(&mut self, data: CategorizedIndex) {
        self.data = data;
        self.select_default_year();
    }

    /// Switch tabs. Re-selecting the open tab keeps the chosen year.
    pub fn set_active_category(&mut self, category: Category) {
        if category == self.state.active_category {
            return;
        }
        self.state.active_category = category;
        self.select_default_year();
    }

    /// Override the selected year. The year must exist in the active
    /// category; otherwise nothing changes.
    pub fn set_selected_year(&mut self, year: &str) -> Result<(), ChartError> {
        if !self.active_index().contains_year(year) {
            return Err(ChartError::InvalidSelection {
                year: year.to_string(),
                category: self.state.active_category,
            });
        }
        self.state.selected_year = year.to_string();
        Ok(())
    }

    pub fn set_hovered_month(&mut self, month: Option<Month>) {
        self.state.hovered_month = month;
    }

    /// Tooltip content for the hovered month, if any.
    pub fn hovered_tally(&self) -> Option<(Month, SentimentTally)> {
        let month = self.state.hovered_month?;
        let tally = self
            .active_index()
            .bucket(&self.state.selected_year)
            .map(|bucket| bucket.get(month))
            .unwrap_or_default();
        Some((month, tally))
    }

    pub fn current_slice(&self) -> ChartSlice {
        let index = self.active_index();
        ChartSlice {
            category: self.state.active_category,
            sorted_years: index.years(),
            selected_year: self.state.selected_year.clone(),
            visible_bucket: index
                .bucket(&self.state.selected_year)
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn active_index(&self) -> &YearIndex {
        self.data.get(self.state.active_category)
    }

    fn select_default_year(&mut self) {
        let years = self.active_index().years();
        let current = self.clock.current_year().to_string();
        self.state.selected_year = default_year(&years, &current);
        debug!(
            action = "select",
            component = "chart",
            category = %self.state.active_category,
            year_count = years.len(),
            selected_year = %self.state.selected_year,
            "Selected default year"
        );
    }
}

/// `current` when present in `sorted_years`, else the earliest year, else
/// the empty string.
pub fn default_year(sorted_years: &[String], current: &str) -> String {
    if sorted_years.iter().any(|year| year == current) {
        return current.to_string();
    }
    sorted_years.first().cloned().unwrap_or_default()
}
