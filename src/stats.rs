use serde::Serialize;
use std::collections::BTreeMap;

use crate::record::{Category, Month, Sentiment};

/// Per-month sentiment counts.
///
/// `total` always equals `positive + neutral + negative`; the only mutation
/// path is [`SentimentTally::record`], which bumps one field and the total
/// together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentTally {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
    pub total: u32,
}

/// Share of each sentiment within one month, for stacked rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Proportions {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentTally {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
        self.total += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All zero when the month has no records.
    pub fn proportions(&self) -> Proportions {
        if self.total == 0 {
            return Proportions::default();
        }
        let total = f64::from(self.total);
        Proportions {
            positive: f64::from(self.positive) / total,
            neutral: f64::from(self.neutral) / total,
            negative: f64::from(self.negative) / total,
        }
    }
}

/// Tallies for the months of one year that saw at least one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthBucket {
    months: BTreeMap<Month, SentimentTally>,
}

impl MonthBucket {
    /// Absent months read as an all-zero tally.
    pub fn get(&self, month: Month) -> SentimentTally {
        self.months.get(&month).copied().unwrap_or_default()
    }

    pub fn contains(&self, month: Month) -> bool {
        self.months.contains_key(&month)
    }

    /// Present months in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (Month, SentimentTally)> + '_ {
        self.months.iter().map(|(month, tally)| (*month, *tally))
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub(crate) fn tally_mut(&mut self, month: Month) -> &mut SentimentTally {
        self.months.entry(month).or_default()
    }
}

/// Year (`"2024"`) to month bucket. Built once by the aggregator and never
/// mutated afterwards; a new aggregation produces a new index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct YearIndex {
    years: BTreeMap<String, MonthBucket>,
}

impl YearIndex {
    /// Years present, ascending.
    pub fn years(&self) -> Vec<String> {
        self.years.keys().cloned().collect()
    }

    pub fn contains_year(&self, year: &str) -> bool {
        self.years.contains_key(year)
    }

    pub fn bucket(&self, year: &str) -> Option<&MonthBucket> {
        self.years.get(year)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MonthBucket)> {
        self.years.iter().map(|(year, bucket)| (year.as_str(), bucket))
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Sum of every month's tally across all years.
    pub fn overall(&self) -> SentimentTally {
        self.years
            .values()
            .flat_map(|bucket| bucket.iter())
            .fold(SentimentTally::default(), |acc, (_, tally)| SentimentTally {
                positive: acc.positive + tally.positive,
                neutral: acc.neutral + tally.neutral,
                negative: acc.negative + tally.negative,
                total: acc.total + tally.total,
            })
    }

    pub(crate) fn tally_mut(&mut self, year: String, month: Month) -> &mut SentimentTally {
        self.years.entry(year).or_default().tally_mut(month)
    }
}

/// One index per tracked category, built from independently fetched datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedIndex {
    pub world: YearIndex,
    pub business: YearIndex,
}

impl CategorizedIndex {
    pub fn new(world: YearIndex, business: YearIndex) -> Self {
        Self { world, business }
    }

    pub fn get(&self, category: Category) -> &YearIndex {
        match category {
            Category::World => &self.world,
            Category::Business => &self.business,
        }
    }
}
