//! Terminal rendering of the chart state.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write;

use crate::chart::{ChartController, ChartSlice, ChartState, MonthColumn};
use crate::record::Category;
use crate::session::Session;
use crate::source::download_links;
use crate::stats::SentimentTally;
use crate::utils::format_number;

/// Rows per bar.
pub const BAR_HEIGHT: usize = 8;

const POSITIVE: char = '+';
const NEUTRAL: char = '=';
const NEGATIVE: char = '-';

#[derive(Debug, Serialize)]
struct ChartView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_message: Option<&'a str>,
    search_word: Option<&'a str>,
    state: &'a ChartState,
    years: &'a [String],
    months: Vec<MonthColumn>,
    hovered: Option<MonthColumn>,
}

/// Rows of each segment, bottom to top: negative, neutral, positive. Sums to
/// `height` for a non-empty tally and to zero for an empty one.
pub fn segment_heights(tally: &SentimentTally, height: usize) -> (usize, usize, usize) {
    if tally.is_empty() {
        return (0, 0, 0);
    }
    let shares = tally.proportions();
    let scale = height as f64;
    let negative = (shares.negative * scale).round() as usize;
    let through_neutral = ((shares.negative + shares.neutral) * scale).round() as usize;
    let through_neutral = through_neutral.clamp(negative, height);
    (negative, through_neutral - negative, height - through_neutral)
}

fn cell(tally: &SentimentTally, level: usize) -> char {
    let (negative, neutral, positive) = segment_heights(tally, BAR_HEIGHT);
    if level <= negative {
        NEGATIVE
    } else if level <= negative + neutral {
        NEUTRAL
    } else if level <= negative + neutral + positive {
        POSITIVE
    } else {
        ' '
    }
}

fn year_menu(slice: &ChartSlice) -> String {
    if !slice.has_data() {
        return "No Year".to_string();
    }
    slice
        .sorted_years
        .iter()
        .map(|year| {
            if *year == slice.selected_year {
                format!("[{}]", year)
            } else {
                year.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn tab_bar(active: Category) -> String {
    Category::ALL
        .iter()
        .map(|&category| {
            if category == active {
                format!("[{}]", category)
            } else {
                category.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn render_chart(controller: &ChartController) -> String {
    let slice = controller.current_slice();
    let mut out = String::new();

    let heading = controller
        .search_word()
        .map(|word| format!("\"{}\"", word))
        .unwrap_or_else(|| "(no search)".to_string());
    let _ = writeln!(out, "\n--- Sentiment for {} ---", heading);
    let _ = writeln!(out, "{}", tab_bar(slice.category));
    let year_label = if slice.selected_year.is_empty() {
        "No Data"
    } else {
        slice.selected_year.as_str()
    };
    let _ = writeln!(out, "Year: {}   ({})", year_label, year_menu(&slice));

    if !slice.has_data() {
        let _ = writeln!(out, "\n    NULL\n");
    } else {
        let columns = slice.month_columns();
        out.push('\n');
        for level in (1..=BAR_HEIGHT).rev() {
            let row: String = columns
                .iter()
                .map(|column| format!("  {} ", cell(&column.tally, level)))
                .collect();
            let _ = writeln!(out, "{}", row.trim_end());
        }
        let labels: String = columns
            .iter()
            .map(|column| format!(" {}", column.month))
            .collect();
        let _ = writeln!(out, "{}", labels);
    }

    let _ = writeln!(
        out,
        "\n{} Positive  {} Neutral  {} Negative",
        POSITIVE, NEUTRAL, NEGATIVE
    );

    if let Some((month, tally)) = controller.hovered_tally() {
        let _ = writeln!(
            out,
            "{}: {} positive, {} neutral, {} negative ({} total)",
            month,
            format_number(tally.positive),
            format_number(tally.neutral),
            format_number(tally.negative),
            format_number(tally.total)
        );
    }

    out
}

pub fn render_json(controller: &ChartController) -> Result<String> {
    chart_json(controller, None)
}

fn chart_json(controller: &ChartController, collection_message: Option<&str>) -> Result<String> {
    let slice = controller.current_slice();
    let view = ChartView {
        collection_message,
        search_word: controller.search_word(),
        state: controller.state(),
        years: &slice.sorted_years,
        months: slice.month_columns(),
        hovered: controller
            .hovered_tally()
            .map(|(month, tally)| MonthColumn { month, tally }),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Stdout for a finished session. In JSON mode the collection message is a
/// field of the document so the output stays a single JSON value.
pub fn render_session(session: &Session, json: bool) -> Result<String> {
    let message = session.collection_message.as_deref();
    if json {
        return Ok(format!("{}\n", chart_json(&session.chart, message)?));
    }
    let mut out = String::new();
    if let Some(message) = message {
        let _ = writeln!(out, "{}", message);
    }
    out.push_str(&render_chart(&session.chart));
    Ok(out)
}

pub fn print_session(session: &Session, json: bool) -> Result<()> {
    print!("{}", render_session(session, json)?);
    Ok(())
}

pub fn print_download_links(api: &str, search_word: &str) -> Result<()> {
    let base = url::Url::parse(api)?;
    println!("\n--- Downloads for \"{}\" ---", search_word);
    for (label, url) in download_links(&base, search_word)? {
        println!("- {}: {}", label, url);
    }
    Ok(())
}
