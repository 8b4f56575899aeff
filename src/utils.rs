use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn format_number(num: u32) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.search.trim().is_empty() {
        anyhow::bail!("Search word is required.");
    }

    if !(1..=7).contains(&args.days_back) {
        anyhow::bail!("--days-back must be between 1 and 7");
    }

    if let Some(year) = &args.year {
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("--year must be a 4-digit year");
        }
    }

    args.reporting_zone()?;

    Ok(())
}
