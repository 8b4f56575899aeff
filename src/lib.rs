pub mod aggregate;
pub mod args;
pub mod chart;
pub mod record;
pub mod report;
pub mod session;
pub mod source;
pub mod stats;
pub mod utils;

pub use aggregate::aggregate;
pub use args::Args;
pub use chart::{ChartController, ChartError, ChartSlice, ChartState};
pub use record::{Category, Month, RawRecord, ReportingZone, MONTHS};
pub use session::{run_session, Session};
pub use stats::{CategorizedIndex, MonthBucket, SentimentTally, YearIndex};
