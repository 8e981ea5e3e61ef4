pub mod exclusion;
pub mod pipeline;
pub mod recommendations;
pub mod report;
pub mod sbi_csv;
pub mod source;

pub use exclusion::ExclusionGate;
pub use pipeline::{rank_candidates, score_and_rank, RunOptions, ScreeningPipeline};
pub use recommendations::build_recommendations;
pub use report::{render_report, write_report};
pub use sbi_csv::{resolve_as_of, SbiCsvMarketData};
pub use source::market_data_source;
