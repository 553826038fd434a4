//! Data models for chs-ingest
//!
//! - Ingest run state machine
//! - Parsed game records
//! - Run report
//! - Dataset catalog records

pub mod catalog;
pub mod ingest_run;
pub mod parsed_game;
pub mod report;
pub mod year_month;

pub use catalog::{CatalogVersion, Dataset};
pub use ingest_run::{IngestRun, StateTransition};
pub use parsed_game::{GameResult, ParsedGame, ParsedMove, ParsedPosition};
pub use report::{MonthSummary, RunReport};
pub use year_month::YearMonth;
