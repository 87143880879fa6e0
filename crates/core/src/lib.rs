pub mod api;
pub mod config;
pub mod filter;
pub mod model;
pub mod parser;
pub mod services;
pub mod status;
pub mod submission;

pub use api::{MemoryTaskApi, TaskApi};
pub use config::{AppConfig, ConfigError};
pub use filter::{FetchTicket, FilterChange, PageOutcome, TaskFilterState, DEFAULT_PAGE_SIZE};
pub use model::*;
pub use parser::{
    parse_title, parse_title_in, DirectiveKind, MacroDirective, MacroError, MacroErrorReason,
    ParseResult,
};
pub use services::{SubmitError, TasksService};
pub use status::{resolve_status, toggle_completion, CompletionTracking, StatusResolver};
pub use submission::{prepare_submission, Submission, SubmissionError, TaskDraft};
