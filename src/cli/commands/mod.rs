//! CLI command implementations.

mod ask;
mod ask_image;
mod config;
mod doctor;
mod ingest;
mod list;
mod recent;
mod search;
mod serve;
mod shell;

pub use ask::run_ask;
pub use ask_image::run_ask_image;
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::{ingest_one, run_ingest};
pub use list::run_list;
pub use recent::run_recent;
pub use search::run_search;
pub use serve::run_serve;
pub use shell::run_shell;
