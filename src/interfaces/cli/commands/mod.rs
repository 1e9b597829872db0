mod config_gen;
mod errors;
mod link;

pub use config_gen::config_generate;
pub use errors::show_error_stats;
pub use link::{LinkArgs, build_deep_link, print_deep_link};
