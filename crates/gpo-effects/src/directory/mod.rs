//! Directory adapters

mod command;

pub use command::{parse_gpo_list, CommandDirectory, OFFLINE_EXIT_CODE};
