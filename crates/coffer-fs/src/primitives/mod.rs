pub mod replace_file;

pub use replace_file::{Options as ReplaceOptions, replace_file};
