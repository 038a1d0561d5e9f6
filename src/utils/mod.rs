pub mod dates;
pub mod parse;
