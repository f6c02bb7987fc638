// Source discovery, spreadsheet extraction and report output

pub mod extract;
pub mod fingerprint;
pub mod locate;
pub mod reader;
pub mod report;
pub mod writer;

pub use reader::WorkbookSourceReader;
pub use report::{publish, Published};
