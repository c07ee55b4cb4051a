pub mod json;
pub mod text;

use std::io::Write;

use crate::extractor::Extraction;
use crate::pattern::MatchOptions;

pub trait Formatter {
    fn format_to(&self, extraction: &Extraction, out: &mut dyn Write);

    /// Record the options of the run, for formatters that report them.
    fn set_options(&mut self, _options: &MatchOptions) {}

    fn print(&self, extraction: &Extraction) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_to(extraction, &mut lock);
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter::new()),
        // "text" and any unknown value
        _ => Box::new(text::TextFormatter),
    }
}
