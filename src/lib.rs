pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod extractor;
pub mod formatter;
pub mod input;
pub mod pattern;
pub mod token;

#[cfg(test)]
pub mod testutil;

use anyhow::{Context, Result};

use cli::Args;
use config::load_config;
use extractor::extract_corpus;
use formatter::create_formatter;
use input::{load_corpus, load_pattern, read_corpus};

/// Run the extractor. Returns the exit code: 0 = matches found, 1 = none.
pub fn run(args: Args) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let options = config.to_options(&args)?;
    tracing::debug!(?options, "resolved match options");

    let (pattern, pattern_diagnostics) = load_pattern(&args.pattern)?;
    let matcher = pattern
        .matcher()
        .with_context(|| format!("failed to compile {}", args.pattern.display()))?;

    // --print-pattern: show the compiled automaton and exit
    if args.print_pattern {
        println!("{}", matcher.printable_pattern());
        return Ok(0);
    }

    let corpus = if args.corpus.is_empty() {
        read_corpus(std::io::stdin().lock(), "<stdin>")?
    } else {
        let mut sentences = Vec::new();
        for path in &args.corpus {
            sentences.extend(load_corpus(path)?);
        }
        sentences
    };

    let mut extraction = extract_corpus(matcher, &corpus, &options)?;

    extraction.merge_diagnostics(
        pattern_diagnostics
            .into_vec()
            .into_iter()
            .chain(matcher.diagnostics().iter().cloned()),
    );

    let mut formatter = create_formatter(&args.format);
    formatter.set_options(&options);
    formatter.print(&extraction);

    Ok(if extraction.match_count() > 0 { 0 } else { 1 })
}
