//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// A breakpoint requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BreakArg {
    pub file: PathBuf,
    pub line: i64,
}

/// Run a program under a debug adapter, printing every stop.
#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(name = "sling", version)]
pub(crate) struct Args {
    /// Use this config file instead of the global and project ones.
    #[clap(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Set a breakpoint before the program starts. Repeatable.
    #[clap(short = 'b', long = "break", value_name = "FILE:LINE", value_parser = parse_break)]
    pub breakpoints: Vec<BreakArg>,

    /// Overrides `program` in the `[launch]` table.
    pub program: Option<String>,
}

fn parse_break(value: &str) -> Result<BreakArg, String> {
    let (file, line) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected FILE:LINE, got '{value}'"))?;
    let line: i64 = line
        .parse()
        .map_err(|_| format!("invalid line number in '{value}'"))?;
    if file.is_empty() || line < 1 {
        return Err(format!("expected FILE:LINE, got '{value}'"));
    }
    Ok(BreakArg {
        file: PathBuf::from(file),
        line,
    })
}
