use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use yson::{Format, StreamKind};

/// Re-encode a yson stream between text, binary and pretty formats.
#[derive(Parser)]
#[command(name = "ysonconv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Shape of the input stream (node, list, map)
    #[arg(long, default_value = "node", value_parser = kind_arg)]
    from_kind: StreamKind,

    /// Output format (text, binary, pretty)
    #[arg(long, default_value = "pretty", value_parser = format_arg)]
    format: Format,

    /// Only check that the input is well formed
    #[arg(long)]
    validate: bool,

    /// Input file; stdin when absent or `-`
    path: Option<PathBuf>,
}

fn kind_arg(name: &str) -> Result<StreamKind, String> {
    yson_convert::parse_kind(name).ok_or_else(|| format!("unknown stream kind {name:?}"))
}

fn format_arg(name: &str) -> Result<Format, String> {
    yson_convert::parse_format(name).ok_or_else(|| format!("unknown format {name:?}"))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let data = match cli.path.as_deref() {
        Some(path) if path.as_os_str() != "-" => fs::read(path)?,
        _ => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
    };

    if cli.validate {
        let items = yson_convert::validate(&data, cli.from_kind)?;
        println!("ok: {items} item(s)");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    yson_convert::convert_to(&data, cli.from_kind, cli.format, &mut out)?;
    if cli.format != Format::Binary && cli.from_kind == StreamKind::Node {
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use yson::{Format, StreamKind};

    use super::Cli;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from(["ysonconv"]).unwrap();
        assert_eq!(cli.from_kind, StreamKind::Node);
        assert_eq!(cli.format, Format::Pretty);
        assert!(cli.path.is_none());

        let cli = Cli::try_parse_from([
            "ysonconv",
            "--from-kind",
            "list",
            "--format",
            "binary",
            "--validate",
            "rows.yson",
        ])
        .unwrap();
        assert_eq!(cli.from_kind, StreamKind::ListFragment);
        assert_eq!(cli.format, Format::Binary);
        assert!(cli.validate);
        assert_eq!(cli.path.as_deref(), Some(std::path::Path::new("rows.yson")));

        assert!(Cli::try_parse_from(["ysonconv", "--format", "yaml"]).is_err());
    }
}
