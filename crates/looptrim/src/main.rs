use anyhow::{Context, Result};
use clap::Parser;
use looptrim::{trim_source, TrimOptions};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// looptrim: removes loop iterations that provably do nothing.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input program in the looptrim text format
    input: PathBuf,

    /// Output file for the trimmed program
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Only delete loops that never do anything; never shrink a loop's range
    #[arg(long)]
    no_narrow: bool,

    /// Also narrow GPU block and thread loops
    #[arg(long)]
    narrow_device_loops: bool,

    /// Log pass decisions (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> TrimOptions {
        TrimOptions {
            narrow_loops: !self.no_narrow,
            narrow_device_loops: self.narrow_device_loops,
            ..TrimOptions::default()
        }
    }
}

/// Initialize logging. `RUST_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "looptrim=debug",
        _ => "looptrim=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    eprintln!("looptrim: trimming {}", cli.input.display());

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let trimmed = trim_source(&source, &cli.options())
        .with_context(|| format!("failed to trim {}", cli.input.display()))?;

    if let Some(output_path) = &cli.output {
        fs::write(output_path, &trimmed)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        eprintln!("looptrim: wrote {}", output_path.display());
    } else {
        print!("{trimmed}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["looptrim", "input.lt"]);
        assert_eq!(cli.input, PathBuf::from("input.lt"));
        assert!(cli.output.is_none());
        assert_eq!(cli.verbose, 0);
        let options = cli.options();
        assert!(options.narrow_loops);
        assert!(!options.narrow_device_loops);
    }

    #[test]
    fn cli_maps_flags_onto_options() {
        let cli = Cli::parse_from([
            "looptrim",
            "input.lt",
            "--no-narrow",
            "--narrow-device-loops",
            "-o",
            "out.lt",
            "-vv",
        ]);
        assert_eq!(cli.output, Some(PathBuf::from("out.lt")));
        assert_eq!(cli.verbose, 2);
        let options = cli.options();
        assert!(!options.narrow_loops);
        assert!(options.narrow_device_loops);
        assert!(options.final_simplify);
    }
}
