//! `statjoin` command line driver.
//!
//! Loads two dumps, joins them, orders the result by cost, prints a short
//! preview and stores the result. `statjoin -test` runs the built-in
//! scenario suite instead.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser, error::ErrorKind};
use statjoin::selftest::run_self_tests;
use statjoin::{join, load_dump, sort_by_cost, store_dump};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "statjoin")]
#[command(about = "Join two statistics dumps on id, aggregate and sort by cost")]
#[command(override_usage = "statjoin <FILE1> <FILE2> <OUTPUT>\n       statjoin -test")]
struct Args {
    /// First input dump, second input dump, output dump
    #[arg(value_name = "FILE", num_args = 0..=3)]
    files: Vec<PathBuf>,

    /// Run the built-in scenario suite
    #[arg(long, conflicts_with = "files")]
    test: bool,

    /// Number of joined records to print before storing
    #[arg(long, value_name = "N", default_value_t = 10)]
    preview: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Accepts the single-dash `-test` spelling alongside `--test`.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| if arg == "-test" { "--test".into() } else { arg })
        .collect()
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("statjoin=debug")
        } else {
            EnvFilter::new("statjoin=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn process(first: &Path, second: &Path, output: &Path, preview: usize) -> Result<(), String> {
    let a = load_dump(first).map_err(|e| format!("Failed to load input files: {e}"))?;
    let b = load_dump(second).map_err(|e| format!("Failed to load input files: {e}"))?;
    info!(first = a.len(), second = b.len(), "loaded inputs");

    let mut result = join(&a, &b).map_err(|e| format!("Join failed: {e}"))?;
    drop((a, b));
    sort_by_cost(&mut result);
    info!(records = result.len(), "joined and sorted");

    println!("First {preview} records:");
    println!("ID\tCount\tCost\tPrimary\tMode");
    for record in result.iter().take(preview) {
        println!("{record}");
    }

    store_dump(output, &result).map_err(|e| format!("Failed to save result: {e}"))?;
    info!(path = %output.display(), "stored result");
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(args) => args,
        Err(e) => {
            // the usage text is the only output; with no terminal to write
            // it to, the exit code still reports the outcome
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing(args.verbose);

    if args.test {
        return if run_self_tests().all_passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let [first, second, output] = args.files.as_slice() else {
        println!("{}", Args::command().render_usage());
        return ExitCode::FAILURE;
    };

    match process(first, second, output, args.preview) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(normalize_args(args.iter().map(OsString::from)))
    }

    #[test]
    fn single_dash_test_flag() {
        let args = parse(&["statjoin", "-test"]).unwrap();
        assert!(args.test);
        assert!(args.files.is_empty());
    }

    #[test]
    fn three_files() {
        let args = parse(&["statjoin", "a.bin", "b.bin", "out.bin"]).unwrap();
        assert!(!args.test);
        assert_eq!(args.files.len(), 3);
        assert_eq!(args.preview, 10);
    }

    #[test]
    fn too_many_files_rejected() {
        assert!(parse(&["statjoin", "a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn test_flag_conflicts_with_files() {
        assert!(parse(&["statjoin", "-test", "a.bin"]).is_err());
    }

    #[test]
    fn process_round_trip() {
        use statjoin::Record;

        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        let output = dir.path().join("out.bin");
        store_dump(&first, &[Record::new(1, 1, 5.0, true, 1)]).unwrap();
        store_dump(
            &second,
            &[Record::new(1, 2, 1.0, false, 4), Record::new(2, 1, 0.5, true, 0)],
        )
        .unwrap();

        process(&first, &second, &output, 10).unwrap();
        assert_eq!(
            load_dump(&output).unwrap(),
            vec![Record::new(2, 1, 0.5, true, 0), Record::new(1, 3, 6.0, false, 4)]
        );
    }

    #[test]
    fn process_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.bin");
        let err = process(&missing, &missing, &dir.path().join("out.bin"), 10).unwrap_err();
        assert!(err.starts_with("Failed to load input files"));
    }
}
