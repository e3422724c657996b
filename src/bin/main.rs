use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Error;
use api_contract_diff::{FailureReport, Report, SchemaOptions, Status};
use tracing_subscriber::EnvFilter;

/// Compare an old and a new snapshot of a JSON API response, and print a pass/fail report
#[derive(Parser)]
#[command(about, version)]
struct Args {
    #[command(subcommand)]
    mode: Mode,
    /// Print the report on a single line
    #[arg(long, global = true)]
    compact: bool,
    /// Exit with status 1 when differences were found
    #[arg(long, global = true)]
    exit_code: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Compare the content of the two documents
    Content(Sources),
    /// Compare schemas inferred from the two documents
    Schema {
        #[command(flatten)]
        sources: Sources,
        /// Where the inferred schemas are written
        #[arg(long, default_value = "_fixtures")]
        schema_dir: PathBuf,
        /// Do not write the inferred schemas
        #[arg(long)]
        no_write_schemas: bool,
        /// The documents already are JSON schemas
        #[arg(long)]
        from_schemas: bool,
    },
}

#[derive(clap::Args)]
struct Sources {
    /// The old document
    old: PathBuf,
    /// The new document
    new: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return fail(argument_message(&err)),
    };

    match run(&args) {
        Ok(Status::Fail) if args.exit_code => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => fail(err.to_string()),
    }
}

fn run(args: &Args) -> Result<Status, Error> {
    let report: Report = match &args.mode {
        Mode::Content(sources) => {
            api_contract_diff::compare_content(&sources.old, &sources.new)?
        }
        Mode::Schema {
            sources,
            schema_dir,
            no_write_schemas,
            from_schemas,
        } => {
            let options = SchemaOptions {
                schema_dir: (!no_write_schemas).then(|| schema_dir.clone()),
                from_schemas: *from_schemas,
            };
            api_contract_diff::compare_schemas(&sources.old, &sources.new, &options)?
        }
    };

    report.write_json(std::io::stdout().lock(), args.compact)?;
    Ok(report.status)
}

fn argument_message(err: &clap::Error) -> String {
    match err.kind() {
        ErrorKind::MissingRequiredArgument
        | ErrorKind::MissingSubcommand
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            "Missing JSON file paths".to_owned()
        }
        _ => err.to_string().trim().to_owned(),
    }
}

fn fail(message: String) -> ExitCode {
    eprintln!("{}", FailureReport::new(message).to_json());
    ExitCode::FAILURE
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,api_contract_diff=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
