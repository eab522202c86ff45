use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use geneia::{
    Authority, CheckResult, ExternalCompiler, GeneiaError, InterpreterConfig, LocalHost,
    NoAuthority, Repl, SourceFile, StopHandle, history, problems, repl::render_event,
};

#[derive(Parser)]
#[command(author, version, about = "Geneia language interpreter and checker")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Geneia script; the exit status is the script's exit code
    Run {
        script: PathBuf,
        /// Pause between iterations of a `turn` loop
        #[arg(long, default_value_t = 10)]
        iteration_delay_ms: u64,
        /// Print a JSON run record after the output
        #[arg(long)]
        record: bool,
    },
    /// Check a script for grammar problems
    Check {
        script: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Standalone compiler to defer to for errors
        #[arg(long)]
        compiler: Option<PathBuf>,
    },
    /// Check every Geneia file under the given paths
    Problems {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        compiler: Option<PathBuf>,
    },
    /// Edit and run a buffer interactively
    Repl,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    match dispatch(args.command.unwrap_or(Command::Repl)).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

async fn dispatch(command: Command) -> Result<ExitCode, GeneiaError> {
    match command {
        Command::Run {
            script,
            iteration_delay_ms,
            record,
        } => run_script(&script, iteration_delay_ms, record).await,
        Command::Check {
            script,
            json,
            compiler,
        } => check_script(&script, json, compiler).await,
        Command::Problems {
            paths,
            json,
            compiler,
        } => show_problems(&paths, json, compiler).await,
        Command::Repl => {
            let mut repl = Repl::new(Arc::new(LocalHost::new()), InterpreterConfig::default());
            repl.run().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn authority(compiler: Option<PathBuf>) -> Box<dyn Authority> {
    match compiler {
        Some(path) => Box::new(ExternalCompiler::new(path)),
        None => Box::new(NoAuthority),
    }
}

fn exit_status(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

async fn run_script(path: &Path, delay_ms: u64, print_record: bool) -> Result<ExitCode, GeneiaError> {
    let source = fs::read_to_string(path)?;
    let config =
        InterpreterConfig::default().with_iteration_delay(Duration::from_millis(delay_ms));
    let stop = StopHandle::new();

    let interrupt = stop.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.stop();
        }
    });

    let record = history::run_recorded(
        &path.display().to_string(),
        &source,
        Arc::new(LocalHost::new()),
        config,
        stop.clone(),
        |event| {
            if event.is_error() {
                eprintln!("{}", render_event(event));
            } else {
                println!("{}", render_event(event));
            }
        },
    )
    .await;
    watcher.abort();

    if stop.is_stopped() {
        eprintln!("Execution stopped");
    }
    if print_record {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(exit_status(record.exit_code))
}

async fn check_script(
    path: &Path,
    json: bool,
    compiler: Option<PathBuf>,
) -> Result<ExitCode, GeneiaError> {
    let source = fs::read_to_string(path)?;
    let name = path.display().to_string();
    let result: CheckResult =
        geneia::check_with(&source, Some(&name), authority(compiler).as_ref()).await;

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        for diag in &result.diagnostics {
            println!("{name}:{diag}");
        }
        if result.valid {
            println!("{name}: ok");
        }
    }
    Ok(if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn collect_sources(path: &Path, files: &mut Vec<SourceFile>) -> Result<(), GeneiaError> {
    if path.is_dir() {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        for entry in entries {
            collect_sources(&entry, files)?;
        }
    } else {
        let name = path.display().to_string();
        let file = SourceFile::new(name, String::new());
        if file.is_source() {
            let content = fs::read_to_string(path)?;
            files.push(SourceFile { content, ..file });
        }
    }
    Ok(())
}

async fn show_problems(
    paths: &[PathBuf],
    json: bool,
    compiler: Option<PathBuf>,
) -> Result<ExitCode, GeneiaError> {
    let mut files = Vec::new();
    for path in paths {
        collect_sources(path, &mut files)?;
    }
    let result = problems::check_all_with(&files, authority(compiler).as_ref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for file in &result.files {
            for diag in &file.diagnostics {
                println!("{}:{diag}", file.filename);
            }
        }
        println!(
            "{} error(s), {} warning(s), {} info in {} file(s)",
            result.totals.errors,
            result.totals.warnings,
            result.totals.info,
            files.len()
        );
    }
    Ok(if result.totals.errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
