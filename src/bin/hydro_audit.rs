use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use hydro_audit::app::{App, RunOptions};
use hydro_audit::catalog::CatalogHttpClient;
use hydro_audit::config::ConfigLoader;
use hydro_audit::domain::ReportVariant;
use hydro_audit::error::AuditError;
use hydro_audit::parser::{HydroCliConverter, ToolStatus};
use hydro_audit::store::Store;

#[derive(Parser)]
#[command(name = "hydro-audit")]
#[command(about = "Audit CCHDO exchange files in parallel and publish an HTML status report")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch the catalog, convert eligible files, write the report")]
    Run(RunArgs),
    #[command(about = "Check that the conversion tool is available")]
    Check,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, value_enum, default_value_t = ReportVariant::Bottle)]
    variant: ReportVariant,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, help = "Skip files whose artifact already exists (ctd default)")]
    skip_existing: bool,

    #[arg(long, help = "Re-convert files whose artifact already exists")]
    force: bool,

    #[arg(long, help = "Classify only; print the task count and exit")]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(audit) = report.downcast_ref::<AuditError>() {
            return ExitCode::from(map_exit_code(audit));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AuditError) -> u8 {
    match error {
        AuditError::ConfigRead(_) | AuditError::ConfigParse(_) => 2,
        AuditError::CatalogHttp(_)
        | AuditError::CatalogStatus { .. }
        | AuditError::CatalogDecode(_)
        | AuditError::MissingTool(_)
        | AuditError::Conversion(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_audit(args),
        Commands::Check => run_check(),
    }
}

fn run_audit(args: RunArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;

    let store = Store::new(config.output_dir.clone(), config.report_dir.clone());
    let catalog = CatalogHttpClient::new(&config.base_url).into_diagnostic()?;
    let converter = HydroCliConverter::new(&config.converter_command);

    if !args.dry_run {
        if let ToolStatus::Missing { message } = converter.tool_status() {
            return Err(miette::Report::new(AuditError::MissingTool(message)));
        }
    }

    let app = App::new(store, catalog, converter, config.base_url.clone());
    let options = RunOptions {
        variant: args.variant,
        workers: args.workers.or(config.workers),
        skip_existing: args.skip_existing,
        force: args.force,
        dry_run: args.dry_run,
    };

    let summary = app.run(options).into_diagnostic()?;
    let json = serde_json::to_string_pretty(&summary).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn run_check() -> miette::Result<()> {
    let config = ConfigLoader::resolve(None).into_diagnostic()?;
    let converter = HydroCliConverter::new(&config.converter_command);
    match converter.tool_status() {
        ToolStatus::Ready => {
            let info = converter.tool_info();
            println!(
                "converter: {} ({})",
                config.converter_command,
                info.converter.as_deref().unwrap_or("version unknown")
            );
            Ok(())
        }
        ToolStatus::Missing { message } => {
            Err(miette::Report::new(AuditError::MissingTool(message)))
        }
    }
}
