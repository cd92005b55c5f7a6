//! wdl-frontend CLI
//!
//! Parses one WDL 1.1 document, reports syntax errors and diagnostics, and
//! prints the document. Exit status: 0 for a clean parse, 1 for syntax errors
//! or a failed `--eval`, 2 when the input or the configuration cannot be read.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use wdl_frontend::config::{resolve_config, Config, OutputFormat};
use wdl_frontend::parser::{parse_file, ParsedDocument};
use wdl_frontend::{Environment, ErrorKind, ScopeEnvironment, Value, WdlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Summary,
    Json,
    Debug,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Summary => OutputFormat::Summary,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Debug => OutputFormat::Debug,
        }
    }
}

/// Parse a WDL 1.1 document and report what it declares.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The WDL document to parse
    path: PathBuf,

    /// Configuration file (default: $WDL_FRONTEND_CONFIG, then ~/.wdl-frontend.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format; overrides the configuration
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// More logging; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Evaluate a declaration after a clean parse and print its value
    #[arg(long, value_name = "NAME")]
    eval: Option<String>,

    /// Workflow or task whose scope `--eval` resolves in
    #[arg(long, value_name = "WORKFLOW_OR_TASK", requires = "eval")]
    scope: Option<String>,
}

/// Exit status for a failed run
fn exit_code(err: &WdlError) -> i32 {
    match err.kind() {
        ErrorKind::Io | ErrorKind::Config => 2,
        _ => 1,
    }
}

fn init_logging(args: &Args, config: &Config) {
    let level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => config.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let args = Args::parse();

    let config = match resolve_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("wdl-frontend error: {}", err);
            process::exit(exit_code(&err));
        }
    };
    init_logging(&args, &config);

    match run(&args, &config) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("wdl-frontend error: {}", err);
            process::exit(exit_code(&err));
        }
    }
}

fn run(args: &Args, config: &Config) -> Result<i32, WdlError> {
    let parsed = parse_file(&args.path, &config.parse)?;

    for error in &parsed.syntax_errors {
        eprintln!("{}", error);
    }
    if parsed.suppressed > 0 {
        eprintln!("... {} more syntax error(s)", parsed.suppressed);
    }
    for diagnostic in &parsed.diagnostics {
        match diagnostic.source_position() {
            Some(pos) => eprintln!("{} {}: {}", pos, diagnostic.kind(), diagnostic),
            None => eprintln!("{}: {}", diagnostic.kind(), diagnostic),
        }
    }

    let format = args.format.map(OutputFormat::from).unwrap_or(config.output.format);
    print_document(&parsed, format)?;

    if !parsed.is_clean() {
        return Ok(1);
    }
    if let Some(name) = &args.eval {
        let value = evaluate_declaration(&parsed, name, args.scope.as_deref())?;
        match format {
            OutputFormat::Json => println!("{}", value.to_json()),
            _ => println!("{} = {}", name, value),
        }
    }
    Ok(0)
}

fn evaluate_declaration(
    parsed: &ParsedDocument,
    name: &str,
    scope: Option<&str>,
) -> Result<Value, WdlError> {
    let document = &parsed.document;
    let scope = match scope {
        Some(section) => document
            .section_scope(section)
            .ok_or_else(|| WdlError::unresolved(section))?,
        None => document
            .workflow
            .as_ref()
            .map(|w| w.scope)
            .unwrap_or(document.scope),
    };
    ScopeEnvironment::new(document, scope).lookup(name)
}

fn print_document(parsed: &ParsedDocument, format: OutputFormat) -> Result<(), WdlError> {
    let document = &parsed.document;
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(document)
                .map_err(|e| WdlError::malformed(format!("cannot serialize document: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Debug => println!("{:#?}", document),
        OutputFormat::Summary => {
            println!("{}: version {}", document.path, document.version);
            for import in &document.imports {
                println!("  import {} as {}", import.uri, import.namespace());
            }
            for def in &document.structs {
                println!("  struct {} ({} members)", def.name, def.members.len());
            }
            if let Some(workflow) = &document.workflow {
                println!(
                    "  workflow {}: {} inputs, {} outputs, {} calls",
                    workflow.name,
                    workflow.inputs.len(),
                    workflow.outputs.len(),
                    workflow.calls.len()
                );
            }
            for task in &document.tasks {
                println!(
                    "  task {}: {} inputs, {} outputs, {} command placeholders",
                    task.name,
                    task.inputs.len(),
                    task.outputs.len(),
                    task.command_placeholders.len()
                );
            }
        }
    }
    Ok(())
}
