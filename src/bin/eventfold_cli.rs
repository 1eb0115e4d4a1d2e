use clap::{Parser, Subcommand};
use eventfold::logging::init_logging;
use eventfold::runtime::{Runtime, RuntimeConfig};
use eventfold::transform::FunctionLibrary;
use eventfold::{RemapError, Value};
use log::info;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable colored diagnostics
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program against one JSON event
    Run {
        /// Path to the program file
        #[arg(long, short, conflicts_with = "source", required_unless_present = "source")]
        program: Option<PathBuf>,
        /// Program source given inline
        #[arg(short = 'e', long = "source")]
        source: Option<String>,
        /// JSON event, or `-` to read it from stdin
        #[arg(long, default_value = "{}")]
        event: String,
        /// IANA timezone for time functions (overrides the config file)
        #[arg(long)]
        timezone: Option<String>,
        /// Also print the value of the last statement
        #[arg(long)]
        show_result: bool,
    },
    /// Check that a program compiles
    Check {
        /// Path to the program file
        #[arg(long, short, required = true)]
        program: PathBuf,
    },
    /// List the available functions
    Functions {},
}

fn load_config(cli: &Cli) -> Result<(RuntimeConfig, Option<String>), Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => {
            let loaded = RuntimeConfig::from_file(path)?;
            Ok((loaded.runtime, loaded.log_level))
        }
        None => Ok((RuntimeConfig::from_env()?, None)),
    }
}

fn read_source(program: Option<PathBuf>, source: Option<String>) -> io::Result<String> {
    match (program, source) {
        (_, Some(source)) => Ok(source),
        (Some(path), None) => fs::read_to_string(path),
        (None, None) => Ok(String::new()),
    }
}

fn read_event(event: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let text = if event == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        event.to_string()
    };
    Ok(Value::from_json_str(&text)?)
}

fn render(error: &RemapError, source: &str, colored: bool) -> String {
    match error {
        RemapError::Compile(diagnostics) if colored => diagnostics.colored_message(),
        RemapError::Compile(diagnostics) => diagnostics.formatted_message(),
        RemapError::Runtime(fault) => {
            let diagnostics = eventfold::diagnostic::DiagnosticSet::from_fault(source, fault);
            if colored {
                diagnostics.colored_message()
            } else {
                diagnostics.formatted_message()
            }
        }
        RemapError::Config(err) => err.to_string(),
    }
}

fn handle_run(
    runtime: &Runtime,
    source: &str,
    event: Value,
    show_result: bool,
) -> Result<(), RemapError> {
    let outcome = runtime.run(source, event)?;
    info!("Program finished in {:.3}ms", outcome.elapsed_ms);
    println!("{}", outcome.event.to_json());
    if show_result {
        println!("{}", outcome.result);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (mut config, log_level) = load_config(&cli)?;
    init_logging(log_level.as_deref());
    let colored = !cli.no_color;

    match cli.command {
        Commands::Run {
            program,
            source,
            event,
            timezone,
            show_result,
        } => {
            if let Some(timezone) = timezone {
                config = RuntimeConfig::new(Some(timezone.as_str()))?;
            }
            let source = read_source(program, source)?;
            let event = read_event(&event)?;
            let runtime = Runtime::new(config);
            if let Err(error) = handle_run(&runtime, &source, event, show_result) {
                eprintln!("{}", render(&error, &source, colored));
                process::exit(1);
            }
        }
        Commands::Check { program } => {
            let source = fs::read_to_string(&program)?;
            let runtime = Runtime::new(config);
            match runtime.check_syntax(&source) {
                None => println!("{}: ok", program.display()),
                Some(diagnostics) => {
                    let rendered = if colored {
                        diagnostics.colored_message()
                    } else {
                        diagnostics.formatted_message()
                    };
                    eprintln!("{}", rendered);
                    process::exit(1);
                }
            }
        }
        Commands::Functions {} => {
            let library = FunctionLibrary::standard();
            for name in library.names() {
                if let Some(function) = library.get(name) {
                    println!(
                        "{}({}){}",
                        function.name,
                        function
                            .parameters
                            .iter()
                            .map(|p| if p.required {
                                p.keyword.to_string()
                            } else {
                                format!("{}?", p.keyword)
                            })
                            .collect::<Vec<_>>()
                            .join(", "),
                        if function.fallible { "  (fallible)" } else { "" }
                    );
                }
            }
        }
    }

    Ok(())
}
