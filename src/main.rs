use scenario_cli::{CliError, Interpreter, prescan_options};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scenario_cli={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<CliError>().is_some() { 2 } else { 1 }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let sh = Interpreter::default();

    // The parse logs at trace level, so the subscriber must exist before it runs.
    init_tracing(prescan_options(&args).verbosity);

    let (parsed, resolver) = match sh.parse(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    tracing::debug!(commands = parsed.commands.len(), "parsed command line");

    let mut stdout = std::io::stdout();
    let mut code = match sh.execute(&parsed, &resolver, &mut stdout) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_code(&e)
        }
    };

    if code == 0 && parsed.options.interactive {
        if let Err(e) = sh.repl() {
            eprintln!("error: {}", e);
            code = 1;
        }
    }
    std::process::exit(code);
}
