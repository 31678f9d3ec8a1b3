use std::io::{self, IsTerminal};

use clap::Parser;
use color_eyre::Result;
use sandroot_core::GlobalOptions;

mod cli;
mod dispatch;
mod style;

use cli::SandrootCli;
use dispatch::Outcome;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = SandrootCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        no_color: cli.no_color,
    };

    let outcome = dispatch::run(&cli, &global)?;
    let code = emit_output(&global, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("sandroot_core={level},sandroot_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(global: &GlobalOptions, outcome: &Outcome) -> Result<i32> {
    let code = outcome.status.exit_code();
    let style = Style::new(global.no_color, io::stdout().is_terminal());

    if global.json {
        let payload = serde_json::json!({
            "status": outcome.status,
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if let Some(text) = &outcome.passthrough {
        println!("{text}");
    } else if !global.quiet {
        println!("{}", style.status(outcome.status, &outcome.message));
        if let Some(hint) = outcome.details.get("hint").and_then(|hint| hint.as_str()) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
    }

    Ok(code)
}
