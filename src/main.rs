use std::io::{IsTerminal, Write};

use clap::Parser;
use mpsh::{Shell, ShellOptions};

#[derive(Parser)]
#[command(name = "mpsh")]
#[command(about = "An interpreter for the MPW Shell command language")]
#[command(version)]
struct Cli {
    /// Execute this script text instead of reading a file
    #[arg(short = 'c')]
    command: Option<String>,

    /// Echo commands to diagnostic output ({Echo} = 1)
    #[arg(long)]
    echo: bool,

    /// Keep going after a command fails ({Exit} = 0)
    #[arg(long = "no-exit")]
    no_exit: bool,

    /// Parse and echo but run no external commands ({Test} = 1)
    #[arg(long)]
    test: bool,

    /// Startup mode: refuse external commands
    #[arg(long)]
    startup: bool,

    /// Script file to execute
    script_file: Option<String>,

    /// Positional parameters for the script ({1}, {2}, …)
    #[arg(trailing_var_arg = true)]
    parameters: Vec<String>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = mpsh::signal::install() {
        eprintln!("### MPW Shell - Unable to install signal handler: {}", e);
    }

    let interactive =
        cli.command.is_none() && cli.script_file.is_none() && std::io::stdin().is_terminal();

    let mut shell = Shell::new(ShellOptions {
        echo: cli.echo,
        exit_on_error: !cli.no_exit,
        test: cli.test,
        startup: cli.startup,
        interactive,
    });

    let status = if let Some(script) = cli.command {
        shell.set_argv("mpsh", &cli.parameters);
        shell.run_string(&script)
    } else if let Some(ref file) = cli.script_file {
        shell.set_argv(file, &cli.parameters);
        match shell.run_file(file) {
            Ok(status) => status,
            Err(e) => {
                eprintln!("### MPW Shell - Unable to read \"{}\": {}", file, e);
                std::process::exit(1);
            }
        }
    } else if interactive {
        repl(&mut shell)
    } else {
        shell.set_argv("mpsh", &cli.parameters);
        match shell.run_reader(&mut std::io::stdin()) {
            Ok(status) => status,
            Err(e) => {
                eprintln!("### MPW Shell - Unable to read standard input: {}", e);
                std::process::exit(1);
            }
        }
    };

    std::process::exit(status);
}

/// A plain read-eval loop; no line editing or history, just a prompt that
/// switches while a construct is open.
fn repl(shell: &mut Shell) -> i32 {
    let stdin = std::io::stdin();
    loop {
        let prompt = if shell.continuation() { "> " } else { "# " };
        eprint!("{}", prompt);
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => shell.feed(&line),
            Err(_) => break,
        }
    }
    shell.finish()
}
