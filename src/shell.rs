//! Shell Driver
//!
//! Owns the parser pipeline and the environment, feeds input through
//! them, and executes completed top-level commands as they appear. The
//! terminating control signal stops here: its status is recorded, the
//! interrupt counter is reset, and — interactively — the diagnostic is
//! suppressed when the command that terminated was itself the last,
//! terminal one (so a plain `Exit` doesn't double-report).

use std::io::Read;

use log::debug;

use crate::ast::Command;
use crate::interpreter::engine;
use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;
use crate::parser::Parser;
use crate::signal;

#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// echo commands to diagnostic output ({Echo})
    pub echo: bool,
    /// abort on non-zero status ({Exit}); scripts default to on
    pub exit_on_error: bool,
    /// parse and echo but run no externals ({Test})
    pub test: bool,
    /// startup mode: external commands are refused
    pub startup: bool,
    /// interactive: keep going after the terminating signal
    pub interactive: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            echo: false,
            exit_on_error: true,
            test: false,
            startup: false,
            interactive: false,
        }
    }
}

pub struct Shell {
    env: Environment,
    parser: Parser,
    fds: FdMask,
    interactive: bool,
    aborted: bool,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Self {
        let mut env = Environment::new();
        env.set("exit", if options.exit_on_error { "1" } else { "0" }, false);
        if options.echo {
            env.set("echo", "1", false);
        }
        if options.test {
            env.set("test", "1", false);
        }
        env.set_startup(options.startup);
        Self {
            env,
            parser: Parser::new(),
            fds: FdMask::new(),
            interactive: options.interactive,
            aborted: false,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Bind `{0}`, positional parameters, and `{#}`.
    pub fn set_argv(&mut self, argv0: &str, params: &[String]) {
        self.env.set_argv(argv0, params);
    }

    /// True while the parser needs more input to finish a construct.
    pub fn continuation(&self) -> bool {
        self.parser.continuation()
    }

    /// Did the terminating signal abort the rest of the input?
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Feed a chunk of input and execute whatever completed.
    pub fn feed(&mut self, input: &str) {
        if self.aborted {
            return;
        }
        let commands = self.parser.parse(input);
        self.run(commands);
    }

    /// Finish the input stream and execute the remainder.
    pub fn finish(&mut self) -> i32 {
        if !self.aborted {
            let commands = self.parser.finish();
            self.run(commands);
        }
        self.env.status()
    }

    /// Run a complete script and return the final status.
    pub fn run_string(&mut self, input: &str) -> i32 {
        self.feed(input);
        self.finish()
    }

    /// Run a script file.
    pub fn run_file(&mut self, path: &str) -> std::io::Result<i32> {
        let bytes = std::fs::read(path)?;
        Ok(self.run_string(&String::from_utf8_lossy(&bytes)))
    }

    /// Run everything readable from `reader` (stdin, usually).
    pub fn run_reader(&mut self, reader: &mut impl Read) -> std::io::Result<i32> {
        let mut buffer = String::new();
        reader.read_to_string(&mut buffer)?;
        Ok(self.run_string(&buffer))
    }

    fn run(&mut self, commands: Vec<Command>) {
        let last = commands.len().saturating_sub(1);
        for (index, command) in commands.iter().enumerate() {
            debug!("top-level execute: {:?}", command);
            match engine::execute(command, &mut self.env, &self.fds) {
                Ok(_) => {}
                Err(signal_) => {
                    // the terminating signal stops here
                    let _ = self.env.set_status(signal_.status(), false);
                    signal::clear();
                    let suppress = command.terminal() && index == last;
                    if !suppress {
                        eprintln!("### MPW Shell - Execution of input Terminated.");
                    }
                    if !self.interactive {
                        self.aborted = true;
                    }
                    return;
                }
            }
        }
    }
}
