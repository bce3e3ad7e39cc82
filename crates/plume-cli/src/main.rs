//! Batch runner and interactive REPL for the plume scripting engine.
//!
//! With a file argument the script runs to completion and errors exit with
//! a non-zero status. Without arguments an interactive prompt reads
//! commands, using the engine's parse-completeness check to keep reading
//! continuation lines until braces, quotes, and brackets balance.

use std::io::{BufRead, Write};

use plume::{Completeness, ErrKind, Exception, Interp};

fn register_host_commands(interp: &mut Interp) {
    interp.register_command("puts", |interp, argv| match argv {
        [_, text] => {
            let line = interp.get_string(*text)?;
            interp.writeln_output(&line)?;
            Ok(interp.empty())
        }
        [_, flag, text] => {
            let option = interp.get_string(*flag)?;
            if option != "-nonewline" {
                return Err(Exception::new(
                    ErrKind::NameError,
                    format!("bad option \"{option}\": must be -nonewline"),
                ));
            }
            let chunk = interp.get_string(*text)?;
            interp.write_output(&chunk)?;
            Ok(interp.empty())
        }
        _ => Err(Exception::new(
            ErrKind::WrongNumArgs,
            "wrong # args: should be \"puts ?-nonewline? string\"",
        )),
    });

    interp.register_command("source", |interp, argv| {
        if argv.len() != 2 {
            return Err(Exception::new(
                ErrKind::WrongNumArgs,
                "wrong # args: should be \"source fileName\"",
            ));
        }
        let path = interp.get_string(argv[1])?;
        let content = std::fs::read_to_string(&path)
            .map_err(|err| Exception::new(ErrKind::NameError, format!("couldn't read file \"{path}\": {err}")))?;
        interp.eval_handle(&content)
    });

    interp.register_command("exit", |interp, argv| {
        let code = match argv {
            [_] => 0,
            [_, status] => interp.get_int(*status)?,
            _ => {
                return Err(Exception::new(
                    ErrKind::WrongNumArgs,
                    "wrong # args: should be \"exit ?returnCode?\"",
                ));
            }
        };
        std::process::exit(i32::try_from(code).unwrap_or(1));
    });
}

fn run_file(path: &str) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("plume: couldn't read \"{path}\": {err}");
            return 1;
        }
    };
    let mut interp = Interp::new();
    register_host_commands(&mut interp);
    match interp.eval(&source) {
        Ok(_) => 0,
        Err(exc) => {
            eprintln!("{}", exc.message());
            if exc.error_info() != exc.message() {
                eprintln!("{}", exc.error_info());
            }
            1
        }
    }
}

fn repl() -> i32 {
    let mut interp = Interp::new();
    register_host_commands(&mut interp);
    let stdin = std::io::stdin();
    let mut buffer = String::new();
    print_prompt("% ");
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        buffer.push_str(&line);
        buffer.push('\n');
        match Interp::<plume::NoLimitTracker>::check_complete(&buffer) {
            Completeness::Incomplete => {
                print_prompt("> ");
                continue;
            }
            Completeness::Complete | Completeness::Error => {}
        }
        let script = std::mem::take(&mut buffer);
        if !script.trim().is_empty() {
            match interp.eval(&script) {
                Ok(result) => {
                    let text = result.canonical();
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
                Err(exc) => println!("{}", exc.message()),
            }
        }
        print_prompt("% ");
    }
    0
}

fn print_prompt(prompt: &str) {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let status = match args.get(1).map(String::as_str) {
        None => repl(),
        Some("--help" | "-h") => {
            println!("usage: plume ?script.plm?");
            0
        }
        Some(path) => run_file(path),
    };
    std::process::exit(status);
}
