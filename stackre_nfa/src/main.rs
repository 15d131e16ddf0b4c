use std::process::ExitCode;

use anyhow::Context;
use stackre_nfa::{compile, matcher::Matcher};

const USAGE: &str = "usage: stackre [--dump] PATTERN TEXT...";

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("stackre: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let mut args = std::env::args_os().skip(1).peekable();
    let dump = args.next_if(|arg| arg == "--dump").is_some();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::FAILURE);
    }

    let pattern = args
        .next()
        .and_then(|arg| arg.into_string().ok())
        .context("pattern is invalid UTF-8")?;
    let nfa = compile(&pattern).with_context(|| format!("bad pattern {:?}", pattern))?;
    if dump {
        print!("{}", nfa);
    }

    let matcher = Matcher::new(&nfa);
    for arg in args {
        let haystack = arg
            .into_string()
            .ok()
            .context("text is invalid UTF-8")?;
        for m in matcher.find_all(&haystack) {
            println!(
                "found {:?} (offset={}, length={})",
                m.as_str(&haystack),
                m.offset,
                m.length
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
