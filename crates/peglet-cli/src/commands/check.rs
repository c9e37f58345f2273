use peglet_lib::syntax::parse_grammar;

use crate::cli::CheckArgs;
use crate::util::grammar_source;

pub fn run(args: CheckArgs) -> i32 {
    let (source, path) = match grammar_source(&args.grammar) {
        Ok(pair) => pair,
        Err(message) => {
            eprintln!("error: {message}");
            return 2;
        }
    };

    let parse = parse_grammar(&source);
    if parse.diagnostics.has_errors() {
        eprintln!(
            "{}",
            parse
                .diagnostics
                .printer()
                .source(&source)
                .path(&path)
                .colored(args.color.should_colorize())
                .render()
        );
        return 1;
    }

    if let Err(error) = parse.grammar.validate() {
        match error.offset() {
            Some(offset) => {
                let mut diagnostics = peglet_lib::diagnostics::Diagnostics::new();
                diagnostics.error(error.to_string(), offset..offset).emit();
                eprintln!(
                    "{}",
                    diagnostics
                        .printer()
                        .source(&source)
                        .path(&path)
                        .colored(args.color.should_colorize())
                        .render()
                );
            }
            None => eprintln!("error: {error}"),
        }
        return 1;
    }

    println!(
        "ok: {} rule{}",
        parse.grammar.len(),
        if parse.grammar.len() == 1 { "" } else { "s" }
    );
    0
}
