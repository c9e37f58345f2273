use peglet_lib::codegen::{CodegenConfig, Generator, Profile};
use peglet_lib::syntax::parse_grammar;

use crate::cli::{CodegenArgs, ProfileArg};
use crate::util::grammar_source;

pub fn run(args: CodegenArgs) -> i32 {
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
                .render()
        );
        return 1;
    }
    if let Err(error) = parse.grammar.validate() {
        eprintln!("error: {error}");
        return 1;
    }

    let config = CodegenConfig {
        profile: match args.profile {
            ProfileArg::Basic => Profile::Basic,
            ProfileArg::Advanced => Profile::Advanced,
        },
        parser_name: args.parser_name.clone(),
    };
    let generated = Generator::new(&parse.grammar, config).emit();

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, generated) {
                eprintln!("error: failed to write {}: {e}", path.display());
                return 2;
            }
            0
        }
        None => {
            print!("{generated}");
            0
        }
    }
}
