use peglet_core::AstNode;
use peglet_lib::{Error, Peg};

use crate::cli::{ParseArgs, TreeKind};
use crate::util::{grammar_source, read_input};

pub fn run(args: ParseArgs) -> i32 {
    let (grammar_text, grammar_path) = match grammar_source(&args.grammar) {
        Ok(pair) => pair,
        Err(message) => {
            eprintln!("error: {message}");
            return 2;
        }
    };

    let input = match (&args.input_file, &args.input_text) {
        (Some(path), _) => match read_input(path) {
            Ok(text) => text,
            Err(message) => {
                eprintln!("error: {message}");
                return 2;
            }
        },
        (None, Some(text)) => text.clone(),
        (None, None) => {
            eprintln!("error: no input given (use --input or --input-text)");
            return 2;
        }
    };

    let peg = match Peg::new(&grammar_text) {
        Ok(peg) => peg,
        Err(Error::GrammarSyntax { diagnostics, .. }) => {
            eprintln!(
                "{}",
                diagnostics
                    .printer()
                    .source(&grammar_text)
                    .path(&grammar_path)
                    .colored(args.color.should_colorize())
                    .render()
            );
            return 1;
        }
        Err(error) => {
            eprintln!("error: {error}");
            return 1;
        }
    };
    let peg = peg
        .with_packrat(!args.no_packrat)
        .with_capture_trivia(!args.no_trivia);
    let start = args.start_rule.as_deref();

    if args.diagnostics {
        return run_with_diagnostics(&peg, &input, start, &args);
    }

    match args.tree {
        TreeKind::Cst => match peg.parse_cst_from(&input, start) {
            Ok(cst) => {
                if args.json {
                    println!("{}", to_json(&cst));
                } else {
                    print!("{}", cst.dump());
                }
                0
            }
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
        TreeKind::Ast => match peg.parse_ast_from(&input, start) {
            Ok(ast) => {
                if args.json {
                    println!("{}", to_json(&ast));
                } else {
                    print!("{}", ast.dump());
                }
                0
            }
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
    }
}

fn run_with_diagnostics(peg: &Peg, input: &str, start: Option<&str>, args: &ParseArgs) -> i32 {
    let report = match peg.parse_cst_with_diagnostics_from(input, start) {
        Ok(report) => report,
        Err(error) => {
            eprintln!("error: {error}");
            return 1;
        }
    };

    if !report.diagnostics.is_empty() {
        eprintln!(
            "{}",
            report
                .diagnostics
                .printer()
                .source(&report.source)
                .colored(args.color.should_colorize())
                .render()
        );
    }

    match &report.node {
        Some(node) => {
            if matches!(args.tree, TreeKind::Ast) {
                let ast = AstNode::project(node);
                if args.json {
                    println!("{}", to_json(&ast));
                } else {
                    print!("{}", ast.dump());
                }
            } else if args.json {
                println!("{}", to_json(node));
            } else {
                print!("{}", node.dump());
            }
            if report.diagnostics.is_empty() { 0 } else { 1 }
        }
        None => 1,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
