use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_colorize(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum TreeKind {
    #[default]
    Cst,
    Ast,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    Basic,
    #[default]
    Advanced,
}

#[derive(Parser)]
#[command(name = "peglet", bin_name = "peglet")]
#[command(about = "PEG parsing with cpp-peglib-compatible grammar syntax")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a grammar and report diagnostics
    #[command(after_help = r#"EXAMPLES:
  peglet check -g grammar.peg
  peglet check --grammar-text "Root <- 'a'+""#)]
    Check(CheckArgs),

    /// Parse input with a grammar and dump the tree
    #[command(after_help = r#"EXAMPLES:
  peglet parse -g grammar.peg -i input.txt
  peglet parse -g grammar.peg --input-text 'hello' --tree ast --json
  peglet parse -g grammar.peg -i input.txt --diagnostics
  peglet parse -g grammar.peg -i input.txt --start-rule Item"#)]
    Parse(ParseArgs),

    /// Generate a standalone parser source file
    #[command(after_help = r#"EXAMPLES:
  peglet codegen -g grammar.peg -o parser.rs
  peglet codegen -g grammar.peg --profile basic --parser-name ListParser"#)]
    Codegen(CodegenArgs),
}

#[derive(Args)]
#[group(id = "grammar_input", required = true, multiple = false)]
pub struct GrammarArgs {
    /// Grammar from file (use "-" for stdin)
    #[arg(short = 'g', long = "grammar", value_name = "FILE")]
    pub grammar_file: Option<PathBuf>,

    /// Grammar as inline text
    #[arg(long = "grammar-text", value_name = "GRAMMAR")]
    pub grammar_text: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub grammar: GrammarArgs,

    /// Colorize output (auto-detected by default)
    #[arg(long, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,
}

#[derive(Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub grammar: GrammarArgs,

    /// Input from file (use "-" for stdin)
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Input as inline text
    #[arg(long = "input-text", value_name = "INPUT")]
    pub input_text: Option<String>,

    /// Which tree to dump
    #[arg(long, default_value = "cst", value_name = "KIND")]
    pub tree: TreeKind,

    /// Output JSON instead of a text dump
    #[arg(long)]
    pub json: bool,

    /// Parse with advanced error recovery and report all diagnostics
    #[arg(long)]
    pub diagnostics: bool,

    /// Override the start rule
    #[arg(long, value_name = "RULE")]
    pub start_rule: Option<String>,

    /// Disable packrat memoization
    #[arg(long)]
    pub no_packrat: bool,

    /// Do not collect trivia into the CST
    #[arg(long)]
    pub no_trivia: bool,

    /// Colorize diagnostics (auto-detected by default)
    #[arg(long, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,
}

#[derive(Args)]
pub struct CodegenArgs {
    #[command(flatten)]
    pub grammar: GrammarArgs,

    /// Feature profile of the generated parser
    #[arg(long, default_value = "advanced", value_name = "PROFILE")]
    pub profile: ProfileArg,

    /// Name of the generated parser struct
    #[arg(long, default_value = "Parser", value_name = "NAME")]
    pub parser_name: String,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
