mod cli;
mod commands;
mod util;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let code = match cli.command {
        cli::Command::Check(args) => commands::check::run(args),
        cli::Command::Parse(args) => commands::parse::run(args),
        cli::Command::Codegen(args) => commands::codegen::run(args),
    };
    std::process::exit(code);
}
