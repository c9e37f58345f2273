use std::io::Read;
use std::path::Path;

use crate::cli::GrammarArgs;

/// Reads a file, with "-" meaning stdin.
pub fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))
    }
}

/// Resolves the grammar text plus a display path for diagnostics.
pub fn grammar_source(args: &GrammarArgs) -> Result<(String, String), String> {
    match (&args.grammar_file, &args.grammar_text) {
        (Some(path), _) => {
            let text = read_input(path)?;
            Ok((text, path.display().to_string()))
        }
        (None, Some(text)) => Ok((text.clone(), "<grammar>".to_string())),
        (None, None) => Err("no grammar given".to_string()),
    }
}
