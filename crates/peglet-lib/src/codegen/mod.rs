//! Standalone-parser code generator.
//!
//! Emits a single self-contained Rust source file for a grammar: helper
//! types (`Pos`, `Cause`, `Node`), a condensed expression machine, one
//! `parse_<rule>` associated function per rule, and a public `parse`
//! entry. The generated parser implements the same contracts as the
//! interpreter: `(rule_id, offset)` packrat cache, rule wrapping with
//! leading trivia, token boundaries, cut commitment, the whitespace
//! policy, captures and back-references, and furthest-failure tracking.
//!
//! The ADVANCED profile adds `Severity`/`Label`/`Diagnostic` types, an
//! `Error` node variant driver, and a `parse_with_diagnostics` entry that
//! skips to recovery points; BASIC omits them.

mod runtime;


use std::collections::HashSet;
use std::fmt::Write;

use peglet_core::{Expression, Grammar};

/// Feature profile of the emitted parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    Basic,
    #[default]
    Advanced,
}

/// Configuration for code emission.
#[derive(Debug, Clone)]
pub struct CodegenConfig {
    pub profile: Profile,
    /// Name of the emitted parser struct.
    pub parser_name: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Advanced,
            parser_name: "Parser".to_string(),
        }
    }
}

/// Emits a standalone parser source file for a grammar.
pub struct Generator<'g> {
    grammar: &'g Grammar,
    config: CodegenConfig,
    /// Rule name -> emitted function name.
    fn_names: Vec<(String, String)>,
    out: String,
}

impl<'g> Generator<'g> {
    pub fn new(grammar: &'g Grammar, config: CodegenConfig) -> Self {
        let mut used = HashSet::new();
        let mut fn_names = Vec::new();
        for (id, rule) in grammar.rules().enumerate() {
            let mut name = format!("parse_{}", sanitize(&rule.name));
            if !used.insert(name.clone()) {
                name = format!("{name}_{id}");
                used.insert(name.clone());
            }
            fn_names.push((rule.name.clone(), name));
        }
        Self {
            grammar,
            config,
            fn_names,
            out: String::new(),
        }
    }

    /// Generates the complete source file.
    pub fn emit(mut self) -> String {
        self.emit_header();
        self.out.push_str(runtime::TYPES);
        self.out.push_str(runtime::MACHINE);
        if self.config.profile == Profile::Advanced {
            self.out.push_str(runtime::ADVANCED);
        }
        self.emit_parser();
        self.out
    }

    fn emit_header(&mut self) {
        let _ = writeln!(self.out, "//! Generated parser. Do not edit.");
        let _ = writeln!(self.out, "//!");
        let _ = writeln!(
            self.out,
            "//! Profile: {}. Rules:",
            match self.config.profile {
                Profile::Basic => "BASIC",
                Profile::Advanced => "ADVANCED",
            }
        );
        for rule in self.grammar.rules() {
            let _ = writeln!(self.out, "//!   {} <- {}", rule.name, rule.expression);
        }
        let _ = writeln!(self.out);
        let _ = writeln!(
            self.out,
            "#![allow(dead_code, unused_variables, clippy::all)]"
        );
    }

    fn emit_parser(&mut self) {
        let name = self.config.parser_name.clone();
        let start_rule = self
            .grammar
            .effective_start_rule()
            .unwrap_or_default()
            .to_string();
        let start_fn = self.fn_name(&start_rule).to_string();
        let ws = if self.grammar.whitespace.is_some() {
            format!("Some({name}::whitespace as WsFn)")
        } else {
            "None".to_string()
        };

        let _ = writeln!(self.out, "\n/// Parser for the embedded grammar.");
        let _ = writeln!(self.out, "pub struct {name};\n");
        let _ = writeln!(self.out, "impl {name} {{");
        let _ = writeln!(self.out, "    pub fn new() -> {name} {{");
        let _ = writeln!(self.out, "        {name}");
        let _ = writeln!(self.out, "    }}\n");

        // parse entry
        let _ = writeln!(
            self.out,
            "    pub fn parse(&self, input: &str) -> Result<Node, Cause> {{"
        );
        let _ = writeln!(self.out, "        let mut cx = Cx::new(input, {ws});");
        let _ = writeln!(
            self.out,
            "        match {name}::{start_fn}(&mut cx) {{"
        );
        let _ = writeln!(self.out, "            Step::Node(mut node) => {{");
        let _ = writeln!(self.out, "                cx.skip_ws();");
        let _ = writeln!(
            self.out,
            "                node.trailing.append(&mut cx.pending);"
        );
        let _ = writeln!(
            self.out,
            "                if cx.pos.offset == input.len() {{"
        );
        let _ = writeln!(self.out, "                    Ok(node)");
        let _ = writeln!(self.out, "                }} else {{");
        let _ = writeln!(
            self.out,
            "                    let _ = cx.fail(&[\"end of input\".to_string()]);"
        );
        let _ = writeln!(self.out, "                    Err(cx.cause())");
        let _ = writeln!(self.out, "                }}");
        let _ = writeln!(self.out, "            }}");
        let _ = writeln!(self.out, "            _ => Err(cx.cause()),");
        let _ = writeln!(self.out, "        }}");
        let _ = writeln!(self.out, "    }}");

        if self.config.profile == Profile::Advanced {
            self.emit_recovery_entry(&name, &start_fn, &ws, &start_rule);
        }

        // whitespace rule
        if let Some(ws_inner) = self.grammar.whitespace_inner() {
            let body = self.emit_expr(ws_inner, 2);
            let _ = writeln!(self.out, "\n    fn whitespace(cx: &mut Cx) -> Step {{");
            let _ = writeln!(self.out, "        {body}");
            let _ = writeln!(self.out, "    }}");
        }

        // one function per rule
        for (id, rule) in self.grammar.rules().enumerate() {
            let fn_name = self.fn_name(&rule.name).to_string();
            let body = self.emit_expr(&rule.expression, 2);
            let message = match &rule.error_message {
                Some(m) => format!("Some({m:?})"),
                None => "None".to_string(),
            };
            let _ = writeln!(
                self.out,
                "\n    fn {fn_name}(cx: &mut Cx) -> Step {{"
            );
            let _ = writeln!(
                self.out,
                "        cx.rule({id}, {:?}, {message}, |cx| {body})",
                rule.name
            );
            let _ = writeln!(self.out, "    }}");
        }

        let _ = writeln!(self.out, "}}");

        let _ = writeln!(self.out, "\nimpl Default for {name} {{");
        let _ = writeln!(self.out, "    fn default() -> {name} {{");
        let _ = writeln!(self.out, "        {name}::new()");
        let _ = writeln!(self.out, "    }}");
        let _ = writeln!(self.out, "}}");
    }

    fn emit_recovery_entry(&mut self, name: &str, start_fn: &str, ws: &str, start_rule: &str) {
        let out = &mut self.out;
        let _ = writeln!(
            out,
            r#"
    /// Parses with error recovery: diagnostics accumulate, unparseable
    /// regions become `Error` nodes, and parsing resumes after recovery
    /// points.
    pub fn parse_with_diagnostics(&self, input: &str) -> Recovered {{
        let mut cx = Cx::new(input, {ws});
        let mut fragments: Vec<Node> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut last_reported: Option<usize> = None;
        let mut parsed_any = false;
        let mut attempted_at_end = false;

        loop {{
            cx.skip_ws();
            if cx.pos.offset >= input.len() {{
                if !fragments.is_empty() || attempted_at_end {{
                    break;
                }}
                attempted_at_end = true;
            }}
            let before = cx.pos.offset;
            let mut progressed = false;
            if let Step::Node(node) = {name}::{start_fn}(&mut cx) {{
                parsed_any = true;
                progressed = cx.pos.offset > before;
                fragments.push(node);
                if progressed {{
                    cx.skip_ws();
                    if cx.pos.offset >= input.len() {{
                        break;
                    }}
                }}
            }}
            // Report the furthest failure once per offset, then skip
            // through the next recovery point.
            if last_reported != Some(cx.furthest.offset) {{
                last_reported = Some(cx.furthest.offset);
                diagnostics.push(Diagnostic {{
                    severity: Severity::Error,
                    code: Some("E0001"),
                    message: "unexpected input".to_string(),
                    line: cx.furthest.line,
                    column: cx.furthest.column,
                    offset: cx.furthest.offset,
                    labels: vec![Label {{
                        message: format!("expected {{}}", cx.expected.join(", ")),
                        start: cx.furthest.offset,
                        end: cx.furthest.offset,
                        primary: true,
                    }}],
                    help: Some(format!("expected {{}}", cx.expected.join(", "))),
                }});
            }}
            let rest = &input[cx.pos.offset..];
            if rest.is_empty() {{
                break;
            }}
            let skip_len = rest
                .char_indices()
                .find(|(_, ch)| RECOVERY_POINTS.contains(ch))
                .map(|(i, ch)| i + ch.len_utf8())
                .unwrap_or(rest.len());
            let leading = std::mem::take(&mut cx.pending);
            let start = cx.pos.offset;
            let text = rest[..skip_len].to_string();
            cx.pos = cx.pos.advanced(&text);
            let fused = match fragments.last_mut() {{
                Some(Node {{ kind: NodeKind::Error {{ skipped, .. }}, end, .. }}) => {{
                    for t in &leading {{
                        skipped.push_str(t);
                    }}
                    skipped.push_str(&text);
                    *end = cx.pos.offset;
                    true
                }}
                _ => false,
            }};
            if !fused {{
                fragments.push(Node {{
                    rule: {start_rule:?}.to_string(),
                    start,
                    end: cx.pos.offset,
                    leading,
                    trailing: Vec::new(),
                    kind: NodeKind::Error {{
                        skipped: text,
                        expected: cx.expected.join(", "),
                    }},
                }});
            }}
        }}

        let trailing = std::mem::take(&mut cx.pending);
        let node = if parsed_any {{
            let mut root = if fragments.len() == 1 {{
                fragments.pop().expect("one fragment")
            }} else {{
                let start = fragments.first().map(|f| f.start).unwrap_or(0);
                let end = fragments.iter().map(|f| f.end).max().unwrap_or(0);
                Node {{
                    rule: {start_rule:?}.to_string(),
                    start,
                    end,
                    leading: Vec::new(),
                    trailing: Vec::new(),
                    kind: NodeKind::NonTerminal(fragments),
                }}
            }};
            root.trailing.extend(trailing);
            Some(root)
        }} else {{
            None
        }};

        Recovered {{ node, diagnostics }}
    }}"#
        );
    }

    fn fn_name(&self, rule: &str) -> &str {
        self.fn_names
            .iter()
            .find(|(name, _)| name == rule)
            .map(|(_, fn_name)| fn_name.as_str())
            .unwrap_or("parse_unknown")
    }

    /// Renders one expression as a Rust expression of type `Step`.
    fn emit_expr(&self, expr: &Expression, depth: usize) -> String {
        let pad = "    ".repeat(depth);
        let inner_pad = "    ".repeat(depth + 1);
        match expr {
            Expression::Literal {
                text,
                case_insensitive,
            } => format!("cx.literal({text:?}, {case_insensitive})"),
            Expression::CharClass(class) => format!(
                "cx.class({:?}, {}, {})",
                class.pattern, class.negated, class.case_insensitive
            ),
            Expression::Any => "cx.any()".to_string(),
            Expression::Dictionary {
                words,
                case_insensitive,
            } => {
                let list = words
                    .iter()
                    .map(|w| format!("{w:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("cx.dictionary(&[{list}], {case_insensitive})")
            }
            Expression::BackReference { name, .. } => format!("cx.backref({name:?})"),
            Expression::Reference { rule, .. } => {
                format!("Self::{}(cx)", self.fn_name(rule))
            }
            Expression::Sequence { elements } => {
                let parts = elements
                    .iter()
                    .map(|e| format!("{inner_pad}&mut |cx| {},", self.emit_expr(e, depth + 1)))
                    .collect::<Vec<_>>()
                    .join("\n");
                let preds = elements
                    .iter()
                    .map(|e| e.is_predicate().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("cx.seq(\n{inner_pad}&mut [\n{parts}\n{inner_pad}],\n{inner_pad}&[{preds}],\n{pad})")
            }
            Expression::Choice { alternatives } => {
                let alts = alternatives
                    .iter()
                    .map(|e| format!("{inner_pad}&mut |cx| {},", self.emit_expr(e, depth + 1)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("cx.choice(&mut [\n{alts}\n{pad}])")
            }
            Expression::ZeroOrMore { expr } => format!(
                "cx.repeat(&mut |cx| {}, 0, None)",
                self.emit_expr(expr, depth)
            ),
            Expression::OneOrMore { expr } => format!(
                "cx.repeat(&mut |cx| {}, 1, None)",
                self.emit_expr(expr, depth)
            ),
            Expression::Repetition { expr, min, max } => {
                let max = match max {
                    Some(max) => format!("Some({max})"),
                    None => "None".to_string(),
                };
                format!(
                    "cx.repeat(&mut |cx| {}, {min}, {max})",
                    self.emit_expr(expr, depth)
                )
            }
            Expression::Optional { expr } => {
                format!("cx.opt(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::And { expr } => {
                format!("cx.and(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::Not { expr } => {
                format!("cx.not(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::TokenBoundary { expr } => {
                format!("cx.token(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::Ignore { expr } => {
                format!("cx.ignore(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::Capture { name, expr } => format!(
                "cx.capture({name:?}, &mut |cx| {})",
                self.emit_expr(expr, depth)
            ),
            Expression::CaptureScope { expr } => {
                format!("cx.scope(&mut |cx| {})", self.emit_expr(expr, depth))
            }
            Expression::Cut => "cx.cut()".to_string(),
            Expression::Group { expr } => self.emit_expr(expr, depth),
        }
    }
}

/// Lowercases and replaces anything that cannot appear in a function
/// name.
fn sanitize(rule: &str) -> String {
    let mut out = String::with_capacity(rule.len());
    for ch in rule.chars() {
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
