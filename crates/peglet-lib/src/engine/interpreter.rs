//! The CST pass: evaluates the grammar IR into lossless trees.
//!
//! One method per IR variant, recursive descent, with explicit save/restore
//! of the context on backtracks. The advanced-recovery driver at the bottom
//! skips to synchronization characters and fills the gaps with `Error`
//! nodes, in the skip-then-retry style.

use peglet_core::{CstKind, CstNode, Expression, Grammar, SourceSpan, Trivia};

use crate::diagnostics::Diagnostics;

use super::ParseReport;
use super::context::{CacheEntry, Context, ParserConfig, Saved};
use super::outcome::{Failure, Outcome, ParseError, Recovery};

/// Characters that terminate an unparseable region in advanced recovery.
const RECOVERY_POINTS: &[char] = &[',', ';', '}', ')', ']', '\n'];

pub(crate) struct CstPass<'g, 'i> {
    grammar: &'g Grammar,
    pub(crate) ctx: Context<'i>,
    /// Names of the rules currently being evaluated; nodes are attributed
    /// to the innermost one.
    rule_stack: Vec<&'g str>,
}

impl<'g, 'i> CstPass<'g, 'i> {
    pub fn new(grammar: &'g Grammar, input: &'i str, config: ParserConfig) -> Self {
        Self {
            grammar,
            ctx: Context::new(input, config),
            rule_stack: Vec::new(),
        }
    }

    fn current_rule(&self) -> String {
        self.rule_stack.last().copied().unwrap_or("").to_string()
    }

    /// Parses the whole input as `start`, requiring end of input.
    pub fn run(mut self, start: &str) -> Result<CstNode, ParseError> {
        match self.eval_rule(start) {
            Outcome::Success(mut node) => {
                self.skip_whitespace();
                let trailing = self.ctx.take_trivia();
                node.trailing_trivia.extend(trailing);
                if self.ctx.at_end() {
                    Ok(node)
                } else {
                    let at = self.ctx.cursor;
                    self.ctx.note_failure(at, &["end of input".to_string()]);
                    Err(self.parse_error(Failure::expecting(at, "end of input")))
                }
            }
            Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                // Rule entry always wraps; these cannot escape it.
                Err(self.parse_error(Failure::message(
                    self.ctx.cursor,
                    "start rule produced no node",
                )))
            }
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => {
                Err(self.parse_error(failure))
            }
        }
    }

    /// Basic recovery reports the furthest failure; `Recovery::None`
    /// reports the raw one.
    fn parse_error(&self, failure: Failure) -> ParseError {
        match self.ctx.config.recovery {
            Recovery::None => ParseError::from_failure(failure),
            _ => {
                let furthest = self.ctx.furthest_failure();
                if furthest.expected.is_empty() {
                    ParseError::from_failure(failure)
                } else {
                    ParseError::from_failure(furthest)
                }
            }
        }
    }

    // --- rule entry --------------------------------------------------------

    fn eval_rule(&mut self, name: &str) -> Outcome<CstNode> {
        let Some(rule) = self.grammar.rule(name) else {
            return Outcome::Failure(Failure::message(
                self.ctx.cursor,
                format!("undefined rule `{name}`"),
            ));
        };
        let rule_id = self.grammar.rule_id(name).unwrap_or(0);
        let start = self.ctx.cursor;
        // Held aside so the cache payload stays caller-independent; the
        // cached node only ever contains trivia this rule consumed itself.
        let caller_trivia = self.ctx.take_trivia();

        if let Some(entry) = self.ctx.cache_get(rule_id, start.offset) {
            match entry {
                CacheEntry::Cst { node, end } => {
                    let mut node = node.clone();
                    self.ctx.cursor = *end;
                    prepend_trivia(&mut node, caller_trivia);
                    return Outcome::Success(node);
                }
                CacheEntry::Failure(failure) => {
                    let failure = failure.clone();
                    if !caller_trivia.is_empty() {
                        self.ctx.pending_trivia = caller_trivia;
                    }
                    return Outcome::Failure(failure);
                }
                CacheEntry::Value { .. } => {
                    unreachable!("value entries are never written by the CST pass")
                }
            }
        }

        let saved = self.ctx.save();
        self.skip_whitespace();
        self.rule_stack.push(rule.name.as_str());
        let mut commit = false;
        let result = self.eval(&rule.expression, &mut commit);
        self.rule_stack.pop();

        match result {
            Outcome::Success(mut node) => {
                // The rule wrapper replaces the name and keeps the inner
                // kind; single-terminal rules stay leaf-shaped.
                node.rule = name.to_string();
                self.ctx.cache_put(
                    rule_id,
                    start.offset,
                    CacheEntry::Cst {
                        node: node.clone(),
                        end: self.ctx.cursor,
                    },
                );
                prepend_trivia(&mut node, caller_trivia);
                Outcome::Success(node)
            }
            Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                let node =
                    CstNode::nonterminal(name, SourceSpan::empty(self.ctx.cursor), Vec::new());
                self.ctx.cache_put(
                    rule_id,
                    start.offset,
                    CacheEntry::Cst {
                        node: node.clone(),
                        end: self.ctx.cursor,
                    },
                );
                let mut node = node;
                prepend_trivia(&mut node, caller_trivia);
                Outcome::Success(node)
            }
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => {
                self.ctx.restore(&saved);
                let failure = self.substitute_rule_message(rule.error_message.as_deref(), failure);
                self.ctx
                    .cache_put(rule_id, start.offset, CacheEntry::Failure(failure.clone()));
                if !caller_trivia.is_empty() {
                    self.ctx.pending_trivia = caller_trivia;
                }
                // Commitment does not cross the rule boundary.
                Outcome::Failure(failure)
            }
        }
    }

    fn substitute_rule_message(&mut self, message: Option<&str>, mut failure: Failure) -> Failure {
        if let Some(message) = message {
            failure.expected = vec![message.to_string()];
            failure.message = Some(message.to_string());
            let at = failure.location;
            self.ctx.note_failure(at, &failure.expected);
        }
        failure
    }

    // --- expression dispatch -----------------------------------------------

    fn eval(&mut self, expr: &'g Expression, commit: &mut bool) -> Outcome<CstNode> {
        match expr {
            Expression::Literal {
                text,
                case_insensitive,
            } => match self.ctx.match_literal(text, *case_insensitive) {
                Some(len) => Outcome::Success(self.leaf(len)),
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::CharClass(class) => match self.ctx.match_class(class) {
                Some(len) => Outcome::Success(self.leaf(len)),
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::Any => match self.ctx.match_any() {
                Some(len) => Outcome::Success(self.leaf(len)),
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::Dictionary {
                words,
                case_insensitive,
            } => match self.ctx.match_dictionary(words, *case_insensitive) {
                Some(len) => Outcome::Success(self.leaf(len)),
                None => {
                    let expected = words.iter().map(|w| format!("'{w}'")).collect();
                    self.fail_expecting(expected)
                }
            },
            Expression::BackReference { name, .. } => match self.ctx.capture(name) {
                None => Outcome::Failure(Failure::message(
                    self.ctx.cursor,
                    format!("undefined capture `${name}`"),
                )),
                Some(text) => {
                    let text = text.to_string();
                    match self.ctx.match_literal(&text, false) {
                        Some(len) => Outcome::Success(self.leaf(len)),
                        None => self.fail_expecting(vec![format!("'{text}'")]),
                    }
                }
            },
            Expression::Reference { rule, .. } => self.eval_rule(rule),
            Expression::Sequence { elements } => self.eval_sequence(elements, commit),
            Expression::Choice { alternatives } => self.eval_choice(alternatives),
            Expression::ZeroOrMore { expr } => self.eval_repeat(expr, 0, None, commit),
            Expression::OneOrMore { expr } => self.eval_repeat(expr, 1, None, commit),
            Expression::Repetition { expr, min, max } => {
                self.eval_repeat(expr, *min, *max, commit)
            }
            Expression::Optional { expr } => self.eval_optional(expr, commit),
            Expression::And { expr } => self.eval_and(expr),
            Expression::Not { expr } => self.eval_not(expr),
            Expression::TokenBoundary { expr } => self.eval_token_boundary(expr, commit),
            // The CST keeps everything; `~` only suppresses semantic values.
            Expression::Ignore { expr } => self.eval(expr, commit),
            Expression::Capture { name, expr } => self.eval_capture(name, expr, commit),
            Expression::CaptureScope { expr } => {
                self.ctx.push_capture_scope();
                let result = self.eval(expr, commit);
                self.ctx.pop_capture_scope();
                result
            }
            Expression::Cut => {
                *commit = true;
                Outcome::PredicateSuccess
            }
            Expression::Group { expr } => self.eval(expr, commit),
        }
    }

    // --- composites --------------------------------------------------------

    fn eval_sequence(
        &mut self,
        elements: &'g [Expression],
        commit: &mut bool,
    ) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut children = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            if i > 0 && !element.is_predicate() {
                self.skip_whitespace();
            }
            match self.eval(element, commit) {
                Outcome::Success(node) => children.push(node),
                Outcome::PredicateSuccess | Outcome::Ignored { .. } => {}
                Outcome::Failure(failure) => {
                    self.ctx.restore(&saved);
                    return if *commit {
                        Outcome::CutFailure(failure)
                    } else {
                        Outcome::Failure(failure)
                    };
                }
                Outcome::CutFailure(failure) => {
                    self.ctx.restore(&saved);
                    return Outcome::CutFailure(failure);
                }
            }
        }
        Outcome::Success(self.assemble(children, saved))
    }

    fn eval_choice(&mut self, alternatives: &'g [Expression]) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut last: Option<Failure> = None;
        for alternative in alternatives {
            // Each alternative gets a fresh commit scope; a successful
            // alternative's commitment dies with the choice.
            let mut alt_commit = false;
            match self.eval(alternative, &mut alt_commit) {
                success @ (Outcome::Success(_)
                | Outcome::PredicateSuccess
                | Outcome::Ignored { .. }) => return success,
                Outcome::Failure(failure) => {
                    self.ctx.restore(&saved);
                    last = Some(failure);
                }
                Outcome::CutFailure(failure) => {
                    self.ctx.restore(&saved);
                    return Outcome::CutFailure(failure);
                }
            }
        }
        Outcome::Failure(
            last.unwrap_or_else(|| Failure::expecting(saved.cursor, "one of the alternatives")),
        )
    }

    fn eval_repeat(
        &mut self,
        body: &'g Expression,
        min: u32,
        max: Option<u32>,
        commit: &mut bool,
    ) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut children = Vec::new();
        let mut count: u32 = 0;
        loop {
            if max.is_some_and(|max| count >= max) {
                break;
            }
            let attempt = self.ctx.save();
            self.skip_whitespace();
            let mut iter_commit = false;
            match self.eval(body, &mut iter_commit) {
                Outcome::Success(node) => {
                    *commit |= iter_commit;
                    if self.ctx.cursor.offset == attempt.cursor.offset {
                        // Zero-width match; stop to guarantee termination.
                        self.ctx.restore(&attempt);
                        break;
                    }
                    children.push(node);
                    count += 1;
                }
                Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                    *commit |= iter_commit;
                    self.ctx.restore(&attempt);
                    break;
                }
                Outcome::Failure(failure) => {
                    self.ctx.restore(&attempt);
                    if count < min {
                        self.ctx.restore(&saved);
                        return if *commit {
                            Outcome::CutFailure(failure)
                        } else {
                            Outcome::Failure(failure)
                        };
                    }
                    break;
                }
                Outcome::CutFailure(failure) => {
                    self.ctx.restore(&saved);
                    return Outcome::CutFailure(failure);
                }
            }
        }
        Outcome::Success(self.assemble(children, saved))
    }

    fn eval_optional(&mut self, body: &'g Expression, commit: &mut bool) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut inner_commit = false;
        match self.eval(body, &mut inner_commit) {
            Outcome::Success(node) => {
                *commit |= inner_commit;
                Outcome::Success(node)
            }
            Outcome::PredicateSuccess => {
                *commit |= inner_commit;
                Outcome::PredicateSuccess
            }
            Outcome::Ignored { text } => {
                *commit |= inner_commit;
                Outcome::Ignored { text }
            }
            Outcome::Failure(_) => {
                self.ctx.restore(&saved);
                let rule = self.current_rule();
                Outcome::Success(CstNode::nonterminal(
                    rule,
                    SourceSpan::empty(saved.cursor),
                    Vec::new(),
                ))
            }
            Outcome::CutFailure(failure) => {
                self.ctx.restore(&saved);
                Outcome::CutFailure(failure)
            }
        }
    }

    fn eval_and(&mut self, body: &'g Expression) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut inner_commit = false;
        let result = self.eval(body, &mut inner_commit);
        self.ctx.restore(&saved);
        match result {
            Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                Outcome::PredicateSuccess
            }
            // Lookahead is a firewall: cuts inside do not leak out.
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => Outcome::Failure(failure),
        }
    }

    fn eval_not(&mut self, body: &'g Expression) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let mut inner_commit = false;
        let result = self.eval(body, &mut inner_commit);
        self.ctx.restore(&saved);
        match result {
            Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                Outcome::Failure(Failure::message(saved.cursor, "unexpected input"))
            }
            Outcome::Failure(_) | Outcome::CutFailure(_) => Outcome::PredicateSuccess,
        }
    }

    fn eval_token_boundary(
        &mut self,
        body: &'g Expression,
        commit: &mut bool,
    ) -> Outcome<CstNode> {
        let leading = self.ctx.take_trivia();
        let saved = self.ctx.save();
        self.ctx.token_depth += 1;
        let result = self.eval(body, commit);
        self.ctx.token_depth -= 1;
        match result {
            Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                let text = self.ctx.consumed_since(&saved).to_string();
                let span = SourceSpan::new(saved.cursor, self.ctx.cursor);
                self.ctx.token_slot = Some(text.clone());
                let rule = self.current_rule();
                let mut node = CstNode::token(rule, span, text);
                node.leading_trivia = leading;
                Outcome::Success(node)
            }
            failure => {
                self.ctx.restore(&saved);
                if !leading.is_empty() {
                    self.ctx.pending_trivia = leading;
                }
                failure
            }
        }
    }

    fn eval_capture(
        &mut self,
        name: &str,
        body: &'g Expression,
        commit: &mut bool,
    ) -> Outcome<CstNode> {
        let saved = self.ctx.save();
        let result = self.eval(body, commit);
        if result.is_success() {
            let text = self.ctx.consumed_since(&saved).to_string();
            self.ctx.define_capture(name, text);
        }
        result
    }

    // --- node construction -------------------------------------------------

    /// Consumes `len` bytes into a terminal leaf carrying the pending
    /// trivia.
    fn leaf(&mut self, len: usize) -> CstNode {
        let rule = self.current_rule();
        let leading = self.ctx.take_trivia();
        let start = self.ctx.cursor;
        let text = self.ctx.advance(len).to_string();
        let mut node = CstNode::terminal(rule, SourceSpan::new(start, self.ctx.cursor), text);
        node.leading_trivia = leading;
        node
    }

    /// Sequence/repetition aggregation: zero children collapse to an empty
    /// node, one child passes through, more become a NonTerminal covering
    /// them.
    fn assemble(&mut self, mut children: Vec<CstNode>, saved: Saved) -> CstNode {
        let rule = self.current_rule();
        match children.len() {
            0 => CstNode::nonterminal(rule, SourceSpan::empty(saved.cursor), Vec::new()),
            1 => children.pop().expect("one child"),
            _ => {
                let span = children
                    .iter()
                    .map(|c| c.span)
                    .reduce(SourceSpan::cover)
                    .expect("children are non-empty");
                CstNode::nonterminal(rule, span, children)
            }
        }
    }

    fn fail_expecting(&mut self, expected: Vec<String>) -> Outcome<CstNode> {
        let location = self.ctx.cursor;
        self.ctx.note_failure(location, &expected);
        Outcome::Failure(Failure {
            location,
            expected,
            message: None,
        })
    }

    // --- whitespace --------------------------------------------------------

    /// Evaluates the whitespace directive's inner expression repeatedly,
    /// classifying each consumed slice as one trivia item.
    fn skip_whitespace(&mut self) {
        if self.ctx.token_depth > 0 || self.ctx.in_whitespace {
            return;
        }
        let Some(ws) = self.grammar.whitespace_inner() else {
            return;
        };
        self.ctx.in_whitespace = true;
        loop {
            let saved = self.ctx.save();
            let mut commit = false;
            let matched = self.eval(ws, &mut commit).is_success();
            if !matched || self.ctx.cursor.offset == saved.cursor.offset {
                self.ctx.restore(&saved);
                break;
            }
            if self.ctx.config.capture_trivia {
                let text = self.ctx.consumed_since(&saved).to_string();
                let span = SourceSpan::new(saved.cursor, self.ctx.cursor);
                self.ctx.pending_trivia.push(Trivia::classify(span, text));
            }
        }
        self.ctx.in_whitespace = false;
    }

    // --- advanced recovery -------------------------------------------------

    /// Parses with error recovery: diagnostics accumulate, unparseable
    /// regions become `Error` nodes, and parsing resumes after recovery
    /// points.
    pub fn run_with_diagnostics(mut self, start: &str) -> ParseReport {
        let source = self.ctx.input.to_string();
        let mut fragments: Vec<CstNode> = Vec::new();
        let mut diagnostics = Diagnostics::new();
        let mut last_reported: Option<usize> = None;
        let mut parsed_any = false;
        let mut attempted_at_end = false;

        loop {
            self.skip_whitespace();
            if self.ctx.at_end() && (!fragments.is_empty() || attempted_at_end) {
                break;
            }
            if self.ctx.at_end() {
                attempted_at_end = true;
            }
            let before = self.ctx.cursor.offset;
            let outcome = self.eval_rule(start);
            let fallback = match outcome {
                Outcome::Success(node) => {
                    parsed_any = true;
                    let advanced = self.ctx.cursor.offset > before;
                    fragments.push(node);
                    if !advanced && !self.ctx.at_end() {
                        // Zero-width match cannot make progress; recover.
                        None
                    } else {
                        self.skip_whitespace();
                        if self.ctx.at_end() {
                            break;
                        }
                        None
                    }
                }
                Outcome::Failure(failure) | Outcome::CutFailure(failure) => Some(failure),
                Outcome::PredicateSuccess | Outcome::Ignored { .. } => None,
            };
            if !self.recover_once(start, fallback, &mut fragments, &mut diagnostics, &mut last_reported)
            {
                break;
            }
        }

        // Whatever trivia is still pending trails the tree.
        let trailing = self.ctx.take_trivia();
        let node = if parsed_any {
            let mut root = match fragments.len() {
                1 => fragments.pop().expect("one fragment"),
                _ => {
                    let span = fragments
                        .iter()
                        .map(|f| f.span)
                        .reduce(SourceSpan::cover)
                        .unwrap_or_else(|| SourceSpan::empty(self.ctx.cursor));
                    CstNode::nonterminal(start, span, fragments)
                }
            };
            root.trailing_trivia.extend(trailing);
            Some(root)
        } else {
            None
        };

        ParseReport {
            node,
            diagnostics,
            source,
        }
    }

    /// Reports the current failure (deduplicated by offset) and skips
    /// through the next recovery point, fusing adjacent error regions into
    /// one `Error` node. Returns false when no progress is possible.
    fn recover_once(
        &mut self,
        rule: &str,
        fallback: Option<Failure>,
        fragments: &mut Vec<CstNode>,
        diagnostics: &mut Diagnostics,
        last_reported: &mut Option<usize>,
    ) -> bool {
        let furthest = self.ctx.furthest_failure();
        let failure = if furthest.expected.is_empty() {
            fallback.unwrap_or(furthest)
        } else {
            furthest
        };

        if *last_reported != Some(failure.location.offset) {
            *last_reported = Some(failure.location.offset);
            let message = failure
                .message
                .clone()
                .unwrap_or_else(|| "unexpected input".to_string());
            let builder = diagnostics.error(
                message,
                failure.location.offset..failure.location.offset,
            );
            if failure.expected.is_empty() {
                builder.emit();
            } else {
                builder
                    .help(format!("expected {}", failure.expected.join(", ")))
                    .emit();
            }
        }

        let rest = self.ctx.rest();
        if rest.is_empty() {
            return false;
        }
        let skip_len = rest
            .char_indices()
            .find(|(_, ch)| RECOVERY_POINTS.contains(ch))
            .map(|(i, ch)| i + ch.len_utf8())
            .unwrap_or(rest.len());

        let leading = self.ctx.take_trivia();
        let start_loc = self.ctx.cursor;
        let text = self.ctx.advance(skip_len).to_string();
        let span = SourceSpan::new(start_loc, self.ctx.cursor);

        if let Some(prev) = fragments.last_mut() {
            if let CstKind::Error { skipped_text, .. } = &mut prev.kind {
                // Adjacent failed regions fuse; trivia between them folds
                // into the skipped text so coverage stays exact.
                for trivia in &leading {
                    skipped_text.push_str(trivia.text());
                }
                skipped_text.push_str(&text);
                prev.span = SourceSpan::new(prev.span.start, self.ctx.cursor);
                return true;
            }
        }

        let expected = failure.expected.join(", ");
        let mut error = CstNode::error(rule, span, text, expected);
        error.leading_trivia = leading;
        fragments.push(error);
        true
    }
}

fn prepend_trivia(node: &mut CstNode, mut caller_trivia: Vec<Trivia>) {
    if caller_trivia.is_empty() {
        return;
    }
    caller_trivia.append(&mut node.leading_trivia);
    node.leading_trivia = caller_trivia;
}
