//! The value pass: collects child semantic values and invokes rule
//! actions.
//!
//! Control flow mirrors the CST pass exactly (same save/restore points,
//! same commitment scoping) so the two entries agree on what matches; the
//! payload is a list of child values instead of nodes, and trivia is not
//! collected.

use peglet_core::{Expression, Grammar, SourceSpan, Value};

use super::context::{CacheEntry, Context, ParserConfig};
use super::outcome::{Failure, Outcome, ParseError, Recovery};
use super::semantics::{Actions, SemanticValues};

pub(crate) struct ValuePass<'g, 'i> {
    grammar: &'g Grammar,
    actions: &'g Actions,
    ctx: Context<'i>,
}

impl<'g, 'i> ValuePass<'g, 'i> {
    pub fn new(
        grammar: &'g Grammar,
        actions: &'g Actions,
        input: &'i str,
        config: ParserConfig,
    ) -> Self {
        // No tree is built, so trivia collection is pointless here.
        let config = ParserConfig {
            capture_trivia: false,
            ..config
        };
        Self {
            grammar,
            actions,
            ctx: Context::new(input, config),
        }
    }

    /// Parses the whole input as `start`, returning the start rule's
    /// semantic value.
    pub fn run(mut self, start: &str) -> Result<Value, ParseError> {
        match self.eval_rule(start) {
            Outcome::Success(value) => {
                self.skip_whitespace();
                if self.ctx.at_end() {
                    Ok(value)
                } else {
                    let at = self.ctx.cursor;
                    self.ctx.note_failure(at, &["end of input".to_string()]);
                    Err(self.parse_error(Failure::expecting(at, "end of input")))
                }
            }
            Outcome::PredicateSuccess | Outcome::Ignored { .. } => Ok(Value::Null),
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => {
                Err(self.parse_error(failure))
            }
        }
    }

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

    fn eval_rule(&mut self, name: &str) -> Outcome<Value> {
        let Some(rule) = self.grammar.rule(name) else {
            return Outcome::Failure(Failure::message(
                self.ctx.cursor,
                format!("undefined rule `{name}`"),
            ));
        };
        let rule_id = self.grammar.rule_id(name).unwrap_or(0);
        let start = self.ctx.cursor;

        if let Some(entry) = self.ctx.cache_get(rule_id, start.offset) {
            match entry {
                CacheEntry::Value { value, end } => {
                    let value = value.clone();
                    self.ctx.cursor = *end;
                    return Outcome::Success(value);
                }
                CacheEntry::Failure(failure) => return Outcome::Failure(failure.clone()),
                CacheEntry::Cst { .. } => {
                    unreachable!("CST entries are never written by the value pass")
                }
            }
        }

        let saved = self.ctx.save();
        self.skip_whitespace();
        let body_start = self.ctx.cursor;
        // Each rule owns its token-boundary capture slot.
        let outer_slot = self.ctx.token_slot.take();
        let mut commit = false;
        let result = self.eval(&rule.expression, &mut commit);
        let slot = std::mem::replace(&mut self.ctx.token_slot, outer_slot);

        match result {
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => {
                self.ctx.restore(&saved);
                let failure = self.substitute_rule_message(rule.error_message.as_deref(), failure);
                self.ctx
                    .cache_put(rule_id, start.offset, CacheEntry::Failure(failure.clone()));
                Outcome::Failure(failure)
            }
            success => {
                let values = match success {
                    Outcome::Success(values) => values,
                    _ => Vec::new(),
                };
                let matched = &self.ctx.input[body_start.offset..self.ctx.cursor.offset];
                // `$0` honors the token boundary, falling back to the full
                // matched span.
                let token = slot.unwrap_or_else(|| matched.to_string());
                let span = SourceSpan::new(body_start, self.ctx.cursor);

                let value = if let Some(action) = self.actions.get(name) {
                    let sv = SemanticValues::new(&token, &values, span);
                    match action.as_ref()(&sv) {
                        Ok(value) => value,
                        Err(err) => {
                            let failure = Failure::message(start, err.message);
                            self.ctx.restore(&saved);
                            self.ctx.cache_put(
                                rule_id,
                                start.offset,
                                CacheEntry::Failure(failure.clone()),
                            );
                            return Outcome::Failure(failure);
                        }
                    }
                } else {
                    // No action: propagate the first child value, else the
                    // matched text.
                    match values.into_iter().next() {
                        Some(value) => value,
                        None => Value::Str(token),
                    }
                };

                self.ctx.cache_put(
                    rule_id,
                    start.offset,
                    CacheEntry::Value {
                        value: value.clone(),
                        end: self.ctx.cursor,
                    },
                );
                Outcome::Success(value)
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

    fn eval(&mut self, expr: &'g Expression, commit: &mut bool) -> Outcome<Vec<Value>> {
        match expr {
            Expression::Literal {
                text,
                case_insensitive,
            } => match self.ctx.match_literal(text, *case_insensitive) {
                Some(len) => {
                    self.ctx.advance(len);
                    Outcome::Success(Vec::new())
                }
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::CharClass(class) => match self.ctx.match_class(class) {
                Some(len) => {
                    self.ctx.advance(len);
                    Outcome::Success(Vec::new())
                }
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::Any => match self.ctx.match_any() {
                Some(len) => {
                    self.ctx.advance(len);
                    Outcome::Success(Vec::new())
                }
                None => self.fail_expecting(vec![expr.expected_text()]),
            },
            Expression::Dictionary {
                words,
                case_insensitive,
            } => match self.ctx.match_dictionary(words, *case_insensitive) {
                Some(len) => {
                    self.ctx.advance(len);
                    Outcome::Success(Vec::new())
                }
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
                        Some(len) => {
                            self.ctx.advance(len);
                            Outcome::Success(Vec::new())
                        }
                        None => self.fail_expecting(vec![format!("'{text}'")]),
                    }
                }
            },
            Expression::Reference { rule, .. } => match self.eval_rule(rule) {
                Outcome::Success(value) => Outcome::Success(vec![value]),
                Outcome::PredicateSuccess => Outcome::PredicateSuccess,
                Outcome::Ignored { text } => Outcome::Ignored { text },
                Outcome::Failure(failure) => Outcome::Failure(failure),
                Outcome::CutFailure(failure) => Outcome::CutFailure(failure),
            },
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
            Expression::Ignore { expr } => {
                let saved = self.ctx.save();
                match self.eval(expr, commit) {
                    Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                        Outcome::Ignored {
                            text: self.ctx.consumed_since(&saved).to_string(),
                        }
                    }
                    failure => failure,
                }
            }
            Expression::Capture { name, expr } => {
                let saved = self.ctx.save();
                match self.eval(expr, commit) {
                    Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                        let text = self.ctx.consumed_since(&saved).to_string();
                        self.ctx.define_capture(name, text);
                        // Captures do not produce a child value.
                        Outcome::Success(Vec::new())
                    }
                    failure => failure,
                }
            }
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
    ) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        let mut values = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            if i > 0 && !element.is_predicate() {
                self.skip_whitespace();
            }
            match self.eval(element, commit) {
                Outcome::Success(mut child) => values.append(&mut child),
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
        Outcome::Success(values)
    }

    fn eval_choice(&mut self, alternatives: &'g [Expression]) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        let mut last: Option<Failure> = None;
        for alternative in alternatives {
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
    ) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        let mut values = Vec::new();
        let mut count: u32 = 0;
        loop {
            if max.is_some_and(|max| count >= max) {
                break;
            }
            let attempt = self.ctx.save();
            self.skip_whitespace();
            let mut iter_commit = false;
            match self.eval(body, &mut iter_commit) {
                Outcome::Success(mut child) => {
                    *commit |= iter_commit;
                    if self.ctx.cursor.offset == attempt.cursor.offset {
                        self.ctx.restore(&attempt);
                        break;
                    }
                    values.append(&mut child);
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
        Outcome::Success(values)
    }

    fn eval_optional(&mut self, body: &'g Expression, commit: &mut bool) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        let mut inner_commit = false;
        match self.eval(body, &mut inner_commit) {
            Outcome::Success(values) => {
                *commit |= inner_commit;
                Outcome::Success(values)
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
                Outcome::Success(Vec::new())
            }
            Outcome::CutFailure(failure) => {
                self.ctx.restore(&saved);
                Outcome::CutFailure(failure)
            }
        }
    }

    fn eval_and(&mut self, body: &'g Expression) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        let mut inner_commit = false;
        let result = self.eval(body, &mut inner_commit);
        self.ctx.restore(&saved);
        match result {
            Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                Outcome::PredicateSuccess
            }
            Outcome::Failure(failure) | Outcome::CutFailure(failure) => Outcome::Failure(failure),
        }
    }

    fn eval_not(&mut self, body: &'g Expression) -> Outcome<Vec<Value>> {
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
    ) -> Outcome<Vec<Value>> {
        let saved = self.ctx.save();
        self.ctx.token_depth += 1;
        let result = self.eval(body, commit);
        self.ctx.token_depth -= 1;
        match result {
            Outcome::Success(values) => {
                self.ctx.token_slot = Some(self.ctx.consumed_since(&saved).to_string());
                Outcome::Success(values)
            }
            Outcome::PredicateSuccess | Outcome::Ignored { .. } => {
                self.ctx.token_slot = Some(self.ctx.consumed_since(&saved).to_string());
                Outcome::Success(Vec::new())
            }
            failure => {
                self.ctx.restore(&saved);
                failure
            }
        }
    }

    fn fail_expecting(&mut self, expected: Vec<String>) -> Outcome<Vec<Value>> {
        let location = self.ctx.cursor;
        self.ctx.note_failure(location, &expected);
        Outcome::Failure(Failure {
            location,
            expected,
            message: None,
        })
    }

    // --- whitespace --------------------------------------------------------

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
        }
        self.ctx.in_whitespace = false;
    }
}
