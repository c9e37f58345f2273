//! Per-parse mutable state.
//!
//! A [`Context`] is created at the start of a parse call and destroyed when
//! it returns; it is never shared across parses. Compiled grammars stay
//! immutable, so concurrent parses from different threads each own their
//! context.

use std::collections::HashMap;

use indexmap::IndexMap;
use peglet_core::{CharClass, CstNode, SourceLocation, Trivia, Value};

use super::outcome::{Failure, Recovery};

/// Runtime configuration for a parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Memoize `(rule, offset)` results. Disabling trades memory for the
    /// PEG worst-case running time.
    pub packrat: bool,
    /// Collect trivia into the CST.
    pub capture_trivia: bool,
    pub recovery: Recovery,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            packrat: true,
            capture_trivia: true,
            recovery: Recovery::Basic,
        }
    }
}

/// Furthest-failure record for error localization after backtracking.
#[derive(Debug, Clone, Default)]
pub(crate) struct Furthest {
    pub location: SourceLocation,
    pub expected: Vec<String>,
}

/// A memoized rule result. Successes store the end location so a cache hit
/// can restore the cursor; failures are memoized too (required for the
/// linear-time bound).
#[derive(Debug, Clone)]
pub(crate) enum CacheEntry {
    Cst {
        node: CstNode,
        end: SourceLocation,
    },
    Value {
        value: Value,
        end: SourceLocation,
    },
    Failure(Failure),
}

/// A snapshot of the backtrackable context state. Pending trivia is
/// snapshotted by value: a backtracked region is re-skipped later, so the
/// snapshot must win over anything collected since.
#[derive(Debug, Clone)]
pub(crate) struct Saved {
    pub cursor: SourceLocation,
    trivia: Vec<Trivia>,
}

pub(crate) struct Context<'i> {
    pub input: &'i str,
    pub cursor: SourceLocation,
    pub config: ParserConfig,
    pub furthest: Furthest,
    /// Packrat cache keyed by dense rule id and byte offset.
    cache: HashMap<(u32, usize), CacheEntry>,
    /// Named captures. Insertion-ordered so dumps are deterministic.
    pub captures: IndexMap<String, String>,
    capture_stack: Vec<IndexMap<String, String>>,
    /// Nonzero inside `< … >`; inhibits whitespace skipping and trivia
    /// collection.
    pub token_depth: u32,
    /// Re-entry guard while evaluating the whitespace expression.
    pub in_whitespace: bool,
    /// Trivia collected since the last node was created; attaches to the
    /// next leaf as leading trivia.
    pub pending_trivia: Vec<Trivia>,
    /// Token-boundary capture slot of the rule currently being evaluated
    /// (value pass).
    pub token_slot: Option<String>,
}

impl<'i> Context<'i> {
    pub fn new(input: &'i str, config: ParserConfig) -> Self {
        Self {
            input,
            cursor: SourceLocation::START,
            config,
            furthest: Furthest::default(),
            cache: HashMap::new(),
            captures: IndexMap::new(),
            capture_stack: Vec::new(),
            token_depth: 0,
            in_whitespace: false,
            pending_trivia: Vec::new(),
            token_slot: None,
        }
    }

    pub fn rest(&self) -> &'i str {
        &self.input[self.cursor.offset..]
    }

    pub fn at_end(&self) -> bool {
        self.cursor.offset >= self.input.len()
    }

    /// Consumes `len` bytes, updating line/column.
    pub fn advance(&mut self, len: usize) -> &'i str {
        let consumed = &self.input[self.cursor.offset..self.cursor.offset + len];
        self.cursor = self.cursor.advanced(consumed);
        consumed
    }

    pub fn save(&self) -> Saved {
        Saved {
            cursor: self.cursor,
            trivia: self.pending_trivia.clone(),
        }
    }

    pub fn restore(&mut self, saved: &Saved) {
        self.cursor = saved.cursor;
        self.pending_trivia.clone_from(&saved.trivia);
    }

    /// Slice of input consumed since `saved`.
    pub fn consumed_since(&self, saved: &Saved) -> &'i str {
        &self.input[saved.cursor.offset..self.cursor.offset]
    }

    // --- terminal matchers -------------------------------------------------

    /// Byte length of `text` if it matches at the cursor.
    pub fn match_literal(&self, text: &str, case_insensitive: bool) -> Option<usize> {
        let rest = self.rest();
        if case_insensitive {
            let candidate = rest.get(0..text.len())?;
            candidate.eq_ignore_ascii_case(text).then_some(text.len())
        } else {
            rest.starts_with(text).then_some(text.len())
        }
    }

    /// Byte length of the character at the cursor if the class accepts it.
    pub fn match_class(&self, class: &CharClass) -> Option<usize> {
        let ch = self.rest().chars().next()?;
        class.matches(ch).then(|| ch.len_utf8())
    }

    /// Byte length of the character at the cursor, if any.
    pub fn match_any(&self) -> Option<usize> {
        self.rest().chars().next().map(char::len_utf8)
    }

    /// Longest-matching word of the dictionary at the cursor.
    pub fn match_dictionary(&self, words: &[String], case_insensitive: bool) -> Option<usize> {
        let mut best: Option<usize> = None;
        for word in words {
            if self.match_literal(word, case_insensitive) == Some(word.len())
                && best.is_none_or(|len| word.len() > len)
            {
                best = Some(word.len());
            }
        }
        best
    }

    // --- furthest failure --------------------------------------------------

    /// Records a terminal failure at `location`. A strictly further offset
    /// replaces the record; an equal offset merges the expected set.
    pub fn note_failure(&mut self, location: SourceLocation, expected: &[String]) {
        if self.in_whitespace {
            return;
        }
        if location.offset > self.furthest.location.offset {
            self.furthest = Furthest {
                location,
                expected: expected.to_vec(),
            };
        } else if location.offset == self.furthest.location.offset {
            self.furthest.location = location;
            for item in expected {
                if !self.furthest.expected.contains(item) {
                    self.furthest.expected.push(item.clone());
                }
            }
        }
    }

    /// The furthest failure as a user-facing payload.
    pub fn furthest_failure(&self) -> Failure {
        Failure {
            location: self.furthest.location,
            expected: self.furthest.expected.clone(),
            message: None,
        }
    }

    // --- packrat cache -----------------------------------------------------

    pub fn cache_get(&self, rule_id: u32, offset: usize) -> Option<&CacheEntry> {
        if !self.config.packrat {
            return None;
        }
        self.cache.get(&(rule_id, offset))
    }

    pub fn cache_put(&mut self, rule_id: u32, offset: usize, entry: CacheEntry) {
        if !self.config.packrat {
            return;
        }
        self.cache.insert((rule_id, offset), entry);
    }

    // --- captures ----------------------------------------------------------

    pub fn define_capture(&mut self, name: &str, text: String) {
        self.captures.insert(name.to_string(), text);
    }

    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    /// Opens a capture scope: captures defined inside are discarded when
    /// the scope closes, on success and failure alike.
    pub fn push_capture_scope(&mut self) {
        self.capture_stack.push(self.captures.clone());
    }

    pub fn pop_capture_scope(&mut self) {
        if let Some(saved) = self.capture_stack.pop() {
            self.captures = saved;
        }
    }

    // --- trivia ------------------------------------------------------------

    /// Takes the pending trivia for attachment to the node being created.
    pub fn take_trivia(&mut self) -> Vec<Trivia> {
        if self.in_whitespace {
            return Vec::new();
        }
        std::mem::take(&mut self.pending_trivia)
    }
}
