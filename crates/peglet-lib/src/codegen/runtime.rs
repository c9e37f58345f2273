//! Runtime prelude embedded into generated parsers.
//!
//! The emitted file must stand alone with only std, so the generated
//! parser carries a condensed copy of the engine: the same packrat cache,
//! whitespace policy, commitment frames, and furthest-failure tracking,
//! expressed over closures instead of an IR walk.

/// Helper types: position, failure cause, nodes.
pub(super) const TYPES: &str = r##"
/// A position in the input: 1-based line/column plus byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Pos {
    fn start() -> Pos {
        Pos { line: 1, column: 1, offset: 0 }
    }

    fn advanced(mut self, text: &str) -> Pos {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += text.len();
        self
    }
}

/// Why a parse failed: the furthest position reached and what was
/// expected there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cause {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub expected: Vec<String>,
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "syntax error at {}:{}: expected {}",
            self.line,
            self.column,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for Cause {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Terminal(String),
    Token(String),
    NonTerminal(Vec<Node>),
    Error { skipped: String, expected: String },
}

/// A lossless parse-tree node; trivia rides along as raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub rule: String,
    pub start: usize,
    pub end: usize,
    pub leading: Vec<String>,
    pub trailing: Vec<String>,
    pub kind: NodeKind,
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::NonTerminal(children) => children,
            _ => &[],
        }
    }

    /// Reassembles the covered input in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for t in &self.leading {
            out.push_str(t);
        }
        match &self.kind {
            NodeKind::Terminal(text) | NodeKind::Token(text) => out.push_str(text),
            NodeKind::Error { skipped, .. } => out.push_str(skipped),
            NodeKind::NonTerminal(children) => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
        for t in &self.trailing {
            out.push_str(t);
        }
    }
}
"##;

/// The expression machine: context, matchers, combinators.
pub(super) const MACHINE: &str = r##"
/// Outcome of one parsing step.
enum Step {
    Node(Node),
    Empty,
    Fail,
    CutFail,
}

impl Step {
    fn ok(&self) -> bool {
        matches!(self, Step::Node(_) | Step::Empty)
    }
}

enum Cached {
    Hit(Node, Pos),
    Miss,
}

type Body<'a, 'i> = &'a mut dyn FnMut(&mut Cx<'i>) -> Step;
type WsFn = for<'i> fn(&mut Cx<'i>) -> Step;

struct Sv {
    pos: Pos,
    pending: Vec<String>,
}

/// Per-parse mutable state.
struct Cx<'i> {
    input: &'i str,
    pos: Pos,
    furthest: Pos,
    expected: Vec<String>,
    cache: std::collections::HashMap<(u32, usize), Cached>,
    captures: Vec<(String, String)>,
    token_depth: u32,
    in_ws: bool,
    pending: Vec<String>,
    /// Commitment frames: one per choice alternative, repetition
    /// iteration, optional body, predicate body, and rule body.
    commit: Vec<bool>,
    rules: Vec<&'static str>,
    ws: Option<WsFn>,
}

impl<'i> Cx<'i> {
    fn new(input: &'i str, ws: Option<WsFn>) -> Cx<'i> {
        Cx {
            input,
            pos: Pos::start(),
            furthest: Pos::start(),
            expected: Vec::new(),
            cache: std::collections::HashMap::new(),
            captures: Vec::new(),
            token_depth: 0,
            in_ws: false,
            pending: Vec::new(),
            commit: Vec::new(),
            rules: Vec::new(),
            ws,
        }
    }

    fn rest(&self) -> &'i str {
        &self.input[self.pos.offset..]
    }

    fn save(&self) -> Sv {
        Sv { pos: self.pos, pending: self.pending.clone() }
    }

    fn restore(&mut self, sv: &Sv) {
        self.pos = sv.pos;
        self.pending.clone_from(&sv.pending);
    }

    fn committed(&self) -> bool {
        self.commit.last().copied().unwrap_or(false)
    }

    fn cut(&mut self) -> Step {
        if let Some(top) = self.commit.last_mut() {
            *top = true;
        }
        Step::Empty
    }

    fn fail(&mut self, expected: &[String]) -> Step {
        if !self.in_ws {
            if self.pos.offset > self.furthest.offset {
                self.furthest = self.pos;
                self.expected = expected.to_vec();
            } else if self.pos.offset == self.furthest.offset {
                for item in expected {
                    if !self.expected.contains(item) {
                        self.expected.push(item.clone());
                    }
                }
            }
        }
        if self.committed() { Step::CutFail } else { Step::Fail }
    }

    fn cause(&self) -> Cause {
        Cause {
            line: self.furthest.line,
            column: self.furthest.column,
            offset: self.furthest.offset,
            expected: self.expected.clone(),
        }
    }

    fn leaf(&mut self, len: usize) -> Node {
        let leading = if self.in_ws { Vec::new() } else { std::mem::take(&mut self.pending) };
        let start = self.pos.offset;
        let text = self.input[start..start + len].to_string();
        self.pos = self.pos.advanced(&text);
        Node {
            rule: self.rules.last().copied().unwrap_or("").to_string(),
            start,
            end: self.pos.offset,
            leading,
            trailing: Vec::new(),
            kind: NodeKind::Terminal(text),
        }
    }

    // --- terminal matchers -------------------------------------------------

    fn literal(&mut self, text: &str, ci: bool) -> Step {
        let rest = self.rest();
        let matched = if ci {
            rest.get(0..text.len()).is_some_and(|c| c.eq_ignore_ascii_case(text))
        } else {
            rest.starts_with(text)
        };
        if matched {
            Step::Node(self.leaf(text.len()))
        } else {
            self.fail(&[format!("'{}'", text)])
        }
    }

    fn class(&mut self, pattern: &str, negated: bool, ci: bool) -> Step {
        let Some(ch) = self.rest().chars().next() else {
            return self.fail(&[format!("[{}{}]", if negated { "^" } else { "" }, pattern)]);
        };
        let mut hit = class_contains(pattern, ch);
        if ci && !hit {
            hit = class_contains(pattern, ch.to_ascii_lowercase())
                || class_contains(pattern, ch.to_ascii_uppercase());
        }
        if hit != negated {
            Step::Node(self.leaf(ch.len_utf8()))
        } else {
            self.fail(&[format!("[{}{}]", if negated { "^" } else { "" }, pattern)])
        }
    }

    fn any(&mut self) -> Step {
        match self.rest().chars().next() {
            Some(ch) => Step::Node(self.leaf(ch.len_utf8())),
            None => self.fail(&["any character".to_string()]),
        }
    }

    fn dictionary(&mut self, words: &[&str], ci: bool) -> Step {
        let rest = self.rest();
        let mut best: Option<usize> = None;
        for word in words {
            let matched = if ci {
                rest.get(0..word.len()).is_some_and(|c| c.eq_ignore_ascii_case(word))
            } else {
                rest.starts_with(word)
            };
            if matched && best.map_or(true, |len| word.len() > len) {
                best = Some(word.len());
            }
        }
        match best {
            Some(len) => Step::Node(self.leaf(len)),
            None => {
                let expected: Vec<String> = words.iter().map(|w| format!("'{}'", w)).collect();
                self.fail(&expected)
            }
        }
    }

    fn backref(&mut self, name: &str) -> Step {
        let Some(text) = self
            .captures
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
        else {
            return if self.committed() { Step::CutFail } else { Step::Fail };
        };
        if self.rest().starts_with(&text) {
            Step::Node(self.leaf(text.len()))
        } else {
            self.fail(&[format!("'{}'", text)])
        }
    }

    // --- combinators -------------------------------------------------------

    fn seq(&mut self, parts: &mut [Body<'_, 'i>], preds: &[bool]) -> Step {
        let sv = self.save();
        let mut children = Vec::new();
        for (i, part) in parts.iter_mut().enumerate() {
            if i > 0 && !preds.get(i).copied().unwrap_or(false) {
                self.skip_ws();
            }
            match part(self) {
                Step::Node(node) => children.push(node),
                Step::Empty => {}
                Step::Fail => {
                    self.restore(&sv);
                    return if self.committed() { Step::CutFail } else { Step::Fail };
                }
                Step::CutFail => {
                    self.restore(&sv);
                    return Step::CutFail;
                }
            }
        }
        Step::Node(self.assemble(children, &sv))
    }

    fn choice(&mut self, alts: &mut [Body<'_, 'i>]) -> Step {
        let sv = self.save();
        for alt in alts.iter_mut() {
            self.commit.push(false);
            let step = alt(self);
            self.commit.pop();
            match step {
                Step::Fail => self.restore(&sv),
                Step::CutFail => {
                    self.restore(&sv);
                    return Step::CutFail;
                }
                ok => return ok,
            }
        }
        Step::Fail
    }

    fn repeat(&mut self, body: Body<'_, 'i>, min: u32, max: Option<u32>) -> Step {
        let sv = self.save();
        let mut children = Vec::new();
        let mut count: u32 = 0;
        loop {
            if max.is_some_and(|max| count >= max) {
                break;
            }
            let attempt = self.save();
            self.skip_ws();
            self.commit.push(false);
            let step = body(self);
            let fired = self.commit.pop().unwrap_or(false);
            match step {
                Step::Node(node) => {
                    self.or_commit(fired);
                    if self.pos.offset == attempt.pos.offset {
                        self.restore(&attempt);
                        break;
                    }
                    children.push(node);
                    count += 1;
                }
                Step::Empty => {
                    self.or_commit(fired);
                    self.restore(&attempt);
                    break;
                }
                Step::Fail => {
                    self.restore(&attempt);
                    if count < min {
                        self.restore(&sv);
                        return if self.committed() { Step::CutFail } else { Step::Fail };
                    }
                    break;
                }
                Step::CutFail => {
                    self.restore(&sv);
                    return Step::CutFail;
                }
            }
        }
        Step::Node(self.assemble(children, &sv))
    }

    fn opt(&mut self, body: Body<'_, 'i>) -> Step {
        let sv = self.save();
        self.commit.push(false);
        let step = body(self);
        let fired = self.commit.pop().unwrap_or(false);
        match step {
            Step::Fail => {
                self.restore(&sv);
                Step::Node(self.empty_node(&sv))
            }
            Step::CutFail => {
                self.restore(&sv);
                Step::CutFail
            }
            ok => {
                self.or_commit(fired);
                ok
            }
        }
    }

    fn and(&mut self, body: Body<'_, 'i>) -> Step {
        let sv = self.save();
        self.commit.push(false);
        let step = body(self);
        self.commit.pop();
        self.restore(&sv);
        // Lookahead is a firewall: cuts inside never leak out.
        if step.ok() { Step::Empty } else { Step::Fail }
    }

    fn not(&mut self, body: Body<'_, 'i>) -> Step {
        let sv = self.save();
        self.commit.push(false);
        let step = body(self);
        self.commit.pop();
        self.restore(&sv);
        if step.ok() { Step::Fail } else { Step::Empty }
    }

    fn token(&mut self, body: Body<'_, 'i>) -> Step {
        let leading = if self.in_ws { Vec::new() } else { std::mem::take(&mut self.pending) };
        let sv = self.save();
        self.token_depth += 1;
        let step = body(self);
        self.token_depth -= 1;
        if step.ok() {
            let start = sv.pos.offset;
            let text = self.input[start..self.pos.offset].to_string();
            Step::Node(Node {
                rule: self.rules.last().copied().unwrap_or("").to_string(),
                start,
                end: self.pos.offset,
                leading,
                trailing: Vec::new(),
                kind: NodeKind::Token(text),
            })
        } else {
            self.restore(&sv);
            if !leading.is_empty() {
                self.pending = leading;
            }
            step
        }
    }

    fn ignore(&mut self, body: Body<'_, 'i>) -> Step {
        // The tree is lossless; `~` only affects semantic values, which a
        // generated parser does not produce.
        body(self)
    }

    fn capture(&mut self, name: &str, body: Body<'_, 'i>) -> Step {
        let start = self.pos.offset;
        let step = body(self);
        if step.ok() {
            let text = self.input[start..self.pos.offset].to_string();
            self.captures.push((name.to_string(), text));
        }
        step
    }

    fn scope(&mut self, body: Body<'_, 'i>) -> Step {
        let mark = self.captures.len();
        let step = body(self);
        self.captures.truncate(mark);
        step
    }

    fn or_commit(&mut self, fired: bool) {
        if fired {
            if let Some(top) = self.commit.last_mut() {
                *top = true;
            }
        }
    }

    // --- rule entry --------------------------------------------------------

    fn rule(
        &mut self,
        id: u32,
        name: &'static str,
        message: Option<&'static str>,
        mut body: impl FnMut(&mut Cx<'i>) -> Step,
    ) -> Step {
        let start = self.pos;
        let caller_lead = if self.in_ws { Vec::new() } else { std::mem::take(&mut self.pending) };

        match self.cache.get(&(id, start.offset)) {
            Some(Cached::Hit(node, end)) => {
                let mut node = node.clone();
                let end = *end;
                self.pos = end;
                let mut leading = caller_lead;
                leading.append(&mut node.leading);
                node.leading = leading;
                return Step::Node(node);
            }
            Some(Cached::Miss) => {
                if !caller_lead.is_empty() {
                    self.pending = caller_lead;
                }
                return Step::Fail;
            }
            None => {}
        }

        let sv = self.save();
        self.skip_ws();
        self.commit.push(false);
        self.rules.push(name);
        let step = body(self);
        self.rules.pop();
        self.commit.pop();

        match step {
            Step::Node(mut node) => {
                node.rule = name.to_string();
                self.cache.insert((id, start.offset), Cached::Hit(node.clone(), self.pos));
                let mut leading = caller_lead;
                leading.append(&mut node.leading);
                node.leading = leading;
                Step::Node(node)
            }
            Step::Empty => {
                let node = Node {
                    rule: name.to_string(),
                    start: self.pos.offset,
                    end: self.pos.offset,
                    leading: caller_lead,
                    trailing: Vec::new(),
                    kind: NodeKind::NonTerminal(Vec::new()),
                };
                self.cache.insert(
                    (id, start.offset),
                    Cached::Hit(
                        Node { leading: Vec::new(), ..node.clone() },
                        self.pos,
                    ),
                );
                Step::Node(node)
            }
            Step::Fail | Step::CutFail => {
                self.restore(&sv);
                if let Some(message) = message {
                    let message = message.to_string();
                    if !self.expected.contains(&message) {
                        self.expected.push(message);
                    }
                }
                self.cache.insert((id, start.offset), Cached::Miss);
                if !caller_lead.is_empty() {
                    self.pending = caller_lead;
                }
                // Commitment does not cross the rule boundary.
                Step::Fail
            }
        }
    }

    fn assemble(&mut self, mut children: Vec<Node>, sv: &Sv) -> Node {
        match children.len() {
            0 => self.empty_node(sv),
            1 => children.pop().expect("one child"),
            _ => {
                let start = children.first().map(|c| c.start).unwrap_or(sv.pos.offset);
                let end = children.iter().map(|c| c.end).max().unwrap_or(sv.pos.offset);
                Node {
                    rule: self.rules.last().copied().unwrap_or("").to_string(),
                    start,
                    end,
                    leading: Vec::new(),
                    trailing: Vec::new(),
                    kind: NodeKind::NonTerminal(children),
                }
            }
        }
    }

    fn empty_node(&mut self, sv: &Sv) -> Node {
        Node {
            rule: self.rules.last().copied().unwrap_or("").to_string(),
            start: sv.pos.offset,
            end: sv.pos.offset,
            leading: Vec::new(),
            trailing: Vec::new(),
            kind: NodeKind::NonTerminal(Vec::new()),
        }
    }

    // --- whitespace --------------------------------------------------------

    fn skip_ws(&mut self) {
        if self.token_depth > 0 || self.in_ws {
            return;
        }
        let Some(ws) = self.ws else {
            return;
        };
        self.in_ws = true;
        loop {
            let sv = self.save();
            let step = ws(self);
            if !step.ok() || self.pos.offset == sv.pos.offset {
                self.restore(&sv);
                break;
            }
            let text = self.input[sv.pos.offset..self.pos.offset].to_string();
            self.pending.push(text);
        }
        self.in_ws = false;
    }
}

/// Character-class membership: ranges, `\n \r \t \\ \] \-`, `\xNN`,
/// `\uNNNN`; an unknown escape stands for itself.
fn class_contains(pattern: &str, ch: char) -> bool {
    let mut decoded: Vec<(char, bool)> = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push((c, false));
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push(('\n', true)),
            Some('r') => decoded.push(('\r', true)),
            Some('t') => decoded.push(('\t', true)),
            Some('x') => decoded.push((read_hex(&mut chars, 2), true)),
            Some('u') => decoded.push((read_hex(&mut chars, 4), true)),
            Some(other) => decoded.push((other, true)),
            None => decoded.push(('\\', false)),
        }
    }
    let mut i = 0;
    while i < decoded.len() {
        if i + 2 < decoded.len() && decoded[i + 1] == ('-', false) {
            if decoded[i].0 <= ch && ch <= decoded[i + 2].0 {
                return true;
            }
            i += 3;
        } else {
            if decoded[i].0 == ch {
                return true;
            }
            i += 1;
        }
    }
    false
}

fn read_hex(chars: &mut std::str::Chars<'_>, digits: usize) -> char {
    let mut value: u32 = 0;
    for _ in 0..digits {
        let Some(digit) = chars.clone().next().and_then(|c| c.to_digit(16)) else {
            break;
        };
        chars.next();
        value = value * 16 + digit;
    }
    char::from_u32(value).unwrap_or('\u{FFFD}')
}
"##;

/// Diagnostic types and recovery driver, ADVANCED profile only.
pub(super) const ADVANCED: &str = r##"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Rendered as `error[E0001]`.
    pub code: Option<&'static str>,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub labels: Vec<Label>,
    pub help: Option<String>,
}

/// Result of a recovering parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub node: Option<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

const RECOVERY_POINTS: &[char] = &[',', ';', '}', ')', ']', '\n'];
"##;
