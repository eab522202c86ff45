use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Peat,
    Var,
    Str,
    Hold,
    Msg,
    Turn,
    Repeat,
    Exit,
    Func,
    Give,
    Back,
    Check,
    When,
    Loop,
    Import,
    Export,
    Use,
    From,
    Make,
    Call,
    Done,
    T,
    Int,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Peat => "peat",
            Keyword::Var => "var",
            Keyword::Str => "str",
            Keyword::Hold => "hold",
            Keyword::Msg => "msg",
            Keyword::Turn => "turn",
            Keyword::Repeat => "repeat",
            Keyword::Exit => "exit",
            Keyword::Func => "func",
            Keyword::Give => "give",
            Keyword::Back => "back",
            Keyword::Check => "check",
            Keyword::When => "when",
            Keyword::Loop => "loop",
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Use => "use",
            Keyword::From => "from",
            Keyword::Make => "make",
            Keyword::Call => "call",
            Keyword::Done => "done",
            Keyword::T => "t",
            Keyword::Int => "int",
        }
    }

    /// Keywords that begin a new statement. A brace-less loop body ends at
    /// the first of these that is not joined to the body with `&`.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Keyword::Peat
                | Keyword::Var
                | Keyword::Str
                | Keyword::Hold
                | Keyword::Turn
                | Keyword::Repeat
                | Keyword::Exit
                | Keyword::Func
                | Keyword::Call
                | Keyword::Import
                | Keyword::Use
                | Keyword::Int
                | Keyword::Msg
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `! ... !`
    Comment,
    /// `" ... "`
    Tip,
    /// `' ... '`
    Str,
    /// `{name}`
    VarRef,
    /// `( ... )`, outermost pair only.
    Paren,
    Assign,
    Ampersand,
    Dot,
    Keyword(Keyword),
    Identifier,
    Number,
    /// `{` opening a block; the token text is the trimmed raw interior.
    BlockOpen,
    BlockClose,
    /// `{ ... }` after `int cmd 'name'`, kept verbatim as shell text.
    CommandBody,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn eof(line: usize, column: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            line,
            column,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    /// End offset of each open block, innermost last. `None` when the
    /// block never closes.
    block_ends: Vec<Option<usize>>,
}

/// What a `{` means given the tokens before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceContext {
    Value,
    /// Loop or function body: a lone statement keyword opens a block.
    Body,
    /// Alias body after `int cmd 'name'`.
    Command,
}

impl BraceContext {
    fn after(tokens: &[Token]) -> Self {
        let is = |token: &Token, keyword| token.is_keyword(keyword);
        match tokens {
            [.., int, cmd, name]
                if is(int, Keyword::Int)
                    && cmd.kind == TokenKind::Identifier
                    && cmd.text == "cmd"
                    && name.kind == TokenKind::Str =>
            {
                BraceContext::Command
            }
            [.., turn, count] if is(turn, Keyword::Turn) && count.kind == TokenKind::Paren => {
                BraceContext::Body
            }
            [.., func, name] if is(func, Keyword::Func) && name.kind == TokenKind::Identifier => {
                BraceContext::Body
            }
            [.., turn] if is(turn, Keyword::Turn) => BraceContext::Body,
            _ => BraceContext::Value,
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            block_ends: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Literals never run past the end of the innermost open block.
    fn limit(&self) -> usize {
        self.block_ends
            .last()
            .copied()
            .flatten()
            .unwrap_or(self.source.len())
    }

    /// Consumes characters up to (not including) `close` and then the
    /// closing character itself if present. Returns the interior.
    fn delimited(&mut self, close: char) -> String {
        let start = self.pos;
        let limit = self.limit();
        while let Some(ch) = self.peek() {
            if ch == close || self.pos >= limit {
                break;
            }
            self.bump();
        }
        let interior = self.source[start..self.pos].to_string();
        if self.peek() == Some(close) {
            self.bump();
        }
        interior
    }

    fn parenthesized(&mut self) -> String {
        let start = self.pos;
        let limit = self.limit();
        let mut end = None;
        let mut depth = 1usize;
        while self.pos < limit {
            let Some(ch) = self.bump() else { break };
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(self.pos - 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.unwrap_or(self.pos);
        self.source[start..end].trim().to_string()
    }

    fn collect_while<F>(&mut self, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if predicate(ch) {
                self.bump();
            } else {
                break;
            }
        }
        self.source[start..self.pos].to_string()
    }

    /// Called just after a `{` has been consumed. Decides between a
    /// variable reference, a block and a verbatim alias body by looking at
    /// the interior up to the matching `}`.
    fn brace(&mut self, context: BraceContext) -> (TokenKind, String) {
        let source = self.source;
        let rest = &source[self.pos..];

        if context == BraceContext::Command {
            let close = plain_matching_brace(rest);
            let end = self.pos + close.unwrap_or(rest.len());
            let body = source[self.pos..end].trim().to_string();
            while self.pos < end {
                self.bump();
            }
            if close.is_some() {
                self.bump();
            }
            return (TokenKind::CommandBody, body);
        }

        let close = matching_brace(rest).or_else(|| plain_matching_brace(rest));
        let trimmed = match close {
            Some(close) => rest[..close].trim(),
            None => rest.trim(),
        };
        let opens_body = context == BraceContext::Body
            && keyword_for(trimmed).is_some_and(|keyword| keyword.starts_statement());
        if is_name(trimmed) && !opens_body {
            let name = trimmed.to_string();
            self.delimited('}');
            (TokenKind::VarRef, name)
        } else {
            self.block_ends.push(close.map(|close| self.pos + close));
            (TokenKind::BlockOpen, trimmed.to_string())
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let (line, column) = (self.line, self.column);
            let Some(ch) = self.bump() else {
                tokens.push(Token::eof(line, column));
                break;
            };

            let (kind, text) = match ch {
                '!' => (TokenKind::Comment, self.delimited('!').trim().to_string()),
                '"' => (TokenKind::Tip, self.delimited('"')),
                '\'' => (TokenKind::Str, self.delimited('\'')),
                '{' => self.brace(BraceContext::after(&tokens)),
                '}' if !self.block_ends.is_empty() => {
                    self.block_ends.pop();
                    (TokenKind::BlockClose, "}".to_string())
                }
                '(' => (TokenKind::Paren, self.parenthesized()),
                '=' => (TokenKind::Assign, "=".to_string()),
                '&' => (TokenKind::Ampersand, "&".to_string()),
                '.' => (TokenKind::Dot, ".".to_string()),
                'a'..='z' | 'A'..='Z' | '_' => {
                    let rest = self.collect_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    let word = format!("{ch}{rest}");
                    let kind = keyword_for(&word)
                        .map(TokenKind::Keyword)
                        .unwrap_or(TokenKind::Identifier);
                    (kind, word)
                }
                '0'..='9' => {
                    let rest = self.collect_while(|c| c.is_ascii_digit() || c == '.');
                    (TokenKind::Number, format!("{ch}{rest}"))
                }
                _ => continue,
            };
            tokens.push(Token {
                kind,
                text,
                line,
                column,
            });
        }
        tokens
    }
}

/// Lexes `source` into a token stream that always ends with `Eof`.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Byte offset of the `}` closing a brace whose `{` precedes `rest`.
/// Quoted strings, tips, comments and parenthesized runs are skipped the
/// same way the lexer skips them, so a brace inside a literal never counts.
/// `None` when a literal or the brace itself never closes.
fn matching_brace(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = rest.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\'' | '"' | '!' => {
                chars.find(|&(_, c)| c == ch)?;
            }
            '(' => {
                let mut parens = 1usize;
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    match c {
                        '(' => parens += 1,
                        ')' => {
                            parens -= 1;
                            if parens == 0 {
                                closed = true;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return None;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Brace matching that ignores literals, for bodies holding a stray `!`,
/// `'` or `"`.
fn plain_matching_brace(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

pub fn keyword_for(ident: &str) -> Option<Keyword> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "peat" => Kw::Peat,
        "var" => Kw::Var,
        "str" => Kw::Str,
        "hold" => Kw::Hold,
        "msg" => Kw::Msg,
        "turn" => Kw::Turn,
        "repeat" => Kw::Repeat,
        "exit" => Kw::Exit,
        "func" => Kw::Func,
        "give" => Kw::Give,
        "back" => Kw::Back,
        "check" => Kw::Check,
        "when" => Kw::When,
        "loop" => Kw::Loop,
        "import" => Kw::Import,
        "export" => Kw::Export,
        "use" => Kw::Use,
        "from" => Kw::From,
        "make" => Kw::Make,
        "call" => Kw::Call,
        "done" => Kw::Done,
        "t" => Kw::T,
        "int" => Kw::Int,
        _ => return None,
    };
    Some(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_yields_only_eof() {
        let tokens = tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
    }

    #[test]
    fn peat_string_statement() {
        let tokens = tokenize("peat 'hello'");
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Peat));
        assert_eq!(tokens[1].kind, TokenKind::Str);
        assert_eq!(tokens[1].text, "hello");
        assert_eq!(tokens[1].column, 6);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn comment_interior_is_trimmed() {
        let tokens = tokenize("!  a note  !");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, "a note");
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        let tokens = tokenize("! never closed\npeat 'x'");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, "never closed\npeat 'x'");
    }

    #[test]
    fn variable_reference_is_trimmed() {
        let tokens = tokenize("var { name } = 'x'");
        assert_eq!(tokens[1].kind, TokenKind::VarRef);
        assert_eq!(tokens[1].text, "name");
        assert_eq!(tokens[2].kind, TokenKind::Assign);
    }

    #[test]
    fn nested_parentheses_form_one_token() {
        let tokens = tokenize("hold (x) = ((1 + 2) * 3)");
        assert_eq!(tokens[1].kind, TokenKind::Paren);
        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[3].kind, TokenKind::Paren);
        assert_eq!(tokens[3].text, "(1 + 2) * 3");
    }

    #[test]
    fn block_braces_become_delimiters() {
        assert_eq!(
            kinds("turn (3) { peat 'hi' }"),
            vec![
                TokenKind::Keyword(Keyword::Turn),
                TokenKind::Paren,
                TokenKind::BlockOpen,
                TokenKind::Keyword(Keyword::Peat),
                TokenKind::Str,
                TokenKind::BlockClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_open_carries_raw_interior() {
        let tokens = tokenize("turn (2) { peat 'a' }");
        assert_eq!(tokens[2].kind, TokenKind::BlockOpen);
        assert_eq!(tokens[2].text, "peat 'a'");
    }

    #[test]
    fn alias_body_is_verbatim() {
        let tokens = tokenize("int cmd 'build' { cargo build --release }\npeat 'x'");
        assert_eq!(tokens[3].kind, TokenKind::CommandBody);
        assert_eq!(tokens[3].text, "cargo build --release");
        assert_eq!(tokens[4].kind, TokenKind::Keyword(Keyword::Peat));
    }

    #[test]
    fn alias_body_may_hold_unbalanced_quotes() {
        for (source, body) in [
            ("int cmd 'greet' { echo hello! }\nexit", "echo hello!"),
            ("int cmd 'own' { echo it's }\nexit", "echo it's"),
            ("int cmd 'q' { echo \"hi }\nexit", "echo \"hi"),
            ("int cmd 'env' { echo ${HOME} }\nexit", "echo ${HOME}"),
        ] {
            let tokens = tokenize(source);
            assert_eq!(tokens[3].kind, TokenKind::CommandBody, "{source}");
            assert_eq!(tokens[3].text, body);
            assert_eq!(tokens[4].kind, TokenKind::Keyword(Keyword::Exit));
        }
    }

    #[test]
    fn stray_literal_in_block_stops_at_closing_brace() {
        assert_eq!(
            kinds("turn (2) { peat hello! }\nexit"),
            vec![
                TokenKind::Keyword(Keyword::Turn),
                TokenKind::Paren,
                TokenKind::BlockOpen,
                TokenKind::Keyword(Keyword::Peat),
                TokenKind::Identifier,
                TokenKind::Comment,
                TokenKind::BlockClose,
                TokenKind::Keyword(Keyword::Exit),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lone_keyword_in_body_position_opens_block() {
        for source in ["turn (2) { msg }", "turn { exit }", "func f { peat }"] {
            let tokens = tokenize(source);
            let open = tokens.iter().position(|t| t.kind == TokenKind::BlockOpen);
            assert!(open.is_some(), "{source}");
            let open = open.unwrap();
            assert!(tokens[open + 1].keyword().is_some());
            assert_eq!(tokens[open + 2].kind, TokenKind::BlockClose);
        }
    }

    #[test]
    fn lone_keyword_elsewhere_stays_a_reference() {
        let tokens = tokenize("peat {msg}");
        assert_eq!(tokens[1].kind, TokenKind::VarRef);
        assert_eq!(tokens[1].text, "msg");
        let tokens = tokenize("turn (2) {count}");
        assert_eq!(tokens[2].kind, TokenKind::VarRef);
    }

    #[test]
    fn braces_inside_literals_do_not_close_blocks() {
        let tokens = tokenize("turn (2) { peat '}' }");
        let closes = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::BlockClose)
            .count();
        assert_eq!(closes, 1);
        assert_eq!(tokens[4].text, "}");
        assert_eq!(tokens[4].kind, TokenKind::Str);
    }

    #[test]
    fn stray_closing_brace_is_skipped() {
        assert_eq!(kinds("}"), vec![TokenKind::Eof]);
    }

    #[test]
    fn keywords_identifiers_and_numbers() {
        let tokens = tokenize("repeat msg & t.ms = (3) foo 1.5.2");
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Repeat));
        assert_eq!(tokens[1].kind, TokenKind::Keyword(Keyword::Msg));
        assert_eq!(tokens[2].kind, TokenKind::Ampersand);
        assert_eq!(tokens[3].kind, TokenKind::Keyword(Keyword::T));
        assert_eq!(tokens[4].kind, TokenKind::Dot);
        assert_eq!(tokens[5].kind, TokenKind::Identifier);
        assert_eq!(tokens[5].text, "ms");
        assert_eq!(tokens[8].kind, TokenKind::Identifier);
        assert_eq!(tokens[9].kind, TokenKind::Number);
        assert_eq!(tokens[9].text, "1.5.2");
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = tokenize("peat 'a'\n  exit (0)");
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 8));
    }

    #[test]
    fn relexing_is_deterministic() {
        let source = "var {a} = 'x'\nturn (2) { peat {a} }\n\"tip\"\nexit";
        assert_eq!(tokenize(source), tokenize(source));
    }

    #[test]
    fn unknown_characters_are_skipped() {
        assert_eq!(kinds("# $ % peat"), vec![TokenKind::Keyword(Keyword::Peat), TokenKind::Eof]);
    }
}
