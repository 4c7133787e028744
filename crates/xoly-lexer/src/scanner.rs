use crate::token::{Span, Token, TokenKind, COMMENT_CLOSE, COMMENT_OPEN};
use crate::LexerError;

/// Where the scanner currently is in the character stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Accumulating literal characters.
    InText,
    /// Positioned on the `<` of a tag.
    InTag,
    /// Positioned on the `<!---` of a comment.
    InComment,
    /// Positioned on the opening `#` of an interpolation.
    InInterpolation,
}

/// Template source scanner.
///
/// Walks the source once, left to right, and yields tokens lazily through
/// its `Iterator` implementation. Every ambiguous character (a stray `#`, a
/// `<` that opens nothing, a quote inside a tag) is resolved by an explicit
/// state transition instead of backtracking.
///
/// - `Vec<char>` source for index-based navigation
/// - Comment text is skipped without flushing the pending text run
/// - Position tracking on every token
#[derive(Debug, Clone)]
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    state: ScanState,
    pending: String,
    pending_start: Span,
    finished: bool,
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            state: ScanState::InText,
            pending: String::new(),
            pending_start: Span::default(),
            finished: false,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
        Scanner::new(source).collect()
    }

    /// Current state of the scanner.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Produce the next token, or `None` once the input is exhausted.
    fn scan_token(&mut self) -> Result<Option<Token>, LexerError> {
        loop {
            match self.state {
                ScanState::InText => {
                    if let Some(token) = self.scan_text() {
                        return Ok(Some(token));
                    }
                    if self.state == ScanState::InText && self.is_at_end() {
                        return Ok(None);
                    }
                }
                ScanState::InComment => self.skip_comment()?,
                ScanState::InTag => return self.scan_tag().map(Some),
                ScanState::InInterpolation => return Ok(Some(self.scan_interpolation())),
            }
        }
    }

    // --- Text ---

    /// Accumulate literal characters until something that is not text.
    ///
    /// Comments switch state without flushing, so text on either side of a
    /// comment comes out as one run.
    fn scan_text(&mut self) -> Option<Token> {
        while !self.is_at_end() {
            let c = self.peek();
            match c {
                '<' if self.starts_with(COMMENT_OPEN) => {
                    self.state = ScanState::InComment;
                    return None;
                }
                '<' if self.opens_tag() => {
                    self.state = ScanState::InTag;
                    return self.flush_text();
                }
                '#' if self.closing_hash().is_some() => {
                    self.state = ScanState::InInterpolation;
                    return self.flush_text();
                }
                _ => {
                    if c == '#' {
                        tracing::trace!(line = self.line, column = self.column, "unmatched '#' kept as text");
                    }
                    if self.pending.is_empty() {
                        self.pending_start = Span::new(self.pos, self.pos, self.line, self.column);
                    }
                    self.pending.push(c);
                    self.advance();
                }
            }
        }
        self.flush_text()
    }

    fn flush_text(&mut self) -> Option<Token> {
        if self.pending.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.pending);
        let mut span = self.pending_start;
        span.end = self.pos;
        Some(Token::new(TokenKind::Text(text.clone()), span, text))
    }

    /// A `<` opens a tag when followed by a letter, or by `/` and a letter.
    fn opens_tag(&self) -> bool {
        let next = self.peek_at(1);
        next.is_ascii_alphabetic() || (next == '/' && self.peek_at(2).is_ascii_alphabetic())
    }

    /// Offset of the `#` that closes an interpolation opened at `pos`.
    ///
    /// The partner must appear before any `<`, `>` or newline; otherwise the
    /// `#` is plain text.
    fn closing_hash(&self) -> Option<usize> {
        let mut i = self.pos + 1;
        while i < self.chars.len() {
            match self.chars[i] {
                '#' => return Some(i),
                '<' | '>' | '\n' => return None,
                _ => i += 1,
            }
        }
        None
    }

    // --- Comments ---

    /// Skip a (possibly nested) `<!--- ... --->` comment.
    fn skip_comment(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let mut depth = 0usize;

        loop {
            if self.is_at_end() {
                return Err(LexerError {
                    message: "Unterminated comment".into(),
                    line: start_line,
                    column: start_col,
                });
            }
            if self.starts_with(COMMENT_OPEN) {
                depth += 1;
                self.advance_by(COMMENT_OPEN.len());
            } else if self.starts_with(COMMENT_CLOSE) {
                depth -= 1;
                self.advance_by(COMMENT_CLOSE.len());
                if depth == 0 {
                    break;
                }
            } else {
                self.advance();
            }
        }

        self.state = ScanState::InText;
        Ok(())
    }

    // --- Tags ---

    /// Scan `<name attrs>`, `<name attrs/>` or `</name>`.
    fn scan_tag(&mut self) -> Result<Token, LexerError> {
        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let end = self.find_tag_end()?;
        let lexeme: String = self.chars[start_pos..=end].iter().collect();
        let inner: String = self.chars[start_pos + 1..end].iter().collect();
        self.advance_by(end + 1 - start_pos);
        self.state = ScanState::InText;

        let span = Span::new(start_pos, self.pos, start_line, start_col);
        let kind = match inner.strip_prefix('/') {
            Some(rest) => TokenKind::TagClose(tag_name(rest).to_ascii_lowercase()),
            None => {
                let name = tag_name(&inner);
                let rest = inner[name.len()..].trim();
                let (attributes, self_closing) = match rest.strip_suffix('/') {
                    Some(attrs) => (attrs.trim_end().to_string(), true),
                    None => (rest.to_string(), false),
                };
                TokenKind::TagOpen {
                    name: name.to_ascii_lowercase(),
                    attributes,
                    self_closing,
                }
            }
        };
        Ok(Token::new(kind, span, lexeme))
    }

    /// Find the `>` that ends the tag starting at `pos`.
    ///
    /// Quoted sections hide `>`. When a quote never closes, the tag ends at
    /// the first `>` regardless of quoting and the attribute parser reports
    /// the unterminated value.
    fn find_tag_end(&self) -> Result<usize, LexerError> {
        let mut quote: Option<char> = None;
        for i in self.pos + 1..self.chars.len() {
            let c = self.chars[i];
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == '>' => return Ok(i),
                None => {}
            }
        }

        if quote.is_some() {
            if let Some(i) = (self.pos + 1..self.chars.len()).find(|&i| self.chars[i] == '>') {
                return Ok(i);
            }
        }

        Err(self.error("Unterminated tag: expected '>'".into()))
    }

    // --- Interpolation ---

    /// Scan `#expr#`. Only entered once `closing_hash` has found a partner.
    fn scan_interpolation(&mut self) -> Token {
        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;
        let end = self.closing_hash().unwrap_or(self.pos);

        let expr: String = self.chars[start_pos + 1..end].iter().collect();
        let lexeme: String = self.chars[start_pos..=end].iter().collect();
        self.advance_by(end + 1 - start_pos);
        self.state = ScanState::InText;

        let span = Span::new(start_pos, self.pos, start_line, start_col);
        Token::new(TokenKind::Interpolation(expr), span, lexeme)
    }

    // --- Helpers ---

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn starts_with(&self, marker: &str) -> bool {
        marker
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn advance(&mut self) {
        if let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.scan_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Leading tag-name characters of the text after `<` or `</`.
fn tag_name(text: &str) -> String {
    text.chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.into())
    }

    fn open(name: &str, attributes: &str) -> TokenKind {
        TokenKind::TagOpen {
            name: name.into(),
            attributes: attributes.into(),
            self_closing: false,
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(kinds("hello world\nbye"), vec![text("hello world\nbye")]);
    }

    #[test]
    fn test_lone_angle_brackets_are_text() {
        assert_eq!(kinds("a < b > c"), vec![text("a < b > c")]);
    }

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn test_open_and_close_tags() {
        assert_eq!(
            kinds("<cfoutput>x</cfoutput>"),
            vec![
                open("cfoutput", ""),
                text("x"),
                TokenKind::TagClose("cfoutput".into()),
            ]
        );
    }

    #[test]
    fn test_tag_attributes_kept_raw() {
        assert_eq!(
            kinds("<cfparam name=\"x\"  default='y'>"),
            vec![open("cfparam", "name=\"x\"  default='y'")]
        );
    }

    #[test]
    fn test_tag_names_lowercased() {
        assert_eq!(
            kinds("<CFIF x></CfIf>"),
            vec![open("cfif", "x"), TokenKind::TagClose("cfif".into())]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            kinds("<cfset x=\"1\" />"),
            vec![TokenKind::TagOpen {
                name: "cfset".into(),
                attributes: "x=\"1\"".into(),
                self_closing: true,
            }]
        );
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        assert_eq!(
            kinds("<cfif condition=\"a > b\">"),
            vec![open("cfif", "condition=\"a > b\"")]
        );
    }

    #[test]
    fn test_unclosed_quote_falls_back_to_first_gt() {
        let toks = Scanner::tokenize("<cfset x=\"oops>rest").unwrap();
        assert_eq!(toks[0].kind, open("cfset", "x=\"oops"));
        assert_eq!(toks[1].kind, text("rest"));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let err = Scanner::tokenize("text <cfif x").unwrap_err();
        assert!(err.message.contains("Unterminated tag"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn test_lexeme_is_exact_source() {
        let toks = Scanner::tokenize("<div class='a'>").unwrap();
        assert_eq!(toks[0].lexeme, "<div class='a'>");
    }

    // =========================================================================
    // Comments
    // =========================================================================

    #[test]
    fn test_comment_is_stripped() {
        assert_eq!(kinds("a<!--- hidden --->b"), vec![text("ab")]);
    }

    #[test]
    fn test_comment_hides_tags() {
        assert_eq!(
            kinds("<!--- <cfabort> #x# --->done"),
            vec![text("done")]
        );
    }

    #[test]
    fn test_nested_comments() {
        assert_eq!(
            kinds("<!--- outer <!--- inner ---> still out --->z"),
            vec![text("z")]
        );
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let err = Scanner::tokenize("x\n<!--- never closed").unwrap_err();
        assert!(err.message.contains("Unterminated comment"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_html_comment_is_text() {
        assert_eq!(kinds("<!-- keep -->"), vec![text("<!-- keep -->")]);
    }

    // =========================================================================
    // Interpolation
    // =========================================================================

    #[test]
    fn test_interpolation() {
        assert_eq!(
            kinds("hi #name#!"),
            vec![
                text("hi "),
                TokenKind::Interpolation("name".into()),
                text("!"),
            ]
        );
    }

    #[test]
    fn test_double_hash_is_empty_interpolation() {
        assert_eq!(kinds("##"), vec![TokenKind::Interpolation(String::new())]);
    }

    #[test]
    fn test_stray_hash_is_text() {
        assert_eq!(kinds("issue #42 fixed"), vec![text("issue #42 fixed")]);
    }

    #[test]
    fn test_hash_pair_broken_by_tag_is_text() {
        assert_eq!(
            kinds("#a<b>c#"),
            vec![text("#a"), open("b", ""), text("c#")]
        );
    }

    #[test]
    fn test_hash_pair_broken_by_newline_is_text() {
        assert_eq!(kinds("#a\nb#"), vec![text("#a\nb#")]);
    }

    #[test]
    fn test_hashes_inside_tag_stay_in_attributes() {
        assert_eq!(
            kinds("<cfset x=\"#y#\">"),
            vec![open("cfset", "x=\"#y#\"")]
        );
    }

    // =========================================================================
    // Positions and laziness
    // =========================================================================

    #[test]
    fn test_line_tracking() {
        let toks = Scanner::tokenize("one\ntwo\n<cfif x>").unwrap();
        assert_eq!(toks[1].span.line, 3);
        assert_eq!(toks[1].span.column, 1);
    }

    #[test]
    fn test_scanner_stops_after_error() {
        let mut scanner = Scanner::new("ok <!--- open");
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_lazy_consumption() {
        let mut scanner = Scanner::new("a<b>c");
        assert_eq!(scanner.next().unwrap().unwrap().kind, text("a"));
        assert_eq!(scanner.state(), ScanState::InTag);
    }
}
