//! Shared tokenizer for the textual DDS and DAS responses

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Word(String),
    Quoted(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Eq,
}

/// Token cursor over a DDS or DAS body
pub(crate) struct TokenStream {
    toks: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            toks: tokenize(text),
            pos: 0,
        }
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.toks.get(self.pos)
    }

    pub(crate) fn next(&mut self) -> Result<Token, String> {
        let tok = self
            .toks
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of input".to_string())?;
        self.pos += 1;
        Ok(tok)
    }

    pub(crate) fn expect(&mut self, want: &Token) -> Result<(), String> {
        let got = self.next()?;
        if got == *want {
            Ok(())
        } else {
            Err(format!("expected {want:?}, found {got:?}"))
        }
    }

    /// Consume the next token if it equals `want`
    pub(crate) fn eat(&mut self, want: &Token) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Next token, which must be a bare word
    pub(crate) fn word(&mut self) -> Result<String, String> {
        match self.next()? {
            Token::Word(w) => Ok(w),
            other => Err(format!("expected word, found {other:?}")),
        }
    }

    /// Next token, which may be a bare word or a quoted string
    pub(crate) fn word_or_quoted(&mut self) -> Result<String, String> {
        match self.next()? {
            Token::Word(w) | Token::Quoted(w) => Ok(w),
            other => Err(format!("expected name, found {other:?}")),
        }
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut toks = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => toks.push(Token::LBrace),
            '}' => toks.push(Token::RBrace),
            '[' => toks.push(Token::LBracket),
            ']' => toks.push(Token::RBracket),
            ';' => toks.push(Token::Semi),
            ',' => toks.push(Token::Comma),
            '=' => toks.push(Token::Eq),
            '"' => {
                let mut s = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(esc) = chars.next() {
                                s.push(esc);
                            }
                        }
                        '"' => break,
                        _ => s.push(c),
                    }
                }
                toks.push(Token::Quoted(s));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut w = String::new();
                w.push(c);
                while let Some(&nc) = chars.peek() {
                    if nc.is_whitespace() || matches!(nc, '{' | '}' | '[' | ']' | ';' | ',' | '=' | '"') {
                        break;
                    }
                    w.push(nc);
                    chars.next();
                }
                toks.push(Token::Word(w));
            }
        }
    }
    toks
}
