//! 卡牌Filter文本的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取数字字面量，`start` 处可能是负号
    fn read_number(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        let value_str = &self.input[start..self.position];
        match value_str.parse::<i64>() {
            Ok(value) => self.token(TokenKind::Number(value), start),
            Err(_) => self.token(TokenKind::Illegal, start),
        }
    }

    /// 读取引号包围的字符串字面量，单引号和双引号均可
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize, quote: char) -> Token<'a> {
        let content_start = self.position;
        loop {
            match self.peek() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.bump();
                    self.bump(); // 转义字符原样保留，由 unescape 处理
                }
                Some(_) => {
                    self.bump();
                }
                None => return self.token(TokenKind::Illegal, start), // 未闭合的字符串
            }
        }
        let content_end = self.position;
        self.bump(); // 消费结束引号

        let content = &self.input[content_start..content_end];
        self.token(TokenKind::String(content), start)
    }

    /// 读取变量名，例如 `$var0`
    /// 注意：`$` 已经被调用者消费
    fn read_variable(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        if self.position == start + 1 {
            return self.token(TokenKind::Illegal, start);
        }
        let name = &self.input[start..self.position];
        self.token(TokenKind::Variable(name), start)
    }

    /// 读取标识符或关键字
    /// 标识符可以包含字母、数字、连字符和下划线
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "from" => TokenKind::From,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            ',' => self.token(TokenKind::Comma, start),
            '"' | '\'' => self.read_string(start, c),
            '$' => self.read_variable(start),
            '-' if self.peek().is_some_and(|n| n.is_ascii_digit()) => self.read_number(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}

/// 将字面量转义为可以安全插回Filter文本的形式
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// 还原字符串 token 中的转义字符
pub fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                value.push(next);
            }
        } else {
            value.push(c);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_filter() {
        let input = "CardType in Equipment";
        let mut lexer = Lexer::new(input);

        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier("CardType"));
        assert_eq!(lexer.next().unwrap().kind, TokenKind::In);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier("Equipment"));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let input = "AND or nOt In FROM";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::And, TokenKind::Or, TokenKind::Not, TokenKind::In, TokenKind::From]
        );
    }

    #[test]
    fn test_punctuation_variables_and_numbers() {
        let input = "( ) , $var12 -1 42";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Comma,
                TokenKind::Variable("$var12"),
                TokenKind::Number(-1),
                TokenKind::Number(42),
            ]
        );
    }

    #[test]
    fn test_strings_keep_escapes() {
        let input = r#""Anarch \"Free\" States" 'Sabbat'"#;
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::String(r#"Anarch \"Free\" States"#),
                TokenKind::String("Sabbat"),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_illegal() {
        let kinds: Vec<_> = Lexer::new("\"Presence").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Illegal]);
    }

    #[test]
    fn test_lone_dollar_is_illegal() {
        let kinds: Vec<_> = Lexer::new("$ x").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Illegal, TokenKind::Identifier("x")]);
    }

    #[test]
    fn test_spans() {
        let tokens: Vec<_> = Lexer::new("Sect in $var0").collect();
        assert_eq!(tokens[0].span, Span::new(0, 4));
        assert_eq!(tokens[1].span, Span::new(5, 7));
        assert_eq!(tokens[2].span, Span::new(8, 13));
    }

    #[test]
    fn test_escape_and_unescape() {
        assert_eq!(escape("Imbued"), r#""Imbued""#);
        assert_eq!(escape(r#"say "hi"\"#), r#""say \"hi\"\\""#);
        assert_eq!(unescape(r#"say \"hi\"\\"#), r#"say "hi"\"#);
    }

    #[test]
    fn test_escaped_literal_lexes_back_to_original() {
        let original = r#"The "Rack" \ Elysium"#;
        let escaped = escape(original);
        let tokens: Vec<_> = Lexer::new(&escaped).collect();
        assert_eq!(tokens.len(), 1);
        match tokens[0].kind {
            TokenKind::String(raw) => assert_eq!(unescape(raw), original),
            ref other => panic!("Expected string token, found {:?}", other),
        }
    }
}
