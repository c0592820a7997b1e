//! 卡牌Filter的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_or_expression()
//!        ├─ parse_and_expression()
//!        │    ├─ parse_not_expression()
//!        │    │    └─ parse_primary_expression()
//!        │    │         ├─ "(" → 分组表达式 (递归调用parse_or_expression)
//!        │    │         └─ 关键字 → parse_filter_part()
//!        │    │                        ├─ 在注册表中查找关键字
//!        │    │                        ├─ "IN $var"        → 变量
//!        │    │                        ├─ "IN 值列表"      → 列表
//!        │    │                        └─ "IN 值列表 FROM 值列表" → 两侧列表
//!        │    │
//!        │    └─ 遇到AND时，继续解析右侧NOT表达式
//!        │
//!        └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **NOT操作** `NOT expression`
//! 3. **AND操作** `expr1 AND expr2`
//! 4. **OR操作** `expr1 OR expr2`
//!
//! ## 解析示例
//!
//! ```text
//! CardType in Equipment, Imbued or (Discipline in Presence and Sect in Sabbat)
//! NOT Clan in $var0
//! CardCount in 2, 3 FROM "My Deck"
//! Unique and CardText in "burn option"
//! ```

use crate::ast::{BoolOp, FilterAst, FilterPart, FilterValues, ValueSlot, FROM_SENTINEL, VALUES_SENTINEL};
use crate::config::{FilterArg, FilterRegistry, FilterType};
use crate::lexer::unescape;
use crate::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    registry: &'a FilterRegistry,
    filter_type: FilterType,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>], registry: &'a FilterRegistry, filter_type: FilterType) -> Self {
        Self {
            tokens,
            position: 0,
            registry,
            filter_type,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    /// 解析完整的Filter文本，结果包装在 `FilterAst::Filter` 中
    pub fn parse(&mut self) -> Result<FilterAst, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty filter".to_string(), None));
        }

        let expr = self.parse_or_expression()?;

        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("Unexpected token: {:?}", token.kind),
                token.span,
            ));
        }

        Ok(FilterAst::Filter(Box::new(expr)))
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<FilterAst, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            let right = self.parse_and_expression()?;
            left = FilterAst::bin_op(left, BoolOp::Or, right);
        }

        Ok(left)
    }

    /// 解析AND表达式 (中等优先级)
    ///
    /// 语法: `not_expr (AND not_expr)*`
    fn parse_and_expression(&mut self) -> Result<FilterAst, ParseError> {
        let mut left = self.parse_not_expression()?;

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 AND
            let right = self.parse_not_expression()?;
            left = FilterAst::bin_op(left, BoolOp::And, right);
        }

        Ok(left)
    }

    /// 解析NOT表达式 (较高优先级)
    ///
    /// 语法: `NOT* primary_expr`
    fn parse_not_expression(&mut self) -> Result<FilterAst, ParseError> {
        if self.match_token(&TokenKind::Not) {
            self.advance(); // 消费 NOT
            let expr = self.parse_not_expression()?;
            Ok(FilterAst::not(expr))
        } else {
            self.parse_primary_expression()
        }
    }

    /// 解析基础表达式 (最高优先级)
    fn parse_primary_expression(&mut self) -> Result<FilterAst, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::LParen => {
                self.advance(); // 消费 (
                let expr = self.parse_or_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(token) if matches!(token.kind, TokenKind::Identifier(_)) => self.parse_filter_part(),
            Some(token) => Err(ParseError::at_position(
                format!("Expected filter keyword, found {:?}", token.kind),
                token.span,
            )),
            None => Err(ParseError::new("Unexpected end of input".to_string(), None)),
        }
    }

    /// 解析单个Filter关键字及其参数
    ///
    /// 语法: `KEYWORD [IN ($var | values [FROM values])]`
    fn parse_filter_part(&mut self) -> Result<FilterAst, ParseError> {
        let keyword_token = self.expect(TokenKind::Identifier(""))?;
        let TokenKind::Identifier(keyword) = keyword_token.kind else {
            return Err(ParseError::at_position(
                "Expected filter keyword".to_string(),
                keyword_token.span,
            ));
        };

        let def = self
            .registry
            .get(keyword)
            .filter(|def| def.applies_to(self.filter_type))
            .ok_or_else(|| {
                ParseError::at_position(
                    format!("Unknown filter '{}' for {:?}", keyword, self.filter_type),
                    keyword_token.span,
                )
            })?;

        let mut part = FilterPart {
            filter_name: def.keyword.clone(),
            description: def.description.clone(),
            shape: def.value_shape(),
            variable: None,
            values: None,
        };

        if !self.match_token(&TokenKind::In) {
            if !matches!(def.arg, FilterArg::None) {
                return Err(ParseError::at_position(
                    format!("Filter '{}' requires values", def.keyword),
                    keyword_token.span,
                ));
            }
            return Ok(FilterAst::Part(part));
        }

        if matches!(def.arg, FilterArg::None) {
            return Err(ParseError::at_position(
                format!("Filter '{}' takes no values", def.keyword),
                keyword_token.span,
            ));
        }
        self.advance(); // 消费 IN

        if let Some(Token { kind: TokenKind::Variable(name), .. }) = self.peek() {
            self.advance();
            part.variable = Some(name.to_string());
            return Ok(FilterAst::Part(part));
        }

        let values = self.parse_value_list()?;

        if self.match_token(&TokenKind::From) {
            let from_token = self.advance();
            if !matches!(def.arg, FilterArg::ListFrom { .. }) {
                return Err(ParseError::new(
                    format!("Filter '{}' does not accept FROM", def.keyword),
                    from_token.map(|t| t.span),
                ));
            }
            let from = self.parse_value_list()?;
            part.values = Some(FilterValues::From {
                values: ValueSlot::from_literals(values, VALUES_SENTINEL),
                from: ValueSlot::from_literals(from, FROM_SENTINEL),
            });
        } else {
            match def.arg {
                FilterArg::ListFrom { .. } => {
                    return Err(ParseError::at_position(
                        format!("Filter '{}' requires FROM", def.keyword),
                        keyword_token.span,
                    ));
                }
                FilterArg::Entry if values.len() > 1 => {
                    return Err(ParseError::at_position(
                        format!("Filter '{}' takes a single value", def.keyword),
                        keyword_token.span,
                    ));
                }
                _ => {}
            }
            part.values = Some(FilterValues::List(values));
        }

        Ok(FilterAst::Part(part))
    }

    /// 解析逗号分隔的值列表
    fn parse_value_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut values = vec![self.parse_literal()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance(); // 消费逗号
            values.push(self.parse_literal()?);
        }
        Ok(values)
    }

    /// 解析字面值，相邻的不带引号单词以空格连接
    fn parse_literal(&mut self) -> Result<String, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::new("Expected literal value".to_string(), None));
        };
        match token.kind {
            TokenKind::String(raw) => Ok(unescape(raw)),
            TokenKind::Number(n) => Ok(n.to_string()),
            TokenKind::Identifier(word) => {
                let mut words = vec![word];
                while let Some(Token { kind: TokenKind::Identifier(next), .. }) = self.peek() {
                    words.push(*next);
                    self.advance();
                }
                Ok(words.join(" "))
            }
            ref other => Err(ParseError::at_position(
                format!("Expected literal value, found {:?}", other),
                token.span,
            )),
        }
    }
}

/// 对文本进行分词和语法分析
pub fn parse_filter(
    input: &str,
    registry: &FilterRegistry,
    filter_type: FilterType,
) -> Result<FilterAst, ParseError> {
    let tokens: Vec<_> = crate::lexer::Lexer::new(input).collect();
    Parser::new(&tokens, registry, filter_type).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueShape;

    fn parse_string(input: &str) -> Result<FilterAst, ParseError> {
        parse_filter(input, &FilterRegistry::default(), FilterType::PhysicalCard)
    }

    fn inner(ast: &FilterAst) -> &FilterAst {
        match ast {
            FilterAst::Filter(inner) => inner,
            _ => panic!("Expected Filter wrapper"),
        }
    }

    fn as_part(ast: &FilterAst) -> &FilterPart {
        match ast {
            FilterAst::Part(part) => part,
            other => panic!("Expected filter part, found {:?}", other),
        }
    }

    fn list(values: &[&str]) -> Option<FilterValues> {
        Some(FilterValues::List(values.iter().map(|v| v.to_string()).collect()))
    }

    #[test]
    fn test_simple_filter() {
        let result = parse_string("CardType in Equipment, Imbued").unwrap();
        let part = as_part(inner(&result));

        assert_eq!(part.filter_name, "CardType");
        assert_eq!(part.description, "Card Type");
        assert!(matches!(part.shape, ValueShape::List { .. }));
        assert_eq!(part.variable, None);
        assert_eq!(part.values, list(&["Equipment", "Imbued"]));
    }

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        let result = parse_string("clan IN Brujah").unwrap();
        assert_eq!(as_part(inner(&result)).filter_name, "Clan");
    }

    #[test]
    fn test_mixed_or_and_query() {
        let input = "CardType in Equipment, Imbued or (Discipline in Presence and Sect in Sabbat)";
        let result = parse_string(input).unwrap();

        let FilterAst::BinOp { left, op, right } = inner(&result) else {
            panic!("Expected OR at the top");
        };
        assert_eq!(*op, BoolOp::Or);
        assert_eq!(as_part(left).filter_name, "CardType");

        let FilterAst::BinOp { left, op, right } = right.as_ref() else {
            panic!("Expected AND in the group");
        };
        assert_eq!(*op, BoolOp::And);
        assert_eq!(as_part(left).values, list(&["Presence"]));
        assert_eq!(as_part(right).values, list(&["Sabbat"]));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let result = parse_string("Unique or Clan in Brujah and Sect in Anarch").unwrap();
        let FilterAst::BinOp { op, right, .. } = inner(&result) else {
            panic!("Expected BinOp");
        };
        assert_eq!(*op, BoolOp::Or);
        assert!(matches!(right.as_ref(), FilterAst::BinOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn test_chains_are_left_associative() {
        let result = parse_string("Unique and Clan in Brujah and Sect in Anarch").unwrap();
        let FilterAst::BinOp { left, right, .. } = inner(&result) else {
            panic!("Expected BinOp");
        };
        assert!(matches!(left.as_ref(), FilterAst::BinOp { op: BoolOp::And, .. }));
        assert_eq!(as_part(right).filter_name, "Sect");
    }

    #[test]
    fn test_not_and_variable() {
        let result = parse_string("NOT Clan in $var0").unwrap();
        let FilterAst::Not(sub) = inner(&result) else {
            panic!("Expected NOT");
        };
        let part = as_part(sub);
        assert_eq!(part.variable.as_deref(), Some("$var0"));
        assert_eq!(part.values, None);
    }

    #[test]
    fn test_quoted_and_multi_word_literals() {
        let result = parse_string(r#"CardType in "Action Modifier", Political Action"#).unwrap();
        assert_eq!(
            as_part(inner(&result)).values,
            list(&["Action Modifier", "Political Action"])
        );
    }

    #[test]
    fn test_list_from_with_sentinels() {
        let result = parse_string(r#"CardCount in -1 FROM "My Deck""#).unwrap();
        assert_eq!(
            as_part(inner(&result)).values,
            Some(FilterValues::From {
                values: ValueSlot::Any,
                from: ValueSlot::Values(vec!["My Deck".to_string()]),
            })
        );

        let result = parse_string(r#"CardCount in 2, 3 FROM """#).unwrap();
        assert_eq!(
            as_part(inner(&result)).values,
            Some(FilterValues::From {
                values: ValueSlot::Values(vec!["2".to_string(), "3".to_string()]),
                from: ValueSlot::Any,
            })
        );
    }

    #[test]
    fn test_no_argument_filter() {
        let result = parse_string("Unique").unwrap();
        let part = as_part(inner(&result));
        assert_eq!(part.shape, ValueShape::Literal);
        assert_eq!(part.values, None);
        assert!(parse_string("Unique in yes").is_err());
    }

    #[test]
    fn test_argument_errors() {
        assert!(parse_string("Clan").is_err());
        assert!(parse_string("Clan in Brujah FROM x").is_err());
        assert!(parse_string("CardCount in 2").is_err());
        assert!(parse_string(r#"CardText in "a", "b""#).is_err());
    }

    #[test]
    fn test_unknown_filter_reports_span() {
        let err = parse_string("Unique and Bogus in x").unwrap_err();
        assert!(err.message.contains("Bogus"));
        assert_eq!(err.span, Some(Span::new(11, 16)));
    }

    #[test]
    fn test_filter_type_restricts_keywords() {
        let registry = FilterRegistry::default();
        assert!(parse_filter("CardSetInUse", &registry, FilterType::PhysicalCard).is_err());
        assert!(parse_filter("CardSetInUse", &registry, FilterType::PhysicalCardSet).is_ok());
    }

    #[test]
    fn test_structural_errors() {
        assert!(parse_string("").is_err());
        assert!(parse_string("(Unique").is_err());
        assert!(parse_string("Unique Unique").is_err());
        assert!(parse_string("Unique and").is_err());
        assert!(parse_string("Clan in Brujah,").is_err());
    }
}
