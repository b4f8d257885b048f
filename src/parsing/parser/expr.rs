//! Expression parsing with precedence climbing

use super::super::ast::{
    Direction, Expression, FrameBound, FrameExclude, FrameSpec, FrameUnits, FunctionCall, Literal,
    NullOrder, Operator, OverClause, Placeholder, WindowSpec,
};
use super::super::lexer::{Keyword, Token};
use super::{IdentifierQuoting, Parser};
use crate::error::{Error, Result};

/// Operator precedence.
type Precedence = u8;

/// Prefix operators.
enum PrefixOperator {
    Minus,
    Not,
    Plus,
}

impl PrefixOperator {
    fn precedence(&self) -> Precedence {
        match self {
            Self::Not => 3,
            Self::Minus | Self::Plus => 10,
        }
    }

    fn into_expression(self, rhs: Expression) -> Expression {
        let rhs = Box::new(rhs);
        match self {
            Self::Plus => Operator::Identity(rhs).into(),
            Self::Minus => Operator::Negate(rhs).into(),
            Self::Not => Operator::Not(rhs).into(),
        }
    }
}

/// Infix operators.
enum InfixOperator {
    Add,
    And,
    Divide,
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Match {
        case_insensitive: bool,
        negated: bool,
        swapped: bool,
    },
    Multiply,
    NotEqual,
    Or,
    Remainder,
    Subtract,
}

impl InfixOperator {
    /// Mostly follows Postgres; regex matches share the precedence of `=`.
    fn precedence(&self) -> Precedence {
        match self {
            Self::Or => 1,
            Self::And => 2,
            // NOT is 3
            Self::Equal | Self::NotEqual | Self::Match { .. } => 4,
            Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => 5,
            Self::Add | Self::Subtract => 6,
            Self::Multiply | Self::Divide | Self::Remainder => 7,
        }
    }

    fn into_expression(self, lhs: Expression, rhs: Expression) -> Expression {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Add => Operator::Add(lhs, rhs).into(),
            Self::And => Operator::And(lhs, rhs).into(),
            Self::Divide => Operator::Divide(lhs, rhs).into(),
            Self::Equal => Operator::Equal(lhs, rhs).into(),
            Self::GreaterThan => Operator::GreaterThan(lhs, rhs).into(),
            Self::GreaterThanOrEqual => Operator::GreaterThanOrEqual(lhs, rhs).into(),
            Self::LessThan => Operator::LessThan(lhs, rhs).into(),
            Self::LessThanOrEqual => Operator::LessThanOrEqual(lhs, rhs).into(),
            Self::Match {
                case_insensitive,
                negated,
                swapped,
            } => Operator::Match {
                expr: lhs,
                pattern: rhs,
                case_insensitive,
                negated,
                swapped,
            }
            .into(),
            Self::Multiply => Operator::Multiply(lhs, rhs).into(),
            Self::NotEqual => Operator::NotEqual(lhs, rhs).into(),
            Self::Or => Operator::Or(lhs, rhs).into(),
            Self::Remainder => Operator::Remainder(lhs, rhs).into(),
            Self::Subtract => Operator::Subtract(lhs, rhs).into(),
        }
    }
}

impl Parser<'_> {
    /// Parses an expression using the precedence climbing algorithm.
    pub(super) fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_expression_at(0)
    }

    /// Parses an expression at the given minimum precedence.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<Expression> {
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let rhs = self.parse_expression_at(prefix.precedence() + 1)?;
            prefix.into_expression(rhs)
        } else {
            self.parse_expression_atom()?
        };

        loop {
            // Tight postfix operators bind before any infix operator:
            // `::` casts, attribute access, subscripts.
            lhs = self.apply_tight_postfix(lhs)?;

            if let Some(infix) = self.parse_infix_operator_at(min_precedence) {
                let rhs = self.parse_expression_at(infix.precedence() + 1)?;
                lhs = infix.into_expression(lhs, rhs);
                continue;
            }

            // Loose postfix forms at comparison precedence: IS [NOT] NULL,
            // [NOT] IN, [NOT] BETWEEN. Consider e.g. `1 + NULL IS NULL`.
            // A NOT in this position can only start NOT IN / NOT BETWEEN;
            // boolean NOT is a prefix operator and never follows a complete
            // expression.
            if min_precedence <= 4
                && matches!(
                    self.peek()?,
                    Some(Token::Keyword(
                        Keyword::Is | Keyword::In | Keyword::Between | Keyword::Not
                    ))
                )
            {
                lhs = self.parse_loose_postfix(lhs)?;
                continue;
            }
            break;
        }
        Ok(lhs)
    }

    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<PrefixOperator> {
        self.next_if_map(|token| {
            let op = match token {
                Token::Minus => PrefixOperator::Minus,
                Token::Plus => PrefixOperator::Plus,
                Token::Keyword(Keyword::Not) => PrefixOperator::Not,
                _ => return None,
            };
            (op.precedence() >= min_precedence).then_some(op)
        })
    }

    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<InfixOperator> {
        self.next_if_map(|token| {
            let op = match token {
                Token::Plus => InfixOperator::Add,
                Token::Minus => InfixOperator::Subtract,
                Token::Asterisk => InfixOperator::Multiply,
                Token::Slash => InfixOperator::Divide,
                Token::Percent => InfixOperator::Remainder,
                Token::Equal => InfixOperator::Equal,
                Token::NotEqual => InfixOperator::NotEqual,
                Token::GreaterThan => InfixOperator::GreaterThan,
                Token::GreaterThanOrEqual => InfixOperator::GreaterThanOrEqual,
                Token::LessThan => InfixOperator::LessThan,
                Token::LessThanOrEqual => InfixOperator::LessThanOrEqual,
                Token::Keyword(Keyword::And) => InfixOperator::And,
                Token::Keyword(Keyword::Or) => InfixOperator::Or,
                Token::Tilde => InfixOperator::Match {
                    case_insensitive: false,
                    negated: false,
                    swapped: false,
                },
                Token::TildeAsterisk => InfixOperator::Match {
                    case_insensitive: true,
                    negated: false,
                    swapped: false,
                },
                Token::NotTilde => InfixOperator::Match {
                    case_insensitive: false,
                    negated: true,
                    swapped: false,
                },
                Token::NotTildeAsterisk => InfixOperator::Match {
                    case_insensitive: true,
                    negated: true,
                    swapped: false,
                },
                Token::QuestionTilde => InfixOperator::Match {
                    case_insensitive: false,
                    negated: false,
                    swapped: true,
                },
                Token::QuestionTildeAsterisk => InfixOperator::Match {
                    case_insensitive: true,
                    negated: false,
                    swapped: true,
                },
                _ => return None,
            };
            (op.precedence() >= min_precedence).then_some(op)
        })
    }

    /// Applies `::type`, `.field`/`.f(args)`/`.*`, and `[index]` postfix
    /// forms, which bind tighter than any infix operator.
    fn apply_tight_postfix(&mut self, mut expr: Expression) -> Result<Expression> {
        loop {
            if self.skip(Token::DoubleColon) {
                let type_name = self.next_ident()?;
                expr = Expression::Cast {
                    expr: Box::new(expr),
                    type_name,
                };
            } else if self.skip(Token::Period) {
                if self.skip(Token::Asterisk) {
                    expr = Expression::QualifiedAll(Box::new(expr));
                    continue;
                }
                let field = self.next_ident()?;
                if self.peek()? == Some(&Token::OpenParen) {
                    let args = self.parse_argument_list()?;
                    expr = Expression::Method {
                        base: Box::new(expr),
                        name: field,
                        args,
                    };
                } else {
                    expr = Expression::FieldAccess {
                        base: Box::new(expr),
                        field,
                    };
                }
            } else if self.quoting != IdentifierQuoting::Bracket
                && self.peek()? == Some(&Token::OpenBracket)
                && matches!(
                    expr,
                    Expression::Column(..)
                        | Expression::FieldAccess { .. }
                        | Expression::Subscript { .. }
                        | Expression::Function(_)
                        | Expression::ArrayLiteral(_)
                )
            {
                self.next()?;
                let index = self.parse_expression()?;
                self.expect(Token::CloseBracket)?;
                expr = Expression::Subscript {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses IS [NOT] NULL, [NOT] IN and [NOT] BETWEEN postfix forms.
    fn parse_loose_postfix(&mut self, expr: Expression) -> Result<Expression> {
        if self.next_is_keyword(Keyword::Is) {
            let negated = self.next_is_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Operator::IsNull {
                expr: Box::new(expr),
                negated,
            }
            .into());
        }

        let negated = self.next_is_keyword(Keyword::Not);

        if self.next_is_keyword(Keyword::In) {
            self.expect(Token::OpenParen)?;
            let list = if self.peek_is_keyword(Keyword::Select) || self.peek_is_keyword(Keyword::With)
            {
                let subquery = self.parse_select()?;
                Expression::Subquery(Box::new(subquery))
            } else {
                let mut items = Vec::new();
                loop {
                    items.push(self.parse_expression()?);
                    if !self.skip(Token::Comma) {
                        break;
                    }
                }
                Expression::TupleLiteral(items)
            };
            self.expect(Token::CloseParen)?;
            return Ok(Operator::In {
                expr: Box::new(expr),
                list: Box::new(list),
                negated,
            }
            .into());
        }

        if self.next_is_keyword(Keyword::Between) {
            // The low bound is parsed above AND precedence so the range's
            // AND is not consumed as a boolean operator.
            let low = self.parse_expression_at(5)?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_expression_at(5)?;
            return Ok(Operator::Between {
                expr: Box::new(expr),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }
            .into());
        }

        Err(Error::ParseError("expected IN or BETWEEN after NOT".into()))
    }

    /// Parses an expression atom.
    fn parse_expression_atom(&mut self) -> Result<Expression> {
        let Some(token) = self.peek()?.cloned() else {
            return Err(Error::ParseError("unexpected end of input".into()));
        };
        match token {
            Token::Number(_) | Token::String(_) => self.parse_literal(),
            Token::Keyword(Keyword::Null | Keyword::True | Keyword::False) => self.parse_literal(),

            Token::Asterisk => {
                self.next()?;
                Ok(Expression::All)
            }

            Token::Question => {
                self.next()?;
                let position = self.placeholders.positional;
                self.placeholders.positional += 1;
                Ok(Expression::Parameter(Placeholder::Positional(position)))
            }
            Token::NamedParam(name) => {
                self.next()?;
                self.placeholders.named = true;
                Ok(Expression::Parameter(Placeholder::Named(name)))
            }

            Token::Keyword(Keyword::Case) => self.parse_case(),

            Token::OpenParen => {
                self.next()?;
                if self.peek_is_keyword(Keyword::Select) || self.peek_is_keyword(Keyword::With) {
                    let subquery = self.parse_select()?;
                    self.expect(Token::CloseParen)?;
                    return Ok(Expression::Subquery(Box::new(subquery)));
                }
                let mut items = vec![self.parse_expression()?];
                while self.skip(Token::Comma) {
                    items.push(self.parse_expression()?);
                }
                self.expect(Token::CloseParen)?;
                if items.len() == 1 {
                    Ok(items.into_iter().next().unwrap())
                } else {
                    Ok(Expression::TupleLiteral(items))
                }
            }

            Token::OpenBracket => {
                self.next()?;
                // In bracket quoting mode, [x] is an identifier.
                if self.quoting == IdentifierQuoting::Bracket {
                    let ident = self.next_ident()?;
                    self.expect(Token::CloseBracket)?;
                    return self.parse_ident_expression(ident);
                }
                let mut items = Vec::new();
                if self.peek()? != Some(&Token::CloseBracket) {
                    loop {
                        items.push(self.parse_expression()?);
                        if !self.skip(Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::CloseBracket)?;
                Ok(Expression::ArrayLiteral(items))
            }

            Token::Ident(_) | Token::QuotedIdent(..) => {
                let ident = self.next_ident_or_string()?;
                match ident {
                    Ok(ident) => self.parse_ident_expression(ident),
                    Err(literal) => Ok(Expression::Literal(literal)),
                }
            }

            token => Err(Error::ParseError(format!(
                "expected expression, found {}",
                token
            ))),
        }
    }

    /// Consumes an identifier-ish token. Quoted identifiers whose style is
    /// disabled by the quoting mode come back as string literals.
    fn next_ident_or_string(&mut self) -> Result<std::result::Result<String, Literal>> {
        match self.next()? {
            Token::Ident(ident) => Ok(Ok(ident)),
            Token::QuotedIdent(s, style) => {
                if self.quoting.allows(style) {
                    Ok(Ok(s))
                } else {
                    Ok(Err(Literal::String(s)))
                }
            }
            token => Err(Error::ParseError(format!(
                "expected identifier, found {}",
                token
            ))),
        }
    }

    /// Parses the continuation of an identifier atom: a function call, a
    /// qualified column (`t.x`, `t.*`), or a bare column reference.
    fn parse_ident_expression(&mut self, ident: String) -> Result<Expression> {
        if self.peek()? == Some(&Token::OpenParen) {
            return self.parse_function(ident);
        }
        // Qualified reference: the distinction between table-qualified
        // columns and structure attribute access is made by the planner.
        if self.skip(Token::Period) {
            if self.skip(Token::Asterisk) {
                return Ok(Expression::QualifiedAll(Box::new(Expression::Column(
                    None, ident,
                ))));
            }
            let field = self.next_ident()?;
            if self.peek()? == Some(&Token::OpenParen) {
                let args = self.parse_argument_list()?;
                return Ok(Expression::Method {
                    base: Box::new(Expression::Column(None, ident)),
                    name: field,
                    args,
                });
            }
            return Ok(Expression::Column(Some(ident), field));
        }
        Ok(Expression::Column(None, ident))
    }

    fn parse_literal(&mut self) -> Result<Expression> {
        let literal = match self.next()? {
            Token::Number(n) if n.contains(['.', 'e']) => Literal::Float(
                n.parse()
                    .map_err(|_| Error::ParseError(format!("invalid number {}", n)))?,
            ),
            Token::Number(n) => Literal::Integer(
                n.parse()
                    .map_err(|_| Error::ParseError(format!("invalid number {}", n)))?,
            ),
            Token::String(s) => Literal::String(s),
            Token::Keyword(Keyword::Null) => Literal::Null,
            Token::Keyword(Keyword::True) => Literal::Boolean(true),
            Token::Keyword(Keyword::False) => Literal::Boolean(false),
            token => {
                return Err(Error::ParseError(format!(
                    "expected literal, found {}",
                    token
                )));
            }
        };
        Ok(literal.into())
    }

    fn parse_case(&mut self) -> Result<Expression> {
        self.expect_keyword(Keyword::Case)?;
        let operand = if !self.peek_is_keyword(Keyword::When) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        let mut when_clauses = Vec::new();
        while self.next_is_keyword(Keyword::When) {
            let condition = self.parse_expression()?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expression()?;
            when_clauses.push((condition, result));
        }
        if when_clauses.is_empty() {
            return Err(Error::ParseError("CASE requires at least one WHEN".into()));
        }
        let else_clause = if self.next_is_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;
        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a parenthesized argument list.
    fn parse_argument_list(&mut self) -> Result<Vec<Expression>> {
        self.expect(Token::OpenParen)?;
        let mut args = Vec::new();
        if self.peek()? != Some(&Token::CloseParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(args)
    }

    /// Parses a function call with its aggregate/window suffixes.
    fn parse_function(&mut self, name: String) -> Result<Expression> {
        self.expect(Token::OpenParen)?;
        let distinct = self.next_is_keyword(Keyword::Distinct);
        let mut args = Vec::new();
        if self.peek()? != Some(&Token::CloseParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::CloseParen)?;

        let mut call = FunctionCall::new(name, args);
        call.distinct = distinct;

        if self.next_is_keyword(Keyword::Filter) {
            self.expect(Token::OpenParen)?;
            self.expect_keyword(Keyword::Where)?;
            call.filter = Some(Box::new(self.parse_expression()?));
            self.expect(Token::CloseParen)?;
        }

        if self.next_is_keyword(Keyword::Over) {
            call.over = Some(self.parse_over_clause()?);
        }

        Ok(Expression::Function(call))
    }

    /// Parses `OVER name` or `OVER ( [name] [PARTITION BY ...]
    /// [ORDER BY ...] [frame] )`.
    fn parse_over_clause(&mut self) -> Result<OverClause> {
        if self.peek()? != Some(&Token::OpenParen) {
            let name = self.next_ident()?;
            return Ok(OverClause {
                name: Some(name),
                spec: WindowSpec::default(),
            });
        }
        self.expect(Token::OpenParen)?;
        let name = self.next_if_map(|token| match token {
            Token::Ident(ident) => Some(ident.clone()),
            _ => None,
        });
        let spec = self.parse_window_spec()?;
        self.expect(Token::CloseParen)?;
        Ok(OverClause { name, spec })
    }

    /// Parses the body of a window specification (without parentheses).
    pub(super) fn parse_window_spec(&mut self) -> Result<WindowSpec> {
        let mut spec = WindowSpec::default();
        if self.next_is_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::By)?;
            let mut keys = Vec::new();
            loop {
                keys.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
            spec.partition_by = Some(keys);
        }
        if self.next_is_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            spec.order_by = Some(self.parse_order_keys()?);
        }
        if let Some(units) = self.next_if_map(|token| match token {
            Token::Keyword(Keyword::Rows) => Some(FrameUnits::Rows),
            Token::Keyword(Keyword::Groups) => Some(FrameUnits::Groups),
            Token::Keyword(Keyword::Range) => Some(FrameUnits::Range),
            _ => None,
        }) {
            spec.frame = Some(self.parse_frame(units)?);
        }
        Ok(spec)
    }

    /// Parses ORDER BY keys with directions and NULLS placement.
    pub(super) fn parse_order_keys(
        &mut self,
    ) -> Result<Vec<(Expression, Direction, Option<NullOrder>)>> {
        let mut keys = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let direction = self
                .next_if_map(|token| match token {
                    Token::Keyword(Keyword::Asc) => Some(Direction::Ascending),
                    Token::Keyword(Keyword::Desc) => Some(Direction::Descending),
                    _ => None,
                })
                .unwrap_or_default();
            let nulls = if self.next_is_keyword(Keyword::Nulls) {
                if self.next_is_keyword(Keyword::First) {
                    Some(NullOrder::First)
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    Some(NullOrder::Last)
                }
            } else {
                None
            };
            keys.push((expr, direction, nulls));
            if !self.skip(Token::Comma) {
                break;
            }
        }
        Ok(keys)
    }

    fn parse_frame(&mut self, units: FrameUnits) -> Result<FrameSpec> {
        let (start, end) = if self.next_is_keyword(Keyword::Between) {
            let start = self.parse_frame_bound()?;
            self.expect_keyword(Keyword::And)?;
            let end = self.parse_frame_bound()?;
            (start, end)
        } else {
            (self.parse_frame_bound()?, FrameBound::CurrentRow)
        };

        let exclude = if self.next_is_keyword(Keyword::Exclude) {
            if self.next_is_keyword(Keyword::No) {
                self.expect_keyword(Keyword::Others)?;
                FrameExclude::NoOthers
            } else if self.next_is_keyword(Keyword::Current) {
                self.expect_keyword(Keyword::Row)?;
                FrameExclude::CurrentRow
            } else if self.next_is_keyword(Keyword::Group) {
                FrameExclude::Group
            } else {
                self.expect_keyword(Keyword::Ties)?;
                FrameExclude::Ties
            }
        } else {
            FrameExclude::NoOthers
        };

        Ok(FrameSpec {
            units,
            start,
            end,
            exclude,
        })
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound> {
        if self.next_is_keyword(Keyword::Unbounded) {
            if self.next_is_keyword(Keyword::Preceding) {
                return Ok(FrameBound::UnboundedPreceding);
            }
            self.expect_keyword(Keyword::Following)?;
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.next_is_keyword(Keyword::Current) {
            self.expect_keyword(Keyword::Row)?;
            return Ok(FrameBound::CurrentRow);
        }
        let offset = self.parse_expression()?;
        if self.next_is_keyword(Keyword::Preceding) {
            return Ok(FrameBound::Preceding(Box::new(offset)));
        }
        self.expect_keyword(Keyword::Following)?;
        Ok(FrameBound::Following(Box::new(offset)))
    }
}
