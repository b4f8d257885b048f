//! SELECT / INSERT / UPDATE statement parsing

use super::super::ast::{
    Expression, FromClause, JoinType, SelectStatement, SetOperator, Statement,
};
use super::super::lexer::{Keyword, Token};
use super::Parser;
use crate::error::{Error, Result};

impl Parser<'_> {
    pub(super) fn parse_select_statement(&mut self) -> Result<Statement> {
        Ok(Statement::Select(Box::new(self.parse_select()?)))
    }

    /// Parses a full SELECT: WITH prefix, core, chained set operations, and
    /// the trailing ORDER BY / PIVOT BY / LIMIT clauses.
    pub(super) fn parse_select(&mut self) -> Result<SelectStatement> {
        let mut with = Vec::new();
        if self.next_is_keyword(Keyword::With) {
            loop {
                let name = self.next_ident()?;
                self.expect_keyword(Keyword::As)?;
                self.expect(Token::OpenParen)?;
                let query = self.parse_select()?;
                self.expect(Token::CloseParen)?;
                with.push((name, query));
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }

        let mut select = self.parse_select_core()?;
        select.with = with;

        while let Some(op) = self.parse_set_operator() {
            let rhs = self.parse_select_core()?;
            select.compound.push((op, rhs));
        }

        if self.next_is_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            select.order_by = self.parse_order_keys()?;
        }

        if self.next_is_keyword(Keyword::Pivot) {
            self.expect_keyword(Keyword::By)?;
            loop {
                select.pivot_by.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }

        if self.next_is_keyword(Keyword::Limit) {
            select.limit = Some(self.parse_expression()?);
        }

        Ok(select)
    }

    fn parse_set_operator(&mut self) -> Option<SetOperator> {
        if self.next_is_keyword(Keyword::Union) {
            return Some(if self.next_is_keyword(Keyword::All) {
                SetOperator::UnionAll
            } else {
                SetOperator::Union
            });
        }
        if self.next_is_keyword(Keyword::Intersect) {
            return Some(if self.next_is_keyword(Keyword::All) {
                SetOperator::IntersectAll
            } else {
                SetOperator::Intersect
            });
        }
        if self.next_is_keyword(Keyword::Except) {
            return Some(if self.next_is_keyword(Keyword::All) {
                SetOperator::ExceptAll
            } else {
                SetOperator::Except
            });
        }
        None
    }

    /// Parses the core of a SELECT: target list through WINDOW clause.
    fn parse_select_core(&mut self) -> Result<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;

        let mut select = SelectStatement {
            distinct: self.next_is_keyword(Keyword::Distinct),
            ..SelectStatement::default()
        };
        if !select.distinct {
            self.next_is_keyword(Keyword::All);
        }

        select.select = self.parse_target_list()?;

        if self.next_is_keyword(Keyword::From) {
            loop {
                select.from.push(self.parse_from_item()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }

        if self.next_is_keyword(Keyword::Where) {
            select.r#where = Some(self.parse_expression()?);
        }

        if self.next_is_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            loop {
                select.group_by.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }

        if self.next_is_keyword(Keyword::Having) {
            select.having = Some(self.parse_expression()?);
        }

        if self.next_is_keyword(Keyword::Window) {
            loop {
                let name = self.next_ident()?;
                self.expect_keyword(Keyword::As)?;
                self.expect(Token::OpenParen)?;
                let spec = self.parse_window_spec()?;
                self.expect(Token::CloseParen)?;
                select.windows.push((name, spec));
                if !self.skip(Token::Comma) {
                    break;
                }
            }
        }

        Ok(select)
    }

    /// Parses one FROM item including any chained joins.
    fn parse_from_item(&mut self) -> Result<FromClause> {
        let mut item = self.parse_from_atom()?;
        while let Some(join_type) = self.parse_join_type()? {
            let right = self.parse_from_atom()?;
            let mut on = None;
            let mut using = Vec::new();
            if self.next_is_keyword(Keyword::On) {
                on = Some(self.parse_expression()?);
            } else if self.next_is_keyword(Keyword::Using) {
                using = self.parse_ident_list()?;
            }
            item = FromClause::Join {
                left: Box::new(item),
                right: Box::new(right),
                join_type,
                on,
                using,
            };
        }
        Ok(item)
    }

    fn parse_join_type(&mut self) -> Result<Option<JoinType>> {
        let join_type = if self.next_is_keyword(Keyword::Join) {
            JoinType::Inner
        } else if self.next_is_keyword(Keyword::Inner) {
            self.expect_keyword(Keyword::Join)?;
            JoinType::Inner
        } else if self.next_is_keyword(Keyword::Left) {
            self.next_is_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join)?;
            JoinType::Left
        } else if self.next_is_keyword(Keyword::Right) {
            self.next_is_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join)?;
            JoinType::Right
        } else if self.next_is_keyword(Keyword::Full) {
            self.next_is_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join)?;
            JoinType::Full
        } else if self.next_is_keyword(Keyword::Cross) {
            self.expect_keyword(Keyword::Join)?;
            JoinType::Cross
        } else if self.next_is_keyword(Keyword::Anti) {
            self.expect_keyword(Keyword::Join)?;
            JoinType::Anti
        } else {
            return Ok(None);
        };
        Ok(Some(join_type))
    }

    /// Parses a single relation: a table reference or a parenthesized
    /// subquery, with an optional alias.
    fn parse_from_atom(&mut self) -> Result<FromClause> {
        if self.skip(Token::OpenParen) {
            let query = self.parse_select()?;
            self.expect(Token::CloseParen)?;
            let alias = self.parse_alias()?;
            return Ok(FromClause::Subquery {
                query: Box::new(query),
                alias,
            });
        }
        let name = self.next_ident()?;
        let alias = self.parse_alias()?;
        Ok(FromClause::Table { name, alias })
    }

    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.next_is_keyword(Keyword::As) {
            return Ok(Some(self.next_ident()?));
        }
        Ok(self.next_if_map(|token| match token {
            Token::Ident(ident) => Some(ident.clone()),
            _ => None,
        }))
    }

    /// INSERT INTO table [(columns)] VALUES (...), ... [RETURNING targets]
    pub(super) fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.next_ident()?;

        let columns = if self.peek()? == Some(&Token::OpenParen) {
            Some(self.parse_ident_list()?)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        let mut values = Vec::new();
        loop {
            self.expect(Token::OpenParen)?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expression()?);
                if !self.skip(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
            values.push(row);
            if !self.skip(Token::Comma) {
                break;
            }
        }

        let returning = self.parse_returning()?;
        Ok(Statement::Insert {
            table,
            columns,
            values,
            returning,
        })
    }

    /// UPDATE table SET col = expr, ... [WHERE ...] [RETURNING targets]
    pub(super) fn parse_update(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.next_ident()?;
        self.expect_keyword(Keyword::Set)?;

        let mut set = Vec::new();
        loop {
            let column = self.next_ident()?;
            self.expect(Token::Equal)?;
            let value = self.parse_expression()?;
            if set.iter().any(|(c, _)| c == &column) {
                return Err(Error::ParseError(format!(
                    "duplicate assignment to column {}",
                    column
                )));
            }
            set.push((column, value));
            if !self.skip(Token::Comma) {
                break;
            }
        }

        let r#where = if self.next_is_keyword(Keyword::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let returning = self.parse_returning()?;
        Ok(Statement::Update {
            table,
            set,
            r#where,
            returning,
        })
    }

    fn parse_returning(&mut self) -> Result<Option<Vec<(Expression, Option<String>)>>> {
        if self.next_is_keyword(Keyword::Returning) {
            Ok(Some(self.parse_target_list()?))
        } else {
            Ok(None)
        }
    }
}
