//! CREATE TABLE parsing

use super::super::ast::{ColumnDef, CreateTable, Statement, TableConstraint};
use super::super::lexer::{Keyword, Token};
use super::Parser;
use crate::error::{Error, Result};

impl Parser<'_> {
    /// CREATE TABLE [IF NOT EXISTS] name ( columns and constraints )
    /// or CREATE TABLE name AS select.
    pub(super) fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;

        let if_not_exists = if self.next_is_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let name = self.next_ident()?;

        if self.next_is_keyword(Keyword::As) {
            let query = self.parse_select()?;
            return Ok(Statement::CreateTable(CreateTable {
                name,
                if_not_exists,
                columns: Vec::new(),
                constraints: Vec::new(),
                as_query: Some(Box::new(query)),
            }));
        }

        self.expect(Token::OpenParen)?;
        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if self.peek_table_constraint() {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }
            if !self.skip(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;

        if columns.is_empty() {
            return Err(Error::ParseError(format!(
                "table {} must have at least one column",
                name
            )));
        }

        Ok(Statement::CreateTable(CreateTable {
            name,
            if_not_exists,
            columns,
            constraints,
            as_query: None,
        }))
    }

    fn peek_table_constraint(&mut self) -> bool {
        matches!(
            self.peek(),
            Ok(Some(Token::Keyword(
                Keyword::Constraint
                    | Keyword::Check
                    | Keyword::Unique
                    | Keyword::Primary
                    | Keyword::Foreign
            )))
        )
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let name = if self.next_is_keyword(Keyword::Constraint) {
            Some(self.next_ident()?)
        } else {
            None
        };

        if self.next_is_keyword(Keyword::Check) {
            self.expect(Token::OpenParen)?;
            let expr = self.parse_expression()?;
            self.expect(Token::CloseParen)?;
            return Ok(TableConstraint::Check { name, expr });
        }
        if self.next_is_keyword(Keyword::Unique) {
            let columns = self.parse_ident_list()?;
            return Ok(TableConstraint::Unique { name, columns });
        }
        if self.next_is_keyword(Keyword::Primary) {
            self.expect_keyword(Keyword::Key)?;
            let columns = self.parse_ident_list()?;
            return Ok(TableConstraint::PrimaryKey { name, columns });
        }
        if self.next_is_keyword(Keyword::Foreign) {
            self.expect_keyword(Keyword::Key)?;
            let columns = self.parse_ident_list()?;
            self.expect_keyword(Keyword::References)?;
            let references = self.next_ident()?;
            let ref_columns = if self.peek()? == Some(&Token::OpenParen) {
                self.parse_ident_list()?
            } else {
                Vec::new()
            };
            return Ok(TableConstraint::ForeignKey {
                name,
                columns,
                references,
                ref_columns,
            });
        }

        Err(Error::ParseError("expected table constraint".into()))
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.next_ident()?;
        let type_name = self.next_ident()?;
        let is_array = if self.skip(Token::OpenBracket) {
            self.expect(Token::CloseBracket)?;
            true
        } else {
            false
        };

        let mut column = ColumnDef {
            name,
            type_name,
            is_array,
            not_null: false,
            default: None,
            check: None,
            unique: false,
            primary_key: false,
        };

        loop {
            if self.next_is_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key)?;
                column.primary_key = true;
                column.not_null = true;
            } else if self.next_is_keyword(Keyword::Not) {
                self.expect_keyword(Keyword::Null)?;
                column.not_null = true;
            } else if self.next_is_keyword(Keyword::Null) {
                column.not_null = false;
            } else if self.next_is_keyword(Keyword::Unique) {
                column.unique = true;
            } else if self.next_is_keyword(Keyword::Default) {
                column.default = Some(self.parse_expression()?);
            } else if self.next_is_keyword(Keyword::Check) {
                self.expect(Token::OpenParen)?;
                column.check = Some(self.parse_expression()?);
                self.expect(Token::CloseParen)?;
            } else {
                break;
            }
        }

        Ok(column)
    }
}
