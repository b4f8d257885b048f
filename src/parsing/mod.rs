//! SQL parsing
//!
//! Turns raw statement text into the AST consumed by the planner. The
//! parser only checks that the syntax is well-formed; name resolution and
//! typing happen during planning.

pub mod ast;
mod lexer;
mod parser;

use crate::error::Result;

pub use lexer::{Keyword, Lexer, QuoteStyle, Token};
pub use parser::{IdentifierQuoting, Parser, PlaceholderUse};

/// Parses a single SQL statement into an AST.
pub fn parse_sql(sql: &str) -> Result<ast::Statement> {
    Parser::parse(sql)
}

#[cfg(test)]
mod tests {
    use super::ast::{Expression, Operator, Statement};
    use super::*;

    fn select(sql: &str) -> ast::SelectStatement {
        match parse_sql(sql).unwrap() {
            Statement::Select(select) => *select,
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_select_basic() {
        let s = select("SELECT a, b AS bee FROM t WHERE a > 1 ORDER BY b DESC LIMIT 10");
        assert_eq!(s.select.len(), 2);
        assert_eq!(s.select[1].1.as_deref(), Some("bee"));
        assert_eq!(s.from.len(), 1);
        assert!(s.r#where.is_some());
        assert_eq!(s.order_by.len(), 1);
        assert!(s.limit.is_some());
    }

    #[test]
    fn test_select_group_by_index() {
        let s = select("SELECT name, count(*) FROM t GROUP BY 1 HAVING count(*) > 2");
        assert_eq!(s.group_by.len(), 1);
        assert!(s.having.is_some());
    }

    #[test]
    fn test_join_using() {
        let s = select("SELECT * FROM a JOIN b USING (id, kind)");
        match &s.from[0] {
            ast::FromClause::Join { using, .. } => assert_eq!(using.len(), 2),
            other => panic!("expected join, got {:?}", other),
        }
    }

    #[test]
    fn test_window_call() {
        let s = select(
            "SELECT group_concat(b, '.') OVER (PARTITION BY c ORDER BY a \
             RANGE BETWEEN CURRENT ROW AND UNBOUNDED FOLLOWING) FROM t1",
        );
        let Expression::Function(call) = &s.select[0].0 else {
            panic!("expected function target");
        };
        let over = call.over.as_ref().unwrap();
        assert!(over.spec.partition_by.is_some());
        assert!(over.spec.order_by.is_some());
        assert!(over.spec.frame.is_some());
    }

    #[test]
    fn test_named_window() {
        let s = select("SELECT sum(x) OVER w FROM t WINDOW w AS (PARTITION BY y)");
        assert_eq!(s.windows.len(), 1);
        let Expression::Function(call) = &s.select[0].0 else {
            panic!("expected function target");
        };
        assert_eq!(call.over.as_ref().unwrap().name.as_deref(), Some("w"));
    }

    #[test]
    fn test_cast_suffix_and_method() {
        let s = select("SELECT x::integer, y.toFixed(3) FROM t");
        assert!(matches!(&s.select[0].0, Expression::Cast { type_name, .. } if type_name == "integer"));
        assert!(matches!(&s.select[1].0, Expression::Method { name, .. } if name == "toFixed"));
    }

    #[test]
    fn test_not_in_and_between() {
        let s = select("SELECT * FROM t WHERE a NOT IN (1, 2) AND b BETWEEN 1 AND 5");
        let Some(Expression::Operator(Operator::And(lhs, rhs))) = &s.r#where else {
            panic!("expected AND");
        };
        assert!(matches!(
            lhs.as_ref(),
            Expression::Operator(Operator::In { negated: true, .. })
        ));
        assert!(matches!(
            rhs.as_ref(),
            Expression::Operator(Operator::Between { negated: false, .. })
        ));
    }

    #[test]
    fn test_pivot_by() {
        let s = select("SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1, 2");
        assert_eq!(s.pivot_by.len(), 2);
    }

    #[test]
    fn test_insert_returning() {
        let parsed = parse_sql("INSERT INTO t (a, b) VALUES ('x', 1), ('y', 2) RETURNING a").unwrap();
        let Statement::Insert {
            columns,
            values,
            returning,
            ..
        } = parsed
        else {
            panic!("expected INSERT");
        };
        assert_eq!(columns.unwrap().len(), 2);
        assert_eq!(values.len(), 2);
        assert_eq!(returning.unwrap().len(), 1);
    }

    #[test]
    fn test_create_table_constraints() {
        let parsed =
            parse_sql("CREATE TABLE t1 (a STRING, b INTEGER NOT NULL DEFAULT 7, CHECK (b > 100))")
                .unwrap();
        let Statement::CreateTable(create) = parsed else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.columns.len(), 2);
        assert!(create.columns[1].not_null);
        assert!(create.columns[1].default.is_some());
        assert_eq!(create.constraints.len(), 1);
    }

    #[test]
    fn test_mixed_case_keywords() {
        select("select A fRoM t where B is not null");
    }

    #[test]
    fn test_union_chain() {
        let s = select("SELECT a FROM t UNION SELECT b FROM u EXCEPT ALL SELECT c FROM v");
        assert_eq!(s.compound.len(), 2);
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse_sql("SELECT $ FROM t").unwrap_err();
        assert!(err.to_string().contains("position"));
    }
}
