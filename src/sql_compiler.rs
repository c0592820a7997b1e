//! SQL compiler that converts a value-bound filter AST into a card query using sea-query.

use crate::ast::{BoolOp, FilterAst, FilterPart, FilterValues, ValueSlot};
use crate::config::{FilterArg, FilterRegistry, FilterType};
use sea_query::{Asterisk, Expr, Iden, LikeExpr, PostgresQueryBuilder, SelectStatement, SimpleExpr};

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = write!(s, "{}", self.0);
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = write!(s, "{}", self.0);
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unknown filter '{filter}'")]
    UnknownFilter { filter: String },

    #[error("Filter '{filter}' has no value bound to {variable}")]
    UnboundVariable { filter: String, variable: String },

    #[error("Filter '{filter}' carries values of the wrong shape")]
    ValueMismatch { filter: String },

    #[error("Filter '{filter}' has no column for its FROM side")]
    MissingFromColumn { filter: String },
}

/// SQL Compiler that turns bound filter ASTs into SELECT statements
pub struct SqlCompiler {
    /// Maps filter keywords to columns and filter types to tables
    registry: FilterRegistry,
}

impl SqlCompiler {
    pub fn new(registry: FilterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Compile a bound AST into a SELECT over the table of `filter_type`
    pub fn compile(&self, ast: &FilterAst, filter_type: FilterType) -> Result<String, CompileError> {
        let condition = self.compile_condition(ast)?;

        let mut select = SelectStatement::new();
        select
            .from(TableName(self.registry.get_table_name(filter_type)))
            .column(Asterisk)
            .and_where(condition);

        let sql = select.to_string(PostgresQueryBuilder);
        log::debug!("compiled filter to {}", sql);
        Ok(sql)
    }

    fn compile_condition(&self, ast: &FilterAst) -> Result<SimpleExpr, CompileError> {
        let expr = match ast {
            FilterAst::Filter(inner) => self.compile_condition(inner)?,
            FilterAst::BinOp { left, op, right } => {
                let left_expr = self.compile_condition(left)?;
                let right_expr = self.compile_condition(right)?;
                match op {
                    BoolOp::And => left_expr.and(right_expr),
                    BoolOp::Or => left_expr.or(right_expr),
                }
            }
            FilterAst::Not(inner) => self.compile_condition(inner)?.not(),
            FilterAst::Part(part) => self.compile_part(part)?,
        };
        Ok(expr)
    }

    /// Compile a single filter keyword against its configured column
    fn compile_part(&self, part: &FilterPart) -> Result<SimpleExpr, CompileError> {
        let def = self
            .registry
            .get(&part.filter_name)
            .ok_or_else(|| CompileError::UnknownFilter { filter: part.filter_name.clone() })?;
        let column = || Expr::col(ColumnName(def.column.clone()));
        let unbound = || CompileError::UnboundVariable {
            filter: part.filter_name.clone(),
            variable: part.variable.clone().unwrap_or_default(),
        };

        match (&def.arg, &part.values) {
            (FilterArg::None, _) => Ok(column().eq(true)),
            (_, None) => Err(unbound()),
            (FilterArg::Entry, Some(FilterValues::List(values))) => values
                .iter()
                .map(|text| column().like(LikeExpr::new(format!("%{}%", text))))
                .reduce(|acc, expr| acc.or(expr))
                .ok_or_else(unbound),
            (FilterArg::List { .. }, Some(FilterValues::List(values))) => {
                Ok(column().is_in(values.iter().cloned()))
            }
            (FilterArg::ListFrom { .. }, Some(FilterValues::From { values, from })) => {
                let from_column = def.from_column.as_ref().ok_or_else(|| {
                    CompileError::MissingFromColumn { filter: part.filter_name.clone() }
                })?;
                let mut conditions = Vec::new();
                if let ValueSlot::Values(values) = values {
                    conditions.push(column().is_in(values.iter().cloned()));
                }
                if let ValueSlot::Values(from) = from {
                    conditions.push(Expr::col(ColumnName(from_column.clone())).is_in(from.iter().cloned()));
                }
                Ok(combine_conditions_with_and(conditions))
            }
            _ => Err(CompileError::ValueMismatch { filter: part.filter_name.clone() }),
        }
    }
}

/// Combine multiple conditions with AND; no conditions matches everything
fn combine_conditions_with_and(conditions: Vec<SimpleExpr>) -> SimpleExpr {
    conditions
        .into_iter()
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| Expr::val(true).into())
}
