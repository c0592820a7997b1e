//! Structured editing of boolean card filters.
//!
//! Filter text is parsed into a [`ast::FilterAst`], turned into an editable
//! [`box_model::FilterBoxModel`] tree, edited, and turned back into a value
//! bound AST that [`sql_compiler::SqlCompiler`] can run against the card store.

pub mod ast;
pub mod box_item;
pub mod box_model;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod sql_compiler;
pub mod token;
pub mod var_names;

pub use box_item::{CurrentValues, ElementId, FilterBoxItem, ValueType};
pub use box_model::{BoxChild, FilterBoxModel};
pub use error::{ConstructionError, EditError};
