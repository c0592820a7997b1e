//! Filter表达式树 (AST)

use crate::lexer::escape;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// "from" 两侧列表中 values 一侧表示 "不限" 的哨兵字面量
pub const VALUES_SENTINEL: &str = "-1";
/// "from" 两侧列表中 from 一侧表示 "不限" 的哨兵字面量
pub const FROM_SENTINEL: &str = "";

/// 代表一个Filter表达式的树节点
#[derive(Debug, Clone, PartialEq)]
pub enum FilterAst {
    /// 顶层包装节点
    Filter(Box<FilterAst>),
    /// 二元逻辑运算 (AND / OR)
    BinOp {
        left: Box<FilterAst>,
        op: BoolOp,
        right: Box<FilterAst>,
    },
    /// 逻辑非运算 (NOT)
    Not(Box<FilterAst>),
    /// 单个Filter关键字, 这是表达式的叶子节点
    Part(FilterPart),
}

/// 逻辑运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolOp::And => write!(f, "AND"),
            BoolOp::Or => write!(f, "OR"),
        }
    }
}

/// 代表一个Filter关键字及其参数, 例如：`Clan in Brujah, Gangrel` 或 `Sect in $var0`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPart {
    pub filter_name: String,
    /// 关键字的可读描述
    pub description: String,
    /// 关键字接受的参数形状
    pub shape: ValueShape,
    pub variable: Option<String>,
    /// 已绑定的字面量
    pub values: Option<FilterValues>,
}

/// 解析器对关键字参数形状的描述
#[derive(Debug, Clone, PartialEq)]
pub enum ValueShape {
    /// 只有描述, 关键字不接受参数
    Literal,
    /// 从给定集合中选取的值列表
    List { domain: Vec<String> },
    /// "values FROM from" 两侧列表
    Tuple {
        domain: Vec<String>,
        from_domain: Vec<String>,
    },
    /// 自由文本
    Entry,
    /// 参数形状未知
    None,
}

/// 绑定到叶子节点上的字面量
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValues {
    List(Vec<String>),
    From { values: ValueSlot, from: ValueSlot },
}

/// "from" 两侧列表中的一侧：不限，或者具体的值列表
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSlot {
    Any,
    Values(Vec<String>),
}

impl ValueSlot {
    /// 将字面量列表转换为 slot，空列表或只含哨兵的列表视为不限
    pub fn from_literals(literals: Vec<String>, sentinel: &str) -> Self {
        if literals.is_empty() || literals.iter().all(|v| v == sentinel) {
            ValueSlot::Any
        } else {
            ValueSlot::Values(literals)
        }
    }

    pub fn into_option(self) -> Option<Vec<String>> {
        match self {
            ValueSlot::Any => None,
            ValueSlot::Values(values) => Some(values),
        }
    }

    fn write_escaped(&self, f: &mut fmt::Formatter<'_>, sentinel: &str) -> fmt::Result {
        match self {
            ValueSlot::Any => f.write_str(&escape(sentinel)),
            ValueSlot::Values(values) => f.write_str(&join_escaped(values)),
        }
    }
}

/// 将字面量逐个转义后以逗号连接
pub fn join_escaped(values: &[String]) -> String {
    values.iter().map(|v| escape(v)).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for FilterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValues::List(values) => f.write_str(&join_escaped(values)),
            FilterValues::From { values, from } => {
                values.write_escaped(f, VALUES_SENTINEL)?;
                f.write_str(" FROM ")?;
                from.write_escaped(f, FROM_SENTINEL)
            }
        }
    }
}

impl FilterAst {
    pub fn bin_op(left: FilterAst, op: BoolOp, right: FilterAst) -> Self {
        FilterAst::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn not(sub: FilterAst) -> Self {
        FilterAst::Not(Box::new(sub))
    }

    /// 去掉顶层的 `Filter` 包装节点
    pub fn unwrap_filter(&self) -> &FilterAst {
        match self {
            FilterAst::Filter(inner) => inner.unwrap_filter(),
            other => other,
        }
    }

    /// 收集树中出现的所有变量名
    pub fn variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variable_names(&mut names);
        names
    }

    fn collect_variable_names(&self, names: &mut BTreeSet<String>) {
        match self {
            FilterAst::Filter(inner) | FilterAst::Not(inner) => inner.collect_variable_names(names),
            FilterAst::BinOp { left, right, .. } => {
                left.collect_variable_names(names);
                right.collect_variable_names(names);
            }
            FilterAst::Part(part) => {
                if let Some(name) = &part.variable {
                    names.insert(name.clone());
                }
            }
        }
    }

    /// 按变量名将字面量绑定到叶子节点上，返回新的树
    pub fn bind_values(&self, bindings: &BTreeMap<String, Option<FilterValues>>) -> FilterAst {
        match self {
            FilterAst::Filter(inner) => FilterAst::Filter(Box::new(inner.bind_values(bindings))),
            FilterAst::Not(inner) => FilterAst::not(inner.bind_values(bindings)),
            FilterAst::BinOp { left, op, right } => {
                FilterAst::bin_op(left.bind_values(bindings), *op, right.bind_values(bindings))
            }
            FilterAst::Part(part) => {
                let mut part = part.clone();
                let bound = part
                    .variable
                    .as_ref()
                    .and_then(|name| bindings.get(name))
                    .and_then(|values| values.clone());
                if bound.is_some() {
                    part.values = bound;
                }
                FilterAst::Part(part)
            }
        }
    }

    /// 节点种类的简短名称，用于错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            FilterAst::Filter(_) => "Filter",
            FilterAst::BinOp { .. } => "BinOp",
            FilterAst::Not(_) => "Not",
            FilterAst::Part(_) => "FilterPart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, variable: Option<&str>) -> FilterAst {
        FilterAst::Part(FilterPart {
            filter_name: name.to_string(),
            description: name.to_string(),
            shape: ValueShape::Entry,
            variable: variable.map(str::to_string),
            values: None,
        })
    }

    #[test]
    fn test_variable_names_walks_whole_tree() {
        let ast = FilterAst::Filter(Box::new(FilterAst::bin_op(
            part("CardText", Some("$var3")),
            BoolOp::Or,
            FilterAst::not(part("CardName", Some("$custom"))),
        )));
        let names: Vec<_> = ast.variable_names().into_iter().collect();
        assert_eq!(names, vec!["$custom".to_string(), "$var3".to_string()]);
    }

    #[test]
    fn test_bind_values_only_touches_bound_variables() {
        let ast = FilterAst::bin_op(
            part("CardText", Some("$var0")),
            BoolOp::And,
            part("CardName", Some("$var1")),
        );
        let mut bindings = BTreeMap::new();
        bindings.insert("$var0".to_string(), Some(FilterValues::List(vec!["blood".to_string()])));
        bindings.insert("$var1".to_string(), None);

        let bound = ast.bind_values(&bindings);
        if let FilterAst::BinOp { left, right, .. } = bound {
            if let (FilterAst::Part(l), FilterAst::Part(r)) = (left.as_ref(), right.as_ref()) {
                assert_eq!(l.values, Some(FilterValues::List(vec!["blood".to_string()])));
                assert_eq!(r.values, None);
            } else {
                panic!("Expected filter parts");
            }
        } else {
            panic!("Expected BinOp");
        }
    }

    #[test]
    fn test_value_slot_sentinels() {
        assert_eq!(
            ValueSlot::from_literals(vec!["-1".to_string()], VALUES_SENTINEL),
            ValueSlot::Any
        );
        assert_eq!(
            ValueSlot::from_literals(vec![String::new()], FROM_SENTINEL),
            ValueSlot::Any
        );
        assert_eq!(
            ValueSlot::from_literals(vec!["2".to_string()], VALUES_SENTINEL),
            ValueSlot::Values(vec!["2".to_string()])
        );
    }

    #[test]
    fn test_filter_values_display_escapes() {
        let list = FilterValues::List(vec!["Equipment".to_string(), "Imbued".to_string()]);
        assert_eq!(list.to_string(), r#""Equipment", "Imbued""#);

        let from = FilterValues::From {
            values: ValueSlot::Any,
            from: ValueSlot::Values(vec!["My \"Deck\"".to_string()]),
        };
        assert_eq!(from.to_string(), r#""-1" FROM "My \"Deck\"""#);
    }
}
