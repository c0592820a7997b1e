//! Leaf boxes: one (possibly negated) filter keyword and its bound values.

use crate::ast::{
    join_escaped, FilterAst, FilterPart, FilterValues, ValueShape, ValueSlot, FROM_SENTINEL,
    VALUES_SENTINEL,
};
use crate::config::{FilterArg, FilterDef};
use crate::error::{BuildResult, ConstructionError, EditError};
use crate::var_names::SharedNames;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a box or item within the editor. Two elements are the same
/// element only if their ids match, whatever their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The kind of value an item edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    None,
    Entry,
    List,
    ListFrom,
}

/// The values currently selected in an item.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentValues {
    NoArgument,
    /// Free text; holds at most one element.
    Entry(Vec<String>),
    List(Vec<String>),
    /// Constrains only once both sides are set.
    ListFrom {
        values: Option<Vec<String>>,
        from: Option<Vec<String>>,
    },
}

impl CurrentValues {
    fn for_arg(arg: &FilterArg) -> Self {
        match arg {
            FilterArg::None => CurrentValues::NoArgument,
            FilterArg::Entry => CurrentValues::Entry(Vec::new()),
            FilterArg::List { .. } => CurrentValues::List(Vec::new()),
            FilterArg::ListFrom { .. } => CurrentValues::ListFrom { values: None, from: None },
        }
    }

    fn for_shape(part: &FilterPart) -> BuildResult<Self> {
        match &part.shape {
            ValueShape::Literal => Ok(CurrentValues::NoArgument),
            ValueShape::Entry => Ok(CurrentValues::Entry(Vec::new())),
            ValueShape::List { .. } => Ok(CurrentValues::List(Vec::new())),
            ValueShape::Tuple { .. } => Ok(CurrentValues::ListFrom { values: None, from: None }),
            ValueShape::None => Err(ConstructionError::UnclassifiedValue {
                filter: part.filter_name.clone(),
            }),
        }
    }

    /// Takes over literal values already carried by a parsed node.
    fn load(&mut self, part: &FilterPart) -> BuildResult<()> {
        let Some(carried) = &part.values else {
            return Ok(());
        };
        match (self, carried) {
            (CurrentValues::Entry(current), FilterValues::List(values)) if values.len() <= 1 => {
                *current = values.clone();
            }
            (CurrentValues::List(current), FilterValues::List(values)) => {
                *current = values.clone();
            }
            (CurrentValues::ListFrom { values, from }, FilterValues::From { values: v, from: f }) => {
                *values = normalize_slot(v, VALUES_SENTINEL);
                *from = normalize_slot(f, FROM_SENTINEL);
            }
            _ => {
                return Err(ConstructionError::UnclassifiedValue {
                    filter: part.filter_name.clone(),
                })
            }
        }
        Ok(())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            CurrentValues::NoArgument => ValueType::None,
            CurrentValues::Entry(_) => ValueType::Entry,
            CurrentValues::List(_) => ValueType::List,
            CurrentValues::ListFrom { .. } => ValueType::ListFrom,
        }
    }

    /// True when a value-requiring item has nothing to bind. A `ListFrom`
    /// with only one side set counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CurrentValues::NoArgument => false,
            CurrentValues::Entry(values) | CurrentValues::List(values) => values.is_empty(),
            CurrentValues::ListFrom { values, from } => values.is_none() || from.is_none(),
        }
    }

    fn cleared(&self) -> Self {
        match self {
            CurrentValues::NoArgument => CurrentValues::NoArgument,
            CurrentValues::Entry(_) => CurrentValues::Entry(Vec::new()),
            CurrentValues::List(_) => CurrentValues::List(Vec::new()),
            CurrentValues::ListFrom { .. } => CurrentValues::ListFrom { values: None, from: None },
        }
    }
}

fn normalize_slot(slot: &ValueSlot, sentinel: &str) -> Option<Vec<String>> {
    match slot {
        ValueSlot::Any => None,
        ValueSlot::Values(values) => ValueSlot::from_literals(values.clone(), sentinel).into_option(),
    }
}

fn non_empty(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values.filter(|v| !v.is_empty())
}

/// A leaf of the box model.
#[derive(Debug)]
pub struct FilterBoxItem {
    id: ElementId,
    filter_name: String,
    filter_description: String,
    variable_name: String,
    negated: bool,
    disabled: bool,
    shape: ValueShape,
    current: CurrentValues,
    /// The generator holding `variable_name`.
    names: SharedNames,
}

impl PartialEq for FilterBoxItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl FilterBoxItem {
    /// Builds an item from a `FilterPart` or a `Not` wrapping one.
    pub fn from_ast(node: &FilterAst, names: &SharedNames) -> BuildResult<Self> {
        let (part, negated) = match node {
            FilterAst::Part(part) => (part, false),
            FilterAst::Not(sub) => match sub.as_ref() {
                FilterAst::Part(part) => (part, true),
                other => return Err(ConstructionError::NotALeaf { found: other.kind_name() }),
            },
            other => return Err(ConstructionError::NotALeaf { found: other.kind_name() }),
        };

        let mut current = CurrentValues::for_shape(part)?;
        current.load(part)?;

        let variable_name = {
            let mut names = names.borrow_mut();
            match &part.variable {
                Some(name) if names.claim(name) => name.clone(),
                Some(name) => {
                    let fresh = names.generate_name();
                    log::warn!(
                        "variable {} of filter {} is already in use, renamed to {}",
                        name,
                        part.filter_name,
                        fresh
                    );
                    fresh
                }
                None => names.generate_name(),
            }
        };

        Ok(Self {
            id: ElementId::next(),
            filter_name: part.filter_name.clone(),
            filter_description: part.description.clone(),
            variable_name,
            negated,
            disabled: false,
            shape: part.shape.clone(),
            current,
            names: names.clone(),
        })
    }

    /// A fresh, unset item for a registry keyword.
    pub fn new(def: &FilterDef, names: &SharedNames) -> Self {
        Self {
            id: ElementId::next(),
            filter_name: def.keyword.clone(),
            filter_description: def.description.clone(),
            variable_name: names.borrow_mut().generate_name(),
            negated: false,
            disabled: false,
            shape: def.value_shape(),
            current: CurrentValues::for_arg(&def.arg),
            names: names.clone(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn filter_description(&self) -> &str {
        &self.filter_description
    }

    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn value_type(&self) -> ValueType {
        self.current.value_type()
    }

    pub fn current_values(&self) -> &CurrentValues {
        &self.current
    }

    /// Values the user may pick from. For `ListFrom` this is the "values" side.
    pub fn domain_values(&self) -> &[String] {
        match &self.shape {
            ValueShape::List { domain } | ValueShape::Tuple { domain, .. } => domain,
            _ => &[],
        }
    }

    pub fn from_domain_values(&self) -> &[String] {
        match &self.shape {
            ValueShape::Tuple { from_domain, .. } => from_domain,
            _ => &[],
        }
    }

    /// Moves this item onto the generator of the tree it is joining. The
    /// variable is kept unless that tree already holds it.
    pub(crate) fn attach_to(&mut self, names: &SharedNames) {
        if Rc::ptr_eq(&self.names, names) {
            return;
        }
        {
            let mut target = names.borrow_mut();
            if !target.claim(&self.variable_name) {
                let fresh = target.generate_name();
                log::warn!(
                    "variable {} of filter {} is already in use, renamed to {}",
                    self.variable_name,
                    self.filter_name,
                    fresh
                );
                self.variable_name = fresh;
            }
        }
        self.names = names.clone();
    }

    pub fn set_negated(&mut self, negated: bool) {
        self.negated = negated;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    fn mismatch(&self) -> EditError {
        EditError::ValueTypeMismatch {
            filter: self.filter_name.clone(),
            expected: self.value_type(),
        }
    }

    /// Sets the free text of an `Entry` item. An empty string clears it.
    pub fn set_entry(&mut self, text: impl Into<String>) -> Result<(), EditError> {
        let CurrentValues::Entry(current) = &mut self.current else {
            return Err(self.mismatch());
        };
        let text = text.into();
        *current = if text.is_empty() { Vec::new() } else { vec![text] };
        Ok(())
    }

    pub fn set_list(&mut self, values: Vec<String>) -> Result<(), EditError> {
        let CurrentValues::List(current) = &mut self.current else {
            return Err(self.mismatch());
        };
        *current = values;
        Ok(())
    }

    /// Sets both sides of a `ListFrom` item; `None` or an empty list leaves
    /// that side unconstrained.
    pub fn set_list_from(
        &mut self,
        values: Option<Vec<String>>,
        from: Option<Vec<String>>,
    ) -> Result<(), EditError> {
        if self.value_type() != ValueType::ListFrom {
            return Err(self.mismatch());
        }
        self.current = CurrentValues::ListFrom {
            values: non_empty(values),
            from: non_empty(from),
        };
        Ok(())
    }

    pub fn clear_values(&mut self) {
        self.current = self.current.cleared();
    }

    pub fn get_variable_names(&self) -> BTreeSet<String> {
        BTreeSet::from([self.variable_name.clone()])
    }

    /// The literal values bound to this item's variable, `None` while unset.
    fn bound_values(&self) -> Option<FilterValues> {
        match &self.current {
            CurrentValues::NoArgument => None,
            CurrentValues::Entry(values) | CurrentValues::List(values) => {
                (!values.is_empty()).then(|| FilterValues::List(values.clone()))
            }
            CurrentValues::ListFrom { values: Some(values), from: Some(from) } => {
                Some(FilterValues::From {
                    values: ValueSlot::Values(values.clone()),
                    from: ValueSlot::Values(from.clone()),
                })
            }
            CurrentValues::ListFrom { .. } => None,
        }
    }

    /// Maps the variable to its bound values. Items without an argument
    /// have no binding at all; unset items map to `None`.
    pub fn get_current_values(&self) -> BTreeMap<String, Option<FilterValues>> {
        let mut values = BTreeMap::new();
        if self.value_type() != ValueType::None {
            values.insert(self.variable_name.clone(), self.bound_values());
        }
        values
    }

    /// The part carrying only the variable name; values are bound later.
    pub fn get_ast(&self) -> Option<FilterAst> {
        if self.disabled || self.current.is_empty() {
            return None;
        }
        let part = FilterAst::Part(FilterPart {
            filter_name: self.filter_name.clone(),
            description: self.filter_description.clone(),
            shape: self.shape.clone(),
            variable: Some(self.variable_name.clone()),
            values: None,
        });
        Some(if self.negated { FilterAst::not(part) } else { part })
    }

    /// Filter text for this item; empty when disabled.
    pub fn get_text(&self) -> String {
        if self.disabled {
            return String::new();
        }
        let text = match (&self.current, self.bound_values()) {
            (CurrentValues::NoArgument, _)
            | (CurrentValues::ListFrom { values: None, from: None }, _) => self.filter_name.clone(),
            (_, None) => format!("{} in {}", self.filter_name, self.variable_name),
            (CurrentValues::Entry(values), Some(_)) | (CurrentValues::List(values), Some(_)) => {
                format!("{} in {}", self.filter_name, join_escaped(values))
            }
            (CurrentValues::ListFrom { .. }, Some(bound)) => {
                format!("{} in {}", self.filter_name, bound)
            }
        };
        if self.negated {
            format!("NOT ({})", text)
        } else {
            text
        }
    }
}
