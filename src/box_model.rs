//! Composite AND/OR/NOT boxes mirroring a filter AST.
//!
//! A box owns its children outright; the only thing shared across a tree is
//! the variable name generator. Building flattens chains of the same operator
//! into one N-ary box, and `get_ast` folds them back into a left-leaning chain
//! of binary nodes.

use crate::ast::{BoolOp, FilterAst, FilterValues};
use crate::box_item::{ElementId, FilterBoxItem};
use crate::config::{FilterDef, FilterType};
use crate::error::{BuildResult, ConstructionError};
use crate::var_names::{SharedNames, VariableNameGenerator};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// A direct child of a box.
#[derive(Debug, PartialEq)]
pub enum BoxChild {
    Box(FilterBoxModel),
    Item(FilterBoxItem),
}

impl BoxChild {
    pub fn id(&self) -> ElementId {
        match self {
            BoxChild::Box(model) => model.id(),
            BoxChild::Item(item) => item.id(),
        }
    }

    pub fn as_box(&self) -> Option<&FilterBoxModel> {
        match self {
            BoxChild::Box(model) => Some(model),
            BoxChild::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&FilterBoxItem> {
        match self {
            BoxChild::Item(item) => Some(item),
            BoxChild::Box(_) => None,
        }
    }

    /// Re-seats this child and everything below it onto `names`.
    fn attach_to(&mut self, names: &SharedNames) {
        match self {
            BoxChild::Box(model) => model.adopt(names),
            BoxChild::Item(item) => item.attach_to(names),
        }
    }

    fn get_ast(&self) -> Option<FilterAst> {
        match self {
            BoxChild::Box(model) => model.get_ast(),
            BoxChild::Item(item) => item.get_ast(),
        }
    }

    fn get_text(&self) -> String {
        match self {
            BoxChild::Box(model) => model.get_text(),
            BoxChild::Item(item) => item.get_text(),
        }
    }

    fn get_variable_names(&self) -> BTreeSet<String> {
        match self {
            BoxChild::Box(model) => model.get_variable_names(),
            BoxChild::Item(item) => item.get_variable_names(),
        }
    }

    fn get_current_values(&self) -> BTreeMap<String, Option<FilterValues>> {
        match self {
            BoxChild::Box(model) => model.get_current_values(),
            BoxChild::Item(item) => item.get_current_values(),
        }
    }
}

impl From<FilterBoxModel> for BoxChild {
    fn from(model: FilterBoxModel) -> Self {
        BoxChild::Box(model)
    }
}

impl From<FilterBoxItem> for BoxChild {
    fn from(item: FilterBoxItem) -> Self {
        BoxChild::Item(item)
    }
}

/// An editable AND/OR group, optionally negated or disabled.
#[derive(Debug)]
pub struct FilterBoxModel {
    id: ElementId,
    box_type: BoolOp,
    negate: bool,
    disabled: bool,
    filter_type: FilterType,
    children: Vec<BoxChild>,
    names: SharedNames,
}

impl PartialEq for FilterBoxModel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl FilterBoxModel {
    /// An empty AND box with its own name generator.
    pub fn new(filter_type: FilterType) -> Self {
        Self::empty(BoolOp::And, filter_type, VariableNameGenerator::shared())
    }

    fn empty(box_type: BoolOp, filter_type: FilterType, names: SharedNames) -> Self {
        Self {
            id: ElementId::next(),
            box_type,
            negate: false,
            disabled: false,
            filter_type,
            children: Vec::new(),
            names,
        }
    }

    /// Builds a box model from an AST.
    ///
    /// `names` is `None` for the top of a tree: a fresh generator is created
    /// and seeded with every variable name found in `ast`. Nested builds pass
    /// the tree's generator down. `ast == None` yields an empty AND box.
    pub fn build(
        ast: Option<&FilterAst>,
        filter_type: FilterType,
        names: Option<SharedNames>,
    ) -> BuildResult<Self> {
        let names = names.unwrap_or_else(|| {
            let names = VariableNameGenerator::shared();
            if let Some(ast) = ast {
                names.borrow_mut().register_existing(ast.variable_names());
            }
            names
        });

        let mut model = Self::empty(BoolOp::And, filter_type, names);
        if let Some(ast) = ast {
            model.populate(ast)?;
        }
        log::debug!(
            "built {} box with {} children (negated: {})",
            model.box_type,
            model.children.len(),
            model.negate
        );
        Ok(model)
    }

    fn populate(&mut self, ast: &FilterAst) -> BuildResult<()> {
        match ast {
            FilterAst::Filter(inner) => self.populate(inner),
            FilterAst::BinOp { left, op, right } => {
                self.box_type = *op;
                self.absorb(left)?;
                self.absorb(right)
            }
            FilterAst::Not(sub) => match sub.as_ref() {
                FilterAst::BinOp { left, op, right } => {
                    self.box_type = *op;
                    self.negate = true;
                    self.absorb(left)?;
                    self.absorb(right)
                }
                FilterAst::Part(_) => {
                    self.box_type = BoolOp::And;
                    self.push_item(ast)
                }
                other => Err(ConstructionError::unsupported("negated box", other.kind_name())),
            },
            FilterAst::Part(_) => {
                self.box_type = BoolOp::And;
                self.push_item(ast)
            }
        }
    }

    /// Adds one operand of this box's operator, merging same-operator chains.
    fn absorb(&mut self, node: &FilterAst) -> BuildResult<()> {
        match node {
            FilterAst::BinOp { left, op, right } if *op == self.box_type => {
                self.absorb(left)?;
                self.absorb(right)
            }
            FilterAst::BinOp { .. } => self.push_box(node),
            FilterAst::Not(sub) if matches!(sub.as_ref(), FilterAst::BinOp { .. }) => self.push_box(node),
            FilterAst::Not(_) | FilterAst::Part(_) => self.push_item(node),
            FilterAst::Filter(_) => Err(ConstructionError::unsupported("box", node.kind_name())),
        }
    }

    fn push_box(&mut self, node: &FilterAst) -> BuildResult<()> {
        let child = Self::build(Some(node), self.filter_type, Some(self.names.clone()))?;
        self.children.push(BoxChild::Box(child));
        Ok(())
    }

    fn push_item(&mut self, node: &FilterAst) -> BuildResult<()> {
        let item = FilterBoxItem::from_ast(node, &self.names)?;
        self.children.push(BoxChild::Item(item));
        Ok(())
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn box_type(&self) -> BoolOp {
        self.box_type
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_box_type(&mut self, box_type: BoolOp, negate: bool) {
        self.box_type = box_type;
        self.negate = negate;
    }

    pub fn set_negate(&mut self, negate: bool) {
        self.negate = negate;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn children(&self) -> &[BoxChild] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends a child. A child coming from another tree joins this tree's
    /// name generator and is renamed where its variables collide.
    pub fn push_child(&mut self, child: impl Into<BoxChild>) {
        let mut child = child.into();
        child.attach_to(&self.names);
        self.children.push(child);
    }

    /// Inserts at `index`, or appends when `index` is past the end.
    pub fn insert_child(&mut self, index: usize, child: impl Into<BoxChild>) {
        let mut child = child.into();
        child.attach_to(&self.names);
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Every element of a tree shares one generator, so a box already on
    /// `names` has nothing to re-seat.
    fn adopt(&mut self, names: &SharedNames) {
        if Rc::ptr_eq(&self.names, names) {
            return;
        }
        self.names = names.clone();
        for child in &mut self.children {
            child.attach_to(names);
        }
    }

    pub fn pop_child(&mut self) -> Option<BoxChild> {
        self.children.pop()
    }

    /// Detaches the direct child with the given identity.
    pub fn remove_child(&mut self, id: ElementId) -> Option<BoxChild> {
        let index = self.children.iter().position(|child| child.id() == id)?;
        Some(self.children.remove(index))
    }

    /// Appends an empty sub-box sharing this tree's name generator.
    pub fn add_child_box(&mut self, box_type: BoolOp) -> &mut FilterBoxModel {
        let child = Self::empty(box_type, self.filter_type, self.names.clone());
        self.children.push(BoxChild::Box(child));
        match self.children.last_mut() {
            Some(BoxChild::Box(child)) => child,
            _ => unreachable!("a box was just appended"),
        }
    }

    /// Appends an unset item for `def` with a freshly allocated variable.
    pub fn add_child_item(&mut self, def: &FilterDef) -> &mut FilterBoxItem {
        let item = FilterBoxItem::new(def, &self.names);
        self.children.push(BoxChild::Item(item));
        match self.children.last_mut() {
            Some(BoxChild::Item(item)) => item,
            _ => unreachable!("an item was just appended"),
        }
    }

    /// True if `id` is a direct child or sits anywhere below one.
    pub fn is_in_model(&self, id: ElementId) -> bool {
        self.children.iter().any(|child| {
            child.id() == id || matches!(child, BoxChild::Box(model) if model.is_in_model(id))
        })
    }

    /// Finds this box or a nested box by identity.
    pub fn find_box_mut(&mut self, id: ElementId) -> Option<&mut FilterBoxModel> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            BoxChild::Box(model) => model.find_box_mut(id),
            BoxChild::Item(_) => None,
        })
    }

    pub fn find_item_mut(&mut self, id: ElementId) -> Option<&mut FilterBoxItem> {
        self.children.iter_mut().find_map(|child| match child {
            BoxChild::Item(item) if item.id() == id => Some(item),
            BoxChild::Item(_) => None,
            BoxChild::Box(model) => model.find_item_mut(id),
        })
    }

    pub fn get_variable_names(&self) -> BTreeSet<String> {
        self.children
            .iter()
            .flat_map(|child| child.get_variable_names())
            .collect()
    }

    pub fn get_current_values(&self) -> BTreeMap<String, Option<FilterValues>> {
        self.children
            .iter()
            .flat_map(|child| child.get_current_values())
            .collect()
    }

    /// The AST of the live children, left-folded with this box's operator.
    /// Leaves carry variable names only.
    pub fn get_ast(&self) -> Option<FilterAst> {
        if self.disabled {
            return None;
        }
        let mut parts = self.children.iter().filter_map(BoxChild::get_ast);
        let first = parts.next()?;
        let folded = parts.fold(first, |acc, next| FilterAst::bin_op(acc, self.box_type, next));
        Some(if self.negate { FilterAst::not(folded) } else { folded })
    }

    /// `get_ast` with every variable bound to the value held by its item.
    pub fn get_ast_with_values(&self) -> Option<FilterAst> {
        let ast = self.get_ast()?;
        Some(ast.bind_values(&self.get_current_values()))
    }

    pub fn get_text(&self) -> String {
        if self.disabled {
            return String::new();
        }
        let texts: Vec<String> = self
            .children
            .iter()
            .map(BoxChild::get_text)
            .filter(|text| !text.is_empty())
            .collect();

        match (texts.len(), self.negate) {
            (0, _) => String::new(),
            (1, false) => texts[0].clone(),
            (1, true) => format!("NOT ({})", texts[0]),
            (_, negate) => {
                let joined = format!("({})", texts.join(&format!(" {} ", self.box_type)));
                if negate {
                    format!("NOT {}", joined)
                } else {
                    joined
                }
            }
        }
    }
}
