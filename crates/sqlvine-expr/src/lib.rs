//! Generic expression-tree engine.
//!
//! Nodes ([`Expr`]) are cheap shared handles over reference-counted state.
//! Children are owned through the `args` map; parents are weak back-pointers
//! so a detached subtree is freed as soon as the last handle drops. All
//! whole-tree algorithms (traversal, hashing, copying, rewriting, dropping)
//! are iterative: tree depth is bounded by input size, not by stack size.
//!
//! Structural equality is hash-based: two nodes compare equal when they have
//! the same kind and the same structural hash. Hashes are cached per node and
//! invalidated up the ancestor chain on every mutation.

pub mod kind;

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

pub use kind::ExprKind;

/// Comment marker introducing `key=value` metadata entries.
pub const META_COMMENT: &str = "sqlvine.meta";

/// Source position attached to a node, mirroring token coordinates.
/// `start`/`end` are inclusive character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    pub start: usize,
    pub end: usize,
}

/// Metadata values parsed out of meta comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Bool(bool),
    String(String),
}

impl MetaValue {
    fn parse(text: &str) -> MetaValue {
        match text {
            "true" | "True" | "TRUE" => MetaValue::Bool(true),
            "false" | "False" | "FALSE" => MetaValue::Bool(false),
            _ => MetaValue::String(text.to_string()),
        }
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::Bool(b) => serializer.serialize_bool(*b),
            MetaValue::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Closed sum of argument values a node can hold.
///
/// `Null` doubles as the deletion marker for [`Expr::set`] and
/// [`Expr::replace`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Expr(Expr),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Value::Expr(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Value {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<Expr> for Value {
    fn from(v: Expr) -> Value {
        Value::Expr(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Expr(e) => e.serialize(serializer),
            Value::List(items) => serializer.collect_seq(items),
        }
    }
}

#[derive(Debug)]
struct ExprData {
    kind: &'static ExprKind,
    args: BTreeMap<String, Value>,
    parent: Weak<RefCell<ExprData>>,
    arg_key: Option<String>,
    index: Option<usize>,
    comments: Option<Vec<String>>,
    position: Option<Position>,
    meta: Option<BTreeMap<String, MetaValue>>,
    hash: Option<u64>,
}

impl Drop for ExprData {
    // Tears children down with an explicit worklist so that dropping a deep
    // tree does not recurse per level.
    fn drop(&mut self) {
        let mut stack: Vec<Value> = self
            .args
            .values_mut()
            .map(|v| std::mem::replace(v, Value::Null))
            .collect();

        while let Some(value) = stack.pop() {
            match value {
                Value::Expr(expr) => {
                    if let Ok(cell) = Rc::try_unwrap(expr.0) {
                        let mut data = cell.into_inner();
                        stack.extend(
                            data.args
                                .values_mut()
                                .map(|v| std::mem::replace(v, Value::Null)),
                        );
                    }
                }
                Value::List(items) => stack.extend(items),
                _ => {}
            }
        }
    }
}

/// A shared handle to one expression node.
///
/// `Clone` copies the handle, not the tree; use [`Expr::copy`] for a deep
/// copy with fresh identity.
#[derive(Debug, Clone)]
pub struct Expr(Rc<RefCell<ExprData>>);

impl Expr {
    #[must_use]
    pub fn new(kind: &'static ExprKind) -> Expr {
        Expr(Rc::new(RefCell::new(ExprData {
            kind,
            args: BTreeMap::new(),
            parent: Weak::new(),
            arg_key: None,
            index: None,
            comments: None,
            position: None,
            meta: None,
            hash: None,
        })))
    }

    /// Builds a node and wires every given argument through [`Expr::set`].
    #[must_use]
    pub fn build<'a>(
        kind: &'static ExprKind,
        args: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Expr {
        let node = Expr::new(kind);
        for (key, value) in args {
            node.set(key, value);
        }
        node
    }

    /// Identity comparison: do the two handles point at the same node?
    #[must_use]
    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn kind(&self) -> &'static ExprKind {
        self.0.borrow().kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<Expr> {
        self.0.borrow().parent.upgrade().map(Expr)
    }

    /// Key of the parent slot holding this node.
    #[must_use]
    pub fn arg_key(&self) -> Option<String> {
        self.0.borrow().arg_key.clone()
    }

    /// Position within the parent's list slot, if the slot is a list.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.0.borrow().index
    }

    #[must_use]
    pub fn arg(&self, key: &str) -> Option<Value> {
        self.0.borrow().args.get(key).cloned()
    }

    #[must_use]
    pub fn this(&self) -> Option<Value> {
        self.arg("this")
    }

    #[must_use]
    pub fn expression(&self) -> Option<Value> {
        self.arg("expression")
    }

    #[must_use]
    pub fn expressions(&self) -> Vec<Value> {
        match self.arg("expressions") {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        }
    }

    /// String content of `key`, or empty if the argument is absent or not a
    /// string.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        match self.0.borrow().args.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.text("this")
    }

    #[must_use]
    pub fn alias(&self) -> String {
        match self.0.borrow().args.get("alias") {
            Some(Value::Expr(e)) => e.name(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn alias_or_name(&self) -> String {
        let alias = self.alias();
        if alias.is_empty() {
            self.name()
        } else {
            alias
        }
    }

    #[must_use]
    pub fn position(&self) -> Option<Position> {
        self.0.borrow().position
    }

    pub fn update_positions(&self, position: Position) {
        self.0.borrow_mut().position = Some(position);
    }

    /// Copies position metadata from another node, when it has any.
    pub fn update_positions_from(&self, other: &Expr) {
        if Expr::ptr_eq(self, other) {
            return;
        }
        if let Some(position) = other.position() {
            self.0.borrow_mut().position = Some(position);
        }
    }

    #[must_use]
    pub fn comments(&self) -> Vec<String> {
        self.0.borrow().comments.clone().unwrap_or_default()
    }

    /// Detaches and returns the node's comments.
    pub fn pop_comments(&self) -> Vec<String> {
        self.0.borrow_mut().comments.take().unwrap_or_default()
    }

    /// Attaches comments, folding `sqlvine.meta` entries into node metadata.
    ///
    /// A comment containing the marker contributes `key=value` pairs split on
    /// commas; a bare key maps to `true`. The comment text itself is still
    /// kept.
    pub fn add_comments(&self, comments: &[String], prepend: bool) {
        let mut guard = self.0.borrow_mut();
        let data = &mut *guard;
        let existing = data.comments.get_or_insert_with(Vec::new);

        for comment in comments {
            if let Some(at) = comment.find(META_COMMENT) {
                let meta = data.meta.get_or_insert_with(BTreeMap::new);
                for kv in comment[at + META_COMMENT.len()..].split(',') {
                    let mut parts = kv.splitn(2, '=');
                    let key = parts.next().unwrap_or("").trim();
                    if key.is_empty() {
                        continue;
                    }
                    let value = match parts.next() {
                        Some(v) => MetaValue::parse(v.trim()),
                        None => MetaValue::Bool(true),
                    };
                    meta.insert(key.to_string(), value);
                }
            }
            if !prepend {
                existing.push(comment.clone());
            }
        }

        if prepend {
            existing.splice(0..0, comments.iter().cloned());
        }
    }

    #[must_use]
    pub fn meta(&self, key: &str) -> Option<MetaValue> {
        self.0.borrow().meta.as_ref()?.get(key).cloned()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Sets `key` to `value`, overwriting any existing argument. A `Null`
    /// value removes the argument.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.set_at(key, value.into(), None, true);
    }

    /// Indexed variant of [`Expr::set`], operating on one slot of a
    /// list-valued argument:
    ///
    /// - `Null` deletes the element and compacts the indices that follow;
    /// - a list value splices its elements in place of the element;
    /// - otherwise the element is overwritten, or, with `overwrite` false,
    ///   the value is inserted before it.
    ///
    /// Out-of-range indices and `Null` elements are left untouched. Every
    /// call invalidates cached hashes from this node to the root and rewires
    /// child back-references.
    pub fn set_at(&self, key: &str, value: Value, index: Option<usize>, overwrite: bool) {
        self.invalidate_hashes();

        match index {
            None => {
                if value.is_null() {
                    self.0.borrow_mut().args.remove(key);
                    return;
                }
                self.0.borrow_mut().args.insert(key.to_string(), value);
            }
            Some(index) => {
                let mut data = self.0.borrow_mut();
                let Some(Value::List(items)) = data.args.get_mut(key) else {
                    return;
                };
                match items.get(index) {
                    None | Some(Value::Null) => return,
                    Some(_) => {}
                }

                if value.is_null() {
                    items.remove(index);
                    for item in items.iter_mut().skip(index) {
                        if let Value::Expr(child) = item {
                            let mut child = child.0.borrow_mut();
                            child.index = child.index.map(|i| i - 1);
                        }
                    }
                    return;
                }

                match value {
                    Value::List(new_items) => {
                        items.remove(index);
                        let tail = items.split_off(index);
                        items.extend(new_items);
                        items.extend(tail);
                    }
                    other => {
                        if overwrite {
                            items[index] = other;
                        } else {
                            items.insert(index, other);
                        }
                    }
                }
            }
        }

        self.rewire(key);
    }

    /// Appends to the list-valued argument `key`, creating or replacing a
    /// non-list slot with a fresh list first.
    pub fn append(&self, key: &str, value: impl Into<Value>) {
        self.invalidate_hashes();
        {
            let mut data = self.0.borrow_mut();
            let slot = data
                .args
                .entry(key.to_string())
                .or_insert_with(|| Value::List(Vec::new()));
            if !matches!(slot, Value::List(_)) {
                *slot = Value::List(Vec::new());
            }
            if let Value::List(items) = slot {
                items.push(value.into());
            }
        }
        self.rewire(key);
    }

    /// Replaces this node within its parent and returns the replacement.
    ///
    /// With no parent, or when the parent *is* the replacement, the tree is
    /// left unchanged. Replacing a scalar slot with a list bubbles up to the
    /// nearest list-valued slot so the elements can be spliced in. The
    /// detached node's back-references are cleared unless the replacement is
    /// the node itself.
    pub fn replace(&self, replacement: Value) -> Value {
        let Some(parent) = self.parent() else {
            return replacement;
        };
        if let Value::Expr(e) = &replacement {
            if Expr::ptr_eq(e, &parent) {
                return replacement;
            }
        }
        let Some(key) = self.arg_key() else {
            return replacement;
        };

        let slot_is_scalar = matches!(parent.0.borrow().args.get(&key), Some(Value::Expr(_)));

        if matches!(replacement, Value::List(_)) && slot_is_scalar {
            if parent.parent().is_some() {
                parent.replace(replacement.clone());
            }
        } else {
            parent.set_at(&key, replacement.clone(), self.index(), true);
        }

        let is_self = matches!(&replacement, Value::Expr(e) if Expr::ptr_eq(e, self));
        if !is_self {
            let mut data = self.0.borrow_mut();
            data.parent = Weak::new();
            data.arg_key = None;
            data.index = None;
        }

        replacement
    }

    /// Detaches this node from its parent and returns it.
    pub fn pop(&self) -> Expr {
        self.replace(Value::Null);
        self.clone()
    }

    // Clears cached hashes from this node up to the root. A node whose hash
    // is already cleared implies its ancestors are cleared too.
    fn invalidate_hashes(&self) {
        let mut node = self.clone();
        loop {
            let parent = {
                let mut data = node.0.borrow_mut();
                if data.hash.is_none() {
                    return;
                }
                data.hash = None;
                data.parent.upgrade()
            };
            match parent {
                Some(p) => node = Expr(p),
                None => return,
            }
        }
    }

    // Re-points parent/arg_key/index of every child stored under `key`.
    fn rewire(&self, key: &str) {
        let children: Vec<(Expr, Option<usize>)> = match self.0.borrow().args.get(key) {
            Some(Value::Expr(child)) => vec![(child.clone(), None)],
            Some(Value::List(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.as_expr().map(|e| (e.clone(), Some(i))))
                .collect(),
            _ => Vec::new(),
        };
        for (child, index) in children {
            let mut data = child.0.borrow_mut();
            data.parent = Rc::downgrade(&self.0);
            data.arg_key = Some(key.to_string());
            data.index = index;
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Child nodes in argument order, list elements in list order.
    #[must_use]
    pub fn children(&self) -> Vec<Expr> {
        let data = self.0.borrow();
        let mut out = Vec::new();
        for value in data.args.values() {
            match value {
                Value::Expr(e) => out.push(e.clone()),
                Value::List(items) => {
                    out.extend(items.iter().filter_map(|v| v.as_expr().cloned()));
                }
                _ => {}
            }
        }
        out
    }

    #[must_use]
    pub fn bfs(&self) -> Walk<'static> {
        self.walk(true)
    }

    #[must_use]
    pub fn dfs(&self) -> Walk<'static> {
        self.walk(false)
    }

    /// Iterative pre-order walk over this node and all descendants.
    #[must_use]
    pub fn walk(&self, bfs: bool) -> Walk<'static> {
        Walk::new(self.clone(), bfs, None)
    }

    /// Walk that skips the descendants of any node for which `prune` returns
    /// true. The pruned node itself is still yielded.
    #[must_use]
    pub fn walk_pruned<'p>(&self, bfs: bool, prune: impl FnMut(&Expr) -> bool + 'p) -> Walk<'p> {
        Walk::new(self.clone(), bfs, Some(Box::new(prune)))
    }

    /// First node (breadth-first) whose kind is one of `kinds`.
    #[must_use]
    pub fn find(&self, kinds: &[&'static ExprKind]) -> Option<Expr> {
        self.find_all(kinds).next()
    }

    /// All nodes (breadth-first) whose kind is one of `kinds`.
    pub fn find_all<'a>(&self, kinds: &'a [&'static ExprKind]) -> impl Iterator<Item = Expr> + 'a {
        self.walk(true).filter(|node| kinds.contains(&node.kind()))
    }

    /// [`Expr::find_all`] with a prune predicate bounding the search.
    pub fn find_all_pruned<'p>(
        &self,
        kinds: &'p [&'static ExprKind],
        prune: impl FnMut(&Expr) -> bool + 'p,
    ) -> impl Iterator<Item = Expr> + 'p {
        self.walk_pruned(true, prune)
            .filter(|node| kinds.contains(&node.kind()))
    }

    /// Nearest ancestor whose kind is one of `kinds`.
    #[must_use]
    pub fn find_ancestor(&self, kinds: &[&'static ExprKind]) -> Option<Expr> {
        let mut node = self.parent();
        while let Some(current) = node {
            if kinds.contains(&current.kind()) {
                return Some(current);
            }
            node = current.parent();
        }
        None
    }

    #[must_use]
    pub fn root(&self) -> Expr {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// True when the node holds no child nodes and no non-empty lists.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !self.0.borrow().args.values().any(|v| match v {
            Value::Expr(_) => true,
            Value::List(items) => !items.is_empty(),
            _ => false,
        })
    }

    // ------------------------------------------------------------------
    // Hashing and equality
    // ------------------------------------------------------------------

    /// Structural hash over kind and arguments, cached per node.
    ///
    /// Uncached descendants are discovered breadth-first and folded in
    /// reverse (bottom-up) order, so each node's hash is computed exactly
    /// once. Keys fold in sorted order; plain strings fold lowercased;
    /// absent-like scalars (`Null`, `false`) fold nothing, and absent-like
    /// list elements fold their key only, so an explicit `false` is
    /// indistinguishable from an unset flag.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        if let Some(h) = self.0.borrow().hash {
            return h;
        }

        let mut nodes: Vec<Expr> = Vec::new();
        let mut queue: VecDeque<Expr> = VecDeque::new();
        queue.push_back(self.clone());
        while let Some(node) = queue.pop_front() {
            for child in node.children() {
                if child.0.borrow().hash.is_none() {
                    queue.push_back(child);
                }
            }
            nodes.push(node);
        }

        for node in nodes.iter().rev() {
            let mut data = node.0.borrow_mut();
            let mut h = {
                let mut hasher = DefaultHasher::new();
                data.kind.name.hash(&mut hasher);
                hasher.finish()
            };
            for (key, value) in &data.args {
                match value {
                    Value::List(items) => {
                        for item in items {
                            h = match item {
                                Value::Null | Value::Bool(false) => fold_key(h, key),
                                other => fold_value(h, key, other),
                            };
                        }
                    }
                    Value::Null | Value::Bool(false) => {}
                    other => h = fold_value(h, key, other),
                }
            }
            data.hash = Some(h);
        }

        self.0.borrow().hash.unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Copy and transform
    // ------------------------------------------------------------------

    /// Deep copy sharing no identity with the original. Comments, metadata,
    /// positions and (leaf) cached hashes are carried over.
    #[must_use]
    pub fn copy(&self) -> Expr {
        let root = Expr::new(self.kind());
        let mut stack: Vec<(Expr, Expr)> = vec![(self.clone(), root.clone())];

        while let Some((node, copy)) = stack.pop() {
            {
                let data = node.0.borrow();
                let mut copy_data = copy.0.borrow_mut();
                copy_data.comments = data.comments.clone();
                copy_data.position = data.position;
                copy_data.meta = data.meta.clone();
                copy_data.hash = data.hash;
            }

            let args: Vec<(String, Value)> = node
                .0
                .borrow()
                .args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            for (key, value) in args {
                match value {
                    Value::Expr(child) => {
                        let fresh = Expr::new(child.kind());
                        stack.push((child, fresh.clone()));
                        copy.set(&key, fresh);
                    }
                    Value::List(items) => {
                        copy.0
                            .borrow_mut()
                            .args
                            .insert(key.clone(), Value::List(Vec::new()));
                        for item in items {
                            match item {
                                Value::Expr(child) => {
                                    let fresh = Expr::new(child.kind());
                                    stack.push((child, fresh.clone()));
                                    copy.append(&key, fresh);
                                }
                                other => copy.append(&key, other),
                            }
                        }
                    }
                    other => {
                        copy.0.borrow_mut().args.insert(key, other);
                    }
                }
            }
        }

        root
    }

    /// Depth-first rewrite. `f` is applied to every visited node; when it
    /// returns a different node, the result is wired into the parent slot
    /// and the replaced subtree is not descended into. The value `f` returns
    /// for the first visited node becomes the new root.
    ///
    /// With `copy` true the walk runs over a deep copy, leaving this tree
    /// untouched.
    #[must_use]
    pub fn transform(&self, mut f: impl FnMut(&Expr) -> Expr, copy: bool) -> Expr {
        let start = if copy { self.copy() } else { self.clone() };
        let mut root = start.clone();
        let mut first = true;
        let mut stack: Vec<Expr> = vec![start];

        while let Some(node) = stack.pop() {
            let parent = node.parent();
            let arg_key = node.arg_key();
            let index = node.index();

            let new_node = f(&node);

            if first {
                root = new_node.clone();
                first = false;
            } else if !Expr::ptr_eq(&new_node, &node) {
                if let (Some(parent), Some(key)) = (parent, arg_key) {
                    parent.set_at(&key, Value::Expr(new_node.clone()), index, true);
                }
            }

            if Expr::ptr_eq(&new_node, &node) {
                let mut children = node.children();
                children.reverse();
                stack.extend(children);
            }
        }

        root
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Collects validation messages without raising: one per missing
    /// required argument (absent, `Null`, or an empty list), plus an
    /// excess-arity message for non-variadic function kinds when
    /// `arg_count` positional arguments were supplied.
    #[must_use]
    pub fn error_messages(&self, arg_count: Option<usize>) -> Vec<String> {
        let mut errors = Vec::new();
        let kind = self.kind();
        let data = self.0.borrow();

        for key in kind.required_args {
            let missing = match data.args.get(*key) {
                None | Some(Value::Null) => true,
                Some(Value::List(items)) => items.is_empty(),
                Some(_) => false,
            };
            if missing {
                errors.push(format!(
                    "Required keyword: '{key}' missing for {}",
                    kind.name
                ));
            }
        }

        if let Some(count) = arg_count {
            if kind.is_func && !kind.variadic && count > kind.arg_keys.len() {
                errors.push(format!(
                    "The number of provided arguments ({count}) is greater than \
                     the maximum number of supported arguments ({})",
                    kind.arg_keys.len()
                ));
            }
        }

        errors
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Expr::ptr_eq(self, other)
            || (self.kind() == other.kind() && self.structural_hash() == other.structural_hash())
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.structural_hash().hash(state);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().name)?;
        let name = self.name();
        if name.is_empty() {
            Ok(())
        } else {
            write!(f, "({name})")
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.0.borrow();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", data.kind.name)?;
        map.serialize_entry("args", &data.args)?;
        if let Some(comments) = &data.comments {
            map.serialize_entry("comments", comments)?;
        }
        if let Some(meta) = &data.meta {
            map.serialize_entry("meta", meta)?;
        }
        if let Some(position) = &data.position {
            map.serialize_entry("position", position)?;
        }
        map.end()
    }
}

fn fold_key(h: u64, key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    h.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

fn fold_value(h: u64, key: &str, value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    h.hash(&mut hasher);
    key.hash(&mut hasher);
    match value {
        Value::Null | Value::List(_) => {}
        Value::Bool(b) => b.hash(&mut hasher),
        Value::Number(n) => n.to_bits().hash(&mut hasher),
        Value::String(s) => s.to_lowercase().hash(&mut hasher),
        Value::Expr(e) => {
            // Computed by the bottom-up fold before any parent reaches here.
            let child_hash = e.0.borrow().hash.unwrap_or_default();
            child_hash.hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Iterator produced by [`Expr::walk`] and friends.
pub struct Walk<'p> {
    pending: VecDeque<Expr>,
    bfs: bool,
    prune: Option<Box<dyn FnMut(&Expr) -> bool + 'p>>,
}

impl<'p> Walk<'p> {
    fn new(start: Expr, bfs: bool, prune: Option<Box<dyn FnMut(&Expr) -> bool + 'p>>) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(start);
        Walk { pending, bfs, prune }
    }
}

impl fmt::Debug for Walk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walk")
            .field("pending", &self.pending.len())
            .field("bfs", &self.bfs)
            .finish_non_exhaustive()
    }
}

impl Iterator for Walk<'_> {
    type Item = Expr;

    fn next(&mut self) -> Option<Expr> {
        let node = if self.bfs {
            self.pending.pop_front()
        } else {
            self.pending.pop_back()
        }?;

        let pruned = self.prune.as_mut().is_some_and(|p| p(&node));
        if !pruned {
            let mut children = node.children();
            if !self.bfs {
                children.reverse();
            }
            self.pending.extend(children);
        }

        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::kind::{
        ALIAS, ANONYMOUS_FUNC, COALESCE2, COLUMN, IDENTIFIER, LITERAL, SELECT, SUBQUERY, TABLE,
    };
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::build(
            &COLUMN,
            [(
                "this",
                Value::Expr(Expr::build(&IDENTIFIER, [("this", Value::from(name))])),
            )],
        )
    }

    fn select_of(columns: &[&str]) -> Expr {
        let select = Expr::new(&SELECT);
        for name in columns {
            select.append("expressions", column(name));
        }
        select
    }

    #[test]
    fn test_build_wires_parents() {
        let select = select_of(&["a", "b"]);
        let children = select.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].arg_key().as_deref(), Some("expressions"));
        assert_eq!(children[0].index(), Some(0));
        assert_eq!(children[1].index(), Some(1));
        assert!(Expr::ptr_eq(&children[0].parent().unwrap(), &select));
        assert!(Expr::ptr_eq(&children[0].root(), &select));
        assert_eq!(children[0].depth(), 1);
    }

    #[test]
    fn test_structural_eq_same_shape() {
        let a = select_of(&["x", "y"]);
        let b = select_of(&["x", "y"]);
        assert!(!Expr::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn test_structural_hash_strings_case_insensitive() {
        let a = column("FOO");
        let b = column("foo");
        assert_eq!(a.structural_hash(), b.structural_hash());
        assert_eq!(a, b);
    }

    #[test]
    fn test_false_flag_hashes_like_unset() {
        let plain = select_of(&["a"]);
        let flagged = select_of(&["a"]);
        flagged.set("distinct", false);
        assert_eq!(plain.structural_hash(), flagged.structural_hash());

        let truthy = select_of(&["a"]);
        truthy.set("distinct", true);
        assert_ne!(plain.structural_hash(), truthy.structural_hash());
    }

    #[test]
    fn test_mutation_invalidates_hash_to_root() {
        let select = select_of(&["a", "b"]);
        let before = select.structural_hash();

        let leaf = select.children()[0].children()[0].clone();
        leaf.set("this", "renamed");

        let after = select.structural_hash();
        assert_ne!(before, after);
    }

    #[test]
    fn test_set_null_removes_argument() {
        let node = column("a");
        node.set("table", "t");
        assert_eq!(node.text("table"), "t");
        node.set("table", Value::Null);
        assert!(node.arg("table").is_none());
    }

    #[test]
    fn test_set_at_delete_compacts_indices() {
        let select = select_of(&["a", "b", "c"]);
        let b = select.children()[1].clone();

        b.pop();

        let remaining = select.children();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].index(), Some(0));
        assert_eq!(remaining[1].index(), Some(1));
        assert!(b.parent().is_none());
        assert!(b.arg_key().is_none());
        assert!(b.index().is_none());
    }

    #[test]
    fn test_set_at_insert_without_overwrite() {
        let select = select_of(&["a", "c"]);
        select.set_at(
            "expressions",
            Value::Expr(column("b")),
            Some(1),
            false,
        );
        let names: Vec<String> = select
            .children()
            .iter()
            .map(|c| c.children()[0].name())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(select.children()[2].index(), Some(2));
    }

    #[test]
    fn test_replace_scalar() {
        let alias = Expr::build(
            &ALIAS,
            [
                ("this", Value::Expr(column("old"))),
                ("alias", Value::from("o")),
            ],
        );
        let old = alias.children()[0].clone();
        let new = column("new");

        let result = old.replace(Value::Expr(new.clone()));

        assert!(matches!(&result, Value::Expr(e) if Expr::ptr_eq(e, &new)));
        assert!(Expr::ptr_eq(&new.parent().unwrap(), &alias));
        assert_eq!(new.arg_key().as_deref(), Some("this"));
        assert!(old.parent().is_none());
    }

    #[test]
    fn test_replace_list_element_with_list_splices() {
        let select = select_of(&["a", "b", "d"]);
        let b = select.children()[1].clone();

        b.replace(Value::List(vec![
            Value::Expr(column("x")),
            Value::Expr(column("y")),
        ]));

        let names: Vec<String> = select
            .children()
            .iter()
            .map(|c| c.children()[0].name())
            .collect();
        assert_eq!(names, ["a", "x", "y", "d"]);
        let indices: Vec<Option<usize>> =
            select.children().iter().map(super::Expr::index).collect();
        assert_eq!(indices, [Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_replace_without_parent_is_noop() {
        let orphan = column("a");
        let replacement = column("b");
        let result = orphan.replace(Value::Expr(replacement.clone()));
        assert!(matches!(&result, Value::Expr(e) if Expr::ptr_eq(e, &replacement)));
        assert!(replacement.parent().is_none());
    }

    #[test]
    fn test_copy_is_deep_and_independent() {
        let select = select_of(&["a", "b"]);
        select.add_comments(&["keep me".to_string()], false);
        let original_hash = select.structural_hash();

        let copied = select.copy();
        assert!(!Expr::ptr_eq(&select, &copied));
        assert_eq!(select, copied);
        assert_eq!(copied.comments(), vec!["keep me".to_string()]);

        copied.children()[0].children()[0].set("this", "mutated");
        assert_ne!(select, copied);
        assert_eq!(select.structural_hash(), original_hash);
        assert_eq!(
            select.children()[0].children()[0].name(),
            "a",
            "original must not observe mutations of the copy"
        );
    }

    #[test]
    fn test_walk_orders() {
        let select = select_of(&["a", "b"]);
        let bfs_kinds: Vec<&str> = select.bfs().map(|n| n.kind().name).collect();
        assert_eq!(
            bfs_kinds,
            ["Select", "Column", "Column", "Identifier", "Identifier"]
        );

        let dfs_kinds: Vec<&str> = select.dfs().map(|n| n.kind().name).collect();
        assert_eq!(
            dfs_kinds,
            ["Select", "Column", "Identifier", "Column", "Identifier"]
        );
    }

    #[test]
    fn test_find_all_prune_skips_subquery_internals() {
        // SELECT outer FROM (SELECT inner FROM t) sub
        let inner_select = select_of(&["inner"]);
        let subquery = Expr::build(&SUBQUERY, [("this", Value::Expr(inner_select))]);
        let outer = select_of(&["outer"]);
        outer.set("from", subquery);

        let all: Vec<Expr> = outer.find_all(&[&COLUMN]).collect();
        assert_eq!(all.len(), 2);

        let pruned: Vec<Expr> = outer
            .find_all_pruned(&[&COLUMN], |n| n.kind() == &SUBQUERY)
            .collect();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].children()[0].name(), "outer");
    }

    #[test]
    fn test_find_ancestor() {
        let select = select_of(&["a"]);
        let leaf = select.children()[0].children()[0].clone();
        let found = leaf.find_ancestor(&[&SELECT]).unwrap();
        assert!(Expr::ptr_eq(&found, &select));
        assert!(leaf.find_ancestor(&[&TABLE]).is_none());
    }

    #[test]
    fn test_transform_rewrites_in_parent_slots() {
        let select = select_of(&["a", "b"]);
        let rewritten = select.transform(
            |node| {
                if node.kind() == &COLUMN {
                    Expr::build(
                        &LITERAL,
                        [("this", Value::from("1")), ("is_string", Value::from(false))],
                    )
                } else {
                    node.clone()
                }
            },
            true,
        );

        assert_eq!(rewritten.find_all(&[&COLUMN]).count(), 0);
        assert_eq!(rewritten.find_all(&[&LITERAL]).count(), 2);
        // Identifiers under the replaced columns must not have been visited.
        assert_eq!(rewritten.find_all(&[&IDENTIFIER]).count(), 0);
        // copy=true leaves the source intact
        assert_eq!(select.find_all(&[&COLUMN]).count(), 2);
    }

    #[test]
    fn test_transform_root_replacement() {
        let select = select_of(&["a"]);
        let table = Expr::new(&TABLE);
        let out = select.transform(|_| table.clone(), false);
        assert!(Expr::ptr_eq(&out, &table));
    }

    #[test]
    fn test_error_messages_missing_required() {
        let node = Expr::new(&IDENTIFIER);
        let errors = node.error_messages(None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Required keyword: 'this'"));
        assert!(errors[0].contains("Identifier"));
    }

    #[test]
    fn test_error_messages_excess_positional_args() {
        let call = Expr::build(&COALESCE2, [("this", Value::Expr(column("a")))]);
        assert!(call.error_messages(Some(2)).is_empty());
        let errors = call.error_messages(Some(3));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("(3)"));
        assert!(errors[0].contains("(2)"));
    }

    #[test]
    fn test_variadic_func_skips_arity_check() {
        let call = Expr::build(&ANONYMOUS_FUNC, [("this", Value::from("concat"))]);
        assert!(call.error_messages(Some(40)).is_empty());
    }

    #[test]
    fn test_meta_comments() {
        let node = column("a");
        node.add_comments(
            &[" leading ".to_string(), " sqlvine.meta flag, kind = dim ".to_string()],
            false,
        );
        assert_eq!(node.meta("flag"), Some(MetaValue::Bool(true)));
        assert_eq!(
            node.meta("kind"),
            Some(MetaValue::String("dim".to_string()))
        );
        assert_eq!(node.comments().len(), 2);

        let popped = node.pop_comments();
        assert_eq!(popped.len(), 2);
        assert!(node.comments().is_empty());
    }

    #[test]
    fn test_add_comments_prepend() {
        let node = column("a");
        node.add_comments(&["second".to_string()], false);
        node.add_comments(&["first".to_string()], true);
        assert_eq!(node.comments(), ["first", "second"]);
    }

    #[test]
    fn test_update_positions() {
        let a = column("a");
        a.update_positions(Position {
            line: 2,
            col: 9,
            start: 14,
            end: 14,
        });
        let b = column("b");
        b.update_positions_from(&a);
        assert_eq!(b.position(), a.position());
    }

    #[test]
    fn test_alias_or_name() {
        let aliased = Expr::build(
            &ALIAS,
            [
                ("this", Value::Expr(column("price"))),
                ("alias", Value::from("p")),
            ],
        );
        assert_eq!(aliased.alias_or_name(), "p");

        let ident = Expr::build(&IDENTIFIER, [("this", Value::from("price"))]);
        assert_eq!(ident.alias_or_name(), "price");
    }

    #[test]
    fn test_is_leaf() {
        let ident = Expr::build(&IDENTIFIER, [("this", Value::from("x"))]);
        assert!(ident.is_leaf());
        assert!(!column("x").is_leaf());
    }

    #[test]
    fn test_json_serialization_skips_parents() {
        let select = select_of(&["a"]);
        select.children()[0].add_comments(&["c".to_string()], false);
        let json = serde_json::to_value(&select).unwrap();
        assert_eq!(json["kind"], "Select");
        let col = &json["args"]["expressions"][0];
        assert_eq!(col["kind"], "Column");
        assert_eq!(col["comments"][0], "c");
        assert_eq!(col["args"]["this"]["args"]["this"], "a");
        assert!(col.get("parent").is_none());
    }

    #[test]
    fn test_deep_tree_operations_are_iterative() {
        let root = Expr::new(&kind::PAREN);
        let mut node = root.clone();
        for _ in 0..10_000 {
            let child = Expr::new(&kind::PAREN);
            node.set("this", child.clone());
            node = child;
        }
        node.set("this", Value::Expr(column("leaf")));

        assert_eq!(root.dfs().count(), 10_003);
        let h = root.structural_hash();
        let copied = root.copy();
        assert_eq!(copied.structural_hash(), h);
        assert_eq!(node.children()[0].depth(), 10_001);
    }
}
