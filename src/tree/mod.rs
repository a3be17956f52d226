//! The data tree: the in-memory structure read into and written from by the
//! recipe interpreter.
//!
//! A [`Node`] is one nested scope (the top-level section, or a named
//! sub-section opened by a recipe `(name) ... (/name)` block). Each node owns
//! a flat map from variable name to [`Value`] and a weak back-reference to
//! its parent, so that a name not found locally can be resolved by climbing
//! outward without copying the parent's data. This mirrors the source
//! recipe interpreter's convention of storing the enclosing scope under a
//! reserved `__up` key inside the same map; representing it instead as a
//! dedicated `parent` field sidesteps having to make [`Value`] itself
//! cyclic-safe, while preserving the same externally observable semantics:
//! constant-time outward lookup that never copies the parent scope.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// A value held by the data tree.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// An ordered sequence of primitives (a LIST/TAB1 body column, NBT/INT
    /// pairs, and the like).
    Seq(Vec<Value>),
    /// An indexed variable: `name[i,j,...]` in recipe syntax, keyed by its
    /// resolved integer index tuple.
    Table(BTreeMap<Vec<i64>, Value>),
    /// A nested named scope, e.g. the sub-section opened by `(leg_int)`.
    Tree(Rc<RefCell<Node>>),
}

impl Value {
    /// View this value as a single number (int widened to float), if it is
    /// one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// View this value as an integer, if it is a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// View this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One scope in the data tree.
#[derive(Debug, Default)]
pub struct Node {
    vars: BTreeMap<String, Value>,
    parent: Option<Weak<RefCell<Node>>>,
}

impl Node {
    /// Create a fresh, parentless node (a new section's root scope).
    pub fn new_root() -> Rc<RefCell<Node>> {
        Rc::new(RefCell::new(Node {
            vars: BTreeMap::new(),
            parent: None,
        }))
    }

    /// Open a child scope under `parent`, e.g. entering a recipe section.
    pub fn new_child(parent: &Rc<RefCell<Node>>) -> Rc<RefCell<Node>> {
        Rc::new(RefCell::new(Node {
            vars: BTreeMap::new(),
            parent: Some(Rc::downgrade(parent)),
        }))
    }

    /// Bind `name` to `value` in this node's local scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Look up `name`, climbing outward through parent scopes if not found
    /// locally. Returns a clone since the match may live several scopes up.
    pub fn get(this: &Rc<RefCell<Node>>, name: &str) -> Option<Value> {
        let node = this.borrow();
        if let Some(value) = node.vars.get(name) {
            return Some(value.clone());
        }
        let parent = node.parent.clone();
        drop(node);
        match parent.and_then(|p| p.upgrade()) {
            Some(parent) => Node::get(&parent, name),
            None => None,
        }
    }

    /// Bind an indexed slot `name[indices]`, creating the backing
    /// [`Value::Table`] on first use.
    pub fn set_indexed(&mut self, name: &str, indices: Vec<i64>, value: Value) {
        match self.vars.get_mut(name) {
            Some(Value::Table(table)) => {
                table.insert(indices, value);
            }
            _ => {
                let mut table = BTreeMap::new();
                table.insert(indices, value);
                self.vars.insert(name.to_string(), Value::Table(table));
            }
        }
    }

    /// Look up an indexed slot, climbing outward like [`Node::get`].
    pub fn get_indexed(this: &Rc<RefCell<Node>>, name: &str, indices: &[i64]) -> Option<Value> {
        let node = this.borrow();
        if let Some(Value::Table(table)) = node.vars.get(name) {
            if let Some(value) = table.get(indices) {
                return Some(value.clone());
            }
        }
        let parent = node.parent.clone();
        drop(node);
        match parent.and_then(|p| p.upgrade()) {
            Some(parent) => Node::get_indexed(&parent, name, indices),
            None => None,
        }
    }

    /// Whether `name` is bound anywhere from this scope outward.
    pub fn contains(this: &Rc<RefCell<Node>>, name: &str) -> bool {
        Node::get(this, name).is_some()
    }

    /// Direct access to this scope's local variables (not climbing parents).
    pub fn local_vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    /// Snapshot this scope's local variables, for restoring after a
    /// speculative lookahead read.
    pub fn snapshot_vars(&self) -> BTreeMap<String, Value> {
        self.vars.clone()
    }

    /// Restore a previously snapshotted local variable map, discarding any
    /// bindings made since the snapshot was taken.
    pub fn restore_vars(&mut self, vars: BTreeMap<String, Value>) {
        self.vars = vars;
    }

    /// Deep-clone this node and every descendant [`Value::Tree`], rewiring
    /// parent links in the clone so it is fully isolated from the original.
    /// Used by the flow-control executor to snapshot parser state before a
    /// speculative lookahead read.
    pub fn deep_clone(this: &Rc<RefCell<Node>>) -> Rc<RefCell<Node>> {
        Self::deep_clone_with_parent(this, None)
    }

    fn deep_clone_with_parent(
        this: &Rc<RefCell<Node>>,
        parent: Option<Weak<RefCell<Node>>>,
    ) -> Rc<RefCell<Node>> {
        let node = this.borrow();
        let cloned = Rc::new(RefCell::new(Node {
            vars: BTreeMap::new(),
            parent,
        }));
        let mut vars = BTreeMap::new();
        for (key, value) in node.vars.iter() {
            let cloned_value = match value {
                Value::Tree(child) => {
                    Value::Tree(Node::deep_clone_with_parent(child, Some(Rc::downgrade(&cloned))))
                }
                other => other.clone(),
            };
            vars.insert(key.clone(), cloned_value);
        }
        cloned.borrow_mut().vars = vars;
        cloned
    }
}

/// Flat mapping from loop-variable name to its currently bound integer
/// value, shared across nested loops and flow-control constructs within one
/// section's execution. The reserved name `__ofs` tracks the current read
/// cursor offset and is managed by the flow-control executor rather than by
/// recipe `for` loops.
#[derive(Clone, Debug, Default)]
pub struct LoopVars {
    vars: BTreeMap<String, i64>,
}

impl LoopVars {
    pub fn new() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("__ofs".to_string(), 0);
        LoopVars { vars }
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.vars.get(name).copied()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: i64) {
        self.vars.insert(name.into(), value);
    }

    pub fn unbind(&mut self, name: &str) {
        self.vars.remove(name);
    }

    pub fn ofs(&self) -> usize {
        self.vars.get("__ofs").copied().unwrap_or(0) as usize
    }

    pub fn set_ofs(&mut self, ofs: usize) {
        self.vars.insert("__ofs".to_string(), ofs as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climbs_to_parent_scope() {
        let root = Node::new_root();
        root.borrow_mut().set("MAT", Value::Int(125));
        let child = Node::new_child(&root);
        child.borrow_mut().set("LOCAL", Value::Int(1));
        assert_eq!(Node::get(&child, "MAT").unwrap().as_i64(), Some(125));
        assert_eq!(Node::get(&child, "LOCAL").unwrap().as_i64(), Some(1));
        assert!(Node::get(&child, "MISSING").is_none());
    }

    #[test]
    fn indexed_variables_round_trip() {
        let root = Node::new_root();
        root.borrow_mut()
            .set_indexed("E", vec![1], Value::Float(1.5));
        root.borrow_mut()
            .set_indexed("E", vec![2], Value::Float(2.5));
        assert_eq!(Node::get_indexed(&root, "E", &[1]).unwrap().as_f64(), Some(1.5));
        assert_eq!(Node::get_indexed(&root, "E", &[2]).unwrap().as_f64(), Some(2.5));
        assert!(Node::get_indexed(&root, "E", &[3]).is_none());
    }

    #[test]
    fn deep_clone_is_isolated() {
        let root = Node::new_root();
        root.borrow_mut().set("MAT", Value::Int(125));
        let child = Node::new_child(&root);
        root.borrow_mut().set("SUB", Value::Tree(child.clone()));
        child.borrow_mut().set("X", Value::Int(1));

        let cloned_root = Node::deep_clone(&root);
        if let Some(Value::Tree(cloned_child)) = cloned_root.borrow().local_vars().get("SUB") {
            cloned_child.borrow_mut().set("X", Value::Int(2));
        }
        // original untouched by mutation through the clone
        assert_eq!(Node::get(&child, "X").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn loop_vars_track_ofs() {
        let mut lv = LoopVars::new();
        assert_eq!(lv.ofs(), 0);
        lv.set_ofs(5);
        assert_eq!(lv.ofs(), 5);
        lv.bind("i", 3);
        assert_eq!(lv.get("i"), Some(3));
        lv.unbind("i");
        assert_eq!(lv.get("i"), None);
    }
}
