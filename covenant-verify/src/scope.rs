#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::types::SmtType;

/// Naming convention for the companion length symbol of array `name`.
pub fn length_symbol(name: &str) -> String {
    format!("{name}$length")
}

#[derive(Clone, Debug)]
pub struct Binding<T> {
    pub term: T,
    pub ty: SmtType,
    /// Type name as written by the caller, kept for counterexample reports.
    pub type_name: String,
}

/// Name -> binding table with a stack of full snapshots for quantifier scopes.
#[derive(Clone, Debug)]
pub struct SymbolTable<T> {
    current: HashMap<String, Binding<T>>,
    saved: Vec<HashMap<String, Binding<T>>>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            current: HashMap::new(),
            saved: Vec::new(),
        }
    }
}

impl<T: Clone> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding<T>> {
        self.current.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.current.contains_key(name)
    }

    /// Bind `name`, shadowing any binding from an enclosing scope.
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding<T>) -> Option<Binding<T>> {
        self.current.insert(name.into(), binding)
    }

    /// Bind a free symbol in the current scope and in every saved one, so the
    /// binding survives `pop_scope`. Used for symbols that are declared lazily
    /// while a quantifier scope is open.
    pub fn insert_global(&mut self, name: impl Into<String>, binding: Binding<T>) {
        let name = name.into();
        for scope in &mut self.saved {
            scope.insert(name.clone(), binding.clone());
        }
        self.current.insert(name, binding);
    }

    /// Snapshot the current bindings; `pop_scope` restores them exactly.
    pub fn push_scope(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Returns `false` when there was no scope to pop.
    pub fn pop_scope(&mut self) -> bool {
        match self.saved.pop() {
            Some(prev) => {
                self.current = prev;
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// All visible names, sorted for deterministic reports.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.current.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Binding<T>)> {
        self.current.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BvInfo;

    fn bv(term: u32) -> Binding<u32> {
        Binding {
            term,
            ty: SmtType::BitVec(BvInfo::I32),
            type_name: "i32".to_string(),
        }
    }

    #[test]
    fn inner_scope_shadows_and_pop_restores_outer() {
        let mut table = SymbolTable::new();
        table.insert("x", bv(1));

        table.push_scope();
        table.insert("x", bv(2));
        table.insert("y", bv(3));
        assert_eq!(table.get("x").map(|b| b.term), Some(2));
        assert_eq!(table.depth(), 1);

        assert!(table.pop_scope());
        assert_eq!(table.get("x").map(|b| b.term), Some(1));
        assert!(!table.contains("y"));
        assert_eq!(table.depth(), 0);
    }

    #[test]
    fn global_binding_survives_every_pop() {
        let mut table = SymbolTable::new();
        table.insert("x", bv(1));
        table.push_scope();
        table.insert("i", bv(2));
        table.push_scope();

        table.insert_global("xs", bv(3));
        assert!(table.pop_scope());
        assert_eq!(table.get("xs").map(|b| b.term), Some(3));
        assert!(table.contains("i"));
        assert!(table.pop_scope());
        assert_eq!(table.get("xs").map(|b| b.term), Some(3));
        assert!(!table.contains("i"));
        assert_eq!(table.names(), vec!["x", "xs"]);
    }

    #[test]
    fn pop_without_push_is_reported() {
        let mut table: SymbolTable<u32> = SymbolTable::new();
        assert!(!table.pop_scope());
    }

    #[test]
    fn names_are_sorted() {
        let mut table = SymbolTable::new();
        table.insert("b", bv(1));
        table.insert("a", bv(2));
        table.insert(length_symbol("xs"), bv(3));
        assert_eq!(table.names(), vec!["a", "b", "xs$length"]);
    }
}
