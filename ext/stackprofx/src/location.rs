use std::fmt;
use std::sync::Arc;

/// The lexical scope a piece of code belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A named scope with its fully qualified label, e.g. `Foo#bar`, `Foo.baz` or `<main>`.
    Named(String),
    /// An anonymous block nested directly inside `parent`.
    Block(Arc<Scope>),
}

impl Scope {
    pub fn named(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Scope::Named(label.into()))
    }

    pub fn block_in(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Scope::Block(Arc::clone(parent)))
    }

    /// Returns the nearest named scope and how many anonymous blocks lie between it and `self`.
    fn enclosing(&self) -> (&str, usize) {
        let mut depth = 0;
        let mut scope = self;
        loop {
            match scope {
                Scope::Named(label) => return (label, depth),
                Scope::Block(parent) => {
                    depth += 1;
                    scope = &**parent;
                }
            }
        }
    }

    /// The display label: `block in X` for a single level, `block (N levels) in X` deeper.
    pub fn label(&self) -> String {
        match self.enclosing() {
            (label, 0) => label.to_owned(),
            (label, 1) => format!("block in {}", label),
            (label, depth) => format!("block ({} levels) in {}", depth, label),
        }
    }
}

/// A place in source where execution can pause.
///
/// Two locations are the same frame iff scope, file and first line all match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeLocation {
    scope: Arc<Scope>,
    file: Arc<str>,
    first_line: u32,
}

impl CodeLocation {
    pub fn new(scope: Arc<Scope>, file: impl Into<Arc<str>>, first_line: u32) -> Self {
        CodeLocation {
            scope,
            file: file.into(),
            first_line,
        }
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn name(&self) -> String {
        self.scope.label()
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn first_line(&self) -> u32 {
        self.first_line
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name(), self.file, self.first_line)
    }
}
