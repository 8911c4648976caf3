//! Pipeline state.
//!
//! Every table the rewrite rules consult lives in one [`EngineState`] value
//! threaded through the pipeline; there are no ambient globals. Symbols,
//! macros and aliases persist for the remainder of the stream once defined;
//! capture and conditional frames only until their closing directive.

use crate::cond::CondStack;
use crate::macros::{Capture, MacroDef};
use std::collections::{HashMap, HashSet};

/// A set that remembers insertion order, so epilogue output is stable.
#[derive(Debug, Default)]
pub struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    pub fn insert(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.items.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Constants pending emission for `ldr Rd, =expr` loads.
///
/// One label per distinct expression between resets; `.ltorg` and the end
/// of the stream reset the pool. The label counter is never reset, so
/// labels stay unique across pool epochs.
#[derive(Debug, Default)]
pub struct LiteralPool {
    labels: HashMap<String, String>,
    order: Vec<String>,
    counter: u32,
}

impl LiteralPool {
    /// Label for `expr`, allocating `Literal_<n>` on first sight.
    pub fn label_for(&mut self, expr: &str) -> String {
        if let Some(label) = self.labels.get(expr) {
            return label.clone();
        }
        let label = format!("Literal_{}", self.counter);
        self.counter += 1;
        self.labels.insert(expr.to_string(), label.clone());
        self.order.push(expr.to_string());
        label
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drain pending entries in allocation order as `(label, expr)` pairs.
    pub fn drain(&mut self) -> Vec<(String, String)> {
        let entries = self
            .order
            .drain(..)
            .map(|expr| {
                let label = self.labels[&expr].clone();
                (label, expr)
            })
            .collect();
        self.labels.clear();
        entries
    }
}

/// Per numeric label: the synthesized name of the last definition (backward
/// target) and the synthesized name pending for forward references.
#[derive(Debug, Default)]
pub struct LocalLabelState {
    pub last: Option<String>,
    pub pending_forward: Option<String>,
}

/// NEON register alias declared with `.dn`/`.qn`.
#[derive(Debug, Clone)]
pub struct NeonAlias {
    pub name: String,
    pub register: String,
    pub datatype: Option<String>,
}

/// All mutable translation state for one stream.
#[derive(Debug, Default)]
pub struct EngineState {
    /// `.set`/`.equ` symbol values
    pub symbols: HashMap<String, i64>,
    /// `.macro` definitions
    pub macros: HashMap<String, MacroDef>,
    /// Seeds `\@`; bumped once per macro invocation
    pub macro_counter: u32,
    /// `.altmacro` substitution mode
    pub altmacro: bool,
    /// Conditional-assembly frames
    pub cond: CondStack,
    /// In-progress `.macro`/`.rept`/`.irp` capture
    pub capture: Option<Capture>,
    /// Active section directives; `.previous` pops and re-emits
    pub sections: Vec<String>,
    /// Thumb encoding mode
    pub thumb: bool,
    pub literals: LiteralPool,
    /// Local numeric label bookkeeping, by label text
    pub local_labels: HashMap<String, LocalLabelState>,
    pub temp_label_counter: u32,
    /// `.req` aliases, resolved transitively on use
    pub req_aliases: HashMap<String, String>,
    /// `.dn`/`.qn` aliases, in declaration order
    pub neon_aliases: Vec<NeonAlias>,
    /// Labels defined while in thumb mode
    pub thumb_labels: HashSet<String>,
    /// Branch/call destinations not (yet) defined locally
    pub call_targets: OrderedSet,
    /// Data symbols referenced via `ldr =sym` / `adrp`
    pub import_symbols: OrderedSet,
    /// Labels emitted so far; armasm must not IMPORT these
    pub labels_seen: HashSet<String>,
    /// Stashed `movw #:lower16:` half of a `mov32` pair, as (register, symbol)
    pub pending_mov32: Option<(String, String)>,
}

impl EngineState {
    pub fn new() -> Self {
        EngineState::default()
    }

    /// Fresh synthesized name for a local numeric label site.
    pub fn next_temp_label(&mut self) -> String {
        let label = format!("temp_label_{}", self.temp_label_counter);
        self.temp_label_counter += 1;
        label
    }

    /// Per-invocation value for `\@`.
    pub fn next_macro_invocation(&mut self) -> u32 {
        let count = self.macro_counter;
        self.macro_counter += 1;
        count
    }
}
