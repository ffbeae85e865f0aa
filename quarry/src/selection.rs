//! Reference-counted mod selection.
//!
//! Every mod carries an explicit flag and a count of selected mods whose
//! latest version depends on it. A mod is selected while either is set, and
//! base mods are selected unconditionally. Toggling a mod propagates along
//! dependency edges before [`SelectionEngine::toggle`] returns.

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use quarry_lib::Identifier;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub explicit: bool,
    pub auto_refs: u32,
    pub base: bool,
}

impl SelectionState {
    pub fn is_selected(&self) -> bool {
        self.explicit || self.auto_refs > 0 || self.base
    }
}

/// Why a mod is currently selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionReason {
    Base,
    Explicit,
    Required,
}

/// Why a mod changed state during a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ChangeReason {
    Requested,
    Required { by: Identifier },
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChange {
    pub id: Identifier,
    pub selected: bool,
    pub reason: ChangeReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub id: Identifier,
    /// Effective state of the toggled mod afterwards
    pub selected: bool,
    /// A base mod ignored the request
    pub pinned: bool,
    /// Deselect was requested but other selected mods still need this one
    pub still_required: bool,
    /// Every mod whose effective state flipped, in propagation order
    pub changes: Vec<SelectionChange>,
}

#[derive(Debug)]
struct Node {
    id: Identifier,
    deps: Vec<usize>,
    state: SelectionState,
}

pub struct SelectionEngine {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl SelectionEngine {
    /// Snapshot the dependency graph of `catalog` and pin its base mods.
    pub fn new(catalog: &Catalog) -> Self {
        let index: HashMap<String, usize> = catalog
            .mods()
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.key(), i))
            .collect();

        let nodes: Vec<Node> = catalog
            .mods()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mut deps = Vec::new();
                for dep in m.latest_version().map(|v| v.dependencies.as_slice()).unwrap_or_default() {
                    match index.get(&dep.key()) {
                        Some(&d) if d != i && !deps.contains(&d) => deps.push(d),
                        Some(_) => {}
                        None => log::debug!("{} depends on unknown mod {}, ignoring", m.id, dep),
                    }
                }
                Node {
                    id: m.id.without_version(),
                    deps,
                    state: SelectionState {
                        base: m.is_base(),
                        explicit: m.is_base(),
                        auto_refs: 0,
                    },
                }
            })
            .collect();

        let bases: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].state.base).collect();
        let mut engine = Self { nodes, index };
        let mut ignored = Vec::new();
        for base in bases {
            engine.acquire_dependencies(base, &mut ignored);
        }
        engine
    }

    fn lookup(&self, id: &Identifier) -> Result<usize> {
        self.index
            .get(&id.key())
            .copied()
            .ok_or_else(|| CatalogError::UnknownMod(id.clone()))
    }

    /// Request `id` to be selected or deselected.
    pub fn toggle(&mut self, id: &Identifier, desired: bool) -> Result<ToggleOutcome> {
        let target = self.lookup(id)?;
        let node_id = self.nodes[target].id.clone();

        if self.nodes[target].state.base {
            log::debug!("{} is a base mod and stays selected", node_id);
            return Ok(ToggleOutcome {
                id: node_id,
                selected: true,
                pinned: !desired,
                still_required: false,
                changes: Vec::new(),
            });
        }

        let was = self.nodes[target].state.is_selected();
        self.nodes[target].state.explicit = desired;
        let now = self.nodes[target].state.is_selected();

        let mut changes = Vec::new();
        if !was && now {
            changes.push(SelectionChange {
                id: node_id.clone(),
                selected: true,
                reason: ChangeReason::Requested,
            });
            self.acquire_dependencies(target, &mut changes);
        } else if was && !now {
            changes.push(SelectionChange {
                id: node_id.clone(),
                selected: false,
                reason: ChangeReason::Requested,
            });
            self.release_dependencies(target, &mut changes);
        }

        if !desired {
            self.release_orphans(&mut changes);
        }

        let selected = self.nodes[target].state.is_selected();
        if !changes.is_empty() {
            log::debug!("Toggling {} changed {} mod(s)", node_id, changes.len());
        }

        Ok(ToggleOutcome {
            id: node_id,
            selected,
            pinned: false,
            still_required: !desired && selected,
            changes,
        })
    }

    /// `start` just became selected: every dependency gains a reference.
    fn acquire_dependencies(&mut self, start: usize, changes: &mut Vec<SelectionChange>) {
        let mut work = vec![start];
        while let Some(n) = work.pop() {
            for d in self.nodes[n].deps.clone() {
                let state = &mut self.nodes[d].state;
                let was = state.is_selected();
                state.auto_refs += 1;
                if !was {
                    changes.push(SelectionChange {
                        id: self.nodes[d].id.clone(),
                        selected: true,
                        reason: ChangeReason::Required {
                            by: self.nodes[n].id.clone(),
                        },
                    });
                    work.push(d);
                }
            }
        }
    }

    /// `start` just became unselected: every dependency loses a reference.
    fn release_dependencies(&mut self, start: usize, changes: &mut Vec<SelectionChange>) {
        let mut work = vec![start];
        while let Some(n) = work.pop() {
            for d in self.nodes[n].deps.clone() {
                let state = &mut self.nodes[d].state;
                let was = state.is_selected();
                state.auto_refs = state.auto_refs.saturating_sub(1);
                if was && !state.is_selected() {
                    changes.push(SelectionChange {
                        id: self.nodes[d].id.clone(),
                        selected: false,
                        reason: ChangeReason::Released,
                    });
                    work.push(d);
                }
            }
        }
    }

    /// Release selected mods held only by each other (dependency cycles with
    /// no explicit or base mod reaching them).
    fn release_orphans(&mut self, changes: &mut Vec<SelectionChange>) {
        let mut reachable = vec![false; self.nodes.len()];
        let mut work: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].state.explicit || self.nodes[i].state.base)
            .collect();
        while let Some(n) = work.pop() {
            if std::mem::replace(&mut reachable[n], true) {
                continue;
            }
            work.extend(self.nodes[n].deps.iter().copied().filter(|&d| !reachable[d]));
        }

        let orphans: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| !reachable[i] && self.nodes[i].state.is_selected())
            .collect();
        if orphans.is_empty() {
            return;
        }

        for &o in &orphans {
            for d in self.nodes[o].deps.clone() {
                let state = &mut self.nodes[d].state;
                state.auto_refs = state.auto_refs.saturating_sub(1);
            }
        }
        for &o in &orphans {
            log::debug!("Releasing {}, only held by a dependency cycle", self.nodes[o].id);
            changes.push(SelectionChange {
                id: self.nodes[o].id.clone(),
                selected: false,
                reason: ChangeReason::Released,
            });
        }
    }

    pub fn state(&self, id: &Identifier) -> Option<SelectionState> {
        self.index.get(&id.key()).map(|&i| self.nodes[i].state)
    }

    pub fn reason(&self, id: &Identifier) -> Option<SelectionReason> {
        let state = self.state(id)?;
        if state.base {
            Some(SelectionReason::Base)
        } else if state.explicit {
            Some(SelectionReason::Explicit)
        } else if state.auto_refs > 0 {
            Some(SelectionReason::Required)
        } else {
            None
        }
    }

    /// Selected mods in catalog order.
    pub fn selected(&self) -> Vec<&Identifier> {
        self.nodes
            .iter()
            .filter(|n| n.state.is_selected())
            .map(|n| &n.id)
            .collect()
    }

    /// Selected mods whose latest version depends on `id`.
    pub fn required_by(&self, id: &Identifier) -> Vec<&Identifier> {
        let Some(&target) = self.index.get(&id.key()) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .filter(|n| n.state.is_selected() && n.deps.contains(&target))
            .map(|n| &n.id)
            .collect()
    }
}
