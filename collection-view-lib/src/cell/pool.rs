//! Cell pooling keyed by template name

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use super::Cell;
use super::CellContext;
use super::CellId;
use crate::model::IndexPath;
use crate::model::RowKey;
use crate::model::Value;
use crate::template::FetchResult;
use crate::template::PendingFetch;

/// A fetch a cell is waiting on.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    pub cell: CellId,
    pub fetch: PendingFetch,
}

/// Owns every cell of a view and recycles them by reuse identifier.
///
/// Cells are iterated in creation order, which is the order global parameter
/// changes fan out in.
pub struct CellPool {
    context: Arc<CellContext>,
    next_id: u64,
    cells: BTreeMap<CellId, Cell>,
    reusable: HashMap<String, Vec<CellId>>,
    queued: HashSet<CellId>,
    loads: Vec<PendingLoad>,
}

impl CellPool {
    pub fn new(context: Arc<CellContext>) -> Self {
        Self {
            context,
            next_id: 0,
            cells: BTreeMap::new(),
            reusable: HashMap::new(),
            queued: HashSet::new(),
            loads: Vec::new(),
        }
    }

    pub fn context(&self) -> &Arc<CellContext> {
        &self.context
    }

    /// Returns a queued cell for `reuse_identifier`, or a new one.
    pub fn dequeue(&mut self, reuse_identifier: &str) -> CellId {
        if let Some(id) = self.reusable.get_mut(reuse_identifier).and_then(Vec::pop) {
            self.queued.remove(&id);
            debug!("Reusing cell {} for '{}'", id, reuse_identifier);
            return id;
        }

        self.next_id += 1;
        let id = CellId(self.next_id);
        self.cells.insert(id, Cell::new(id, Arc::clone(&self.context)));
        id
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    /// Assigns a template to a cell, remembering the fetch if one is needed.
    pub fn assign_template(&mut self, id: CellId, name: &str, animated: bool) {
        let Some(cell) = self.cells.get_mut(&id) else {
            return;
        };
        if let Some(fetch) = cell.assign_template(name, animated) {
            self.loads.push(PendingLoad { cell: id, fetch });
        }
    }

    /// Takes every fetch cells are waiting on.
    pub fn take_loads(&mut self) -> Vec<PendingLoad> {
        std::mem::take(&mut self.loads)
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.loads.is_empty()
    }

    /// Hands a settled fetch to the cell that waited for it.
    pub fn deliver(&mut self, id: CellId, name: &str, result: FetchResult, animated: bool) {
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.deliver(name, result, animated);
        }
    }

    /// Puts a cell in the reuse queue of its current template.
    pub fn recycle(&mut self, id: CellId) {
        let Some(cell) = self.cells.get_mut(&id) else {
            return;
        };
        cell.prepare_for_reuse();
        if self.queued.insert(id) {
            let reuse_identifier = cell.template_name().unwrap_or_default().to_string();
            self.reusable.entry(reuse_identifier).or_default().push(id);
        }
    }

    /// Destroys a cell and forgets it.
    pub fn discard(&mut self, id: CellId) {
        if let Some(mut cell) = self.cells.remove(&id) {
            cell.destroy();
        }
        if self.queued.remove(&id) {
            for queue in self.reusable.values_mut() {
                queue.retain(|queued| *queued != id);
            }
        }
        self.loads.retain(|load| load.cell != id);
    }

    /// Destroys every cell.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.destroy();
        }
        self.cells.clear();
        self.reusable.clear();
        self.queued.clear();
        self.loads.clear();
    }

    pub fn is_queued(&self, id: CellId) -> bool {
        self.queued.contains(&id)
    }

    /// Cells that are retained and not waiting for reuse, in creation order.
    pub fn visible(&self) -> Vec<CellId> {
        self.cells
            .values()
            .filter(|cell| cell.is_retained() && !self.is_queued(cell.id()))
            .map(Cell::id)
            .collect()
    }

    /// Cells that are bound to an item and not waiting for reuse.
    pub fn bound(&self) -> Vec<CellId> {
        self.bound_cells().map(Cell::id).collect()
    }

    pub fn cell_at(&self, index_path: IndexPath) -> Option<CellId> {
        self.bound_cells()
            .find(|cell| cell.index_path() == Some(index_path))
            .map(Cell::id)
    }

    pub fn cell_for_key(&self, key: &RowKey) -> Option<CellId> {
        self.bound_cells().find(|cell| cell.key() == Some(key)).map(Cell::id)
    }

    fn bound_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells
            .values()
            .filter(|cell| cell.key().is_some() && !self.is_queued(cell.id()))
    }

    /// Pushes a global parameter to every visible cell.
    pub fn broadcast_global(&mut self, name: &str, value: &Value) {
        for id in self.visible() {
            if let Some(cell) = self.cells.get_mut(&id) {
                cell.set_global(name, value.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl std::fmt::Debug for CellPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellPool")
            .field("cells", &self.cells.len())
            .field("reusable", &self.reusable)
            .field("loads", &self.loads.len())
            .finish()
    }
}

