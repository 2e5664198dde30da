//! Dependency-driven recomputation of everything the charts read.
//!
//! Inputs are set by the frontend; derived nodes are recomputed lazily the
//! first time they are read after one of their dependencies changed, and are
//! cached until then.
//!
//! ```text
//!   MetricsTable ─┐                  SelectedColumn ─┐
//!                 ├─► FilteredMetrics ───────────────┤
//!   TimeRange ────┤                  DisplayMode ────┼─► ProcessedSeries
//!                 ├─► FilteredIControl               │
//!   IControlTable ┘                  SmoothingWindow ┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::config::DashboardConfig;
use crate::data::filter::{filter_by_time, TimeRange};
use crate::data::kde::{KdeError, KdeSnapshotStore, KdeTrace};
use crate::data::loader::{self, LoadError};
use crate::data::model::Table;
use crate::data::series::{self, DisplayMode};

// ---------------------------------------------------------------------------
// Node declarations
// ---------------------------------------------------------------------------

/// Every named value in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    MetricsTable,
    IControlTable,
    TimeRange,
    SelectedColumn,
    DisplayMode,
    SmoothingWindow,
    FilteredMetrics,
    FilteredIControl,
    ProcessedSeries,
}

impl Node {
    pub const ALL: [Node; 9] = [
        Node::MetricsTable,
        Node::IControlTable,
        Node::TimeRange,
        Node::SelectedColumn,
        Node::DisplayMode,
        Node::SmoothingWindow,
        Node::FilteredMetrics,
        Node::FilteredIControl,
        Node::ProcessedSeries,
    ];

    /// Declared inputs of this node. Empty for leaf inputs.
    pub fn dependencies(self) -> &'static [Node] {
        match self {
            Node::FilteredMetrics => &[Node::MetricsTable, Node::TimeRange],
            Node::FilteredIControl => &[Node::IControlTable, Node::TimeRange],
            Node::ProcessedSeries => &[
                Node::FilteredMetrics,
                Node::SelectedColumn,
                Node::DisplayMode,
                Node::SmoothingWindow,
            ],
            _ => &[],
        }
    }

    pub fn is_input(self) -> bool {
        self.dependencies().is_empty()
    }
}

/// Kahn's algorithm over `nodes`. `None` if the declared edges form a cycle.
pub fn topological_order<N, F>(nodes: &[N], dependencies: F) -> Option<Vec<N>>
where
    N: Copy + Ord,
    F: Fn(N) -> Vec<N>,
{
    let mut pending: BTreeMap<N, usize> = nodes
        .iter()
        .map(|&n| (n, dependencies(n).len()))
        .collect();
    let mut ready: Vec<N> = pending
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = ready.pop() {
        order.push(node);
        for &other in nodes {
            if dependencies(other).contains(&node) {
                if let Some(count) = pending.get_mut(&other) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(other);
                    }
                }
            }
        }
    }

    (order.len() == pending.len()).then_some(order)
}

// ---------------------------------------------------------------------------
// Dirty-bit bookkeeping
// ---------------------------------------------------------------------------

/// Tracks which derived nodes are stale and how often each was recomputed.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    dependents: BTreeMap<Node, Vec<Node>>,
    dirty: BTreeSet<Node>,
    recomputations: BTreeMap<Node, usize>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        debug_assert!(
            topological_order(&Node::ALL, |n| n.dependencies().to_vec()).is_some(),
            "node dependencies contain a cycle"
        );

        let mut dependents: BTreeMap<Node, Vec<Node>> = BTreeMap::new();
        for node in Node::ALL {
            for &dep in node.dependencies() {
                dependents.entry(dep).or_default().push(node);
            }
        }

        // Derived nodes have never been computed.
        let dirty = Node::ALL.into_iter().filter(|n| !n.is_input()).collect();

        Self {
            dependents,
            dirty,
            recomputations: BTreeMap::new(),
        }
    }

    /// Mark everything downstream of `changed` as stale.
    pub fn invalidate(&mut self, changed: Node) {
        let mut stack = vec![changed];
        while let Some(node) = stack.pop() {
            for &dependent in self.dependents.get(&node).into_iter().flatten() {
                if self.dirty.insert(dependent) {
                    log::debug!("{changed:?} changed, {dependent:?} is stale");
                }
                stack.push(dependent);
            }
        }
    }

    pub fn is_dirty(&self, node: Node) -> bool {
        self.dirty.contains(&node)
    }

    /// Record that `node` was just recomputed from fresh dependencies.
    fn mark_clean(&mut self, node: Node) {
        self.dirty.remove(&node);
        *self.recomputations.entry(node).or_insert(0) += 1;
    }

    /// How many times `node` has been recomputed.
    pub fn recomputations(&self, node: Node) -> usize {
        self.recomputations.get(&node).copied().unwrap_or(0)
    }
}

/// Store `value` in `slot` and invalidate `node`'s dependents, unless it is
/// unchanged. Returns whether anything changed.
fn set_input<T: PartialEq>(
    deps: &mut DependencyGraph,
    node: Node,
    slot: &mut T,
    value: T,
) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    deps.invalidate(node);
    true
}

// ---------------------------------------------------------------------------
// Side-channel output of a metrics upload
// ---------------------------------------------------------------------------

/// What the controls need to know after a metrics table was replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsLoaded {
    /// Non-`Time` columns, header order.
    pub columns: Vec<String>,
    /// Observed `[min(Time), max(Time)]`, `None` if no row survived loading.
    pub time_bounds: Option<TimeRange>,
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Session graph
// ---------------------------------------------------------------------------

/// One dashboard session: all inputs, cached derived values and the KDE
/// snapshot store. Sessions share nothing.
#[derive(Debug, Clone)]
pub struct RecomputeGraph {
    metrics: Option<Table>,
    icontrol: Option<Table>,
    time_range: TimeRange,
    time_bounds: Option<TimeRange>,
    selected_column: Option<String>,
    display_mode: DisplayMode,
    smoothing_window: usize,

    filtered_metrics: Table,
    filtered_icontrol: Table,
    processed_series: Vec<f64>,

    kde: KdeSnapshotStore,
    deps: DependencyGraph,
}

impl Default for RecomputeGraph {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

/// Read-only view of fresh derived values, handed to the chart assembler.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    pub filtered_metrics: &'a Table,
    pub filtered_icontrol: &'a Table,
    pub processed_series: &'a [f64],
    pub selected_column: Option<&'a str>,
    pub display_mode: DisplayMode,
    pub time_range: TimeRange,
    pub kde: &'a KdeSnapshotStore,
}

impl RecomputeGraph {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            metrics: None,
            icontrol: None,
            time_range: TimeRange::default(),
            time_bounds: None,
            selected_column: None,
            display_mode: DisplayMode::default(),
            smoothing_window: config.default_smoothing_window.max(1),
            filtered_metrics: Table::default(),
            filtered_icontrol: Table::default(),
            processed_series: Vec::new(),
            kde: KdeSnapshotStore::new(config.kde_settings()),
            deps: DependencyGraph::new(),
        }
    }

    // -- Uploads --

    /// Parse and install a metrics upload. On error nothing changes.
    pub fn load_metrics(&mut self, bytes: &[u8]) -> Result<MetricsLoaded, LoadError> {
        let table = loader::load_metrics(bytes)?;
        Ok(self.set_metrics_table(table))
    }

    /// Parse and install an iControl upload. On error nothing changes.
    pub fn load_icontrol(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        let table = loader::load_icontrol(bytes)?;
        self.set_icontrol_table(table);
        Ok(())
    }

    /// Replace the metrics table, reset the time range to its full span and
    /// make sure the selected column still exists.
    pub fn set_metrics_table(&mut self, table: Table) -> MetricsLoaded {
        let loaded = MetricsLoaded {
            columns: table.column_names.clone(),
            time_bounds: TimeRange::spanning(&table),
            dropped_rows: table.dropped_rows,
        };
        log::info!(
            "Metrics table: {} row(s), columns {:?}, time span {:?}",
            table.len(),
            loaded.columns,
            loaded.time_bounds
        );

        self.metrics = Some(table);
        self.deps.invalidate(Node::MetricsTable);

        self.time_bounds = loaded.time_bounds;
        // A table with no rows falls back to the pre-upload window.
        let span = loaded.time_bounds.unwrap_or_default();
        set_input(&mut self.deps, Node::TimeRange, &mut self.time_range, span);

        let keep_selection = self
            .selected_column
            .as_ref()
            .is_some_and(|c| loaded.columns.contains(c));
        if !keep_selection {
            let first = loaded.columns.first().cloned();
            set_input(&mut self.deps, Node::SelectedColumn, &mut self.selected_column, first);
        }

        loaded
    }

    pub fn set_icontrol_table(&mut self, table: Table) {
        log::info!(
            "iControl table: {} row(s), columns {:?}",
            table.len(),
            table.column_names
        );
        self.icontrol = Some(table);
        self.deps.invalidate(Node::IControlTable);
    }

    // -- Control inputs --

    /// Set the time window. Clamped into the loaded data's span when known.
    pub fn set_time_range(&mut self, range: TimeRange) {
        let range = match self.time_bounds {
            Some(bounds) => range.clamp_to(bounds),
            None => range,
        };
        set_input(&mut self.deps, Node::TimeRange, &mut self.time_range, range);
    }

    pub fn set_selected_column(&mut self, column: Option<String>) {
        set_input(&mut self.deps, Node::SelectedColumn, &mut self.selected_column, column);
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        set_input(&mut self.deps, Node::DisplayMode, &mut self.display_mode, mode);
    }

    /// Set the smoothing window; values below 1 are raised to 1.
    pub fn set_smoothing_window(&mut self, window: usize) {
        set_input(
            &mut self.deps,
            Node::SmoothingWindow,
            &mut self.smoothing_window,
            window.max(1),
        );
    }

    // -- Input accessors --

    pub fn metrics_table(&self) -> Option<&Table> {
        self.metrics.as_ref()
    }

    pub fn icontrol_table(&self) -> Option<&Table> {
        self.icontrol.as_ref()
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Span of the loaded metrics data, if any.
    pub fn time_bounds(&self) -> Option<TimeRange> {
        self.time_bounds
    }

    /// Column choices for the selector.
    pub fn column_choices(&self) -> &[String] {
        self.metrics
            .as_ref()
            .map(|t| t.column_names.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_column(&self) -> Option<&str> {
        self.selected_column.as_deref()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    pub fn kde_store(&self) -> &KdeSnapshotStore {
        &self.kde
    }

    pub fn recomputations(&self, node: Node) -> usize {
        self.deps.recomputations(node)
    }

    // -- Derived reads --

    pub fn filtered_metrics(&mut self) -> &Table {
        self.ensure(Node::FilteredMetrics);
        &self.filtered_metrics
    }

    pub fn filtered_icontrol(&mut self) -> &Table {
        self.ensure(Node::FilteredIControl);
        &self.filtered_icontrol
    }

    pub fn processed_series(&mut self) -> &[f64] {
        self.ensure(Node::ProcessedSeries);
        &self.processed_series
    }

    /// Bring every derived node up to date and borrow the results.
    pub fn view(&mut self) -> GraphView<'_> {
        self.ensure(Node::FilteredMetrics);
        self.ensure(Node::FilteredIControl);
        self.ensure(Node::ProcessedSeries);
        GraphView {
            filtered_metrics: &self.filtered_metrics,
            filtered_icontrol: &self.filtered_icontrol,
            processed_series: &self.processed_series,
            selected_column: self.selected_column.as_deref(),
            display_mode: self.display_mode,
            time_range: self.time_range,
            kde: &self.kde,
        }
    }

    /// Recompute `node` if stale, after refreshing its derived dependencies.
    fn ensure(&mut self, node: Node) {
        for &dep in node.dependencies() {
            if !dep.is_input() {
                self.ensure(dep);
            }
        }
        if !self.deps.is_dirty(node) {
            return;
        }
        log::debug!("Recomputing {node:?}");
        match node {
            Node::FilteredMetrics => {
                self.filtered_metrics = filter_by_time(self.metrics.as_ref(), self.time_range);
            }
            Node::FilteredIControl => {
                self.filtered_icontrol = filter_by_time(self.icontrol.as_ref(), self.time_range);
            }
            Node::ProcessedSeries => {
                self.processed_series = match &self.selected_column {
                    Some(column) => series::process(
                        &self.filtered_metrics,
                        column,
                        self.display_mode,
                        self.smoothing_window,
                    ),
                    None => Vec::new(),
                };
            }
            input => {
                debug_assert!(input.is_input());
                return;
            }
        }
        self.deps.mark_clean(node);
    }

    // -- Events --

    /// Snapshot the density of the selected column over the current time
    /// window. On error the store is unchanged.
    pub fn request_kde_snapshot(&mut self) -> Result<&KdeTrace, KdeError> {
        let column = self
            .selected_column
            .clone()
            .ok_or(KdeError::NoColumnSelected)?;
        self.ensure(Node::FilteredMetrics);
        let values = self
            .filtered_metrics
            .column_or_nan(&column)
            .ok_or_else(|| KdeError::UnknownColumn(column.clone()))?;

        match self.kde.snapshot(&values, &column, self.time_range) {
            Ok(trace) => Ok(trace),
            Err(e) => {
                log::warn!("KDE snapshot for '{column}' skipped: {e}");
                Err(e)
            }
        }
    }
}
