//! Graph view: pure projection plus the stateful pieces around it.

pub mod annotate;
pub mod layout;
pub mod link_mode;
pub mod projection;
pub mod reconcile;

pub use annotate::{Annotator, NodeFlags, SearchQuery, ViewState};
pub use layout::{LayoutSpacing, auto_layout};
pub use link_mode::LinkMode;
pub use projection::{NodeData, VisualEdge, VisualGraph, VisualNode, project};
pub use reconcile::{GraphReconciler, ReconcileKind, Reconciled};
