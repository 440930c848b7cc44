use std::sync::Arc;

use super::ModSrcId;

// -------------------------------------------------------------------------------------------------

/// Receives notifications about [`ModMatrix`](crate::ModMatrix) topology changes, e.g. to
/// refresh UI components which visualize routings.
///
/// Listeners are called synchronously, in the thread which mutated the matrix. They can not
/// access the matrix from within the callback: the matrix is mutably borrowed while notifying.
pub trait ModMatrixListener: Send + Sync {
    /// Routings got added, removed or modified.
    fn mod_matrix_changed(&self) {}

    /// The learn source got enabled (`Some`) or disabled (`None`).
    fn learn_source_changed(&self, _source: Option<ModSrcId>) {}
}

// -------------------------------------------------------------------------------------------------

/// Registered listeners of a matrix.
#[derive(Default, Clone)]
pub(crate) struct ListenerList {
    listeners: Vec<Arc<dyn ModMatrixListener>>,
}

impl ListenerList {
    pub fn add(&mut self, listener: Arc<dyn ModMatrixListener>) {
        if !self.contains(&listener) {
            self.listeners.push(listener);
        }
    }

    pub fn remove(&mut self, listener: &Arc<dyn ModMatrixListener>) {
        self.listeners
            .retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn call<F: Fn(&dyn ModMatrixListener)>(&self, f: F) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }

    fn contains(&self, listener: &Arc<dyn ModMatrixListener>) -> bool {
        self.listeners
            .iter()
            .any(|l| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)))
    }
}

impl std::fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.listeners.len())
            .finish()
    }
}
