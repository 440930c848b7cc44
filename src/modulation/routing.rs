use std::sync::Arc;

use crate::parameter::Parameter;

use super::{function::ModFunction, ModSrcId};

// -------------------------------------------------------------------------------------------------

/// A single routing from a modulation source to the parameter that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Routing {
    pub source: ModSrcId,
    /// Cached from the source on creation.
    pub poly: bool,
    pub enabled: bool,
    pub depth: f32,
    pub bipolar_mapping: bool,
    pub function: ModFunction,
}

impl Routing {
    pub fn new(source: ModSrcId, poly: bool, depth: f32, bipolar_mapping: bool) -> Self {
        Self {
            source,
            poly,
            enabled: true,
            depth,
            bipolar_mapping,
            function: ModFunction::Linear,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A registered modulation destination and the routings which feed it.
///
/// Routings are kept in creation order and hold at most one entry per source.
#[derive(Debug, Clone)]
pub(crate) struct ParamInfo {
    pub parameter: Arc<dyn Parameter>,
    pub poly: bool,
    pub smoothing_time: f32,
    pub routings: Vec<Routing>,
}

impl ParamInfo {
    pub fn new(parameter: Arc<dyn Parameter>, poly: bool, smoothing_time: f32) -> Self {
        /// Expected routings per parameter in typical patches.
        const ROUTINGS_CAPACITY: usize = 4;
        Self {
            parameter,
            poly,
            smoothing_time,
            routings: Vec::with_capacity(ROUTINGS_CAPACITY),
        }
    }

    pub fn routing(&self, source: ModSrcId) -> Option<&Routing> {
        self.routings.iter().find(|r| r.source == source)
    }

    pub fn routing_mut(&mut self, source: ModSrcId) -> Option<&mut Routing> {
        self.routings.iter_mut().find(|r| r.source == source)
    }

    /// Remove the routing from the given source. Returns true when a routing got removed.
    pub fn remove_routing(&mut self, source: ModSrcId) -> bool {
        let len = self.routings.len();
        self.routings.retain(|r| r.source != source);
        self.routings.len() != len
    }
}
