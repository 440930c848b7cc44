//! Persisted routing state of a [`ModMatrix`].

use super::{function::ModFunction, id_string, matrix::ModMatrix, routing::Routing};

// -------------------------------------------------------------------------------------------------

/// Name of the routing container within a host's state tree.
pub const MOD_MATRIX_CONTAINER: &str = "MODMATRIX";

// -------------------------------------------------------------------------------------------------

/// A single persisted routing.
///
/// Sources and parameters are referenced by their identifier strings. Missing fields fall back
/// to their defaults when deserializing: depth 0, enabled, linear function. A missing
/// `bi_polar_mapping` gets resolved by the matrix's default polarity mode when restoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ModulationRecord {
    pub src_id: String,
    pub dst_id: String,
    pub depth: f32,
    pub enabled: bool,
    pub function: String,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub bi_polar_mapping: Option<bool>,
}

impl Default for ModulationRecord {
    fn default() -> Self {
        Self {
            src_id: String::new(),
            dst_id: String::new(),
            depth: 0.0,
            enabled: true,
            function: ModFunction::Linear.to_string(),
            bi_polar_mapping: None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// The matrix's slice of a host state tree: an optional routing container.
///
/// A state without container restores an empty matrix. Writing a state always creates the
/// container, replacing all previously present records.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ModMatrixState {
    #[cfg_attr(
        feature = "serde",
        serde(rename = "MODMATRIX", skip_serializing_if = "Option::is_none")
    )]
    mod_matrix: Option<Vec<ModulationRecord>>,
}

impl ModMatrixState {
    /// Create an empty state without routing container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state with a routing container holding the given records.
    pub fn with_records(records: Vec<ModulationRecord>) -> Self {
        Self {
            mod_matrix: Some(records),
        }
    }

    pub fn has_container(&self) -> bool {
        self.mod_matrix.is_some()
    }

    /// Persisted records, if the container is present.
    pub fn records(&self) -> Option<&[ModulationRecord]> {
        self.mod_matrix.as_deref()
    }

    /// Clear the container, creating it if necessary, and return it for writing.
    pub fn reset_container(&mut self) -> &mut Vec<ModulationRecord> {
        let records = self.mod_matrix.get_or_insert_with(Vec::new);
        records.clear();
        records
    }
}

// -------------------------------------------------------------------------------------------------

impl ModMatrix {
    /// Replace all routings with the ones from the given state.
    ///
    /// Records which refer to unknown sources or parameters are dropped with a warning, as are
    /// records with empty ids. Later duplicates of a source/parameter pair replace earlier ones.
    /// Fires a single change notification.
    pub fn state_updated(&mut self, state: &ModMatrixState) {
        for info in &mut self.parameters {
            info.routings.clear();
        }

        let mut restored = 0;
        let mut dropped = 0;
        for record in state.records().unwrap_or_default() {
            if record.src_id.is_empty() || record.dst_id.is_empty() {
                dropped += 1;
                continue;
            }
            let lookup = self
                .find_mod_source(&record.src_id)
                .and_then(|source| Ok((source, self.find_parameter(&record.dst_id)?)));
            let (source, parameter) = match lookup {
                Ok(ids) => ids,
                Err(err) => {
                    log::warn!("Dropping persisted modulation routing: {err}");
                    dropped += 1;
                    continue;
                }
            };

            let source_info = &self.sources[source.0];
            let bipolar_mapping = record
                .bi_polar_mapping
                .unwrap_or_else(|| self.default_polarity_mode.resolve(source_info.bipolar));
            let mut routing = Routing::new(source, source_info.poly, record.depth, bipolar_mapping);
            routing.enabled = record.enabled;
            routing.function = ModFunction::from_name(&record.function);

            let info = &mut self.parameters[parameter.0];
            if let Some(existing) = info.routing_mut(source) {
                *existing = routing;
            } else {
                info.routings.push(routing);
            }
            restored += 1;
        }

        if dropped > 0 {
            log::info!("Restored {restored} modulation routings, dropped {dropped}");
        } else {
            log::info!("Restored {restored} modulation routings");
        }
        self.notify_changed();
    }

    /// Write all routings into the given state, replacing its previous routing container.
    pub fn update_state(&self, state: &mut ModMatrixState) {
        let records = state.reset_container();
        for info in &self.parameters {
            let dst_id = id_string(info.parameter.id());
            records.extend(info.routings.iter().map(|routing| ModulationRecord {
                src_id: id_string(self.sources[routing.source.0].id),
                dst_id: dst_id.clone(),
                depth: routing.depth,
                enabled: routing.enabled,
                function: routing.function.to_string(),
                bi_polar_mapping: Some(routing.bipolar_mapping),
            }));
        }
    }
}

// -------------------------------------------------------------------------------------------------
