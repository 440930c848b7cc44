use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// A registered modulation source within a [`ModMatrix`](crate::ModMatrix).
///
/// Mono sources store their live values here, per stereo channel. Poly sources store their
/// values per voice in [`VoiceState`](super::voice::VoiceState).
#[derive(Debug, Clone)]
pub(crate) struct SourceInfo {
    pub id: FourCC,
    pub name: &'static str,
    pub poly: bool,
    pub bipolar: bool,
    pub mono_values: [f32; 2],
}

impl SourceInfo {
    pub fn new(id: FourCC, name: &'static str, poly: bool, bipolar: bool) -> Self {
        Self {
            id,
            name,
            poly,
            bipolar,
            mono_values: [0.0; 2],
        }
    }
}
