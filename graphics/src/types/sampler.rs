//! Sampler descriptor.

pub use tessera_core::sampler::{AddressMode, CompareFunction, FilterMode};

/// Sampler state: one filter for magnification, minification and mips,
/// and one address mode for both texture axes.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub filter: FilterMode,
    pub address: AddressMode,
    /// Comparison sampling for shadow maps. The material bind layout only
    /// accepts filtering samplers, so compare samplers cannot be bound to
    /// material slots.
    pub compare: Option<CompareFunction>,
}

impl SamplerDescriptor {
    /// Linear filtering, repeating addresses. Materials fall back to this.
    pub fn linear_wrap() -> Self {
        Self {
            label: None,
            filter: FilterMode::Linear,
            address: AddressMode::Repeat,
            compare: None,
        }
    }

    /// Nearest filtering, clamped addresses.
    pub fn point_clamp() -> Self {
        Self {
            label: None,
            filter: FilterMode::Nearest,
            address: AddressMode::ClampToEdge,
            compare: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_address(mut self, address: AddressMode) -> Self {
        self.address = address;
        self
    }

    pub fn with_compare(mut self, compare: CompareFunction) -> Self {
        self.compare = Some(compare);
        self
    }
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self::linear_wrap()
    }
}
