//! Context configuration.

/// Which backend the context should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// No GPU work; counts native operations.
    #[default]
    Dummy,
    /// wgpu, falling back to dummy if no adapter is available.
    Wgpu,
    /// The best compiled-in backend.
    Auto,
}

impl BackendType {
    /// Parse a backend name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dummy" => Some(Self::Dummy),
            "wgpu" => Some(Self::Wgpu),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Presentation mode for the swap chain.
///
/// Controls how frames are synchronized with the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    Mailbox,
    /// VSync enabled. No tearing, but may have higher latency.
    #[default]
    Fifo,
}

/// Parameters used to create a [`GraphicsContext`](crate::GraphicsContext).
///
/// # Example
///
/// ```ignore
/// let params = ContextParameters::new()
///     .with_backend(BackendType::Wgpu)
///     .with_size(1920, 1080)
///     .with_validation(true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContextParameters {
    /// Backend selection.
    pub backend: BackendType,
    /// Back buffer width in pixels.
    pub width: u32,
    /// Back buffer height in pixels.
    pub height: u32,
    /// Presentation mode.
    pub present_mode: PresentMode,
    /// Enable API validation layers.
    pub validation: bool,
    /// Enable debug labels and markers.
    pub debug: bool,
    /// Color cameras clear to when they do not set their own.
    pub clear_color: [f32; 4],
}

impl ContextParameters {
    /// Default parameters: headless 1280x720 on the dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the back buffer size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the present mode.
    pub fn with_present_mode(mut self, present_mode: PresentMode) -> Self {
        self.present_mode = present_mode;
        self
    }

    /// Enable or disable validation.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable debug labels.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the default clear color.
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Dummy,
            width: 1280,
            height: 720,
            present_mode: PresentMode::Fifo,
            validation: false,
            debug: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ContextParameters::new();
        assert_eq!(params.backend, BackendType::Dummy);
        assert_eq!((params.width, params.height), (1280, 720));
        assert_eq!(params.present_mode, PresentMode::Fifo);
    }

    #[test]
    fn test_builder() {
        let params = ContextParameters::new()
            .with_backend(BackendType::Auto)
            .with_size(640, 480)
            .with_validation(true)
            .with_clear_color([0.1, 0.2, 0.3, 1.0]);
        assert_eq!(params.backend, BackendType::Auto);
        assert_eq!(params.width, 640);
        assert!(params.validation);
        assert_eq!(params.clear_color[2], 0.3);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(BackendType::from_name("WGPU"), Some(BackendType::Wgpu));
        assert_eq!(BackendType::from_name("vulkan"), None);
    }
}
