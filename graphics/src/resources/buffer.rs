//! GPU buffer resources.

use std::sync::Arc;

use crate::backend::{GpuBackend, GpuBuffer};
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, BufferUsage, Residency};

/// A GPU buffer resource.
///
/// Buffers are created once and mutated only through
/// [`Buffer::copy_cpu_to_gpu`], which requires `Dynamic` or `Staging`
/// residency. Use [`DynamicBuffer`] when the contents may outgrow the
/// initial capacity.
///
/// # Example
///
/// ```ignore
/// let vertices = Buffer::create(
///     &backend,
///     BufferDescriptor::vertex(bytes.len() as u64, 24, Residency::Static),
///     Some(bytes),
/// )?;
/// ```
pub struct Buffer {
    backend: Arc<dyn GpuBackend>,
    descriptor: BufferDescriptor,
    handle: Arc<GpuBuffer>,
}

impl Buffer {
    /// Create a buffer, optionally seeded with `initial_data`.
    ///
    /// Fails if the size or stride is zero, if `initial_data` is longer than
    /// the buffer, or if a `Static` buffer has no initial data.
    pub fn create(
        backend: &Arc<dyn GpuBackend>,
        descriptor: BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Self, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size must be non-zero".into(),
            ));
        }
        if descriptor.stride == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer stride must be non-zero".into(),
            ));
        }
        if descriptor.residency.requires_initial_data() && initial_data.is_none() {
            return Err(GraphicsError::ResidencyViolation(format!(
                "static buffer {:?} created without initial data",
                descriptor.label
            )));
        }
        if let Some(data) = initial_data
            && data.len() as u64 > descriptor.size
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial data ({} bytes) exceeds buffer size ({} bytes)",
                data.len(),
                descriptor.size
            )));
        }

        let handle = backend.create_buffer(&descriptor, initial_data)?;
        log::trace!(
            "Created buffer {:?} ({} bytes, {:?})",
            descriptor.label,
            descriptor.size,
            descriptor.residency
        );

        Ok(Self {
            backend: Arc::clone(backend),
            descriptor,
            handle: Arc::new(handle),
        })
    }

    /// Overwrite the start of the buffer with `data`.
    ///
    /// Valid only for `Dynamic` and `Staging` buffers, and only when `data`
    /// fits in the current capacity.
    pub fn copy_cpu_to_gpu(&self, data: &[u8]) -> Result<(), GraphicsError> {
        if !self.descriptor.residency.is_cpu_writable() {
            return Err(GraphicsError::ResidencyViolation(format!(
                "buffer {:?} with {:?} residency is not CPU-writable",
                self.descriptor.label, self.descriptor.residency
            )));
        }
        let requested = data.len() as u64;
        if requested > self.descriptor.size {
            return Err(GraphicsError::BufferOverflow {
                requested,
                capacity: self.descriptor.size,
            });
        }
        self.backend.write_buffer(&self.handle, 0, data)
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the element stride in bytes.
    pub fn stride(&self) -> u32 {
        self.descriptor.stride
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    /// Get the residency.
    pub fn residency(&self) -> Residency {
        self.descriptor.residency
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Get the native handle.
    pub fn gpu_handle(&self) -> &Arc<GpuBuffer> {
        &self.handle
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("stride", &self.descriptor.stride)
            .field("usage", &self.descriptor.usage)
            .field("residency", &self.descriptor.residency)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

/// A `Dynamic` buffer that grows when a copy exceeds its capacity.
///
/// Growth creates the replacement first and releases the old native buffer
/// only after the replacement exists, so a failed creation leaves the
/// current buffer untouched.
#[derive(Debug)]
pub struct DynamicBuffer {
    buffer: Buffer,
    recreations: u32,
}

impl DynamicBuffer {
    /// Create a dynamic buffer with an initial capacity.
    pub fn new(
        backend: &Arc<dyn GpuBackend>,
        mut descriptor: BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Self, GraphicsError> {
        descriptor.residency = Residency::Dynamic;
        Ok(Self {
            buffer: Buffer::create(backend, descriptor, initial_data)?,
            recreations: 0,
        })
    }

    /// Copy `data` into the buffer, growing it first when needed.
    ///
    /// Returns `true` if the buffer was recreated.
    pub fn copy_cpu_to_gpu(&mut self, data: &[u8]) -> Result<bool, GraphicsError> {
        let requested = data.len() as u64;
        if requested <= self.capacity() {
            self.buffer.copy_cpu_to_gpu(data)?;
            return Ok(false);
        }

        let mut descriptor = self.buffer.descriptor.clone();
        descriptor.size = requested.max(self.capacity().saturating_mul(2));
        let replacement = Buffer::create(&self.buffer.backend, descriptor, Some(data))?;

        log::debug!(
            "Growing dynamic buffer {:?} from {} to {} bytes",
            self.buffer.label(),
            self.capacity(),
            replacement.size()
        );
        // The old native buffer is released here, after its replacement exists.
        self.buffer = replacement;
        self.recreations += 1;
        Ok(true)
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.buffer.size()
    }

    /// How many times the buffer has been recreated.
    pub fn recreation_count(&self) -> u32 {
        self.recreations
    }

    /// The current backing buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);
static_assertions::assert_impl_all!(DynamicBuffer: Send, Sync);
