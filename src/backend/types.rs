//! Common types shared between the render graph and backends

use bitflags::bitflags;

/// Handle to a GPU image owned by a backend
///
/// The graph never looks inside a handle. [`ImageHandle::INVALID`] is the
/// placeholder used when a resource is imported before its backing image
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub(crate) u64);

impl ImageHandle {
    pub const INVALID: Self = Self(u64::MAX);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for ImageHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Handle to a GPU buffer owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    pub const INVALID: Self = Self(u64::MAX);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for BufferHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Either kind of backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderResourceHandle {
    Image(ImageHandle),
    Buffer(BufferHandle),
}

impl RenderResourceHandle {
    pub fn is_valid(&self) -> bool {
        match self {
            RenderResourceHandle::Image(image) => image.is_valid(),
            RenderResourceHandle::Buffer(buffer) => buffer.is_valid(),
        }
    }

    /// The invalid placeholder of the same kind
    pub fn invalidated(&self) -> Self {
        match self {
            RenderResourceHandle::Image(_) => RenderResourceHandle::Image(ImageHandle::INVALID),
            RenderResourceHandle::Buffer(_) => RenderResourceHandle::Buffer(BufferHandle::INVALID),
        }
    }

    pub fn as_image(&self) -> Option<ImageHandle> {
        match self {
            RenderResourceHandle::Image(image) => Some(*image),
            RenderResourceHandle::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<BufferHandle> {
        match self {
            RenderResourceHandle::Buffer(buffer) => Some(*buffer),
            RenderResourceHandle::Image(_) => None,
        }
    }
}

impl From<ImageHandle> for RenderResourceHandle {
    fn from(handle: ImageHandle) -> Self {
        RenderResourceHandle::Image(handle)
    }
}

impl From<BufferHandle> for RenderResourceHandle {
    fn from(handle: BufferHandle) -> Self {
        RenderResourceHandle::Buffer(handle)
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
    Depth24PlusStencil8,
    R32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8
            | TextureFormat::R32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// How an image may be used by the backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    /// How a buffer may be used by the backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDIRECT = 1 << 4;
    }
}

/// Image creation description
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT,
        }
    }
}

impl ImageDescriptor {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            width,
            height,
            format,
            usage,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Buffer creation description
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// What happens to an attachment's contents when a pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOp {
    #[default]
    Clear,
    Load,
    DontCare,
}

/// What happens to an attachment's contents when a pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

/// Attachment description handed to [`CommandList::begin_render_pass`](super::CommandList::begin_render_pass)
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentInfo {
    pub image: ImageHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub is_depth: bool,
}

/// Render pass begin description
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassInfo {
    pub label: String,
    pub attachments: Vec<AttachmentInfo>,
    pub clear_color: [f32; 4],
    pub width: u32,
    pub height: u32,
}
