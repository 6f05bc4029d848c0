//! Single-owner image handles.
//!
//! An [`ImageHandle`] owns one engine node. It cannot be cloned: operations
//! take it by value, so once a handle has been passed to an operation the
//! compiler rejects any further use of it. The node is released when the
//! operation returns, on success and on failure alike. Dropping a handle
//! releases its node too, which covers early exits from a pipeline.

use imgpipe_core::{ImageFormat, Interpretation, Result};
use imgpipe_engine::{self as engine, Status, VImage};
use tracing::trace;

use crate::error::{capture, Capture};
use crate::runtime::Runtime;
use crate::sniff::sniff;

/// Owned reference to one engine image.
#[derive(Debug)]
pub struct ImageHandle {
    image: VImage,
    runtime: Runtime,
}

impl ImageHandle {
    pub(crate) fn new(image: VImage, runtime: Runtime) -> Self {
        Self { image, runtime }
    }

    /// Decodes `bytes`, returning the handle and the sniffed format.
    ///
    /// Fails with [`Error::UnsupportedFormat`](imgpipe_core::Error::UnsupportedFormat)
    /// when the bytes are not a recognized image.
    pub fn load(runtime: &Runtime, bytes: &[u8]) -> Result<(Self, ImageFormat)> {
        Self::load_shrunk(runtime, bytes, 1)
    }

    pub(crate) fn load_shrunk(runtime: &Runtime, bytes: &[u8], shrink: u32) -> Result<(Self, ImageFormat)> {
        runtime.ensure_ready()?;
        let format = sniff(bytes);
        let loader = loader_for(format, bytes).ok_or(imgpipe_core::Error::UnsupportedFormat)?;
        trace!(%format, loader, shrink, "load");
        let image = engine::load_buffer(loader, bytes, shrink).captured()?;
        Ok((Self::new(image, runtime.clone()), format))
    }

    /// Runtime this handle was created under.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn image(&self) -> &VImage {
        &self.image
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of bands (channels).
    pub fn bands(&self) -> u32 {
        self.image.bands()
    }

    /// Colour interpretation of the bands.
    pub fn interpretation(&self) -> Interpretation {
        self.image.interpretation()
    }

    /// Interpretation nick, e.g. `"srgb"` or `"b-w"`.
    pub fn space(&self) -> &'static str {
        self.interpretation().nick()
    }

    /// Returns true if the last band is alpha.
    pub fn has_alpha(&self) -> bool {
        self.image.has_alpha()
    }

    /// Returns true if an ICC profile is embedded.
    pub fn has_profile(&self) -> bool {
        self.image.has_icc()
    }

    /// EXIF orientation, 1 to 8, or 0 when the source carried none.
    pub fn exif_orientation(&self) -> u8 {
        self.image.meta().orientation
    }

    /// Returns true if the engine can convert this image's colour space.
    pub fn is_colourspace_supported(&self) -> bool {
        engine::colourspace_issupported(&self.image)
    }

    /// Releases the handle now. Equivalent to dropping it.
    pub fn release(self) {
        trace!(id = self.image.id(), "release");
    }

    /// Runs `op` on this handle's node, consuming the handle.
    pub(crate) fn apply<F>(self, op: F) -> Result<Self>
    where
        F: FnOnce(&VImage) -> Status<VImage>,
    {
        self.runtime.ensure_ready()?;
        let out = op(&self.image).map_err(capture);
        let Self { image, runtime } = self;
        drop(image);
        out.map(|image| Self::new(image, runtime))
    }

    /// Runs `op` on two handles' nodes, consuming both.
    pub(crate) fn apply2<F>(self, other: Self, op: F) -> Result<Self>
    where
        F: FnOnce(&VImage, &VImage) -> Status<VImage>,
    {
        self.runtime.ensure_ready()?;
        let out = op(&self.image, &other.image).map_err(capture);
        drop(other);
        let Self { image, runtime } = self;
        drop(image);
        out.map(|image| Self::new(image, runtime))
    }

    /// Runs `op` on three handles' nodes, consuming all of them.
    pub(crate) fn apply3<F>(self, second: Self, third: Self, op: F) -> Result<Self>
    where
        F: FnOnce(&VImage, &VImage, &VImage) -> Status<VImage>,
    {
        self.runtime.ensure_ready()?;
        let out = op(&self.image, &second.image, &third.image).map_err(capture);
        drop(second);
        drop(third);
        let Self { image, runtime } = self;
        drop(image);
        out.map(|image| Self::new(image, runtime))
    }

    /// Probe that reports whether this handle's node is still alive.
    #[cfg(test)]
    pub(crate) fn probe(&self) -> engine::WeakImage {
        self.image.downgrade()
    }
}

/// Engine loader for a sniffed format.
fn loader_for(format: ImageFormat, bytes: &[u8]) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("jpegload_buffer"),
        ImageFormat::Png => Some("pngload_buffer"),
        ImageFormat::Webp => Some("webpload_buffer"),
        ImageFormat::Tiff => Some("tiffload_buffer"),
        ImageFormat::GenericNative => engine::foreign_find_load_buffer(bytes),
        _ => None,
    }
}
