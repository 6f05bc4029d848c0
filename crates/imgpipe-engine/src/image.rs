//! Reference-counted image nodes.
//!
//! A [`VImage`] is a counted reference to one immutable node: geometry, band
//! interpretation, pixels and metadata. Cloning takes a reference, dropping
//! releases it. Nodes may share pixel storage, so operations that only touch
//! metadata never copy samples.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult};
use crate::memory::TrackedBuf;

/// Largest width or height the engine will allocate.
pub const MAX_COORD: u32 = 10_000_000;

/// Largest number of samples in one node.
const MAX_SAMPLES: u64 = i32::MAX as u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static LIVE: AtomicUsize = AtomicUsize::new(0);

/// Metadata carried alongside pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    /// Embedded ICC profile.
    pub icc: Option<Arc<Vec<u8>>>,
    /// EXIF orientation, 1..=8, or 0 when absent.
    pub orientation: u8,
}

#[derive(Debug)]
struct Node {
    id: u64,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
    pixels: Arc<TrackedBuf>,
    meta: Meta,
}

impl Drop for Node {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Counted reference to an image node.
#[derive(Debug, Clone)]
pub struct VImage {
    node: Arc<Node>,
}

/// Non-owning probe on a node, for leak checks.
#[derive(Debug, Clone)]
pub struct WeakImage {
    node: Weak<Node>,
}

impl WeakImage {
    /// Returns true while any [`VImage`] still references the node.
    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }
}

impl VImage {
    /// Builds a node from interleaved samples.
    pub(crate) fn from_samples(
        width: u32,
        height: u32,
        bands: u32,
        interpretation: Interpretation,
        data: Vec<f32>,
        meta: Meta,
    ) -> OpResult<Self> {
        check_size("image", width, height, bands)?;
        if data.len() as u64 != width as u64 * height as u64 * bands as u64 {
            return Err(OpError::new("image", "sample count does not match geometry"));
        }
        Ok(Self::with_pixels(
            width,
            height,
            bands,
            interpretation,
            Arc::new(TrackedBuf::new(data)),
            meta,
        ))
    }

    fn with_pixels(
        width: u32,
        height: u32,
        bands: u32,
        interpretation: Interpretation,
        pixels: Arc<TrackedBuf>,
        meta: Meta,
    ) -> Self {
        LIVE.fetch_add(1, Ordering::Relaxed);
        Self {
            node: Arc::new(Node {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                bands,
                interpretation,
                pixels,
                meta,
            }),
        }
    }

    /// New node sharing this node's pixels, with different metadata or
    /// interpretation.
    pub(crate) fn share(&self, interpretation: Interpretation, meta: Meta) -> Self {
        Self::with_pixels(
            self.width(),
            self.height(),
            self.bands(),
            interpretation,
            Arc::clone(&self.node.pixels),
            meta,
        )
    }

    /// New node identical to this one.
    pub(crate) fn copy(&self) -> Self {
        self.share(self.interpretation(), self.meta().clone())
    }

    /// Unique node id, never reused within a process.
    pub fn id(&self) -> u64 {
        self.node.id
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.node.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.node.height
    }

    /// Number of bands.
    pub fn bands(&self) -> u32 {
        self.node.bands
    }

    /// Band interpretation.
    pub fn interpretation(&self) -> Interpretation {
        self.node.interpretation
    }

    /// Returns true if the last band is alpha.
    pub fn has_alpha(&self) -> bool {
        self.node.interpretation.has_alpha(self.node.bands)
    }

    /// Node metadata.
    pub fn meta(&self) -> &Meta {
        &self.node.meta
    }

    /// Returns true if an ICC profile is attached.
    pub fn has_icc(&self) -> bool {
        self.node.meta.icc.is_some()
    }

    /// Interleaved samples, row-major.
    pub fn pixels(&self) -> &[f32] {
        self.node.pixels.as_slice()
    }

    /// Size of this node's pixel storage in bytes.
    pub fn bytes(&self) -> u64 {
        self.node.pixels.bytes()
    }

    /// Samples in one row.
    pub(crate) fn row_len(&self) -> usize {
        self.width() as usize * self.bands() as usize
    }

    /// Pixel at (x, y) as a band slice.
    pub(crate) fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let b = self.bands() as usize;
        let start = (y * self.width() as usize + x) * b;
        &self.pixels()[start..start + b]
    }

    /// Number of references to this node.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }

    /// Weak probe on this node.
    pub fn downgrade(&self) -> WeakImage {
        WeakImage { node: Arc::downgrade(&self.node) }
    }
}

/// Number of live image nodes in the process.
pub fn live_images() -> usize {
    LIVE.load(Ordering::Relaxed)
}

/// Rejects geometry the engine cannot allocate.
pub(crate) fn check_size(domain: &'static str, width: u32, height: u32, bands: u32) -> OpResult<()> {
    if width == 0 || height == 0 || bands == 0 {
        return Err(OpError::new(domain, "image must have non-zero width, height and bands"));
    }
    if width > MAX_COORD || height > MAX_COORD {
        return Err(OpError::new(domain, format!("image dimensions too large: {width}x{height}")));
    }
    if width as u64 * height as u64 * bands as u64 > MAX_SAMPLES {
        return Err(OpError::new(domain, "out of memory"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey(w: u32, h: u32) -> VImage {
        VImage::from_samples(w, h, 1, Interpretation::Bw, vec![0.0; (w * h) as usize], Meta::default())
            .unwrap()
    }

    #[test]
    fn clone_is_a_reference() {
        let a = grey(4, 4);
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.ref_count(), 2);
        drop(b);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn weak_probe_sees_release() {
        let a = grey(2, 2);
        let probe = a.downgrade();
        assert!(probe.is_alive());
        drop(a);
        assert!(!probe.is_alive());
    }

    #[test]
    fn share_keeps_pixels_new_id() {
        let a = grey(3, 3);
        let b = a.share(Interpretation::Multiband, Meta::default());
        assert_ne!(a.id(), b.id());
        assert!(std::ptr::eq(a.pixels().as_ptr(), b.pixels().as_ptr()));
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(VImage::from_samples(0, 1, 1, Interpretation::Bw, vec![], Meta::default()).is_err());
        assert!(VImage::from_samples(2, 2, 1, Interpretation::Bw, vec![0.0; 3], Meta::default()).is_err());
    }
}
