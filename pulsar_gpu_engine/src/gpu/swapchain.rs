/// Swapchain state
///
/// Thin state wrapper around a native swapchain. Staleness is not an
/// error: `out of date` and `suboptimal` results are recorded as flags
/// here, and the frame context recreates the swapchain lazily on the next
/// `begin_frame`.

use crate::gpu::driver::{NativeSwapchain, SwapchainInfo};
use crate::gpu::image::Format;

/// Presentable surface state tracked across frames
#[derive(Debug)]
pub struct Swapchain {
    pub(crate) native: NativeSwapchain,
    pub(crate) is_valid: bool,
    pub(crate) is_optimal: bool,
    pub(crate) current_image: Option<u32>,
    info: SwapchainInfo,
}

impl Swapchain {
    /// Wrap a native swapchain created by the driver
    pub fn new(native: NativeSwapchain, info: SwapchainInfo) -> Self {
        Self {
            native,
            is_valid: true,
            is_optimal: true,
            current_image: None,
            info,
        }
    }

    /// Native handle
    pub fn native(&self) -> NativeSwapchain {
        self.native
    }

    /// Whether the swapchain still matches its surface.
    ///
    /// An invalid swapchain is recreated on the next `begin_frame`.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Whether the swapchain is still optimal for its surface
    pub fn is_optimal(&self) -> bool {
        self.is_optimal
    }

    /// Image index acquired for the current frame, if any
    pub fn current_image(&self) -> Option<u32> {
        self.current_image
    }

    /// Number of images in the swapchain
    pub fn image_count(&self) -> u32 {
        self.info.image_count
    }

    /// Width of the swapchain images in pixels
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height of the swapchain images in pixels
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Pixel format of the swapchain images
    pub fn format(&self) -> Format {
        self.info.format
    }

    /// Force recreation on the next `begin_frame` (e.g. after a window
    /// resize event)
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    pub(crate) fn apply_recreated(&mut self, info: SwapchainInfo) {
        self.info = info;
        self.is_valid = true;
        self.is_optimal = true;
        self.current_image = None;
    }
}
