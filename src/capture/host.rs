use crate::{
    foundation::config::RenderConfig,
    foundation::core::{FrameIndex, FrameRGBA, VirtualClock},
    foundation::error::WovenResult,
    program::generator::EffectProgram,
};

/// What a host reports after loading a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostTimeline {
    /// Frames the animation needs at the configured fps.
    pub natural_frames: u64,
    /// Raster width in pixels.
    pub surface_width: u32,
    /// Raster height in pixels.
    pub surface_height: u32,
}

/// Receipt for a requested frame; must be handed back to finish that frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintTicket {
    /// Frame this ticket was issued for.
    pub frame: FrameIndex,
    pub(crate) seq: u64,
}

/// An isolated offscreen surface that can replay an [`EffectProgram`].
///
/// Frames go through an explicit handshake: [`request_frame`](Self::request_frame) moves
/// the program to the clock's time, [`await_paint`](Self::await_paint) blocks until that
/// paint has fully resolved, and [`rasterize`](Self::rasterize) reads the pixels back.
/// The host keeps single-writer state; a new frame may only be requested after the
/// previous one was rasterized.
pub trait RenderHost {
    /// Load a program onto a fresh surface sized by `config`.
    fn load(&mut self, program: &EffectProgram, config: &RenderConfig)
    -> WovenResult<HostTimeline>;

    /// Advance the program to `clock` and start painting.
    fn request_frame(&mut self, clock: VirtualClock) -> WovenResult<PaintTicket>;

    /// Wait until the paint started for `ticket` has completed.
    fn await_paint(&mut self, ticket: PaintTicket) -> WovenResult<()>;

    /// Read back the painted surface for `ticket`.
    fn rasterize(&mut self, ticket: PaintTicket) -> WovenResult<FrameRGBA>;
}
