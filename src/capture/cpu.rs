use kurbo::Shape as _;

use crate::{
    capture::host::{HostTimeline, PaintTicket, RenderHost},
    foundation::config::RenderConfig,
    foundation::core::{Affine, FrameRGBA, Point, Rgb8, Vec2, VirtualClock},
    foundation::error::{Stage, WovenError, WovenResult},
    program::generator::EffectProgram,
    program::style::STYLE_VERSION,
};

/// Offscreen host that replays woven-glow programs with `vello_cpu`.
///
/// Draws from the program's embedded data and style only, on a surface of
/// `width*dpr x height*dpr` pixels.
#[derive(Default)]
pub struct CpuHost {
    loaded: Option<Loaded>,
    state: HostState,
    next_seq: u64,
}

struct Loaded {
    program: EffectProgram,
    width: u16,
    height: u16,
    to_device: Affine,
    dpr: f64,
    transparent: bool,
    dots: Option<vello_cpu::kurbo::BezPath>,
}

#[derive(Default)]
enum HostState {
    #[default]
    Idle,
    Requested(PaintTicket, Box<vello_cpu::RenderContext>),
    Painted(PaintTicket, vello_cpu::Pixmap),
}

impl CpuHost {
    /// An idle host with no program loaded.
    pub fn new() -> Self {
        Self::default()
    }

    fn loaded(&self) -> WovenResult<&Loaded> {
        self.loaded.as_ref().ok_or_else(|| {
            WovenError::config(Stage::Capture, "no program loaded into the cpu host")
        })
    }
}

impl RenderHost for CpuHost {
    fn load(
        &mut self,
        program: &EffectProgram,
        config: &RenderConfig,
    ) -> WovenResult<HostTimeline> {
        config.validate()?;

        match program.template_version() {
            Some(v) if v == STYLE_VERSION => {}
            Some(v) => {
                return Err(WovenError::config(
                    Stage::Capture,
                    format!("cpu host replays '{STYLE_VERSION}' programs, template declares '{v}'"),
                ));
            }
            None => {
                return Err(WovenError::config(
                    Stage::Capture,
                    format!(
                        "cpu host replays '{STYLE_VERSION}' programs, template declares no version"
                    ),
                ));
            }
        }

        let viewport = config.viewport();
        if program.viewport() != viewport {
            let p = program.viewport();
            return Err(WovenError::config(
                Stage::Capture,
                format!(
                    "program was generated for {}x{} @ dpr {} (transparent={}), capture requested {}x{} @ dpr {} (alpha={})",
                    p.width,
                    p.height,
                    p.dpr,
                    p.transparent,
                    viewport.width,
                    viewport.height,
                    viewport.dpr,
                    viewport.transparent
                ),
            ));
        }

        let (w, h) = config.device_size();
        let width: u16 = w
            .try_into()
            .map_err(|_| WovenError::config(Stage::Capture, "surface width exceeds u16"))?;
        let height: u16 = h
            .try_into()
            .map_err(|_| WovenError::config(Stage::Capture, "surface height exceeds u16"))?;

        let data = program.data();
        let to_device = viewport.data_to_device(data.width(), data.height());
        let style = program.style();

        let dots = (style.point_alpha > 0.0 && !data.points().is_empty()).then(|| {
            let radius = (f64::from(style.line_width) * 0.6 * config.dpr).max(0.5);
            let mut path = kurbo::BezPath::new();
            for p in data.points() {
                let center = to_device * p.position();
                path.extend(kurbo::Circle::new(center, radius).path_elements(0.1));
            }
            bezpath_to_cpu(&path)
        });

        let natural_frames = program.timeline().natural_frames(config.fps);
        tracing::debug!(natural_frames, w, h, "cpu host loaded program");

        self.loaded = Some(Loaded {
            program: program.clone(),
            width,
            height,
            to_device,
            dpr: config.dpr,
            transparent: config.alpha,
            dots,
        });
        self.state = HostState::Idle;

        Ok(HostTimeline {
            natural_frames,
            surface_width: w,
            surface_height: h,
        })
    }

    fn request_frame(&mut self, clock: VirtualClock) -> WovenResult<PaintTicket> {
        if !matches!(self.state, HostState::Idle) {
            return Err(WovenError::capture(
                clock.frame,
                "frame requested while the previous frame is still in flight",
            ));
        }
        let loaded = self.loaded()?;

        let mut ctx = vello_cpu::RenderContext::new(loaded.width, loaded.height);
        paint_scene(&mut ctx, loaded, clock.seconds());

        let ticket = PaintTicket {
            frame: clock.frame,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.state = HostState::Requested(ticket, Box::new(ctx));
        Ok(ticket)
    }

    fn await_paint(&mut self, ticket: PaintTicket) -> WovenResult<()> {
        let (width, height) = {
            let loaded = self.loaded()?;
            (loaded.width, loaded.height)
        };
        match std::mem::take(&mut self.state) {
            HostState::Requested(t, mut ctx) if t == ticket => {
                ctx.flush();
                let mut pixmap = vello_cpu::Pixmap::new(width, height);
                ctx.render_to_pixmap(&mut pixmap);
                self.state = HostState::Painted(ticket, pixmap);
                Ok(())
            }
            other => {
                self.state = other;
                Err(WovenError::capture(
                    ticket.frame,
                    "await_paint called without a matching request",
                ))
            }
        }
    }

    fn rasterize(&mut self, ticket: PaintTicket) -> WovenResult<FrameRGBA> {
        match std::mem::take(&mut self.state) {
            HostState::Painted(t, pixmap) if t == ticket => Ok(FrameRGBA {
                width: u32::from(pixmap.width()),
                height: u32::from(pixmap.height()),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            }),
            other => {
                self.state = other;
                Err(WovenError::capture(
                    ticket.frame,
                    "rasterize called before the paint completed",
                ))
            }
        }
    }
}

fn paint_scene(ctx: &mut vello_cpu::RenderContext, loaded: &Loaded, t: f64) {
    let style = loaded.program.style();
    let data = loaded.program.data();
    let dpr = loaded.dpr;

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    if !loaded.transparent {
        ctx.set_paint(color(style.background, 1.0));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(loaded.width),
            f64::from(loaded.height),
        ));
    }

    if let Some(dots) = &loaded.dots {
        ctx.set_paint(color(style.color, f64::from(style.point_alpha)));
        ctx.fill_path(dots);
    }

    let points = data.points();
    let glow_half = f64::from(style.glow_width) * dpr * 0.5;
    let core_half = f64::from(style.line_width) * dpr * 0.5;
    let head_radius = f64::from(style.head_radius) * dpr;

    for s in data.segments().as_slice() {
        let p = style.strand_progress(t, s.delay);
        if p <= 0.0 {
            continue;
        }
        let a = loaded.to_device * points[s.from as usize].position();
        let z = loaded.to_device * points[s.to as usize].position();
        let tip = a + (z - a) * p;
        let k = style.intensity(t, s.weight, s.phase);

        if let Some(glow) = strand_quad(a, tip, glow_half) {
            ctx.set_paint(color(style.color, (0.25 * k).min(1.0)));
            ctx.fill_path(&bezpath_to_cpu(&glow));
        }
        if let Some(core) = strand_quad(a, tip, core_half) {
            ctx.set_paint(color(style.color, k.min(1.0)));
            ctx.fill_path(&bezpath_to_cpu(&core));
        }
        if p < 1.0 && head_radius > 0.0 {
            ctx.set_paint(color(style.color, k.min(1.0)));
            ctx.fill_path(&bezpath_to_cpu(
                &kurbo::Circle::new(tip, head_radius).to_path(0.1),
            ));
        }
    }
}

/// Rectangle of half-width `half_width` around the line `a`..`b`.
fn strand_quad(a: Point, b: Point, half_width: f64) -> Option<kurbo::BezPath> {
    let d: Vec2 = b - a;
    let len = d.hypot();
    if len < 1e-6 || half_width <= 0.0 {
        return None;
    }
    let n = Vec2::new(-d.y, d.x) * (half_width / len);
    let mut path = kurbo::BezPath::new();
    path.move_to(a + n);
    path.line_to(b + n);
    path.line_to(b - n);
    path.line_to(a - n);
    path.close_path();
    Some(path)
}

fn color(c: Rgb8, alpha: f64) -> vello_cpu::peniko::Color {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, a)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/capture/cpu.rs"]
mod tests;
