use std::mem;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use raylib::prelude::*;
use tracing::info;

use crate::constants::*;
use crate::error::DecodeError;
use crate::geometry::{Placement, Size};
use crate::slide::Extent;
use crate::surface::{Decoder, Events, Rgb, Signal, Surface};
use crate::texture_loader::load_texture_with_exif_rotation;

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub width: u32,  // Stage (render texture) size
    pub height: u32,
    pub fps: u32,
    pub fullscreen: bool,
    pub show_fps: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: RENDER_WIDTH,
            height: RENDER_HEIGHT,
            fps: FPS,
            fullscreen: false,
            show_fps: false,
        }
    }
}

/// A decoded texture shared between the layers.
#[derive(Clone)]
pub struct Picture {
    texture: Rc<Texture2D>,
}

impl Extent for Picture {
    fn size(&self) -> Size {
        Size::new(self.texture.width() as f32, self.texture.height() as f32)
    }
}

enum DrawOp {
    Fill(Color),
    Blit(Picture, Placement),
}

/// raylib window with a fixed-size framebuffer (the stage). Frames are
/// recorded, drawn into the framebuffer on `present`, then scaled onto the
/// window.
///
/// Fields drop in declaration order. GPU resources must go before `rl`,
/// whose drop closes the window and the GL context.
pub struct RaylibBackend {
    framebuffer: RenderTexture2D,
    ops: Vec<DrawOp>,
    show_fps: bool,
    rl: RaylibHandle,
    thread: RaylibThread,
}

impl RaylibBackend {
    pub fn open(settings: &WindowSettings) -> Result<Self> {
        let (width, height) = initial_window_size(settings.width, settings.height);
        let (mut rl, thread) = raylib::init()
            .size(width, height)
            .title("driftshow")
            .vsync()
            .resizable()
            .build();
        rl.set_target_fps(settings.fps);
        rl.set_trace_log(TraceLogLevel::LOG_ERROR);
        if settings.fullscreen {
            rl.toggle_fullscreen();
        }

        let framebuffer = rl
            .load_render_texture(&thread, settings.width, settings.height)
            .map_err(|e| anyhow!("failed to create {}x{} render texture: {e}", settings.width, settings.height))?;
        info!(width = settings.width, height = settings.height, fps = settings.fps, "window open");

        Ok(Self {
            framebuffer,
            ops: Vec::new(),
            show_fps: settings.show_fps,
            rl,
            thread,
        })
    }
}

/// The window opens at half the stage size, never smaller than 1x1.
fn initial_window_size(width: u32, height: u32) -> (i32, i32) {
    let half = |side: u32| i32::try_from((side / 2).max(1)).unwrap_or(i32::MAX);
    (half(width), half(height))
}

fn color(rgb: Rgb) -> Color {
    Color::new(rgb.r, rgb.g, rgb.b, 255)
}

/// Largest rectangle with the stage's aspect ratio that fits the window,
/// centred.
fn letterbox(stage: Size, window: Size) -> Rectangle {
    if stage.is_empty() || window.is_empty() {
        return Rectangle::new(0.0, 0.0, window.width, window.height);
    }
    let scale = (window.width / stage.width).min(window.height / stage.height);
    let width = stage.width * scale;
    let height = stage.height * scale;
    Rectangle::new((window.width - width) * 0.5, (window.height - height) * 0.5, width, height)
}

impl Surface for RaylibBackend {
    type Image = Picture;

    fn fill_background(&mut self, rgb: Rgb) {
        self.ops.push(DrawOp::Fill(color(rgb)));
    }

    fn blit(&mut self, image: &Picture, placement: Placement) {
        self.ops.push(DrawOp::Blit(image.clone(), placement));
    }

    fn present(&mut self) {
        let ops = mem::take(&mut self.ops);
        let thread = &self.thread;

        // --- Render the frame into the fixed size framebuffer ---
        // Draw on the texture mode handle itself: every begin_drawing swaps
        // buffers and polls input, so there is exactly one per frame, below.
        self.rl.draw_texture_mode(thread, &mut self.framebuffer, |mut tmd| {
            for op in &ops {
                match op {
                    DrawOp::Fill(fill) => tmd.clear_background(*fill),
                    DrawOp::Blit(picture, placement) => {
                        let texture = &*picture.texture;
                        tmd.draw_texture_pro(
                            texture,
                            Rectangle::new(0.0, 0.0, texture.width() as f32, texture.height() as f32),
                            Rectangle::new(
                                placement.origin.x,
                                placement.origin.y,
                                placement.extent.width,
                                placement.extent.height,
                            ),
                            Vector2::new(0.0, 0.0),
                            0.0,
                            Color::WHITE,
                        );
                    }
                }
            }
        });

        // --- Scale the framebuffer onto the window ---
        let stage = Size::new(self.framebuffer.width() as f32, self.framebuffer.height() as f32);
        let mut d = self.rl.begin_drawing(&self.thread);
        d.clear_background(Color::BLACK);
        let window = Size::new(d.get_screen_width() as f32, d.get_screen_height() as f32);

        // Render textures are stored upside down: flip the source rectangle
        d.draw_texture_pro(
            &self.framebuffer,
            Rectangle::new(0.0, 0.0, stage.width, -stage.height),
            letterbox(stage, window),
            Vector2::new(0.0, 0.0),
            0.0,
            Color::WHITE,
        );
        if self.show_fps {
            d.draw_fps(10, 10);
        }
    }
}

impl Decoder for RaylibBackend {
    type Image = Picture;

    fn decode(&mut self, path: &Path) -> Result<Picture, DecodeError> {
        let texture = load_texture_with_exif_rotation(&mut self.rl, &self.thread, path)?;
        Ok(Picture {
            texture: Rc::new(texture),
        })
    }
}

impl Events for RaylibBackend {
    fn poll(&mut self) -> Option<Signal> {
        if self.rl.window_should_close() {
            return Some(Signal::Quit);
        }
        while let Some(key) = self.rl.get_key_pressed() {
            match key {
                KeyboardKey::KEY_Q => return Some(Signal::Quit),
                KeyboardKey::KEY_N | KeyboardKey::KEY_SPACE | KeyboardKey::KEY_RIGHT => return Some(Signal::Next),
                KeyboardKey::KEY_R => return Some(Signal::Refresh),
                _ => {}
            }
        }
        None
    }
}
