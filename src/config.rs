use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::catalog::{CatalogOptions, Order};
use crate::constants::*;
use crate::geometry::Size;
use crate::slide::{EdgePolicy, Fit, Layout};
use crate::slideshow::ShowSettings;
use crate::surface::Rgb;
use crate::window::WindowSettings;

/// Cycle through the images under a directory, drifting each one across
/// the screen.
#[derive(Debug, Parser)]
#[command(name = "driftshow", version)]
pub struct Args {
    /// Directory to scan (recursively) for images
    pub root: PathBuf,

    /// Seconds each image stays on screen
    #[arg(short, long, default_value_t = DISPLAY_DURATION, value_parser = positive_seconds)]
    pub interval: f32,

    /// Target frames per second
    #[arg(long, default_value_t = FPS, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Drift simulation ticks per second
    #[arg(long, default_value_t = TICK_RATE, value_parser = clap::value_parser!(u32).range(1..))]
    pub tick_rate: u32,

    /// Largest drift speed per axis, in pixels per tick (0 keeps images still)
    #[arg(long, default_value_t = MAX_SPEED, value_parser = drift_speed)]
    pub max_speed: f32,

    /// Stage width in pixels
    #[arg(long, default_value_t = RENDER_WIDTH, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_STAGE_SIDE)))]
    pub width: u32,

    /// Stage height in pixels
    #[arg(long, default_value_t = RENDER_HEIGHT, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_STAGE_SIDE)))]
    pub height: u32,

    /// How images are sized on the stage
    #[arg(long, value_enum, default_value_t = Fit::Natural)]
    pub fit: Fit,

    /// What a drifting image does at the stage border
    #[arg(long, value_enum, default_value_t = EdgePolicy::Free)]
    pub edges: EdgePolicy,

    /// Order in which images are shown
    #[arg(long, value_enum, default_value_t = Order::Random)]
    pub order: Order,

    /// Accepted file extension (repeatable); defaults to common image types
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Also show files inside hidden (dot) directories and hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// Do not follow symbolic links while scanning
    #[arg(long)]
    pub no_follow_links: bool,

    /// Write the scanned image list to this file, one path per line
    #[arg(long, value_name = "FILE")]
    pub listing: Option<PathBuf>,

    /// Stage colour behind the images, as RRGGBB
    #[arg(long, default_value = BACKGROUND_COLOR)]
    pub background: Rgb,

    /// Decode failures tolerated per transition before keeping the current image
    #[arg(long, default_value_t = MAX_DECODE_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_decode_attempts: u32,

    /// Quit after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = positive_seconds)]
    pub run_time: Option<f32>,

    /// Start in fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Draw the frame rate in the corner
    #[arg(long)]
    pub show_fps: bool,
}

/// Seconds that also fit in a `Duration`.
fn positive_seconds(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !(value.is_finite() && value > 0.0) {
        return Err(format!("`{s}` must be a positive number of seconds"));
    }
    Duration::try_from_secs_f32(value).map_err(|e| format!("`{s}` seconds is out of range: {e}"))?;
    Ok(value)
}

fn drift_speed(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=SPEED_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(format!("`{s}` must be between 0 and {SPEED_LIMIT}"))
    }
}

/// `.JPG` and `jpg` mean the same thing.
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Everything the program needs, split by consumer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub catalog: CatalogOptions,
    pub show: ShowSettings,
    pub window: WindowSettings,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        let mut catalog = CatalogOptions {
            include_hidden: args.include_hidden,
            follow_links: !args.no_follow_links,
            listing: args.listing,
            ..CatalogOptions::default()
        };
        let extensions: Vec<String> = args
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        if !extensions.is_empty() {
            catalog.extensions = extensions;
        }

        let show = ShowSettings {
            interval: Duration::from_secs_f32(args.interval),
            tick_rate: args.tick_rate,
            max_speed: args.max_speed,
            layout: Layout {
                stage: Size::new(args.width as f32, args.height as f32),
                fit: args.fit,
                edges: args.edges,
            },
            order: args.order,
            background: args.background,
            max_decode_attempts: args.max_decode_attempts,
            run_time: args.run_time.map(Duration::from_secs_f32),
        };

        let window = WindowSettings {
            width: args.width,
            height: args.height,
            fps: args.fps,
            fullscreen: args.fullscreen,
            show_fps: args.show_fps,
        };

        Self {
            root: args.root,
            catalog,
            show,
            window,
        }
    }
}
