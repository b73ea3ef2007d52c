pub const RENDER_WIDTH: u32 = 1920;            // Width of the render texture (the stage)
pub const RENDER_HEIGHT: u32 = 1080;           // Height of the render texture
pub const MAX_STAGE_SIDE: u32 = 16384;         // Largest render texture side accepted on the command line
pub const FPS: u32 = 60;                       // Target frames per second
pub const TICK_RATE: u32 = 120;                // Drift simulation ticks per second
pub const MAX_TICKS_PER_FRAME: u32 = 30;       // Backlog beyond this is dropped after a stall

pub const DISPLAY_DURATION: f32 = 2.0;         // Duration each image is shown (seconds)
pub const MAX_SPEED: f32 = 0.25;               // Largest drift speed per axis (pixels per tick)
pub const SPEED_LIMIT: f32 = 1.0e6;            // Upper bound for --max-speed
pub const MAX_DECODE_ATTEMPTS: u32 = 8;        // Picks tried per transition before giving up
pub const BACKGROUND_COLOR: &str = "181818";   // Stage fill colour behind both layers

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];
