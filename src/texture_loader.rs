use std::fs;
use std::io::Cursor;
use std::path::Path;

use exif::{In, Reader, Tag, Value};
use raylib::prelude::*;
use tracing::{debug, warn};

use crate::error::DecodeError;

/// One pixel operation needed to display an image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    RotateCw,
    RotateCcw,
    FlipHorizontal,
    FlipVertical,
}

/// Operations that undo an EXIF orientation tag, applied in order.
///
/// 1 = Top-left (Normal)
/// 2 = Mirrored horizontally
/// 3 = Bottom-right (180 deg)
/// 4 = Mirrored vertically
/// 5 = Transposed (mirror across the top-left diagonal)
/// 6 = Top-right (90 deg clockwise)
/// 7 = Transversed (mirror across the top-right diagonal)
/// 8 = Bottom-left (270 deg clockwise / 90 deg counter-clockwise)
pub fn orientation_turns(orientation: u16) -> &'static [Turn] {
    match orientation {
        2 => &[Turn::FlipHorizontal],
        3 => &[Turn::RotateCw, Turn::RotateCw],
        4 => &[Turn::FlipVertical],
        5 => &[Turn::RotateCw, Turn::FlipHorizontal],
        6 => &[Turn::RotateCw],
        7 => &[Turn::RotateCw, Turn::FlipVertical],
        8 => &[Turn::RotateCcw],
        _ => &[],
    }
}

/// Orientation tag of a JPEG, if it has a readable one.
pub fn exif_orientation(file_bytes: &[u8]) -> Option<u16> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(file_bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            // Non-critical: proceed without rotation
            debug!(error = %e, "no usable EXIF data");
            return None;
        }
    };
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    match &field.value {
        Value::Short(values) => values.first().copied(),
        _ => None,
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// --- Load Image, Apply EXIF Orientation, Create Texture ---
pub fn load_texture_with_exif_rotation(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    image_path: &Path,
) -> Result<Texture2D, DecodeError> {
    let file_bytes = fs::read(image_path).map_err(|source| DecodeError::Read {
        path: image_path.to_path_buf(),
        source,
    })?;

    // EXIF orientation is only read reliably from JPEG
    let extension = lowercase_extension(image_path);
    let orientation = if extension == "jpg" || extension == "jpeg" {
        exif_orientation(&file_bytes).unwrap_or(1)
    } else {
        1
    };

    // Provide extension hint for loading from memory
    let mut image = Image::load_image_from_mem(&format!(".{extension}"), &file_bytes).map_err(|e| {
        DecodeError::Malformed {
            path: image_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    if image.width() <= 0 || image.height() <= 0 {
        return Err(DecodeError::Malformed {
            path: image_path.to_path_buf(),
            reason: "image has no pixels".to_string(),
        });
    }

    let turns = orientation_turns(orientation);
    for turn in turns {
        match turn {
            Turn::RotateCw => image.rotate_cw(),
            Turn::RotateCcw => image.rotate_ccw(),
            Turn::FlipHorizontal => image.flip_horizontal(),
            Turn::FlipVertical => image.flip_vertical(),
        }
    }
    if !turns.is_empty() {
        debug!(path = %image_path.display(), orientation, "applied EXIF orientation");
    } else if orientation != 1 {
        warn!(path = %image_path.display(), orientation, "ignoring unknown EXIF orientation");
    }

    // Image data is freed from CPU memory when `image` drops
    rl.load_texture_from_image(thread, &image)
        .map_err(|e| DecodeError::Upload {
            path: image_path.to_path_buf(),
            reason: e.to_string(),
        })
}
