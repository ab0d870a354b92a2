use crate::error::{PyramidError, Result};
use crate::sector::Sector;
use image::{Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A fully transparent `tile_size` x `tile_size` tile.
pub fn blank_tile(tile_size: u32) -> RgbaImage {
    RgbaImage::from_pixel(tile_size, tile_size, TRANSPARENT)
}

/// True if no pixel of `img` is fully transparent.
pub fn is_complete(img: &RgbaImage) -> bool {
    first_transparent(img).is_none()
}

/// Coordinates of the first pixel with alpha 0, scanning rows top to bottom.
pub fn first_transparent(img: &RgbaImage) -> Option<(u32, u32)> {
    img.enumerate_pixels()
        .find(|(_, _, p)| p[3] == 0)
        .map(|(x, y, _)| (x, y))
}

/// Fails unless `img` is exactly `tile_size` x `tile_size`.
pub fn check_tile_size(img: &RgbaImage, tile_size: u32) -> Result<()> {
    let (width, height) = img.dimensions();
    if width != tile_size || height != tile_size {
        return Err(PyramidError::TileSize {
            expected: tile_size,
            width,
            height,
        });
    }
    Ok(())
}

/// Halve `src` with a 2x2 box filter and write the result into the quadrant of
/// `dst` selected by `sector`.
///
/// - each 2x2 block of four fully transparent pixels yields a transparent pixel
/// - each block of four non-transparent pixels yields an opaque pixel whose
///   colour channels are `(a + b + c + d) >> 2`
/// - a block mixing transparent and non-transparent pixels is an error: source
///   tiles must be complete or empty per block, never partially covered
///
/// Both images are checked against `tile_size` before any pixel is written.
pub fn downsample_into(
    src: &RgbaImage,
    dst: &mut RgbaImage,
    sector: Sector,
    tile_size: u32,
) -> Result<()> {
    if tile_size % 2 != 0 {
        return Err(PyramidError::InvalidConfig(format!(
            "tile_size must be even, got {tile_size}"
        )));
    }
    check_tile_size(src, tile_size)?;
    check_tile_size(dst, tile_size)?;

    let (ox, oy) = sector.pixel_offset(tile_size / 2);
    for y in (0..tile_size).step_by(2) {
        for x in (0..tile_size).step_by(2) {
            let block = [
                *src.get_pixel(x, y),
                *src.get_pixel(x + 1, y),
                *src.get_pixel(x, y + 1),
                *src.get_pixel(x + 1, y + 1),
            ];
            let opaque = block.iter().filter(|p| p[3] != 0).count();
            let out = match opaque {
                0 => TRANSPARENT,
                4 => average(&block),
                _ => return Err(PyramidError::MixedAlpha { x, y }),
            };
            dst.put_pixel(ox + x / 2, oy + y / 2, out);
        }
    }
    Ok(())
}

fn average(block: &[Rgba<u8>; 4]) -> Rgba<u8> {
    let channel = |c: usize| -> u8 {
        let sum: u16 = block.iter().map(|p| u16::from(p[c])).sum();
        (sum >> 2) as u8
    };
    Rgba([channel(0), channel(1), channel(2), 255])
}
