//! Fetch-and-decode of a single page image.

use flipbook_cache::HttpResponse;
#[cfg(not(target_arch = "wasm32"))]
use flipbook_cache::Fetcher;

/// A page image that decoded to a usable bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPage {
    pub width: u32,
    pub height: u32,
}

/// Decode image bytes just far enough to know they form a valid bitmap.
pub fn decode_page(bytes: &[u8]) -> Result<DecodedPage, String> {
    let image = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    Ok(DecodedPage {
        width: image.width(),
        height: image.height(),
    })
}

/// Read only the image header for its size. The browser draws the bitmap itself,
/// so the main thread never pays for a full decode.
pub fn read_dimensions(bytes: &[u8]) -> Result<DecodedPage, String> {
    let (width, height) = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())?;
    Ok(DecodedPage { width, height })
}

/// Body of a 2xx response, or the error text shown for the page.
pub fn check_response(response: &HttpResponse) -> Result<&[u8], String> {
    if response.is_success() {
        return Ok(&response.body);
    }
    let reason = String::from_utf8_lossy(&response.body);
    Err(if reason.trim().is_empty() {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {}: {}", response.status, reason.trim())
    })
}

/// GET `url` and decode it. Non-2xx answers and decode failures are errors.
#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_page(fetcher: &dyn Fetcher, url: &str) -> Result<DecodedPage, String> {
    let response = fetcher.get(url).map_err(|e| e.to_string())?;
    let page = decode_page(check_response(&response)?)?;
    log::debug!("Decoded {} ({}x{})", url, page.width, page.height);
    Ok(page)
}

/// Encode a solid-color PNG. Used to script image responses.
#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}
