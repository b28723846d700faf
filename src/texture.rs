use image::RgbaImage;
use log::debug;
use metal::*;

use crate::error::{Error, Result};
use crate::utils::check_texture_size;

const BYTES_PER_PIXEL: u32 = 4; // RGBA8

fn region(width: u32, height: u32) -> MTLRegion {
    MTLRegion::new_2d(0, 0, width as u64, height as u64)
}

// Input texture: normalized RGBA8 that kernels read as 0..1 floats
pub fn create_texture(device: &Device, image: &RgbaImage) -> Result<Texture> {
    let (width, height) = image.dimensions();
    check_texture_size(width, height)?;

    let texture_desc = TextureDescriptor::new();
    texture_desc.set_pixel_format(MTLPixelFormat::RGBA8Unorm);
    texture_desc.set_width(width as u64);
    texture_desc.set_height(height as u64);
    texture_desc.set_texture_type(MTLTextureType::D2);
    texture_desc.set_usage(MTLTextureUsage::ShaderRead);

    let texture = device.new_texture(&texture_desc);
    texture.replace_region(
        region(width, height),
        0,
        image.as_raw().as_ptr() as *const _,
        (BYTES_PER_PIXEL * width) as u64,
    );
    debug!("uploaded {width}x{height} input texture");
    Ok(texture)
}

/// Integer RGBA8 target written by pixel coordinate.
pub fn create_output_texture(device: &Device, width: u32, height: u32) -> Result<Texture> {
    check_texture_size(width, height)?;
    let texture_desc = TextureDescriptor::new();
    texture_desc.set_pixel_format(MTLPixelFormat::RGBA8Uint);
    texture_desc.set_width(width as u64);
    texture_desc.set_height(height as u64);
    texture_desc.set_texture_type(MTLTextureType::D2);
    texture_desc.set_usage(MTLTextureUsage::ShaderRead | MTLTextureUsage::ShaderWrite);
    Ok(device.new_texture(&texture_desc))
}

/// Copies a texture into host memory, tightly packed.
pub fn read_texture(
    device: &Device,
    command_queue: &CommandQueue,
    texture: &TextureRef,
    width: u32,
    height: u32,
) -> Result<RgbaImage> {
    let row_bytes = width * BYTES_PER_PIXEL;
    let buffer_size = row_bytes as u64 * height as u64;

    let buffer = device.new_buffer(buffer_size, MTLResourceOptions::StorageModeShared);

    let command_buffer = command_queue.new_command_buffer();
    let blit_encoder = command_buffer.new_blit_command_encoder();
    let region = region(width, height);
    blit_encoder.copy_from_texture_to_buffer(
        texture,
        0,
        0,
        region.origin,
        region.size,
        &buffer,
        0,
        row_bytes as u64,
        buffer_size,
        MTLBlitOption::empty(),
    );
    blit_encoder.end_encoding();

    command_buffer.commit();
    command_buffer.wait_until_completed();
    if command_buffer.status() == MTLCommandBufferStatus::Error {
        return Err(Error::CommandBuffer("texture read-back failed".to_string()));
    }

    let data = unsafe {
        std::slice::from_raw_parts(buffer.contents() as *const u8, buffer_size as usize)
    };
    let actual = data.len();
    RgbaImage::from_raw(width, height, data.to_vec()).ok_or(Error::Readback {
        expected: (row_bytes * height) as usize,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn output_texture_has_integer_format() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let texture = create_output_texture(&device, 33, 7).unwrap();
        assert_eq!(texture.pixel_format(), MTLPixelFormat::RGBA8Uint);
        assert_eq!((texture.width(), texture.height()), (33, 7));
    }

    #[test]
    fn oversized_textures_are_not_allocated() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let wide = RgbaImage::new(20000, 1);
        assert!(matches!(
            create_texture(&device, &wide),
            Err(Error::ImageTooLarge { width: 20000, .. })
        ));
        assert!(matches!(
            create_output_texture(&device, 1, 16385),
            Err(Error::ImageTooLarge { height: 16385, .. })
        ));
    }

    #[test]
    fn upload_then_read_back_is_lossless() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let queue = device.new_command_queue();
        let img = RgbaImage::from_fn(19, 5, |x, y| Rgba([x as u8, y as u8, (x * y) as u8, 255]));

        let texture = create_texture(&device, &img).unwrap();
        let back = read_texture(&device, &queue, &texture, 19, 5).unwrap();
        assert_eq!(back, img);
    }
}
