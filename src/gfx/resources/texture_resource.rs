//! Texture resource management for wgpu
//!
//! Depth buffers plus the decoded surface maps (diffuse, normal, specular)
//! applied to the model.

use std::path::Path;

use log::debug;

use crate::{
    config::TexturePaths,
    error::{Result, ViewerError},
};

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Decoded 8-bit RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    /// Expands to RGBA with opaque alpha, the layout the GPU upload needs
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
            .collect()
    }
}

/// Decodes an image file into RGB bytes
pub fn decode_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(|source| ViewerError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = image.to_rgb8();
    debug!("Decoded {} ({}x{})", path.display(), rgb.width(), rgb.height());
    Ok(RgbImage {
        width: rgb.width(),
        height: rgb.height(),
        pixels: rgb.into_raw(),
    })
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an RGB image as an RGBA texture with repeating, linearly
    /// filtered sampling
    pub fn create_from_rgb(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbImage,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.to_rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// The three maps sampled by the fragment stage
pub struct SurfaceMaps {
    pub diffuse: TextureResource,
    pub normal: TextureResource,
    pub specular: TextureResource,
}

impl SurfaceMaps {
    /// Decodes and uploads all three maps; any decode failure is fatal
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, paths: &TexturePaths) -> Result<Self> {
        let diffuse = decode_rgb(&paths.diffuse)?;
        let normal = decode_rgb(&paths.normal)?;
        let specular = decode_rgb(&paths.specular)?;

        Ok(Self {
            // colour data is sRGB encoded, normals and specular intensity are linear
            diffuse: TextureResource::create_from_rgb(
                device,
                queue,
                &diffuse,
                wgpu::TextureFormat::Rgba8UnormSrgb,
                "Diffuse Map",
            ),
            normal: TextureResource::create_from_rgb(
                device,
                queue,
                &normal,
                wgpu::TextureFormat::Rgba8Unorm,
                "Normal Map",
            ),
            specular: TextureResource::create_from_rgb(
                device,
                queue,
                &specular,
                wgpu::TextureFormat::Rgba8Unorm,
                "Specular Map",
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba_adds_opaque_alpha() {
        let image = RgbImage {
            width: 2,
            height: 1,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(image.to_rgba(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_decode_missing_file_is_decode_error() {
        let err = decode_rgb(Path::new("no/such/texture.png")).unwrap_err();
        assert!(matches!(err, ViewerError::Decode { .. }));
    }

    #[test]
    fn test_decode_round_trip() {
        let path = std::env::temp_dir().join(format!("tessview-decode-{}.png", std::process::id()));
        let source = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        source.save(&path).unwrap();

        let decoded = decode_rgb(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels.len(), 18);
        // pixel (2, 1)
        assert_eq!(&decoded.pixels[15..18], &[2, 1, 7]);
    }
}
