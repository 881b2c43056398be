use std::path::Path;

use cubebench_core::device::{AddressMode, FilterMode, TextureConfig};
use cubebench_core::error::ResourceError;

/// Decoded pixels, always RGBA8.
#[derive(Debug)]
pub(crate) struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Reads an image file and converts it to RGBA8.
///
/// Grey, RGB and RGBA sources are accepted. `flip` mirrors rows so the first
/// row in memory is the bottom of the image.
pub(crate) fn decode_texture(path: &Path, flip: bool) -> Result<DecodedImage, ResourceError> {
    let image = image::open(path).map_err(|e| ResourceError::TextureLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let channels = image.color().channel_count();
    if !matches!(channels, 1 | 3 | 4) {
        return Err(ResourceError::UnsupportedChannels {
            path: path.to_path_buf(),
            channels,
        });
    }

    let image = if flip { image.flipv() } else { image };
    let rgba = image.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// A sampled texture and the bind group exposing it to one texture unit.
pub(crate) struct GpuTexture {
    pub label: String,
    _texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

impl GpuTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        image: &DecodedImage,
        config: &TextureConfig,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
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
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Single mip level, so the mipmap filter never applies.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode(config.wrap_s),
            address_mode_v: address_mode(config.wrap_t),
            mag_filter: filter_mode(config.mag_filter),
            min_filter: filter_mode(config.min_filter),
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            label: label.to_string(),
            _texture: texture,
            bind_group,
        }
    }

    /// 1x1 opaque white, bound to units with no texture.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) -> Self {
        let image = DecodedImage {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        };
        Self::upload(
            device,
            queue,
            layout,
            "cubebench fallback texture",
            &image,
            &TextureConfig::default(),
        )
    }
}

/// Layout for one texture unit: texture at binding 0, sampler at binding 1.
pub(crate) fn texture_unit_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("cubebench texture unit"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn crate_png() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/textures/crate.png")
    }

    #[test]
    fn decodes_shipped_texture_to_rgba() {
        let image = decode_texture(&crate_png(), false).unwrap();
        assert_eq!((image.width, image.height), (64, 64));
        assert_eq!(image.rgba.len(), 64 * 64 * 4);
        assert!(image.rgba.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn flip_reverses_rows() {
        let upright = decode_texture(&crate_png(), false).unwrap();
        let flipped = decode_texture(&crate_png(), true).unwrap();
        let row = 64 * 4;
        let last = upright.rgba.len() - row;
        assert_eq!(&flipped.rgba[..row], &upright.rgba[last..]);
        assert_eq!(&flipped.rgba[last..], &upright.rgba[..row]);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = decode_texture(Path::new("no/such/texture.png"), true).unwrap_err();
        assert!(matches!(err, ResourceError::TextureLoad { .. }), "{err}");
    }

    #[test]
    fn grey_alpha_is_rejected() {
        let path = std::env::temp_dir().join(format!("cubebench-la-{}.png", std::process::id()));
        image::GrayAlphaImage::new(2, 2).save(&path).unwrap();
        let err = decode_texture(&path, true).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(
            matches!(err, ResourceError::UnsupportedChannels { channels: 2, .. }),
            "{err}"
        );
    }

    #[test]
    fn sampler_modes_map_one_to_one() {
        assert_eq!(address_mode(AddressMode::ClampToEdge), wgpu::AddressMode::ClampToEdge);
        assert_eq!(address_mode(AddressMode::MirrorRepeat), wgpu::AddressMode::MirrorRepeat);
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
    }
}
