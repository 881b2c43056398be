//! Screen-space overlay renderer for a [`DrawList`].
//!
//! Rectangles and glyphs are the same instanced quad: every quad samples an R8 atlas
//! and multiplies its colour by the sampled coverage. Glyphs are rasterized with
//! fontdue on first use and cached for the renderer's lifetime; rectangles sample a
//! white block reserved when the atlas is created.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use wgpu::util::DeviceExt;

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{DrawCmd, DrawList};
use crate::text::FontSystem;

const ATLAS_SIZE: u32 = 1024;
const GLYPH_PADDING: u32 = 1;
const WHITE_BLOCK: u32 = 2;

/// Shelf allocator for the glyph atlas.
///
/// Rows are filled left to right; a new row starts below the tallest glyph of the
/// current one. Once a glyph does not fit, the packer stays full.
#[derive(Debug)]
struct ShelfPacker {
    size: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
}

impl ShelfPacker {
    fn new(size: u32) -> Self {
        Self {
            size,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
            full: false,
        }
    }

    /// Top-left of a free `w`x`h` region, or `None` when the atlas is full.
    fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.full {
            return None;
        }
        if self.cursor_x + w + GLYPH_PADDING > self.size {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }
        if self.cursor_x + w + GLYPH_PADDING > self.size
            || self.cursor_y + h + GLYPH_PADDING > self.size
        {
            self.full = true;
            return None;
        }

        let origin = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(origin)
    }
}

#[derive(Debug, Copy, Clone)]
struct AtlasRegion {
    uv_min: [f32; 2],
    uv_max: [f32; 2],
}

impl AtlasRegion {
    fn new((x, y): (u32, u32), w: u32, h: u32) -> Self {
        let s = ATLAS_SIZE as f32;
        Self {
            uv_min: [x as f32 / s, y as f32 / s],
            uv_max: [(x + w) as f32 / s, (y + h) as f32 / s],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadCorner {
    corner: [f32; 2],
}

const QUAD_CORNERS: [QuadCorner; 4] = [
    QuadCorner { corner: [0.0, 0.0] },
    QuadCorner { corner: [1.0, 0.0] },
    QuadCorner { corner: [1.0, 1.0] },
    QuadCorner { corner: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

impl QuadCorner {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadCorner>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Per-quad instance data (48 bytes), positions in physical pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct QuadInstance {
    dst_min: [f32; 2],
    dst_max: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
    color: [f32; 4],
}

impl QuadInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2, // dst_min
        2 => Float32x2, // dst_max
        3 => Float32x2, // uv_min
        4 => Float32x2, // uv_max
        5 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Draws a [`DrawList`] on top of whatever the target already holds.
pub struct OverlayRenderer {
    pipeline_format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,

    atlas: wgpu::Texture,
    packer: ShelfPacker,
    glyphs: HashMap<GlyphRasterConfig, AtlasRegion>,
    white: AtlasRegion,
    warned_full: bool,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    layout: Layout<()>,
    instances: Vec<QuadInstance>,
}

impl OverlayRenderer {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let device = ctx.device;

        let atlas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cubebench overlay atlas"),
            size: wgpu::Extent3d {
                width: ATLAS_SIZE,
                height: ATLAS_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let atlas_view = atlas.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cubebench overlay sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cubebench overlay viewport"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cubebench overlay bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ViewportUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cubebench overlay bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline = create_pipeline(device, &bind_group_layout, ctx.surface_format);

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cubebench overlay quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cubebench overlay quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Rectangles sample the centre of this block; bilinear taps stay inside it.
        let mut packer = ShelfPacker::new(ATLAS_SIZE);
        let white_origin = packer
            .place(WHITE_BLOCK, WHITE_BLOCK)
            .unwrap_or((GLYPH_PADDING, GLYPH_PADDING));
        let white_texels = [u8::MAX; (WHITE_BLOCK * WHITE_BLOCK) as usize];
        write_region(ctx.queue, &atlas, white_origin, WHITE_BLOCK, WHITE_BLOCK, &white_texels);
        let centre = [
            (white_origin.0 as f32 + WHITE_BLOCK as f32 * 0.5) / ATLAS_SIZE as f32,
            (white_origin.1 as f32 + WHITE_BLOCK as f32 * 0.5) / ATLAS_SIZE as f32,
        ];

        Self {
            pipeline_format: ctx.surface_format,
            pipeline,
            bind_group_layout,
            bind_group,
            viewport_ubo,
            atlas,
            packer,
            glyphs: HashMap::new(),
            white: AtlasRegion {
                uv_min: centre,
                uv_max: centre,
            },
            warned_full: false,
            quad_vbo,
            quad_ibo,
            instance_vbo: None,
            instance_capacity: 0,
            layout: Layout::new(CoordinateSystem::PositiveYDown),
            instances: Vec::new(),
        }
    }

    /// Draws `list` over `target`. Returns the number of quads drawn.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        list: &DrawList,
        fonts: &FontSystem,
    ) -> usize {
        let (width, height) = ctx.surface_size;
        if list.is_empty() || width == 0 || height == 0 {
            return 0;
        }
        if ctx.surface_format != self.pipeline_format {
            self.pipeline = create_pipeline(ctx.device, &self.bind_group_layout, ctx.surface_format);
            self.pipeline_format = ctx.surface_format;
        }

        self.instances.clear();
        let scale = ctx.scale_factor.max(0.01);
        for cmd in list.iter() {
            match cmd {
                DrawCmd::Rect { rect, color } => self.instances.push(QuadInstance {
                    dst_min: [rect.x * scale, rect.y * scale],
                    dst_max: [rect.right() * scale, rect.bottom() * scale],
                    uv_min: self.white.uv_min,
                    uv_max: self.white.uv_max,
                    color: color.premultiplied(),
                }),
                DrawCmd::Text {
                    text,
                    font,
                    size,
                    color,
                    origin,
                } => {
                    let Some(font) = fonts.get(*font) else {
                        log::trace!("overlay text with unknown font {font:?} skipped");
                        continue;
                    };
                    self.push_text(ctx, font, text, *size * scale, *origin, scale, color.premultiplied());
                }
            }
        }
        if self.instances.is_empty() {
            return 0;
        }

        let viewport = ViewportUniform {
            size: [width as f32, height as f32],
            _pad: [0.0; 2],
        };
        ctx.queue
            .write_buffer(&self.viewport_ubo, 0, bytemuck::bytes_of(&viewport));
        self.ensure_instance_capacity(ctx.device, self.instances.len());
        let Some(instance_vbo) = self.instance_vbo.as_ref() else {
            return 0;
        };
        ctx.queue
            .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&self.instances));

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cubebench overlay"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        pass.set_vertex_buffer(1, instance_vbo.slice(..));
        pass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.instances.len() as u32);

        self.instances.len()
    }

    #[allow(clippy::too_many_arguments)]
    fn push_text(
        &mut self,
        ctx: &RenderCtx<'_>,
        font: &fontdue::Font,
        text: &str,
        px: f32,
        origin: (f32, f32),
        scale: f32,
        color: [f32; 4],
    ) {
        self.layout.reset(&LayoutSettings {
            x: (origin.0 * scale).round(),
            y: (origin.1 * scale).round(),
            ..LayoutSettings::default()
        });
        self.layout.append(&[font], &TextStyle::new(text, px, 0));

        // Snapshot so the layout borrow ends before the atlas is mutated.
        let placed: Vec<(GlyphRasterConfig, f32, f32, usize, usize)> = self
            .layout
            .glyphs()
            .iter()
            .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
            .map(|g| (g.key, g.x, g.y, g.width, g.height))
            .collect();

        for (key, x, y, w, h) in placed {
            let Some(region) = self.glyph_region(ctx, font, key) else {
                continue;
            };
            self.instances.push(QuadInstance {
                dst_min: [x, y],
                dst_max: [x + w as f32, y + h as f32],
                uv_min: region.uv_min,
                uv_max: region.uv_max,
                color,
            });
        }
    }

    fn glyph_region(
        &mut self,
        ctx: &RenderCtx<'_>,
        font: &fontdue::Font,
        key: GlyphRasterConfig,
    ) -> Option<AtlasRegion> {
        if let Some(region) = self.glyphs.get(&key) {
            return Some(*region);
        }

        let (metrics, bitmap) = font.rasterize_config(key);
        let (w, h) = (metrics.width as u32, metrics.height as u32);
        if w == 0 || h == 0 {
            return None;
        }
        let Some(origin) = self.packer.place(w, h) else {
            if !self.warned_full {
                log::warn!("overlay glyph atlas is full ({ATLAS_SIZE}x{ATLAS_SIZE})");
                self.warned_full = true;
            }
            return None;
        };

        write_region(ctx.queue, &self.atlas, origin, w, h, &bitmap);
        let region = AtlasRegion::new(origin, w, h);
        self.glyphs.insert(key, region);
        Some(region)
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(64);
        self.instance_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cubebench overlay instances"),
            size: (capacity * std::mem::size_of::<QuadInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = capacity;
    }
}

fn write_region(
    queue: &wgpu::Queue,
    atlas: &wgpu::Texture,
    (x, y): (u32, u32),
    w: u32,
    h: u32,
    texels: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: atlas,
            mip_level: 0,
            origin: wgpu::Origin3d { x, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(w),
            rows_per_image: Some(h),
        },
        wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
    );
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("cubebench overlay shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/overlay.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("cubebench overlay pipeline layout"),
        bind_group_layouts: &[bind_group_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("cubebench overlay pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadCorner::layout(), QuadInstance::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelf_packer_wraps_rows_and_fills_up() {
        let mut packer = ShelfPacker::new(16);
        assert_eq!(packer.place(6, 4), Some((1, 1)));
        assert_eq!(packer.place(6, 2), Some((8, 1)));
        // 15 + 6 + 1 > 16: next row starts below the tallest glyph.
        assert_eq!(packer.place(6, 3), Some((1, 6)));
        assert_eq!(packer.place(4, 10), None);
        assert_eq!(packer.place(1, 1), None);
    }

    #[test]
    fn oversized_glyph_never_fits() {
        let mut packer = ShelfPacker::new(16);
        assert_eq!(packer.place(20, 2), None);
    }

    #[test]
    fn instance_layout_is_48_bytes() {
        assert_eq!(std::mem::size_of::<QuadInstance>(), 48);
        let region = AtlasRegion::new((0, 512), 1024, 512);
        assert_eq!(region.uv_min, [0.0, 0.5]);
        assert_eq!(region.uv_max, [1.0, 1.0]);
    }
}
