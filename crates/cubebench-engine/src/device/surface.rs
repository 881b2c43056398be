/// Picks the surface format, preferring sRGB when asked.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        if let Some(f) = formats.iter().copied().find(|f| f.is_srgb()) {
            return Some(f);
        }
    }
    formats.first().copied()
}

/// Falls back to `Fifo`, which every surface supports.
pub(crate) fn choose_present_mode(
    modes: &[wgpu::PresentMode],
    wanted: wgpu::PresentMode,
) -> wgpu::PresentMode {
    match wanted {
        // Auto* modes resolve inside wgpu.
        wgpu::PresentMode::AutoVsync | wgpu::PresentMode::AutoNoVsync => wanted,
        mode if modes.contains(&mode) => mode,
        mode => {
            log::warn!("present mode {mode:?} unsupported, using Fifo");
            wgpu::PresentMode::Fifo
        }
    }
}
