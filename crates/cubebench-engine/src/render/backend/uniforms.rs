/// Smallest GPU allocation for the uniform arena.
const MIN_CAPACITY: u64 = 64 * 1024;

pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// One frame's uniform blocks packed into a single buffer.
///
/// Every draw gets its own slot, addressed by a dynamic offset at encode time.
/// The CPU copy is rebuilt each frame; the GPU buffer only grows.
pub(crate) struct UniformArena {
    alignment: u64,
    bytes: Vec<u8>,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    /// Bumped whenever `buffer` is replaced; bind groups built against an older
    /// generation are stale.
    generation: u64,
}

impl UniformArena {
    pub fn new(alignment: u32) -> Self {
        Self {
            alignment: u64::from(alignment.max(1)),
            bytes: Vec::new(),
            buffer: None,
            capacity: 0,
            generation: 0,
        }
    }

    /// Copies `block` into the next aligned slot and returns its offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = align_up(self.bytes.len() as u64, self.alignment);
        self.bytes.resize(offset as usize, 0);
        self.bytes.extend_from_slice(block);
        offset as u32
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Writes this frame's slots to the GPU, growing the buffer first if needed.
    /// Returns `false` when there is nothing to bind.
    pub fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        if self.bytes.is_empty() {
            return false;
        }

        let needed = align_up(self.len(), wgpu::COPY_BUFFER_ALIGNMENT);
        if self.buffer.is_none() || needed > self.capacity {
            let capacity = needed.next_power_of_two().max(MIN_CAPACITY);
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cubebench uniform arena"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = capacity;
            self.generation += 1;
            log::debug!("uniform arena grown to {capacity} bytes");
        }

        self.bytes.resize(needed as usize, 0);
        match self.buffer.as_ref() {
            Some(buffer) => {
                queue.write_buffer(buffer, 0, &self.bytes);
                true
            }
            None => false,
        }
    }

    /// Drops this frame's slots; the GPU buffer is kept.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}
