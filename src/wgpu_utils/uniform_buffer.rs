use std::{marker::PhantomData, num::NonZeroU64};

fn type_name<Content>() -> &'static str {
    let type_name = std::any::type_name::<Content>();
    match type_name.rfind(':') {
        Some(pos) => &type_name[(pos + 1)..],
        None => type_name,
    }
}

/// Typed uniform buffer holding a single `Content`
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    previous_content: Vec<u8>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", type_name::<Content>())),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            content_type: PhantomData,
            previous_content: Vec::new(),
        }
    }

    /// Writes `content`, skipping the upload when nothing changed
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let new_content = bytemuck::bytes_of(&content);
        if self.previous_content == new_content {
            return;
        }
        queue.write_buffer(&self.buffer, 0, new_content);
        self.previous_content = new_content.to_vec();
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Uniform buffer with one aligned slot per draw, selected by dynamic offset
pub struct DynamicUniformBuffer<Content> {
    buffer: wgpu::Buffer,
    stride: u64,
    capacity: usize,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> DynamicUniformBuffer<Content> {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = aligned_stride(std::mem::size_of::<Content>() as u64, alignment);
        Self::with_stride(device, capacity.max(1), stride)
    }

    fn with_stride(device: &wgpu::Device, capacity: usize, stride: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("DynamicUniformBuffer: {}", type_name::<Content>())),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        DynamicUniformBuffer {
            buffer,
            stride,
            capacity,
            content_type: PhantomData,
        }
    }

    /// Uploads one slot per element of `contents`
    ///
    /// Returns true when the buffer had to be reallocated, in which case bind
    /// groups referring to it must be recreated.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, contents: &[Content]) -> bool {
        let grown = contents.len() > self.capacity;
        if grown {
            *self = Self::with_stride(device, contents.len().next_power_of_two(), self.stride);
        }
        if !contents.is_empty() {
            queue.write_buffer(&self.buffer, 0, &pack_slots(contents, self.stride));
        }
        grown
    }

    /// Dynamic offset of `slot`
    pub fn offset(&self, slot: usize) -> u32 {
        (slot as u64 * self.stride) as u32
    }

    /// Binding covering exactly one slot
    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(std::mem::size_of::<Content>() as u64),
        })
    }
}

/// Read-only storage (or vertex) buffer filled once from a slice
pub struct ArrayBuffer<Content> {
    buffer: wgpu::Buffer,
    len: usize,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> ArrayBuffer<Content> {
    pub fn new_with_data(device: &wgpu::Device, data: &[Content], usage: wgpu::BufferUsages) -> Self {
        let size = std::mem::size_of_val(data).max(std::mem::size_of::<Content>()) as u64;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("ArrayBuffer<{}>", type_name::<Content>())),
            size: aligned_stride(size, wgpu::COPY_BUFFER_ALIGNMENT),
            usage,
            mapped_at_creation: true,
        });

        let bytes: &[u8] = bytemuck::cast_slice(data);
        buffer.slice(..).get_mapped_range_mut()[..bytes.len()].copy_from_slice(bytes);
        buffer.unmap();

        ArrayBuffer {
            buffer,
            len: data.len(),
            content_type: PhantomData,
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Rounds `size` up to the next multiple of `alignment`
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// Lays `contents` out back to back with `stride` bytes per element
pub fn pack_slots<Content: bytemuck::Pod>(contents: &[Content], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; contents.len() * stride];
    for (slot, content) in contents.iter().enumerate() {
        let src = bytemuck::bytes_of(content);
        bytes[slot * stride..slot * stride + src.len()].copy_from_slice(src);
    }
    bytes
}
