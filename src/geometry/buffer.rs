use std::collections::BTreeMap;
use std::ops::Range;

use smallvec::SmallVec;
use tracing::trace;

use super::GeometryError;
use crate::platform::{
    BufferDescriptor, BufferFrequencyHint, BufferHandle, BufferUsage, Device, DeviceError,
    VertexAttribute, VertexBufferFrequency, VertexBufferLayout,
};
use crate::util::align_to;

/// CPU-side contents and layout of one vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferData {
    pub buffer_index: u32,
    pub byte_stride: u32,
    pub frequency: VertexBufferFrequency,
    pub attributes: Vec<VertexAttribute>,
    pub data: Vec<u8>,
}

impl VertexBufferData {
    pub fn record_count(&self) -> usize {
        if self.byte_stride == 0 {
            0
        } else {
            self.data.len() / self.byte_stride as usize
        }
    }

    pub fn layout(&self) -> VertexBufferLayout {
        VertexBufferLayout {
            byte_stride: self.byte_stride,
            frequency: self.frequency,
            attributes: self.attributes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GpuBuffer {
    handle: BufferHandle,
    capacity: u64,
}

#[derive(Debug)]
struct VertexBufferSlot {
    contents: VertexBufferData,
    gpu: Option<GpuBuffer>,
    dirty: Option<Range<usize>>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BufferSizingDecision {
    pub(crate) should_reallocate: bool,
}

pub(crate) fn decide_buffer_sizing(
    existing_size: Option<u64>,
    required_size: usize,
) -> BufferSizingDecision {
    let required_size = required_size as u64;
    let should_reallocate = existing_size
        .map(|size| size < required_size)
        .unwrap_or(true);

    BufferSizingDecision { should_reallocate }
}

/// Index data plus any number of vertex buffers, mirrored to device buffers on `upload`.
///
/// Edits only touch the CPU copy and widen a dirty range; `upload` reallocates a device
/// buffer when it became too small and otherwise writes the dirty range alone.
#[derive(Debug, Default)]
pub struct Geometry {
    vertex_buffers: BTreeMap<u32, VertexBufferSlot>,
    indices: Vec<u32>,
    index_gpu: Option<GpuBuffer>,
    index_dirty: bool,
    instance_count: u32,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            instance_count: 1,
            ..Self::default()
        }
    }

    pub fn set_index_buffer(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.index_dirty = true;
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn set_instance_count(&mut self, count: u32) {
        self.instance_count = count;
    }

    /// Replaces (or adds) the buffer at `data.buffer_index`. The whole buffer is re-sent on
    /// the next upload.
    pub fn set_vertex_buffer(&mut self, data: VertexBufferData) -> Result<(), GeometryError> {
        if data.byte_stride == 0 || data.data.len() % data.byte_stride as usize != 0 {
            return Err(GeometryError::MisalignedData {
                buffer_index: data.buffer_index,
                len: data.data.len(),
                stride: data.byte_stride,
            });
        }
        if let Some(attribute) = data
            .attributes
            .iter()
            .find(|a| a.byte_offset + a.format.byte_size() > data.byte_stride)
        {
            return Err(GeometryError::AttributeOutsideStride {
                shader_location: attribute.shader_location,
                stride: data.byte_stride,
            });
        }

        let len = data.data.len();
        match self.vertex_buffers.get_mut(&data.buffer_index) {
            Some(slot) => {
                slot.contents = data;
                slot.dirty = Some(0..len);
            }
            None => {
                self.vertex_buffers.insert(
                    data.buffer_index,
                    VertexBufferSlot {
                        contents: data,
                        gpu: None,
                        dirty: Some(0..len),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn vertex_buffer(&self, buffer_index: u32) -> Option<&VertexBufferData> {
        self.vertex_buffers
            .get(&buffer_index)
            .map(|slot| &slot.contents)
    }

    pub fn record_count(&self, buffer_index: u32) -> usize {
        self.vertex_buffer(buffer_index)
            .map(VertexBufferData::record_count)
            .unwrap_or(0)
    }

    /// Overwrites the bytes of one record starting at the attribute bound to
    /// `shader_location`. `bytes` may span several consecutive attributes of the record.
    pub fn update_vertex_buffer(
        &mut self,
        buffer_index: u32,
        shader_location: u32,
        record_index: usize,
        bytes: &[u8],
    ) -> Result<(), GeometryError> {
        let slot = self
            .vertex_buffers
            .get_mut(&buffer_index)
            .ok_or(GeometryError::MissingBuffer(buffer_index))?;
        let stride = slot.contents.byte_stride as usize;
        let attribute = slot
            .contents
            .attributes
            .iter()
            .find(|a| a.shader_location == shader_location)
            .ok_or(GeometryError::MissingAttribute {
                buffer_index,
                shader_location,
            })?;
        let offset_in_record = attribute.byte_offset as usize;
        if offset_in_record + bytes.len() > stride {
            return Err(GeometryError::AttributeOutsideStride {
                shader_location,
                stride: stride as u32,
            });
        }
        let records = slot.contents.record_count();
        if record_index >= records {
            return Err(GeometryError::RecordOutOfRange {
                buffer_index,
                record_index,
                records,
            });
        }

        let start = record_index * stride + offset_in_record;
        let end = start + bytes.len();
        slot.contents.data[start..end].copy_from_slice(bytes);
        slot.dirty = Some(match slot.dirty.take() {
            Some(dirty) => dirty.start.min(start)..dirty.end.max(end),
            None => start..end,
        });
        Ok(())
    }

    /// Vertex buffer layouts in binding-slot order.
    pub fn layouts(&self) -> Vec<VertexBufferLayout> {
        self.vertex_buffers
            .values()
            .map(|slot| slot.contents.layout())
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.index_dirty || self.vertex_buffers.values().any(|slot| slot.dirty.is_some())
    }

    /// Mirrors pending CPU edits to the device.
    pub fn upload<D: Device>(&mut self, device: &mut D, label: &str) -> Result<(), DeviceError> {
        for slot in self.vertex_buffers.values_mut() {
            let Some(dirty) = slot.dirty.take() else {
                continue;
            };
            let data = &slot.contents.data;
            if data.is_empty() {
                continue;
            }
            let decision = decide_buffer_sizing(slot.gpu.map(|gpu| gpu.capacity), data.len());
            if decision.should_reallocate {
                if let Some(old) = slot.gpu.take() {
                    device.destroy(old.handle.into());
                }
                let buffer = create_buffer(device, BufferUsage::Vertex, data.len(), label)?;
                device.upload_buffer_data(buffer.handle, 0, data)?;
                slot.gpu = Some(buffer);
                trace!(buffer_index = slot.contents.buffer_index, bytes = data.len(), "vertex buffer reallocated");
            } else if let Some(gpu) = slot.gpu {
                let start = (dirty.start / 4) * 4;
                let end = (align_to(dirty.end as u64, 4) as usize).min(data.len());
                device.upload_buffer_data(gpu.handle, start as u64, &data[start..end])?;
            }
        }

        if self.index_dirty && !self.indices.is_empty() {
            let bytes: &[u8] = bytemuck::cast_slice(&self.indices);
            let decision = decide_buffer_sizing(self.index_gpu.map(|gpu| gpu.capacity), bytes.len());
            if decision.should_reallocate {
                if let Some(old) = self.index_gpu.take() {
                    device.destroy(old.handle.into());
                }
                self.index_gpu = Some(create_buffer(device, BufferUsage::Index, bytes.len(), label)?);
            }
            if let Some(gpu) = self.index_gpu {
                device.upload_buffer_data(gpu.handle, 0, bytes)?;
            }
        }
        self.index_dirty = false;
        Ok(())
    }

    /// Device buffers in binding-slot order, once every buffer has been uploaded.
    pub fn gpu_vertex_buffers(&self) -> Option<SmallVec<[BufferHandle; 4]>> {
        self.vertex_buffers
            .values()
            .map(|slot| slot.gpu.map(|gpu| gpu.handle))
            .collect()
    }

    pub fn gpu_index_buffer(&self) -> Option<BufferHandle> {
        self.index_gpu.map(|gpu| gpu.handle)
    }

    /// Releases device buffers and forces a full upload if the geometry is used again.
    pub fn destroy<D: Device>(&mut self, device: &mut D) {
        for slot in self.vertex_buffers.values_mut() {
            if let Some(gpu) = slot.gpu.take() {
                device.destroy(gpu.handle.into());
            }
            slot.dirty = Some(0..slot.contents.data.len());
        }
        if let Some(gpu) = self.index_gpu.take() {
            device.destroy(gpu.handle.into());
        }
        self.index_dirty = true;
    }
}

fn create_buffer<D: Device>(
    device: &mut D,
    usage: BufferUsage,
    len: usize,
    label: &str,
) -> Result<GpuBuffer, DeviceError> {
    let capacity = align_to(len as u64, 4);
    let handle = device.create_buffer(&BufferDescriptor {
        byte_size: capacity,
        usage,
        hint: BufferFrequencyHint::Dynamic,
    })?;
    device.set_resource_name(handle.into(), label);
    Ok(GpuBuffer { handle, capacity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Format, SoftwareDevice};

    fn per_instance(records: usize) -> VertexBufferData {
        VertexBufferData {
            buffer_index: 0,
            byte_stride: 12,
            frequency: VertexBufferFrequency::PerInstance,
            attributes: vec![
                VertexAttribute {
                    format: Format::F32_RG,
                    byte_offset: 0,
                    shader_location: 0,
                },
                VertexAttribute {
                    format: Format::F32_R,
                    byte_offset: 8,
                    shader_location: 1,
                },
            ],
            data: vec![0; records * 12],
        }
    }

    #[test]
    fn decide_buffer_sizing_reallocates_when_missing() {
        let decision = decide_buffer_sizing(None, 128);
        assert!(decision.should_reallocate);
    }

    #[test]
    fn decide_buffer_sizing_reallocates_when_too_small() {
        let decision = decide_buffer_sizing(Some(64), 128);
        assert!(decision.should_reallocate);
    }

    #[test]
    fn decide_buffer_sizing_keeps_buffer_when_large_enough() {
        let decision = decide_buffer_sizing(Some(512), 128);
        assert!(!decision.should_reallocate);
    }

    #[test]
    fn misaligned_data_is_rejected() {
        let mut geometry = Geometry::new();
        let mut data = per_instance(2);
        data.data.pop();
        assert!(matches!(
            geometry.set_vertex_buffer(data),
            Err(GeometryError::MisalignedData { .. })
        ));
    }

    #[test]
    fn update_patches_only_the_addressed_record() {
        let mut geometry = Geometry::new();
        geometry.set_vertex_buffer(per_instance(3)).unwrap();
        geometry
            .update_vertex_buffer(0, 1, 1, &7.0f32.to_le_bytes())
            .unwrap();

        let data = &geometry.vertex_buffer(0).unwrap().data;
        assert_eq!(&data[20..24], &7.0f32.to_le_bytes());
        assert!(data[..20].iter().all(|b| *b == 0));
        assert!(data[24..].iter().all(|b| *b == 0));
    }

    #[test]
    fn update_past_the_last_record_is_refused() {
        let mut geometry = Geometry::new();
        geometry.set_vertex_buffer(per_instance(2)).unwrap();
        let result = geometry.update_vertex_buffer(0, 0, 2, &[0; 8]);
        assert_eq!(
            result,
            Err(GeometryError::RecordOutOfRange {
                buffer_index: 0,
                record_index: 2,
                records: 2
            })
        );
    }

    #[test]
    fn upload_writes_dirty_range_into_existing_buffer() {
        let mut device = SoftwareDevice::default();
        let mut geometry = Geometry::new();
        geometry.set_vertex_buffer(per_instance(2)).unwrap();
        geometry.set_index_buffer(vec![0, 1, 2]);
        geometry.upload(&mut device, "test").unwrap();
        assert!(!geometry.is_dirty());
        let buffer = geometry.gpu_vertex_buffers().unwrap()[0];

        geometry
            .update_vertex_buffer(0, 0, 1, bytemuck::cast_slice(&[1.0f32, 2.0]))
            .unwrap();
        geometry.upload(&mut device, "test").unwrap();

        assert_eq!(geometry.gpu_vertex_buffers().unwrap()[0], buffer);
        let contents = device.buffer_contents(buffer).unwrap();
        assert_eq!(&contents[12..20], bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0]));
    }

    #[test]
    fn growing_a_buffer_reallocates() {
        let mut device = SoftwareDevice::default();
        let mut geometry = Geometry::new();
        geometry.set_vertex_buffer(per_instance(1)).unwrap();
        geometry.upload(&mut device, "test").unwrap();
        let first = geometry.gpu_vertex_buffers().unwrap()[0];

        geometry.set_vertex_buffer(per_instance(4)).unwrap();
        geometry.upload(&mut device, "test").unwrap();
        let second = geometry.gpu_vertex_buffers().unwrap()[0];
        assert_ne!(first, second);
        assert!(device.buffer_contents(first).is_none());
    }
}
