use ahash::{HashMap, HashMapExt};
use tracing::debug;

use crate::camera::Camera;
use crate::material::{Defines, Material};
use crate::mesh::{build_mesh_wgsl, MeshKind};
use crate::platform::{
    BlendMode, Device, Format, PrimitiveTopology, ProgramDescriptor, ProgramHandle,
    RenderPipelineDescriptor, RenderPipelineHandle, ResourceCreationError, VertexBufferLayout,
};
use crate::util::mat4_to_columns;

/// Camera state every mesh shader reads from group 0, binding 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub padding: [f32; 2],
}

impl SceneUniforms {
    pub fn new(camera: &Camera) -> Self {
        let (width, height) = camera.size();
        Self {
            projection: mat4_to_columns(&camera.projection()),
            view: mat4_to_columns(camera.view()),
            viewport: [width, height],
            padding: [0.0; 2],
        }
    }
}

/// Attachment formats a pipeline renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineTargets {
    pub color_format: Format,
    pub depth_format: Option<Format>,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProgramKey {
    kind: MeshKind,
    defines: Defines,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramKey,
    targets: PipelineTargets,
}

/// Programs per (mesh kind, defines) and pipelines per (program, targets), created on
/// first use.
#[derive(Debug, Default)]
pub struct PipelineCache {
    programs: HashMap<ProgramKey, ProgramHandle>,
    pipelines: HashMap<PipelineKey, RenderPipelineHandle>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn program<D: Device>(
        &mut self,
        device: &mut D,
        key: &ProgramKey,
        material: &Material,
    ) -> Result<ProgramHandle, ResourceCreationError> {
        if let Some(program) = self.programs.get(key) {
            return Ok(*program);
        }
        let label = key.kind.label();
        let program = device.create_program(&ProgramDescriptor {
            label: Some(label.to_string()),
            source: material.shader_source(&build_mesh_wgsl(key.kind)),
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            bindings: key.kind.bindings(),
        })?;
        debug!(kind = label, "created program");
        self.programs.insert(key.clone(), program);
        Ok(program)
    }

    /// The pipeline drawing `kind` with `material`'s defines into `targets`.
    pub fn get_or_create<D: Device>(
        &mut self,
        device: &mut D,
        kind: MeshKind,
        material: &Material,
        vertex_buffers: Vec<VertexBufferLayout>,
        targets: PipelineTargets,
    ) -> Result<RenderPipelineHandle, ResourceCreationError> {
        let program_key = ProgramKey {
            kind,
            defines: material.defines().clone(),
        };
        let key = PipelineKey {
            program: program_key.clone(),
            targets,
        };
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(*pipeline);
        }

        let program = self.program(device, &program_key, material)?;
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(kind.label().to_string()),
            program,
            vertex_buffers,
            color_format: targets.color_format,
            depth_stencil_format: targets.depth_format,
            sample_count: targets.sample_count,
            blend: BlendMode::Alpha,
            topology: PrimitiveTopology::TriangleList,
        })?;
        debug!(kind = kind.label(), sample_count = targets.sample_count, "created pipeline");
        self.pipelines.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Drops every pipeline built for targets other than `targets`, after a resize or an
    /// msaa change.
    pub fn retain_targets<D: Device>(&mut self, device: &mut D, targets: PipelineTargets) {
        self.pipelines.retain(|key, pipeline| {
            let keep = key.targets == targets;
            if !keep {
                device.destroy((*pipeline).into());
            }
            keep
        });
    }

    pub fn destroy_all<D: Device>(&mut self, device: &mut D) {
        for (_, pipeline) in self.pipelines.drain() {
            device.destroy(pipeline.into());
        }
        for (_, program) in self.programs.drain() {
            device.destroy(program.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::CommonInstance;
    use crate::platform::{SoftwareDevice, VertexBufferFrequency};

    fn targets(sample_count: u32) -> PipelineTargets {
        PipelineTargets {
            color_format: Format::U8_RGBA_SRGB,
            depth_format: None,
            sample_count,
        }
    }

    fn layouts() -> Vec<VertexBufferLayout> {
        vec![VertexBufferLayout {
            byte_stride: CommonInstance::STRIDE,
            frequency: VertexBufferFrequency::PerInstance,
            attributes: CommonInstance::attributes(),
        }]
    }

    #[test]
    fn scene_uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
    }

    #[test]
    fn pipelines_are_shared_per_kind_and_target() {
        let mut device = SoftwareDevice::default();
        let mut cache = PipelineCache::new();
        let material = MeshKind::Sdf.material();

        let a = cache
            .get_or_create(&mut device, MeshKind::Sdf, &material, layouts(), targets(1))
            .unwrap();
        let b = cache
            .get_or_create(&mut device, MeshKind::Sdf, &material, layouts(), targets(1))
            .unwrap();
        let c = cache
            .get_or_create(&mut device, MeshKind::Sdf, &material, layouts(), targets(4))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.program_count(), 1);
        assert_eq!(cache.pipeline_count(), 2);

        cache.retain_targets(&mut device, targets(4));
        assert_eq!(cache.pipeline_count(), 1);
    }
}
