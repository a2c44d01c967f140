//! Procedural meshes and their mirror on the device.
use tessera::geometry::{
    CubeGeometry, Geometry, PlaneGeometry, ProceduralGeometry, SphereGeometry, TorusGeometry,
    VertexBufferData, POSITION_BUFFER_INDEX,
};
use tessera::platform::{Format, SoftwareDevice, VertexAttribute, VertexBufferFrequency};
use tessera::Mat4;

#[test]
fn procedural_meshes_upload_every_buffer() {
    let mut device = SoftwareDevice::default();
    let mut sphere = ProceduralGeometry::new(SphereGeometry::new(1.0, 16, 8)).unwrap();
    sphere.geometry_mut().upload(&mut device, "sphere").unwrap();

    let geometry = sphere.geometry();
    assert!(!geometry.is_dirty());
    let buffers = geometry.gpu_vertex_buffers().unwrap();
    assert_eq!(buffers.len(), 3);
    let index_buffer = geometry.gpu_index_buffer().unwrap();
    let indices = device.buffer_contents(index_buffer).unwrap();
    assert!(indices.len() >= geometry.indices().len() * 4);
}

#[test]
fn transformed_plane_bounds_follow_the_matrix() {
    let mut plane = ProceduralGeometry::new(PlaneGeometry::new(2.0, 2.0, 1, 1)).unwrap();
    let (min, max) = plane.bounding_box().unwrap();
    assert!((max[0] - min[0] - 2.0).abs() < 1e-5);

    plane
        .apply_mat4(&Mat4::translation(10.0, 0.0, 0.0))
        .unwrap();
    let (min, max) = plane.bounding_box().unwrap();
    assert!((min[0] - 9.0).abs() < 1e-5);
    assert!((max[0] - 11.0).abs() < 1e-5);
}

#[test]
fn singular_matrix_is_rejected() {
    let mut cube = ProceduralGeometry::new(CubeGeometry::new(1.0, 1.0, 1.0)).unwrap();
    let result = cube.apply_mat4(&Mat4::scale(0.0, 1.0, 1.0));
    assert!(result.is_err());
}

#[test]
fn rebuilt_torus_keeps_its_device_buffers_when_they_fit() {
    let mut device = SoftwareDevice::default();
    let mut torus = ProceduralGeometry::new(TorusGeometry::new(2.0, 0.5, 8, 12)).unwrap();
    torus.geometry_mut().upload(&mut device, "torus").unwrap();
    let before = torus.geometry().gpu_vertex_buffers().unwrap();

    torus
        .set_source(TorusGeometry::new(3.0, 0.5, 8, 12))
        .unwrap();
    torus.geometry_mut().upload(&mut device, "torus").unwrap();
    assert_eq!(torus.geometry().gpu_vertex_buffers().unwrap(), before);
}

#[test]
fn record_update_reaches_the_device() {
    let mut device = SoftwareDevice::default();
    let mut geometry = Geometry::new();
    geometry.set_index_buffer(vec![0, 1, 2]);
    geometry
        .set_vertex_buffer(VertexBufferData {
            buffer_index: 0,
            byte_stride: 8,
            frequency: VertexBufferFrequency::PerInstance,
            attributes: vec![VertexAttribute {
                format: Format::F32_RG,
                byte_offset: 0,
                shader_location: 0,
            }],
            data: bytemuck::cast_slice(&[1.0f32, 2.0, 3.0, 4.0]).to_vec(),
        })
        .unwrap();
    geometry.set_instance_count(2);
    geometry.upload(&mut device, "records").unwrap();

    geometry
        .update_vertex_buffer(0, 0, 1, bytemuck::cast_slice(&[7.0f32, 8.0]))
        .unwrap();
    assert!(geometry.is_dirty());
    geometry.upload(&mut device, "records").unwrap();

    let buffer = geometry.gpu_vertex_buffers().unwrap()[0];
    let contents: Vec<f32> = device.buffer_contents(buffer).unwrap()[..16]
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();
    assert_eq!(contents, vec![1.0, 2.0, 7.0, 8.0]);

    assert_eq!(
        geometry.update_vertex_buffer(0, 0, 2, bytemuck::cast_slice(&[0.0f32, 0.0])),
        Err(tessera::geometry::GeometryError::RecordOutOfRange {
            buffer_index: 0,
            record_index: 2,
            records: 2,
        })
    );
}
