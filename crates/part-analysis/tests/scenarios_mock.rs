//! End-to-end analysis scenarios against MockKernel.

use std::path::Path;

use approx::assert_relative_eq;
use part_analysis::{
    AnalysisConfig, AnalysisError, AnalysisOrchestrator, AnalysisRequest, DimensionPolicy,
    MeshDelivery, MeshError, MeshFormat, MeshRequest,
};
use step_kernel::{MockKernel, MockSolid, Placement, Triangulation};

const PATH: &str = "/uploads/part.step";

fn analyze(
    kernel: &mut MockKernel,
    request: AnalysisRequest<'_>,
) -> Result<part_analysis::AnalysisResult, AnalysisError> {
    AnalysisOrchestrator::default().analyze(kernel, &request, None)
}

fn request() -> AnalysisRequest<'static> {
    AnalysisRequest::new(Path::new(PATH), "part.step")
}

// ── Scenario 1: 100×50×20 steel block ──────────────────────────────────

#[test]
fn steel_block_weight() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0));
    let result = analyze(&mut kernel, request().with_material("Steel")).unwrap();

    let m = &result.metrics;
    assert_relative_eq!(m.dimensions.length, 100.0, epsilon = 1e-9);
    assert_relative_eq!(m.dimensions.width, 50.0, epsilon = 1e-9);
    assert_relative_eq!(m.dimensions.height, 20.0, epsilon = 1e-9);
    assert_relative_eq!(m.volume.volume_mm3, 100_000.0, epsilon = 1e-6);
    assert!(!m.volume.approximate);

    let record = result.to_record();
    assert_eq!(record.material, "Steel");
    assert_eq!(record.volume_mm3, 100_000.0);
    assert_eq!(record.volume_m3, 0.0001);
    assert_eq!(record.weight_kg, 0.785);
    assert!(!record.warnings.unknown_material);
    assert!(record.mesh.is_none());
    assert!(record.mesh_error.is_none());
}

#[test]
fn record_json_shape() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0));
    let result = analyze(
        &mut kernel,
        request()
            .with_material("aluminum")
            .with_mesh(MeshRequest::embedded(MeshFormat::Stl)),
    )
    .unwrap();

    let json = serde_json::to_value(result.to_record()).unwrap();
    assert_eq!(json["fileName"], "part.step");
    assert_eq!(json["rawBoundingBox"]["xmax"], 100.0);
    assert_eq!(json["dimensions_mm"]["length"], 100.0);
    assert_eq!(json["weight_kg"], 0.27);
    assert_eq!(json["approximate"], false);
    assert_eq!(json["mesh"]["format"], "stl");
    assert_eq!(json["mesh"]["encoding"], "base64");
    assert_eq!(json["warnings"]["facesSkipped"], 0);
    assert_eq!(json["warnings"]["unknownMaterial"], false);
    assert!(json.get("meshError").is_none());
}

// ── Scenario 2: offset placement ───────────────────────────────────────

#[test]
fn offset_box_keeps_raw_coordinates() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([-5.0, 10.0, 2.5], 4.0, 3.0, 2.0));
    let result = analyze(&mut kernel, request()).unwrap();
    let b = result.metrics.bounding_box;
    assert_eq!((b.xmin, b.xmax), (-5.0, -1.0));
    assert_eq!((b.ymin, b.ymax), (10.0, 13.0));
    assert_eq!((b.zmin, b.zmax), (2.5, 4.5));
    assert_relative_eq!(result.metrics.dimensions.length, 4.0, epsilon = 1e-12);
}

#[test]
fn sorted_policy_reorders_dimensions() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 20.0, 100.0, 50.0));
    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::sorted_dimensions());
    assert_eq!(
        orchestrator.config().dimension_policy,
        DimensionPolicy::SortedDescending
    );
    let result = orchestrator.analyze(&mut kernel, &request(), None).unwrap();
    let d = result.metrics.dimensions;
    assert_eq!((d.length, d.width, d.height), (100.0, 50.0, 20.0));
}

// ── Scenario 3: kernel without volume integration ──────────────────────

#[test]
fn missing_volume_falls_back_to_bounding_box() {
    let mut kernel =
        MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0).without_volume());
    let result = analyze(&mut kernel, request()).unwrap();
    assert!(result.metrics.volume.approximate);
    assert_relative_eq!(result.metrics.volume.volume_mm3, 100_000.0, epsilon = 1e-9);

    let record = result.to_record();
    assert!(record.approximate);
    assert_eq!(record.volume_mm3, 100_000.0);
    assert_eq!(record.weight_kg, 0.785);
}

// ── Scenario 4: unknown material ───────────────────────────────────────

#[test]
fn unknown_material_uses_steel_and_warns() {
    let solid = MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0);
    let mut kernel = MockKernel::with_solid(solid.clone());
    let titanium = analyze(&mut kernel, request().with_material("Titanium")).unwrap();

    let mut kernel = MockKernel::with_solid(solid);
    let steel = analyze(&mut kernel, request().with_material("steel")).unwrap();

    assert_eq!(titanium.material, "Titanium");
    assert!(titanium.warnings.unknown_material);
    assert_eq!(
        titanium.metrics.volume.weight_kg,
        steel.metrics.volume.weight_kg
    );
}

#[test]
fn configured_density_overrides_table() {
    let config = AnalysisConfig::from_json(r#"{ "densities": { "Titanium": 4500.0 } }"#).unwrap();
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0));
    let result = AnalysisOrchestrator::new(config)
        .analyze(&mut kernel, &request().with_material("titanium"), None)
        .unwrap();
    assert!(!result.warnings.unknown_material);
    assert_eq!(result.to_record().weight_kg, 0.45);
}

// ── Scenario 5: load failures ──────────────────────────────────────────

#[test]
fn reader_failure_is_model_load_error() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 1.0, 1.0, 1.0))
        .with_read_status(3);
    let err = analyze(&mut kernel, request()).unwrap_err();
    assert!(matches!(err, AnalysisError::ModelLoad { .. }));
    assert_eq!(kernel.reads(), &[Path::new(PATH).to_path_buf()]);
    assert_eq!(kernel.live_shapes(), 0);
}

#[test]
fn empty_model_is_model_load_error() {
    let mut kernel = MockKernel::with_solid(MockSolid::empty());
    let err = analyze(&mut kernel, request()).unwrap_err();
    assert!(matches!(err, AnalysisError::ModelLoad { .. }));
}

#[test]
fn untriangulated_model_without_volume_is_geometry_error() {
    // No triangulated face means the bounding box accumulates nothing.
    let solid = MockSolid::cuboid([0.0; 3], 1.0, 1.0, 1.0)
        .untriangulable()
        .without_volume();
    let mut kernel = MockKernel::with_solid(solid);
    let err = analyze(&mut kernel, request()).unwrap_err();
    assert!(matches!(err, AnalysisError::Geometry { .. }));
    assert_eq!(kernel.live_shapes(), 0);
}

// ── Scenario 6: mesh failures never discard metrics ────────────────────

#[test]
fn mesher_failure_keeps_metrics() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 100.0, 50.0, 20.0))
        .failing_tessellation();
    let result = analyze(
        &mut kernel,
        request().with_mesh(MeshRequest::embedded(MeshFormat::Glb)),
    )
    .unwrap();

    assert!(result.mesh.is_none());
    assert!(result.mesh_error.as_deref().unwrap().contains("mock mesher"));
    assert_eq!(result.to_record().weight_kg, 0.785);
    assert_eq!(kernel.live_shapes(), 0);
}

#[test]
fn corrupt_triangulation_keeps_metrics() {
    let corrupt = Triangulation {
        nodes: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        triangles: vec![[1, 2, 9]],
        placement: Placement::identity(),
    };
    let mut kernel = MockKernel::with_solid(MockSolid::from_faces(vec![Some(corrupt)]));
    let result = analyze(
        &mut kernel,
        request().with_mesh(MeshRequest::embedded(MeshFormat::Stl)),
    )
    .unwrap();
    assert!(result.mesh.is_none());
    let message = result.mesh_error.unwrap();
    assert_eq!(
        message,
        MeshError::CorruptTriangulation {
            face: step_kernel::KernelId(1),
            node: 9,
            node_count: 3,
        }
        .to_string()
    );
    assert!(result.metrics.volume.approximate);
}

// ── Scenario 7: skipped faces ──────────────────────────────────────────

#[test]
fn untriangulated_faces_are_skipped_and_counted() {
    let solid = MockSolid::cuboid([0.0; 3], 10.0, 10.0, 10.0).with_degenerate_faces(2);
    let mut kernel = MockKernel::with_solid(solid);
    let result = analyze(
        &mut kernel,
        request().with_mesh(MeshRequest::embedded(MeshFormat::Stl)),
    )
    .unwrap();

    let mesh = result.mesh.unwrap();
    assert_eq!(mesh.vertex_count, 24);
    assert_eq!(mesh.triangle_count, 12);
    assert_eq!(result.warnings.faces_skipped, 2);
    match mesh.delivery {
        MeshDelivery::Embedded(bytes) => assert_eq!(bytes.len(), 84 + 12 * 50),
        other => panic!("expected embedded mesh, got {other:?}"),
    }
}

#[test]
fn ascii_stl_can_be_requested() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 10.0, 10.0, 10.0));
    let result = analyze(
        &mut kernel,
        request().with_mesh(MeshRequest::embedded(MeshFormat::StlAscii)),
    )
    .unwrap();

    let mesh = result.mesh.clone().unwrap();
    assert_eq!(mesh.format, MeshFormat::StlAscii);
    let MeshDelivery::Embedded(bytes) = mesh.delivery else {
        panic!("expected embedded mesh");
    };
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("solid part\n"));
    assert_eq!(text.matches("endfacet").count(), 12);

    let json = serde_json::to_value(result.to_record()).unwrap();
    assert_eq!(json["mesh"]["format"], "stl-ascii");
}

// ── Scenario 8: repeated analysis on one kernel ────────────────────────

#[test]
fn kernel_is_reusable_across_requests() {
    let mut kernel = MockKernel::with_solid(MockSolid::cuboid([0.0; 3], 1.0, 2.0, 3.0));
    let orchestrator = AnalysisOrchestrator::default();
    for _ in 0..3 {
        let result = orchestrator
            .analyze(
                &mut kernel,
                &request().with_mesh(MeshRequest::embedded(MeshFormat::Glb)),
                None,
            )
            .unwrap();
        assert!(result.mesh.is_some());
        assert_eq!(kernel.live_shapes(), 0);
    }
    assert_eq!(kernel.reads().len(), 3);
}
