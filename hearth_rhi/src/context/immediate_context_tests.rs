/// Unit tests for pipeline binding, deferred vertex/resource binding and dynamic state

use super::*;
use crate::context::test_fixture::Fixture;
use crate::pipeline::{
    BufferBindingType, ComputePipelineDesc, DepthStencilStateDesc, PipelineDesc, PrimitiveTopology,
    RasterizerStateDesc, CompareOp, CullMode, VertexAttribute, VertexBufferLayout, VertexFormat,
    VertexInputRate, VertexLayoutDesc,
};
use crate::resource::{BufferUsage, SamplerDesc, ShaderStage, TextureDesc, TextureFormat};

fn layout_desc(stride: u32) -> VertexLayoutDesc {
    VertexLayoutDesc {
        buffers: vec![VertexBufferLayout { binding: 0, stride, input_rate: VertexInputRate::PerVertex }],
        attributes: vec![VertexAttribute { location: 0, binding: 0, format: VertexFormat::Float4, offset: 0 }],
    }
}

// ============================================================================
// PIPELINE BINDING
// ============================================================================

#[test]
fn test_rebinding_same_pipeline_emits_nothing() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());

    fx.ctx.bind_pipeline(&pipeline);
    fx.reset_trace();
    fx.ctx.bind_pipeline(&pipeline);

    assert!(fx.trace.calls().is_empty());
    assert_eq!(fx.ctx.stats().pipeline_binds, 1);
}

#[test]
fn test_first_bind_applies_only_non_default_state() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    fx.reset_trace();

    fx.ctx.bind_pipeline(&pipeline);

    // Back-face culling and depth testing differ from a fresh context
    assert!(fx.trace.contains(&format!("enable({:#x})", native::CULL_FACE)));
    assert!(fx.trace.contains(&format!("enable({:#x})", native::DEPTH_TEST)));
    assert_eq!(fx.trace.count("cull_face"), 0);
    assert_eq!(fx.trace.count("depth_func"), 0);
    assert_eq!(fx.trace.count("blend_func_separate_i"), 0);
    assert_eq!(fx.trace.count("create_program_pipeline"), 1);
    assert_eq!(fx.trace.count("bind_program_pipeline"), 1);
}

#[test]
fn test_pipelines_sharing_state_only_switch_programs() {
    let mut fx = Fixture::new();
    let a = fx.pipeline(PipelineDesc::default());
    let b = fx.pipeline(PipelineDesc::default());
    assert!(Arc::ptr_eq(a.blend_state(), b.blend_state()));

    fx.ctx.bind_pipeline(&a);
    fx.reset_trace();
    fx.ctx.bind_pipeline(&b);

    assert_eq!(fx.trace.count("bind_program_pipeline"), 1);
    assert_eq!(fx.trace.count("enable"), 0);
    assert_eq!(fx.trace.count("disable"), 0);
    // Only the first bind had to diff the three state groups
    assert_eq!(fx.ctx.stats().state_transitions, 3);
}

#[test]
fn test_switching_pipelines_diffs_changed_fields_only() {
    let mut fx = Fixture::new();
    let a = fx.pipeline(PipelineDesc::default());
    let b = fx.pipeline(PipelineDesc {
        depth_stencil: DepthStencilStateDesc { depth_compare: CompareOp::LessOrEqual, ..Default::default() },
        rasterizer: RasterizerStateDesc { cull_mode: CullMode::None, ..Default::default() },
        ..Default::default()
    });

    fx.ctx.bind_pipeline(&a);
    fx.reset_trace();
    fx.ctx.bind_pipeline(&b);

    assert!(fx.trace.contains(&format!("depth_func({:#x})", native::LEQUAL)));
    assert!(fx.trace.contains(&format!("disable({:#x})", native::CULL_FACE)));
    assert_eq!(fx.trace.count("depth_mask"), 0);
    assert!(!fx.trace.contains(&format!("enable({:#x})", native::DEPTH_TEST)));
}

#[test]
fn test_patch_pipeline_sets_control_points_once() {
    let mut fx = Fixture::new();
    let desc = PipelineDesc {
        tess_control: Some(fx.shader(ShaderStage::TessControl)),
        tess_evaluation: Some(fx.shader(ShaderStage::TessEvaluation)),
        topology: PrimitiveTopology::PatchList,
        patch_control_points: 4,
        ..Default::default()
    };
    let a = fx.pipeline(desc.clone());
    let b = fx.pipeline(desc);

    fx.ctx.bind_pipeline(&a);
    fx.ctx.bind_pipeline(&b);

    assert_eq!(fx.trace.find("patch_vertices"), vec!["patch_vertices(4)".to_string()]);
}

#[test]
fn test_primitive_restart_toggles_with_pipeline() {
    let mut fx = Fixture::new();
    let restart = fx.pipeline(PipelineDesc {
        topology: PrimitiveTopology::TriangleStrip,
        primitive_restart: true,
        ..Default::default()
    });
    let plain = fx.pipeline(PipelineDesc::default());

    fx.ctx.bind_pipeline(&restart);
    fx.ctx.bind_pipeline(&plain);

    assert!(fx.trace.contains(&format!("enable({:#x})", native::PRIMITIVE_RESTART_FIXED_INDEX)));
    assert!(fx.trace.contains(&format!("disable({:#x})", native::PRIMITIVE_RESTART_FIXED_INDEX)));
}

#[test]
fn test_program_pipeline_is_per_context() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let mut second = fx.device.create_context(None).unwrap();

    fx.ctx.bind_pipeline(&pipeline);
    {
        let _scope = second.activate();
        second.bind_pipeline(&pipeline);
    }

    assert_eq!(pipeline.program_pipeline_count(), 2);
    assert_eq!(fx.trace.count("create_program_pipeline"), 2);
}

// ============================================================================
// DRAWS
// ============================================================================

#[test]
fn test_zero_counts_do_nothing() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    fx.ctx.bind_pipeline(&pipeline);
    fx.reset_trace();

    fx.ctx.draw(0, 1, 0, 0);
    fx.ctx.draw(3, 0, 0, 0);
    fx.ctx.draw_indexed(0, 1, 0, 0, 0);

    assert!(fx.trace.calls().is_empty());
    assert_eq!(fx.ctx.stats().draw_calls, 0);
}

#[test]
fn test_draw_uses_pipeline_topology() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc { topology: PrimitiveTopology::LineList, ..Default::default() });
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.draw(6, 2, 3, 1);

    assert!(fx.trace.contains(&format!("draw_arrays({:#x}, 3, 6, 2, 1)", native::LINES)));
    assert_eq!(fx.ctx.stats().draw_calls, 1);
}

#[test]
fn test_vertex_buffers_attached_only_when_changed() {
    let mut fx = Fixture::new();
    let layout = fx.device.create_vertex_layout(&layout_desc(16)).unwrap();
    let pipeline = fx.pipeline(PipelineDesc { vertex_layout: Some(Arc::clone(&layout)), ..Default::default() });
    let vertices = fx.buffer(1024, BufferUsage::VERTEX);
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.bind_vertex_buffer(0, &vertices, 0);
    fx.ctx.draw(3, 1, 0, 0);
    fx.ctx.draw(3, 1, 0, 0);
    assert_eq!(fx.trace.count("vertex_array_vertex_buffer"), 1);
    assert_eq!(fx.trace.count("bind_vertex_array"), 1);

    fx.ctx.bind_vertex_buffer(0, &vertices, 64);
    fx.ctx.draw(3, 1, 0, 0);
    assert_eq!(fx.trace.count("vertex_array_vertex_buffer"), 2);
    assert_eq!(fx.ctx.stats().vertex_buffer_rebinds, 2);
    assert!(fx.trace.find("vertex_array_vertex_buffer")[1].ends_with(&format!(", 0, {}, 64, 16)", vertices.handle())));
}

#[test]
fn test_vao_remembers_buffers_across_pipelines() {
    let mut fx = Fixture::new();
    let layout = fx.device.create_vertex_layout(&layout_desc(16)).unwrap();
    let a = fx.pipeline(PipelineDesc { vertex_layout: Some(Arc::clone(&layout)), ..Default::default() });
    let b = fx.pipeline(PipelineDesc {
        vertex_layout: Some(Arc::clone(&layout)),
        topology: PrimitiveTopology::PointList,
        ..Default::default()
    });
    let vertices = fx.buffer(256, BufferUsage::VERTEX);
    fx.ctx.bind_vertex_buffer(0, &vertices, 0);

    fx.ctx.bind_pipeline(&a);
    fx.ctx.draw(3, 1, 0, 0);
    fx.ctx.bind_pipeline(&b);
    fx.ctx.draw(3, 1, 0, 0);

    assert_eq!(fx.trace.count("create_vertex_array"), 1);
    assert_eq!(fx.trace.count("vertex_array_vertex_buffer"), 1);
}

#[test]
fn test_draw_indexed_offsets_by_first_index() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let indices = fx.buffer(256, BufferUsage::INDEX);
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.bind_index_buffer(&indices, 8, IndexType::U16);

    fx.ctx.draw_indexed(6, 1, 3, -2, 0);
    fx.ctx.draw_indexed(6, 1, 3, -2, 0);

    assert!(fx.trace.contains(&format!(
        "draw_elements({:#x}, 6, {:#x}, 14, 1, -2, 0)",
        native::TRIANGLES,
        native::UNSIGNED_SHORT
    )));
    assert_eq!(fx.trace.count("vertex_array_element_buffer"), 1);
}

#[test]
fn test_layoutless_pipeline_uses_one_empty_vao() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.draw(3, 1, 0, 0);
    fx.ctx.draw(3, 1, 0, 0);

    assert_eq!(fx.trace.count("create_vertex_array"), 1);
    assert_eq!(fx.trace.count("bind_vertex_array"), 1);
}

#[test]
fn test_indirect_buffer_binding_is_filtered() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let args = fx.buffer(256, BufferUsage::INDIRECT);
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.draw_indirect(&args, 0, 2, 0);
    fx.ctx.draw_indirect(&args, 32, 1, 0);
    fx.ctx.draw_indirect(&args, 0, 0, 0);

    assert_eq!(fx.trace.find("bind_buffer"), vec![format!("bind_buffer({:#x}, {})", native::DRAW_INDIRECT_BUFFER, args.handle())]);
    assert_eq!(fx.trace.count("multi_draw_arrays_indirect"), 2);
}

#[test]
fn test_dispatch_binds_compute_resources() {
    let mut fx = Fixture::new();
    let shader = fx.shader(ShaderStage::Compute);
    let mut desc = ComputePipelineDesc::new(shader);
    desc.buffers.push((2, BufferBindingType::Storage));
    let pipeline = fx.device.create_compute_pipeline(&desc).unwrap();
    let data = fx.buffer(512, BufferUsage::STORAGE);
    fx.reset_trace();
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_buffer(2, &data, 0, 0);

    fx.ctx.dispatch(8, 4, 1);
    fx.ctx.dispatch(0, 4, 1);

    assert!(fx.trace.contains(&format!(
        "bind_buffer_range({:#x}, 2, {}, 0, 512)",
        native::SHADER_STORAGE_BUFFER,
        data.handle()
    )));
    assert_eq!(fx.trace.find("dispatch_compute"), vec!["dispatch_compute(8, 4, 1)".to_string()]);
    assert_eq!(fx.ctx.stats().dispatches, 1);
    // Compute pipelines leave graphics state alone
    assert_eq!(fx.trace.count("enable"), 0);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "without a bound graphics pipeline")]
fn test_draw_without_pipeline_asserts() {
    let mut fx = Fixture::new();
    fx.ctx.draw(3, 1, 0, 0);
}

// ============================================================================
// SHADER RESOURCES
// ============================================================================

#[test]
fn test_only_changed_texture_slots_rebind() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let a = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    let b = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    let c = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_texture(0, &a);
    fx.ctx.resource_table_mut().set_texture(1, &b);
    fx.ctx.draw(3, 1, 0, 0);
    fx.reset_trace();

    fx.ctx.resource_table_mut().set_texture(1, &c);
    fx.ctx.draw(3, 1, 0, 0);

    assert_eq!(fx.trace.find("bind_texture_unit"), vec![format!("bind_texture_unit(1, {})", c.handle())]);
}

#[test]
fn test_unchanged_table_skips_the_diff() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let texture = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_texture(0, &texture);

    fx.ctx.draw(3, 1, 0, 0);
    let rebinds = fx.ctx.stats().shader_binding_rebinds;
    fx.reset_trace();
    fx.ctx.draw(3, 1, 0, 0);

    assert_eq!(fx.ctx.stats().shader_binding_rebinds, rebinds);
    assert_eq!(fx.trace.calls(), vec![format!("draw_arrays({:#x}, 0, 3, 1, 0)", native::TRIANGLES)]);
}

#[test]
fn test_pipeline_sampler_fills_table_slot() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc { samplers: vec![(0, SamplerDesc::nearest_clamp())], ..Default::default() });
    let texture = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    let sampler = fx.device.create_sampler(&SamplerDesc::nearest_clamp()).unwrap();
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_texture(0, &texture);

    fx.ctx.draw(3, 1, 0, 0);

    assert!(fx.trace.contains(&format!("bind_sampler(0, {})", sampler.handle())));
}

#[test]
fn test_table_sampler_overrides_pipeline_sampler() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc { samplers: vec![(0, SamplerDesc::nearest_clamp())], ..Default::default() });
    let texture = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    let shadow = fx.device.create_sampler(&SamplerDesc::shadow()).unwrap();
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_texture_with_sampler(0, &texture, &shadow);

    fx.ctx.draw(3, 1, 0, 0);

    assert_eq!(fx.trace.find("bind_sampler"), vec![format!("bind_sampler(0, {})", shadow.handle())]);
}

#[test]
fn test_swapping_tables_rebinds_differences() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let texture = fx.texture(TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 4, 4));
    let uniforms = fx.buffer(256, BufferUsage::UNIFORM);
    let mut table = fx.device.create_resource_table();
    table.set_texture(0, &texture);
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.resource_table_mut().set_buffer(0, &uniforms, 0, 0);
    fx.ctx.draw(3, 1, 0, 0);
    fx.reset_trace();

    assert!(fx.ctx.bind_resource_table(table).is_none());
    fx.ctx.draw(3, 1, 0, 0);

    assert!(fx.trace.contains(&format!("bind_texture_unit(0, {})", texture.handle())));
    // Slot 0 of the user table is empty: the root table's uniform buffer is unbound
    assert!(fx.trace.contains(&format!("bind_buffer_range({:#x}, 0, 0, 0, 0)", native::UNIFORM_BUFFER)));
}

// ============================================================================
// DYNAMIC STATE
// ============================================================================

#[test]
fn test_viewport_is_flipped_for_upper_left_origin() {
    let mut fx = Fixture::new();

    fx.ctx.set_viewport(Viewport::new(10.0, 20.0, 100.0, 50.0));

    assert!(fx.trace.contains("viewport_array(0, [[10.0, 530.0, 100.0, 50.0]])"));
    assert_eq!(fx.trace.count("depth_range_array"), 0);
}

#[test]
fn test_viewport_passes_through_for_lower_left_origin() {
    let mut fx = Fixture::lower_left();

    fx.ctx.set_viewport(Viewport::new(10.0, 20.0, 100.0, 50.0));

    assert!(fx.trace.contains("viewport_array(0, [[10.0, 20.0, 100.0, 50.0]])"));
}

#[test]
fn test_scissor_flip_matches_viewport_flip() {
    let mut fx = Fixture::new();

    fx.ctx.set_scissor_indexed(2, Rect::new(0, 0, 800, 100));

    assert!(fx.trace.contains("scissor_array(2, [[0, 500, 800, 100]])"));
}

#[test]
fn test_viewport_array_sends_changed_range_only() {
    let mut fx = Fixture::lower_left();
    let v = |x: f32| Viewport::new(x, 0.0, 10.0, 10.0);
    fx.ctx.set_viewports(0, &[v(0.0), v(1.0), v(2.0), v(3.0)]);
    fx.reset_trace();

    fx.ctx.set_viewports(0, &[v(0.0), v(5.0), v(6.0), v(3.0)]);
    fx.ctx.set_viewports(0, &[v(0.0), v(5.0), v(6.0), v(3.0)]);

    assert_eq!(
        fx.trace.find("viewport_array"),
        vec!["viewport_array(1, [[5.0, 0.0, 10.0, 10.0], [6.0, 0.0, 10.0, 10.0]])".to_string()]
    );
}

#[test]
fn test_depth_range_follows_viewport() {
    let mut fx = Fixture::lower_left();
    let mut viewport = Viewport::new(0.0, 0.0, 8.0, 8.0);
    viewport.min_depth = 0.5;

    fx.ctx.set_viewport_indexed(3, viewport);

    assert!(fx.trace.contains("depth_range_array(3, [[0.5, 1.0]])"));
}

#[test]
fn test_blend_constants_and_stencil_reference_are_filtered() {
    let mut fx = Fixture::new();

    fx.ctx.set_blend_constants([0.5, 0.5, 0.5, 1.0]);
    fx.ctx.set_blend_constants([0.5, 0.5, 0.5, 1.0]);
    fx.ctx.set_stencil_reference(7);
    fx.ctx.set_stencil_reference(7);

    assert_eq!(fx.trace.count("blend_color"), 1);
    assert_eq!(fx.trace.count("stencil_func_separate"), 2);
}

// ============================================================================
// LIFETIME
// ============================================================================

#[test]
fn test_first_context_is_main_and_current() {
    let fx = Fixture::new();
    let second = fx.device.create_context(None).unwrap();

    assert!(fx.ctx.is_main());
    assert!(!second.is_main());
    assert_eq!(fx.device.driver().lock().current_context(), Some(fx.ctx.id()));
}

#[test]
fn test_dropping_context_frees_its_container_objects() {
    let fx = Fixture::new();
    let layout = fx.device.create_vertex_layout(&layout_desc(16)).unwrap();
    let pipeline = fx.pipeline(PipelineDesc { vertex_layout: Some(Arc::clone(&layout)), ..Default::default() });
    let mut second = fx.device.create_context(None).unwrap();
    let id = second.id();
    {
        let _scope = second.activate();
        second.bind_pipeline(&pipeline);
        second.draw(3, 1, 0, 0);
    }
    assert_eq!(layout.vao_count(), 1);
    assert_eq!(fx.device.context_count(), 2);
    fx.reset_trace();

    drop(second);

    assert_eq!(layout.vao_count(), 0);
    assert_eq!(pipeline.program_pipeline_count(), 0);
    assert_eq!(fx.trace.count("delete_vertex_array"), 1);
    assert_eq!(fx.trace.count("delete_program_pipeline"), 1);
    assert!(fx.trace.contains(&format!("destroy_context({})", id.0)));
    assert_eq!(fx.device.context_count(), 1);
    // The main context is current again
    assert_eq!(fx.device.driver().lock().current_context(), Some(fx.ctx.id()));
}

#[test]
fn test_dropped_pipeline_defers_program_pipeline_release() {
    let mut fx = Fixture::new();
    let pipeline = fx.pipeline(PipelineDesc::default());
    let other = fx.pipeline(PipelineDesc::default());
    fx.ctx.bind_pipeline(&pipeline);
    fx.ctx.bind_pipeline(&other);
    fx.reset_trace();

    drop(pipeline);
    assert!(fx.device.driver().pending_releases() >= 1);
    assert_eq!(fx.trace.count("delete_program_pipeline"), 0);
    fx.device.collect_garbage();

    assert_eq!(fx.trace.count("delete_program_pipeline"), 1);
}
