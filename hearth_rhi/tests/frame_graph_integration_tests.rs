//! Integration tests for frame graph execution on the headless backend
//!
//! A frame renders offscreen into a pooled transient and presents it on the
//! window of another context, the way a multi-window tool would.
//!
//! Run with: cargo test --test frame_graph_integration_tests

mod headless_test_utils;

use std::cell::Cell;
use std::sync::Arc;
use hearth_rhi::hearth::driver::{ContextId, SurfaceInfo};
use hearth_rhi::hearth::frame_graph::{FrameGraph, FrameGraphExecutor, PassTarget, RenderPassStep};
use hearth_rhi::hearth::render::{AttachmentDesc, ClearValue, Pipeline, PipelineDesc, RenderPass, RenderPassDesc, SubpassDesc};
use hearth_rhi::hearth::resource::{SamplerDesc, TextureDesc, TextureFormat};
use hearth_rhi::hearth::{DeviceConfig, Error};
use hearth_rhi_headless::{Command, ObjectKind};
use headless_test_utils::HeadlessSetup;

fn color_pass(setup: &HeadlessSetup) -> Arc<RenderPass> {
    setup.render_pass(RenderPassDesc {
        attachments: vec![AttachmentDesc::cleared(TextureFormat::Rgba8Unorm, ClearValue::Color([0.1, 0.2, 0.3, 1.0]))],
        subpasses: vec![SubpassDesc::new(&[0])],
    })
}

fn scene_desc() -> TextureDesc {
    TextureDesc::render_target(TextureFormat::Rgba8Unorm, 256, 256)
}

/// Offscreen pass into a transient, then a window pass on `present_on` sampling it
fn build_frame<'a>(
    graph: &mut FrameGraph<'a>,
    pass: &Arc<RenderPass>,
    draw: &'a Arc<Pipeline>,
    present: &'a Arc<Pipeline>,
    present_on: ContextId,
) {
    let scene = graph.create_texture("scene", scene_desc());
    graph.add_render_pass(
        "scene",
        RenderPassStep::new(pass, PassTarget::resources(&[scene])).subpass(move |ctx, _| {
            ctx.bind_pipeline(draw);
            ctx.draw(36, 1, 0, 0);
            Ok(())
        }),
    );
    graph.add_render_pass(
        "present",
        RenderPassStep::new(pass, PassTarget::ContextFramebuffer(present_on))
            .reads(&[scene])
            .subpass(move |ctx, res| {
                let texture = res.texture(scene).ok_or_else(|| Error::InvalidResource("scene".to_string()))?;
                ctx.resource_table_mut().set_texture(0, texture);
                ctx.bind_pipeline(present);
                ctx.draw(3, 1, 0, 0);
                Ok(())
            }),
    );
    graph.compute_lifetimes();
}

// ============================================================================
// FRAME EXECUTION
// ============================================================================

#[test]
fn test_integration_offscreen_frame_presented_on_second_window() {
    let mut setup = HeadlessSetup::new();
    let pass = color_pass(&setup);
    let draw = setup.pipeline(PipelineDesc::default());
    let present = setup.pipeline(PipelineDesc { samplers: vec![(0, SamplerDesc::default())], ..Default::default() });
    let mut window = setup
        .device
        .create_context(Some(SurfaceInfo { width: 640, height: 480 }))
        .unwrap();
    let mut executor = FrameGraphExecutor::new();

    let mut graph = FrameGraph::new();
    build_frame(&mut graph, &pass, &draw, &present, window.id());
    executor
        .execute(&setup.device, &mut graph, &mut setup.ctx, &mut [&mut window])
        .unwrap();
    drop(graph);

    let main = setup.ctx.id();
    let commands = setup.monitor.commands();
    assert_eq!(commands.len(), 4);
    assert!(matches!(commands[0], Command::ClearColor { context, framebuffer, .. } if context == main && framebuffer != 0));
    assert!(matches!(commands[1], Command::Draw { context, instances: Some(1), .. } if context == main));
    assert!(matches!(commands[2], Command::ClearColor { context, framebuffer: 0, .. } if context == window.id()));
    assert!(matches!(commands[3], Command::Draw { context, framebuffer: 0, .. } if context == window.id()));

    assert_eq!(setup.ctx.stats().subpass_begins, 1);
    assert_eq!(window.stats().subpass_begins, 1);
    assert!(setup.monitor.call_count("bind_texture_unit") >= 1);
    assert_eq!(setup.monitor.current_context(), Some(main));
    let pool = executor.pool().stats();
    assert_eq!((pool.created, pool.active, pool.free), (1, 0, 1));
    setup.assert_clean();
}

#[test]
fn test_integration_steady_state_frames_allocate_nothing() {
    let mut setup = HeadlessSetup::new();
    let pass = color_pass(&setup);
    let draw = setup.pipeline(PipelineDesc::default());
    let present = setup.pipeline(PipelineDesc { samplers: vec![(0, SamplerDesc::default())], ..Default::default() });
    let main = setup.ctx.id();
    let mut executor = FrameGraphExecutor::new();

    let run_frame = |setup: &mut HeadlessSetup, executor: &mut FrameGraphExecutor| {
        let mut graph = FrameGraph::new();
        build_frame(&mut graph, &pass, &draw, &present, main);
        executor.execute(&setup.device, &mut graph, &mut setup.ctx, &mut []).unwrap();
    };

    run_frame(&mut setup, &mut executor);
    let textures = setup.monitor.live_objects(ObjectKind::Texture);
    let framebuffers = setup.monitor.live_objects(ObjectKind::Framebuffer);
    setup.monitor.reset_counters();

    for _ in 0..3 {
        run_frame(&mut setup, &mut executor);
    }

    assert_eq!(setup.monitor.live_objects(ObjectKind::Texture), textures);
    assert_eq!(setup.monitor.live_objects(ObjectKind::Framebuffer), framebuffers);
    assert_eq!(setup.monitor.call_count("create_texture"), 0);
    assert_eq!(setup.monitor.call_count("create_framebuffer"), 0);
    assert_eq!(executor.pool().stats().reused, 3);
    assert_eq!(executor.frames_executed(), 4);
    setup.assert_clean();
}

#[test]
fn test_integration_idle_transients_are_destroyed() {
    let mut setup = HeadlessSetup::with_config(
        DeviceConfig::default()
            .with_main_surface(800, 600)
            .with_transient_max_idle_frames(1),
    );
    let pass = color_pass(&setup);
    let mut executor = FrameGraphExecutor::new();

    let mut graph = FrameGraph::new();
    let scratch = graph.create_texture("scratch", scene_desc());
    graph.add_render_pass("scratch", RenderPassStep::new(&pass, PassTarget::resources(&[scratch])));
    graph.compute_lifetimes();
    executor.execute(&setup.device, &mut graph, &mut setup.ctx, &mut []).unwrap();
    drop(graph);
    assert_eq!(setup.monitor.live_objects(ObjectKind::Texture), 1);

    executor.execute(&setup.device, &mut FrameGraph::new(), &mut setup.ctx, &mut []).unwrap();
    setup.device.collect_garbage();
    assert_eq!(setup.monitor.live_objects(ObjectKind::Texture), 0);

    // The framebuffer built on the trimmed texture goes at the next frame start
    executor.execute(&setup.device, &mut FrameGraph::new(), &mut setup.ctx, &mut []).unwrap();
    assert_eq!(setup.ctx.cached_framebuffer_count(), 0);
    assert_eq!(setup.monitor.live_objects(ObjectKind::Framebuffer), 0);
    setup.assert_clean();
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_integration_failing_subpass_ends_pass_and_frame() {
    let mut setup = HeadlessSetup::new();
    let pass = color_pass(&setup);
    let later_ran = Cell::new(false);
    let mut executor = FrameGraphExecutor::new();

    let mut graph = FrameGraph::new();
    let scene = graph.create_texture("scene", scene_desc());
    graph.add_render_pass(
        "broken",
        RenderPassStep::new(&pass, PassTarget::resources(&[scene]))
            .subpass(|_, _| Err(Error::BackendError("shader hot-reload failed".to_string()))),
    );
    graph.add_task("later", &[], |_, _| {
        later_ran.set(true);
        Ok(())
    });
    graph.compute_lifetimes();

    let result = executor.execute(&setup.device, &mut graph, &mut setup.ctx, &mut []);
    drop(graph);

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(!later_ran.get());
    assert!(!setup.ctx.is_in_render_pass());
    assert_eq!(setup.ctx.stats().subpass_ends, 1);
    assert_eq!(executor.pool().stats().active, 0);
    setup.assert_clean();
}
