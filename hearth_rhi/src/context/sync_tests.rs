/// Unit tests for queries, transform feedback and synchronization

use super::*;
use crate::context::test_fixture::Fixture;
use crate::pipeline::{PipelineDesc, PrimitiveTopology};
use crate::resource::{BufferUsage, TransformFeedbackBinding};

fn capture(fx: &Fixture) -> Arc<TransformFeedback> {
    let buffer = fx.buffer(4096, BufferUsage::TRANSFORM_FEEDBACK);
    fx.device
        .create_transform_feedback(&[TransformFeedbackBinding { buffer, offset: 0, size: 4096 }])
        .unwrap()
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn test_query_begin_end_pairs() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::Occlusion, 2).unwrap();

    fx.ctx.begin_query(&pool, 1);
    fx.ctx.end_query(&pool, 1);

    assert_eq!(
        fx.trace.find("begin_query"),
        vec![format!("begin_query({:#x}, {})", native::SAMPLES_PASSED, pool.query(1))]
    );
    assert_eq!(fx.trace.find("end_query"), vec![format!("end_query({:#x})", native::SAMPLES_PASSED)]);
    assert!(fx.ctx.active_queries.is_empty());
}

#[test]
fn test_queries_of_different_types_nest() {
    let mut fx = Fixture::new();
    let occlusion = fx.device.create_query_pool(QueryType::Occlusion, 1).unwrap();
    let elapsed = fx.device.create_query_pool(QueryType::TimeElapsed, 1).unwrap();

    fx.ctx.begin_query(&elapsed, 0);
    fx.ctx.begin_query(&occlusion, 0);
    fx.ctx.end_query(&occlusion, 0);
    fx.ctx.end_query(&elapsed, 0);

    assert_eq!(fx.trace.count("begin_query"), 2);
    assert_eq!(fx.trace.count("end_query"), 2);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "already active")]
fn test_second_query_of_same_type_asserts() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::PrimitivesGenerated, 2).unwrap();

    fx.ctx.begin_query(&pool, 0);
    fx.ctx.begin_query(&pool, 1);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "without a matching begin_query")]
fn test_unmatched_end_query_asserts() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::Occlusion, 1).unwrap();

    fx.ctx.end_query(&pool, 0);
}

#[test]
fn test_timestamps_use_query_counter() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::Timestamp, 2).unwrap();

    fx.ctx.write_timestamp(&pool, 0);
    fx.ctx.write_timestamp(&pool, 1);

    assert_eq!(
        fx.trace.find("query_counter"),
        vec![
            format!("query_counter({}, {:#x})", pool.query(0), native::TIMESTAMP),
            format!("query_counter({}, {:#x})", pool.query(1), native::TIMESTAMP),
        ]
    );
}

#[test]
fn test_query_results_read_on_cpu() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::Timestamp, 3).unwrap();
    let mut out = [0u64; 2];

    assert!(fx.ctx.get_query_results(&pool, 1, &mut out, true));

    assert_eq!(out, [u64::from(pool.query(1)) * 10, u64::from(pool.query(2)) * 10]);
    assert!(fx.trace.contains(&format!("get_query_object_u64({}, {:#x})", pool.query(1), native::QUERY_RESULT)));
}

#[test]
fn test_query_results_copied_into_buffer() {
    let mut fx = Fixture::new();
    let pool = fx.device.create_query_pool(QueryType::Occlusion, 4).unwrap();
    let results = fx.buffer(64, BufferUsage::QUERY_RESULT);

    fx.ctx.copy_query_results(&pool, 0, 3, &results, 16, false);

    let calls = fx.trace.find("get_query_buffer_object_u64");
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[2],
        format!(
            "get_query_buffer_object_u64({}, {}, {:#x}, 32)",
            pool.query(2),
            results.handle(),
            native::QUERY_RESULT_NO_WAIT
        )
    );
}

// ============================================================================
// TRANSFORM FEEDBACK
// ============================================================================

#[test]
fn test_capture_mode_follows_topology_class() {
    assert_eq!(capture_mode(native::TRIANGLE_STRIP), Some(native::TRIANGLES));
    assert_eq!(capture_mode(native::LINE_LOOP), Some(native::LINES));
    assert_eq!(capture_mode(native::POINTS), Some(native::POINTS));
    assert_eq!(capture_mode(native::PATCHES), None);
    assert_eq!(capture_mode(native::TRIANGLES_ADJACENCY), None);
}

#[test]
fn test_transform_feedback_lifecycle() {
    let mut fx = Fixture::new();
    let xfb = capture(&fx);
    let pipeline = fx.pipeline(PipelineDesc { topology: PrimitiveTopology::LineStrip, ..Default::default() });
    fx.ctx.bind_pipeline(&pipeline);
    fx.reset_trace();

    fx.ctx.begin_transform_feedback(&xfb);
    fx.ctx.draw(4, 1, 0, 0);
    fx.ctx.pause_transform_feedback();
    fx.ctx.resume_transform_feedback();
    fx.ctx.end_transform_feedback();
    fx.ctx.begin_transform_feedback(&xfb);
    fx.ctx.end_transform_feedback();

    assert_eq!(fx.trace.find("bind_transform_feedback"), vec![format!("bind_transform_feedback({})", xfb.handle())]);
    assert_eq!(fx.trace.find("begin_transform_feedback")[0], format!("begin_transform_feedback({:#x})", native::LINES));
    assert_eq!(fx.trace.count("pause_transform_feedback"), 1);
    assert_eq!(fx.trace.count("resume_transform_feedback"), 1);
    assert_eq!(fx.trace.count("end_transform_feedback"), 2);
    assert!(fx.ctx.transform_feedback.is_none());
}

#[test]
fn test_transform_feedback_needs_capturable_pipeline() {
    let mut fx = Fixture::new();
    let xfb = capture(&fx);

    fx.ctx.begin_transform_feedback(&xfb);

    assert_eq!(fx.trace.count("begin_transform_feedback"), 0);
    assert!(fx.ctx.transform_feedback.is_none());
}

#[test]
fn test_draw_transform_feedback_uses_pipeline_topology() {
    let mut fx = Fixture::new();
    let xfb = capture(&fx);
    let pipeline = fx.pipeline(PipelineDesc { topology: PrimitiveTopology::PointList, ..Default::default() });
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.draw_transform_feedback(&xfb, 2);
    fx.ctx.draw_transform_feedback(&xfb, 0);

    assert_eq!(
        fx.trace.find("draw_transform_feedback"),
        vec![format!("draw_transform_feedback({:#x}, {}, 2)", native::POINTS, xfb.handle())]
    );
    assert_eq!(fx.ctx.stats().draw_calls, 1);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "no paused transform feedback")]
fn test_resume_without_pause_asserts() {
    let mut fx = Fixture::new();
    let xfb = capture(&fx);
    let pipeline = fx.pipeline(PipelineDesc::default());
    fx.ctx.bind_pipeline(&pipeline);

    fx.ctx.begin_transform_feedback(&xfb);
    fx.ctx.resume_transform_feedback();
}

// ============================================================================
// SYNCHRONIZATION
// ============================================================================

#[test]
fn test_fence_wait_status_and_release() {
    let mut fx = Fixture::new();

    let fence = fx.ctx.fence_sync();
    assert_eq!(fx.ctx.client_wait(&fence, 1_000), WaitStatus::AlreadySignaled);
    fx.trace.wait_result(native::TIMEOUT_EXPIRED);
    assert_eq!(fx.ctx.client_wait(&fence, 1_000), WaitStatus::TimeoutExpired);
    assert!(fx.trace.contains(&format!("client_wait_sync({}, true, 1000)", fence.handle())));

    let sync = fence.handle();
    drop(fence);
    fx.ctx.flush();
    assert!(fx.trace.contains(&format!("delete_sync({})", sync)));
}

#[test]
fn test_server_wait_across_contexts() {
    let mut fx = Fixture::new();
    let mut second = fx.device.create_context(None).unwrap();
    let fence = fx.ctx.fence_sync();
    fx.ctx.flush();

    {
        let _scope = second.activate();
        second.server_wait(&fence);
    }

    assert!(fx.trace.contains(&format!("wait_sync({})", fence.handle())));
    assert!(fence.wait(0).is_signaled());
}

#[test]
fn test_empty_memory_barrier_is_skipped() {
    let mut fx = Fixture::new();

    fx.ctx.memory_barrier(MemoryBarriers::empty());
    fx.ctx.memory_barrier(MemoryBarriers::SHADER_STORAGE | MemoryBarriers::COMMAND);
    fx.ctx.memory_barrier(MemoryBarriers::everything());

    assert_eq!(
        fx.trace.find("memory_barrier"),
        vec![
            format!("memory_barrier({:#x})", native::SHADER_STORAGE_BARRIER_BIT | native::COMMAND_BARRIER_BIT),
            format!("memory_barrier({:#x})", native::ALL_BARRIER_BITS),
        ]
    );
}
