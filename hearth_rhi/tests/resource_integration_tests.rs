//! Integration tests for buffers, textures and queries on the headless backend
//!
//! The simulated driver keeps real buffer contents, storage accounting and
//! sparse page commitment, so data written through the context can be read
//! back and checked.
//!
//! Run with: cargo test --test resource_integration_tests

mod headless_test_utils;

use hearth_rhi::hearth::driver::{DriverCaps, Region3D};
use hearth_rhi::hearth::render::{
    AttachmentDesc, ClearValue, FramebufferTarget, MapAccess, MapFlags, PipelineDesc, RenderPassBeginInfo,
    RenderPassDesc, SubpassDesc,
};
use hearth_rhi::hearth::resource::{
    BufferDesc, BufferUsage, MemoryAccess, QueryType, SamplerDesc, TextureDesc, TextureFormat,
};
use hearth_rhi::hearth::{DeviceConfig, Error};
use hearth_rhi_headless::{HeadlessDriver, ObjectKind};
use headless_test_utils::HeadlessSetup;

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_integration_buffer_initial_data_and_updates() {
    let mut setup = HeadlessSetup::new();
    let buffer = setup
        .device
        .create_buffer(&BufferDesc::new(16, BufferUsage::STORAGE), Some(&[7u8; 8]))
        .unwrap();

    setup.ctx.write_buffer(&buffer, 8, &[1, 2, 3, 4]);
    let mut out = [0u8; 16];
    setup.ctx.read_buffer(&buffer, 0, &mut out);

    assert_eq!(out, [7, 7, 7, 7, 7, 7, 7, 7, 1, 2, 3, 4, 0, 0, 0, 0]);
    assert_eq!(setup.monitor.buffer_contents(buffer.handle()).unwrap(), out.to_vec());
    setup.assert_clean();
}

#[test]
fn test_integration_copy_and_clear_buffer() {
    let mut setup = HeadlessSetup::new();
    let src = setup
        .device
        .create_buffer(&BufferDesc::new(16, BufferUsage::TRANSFER_SRC), Some(&[1, 2, 3, 4, 5, 6, 7, 8]))
        .unwrap();
    let dst = setup
        .device
        .create_buffer(&BufferDesc::new(16, BufferUsage::TRANSFER_DST), None)
        .unwrap();

    setup.ctx.copy_buffer(&src, 0, &dst, 8, 8);
    setup.ctx.clear_buffer(&dst, 0, 4, 0x0403_0201);

    assert_eq!(
        setup.monitor.buffer_contents(dst.handle()).unwrap(),
        vec![1, 2, 3, 4, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]
    );
    setup.assert_clean();
}

#[test]
fn test_integration_upload_mapping_writes_through() {
    let mut setup = HeadlessSetup::new();
    let buffer = setup
        .device
        .create_buffer(&BufferDesc::new(32, BufferUsage::UNIFORM).with_access(MemoryAccess::Upload), None)
        .unwrap();

    let ptr = setup
        .ctx
        .map_buffer(&buffer, 16, 16, MapAccess::Write, MapFlags::INVALIDATE_RANGE)
        .unwrap();
    assert!(setup.monitor.is_mapped(buffer.handle()));
    let payload: Vec<u8> = (0..16).collect();
    unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), ptr.as_ptr(), payload.len()) };
    assert!(setup.ctx.unmap_buffer(&buffer));

    assert!(!setup.monitor.is_mapped(buffer.handle()));
    assert_eq!(&setup.monitor.buffer_contents(buffer.handle()).unwrap()[16..], payload.as_slice());
    setup.assert_clean();
}

#[test]
fn test_integration_readback_through_mapping() {
    let mut setup = HeadlessSetup::new();
    let src = setup
        .device
        .create_buffer(&BufferDesc::new(8, BufferUsage::TRANSFER_SRC), Some(&[9, 8, 7, 6, 5, 4, 3, 2]))
        .unwrap();
    let readback = setup
        .device
        .create_buffer(&BufferDesc::new(8, BufferUsage::TRANSFER_DST).with_access(MemoryAccess::Readback), None)
        .unwrap();

    setup.ctx.copy_buffer(&src, 0, &readback, 0, 8);
    let ptr = setup
        .ctx
        .map_buffer(&readback, 0, 8, MapAccess::Read, MapFlags::empty())
        .unwrap();
    let mapped = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 8) }.to_vec();
    setup.ctx.unmap_buffer(&readback);

    assert_eq!(mapped, vec![9, 8, 7, 6, 5, 4, 3, 2]);
    setup.assert_clean();
}

#[test]
fn test_integration_gpu_only_buffer_cannot_be_mapped() {
    let mut setup = HeadlessSetup::new();
    let buffer = setup
        .device
        .create_buffer(&BufferDesc::new(32, BufferUsage::STORAGE), None)
        .unwrap();

    let mapped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        setup.ctx.map_buffer(&buffer, 0, 32, MapAccess::Write, MapFlags::empty())
    }));

    // Rejected before reaching the driver: asserts in debug, `None` in release
    assert!(mapped.map_or(true, |ptr| ptr.is_none()));
    assert_eq!(setup.monitor.call_count("map_buffer_range"), 0);
}

#[test]
fn test_integration_storage_is_released_with_the_buffer() {
    let setup = HeadlessSetup::new();
    let before = setup.monitor.memory_used();
    let buffer = setup
        .device
        .create_buffer(&BufferDesc::new(4096, BufferUsage::VERTEX), None)
        .unwrap();
    let handle = buffer.handle();
    assert_eq!(setup.monitor.memory_used(), before + 4096);

    drop(buffer);
    setup.device.collect_garbage();

    assert!(!setup.monitor.is_alive(handle));
    assert_eq!(setup.monitor.memory_used(), before);
}

#[test]
fn test_integration_out_of_memory() {
    let setup = HeadlessSetup::with_driver(
        HeadlessDriver::new().with_memory_budget(64 * 1024),
        DeviceConfig::default().with_main_surface(64, 64),
    );

    let small = setup.device.create_buffer(&BufferDesc::new(1024, BufferUsage::VERTEX), None);
    let large = setup.device.create_buffer(&BufferDesc::new(1024 * 1024, BufferUsage::VERTEX), None);
    let texture = setup
        .device
        .create_texture(&TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 1024, 1024));

    assert!(small.is_ok());
    assert_eq!(large.unwrap_err(), Error::OutOfMemory);
    assert_eq!(texture.unwrap_err(), Error::OutOfMemory);
    // Failed allocations do not leak native objects
    assert_eq!(setup.monitor.live_objects(ObjectKind::Buffer), 1);
    assert_eq!(setup.monitor.live_objects(ObjectKind::Texture), 0);
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
fn test_integration_texture_storage_accounts_every_level() {
    let setup = HeadlessSetup::new();
    let before = setup.monitor.memory_used();

    let texture = setup
        .device
        .create_texture(&TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 64, 64).with_mip_levels(2))
        .unwrap();

    assert_eq!(texture.mip_levels(), 2);
    assert_eq!(setup.monitor.memory_used() - before, 64 * 64 * 4 + 32 * 32 * 4);
}

#[test]
fn test_integration_sparse_pages_commit_and_release() {
    let mut setup = HeadlessSetup::new();
    let texture = setup
        .device
        .create_sparse_texture(&TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 512, 300))
        .unwrap();
    assert!(texture.is_sparse());
    assert_eq!(texture.page_size(), Some([128, 128, 1]));
    let before = setup.monitor.memory_used();

    assert!(setup.ctx.commit_pages(&texture, 0, Region3D::rect(0, 0, 256, 128)));
    assert_eq!(setup.monitor.committed_pages(texture.handle()), 2);

    // The last row of pages ends at the texture edge
    assert!(setup.ctx.commit_pages(&texture, 0, Region3D::rect(0, 256, 128, 44)));
    assert_eq!(setup.monitor.committed_pages(texture.handle()), 3);
    assert_eq!(setup.monitor.memory_used() - before, 3 * 64 * 1024);

    assert!(setup.ctx.uncommit_pages(&texture, 0, Region3D::rect(128, 0, 128, 128)));
    assert_eq!(setup.monitor.committed_pages(texture.handle()), 2);

    // Geometry off the page grid is refused and changes nothing
    assert!(!setup.ctx.commit_pages(&texture, 0, Region3D::rect(64, 0, 128, 128)));
    assert_eq!(setup.monitor.committed_pages(texture.handle()), 2);
    assert_eq!(setup.monitor.memory_used() - before, 2 * 64 * 1024);
    setup.assert_clean();
}

#[test]
fn test_integration_bindless_handles() {
    let mut setup = HeadlessSetup::new();
    let texture = setup
        .device
        .create_texture(&TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 16, 16))
        .unwrap();
    let sampler = setup.device.create_sampler(&SamplerDesc::default()).unwrap();

    let plain = setup.ctx.texture_handle(&texture, None);
    let sampled = setup.ctx.texture_handle(&texture, Some(&sampler));

    assert!(plain.is_some());
    assert!(sampled.is_some());
    assert_ne!(plain, sampled);
    setup.assert_clean();
}

#[test]
fn test_integration_bindless_needs_driver_support() {
    let caps = DriverCaps { bindless_texture: false, ..Default::default() };
    let mut setup = HeadlessSetup::with_driver(HeadlessDriver::with_caps(caps), DeviceConfig::default());
    let texture = setup
        .device
        .create_texture(&TextureDesc::new_2d(TextureFormat::Rgba8Unorm, 16, 16))
        .unwrap();

    assert_eq!(setup.ctx.texture_handle(&texture, None), None);
    assert_eq!(setup.monitor.call_count("texture_handle"), 0);
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn test_integration_occlusion_query_counts_draws() {
    let mut setup = HeadlessSetup::new();
    let pass = setup.render_pass(RenderPassDesc {
        attachments: vec![AttachmentDesc::cleared(TextureFormat::Rgba8Unorm, ClearValue::Color([0.0; 4]))],
        subpasses: vec![SubpassDesc::new(&[0])],
    });
    let pipeline = setup.pipeline(PipelineDesc::default());
    let views = [setup.target(TextureFormat::Rgba8Unorm, 32, 32)];
    let pool = setup.device.create_query_pool(QueryType::Occlusion, 1).unwrap();

    setup.ctx
        .begin_render_pass(&RenderPassBeginInfo::new(&pass, FramebufferTarget::Attachments(&views)))
        .unwrap();
    setup.ctx.bind_pipeline(&pipeline);
    setup.ctx.begin_query(&pool, 0);
    setup.ctx.draw(3, 2, 0, 0);
    setup.ctx.end_query(&pool, 0);
    setup.ctx.end_render_pass();

    let mut samples = [0u64; 1];
    assert!(setup.ctx.get_query_results(&pool, 0, &mut samples, true));
    assert!(samples[0] > 0);
    setup.assert_clean();
}

#[test]
fn test_integration_timestamps_increase() {
    let mut setup = HeadlessSetup::new();
    let pool = setup.device.create_query_pool(QueryType::Timestamp, 2).unwrap();
    let results = setup
        .device
        .create_buffer(&BufferDesc::new(16, BufferUsage::QUERY_RESULT), None)
        .unwrap();

    setup.ctx.write_timestamp(&pool, 0);
    setup.ctx.flush();
    setup.ctx.write_timestamp(&pool, 1);
    setup.ctx.copy_query_results(&pool, 0, 2, &results, 0, true);

    let bytes = setup.monitor.buffer_contents(results.handle()).unwrap();
    let first = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let second = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    assert!(second > first);
    setup.assert_clean();
}
