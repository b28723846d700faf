use log::debug;
use metal::*;

use crate::error::{Error, Result};
use crate::utils::{WORKGROUP_SIZE, workgroup_grid};

/// Runs the store kernel once over the whole image and waits for it.
///
/// The input is bound at texture 0 and the output at texture 1, matching
/// the kernel's signature.
pub fn run_compute_shader(
    command_queue: &CommandQueue,
    pipeline: &ComputePipelineStateRef,
    input_texture: &TextureRef,
    output_texture: &TextureRef,
    width: u32,
    height: u32,
) -> Result<()> {
    let threads = (WORKGROUP_SIZE * WORKGROUP_SIZE) as u64;
    let limit = pipeline.max_total_threads_per_threadgroup();
    if threads > limit {
        return Err(Error::WorkgroupTooLarge {
            requested: threads,
            limit,
        });
    }

    let command_buffer = command_queue.new_command_buffer();
    command_buffer.set_label("store image");

    let encoder = command_buffer.new_compute_command_encoder();
    encoder.set_compute_pipeline_state(pipeline);
    encoder.set_texture(0, Some(input_texture));
    encoder.set_texture(1, Some(output_texture));

    let (groups_x, groups_y) = workgroup_grid(width, height);
    let threads_per_group = MTLSize::new(WORKGROUP_SIZE as u64, WORKGROUP_SIZE as u64, 1);
    let thread_groups = MTLSize::new(groups_x as u64, groups_y as u64, 1);
    debug!("dispatching {groups_x}x{groups_y} work-groups");

    encoder.dispatch_thread_groups(thread_groups, threads_per_group);
    encoder.end_encoding();

    command_buffer.commit();
    command_buffer.wait_until_completed();

    match command_buffer.status() {
        MTLCommandBufferStatus::Completed => Ok(()),
        status => Err(Error::CommandBuffer(format!(
            "store kernel ended with status {status:?}"
        ))),
    }
}
