//! Frame pacing: frame-in-flight slots, per-image command buffers and the
//! acquire / submit / present sequence.
//!
//! Two counts are in play and must not be mixed up:
//!
//! - [`MAX_FRAMES_IN_FLIGHT`] slots, each with its own semaphores and fence
//! - one command buffer per swapchain image, re-recorded when that image is
//!   acquired
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. Wait on the slot fence (the slot's previous submission has finished)
//! 2. Acquire an image (signals the slot's image-available semaphore)
//! 3. Wait on the fence of whichever slot last rendered that image
//! 4. Record the image's command buffer
//! 5. Reset the slot fence and submit: wait image-available at colour output,
//!    signal render-finished and the slot fence
//! 6. Present (waits on render-finished)
//! 7. Advance the slot modulo MAX_FRAMES_IN_FLIGHT
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use course_rhi::command::{CommandBuffer, CommandPool};
use course_rhi::device::Device;
use course_rhi::swapchain::Swapchain;
use course_rhi::sync::FrameSync;

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::error::{RendererError, RendererResult};

/// Which slot is current and which slot last used each swapchain image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameCursor {
    current: usize,
    slots: usize,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameCursor {
    pub fn new(slots: usize, image_count: usize) -> Self {
        Self {
            current: 0,
            slots,
            images_in_flight: vec![None; image_count],
        }
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots;
    }

    /// Marks `image_index` as rendered by the current slot.
    ///
    /// Returns the other slot that last rendered it, whose fence must be
    /// waited on before the image's resources are reused.
    pub fn claim_image(&mut self, image_index: usize) -> Option<usize> {
        let previous = self.images_in_flight[image_index].replace(self.current);
        previous.filter(|&slot| slot != self.current)
    }
}

pub struct FrameManager {
    device: Arc<Device>,
    frames: Vec<FrameSync>,
    command_buffers: Vec<CommandBuffer>,
    cursor: FrameCursor,
}

impl FrameManager {
    /// Creates [`MAX_FRAMES_IN_FLIGHT`] sync slots and `image_count` command
    /// buffers from `pool`.
    pub fn new(
        device: Arc<Device>,
        pool: &CommandPool,
        image_count: usize,
    ) -> RendererResult<Self> {
        let frames = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let command_buffers = pool
            .allocate_command_buffers(image_count as u32)?
            .into_iter()
            .map(|handle| CommandBuffer::from_handle(device.clone(), handle))
            .collect();

        info!(
            "Frame manager created: {} frames in flight, {} command buffers",
            MAX_FRAMES_IN_FLIGHT, image_count
        );

        Ok(Self {
            device,
            frames,
            command_buffers,
            cursor: FrameCursor::new(MAX_FRAMES_IN_FLIGHT, image_count),
        })
    }

    /// Blocks until the current slot's previous submission has completed.
    pub fn wait_for_frame(&self) -> RendererResult<()> {
        self.frames[self.cursor.current()]
            .draw_fence()
            .wait(u64::MAX)?;
        Ok(())
    }

    /// Acquires the next image and makes its resources safe to rewrite.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::SwapchainOutOfDate`] when the swapchain no
    /// longer matches the surface.
    pub fn acquire(&mut self, swapchain: &Swapchain) -> RendererResult<u32> {
        let frame = &self.frames[self.cursor.current()];

        let image_index = swapchain_result(
            swapchain.acquire_next_image(frame.image_available()),
            "acquire",
        )?;

        if let Some(previous) = self.cursor.claim_image(image_index as usize) {
            self.frames[previous].draw_fence().wait(u64::MAX)?;
        }

        Ok(image_index)
    }

    pub fn command_buffer(&self, image_index: u32) -> &CommandBuffer {
        &self.command_buffers[image_index as usize]
    }

    /// Submits the command buffer of `image_index`, fenced by the current slot.
    ///
    /// The slot fence is only reset here, so a failure anywhere between
    /// acquire and submit leaves it signaled.
    pub fn submit(&self, image_index: u32) -> RendererResult<()> {
        let frame = &self.frames[self.cursor.current()];
        frame.draw_fence().reset()?;

        let wait_semaphores = [frame.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished()];
        let command_buffers = [self.command_buffers[image_index as usize].handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.draw_fence().handle())?;
        }

        Ok(())
    }

    /// Presents `image_index` once rendering has finished.
    pub fn present(&self, swapchain: &Swapchain, image_index: u32) -> RendererResult<()> {
        let frame = &self.frames[self.cursor.current()];

        let presented = swapchain
            .present(
                self.device.present_queue(),
                image_index,
                frame.render_finished(),
            )
            .map(|suboptimal| ((), suboptimal));
        swapchain_result(presented, "present")
    }

    pub fn next_frame(&mut self) {
        self.cursor.advance();
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }
}

/// Maps an acquire or present result onto the renderer's error type.
///
/// Suboptimal is still a success. Out of date becomes
/// [`RendererError::SwapchainOutOfDate`]; anything else is a device error.
pub fn swapchain_result<T>(
    result: Result<(T, bool), vk::Result>,
    stage: &str,
) -> RendererResult<T> {
    match result {
        Ok((value, suboptimal)) => {
            if suboptimal {
                debug!("Swapchain suboptimal during {}", stage);
            }
            Ok(value)
        }
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(RendererError::SwapchainOutOfDate),
        Err(e) => Err(RendererError::Rhi(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suboptimal_swapchain_still_succeeds() {
        assert_eq!(swapchain_result(Ok((2u32, true)), "acquire").unwrap(), 2);
        assert_eq!(swapchain_result(Ok((1u32, false)), "acquire").unwrap(), 1);
        assert!(swapchain_result(Ok(((), true)), "present").is_ok());
    }

    #[test]
    fn test_out_of_date_swapchain_is_reported() {
        let result = swapchain_result::<u32>(Err(vk::Result::ERROR_OUT_OF_DATE_KHR), "acquire");
        assert!(matches!(result, Err(RendererError::SwapchainOutOfDate)));
    }

    #[test]
    fn test_other_swapchain_failures_are_device_errors() {
        let result = swapchain_result::<()>(Err(vk::Result::ERROR_DEVICE_LOST), "present");
        assert!(matches!(result, Err(RendererError::Rhi(_))));
    }

    #[test]
    fn test_cursor_cycles_modulo_slots() {
        let mut cursor = FrameCursor::new(MAX_FRAMES_IN_FLIGHT, 3);
        for frame in 0..10 {
            assert_eq!(cursor.current(), frame % MAX_FRAMES_IN_FLIGHT);
            cursor.advance();
        }
    }

    #[test]
    fn test_claim_unused_image() {
        let mut cursor = FrameCursor::new(2, 3);
        assert_eq!(cursor.claim_image(1), None);
    }

    #[test]
    fn test_claim_image_held_by_other_slot() {
        let mut cursor = FrameCursor::new(2, 3);
        assert_eq!(cursor.claim_image(0), None);
        cursor.advance();
        // Slot 1 gets image 0 while slot 0 may still be rendering it.
        assert_eq!(cursor.claim_image(0), Some(0));
        cursor.advance();
        assert_eq!(cursor.claim_image(0), Some(1));
    }

    #[test]
    fn test_claim_image_held_by_same_slot() {
        let mut cursor = FrameCursor::new(2, 3);
        assert_eq!(cursor.claim_image(2), None);
        cursor.advance();
        cursor.advance();
        // Same slot already waited on its own fence.
        assert_eq!(cursor.claim_image(2), None);
    }

    #[test]
    fn test_outstanding_slots_never_exceed_limit() {
        let mut cursor = FrameCursor::new(MAX_FRAMES_IN_FLIGHT, 3);
        let mut owners = std::collections::HashSet::new();
        for frame in 0..12 {
            cursor.claim_image(frame % 3);
            owners.insert(cursor.current());
            cursor.advance();
        }
        assert!(owners.len() <= MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_frame_manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameManager>();
    }
}
