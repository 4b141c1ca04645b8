//! Texture sampler.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Anisotropy requested for every texture sampler.
pub const MAX_ANISOTROPY: f32 = 16.0;

/// [`MAX_ANISOTROPY`], lowered to what the device supports.
pub fn clamp_anisotropy(device_limit: f32) -> f32 {
    MAX_ANISOTROPY.min(device_limit).max(1.0)
}

/// Owned VkSampler.
pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Linear filtering, repeat addressing, single mip level.
    ///
    /// Anisotropy is 16x unless `max_sampler_anisotropy` (the device's
    /// `maxSamplerAnisotropy` limit) is lower.
    pub fn linear_repeat(device: Arc<Device>, max_sampler_anisotropy: f32) -> RhiResult<Self> {
        let anisotropy = clamp_anisotropy(max_sampler_anisotropy);
        let create_info = linear_repeat_info(anisotropy);
        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        debug!("Created texture sampler (anisotropy {})", anisotropy);
        Ok(Self { device, sampler })
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
    }
}

fn linear_repeat_info(max_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
    vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0)
        .anisotropy_enable(true)
        .max_anisotropy(max_anisotropy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_repeat_info() {
        let info = linear_repeat_info(MAX_ANISOTROPY);
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.anisotropy_enable, vk::TRUE);
        assert_eq!(info.max_anisotropy, 16.0);
        assert_eq!(info.unnormalized_coordinates, vk::FALSE);
    }

    #[test]
    fn test_anisotropy_follows_device_limit() {
        assert_eq!(clamp_anisotropy(16.0), 16.0);
        assert_eq!(clamp_anisotropy(64.0), 16.0);
        assert_eq!(clamp_anisotropy(8.0), 8.0);
        assert_eq!(clamp_anisotropy(0.0), 1.0);

        let info = linear_repeat_info(clamp_anisotropy(4.0));
        assert_eq!(info.max_anisotropy, 4.0);
    }
}
