use bytemuck::{Pod, Zeroable};
use splat_buffer::SplatBuffer;
use splat_constants::format::COVARIANCE_SIZE_FLOATS;
use splat_pre_processing::dds_writer::{
    CENTER_COLOR_ELEMENTS_PER_TEXEL, COVARIANCE_ELEMENTS_PER_TEXEL, data_texture_size, pack_rgba,
};

/// One RGBA32UI texel: packed colour then the centre's float bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CenterColorTexel {
    pub color: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Splat attributes laid out for upload as data textures.
#[derive(Debug, Clone)]
pub struct SplatAttributeData {
    pub splat_count: usize,
    pub centers_colors: Vec<CenterColorTexel>,
    pub centers_colors_size: (u32, u32),
    /// Six floats per splat, two per texel, zero padded to the texture size.
    pub covariances: Vec<f32>,
    pub covariances_size: (u32, u32),
}

impl SplatAttributeData {
    /// Decode the buffer into texture layouts. Builds the covariance cache
    /// when it is missing.
    pub fn from_buffer(buffer: &mut SplatBuffer) -> Self {
        let splat_count = buffer.splat_count();
        if buffer.covariances().is_none() {
            buffer.build_covariance_cache();
        }

        let centers_colors_size = data_texture_size(
            splat_count * CENTER_COLOR_ELEMENTS_PER_TEXEL,
            CENTER_COLOR_ELEMENTS_PER_TEXEL,
        );
        let mut centers_colors =
            vec![CenterColorTexel::zeroed(); centers_colors_size.0 as usize * centers_colors_size.1 as usize];
        for (index, texel) in centers_colors.iter_mut().take(splat_count).enumerate() {
            let position = buffer.get_position(index);
            *texel = CenterColorTexel {
                color: pack_rgba(buffer.get_color(index)),
                x: position.x.to_bits(),
                y: position.y.to_bits(),
                z: position.z.to_bits(),
            };
        }

        let covariances_size = data_texture_size(
            splat_count * COVARIANCE_SIZE_FLOATS,
            COVARIANCE_ELEMENTS_PER_TEXEL,
        );
        let mut covariances =
            vec![0.0f32; covariances_size.0 as usize * covariances_size.1 as usize * COVARIANCE_ELEMENTS_PER_TEXEL];
        buffer.fill_covariance_array(&mut covariances);

        tracing::debug!(
            "Attribute textures: centers/colors {}x{}, covariances {}x{}",
            centers_colors_size.0,
            centers_colors_size.1,
            covariances_size.0,
            covariances_size.1
        );

        Self {
            splat_count,
            centers_colors,
            centers_colors_size,
            covariances,
            covariances_size,
        }
    }

    pub fn centers_colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.centers_colors)
    }

    pub fn covariances_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.covariances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use splat_buffer::SplatRecord;

    #[test]
    fn texels_carry_color_and_position_bits() {
        let mut buffer = SplatBuffer::unbucketed(2);
        buffer.set_splat(
            1,
            &SplatRecord::new(Vec3::new(1.5, -2.0, 3.25), Vec3::splat(0.5), Quat::IDENTITY, [10, 20, 30, 40]),
        );
        let data = SplatAttributeData::from_buffer(&mut buffer);

        assert_eq!(data.centers_colors_size, (4096, 1024));
        let texel = data.centers_colors[1];
        assert_eq!(texel.color, u32::from_le_bytes([10, 20, 30, 40]));
        assert_eq!(f32::from_bits(texel.x), 1.5);
        assert_eq!(f32::from_bits(texel.z), 3.25);

        // Isotropic 0.5 scale: diagonal variances of 0.25.
        assert!((data.covariances[6] - 0.25).abs() < 1e-6);
        assert!((data.covariances[9] - 0.25).abs() < 1e-6);
        assert_eq!(data.centers_colors_bytes().len(), 4096 * 1024 * 16);
    }
}
