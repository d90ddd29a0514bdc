/// GPU attribute texture export in DDS containers
use crate::error::IngestError;
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use half::f16;
use splat_buffer::SplatBuffer;
use splat_constants::format::COVARIANCE_SIZE_FLOATS;
use std::path::{Path, PathBuf};

/// Fixed texture width; height grows in powers of two.
pub const DATA_TEXTURE_WIDTH: u32 = 4096;
pub const DATA_TEXTURE_MIN_HEIGHT: u32 = 1024;

/// Two half floats per covariance texel.
pub const COVARIANCE_ELEMENTS_PER_TEXEL: usize = 2;
/// Packed colour plus three float-bit position words per texel.
pub const CENTER_COLOR_ELEMENTS_PER_TEXEL: usize = 4;

/// Smallest `4096 x h` texture (h doubling from 1024) that holds
/// `element_count` elements at `elements_per_texel` per texel.
pub fn data_texture_size(element_count: usize, elements_per_texel: usize) -> (u32, u32) {
    let mut height = DATA_TEXTURE_MIN_HEIGHT;
    while (DATA_TEXTURE_WIDTH as usize) * (height as usize) * elements_per_texel < element_count {
        height *= 2;
    }
    (DATA_TEXTURE_WIDTH, height)
}

/// Pack an RGBA colour into one little-endian word.
pub fn pack_rgba(color: [u8; 4]) -> u32 {
    u32::from_le_bytes(color)
}

/// Paths of the textures written for one buffer.
#[derive(Debug, Clone)]
pub struct ExportedTextures {
    pub centers_colors: PathBuf,
    pub covariances: PathBuf,
    pub centers_colors_size: (u32, u32),
    pub covariances_size: (u32, u32),
}

/// Write the centers+colors (RGBA32UI) and covariance (RG16F) textures
/// next to `stem`. Builds the covariance cache when it is missing.
pub fn export_attribute_textures(
    buffer: &mut SplatBuffer,
    stem: &Path,
) -> Result<ExportedTextures, IngestError> {
    let splat_count = buffer.splat_count();
    if buffer.covariances().is_none() {
        buffer.build_covariance_cache();
    }

    let centers_colors_size =
        data_texture_size(splat_count * CENTER_COLOR_ELEMENTS_PER_TEXEL, CENTER_COLOR_ELEMENTS_PER_TEXEL);
    let mut centers_colors = vec![0u32; texel_count(centers_colors_size) * CENTER_COLOR_ELEMENTS_PER_TEXEL];
    for index in 0..splat_count {
        let base = index * CENTER_COLOR_ELEMENTS_PER_TEXEL;
        let position = buffer.get_position(index);
        centers_colors[base] = pack_rgba(buffer.get_color(index));
        centers_colors[base + 1] = position.x.to_bits();
        centers_colors[base + 2] = position.y.to_bits();
        centers_colors[base + 3] = position.z.to_bits();
    }

    let covariances_size =
        data_texture_size(splat_count * COVARIANCE_SIZE_FLOATS, COVARIANCE_ELEMENTS_PER_TEXEL);
    let mut covariances = vec![f16::ZERO; texel_count(covariances_size) * COVARIANCE_ELEMENTS_PER_TEXEL];
    if let Some(source) = buffer.covariances() {
        for (out, &value) in covariances.iter_mut().zip(source) {
            *out = f16::from_f32(value);
        }
    }

    let centers_colors_path = with_suffix(stem, "centers_colors");
    let covariances_path = with_suffix(stem, "covariances");

    write_u32_texture(
        &centers_colors_path,
        centers_colors_size,
        &centers_colors,
        DxgiFormat::R32G32B32A32_UInt,
    )?;
    write_f16_texture(
        &covariances_path,
        covariances_size,
        &covariances,
        DxgiFormat::R16G16_Float,
    )?;

    tracing::info!(
        "Saved {} (Centers+Colors RGBA32UI {}x{})",
        centers_colors_path.display(),
        centers_colors_size.0,
        centers_colors_size.1
    );
    tracing::info!(
        "Saved {} (Covariances RG16F {}x{})",
        covariances_path.display(),
        covariances_size.0,
        covariances_size.1
    );

    Ok(ExportedTextures {
        centers_colors: centers_colors_path,
        covariances: covariances_path,
        centers_colors_size,
        covariances_size,
    })
}

fn texel_count(size: (u32, u32)) -> usize {
    size.0 as usize * size.1 as usize
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let name = stem
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.with_file_name(format!("{}_{}.dds", name, suffix))
}

pub fn write_f16_texture(
    path: &Path,
    size: (u32, u32),
    data: &[f16],
    format: DxgiFormat,
) -> Result<(), IngestError> {
    let mut bytes = Vec::with_capacity(data.len() * 2);
    for &half_float in data {
        bytes.extend_from_slice(&half_float.to_bits().to_le_bytes());
    }
    write_texture(path, size, bytes, format)
}

pub fn write_u32_texture(
    path: &Path,
    size: (u32, u32),
    data: &[u32],
    format: DxgiFormat,
) -> Result<(), IngestError> {
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for &word in data {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    write_texture(path, size, bytes, format)
}

fn write_texture(
    path: &Path,
    size: (u32, u32),
    bytes: Vec<u8>,
    format: DxgiFormat,
) -> Result<(), IngestError> {
    let params = NewDxgiParams {
        height: size.1,
        width: size.0,
        depth: None,
        format,
        mipmap_levels: Some(1),
        array_layers: Some(1),
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Unknown,
    };

    let mut dds = Dds::new_dxgi(params)?;
    dds.data = bytes;
    dds.write(&mut std::fs::File::create(path)?)?;
    Ok(())
}
