//! GPU compute backend for the adjustment chain.
//!
//! One compute pipeline applies the tonal adjustment chain to an Rgba8Unorm
//! texture. The context (instance, device, queue, pipeline) is created
//! lazily on first use behind a mutex, so concurrent first requests cannot
//! double-initialize; a lost device invalidates the cached context and the
//! next call re-initializes from scratch.
//!
//! All per-invocation resources (textures, uniform buffer, staging buffer)
//! are locals of [`apply_adjustments`] and are released on every exit path,
//! including errors. Readback crosses the texture-to-buffer boundary, so it
//! goes through [`readback`] for the mandatory row-stride alignment.

pub mod readback;

use std::sync::{mpsc, Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use fstop_core::{Adjustments, PixelBuffer};

const WORKGROUP_SIZE: u32 = 16;

/// Errors from the GPU compute backend.
#[derive(Debug, Error)]
pub enum ComputeBackendError {
    /// A buffer layout violated the 256-byte row-stride contract.
    #[error(
        "row stride {bytes_per_row} violates the 256-byte copy alignment (natural row size {natural})"
    )]
    AlignmentViolation { bytes_per_row: u32, natural: u32 },

    /// The device ran out of memory for the requested textures/buffers.
    #[error("compute backend out of device memory")]
    OutOfMemory,

    /// The device was lost; the context must be re-initialized before retry.
    #[error("compute device lost")]
    DeviceLost,

    /// No usable adapter on this machine.
    #[error("no usable compute adapter available")]
    Unavailable,
}

struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

static CONTEXT: Mutex<Option<Arc<GpuContext>>> = Mutex::new(None);

/// Get the shared context, initializing it on first use.
///
/// The lock is held across initialization: concurrent first-use requests
/// serialize here instead of racing to create two devices.
fn context() -> Result<Arc<GpuContext>, ComputeBackendError> {
    let mut guard = CONTEXT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(ctx) = guard.as_ref() {
        return Ok(ctx.clone());
    }
    let ctx = Arc::new(init_context()?);
    debug!("gpu compute context initialized");
    *guard = Some(ctx.clone());
    Ok(ctx)
}

/// Drop the cached context so the next use re-initializes.
///
/// Called after a `DeviceLost`; retrying the same call on a lost device
/// cannot succeed.
pub fn invalidate_context() {
    let mut guard = CONTEXT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if guard.take().is_some() {
        warn!("gpu compute context invalidated");
    }
}

/// Whether a compute backend is usable on this machine.
pub fn is_available() -> bool {
    context().is_ok()
}

fn init_context() -> Result<GpuContext, ComputeBackendError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: None,
    }))
    .ok_or(ComputeBackendError::Unavailable)?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("fstop_adjustments_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
    ))
    .map_err(|_| ComputeBackendError::Unavailable)?;

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fstop_adjustments_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fstop_adjustments_shader"),
        source: wgpu::ShaderSource::Wgsl(ADJUSTMENTS_SHADER_SRC.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("fstop_adjustments_layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("fstop_adjustments_pipeline"),
        layout: Some(&layout),
        module: &shader,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });

    Ok(GpuContext {
        device,
        queue,
        pipeline,
        bind_group_layout,
    })
}

/// Apply the adjustment chain on the GPU.
///
/// The slider math mirrors the CPU implementation in
/// `fstop_core::adjustments`, including the per-step clamping, though the
/// two backends may differ by a rounding step per channel.
pub fn apply_adjustments(
    image: &PixelBuffer,
    adjustments: &Adjustments,
) -> Result<PixelBuffer, ComputeBackendError> {
    if image.is_empty() || adjustments.is_default() {
        return Ok(image.clone());
    }

    let ctx = context()?;

    let max_dim = ctx.device.limits().max_texture_dimension_2d;
    if image.width > max_dim || image.height > max_dim {
        return Err(ComputeBackendError::OutOfMemory);
    }

    // Everything below is scoped to this invocation; wgpu resources are
    // released when the locals drop, on success and error paths alike.
    ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

    let extent = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };

    let src_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("fstop_adjustments_src"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue.write_texture(
        src_texture.as_image_copy(),
        &image.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.bytes_per_row()),
            rows_per_image: Some(image.height),
        },
        extent,
    );

    let dst_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("fstop_adjustments_dst"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    let params: [f32; 12] = [
        image.width as f32,
        image.height as f32,
        adjustments.exposure,
        adjustments.contrast,
        adjustments.temperature,
        adjustments.tint,
        adjustments.highlights,
        adjustments.shadows,
        adjustments.whites,
        adjustments.blacks,
        adjustments.saturation,
        adjustments.vibrance,
    ];
    let params_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("fstop_adjustments_params"),
        size: std::mem::size_of_val(&params) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    ctx.queue
        .write_buffer(&params_buffer, 0, f32s_as_bytes(&params));

    let src_view = src_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let dst_view = dst_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("fstop_adjustments_bg"),
        layout: &ctx.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&src_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&dst_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params_buffer.as_entire_binding(),
            },
        ],
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("fstop_adjustments_encoder"),
        });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("fstop_adjustments_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&ctx.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            image.width.div_ceil(WORKGROUP_SIZE),
            image.height.div_ceil(WORKGROUP_SIZE),
            1,
        );
    }

    // Texture-to-buffer copy: the stride MUST be aligned or the device
    // rejects the submission outright.
    let aligned_bytes_per_row = readback::align_row_stride(image.bytes_per_row());
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("fstop_adjustments_readback"),
        size: aligned_bytes_per_row as u64 * image.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        dst_texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bytes_per_row),
                rows_per_image: Some(image.height),
            },
        },
        extent,
    );

    ctx.queue.submit([encoder.finish()]);

    if let Some(error) = pollster::block_on(ctx.device.pop_error_scope()) {
        return Err(match error {
            wgpu::Error::OutOfMemory { .. } => ComputeBackendError::OutOfMemory,
            _ => ComputeBackendError::DeviceLost,
        });
    }

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = ctx.device.poll(wgpu::Maintain::wait());

    match rx.recv() {
        Ok(Ok(())) => {}
        _ => return Err(ComputeBackendError::DeviceLost),
    }

    let mapped = slice.get_mapped_range();
    let result = readback::strip_padding(&mapped, image.width, image.height, aligned_bytes_per_row);
    drop(mapped);
    staging.unmap();

    result
}

fn f32s_as_bytes(values: &[f32]) -> &[u8] {
    // f32 has no invalid bit patterns; reinterpreting as bytes is safe.
    unsafe {
        std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values))
    }
}

// Mirrors fstop_core::adjustments: same slider order, clamp after each step.
const ADJUSTMENTS_SHADER_SRC: &str = r#"
struct Params {
    width: f32,
    height: f32,
    exposure: f32,
    contrast: f32,
    temperature: f32,
    tint: f32,
    highlights: f32,
    shadows: f32,
    whites: f32,
    blacks: f32,
    saturation: f32,
    vibrance: f32,
};

@group(0) @binding(0)
var src_tex: texture_2d<f32>;
@group(0) @binding(1)
var dst_tex: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2)
var<uniform> params: Params;

fn clamp3(v: vec3<f32>) -> vec3<f32> {
    return clamp(v, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn luma(rgb: vec3<f32>) -> f32 {
    return dot(rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
}

// smoothstep with either edge ordering
fn smooth_unit(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn saturate_around_luma(rgb: vec3<f32>, amount: f32) -> vec3<f32> {
    let gray = luma(rgb);
    let factor = 1.0 + amount / 100.0;
    return vec3<f32>(gray) + (rgb - vec3<f32>(gray)) * factor;
}

@compute @workgroup_size(16, 16, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let width = u32(params.width + 0.5);
    let height = u32(params.height + 0.5);
    if (gid.x >= width || gid.y >= height) {
        return;
    }

    let coord = vec2<i32>(i32(gid.x), i32(gid.y));
    let px = textureLoad(src_tex, coord, 0);
    var rgb = px.rgb;

    // 1. Exposure
    rgb = clamp3(rgb * exp2(params.exposure));

    // 2. Contrast
    let contrast_factor = 1.0 + params.contrast / 100.0;
    rgb = clamp3((rgb - vec3<f32>(0.5)) * contrast_factor + vec3<f32>(0.5));

    // 3. Temperature
    if (params.temperature < 0.0) {
        let shift = abs(params.temperature) / 100.0 * 0.3;
        rgb = vec3<f32>(rgb.r * (1.0 + shift), rgb.g, rgb.b * (1.0 - shift));
    } else if (params.temperature > 0.0) {
        let shift = params.temperature / 100.0 * 0.3;
        rgb = vec3<f32>(rgb.r * (1.0 - shift), rgb.g, rgb.b * (1.0 + shift));
    }
    rgb = clamp3(rgb);

    // 4. Tint
    if (params.tint < 0.0) {
        let shift = abs(params.tint) / 100.0 * 0.2;
        rgb = vec3<f32>(rgb.r, rgb.g * (1.0 + shift), rgb.b);
    } else if (params.tint > 0.0) {
        let shift = params.tint / 100.0 * 0.2;
        rgb = vec3<f32>(rgb.r * (1.0 + shift), rgb.g * (1.0 - shift), rgb.b * (1.0 + shift));
    }
    rgb = clamp3(rgb);

    let l = luma(rgb);

    // 5. Highlights
    if (params.highlights != 0.0) {
        let mask = smooth_unit(0.5, 1.0, l);
        let adjustment = (params.highlights / 100.0) * mask;
        if (params.highlights < 0.0) {
            rgb = rgb * (1.0 + adjustment);
        } else {
            rgb = rgb + vec3<f32>(adjustment * 0.5);
        }
    }
    rgb = clamp3(rgb);

    // 6. Shadows
    if (params.shadows != 0.0) {
        let mask = smooth_unit(0.5, 0.0, l);
        let adjustment = (params.shadows / 100.0) * mask;
        if (params.shadows < 0.0) {
            rgb = rgb * (1.0 + adjustment);
        } else {
            rgb = rgb + vec3<f32>(adjustment * 0.5);
        }
    }
    rgb = clamp3(rgb);

    // 7. Whites
    if (params.whites != 0.0 && max(rgb.r, max(rgb.g, rgb.b)) > 0.9) {
        rgb = rgb * (1.0 + (params.whites / 100.0) * 0.3);
    }
    rgb = clamp3(rgb);

    // 8. Blacks
    if (params.blacks != 0.0 && min(rgb.r, min(rgb.g, rgb.b)) < 0.1) {
        rgb = rgb * (1.0 + (params.blacks / 100.0) * 0.2);
    }
    rgb = clamp3(rgb);

    // 9. Saturation
    if (params.saturation != 0.0) {
        rgb = saturate_around_luma(rgb, params.saturation);
    }
    rgb = clamp3(rgb);

    // 10. Vibrance
    if (params.vibrance != 0.0) {
        let max_c = max(rgb.r, max(rgb.g, rgb.b));
        let min_c = min(rgb.r, min(rgb.g, rgb.b));
        var current_sat = 0.0;
        if (max_c > 0.0) {
            current_sat = (max_c - min_c) / max_c;
        }
        var skin_protection = 1.0;
        if (rgb.r > rgb.g && rgb.g > rgb.b && (rgb.r - rgb.g) > 0.06) {
            skin_protection = 0.5;
        }
        let effective = params.vibrance * skin_protection * (1.0 - current_sat);
        rgb = saturate_around_luma(rgb, effective);
    }
    rgb = clamp3(rgb);

    textureStore(dst_tex, coord, vec4<f32>(rgb, px.a));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComputeBackendError::AlignmentViolation {
            bytes_per_row: 300,
            natural: 260,
        };
        let message = err.to_string();
        assert!(message.contains("300"));
        assert!(message.contains("256-byte"));

        assert_eq!(
            ComputeBackendError::DeviceLost.to_string(),
            "compute device lost"
        );
    }

    #[test]
    fn test_invalidate_without_context_is_noop() {
        // Must not panic or deadlock when nothing is cached
        invalidate_context();
        invalidate_context();
    }
}
