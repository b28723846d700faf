use log::{debug, error};
use metal::*;

use crate::error::{Error, Result};
use crate::shaders::{self, ShaderStage};

/// Compiles `src` behind the shared header and returns its `entry` function.
pub fn compile_shader(
    device: &Device,
    name: &str,
    stage: ShaderStage,
    src: &str,
    entry: &str,
) -> Result<Function> {
    let options = CompileOptions::new();
    let library = device
        .new_library_with_source(&shaders::with_header(src), &options)
        .map_err(|log| {
            error!("Error in '{name}'({stage}):\n{log}");
            error!("\n{}", shaders::format_with_header(src));
            Error::ShaderCompile {
                name: name.to_string(),
                stage,
                log,
            }
        })?;

    let function = library
        .get_function(entry, None)
        .map_err(|log| Error::MissingEntryPoint {
            name: name.to_string(),
            entry: entry.to_string(),
            log,
        })?;
    debug!("compiled '{name}'({stage}) entry {entry}");
    Ok(function)
}

pub fn create_compute_program(
    device: &Device,
    name: &str,
    src: &str,
    entry: &str,
) -> Result<ComputePipelineState> {
    let function = compile_shader(device, name, ShaderStage::Compute, src, entry)?;
    device
        .new_compute_pipeline_state_with_function(&function)
        .map_err(|log| {
            error!("{log}");
            error!("Compute Shader:\n{}", shaders::format_with_header(src));
            Error::ProgramLink {
                name: name.to_string(),
                log,
            }
        })
}

pub fn create_render_program(
    device: &Device,
    name: &str,
    vert: (&str, &str),
    frag: (&str, &str),
    pixel_format: MTLPixelFormat,
) -> Result<RenderPipelineState> {
    let (vert_src, vert_entry) = vert;
    let (frag_src, frag_entry) = frag;
    let vert_fn = compile_shader(device, name, ShaderStage::Vertex, vert_src, vert_entry)?;
    let frag_fn = compile_shader(device, name, ShaderStage::Fragment, frag_src, frag_entry)?;

    let link_error = |log: String| {
        error!("{log}");
        error!("Vertex Shader:\n{}", shaders::format_with_header(vert_src));
        error!("Fragment Shader:\n{}", shaders::format_with_header(frag_src));
        Error::ProgramLink {
            name: name.to_string(),
            log,
        }
    };

    let desc = RenderPipelineDescriptor::new();
    desc.set_label(name);
    desc.set_vertex_function(Some(&vert_fn));
    desc.set_fragment_function(Some(&frag_fn));
    desc.color_attachments()
        .object_at(0)
        .ok_or_else(|| link_error("no color attachment 0".to_string()))?
        .set_pixel_format(pixel_format);

    device.new_render_pipeline_state(&desc).map_err(link_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_source_reports_compile_error() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let err = compile_shader(
            &device,
            "broken",
            ShaderStage::Compute,
            "kernel void k() { flaot x; }",
            "k",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ShaderCompile { ref name, stage: ShaderStage::Compute, .. } if name == "broken"
        ));
    }

    #[test]
    fn header_constants_are_visible() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let src = "kernel void k(device float *out [[buffer(0)]]) { out[0] = PI; }";
        assert!(create_compute_program(&device, "pi", src, "k").is_ok());
    }

    #[test]
    fn wrong_entry_point_is_reported() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let err = compile_shader(
            &device,
            "compute",
            ShaderStage::Compute,
            shaders::COMPUTE_SRC,
            "main",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingEntryPoint { ref entry, .. } if entry == "main"));
    }

    #[test]
    fn present_program_links() {
        let Some(device) = Device::system_default() else {
            return;
        };
        let program = create_render_program(
            &device,
            "present",
            (shaders::PRESENT_VERT_SRC, shaders::PRESENT_VERT_ENTRY),
            (shaders::PRESENT_FRAG_SRC, shaders::PRESENT_FRAG_ENTRY),
            MTLPixelFormat::BGRA8Unorm,
        );
        assert!(program.is_ok());
    }
}
