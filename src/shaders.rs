use std::fmt;

/// Prepended to every shader source before compilation.
pub const HEADER: &str = "\
#include <metal_stdlib>
using namespace metal;
#define PI 3.1415926535897932
";

pub const COMPUTE_ENTRY: &str = "store_image";

// KS must match utils::WORKGROUP_SIZE.
pub const COMPUTE_SRC: &str = "
#define KS 16 // kernel size

kernel void store_image(
    texture2d<float, access::sample> in_tex [[texture(0)]],
    texture2d<uint, access::write> out_img [[texture(1)]],
    uint2 gid [[threadgroup_position_in_grid]],
    uint2 tid [[thread_position_in_threadgroup]])
{
    const uint2 pixel_pos = uint2(KS) * gid + tid;
    if (pixel_pos.x >= out_img.get_width() || pixel_pos.y >= out_img.get_height())
        return;

    const float3 rgb = in_tex.read(pixel_pos).rgb;
    out_img.write(uint4(uint3(round(saturate(rgb) * 255.0)), 255u), pixel_pos);
}
";

pub const PRESENT_VERT_ENTRY: &str = "present_vertex";

pub const PRESENT_VERT_SRC: &str = "
struct VertexOut {
    float4 position [[position]];
    float2 uv;
};

vertex VertexOut present_vertex(uint vid [[vertex_id]])
{
    const float2 uv = float2((vid << 1) & 2, vid & 2);
    VertexOut out;
    out.position = float4(uv * float2(2.0, -2.0) + float2(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}
";

pub const PRESENT_FRAG_ENTRY: &str = "present_fragment";

pub const PRESENT_FRAG_SRC: &str = "
struct VertexOut {
    float4 position [[position]];
    float2 uv;
};

fragment float4 present_fragment(
    VertexOut in [[stage_in]],
    texture2d<uint, access::read> img [[texture(0)]])
{
    const uint2 size = uint2(img.get_width(), img.get_height());
    const uint2 pos = min(uint2(in.uv * float2(size)), size - 1);
    return float4(img.read(pos)) / 255.0;
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn short_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERT",
            ShaderStage::Fragment => "FRAG",
            ShaderStage::Compute => "COMP",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

pub fn with_header(src: &str) -> String {
    let mut full = String::with_capacity(HEADER.len() + src.len());
    full.push_str(HEADER);
    full.push_str(src);
    full
}

/// Lists each source with its own line numbers, as printed when a shader
/// fails to build.
pub fn format_code_with_lines(srcs: &[&str]) -> String {
    let mut out = String::new();
    for src in srcs {
        for (i, line) in src.split('\n').enumerate() {
            out.push_str(&format!("{:4}| {}\n", i + 1, line));
        }
    }
    out
}

/// Listing of `src` preceded by the shared header.
pub fn format_with_header(src: &str) -> String {
    format_code_with_lines(&[HEADER, src])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::WORKGROUP_SIZE;

    #[test]
    fn header_comes_first() {
        let full = with_header("kernel void k() {}");
        assert!(full.starts_with("#include <metal_stdlib>\n"));
        assert!(full.ends_with("kernel void k() {}"));
        assert_eq!(full.len(), HEADER.len() + "kernel void k() {}".len());
    }

    #[test]
    fn listing_numbers_every_line() {
        let listing = format_code_with_lines(&["a\nb"]);
        assert_eq!(listing, "   1| a\n   2| b\n");
    }

    #[test]
    fn listing_restarts_numbering_per_source() {
        let listing = format_code_with_lines(&["x\n", "y"]);
        assert_eq!(listing, "   1| x\n   2| \n   1| y\n");
    }

    #[test]
    fn header_listing_includes_both_parts() {
        let listing = format_with_header("float f;");
        assert!(listing.contains("   2| using namespace metal;\n"));
        assert!(listing.ends_with("   1| float f;\n"));
    }

    #[test]
    fn kernel_tile_matches_dispatch() {
        let define = format!("#define KS {WORKGROUP_SIZE} ");
        assert!(COMPUTE_SRC.contains(&define));
        assert!(COMPUTE_SRC.contains(&format!("kernel void {COMPUTE_ENTRY}(")));
    }

    #[test]
    fn stage_names() {
        assert_eq!(ShaderStage::Vertex.to_string(), "VERT");
        assert_eq!(ShaderStage::Fragment.to_string(), "FRAG");
        assert_eq!(ShaderStage::Compute.to_string(), "COMP");
    }
}
