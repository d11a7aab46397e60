// Shader module creation
//
// Translated GLSL is compiled to SPIR-V by piping it through glslc, then
// wrapped in a Vulkan shader module.

use super::VulkanDevice;
use crate::params::ShaderStage;
use anyhow::{Context, Result};
use ash::vk;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

/// Compile GLSL `source` to SPIR-V words with the external compiler
pub fn compile_glsl(glslc: &str, name: &str, source: &str, stage: ShaderStage) -> Result<Vec<u32>> {
    let mut child = Command::new(glslc)
        .arg(format!("-fshader-stage={}", stage.target_extension()))
        .arg("--target-env=vulkan1.3")
        .args(["-o", "-", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run {glslc}. Is the Vulkan SDK installed?"))?;

    // glslc reads all of stdin before writing anything
    child
        .stdin
        .take()
        .context("glslc stdin unavailable")?
        .write_all(source.as_bytes())
        .with_context(|| format!("Failed to send {name} to {glslc}"))?;

    let output = child.wait_with_output()?;
    if !output.status.success() {
        anyhow::bail!(
            "{} failed to compile:\n{}",
            name,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }

    ash::util::read_spv(&mut Cursor::new(&output.stdout)).with_context(|| format!("{name}: invalid SPIR-V"))
}

/// Create a shader module from SPIR-V words
pub fn create_shader_module(device: &VulkanDevice, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

    unsafe {
        device
            .device
            .create_shader_module(&create_info, None)
            .context("Failed to create shader module")
    }
}
