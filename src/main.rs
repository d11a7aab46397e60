// =============================================================================
// RENDERPROGS - offline driver for the render program core
// =============================================================================
//
// COMMANDS:
//   export    translate every builtin shader, write hlsl/ vkglsl/ .layout
//   validate  load + link every builtin program on the headless device
//   vulkan    same, compiling real modules and pipelines on a Vulkan device
//   watch     export, then re-export whenever renderprogs/*.hlsl changes
//
// =============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::{Mat4, Vec4};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use renderprogs::backend::{VulkanBackend, VulkanDevice};
use renderprogs::config::Config;
use renderprogs::embedded::EMBEDDED_SHADERS;
use renderprogs::headless::HeadlessDevice;
use renderprogs::storage::FileStorage;
use renderprogs::{DescriptorPools, GraphicsDevice, RenderParm, RenderProgManager, ShaderCache, UniformValueTable};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Translate, validate and compile renderprog shaders")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Retranslate even when cached output is fresh
    #[arg(long)]
    force: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate every builtin shader and write the output
    Export,
    /// Load and link every builtin program without a GPU
    Validate {
        /// Frames to simulate after linking
        #[arg(long, default_value_t = 3)]
        frames: u64,
    },
    /// Compile and link every builtin program on a Vulkan device
    Vulkan {
        #[arg(long, default_value_t = 3)]
        frames: u64,
    },
    /// Re-export whenever a source under renderprogs/ changes
    Watch,
}

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load_from_path(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load {:?}: {:#}. Using defaults.", args.config, e);
        Config::default()
    });
    config.shaders.force_export |= args.force;

    init_logging(&config);
    log::info!(
        "Shader sources under {:?}, output under {:?} ({:?})",
        config.shaders.source_root,
        config.shaders.save_root,
        config.shaders.retranslate
    );

    match args.command {
        Command::Export => export(shader_cache(&config)),
        Command::Validate { frames } => validate(&config, frames),
        Command::Vulkan { frames } => vulkan(&config, frames),
        Command::Watch => watch(&config),
    }
}

/// Config level, overridable through RUST_LOG
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_default_env();
    builder.init();
}

fn shader_cache(config: &Config) -> ShaderCache {
    let storage = FileStorage::new(&config.shaders.source_root, &config.shaders.save_root, EMBEDDED_SHADERS);
    let mut cache = ShaderCache::new(Box::new(storage), config.shaders.retranslate);
    cache.set_force(config.shaders.force_export);
    cache
}

// =============================================================================
// COMMANDS
// =============================================================================

fn export(cache: ShaderCache) -> Result<()> {
    let manager: RenderProgManager<HeadlessDevice> = RenderProgManager::with_builtins(cache);

    let mut translated = 0;
    for (index, shader) in manager.shaders().iter().enumerate() {
        let label = format!("{}{}", shader.name, shader.suffix);
        match manager
            .translate_shader(index)
            .with_context(|| format!("Failed to export {label}"))?
        {
            Some((_, layout)) => {
                log::debug!("{}: {} uniforms, {} bindings", label, layout.uniforms.len(), layout.bindings.len());
                translated += 1;
            }
            None => log::warn!("{} produced no output", label),
        }
    }

    log::info!("Exported {} of {} shaders", translated, manager.shaders().len());
    Ok(())
}

fn validate(config: &Config, frames: u64) -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut manager = RenderProgManager::with_builtins(shader_cache(config));
    let mut pools = DescriptorPools::create(
        &mut device,
        config.descriptor_pool_spec(),
        config.graphics.max_frames_in_flight,
    )?;

    manager.load_all_builtins(&mut device)?;
    run_frames(&mut manager, &mut device, &mut pools, frames, |_, _| {})?;

    let stats = device.stats();
    log::info!(
        "Headless validation passed: {} modules, {} programs, {} uniform uploads",
        stats.modules_compiled,
        stats.programs_linked,
        stats.uniform_uploads
    );
    Ok(())
}

fn vulkan(config: &Config, frames: u64) -> Result<()> {
    let device = VulkanDevice::new("renderprogs", config.debug.validation_layers)?;
    let mut backend = VulkanBackend::new(
        device,
        config.shaders.glslc.clone(),
        config.graphics.max_frames_in_flight,
        config.graphics.uniform_ring_size,
    )?;
    let mut manager = RenderProgManager::with_builtins(shader_cache(config));
    let mut pools = DescriptorPools::create(
        &mut backend,
        config.descriptor_pool_spec(),
        config.graphics.max_frames_in_flight,
    )?;

    manager.load_all_builtins(&mut backend)?;
    run_frames(&mut manager, &mut backend, &mut pools, frames, |backend, frame| {
        backend.begin_frame(frame)
    })?;

    // Nothing was submitted, so slots are rotated without waiting on fences
    backend.device().wait_idle()?;
    log::info!("Vulkan validation passed: {} programs", manager.programs().len());
    Ok(())
}

fn watch(config: &Config) -> Result<()> {
    export(shader_cache(config))?;

    let dir = config.shaders.source_root.join("renderprogs");
    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    // Editors often emit several events per save
    let mut debouncer = new_debouncer(Duration::from_millis(250), tx).context("Failed to create file watcher")?;
    // Output lands in subdirectories, so only the top level is watched
    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {:?}", dir))?;
    log::info!("Watching {:?} for changes", dir);

    for result in rx {
        match result {
            Ok(events) => {
                let sources: Vec<&Path> = events
                    .iter()
                    .map(|event| event.path.as_path())
                    .filter(|path| has_extension(path, "hlsl"))
                    .collect();
                if sources.is_empty() {
                    continue;
                }
                for path in sources {
                    log::info!("{:?} changed", path);
                }
                let mut cache = shader_cache(config);
                cache.set_force(true);
                if let Err(e) = export(cache) {
                    log::error!("{:#}", e);
                }
            }
            Err(e) => log::warn!("Watch error: {}", e),
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

// =============================================================================
// FRAME SIMULATION
// =============================================================================

/// Rotate descriptor pools and bind/commit every linked program once per frame
fn run_frames<D: GraphicsDevice>(
    manager: &mut RenderProgManager<D>,
    device: &mut D,
    pools: &mut DescriptorPools<D::Pool>,
    frames: u64,
    mut begin_frame: impl FnMut(&mut D, u64),
) -> Result<()> {
    let values = default_uniforms();

    for frame in 0..frames {
        begin_frame(device, frame);
        pools.begin_frame(device, frame)?;

        let mut committed = 0;
        for program in 0..manager.programs().len() {
            if !manager.programs()[program].is_linked() {
                continue;
            }
            manager.bind_program(program)?;
            if manager.commit_uniforms(device, &values)?.is_some() {
                committed += 1;
            }
        }
        manager.unbind();
        log::debug!(
            "Frame {} (pool slot {}): {} uniform blocks",
            frame,
            pools.slot_for_frame(frame),
            committed
        );
    }
    Ok(())
}

fn default_uniforms() -> UniformValueTable {
    let mut values = UniformValueTable::new();
    values.set_matrix(RenderParm::MvpMatrixX, &Mat4::IDENTITY);
    values.set_matrix(RenderParm::ModelMatrixX, &Mat4::IDENTITY);
    values.set(RenderParm::TextureMatrixS, Vec4::X);
    values.set(RenderParm::TextureMatrixT, Vec4::Y);
    values.set(RenderParm::VertexColorModulate, Vec4::ONE);
    values.set(RenderParm::DiffuseModifier, Vec4::ONE);
    values.set(RenderParm::SpecularModifier, Vec4::ONE);
    values.set(RenderParm::Color, Vec4::ONE);
    values
}
