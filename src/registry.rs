// Render program registry
//
// Owns the shader and program tables, loads shaders through the cache,
// links programs on the graphics device, tracks the bound program and
// commits its uniforms.
//
// Records are addressed by index. Builtin programs occupy the first slots in
// `BuiltinProgram` order.

use crate::binding::ProgramBinding;
use crate::builtins::BuiltinProgram;
use crate::cache::{strip_extension, ShaderCache, ShaderKey, ShaderPaths};
use crate::device::{GraphicsDevice, LayoutBinding, ProgramDesc};
use crate::error::{RenderProgError, Result};
use crate::manifest::ShaderLayout;
use crate::params::{BindingType, RenderParm, ShaderFeatures, ShaderStage};
use crate::transpile::{Translation, FRAGMENT_BINDING_BASE};
use crate::uniforms::{gather_uniforms, UniformValueTable};
use crate::vertex_layout::{VertexLayoutType, VertexLayouts};
use glam::Vec4;

#[derive(Debug, Clone)]
pub struct ShaderRecord<M> {
    pub name: String,
    pub suffix: String,
    pub stage: ShaderStage,
    pub features: ShaderFeatures,
    pub builtin: bool,
    pub uniforms: Vec<RenderParm>,
    pub bindings: Vec<BindingType>,
    /// Set once the shader compiled successfully
    pub module: Option<M>,
}

impl<M> ShaderRecord<M> {
    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    fn key(&self) -> ShaderKey<'_> {
        ShaderKey {
            name: &self.name,
            suffix: &self.suffix,
            stage: self.stage,
            features: self.features,
            builtin: self.builtin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgramRecord<P> {
    pub name: String,
    pub vertex_shader: Option<usize>,
    pub fragment_shader: Option<usize>,
    pub vertex_layout: VertexLayoutType,
    /// Set once the program linked successfully
    pub pipeline: Option<P>,
}

impl<P> ProgramRecord<P> {
    fn empty(vertex_layout: VertexLayoutType) -> Self {
        Self {
            name: String::new(),
            vertex_shader: None,
            fragment_shader: None,
            vertex_layout,
            pipeline: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.pipeline.is_some()
    }
}

pub struct RenderProgManager<D: GraphicsDevice> {
    cache: ShaderCache,
    shaders: Vec<ShaderRecord<D::Module>>,
    programs: Vec<ProgramRecord<D::Pipeline>>,
    vertex_layouts: VertexLayouts,
    binding: ProgramBinding,
    commit_scratch: Vec<Vec4>,
}

impl<D: GraphicsDevice> RenderProgManager<D> {
    /// Empty registry
    pub fn new(cache: ShaderCache) -> Self {
        Self {
            cache,
            shaders: Vec::new(),
            programs: Vec::new(),
            vertex_layouts: VertexLayouts::build(),
            binding: ProgramBinding::new(),
            commit_scratch: Vec::with_capacity(256),
        }
    }

    /// Registry with every builtin shader and program declared but not loaded
    pub fn with_builtins(cache: ShaderCache) -> Self {
        let mut manager = Self::new(cache);
        for program in BuiltinProgram::ALL {
            let decl = program.decl();
            let vertex = manager.find_shader(
                &format!("{}.vs", decl.source),
                ShaderStage::Vertex,
                decl.vertex.suffix,
                decl.vertex.features,
                true,
            );
            let fragment = manager.find_shader(
                &format!("{}.ps", decl.source),
                ShaderStage::Fragment,
                decl.fragment.suffix,
                decl.fragment.features,
                true,
            );
            let index = manager.register_program(decl.vertex_layout);
            debug_assert_eq!(index, program.index());
            let record = &mut manager.programs[index];
            record.vertex_shader = Some(vertex);
            record.fragment_shader = Some(fragment);
        }
        log::debug!(
            "Declared {} builtin programs over {} shaders",
            manager.programs.len(),
            manager.shaders.len()
        );
        manager
    }

    /// Index of the shader with this identity, registering it if new.
    /// Does not load anything.
    pub fn find_shader(
        &mut self,
        name: &str,
        stage: ShaderStage,
        suffix: &str,
        features: ShaderFeatures,
        builtin: bool,
    ) -> usize {
        let existing = self.shaders.iter().position(|shader| {
            shader.name == name && shader.stage == stage && shader.suffix == suffix && shader.features == features
        });
        if let Some(index) = existing {
            return index;
        }

        self.shaders.push(ShaderRecord {
            name: name.to_string(),
            suffix: suffix.to_string(),
            stage,
            features,
            builtin,
            uniforms: Vec::new(),
            bindings: Vec::new(),
            module: None,
        });
        self.shaders.len() - 1
    }

    /// Reserve an unlinked program slot
    pub fn register_program(&mut self, vertex_layout: VertexLayoutType) -> usize {
        self.programs.push(ProgramRecord::empty(vertex_layout));
        self.programs.len() - 1
    }

    /// Translate a shader and resolve its manifest without a device.
    /// Returns `Ok(None)` when the source translates to nothing.
    pub fn translate_shader(&self, index: usize) -> Result<Option<(Translation, ShaderLayout)>> {
        let shader = self.shaders.get(index).ok_or(RenderProgError::InvalidShaderIndex(index))?;
        let Some(translation) = self.cache.translate(&shader.key())? else {
            return Ok(None);
        };
        let paths = ShaderPaths::derive(&shader.name, &shader.suffix, shader.stage);
        let layout = ShaderLayout::parse(&translation.manifest, &paths.translated)?;
        Ok(Some((translation, layout)))
    }

    /// Translate, resolve and compile one shader. Loading an already loaded
    /// shader does nothing. An empty source leaves the record unloaded.
    pub fn load_shader(&mut self, device: &mut D, index: usize) -> Result<()> {
        let shader = self.shaders.get(index).ok_or(RenderProgError::InvalidShaderIndex(index))?;
        if shader.is_loaded() {
            return Ok(());
        }

        let Some((translation, layout)) = self.translate_shader(index)? else {
            return Ok(());
        };

        let shader = &mut self.shaders[index];
        let module = device
            .compile_module(&shader.name, &translation.source, shader.stage)
            .map_err(|e| RenderProgError::device(format!("compiling {}", shader.name), e))?;

        log::debug!(
            "Loaded {} shader {}{} ({} uniforms)",
            shader.stage.label(),
            shader.name,
            shader.suffix,
            layout.uniforms.len()
        );
        shader.uniforms = layout.uniforms;
        shader.bindings = layout.bindings;
        shader.module = Some(module);
        Ok(())
    }

    /// Load both shaders and link them into `program`. A program that is
    /// already linked is left untouched.
    pub fn load_program(&mut self, device: &mut D, program: usize, vertex: usize, fragment: usize) -> Result<()> {
        let record = self.programs.get(program).ok_or(RenderProgError::InvalidProgramIndex(program))?;
        if record.is_linked() {
            return Ok(());
        }
        for (index, expected) in [(vertex, ShaderStage::Vertex), (fragment, ShaderStage::Fragment)] {
            let shader = self.shaders.get(index).ok_or(RenderProgError::InvalidShaderIndex(index))?;
            if shader.stage != expected {
                return Err(RenderProgError::StageMismatch {
                    name: shader.name.clone(),
                    expected: expected.label(),
                    found: shader.stage.label(),
                });
            }
        }

        self.load_shader(device, vertex)?;
        self.load_shader(device, fragment)?;

        let record = &mut self.programs[program];
        record.name = strip_extension(&self.shaders[vertex].name).to_string();
        record.vertex_shader = Some(vertex);
        record.fragment_shader = Some(fragment);

        let (vs, fs) = (&self.shaders[vertex], &self.shaders[fragment]);
        let (Some(vertex_module), Some(fragment_module)) = (vs.module, fs.module) else {
            let missing = if vs.is_loaded() { fs } else { vs };
            return Err(RenderProgError::ShaderNotReady {
                name: missing.name.clone(),
            });
        };

        let bindings = program_bindings(vs, fs);
        if vs.bindings.len() != FRAGMENT_BINDING_BASE as usize && !fs.bindings.is_empty() {
            log::warn!(
                "{}: vertex stage declares {} bindings but fragment bindings start at {}",
                record.name,
                vs.bindings.len(),
                FRAGMENT_BINDING_BASE
            );
        }
        let desc = ProgramDesc {
            name: &record.name,
            vertex_module,
            fragment_module,
            bindings: &bindings,
            vertex_layout: self.vertex_layouts.get(record.vertex_layout),
        };
        let pipeline = device
            .link_program(&desc)
            .map_err(|e| RenderProgError::device(format!("linking {}", record.name), e))?;

        log::debug!("Linked program {} ({} bindings)", record.name, bindings.len());
        record.pipeline = Some(pipeline);
        Ok(())
    }

    /// Load and link every program whose shaders are declared.
    /// Stops at the first failure.
    pub fn load_all_builtins(&mut self, device: &mut D) -> Result<()> {
        for index in 0..self.programs.len() {
            let record = &self.programs[index];
            if let (Some(vertex), Some(fragment)) = (record.vertex_shader, record.fragment_shader) {
                self.load_program(device, index, vertex, fragment)?;
            }
        }
        let linked = self.programs.iter().filter(|p| p.is_linked()).count();
        log::info!("{} of {} programs linked", linked, self.programs.len());
        Ok(())
    }

    /// Make `program` current. Returns `false` when it already was.
    /// Programs that are not linked cannot be bound.
    pub fn bind_program(&mut self, program: usize) -> Result<bool> {
        let record = self.programs.get(program).ok_or(RenderProgError::InvalidProgramIndex(program))?;
        if !record.is_linked() {
            return Err(RenderProgError::ProgramNotLinked(program));
        }
        let changed = self.binding.bind(program);
        if changed {
            log::trace!("Binding SPIR-V program {}", record.name);
        }
        Ok(changed)
    }

    pub fn bind_builtin(&mut self, program: BuiltinProgram) -> Result<bool> {
        self.bind_program(program.index())
    }

    pub fn unbind(&mut self) {
        self.binding.unbind();
    }

    pub fn current_program(&self) -> Option<usize> {
        self.binding.current()
    }

    /// Gather the bound program's uniforms (vertex stage first) and upload
    /// them as one block. Returns the block's offset, or `None` when nothing
    /// is bound or the program uses no uniforms.
    pub fn commit_uniforms(&mut self, device: &mut D, values: &UniformValueTable) -> Result<Option<u64>> {
        let Some(current) = self.binding.current() else {
            log::debug!("Uniform commit with no program bound");
            return Ok(None);
        };

        let record = &self.programs[current];
        self.commit_scratch.clear();
        for stage in [record.vertex_shader, record.fragment_shader].into_iter().flatten() {
            gather_uniforms(&self.shaders[stage].uniforms, values, &mut self.commit_scratch);
        }
        if self.commit_scratch.is_empty() {
            return Ok(None);
        }

        let offset = device
            .upload_uniform_block(&self.commit_scratch)
            .map_err(|e| RenderProgError::device("uniform upload", e))?;
        Ok(Some(offset))
    }

    pub fn shader(&self, index: usize) -> Option<&ShaderRecord<D::Module>> {
        self.shaders.get(index)
    }

    pub fn shaders(&self) -> &[ShaderRecord<D::Module>] {
        &self.shaders
    }

    pub fn program(&self, index: usize) -> Option<&ProgramRecord<D::Pipeline>> {
        self.programs.get(index)
    }

    pub fn programs(&self) -> &[ProgramRecord<D::Pipeline>] {
        &self.programs
    }

    pub fn vertex_layouts(&self) -> &VertexLayouts {
        &self.vertex_layouts
    }

    pub fn cache_mut(&mut self) -> &mut ShaderCache {
        &mut self.cache
    }
}

/// Binding layout of a program: vertex bindings then fragment bindings,
/// numbered consecutively from zero
pub fn program_bindings<M>(vertex: &ShaderRecord<M>, fragment: &ShaderRecord<M>) -> Vec<LayoutBinding> {
    vertex
        .bindings
        .iter()
        .map(|&kind| (kind, ShaderStage::Vertex))
        .chain(fragment.bindings.iter().map(|&kind| (kind, ShaderStage::Fragment)))
        .enumerate()
        .map(|(i, (kind, stage))| LayoutBinding {
            binding: i as u32,
            kind,
            stage,
        })
        .collect()
}
