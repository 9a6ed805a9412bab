/// Resource pool
///
/// Typed arenas mapping logical handles to native device handles, their
/// immutable creation descriptors, and their mutable access state. The pool
/// is the single owner of every native resource: handles carry no
/// ownership, and dereferencing a stale handle is a fatal error.
///
/// The pool performs no liveness tracking against in-flight GPU work —
/// destruction safety is the FrameContext's responsibility through its
/// deferred-release queue keyed to the tail frame counter.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::engine_fatal;
use crate::engine_trace;
use crate::error::Result;
use crate::gpu::access::{BufferAccess, ImageAccess};
use crate::gpu::buffer::{BufferDesc, BufferUsage, BufferViewDesc};
use crate::gpu::descriptor::{
    DescriptorResource, DescriptorSetDesc, DescriptorSetLayoutDesc, DescriptorType,
    DescriptorWrite,
};
use crate::gpu::driver::{
    DeviceDriver, NativeBuffer, NativeBufferView, NativeDescriptorResource, NativeDescriptorSet,
    NativeDescriptorSetLayout, NativeDescriptorWrite, NativeFramebuffer, NativeImage,
    NativeImageView, NativePipeline, NativeRenderPass, NativeSampler, NativeShader,
};
use crate::gpu::handle::{
    BufferId, BufferViewId, ComputePipelineId, DescriptorSetId, DescriptorSetLayoutId,
    FramebufferId, GraphicsPipelineId, ImageId, ImageViewId, RenderPassId, SamplerId, ShaderId,
};
use crate::gpu::image::{ImageDesc, ImageLayout, ImageUsage, ImageViewDesc};
use crate::gpu::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, ShaderDesc};
use crate::gpu::render_pass::{FramebufferDesc, RenderPassDesc};
use crate::gpu::sampler::SamplerDesc;
use crate::gpu::validator;
use crate::gpu::{MAX_COLOR_ATTACHMENTS, MAX_DESCRIPTOR_SETS, MAX_PUSH_CONSTANT_SIZE};

const SOURCE: &str = "pulsar::gpu::pool";

// ===== POOL ENTRIES =====

/// Live buffer: native handle, creation descriptor, access state
#[derive(Debug)]
pub struct BufferEntry {
    pub native: NativeBuffer,
    pub desc: BufferDesc,
    pub state: BufferAccess,
}

/// Live image: native handle, creation descriptor, access state
#[derive(Debug)]
pub struct ImageEntry {
    pub native: NativeImage,
    pub desc: ImageDesc,
    pub state: ImageAccess,
}

/// Live buffer view
#[derive(Debug)]
pub struct BufferViewEntry {
    pub native: NativeBufferView,
    pub desc: BufferViewDesc,
}

/// Live image view
#[derive(Debug)]
pub struct ImageViewEntry {
    pub native: NativeImageView,
    pub desc: ImageViewDesc,
}

/// Live sampler
#[derive(Debug)]
pub struct SamplerEntry {
    pub native: NativeSampler,
    pub desc: SamplerDesc,
}

/// Live shader module
#[derive(Debug)]
pub struct ShaderEntry {
    pub native: NativeShader,
}

/// Live render pass
#[derive(Debug)]
pub struct RenderPassEntry {
    pub native: NativeRenderPass,
    pub desc: RenderPassDesc,
}

/// Live framebuffer
#[derive(Debug)]
pub struct FramebufferEntry {
    pub native: NativeFramebuffer,
    pub desc: FramebufferDesc,
}

/// Live descriptor set layout
#[derive(Debug)]
pub struct DescriptorSetLayoutEntry {
    pub native: NativeDescriptorSetLayout,
    pub desc: DescriptorSetLayoutDesc,
}

/// One binding slot of a live descriptor set
#[derive(Debug)]
pub struct DescriptorSetBinding {
    pub ty: DescriptorType,
    pub resources: Vec<DescriptorResource>,
}

/// Live descriptor set, including the resources currently bound into it
///
/// The bound-resource record is what the command recorder walks when it
/// synchronizes descriptor-bound buffers and images.
#[derive(Debug)]
pub struct DescriptorSetEntry {
    pub native: NativeDescriptorSet,
    pub layout: DescriptorSetLayoutId,
    pub bindings: Vec<DescriptorSetBinding>,
}

/// Live compute pipeline
#[derive(Debug)]
pub struct ComputePipelineEntry {
    pub native: NativePipeline,
    pub desc: ComputePipelineDesc,
}

/// Live graphics pipeline
#[derive(Debug)]
pub struct GraphicsPipelineEntry {
    pub native: NativePipeline,
    pub desc: GraphicsPipelineDesc,
}

// ===== RESOURCE POOL =====

/// Typed arenas for every resource kind
pub struct ResourcePool {
    driver: Arc<dyn DeviceDriver>,
    buffers: SlotMap<BufferId, BufferEntry>,
    buffer_views: SlotMap<BufferViewId, BufferViewEntry>,
    images: SlotMap<ImageId, ImageEntry>,
    image_views: SlotMap<ImageViewId, ImageViewEntry>,
    samplers: SlotMap<SamplerId, SamplerEntry>,
    shaders: SlotMap<ShaderId, ShaderEntry>,
    render_passes: SlotMap<RenderPassId, RenderPassEntry>,
    framebuffers: SlotMap<FramebufferId, FramebufferEntry>,
    set_layouts: SlotMap<DescriptorSetLayoutId, DescriptorSetLayoutEntry>,
    descriptor_sets: SlotMap<DescriptorSetId, DescriptorSetEntry>,
    compute_pipelines: SlotMap<ComputePipelineId, ComputePipelineEntry>,
    graphics_pipelines: SlotMap<GraphicsPipelineId, GraphicsPipelineEntry>,
}

impl ResourcePool {
    /// Create an empty pool backed by the given driver
    pub fn new(driver: Arc<dyn DeviceDriver>) -> Self {
        Self {
            driver,
            buffers: SlotMap::with_key(),
            buffer_views: SlotMap::with_key(),
            images: SlotMap::with_key(),
            image_views: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            render_passes: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            set_layouts: SlotMap::with_key(),
            descriptor_sets: SlotMap::with_key(),
            compute_pipelines: SlotMap::with_key(),
            graphics_pipelines: SlotMap::with_key(),
        }
    }

    // ----- Buffers -----

    /// Create a buffer; the access state starts with no stages and no access
    pub fn create_buffer(&mut self, desc: BufferDesc) -> Result<BufferId> {
        validator::check_nonzero(desc.size, "buffer size");
        let native = self.driver.create_buffer(&desc)?;
        engine_trace!(SOURCE, "created buffer of {} bytes", desc.size);
        Ok(self.buffers.insert(BufferEntry {
            native,
            desc,
            state: BufferAccess::NONE,
        }))
    }

    /// Look up a live buffer; fatal if the handle is invalid
    pub fn buffer(&self, id: BufferId) -> &BufferEntry {
        match self.buffers.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid buffer handle {:?}", id),
        }
    }

    /// Look up a live buffer mutably; fatal if the handle is invalid
    pub fn buffer_mut(&mut self, id: BufferId) -> &mut BufferEntry {
        match self.buffers.get_mut(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid buffer handle {:?}", id),
        }
    }

    /// Destroy a buffer and reclaim its slot.
    ///
    /// The caller must guarantee no in-flight GPU work still references the
    /// buffer (see FrameContext's deferred-release queue).
    pub fn destroy_buffer(&mut self, id: BufferId) {
        match self.buffers.remove(id) {
            Some(entry) => self.driver.release_buffer(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid buffer handle {:?}", id),
        }
    }

    // ----- Buffer views -----

    /// Create a buffer view over a texel-buffer range
    pub fn create_buffer_view(&mut self, desc: BufferViewDesc) -> Result<BufferViewId> {
        let parent = self.buffer(desc.buffer);
        if !parent
            .desc
            .usage
            .intersects(BufferUsage::UNIFORM_TEXEL | BufferUsage::STORAGE_TEXEL)
        {
            engine_fatal!(
                SOURCE,
                "buffer view requires a texel-buffer usage flag, parent has {:?}",
                parent.desc.usage
            );
        }
        validator::check_buffer_range(&parent.desc, desc.offset, desc.size, "buffer view range");
        let native = self.driver.create_buffer_view(parent.native, &desc)?;
        Ok(self.buffer_views.insert(BufferViewEntry { native, desc }))
    }

    /// Look up a live buffer view; fatal if the handle is invalid
    pub fn buffer_view(&self, id: BufferViewId) -> &BufferViewEntry {
        match self.buffer_views.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid buffer view handle {:?}", id),
        }
    }

    /// Destroy a buffer view and reclaim its slot
    pub fn destroy_buffer_view(&mut self, id: BufferViewId) {
        match self.buffer_views.remove(id) {
            Some(entry) => self.driver.release_buffer_view(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid buffer view handle {:?}", id),
        }
    }

    // ----- Images -----

    /// Create an image; the access state starts in undefined layout
    pub fn create_image(&mut self, desc: ImageDesc) -> Result<ImageId> {
        validator::check_nonzero(desc.extent.width as u64, "image width");
        validator::check_nonzero(desc.extent.height as u64, "image height");
        validator::check_nonzero(desc.extent.depth as u64, "image depth");
        validator::check_nonzero(desc.mip_levels as u64, "image mip levels");
        validator::check_nonzero(desc.array_layers as u64, "image array layers");
        if desc.aspects != desc.format.aspects() {
            engine_fatal!(
                SOURCE,
                "image aspects {:?} do not match format aspects {:?}",
                desc.aspects,
                desc.format.aspects()
            );
        }
        let native = self.driver.create_image(&desc)?;
        engine_trace!(
            SOURCE,
            "created image {}x{}x{}",
            desc.extent.width,
            desc.extent.height,
            desc.extent.depth
        );
        Ok(self.images.insert(ImageEntry {
            native,
            desc,
            state: ImageAccess::UNDEFINED,
        }))
    }

    /// Look up a live image; fatal if the handle is invalid
    pub fn image(&self, id: ImageId) -> &ImageEntry {
        match self.images.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid image handle {:?}", id),
        }
    }

    /// Look up a live image mutably; fatal if the handle is invalid
    pub fn image_mut(&mut self, id: ImageId) -> &mut ImageEntry {
        match self.images.get_mut(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid image handle {:?}", id),
        }
    }

    /// Destroy an image and reclaim its slot
    pub fn destroy_image(&mut self, id: ImageId) {
        match self.images.remove(id) {
            Some(entry) => self.driver.release_image(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid image handle {:?}", id),
        }
    }

    // ----- Image views -----

    /// Create an image view over a subresource range
    pub fn create_image_view(&mut self, desc: ImageViewDesc) -> Result<ImageViewId> {
        let parent = self.image(desc.image);
        validator::check_aspects(&parent.desc, desc.aspects, "image view");
        let range = crate::gpu::image::ImageSubresourceRange {
            aspects: desc.aspects,
            base_mip_level: desc.base_mip_level,
            mip_level_count: desc.mip_level_count,
            base_array_layer: desc.base_array_layer,
            array_layer_count: desc.array_layer_count,
        };
        validator::check_subresource_range(&parent.desc, &range, "image view range");
        let native = self.driver.create_image_view(parent.native, &desc)?;
        Ok(self.image_views.insert(ImageViewEntry { native, desc }))
    }

    /// Look up a live image view; fatal if the handle is invalid
    pub fn image_view(&self, id: ImageViewId) -> &ImageViewEntry {
        match self.image_views.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid image view handle {:?}", id),
        }
    }

    /// Destroy an image view and reclaim its slot
    pub fn destroy_image_view(&mut self, id: ImageViewId) {
        match self.image_views.remove(id) {
            Some(entry) => self.driver.release_image_view(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid image view handle {:?}", id),
        }
    }

    // ----- Samplers -----

    /// Create a sampler
    pub fn create_sampler(&mut self, desc: SamplerDesc) -> Result<SamplerId> {
        let native = self.driver.create_sampler(&desc)?;
        Ok(self.samplers.insert(SamplerEntry { native, desc }))
    }

    /// Look up a live sampler; fatal if the handle is invalid
    pub fn sampler(&self, id: SamplerId) -> &SamplerEntry {
        match self.samplers.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid sampler handle {:?}", id),
        }
    }

    /// Destroy a sampler and reclaim its slot
    pub fn destroy_sampler(&mut self, id: SamplerId) {
        match self.samplers.remove(id) {
            Some(entry) => self.driver.release_sampler(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid sampler handle {:?}", id),
        }
    }

    // ----- Shaders -----

    /// Create a shader module from SPIR-V code
    pub fn create_shader(&mut self, desc: ShaderDesc) -> Result<ShaderId> {
        validator::check_nonzero(desc.spirv.len() as u64, "shader code size");
        let native = self.driver.create_shader(&desc)?;
        Ok(self.shaders.insert(ShaderEntry { native }))
    }

    /// Look up a live shader; fatal if the handle is invalid
    pub fn shader(&self, id: ShaderId) -> &ShaderEntry {
        match self.shaders.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid shader handle {:?}", id),
        }
    }

    /// Destroy a shader module and reclaim its slot
    pub fn destroy_shader(&mut self, id: ShaderId) {
        match self.shaders.remove(id) {
            Some(entry) => self.driver.release_shader(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid shader handle {:?}", id),
        }
    }

    // ----- Render passes -----

    /// Create a render pass object
    pub fn create_render_pass(&mut self, desc: RenderPassDesc) -> Result<RenderPassId> {
        validator::check_count(
            desc.color_attachments.len(),
            MAX_COLOR_ATTACHMENTS,
            "render pass color attachment",
        );
        let native = self.driver.create_render_pass(&desc)?;
        Ok(self.render_passes.insert(RenderPassEntry { native, desc }))
    }

    /// Look up a live render pass; fatal if the handle is invalid
    pub fn render_pass(&self, id: RenderPassId) -> &RenderPassEntry {
        match self.render_passes.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid render pass handle {:?}", id),
        }
    }

    /// Destroy a render pass and reclaim its slot
    pub fn destroy_render_pass(&mut self, id: RenderPassId) {
        match self.render_passes.remove(id) {
            Some(entry) => self.driver.release_render_pass(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid render pass handle {:?}", id),
        }
    }

    // ----- Framebuffers -----

    /// Create a framebuffer over a set of attachment views
    pub fn create_framebuffer(&mut self, desc: FramebufferDesc) -> Result<FramebufferId> {
        validator::check_count(
            desc.color_attachments.len(),
            MAX_COLOR_ATTACHMENTS,
            "framebuffer color attachment",
        );
        validator::check_nonzero(desc.layers as u64, "framebuffer layers");
        let render_pass = self.render_pass(desc.render_pass).native;
        let mut attachments = Vec::with_capacity(desc.color_attachments.len() + 1);
        for &view_id in &desc.color_attachments {
            let view = self.image_view(view_id);
            let image_desc = &self.image(view.desc.image).desc;
            validator::check_image_usage(
                image_desc,
                ImageUsage::COLOR_ATTACHMENT,
                "framebuffer color attachment",
            );
            attachments.push(view.native);
        }
        if let Some(view_id) = desc.depth_stencil_attachment {
            let view = self.image_view(view_id);
            let image_desc = &self.image(view.desc.image).desc;
            validator::check_image_usage(
                image_desc,
                ImageUsage::DEPTH_STENCIL_ATTACHMENT,
                "framebuffer depth/stencil attachment",
            );
            attachments.push(view.native);
        }
        let native = self
            .driver
            .create_framebuffer(render_pass, &attachments, &desc)?;
        Ok(self.framebuffers.insert(FramebufferEntry { native, desc }))
    }

    /// Look up a live framebuffer; fatal if the handle is invalid
    pub fn framebuffer(&self, id: FramebufferId) -> &FramebufferEntry {
        match self.framebuffers.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid framebuffer handle {:?}", id),
        }
    }

    /// Destroy a framebuffer and reclaim its slot
    pub fn destroy_framebuffer(&mut self, id: FramebufferId) {
        match self.framebuffers.remove(id) {
            Some(entry) => self.driver.release_framebuffer(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid framebuffer handle {:?}", id),
        }
    }

    // ----- Descriptor set layouts -----

    /// Create a descriptor set layout
    pub fn create_descriptor_set_layout(
        &mut self,
        desc: DescriptorSetLayoutDesc,
    ) -> Result<DescriptorSetLayoutId> {
        for (i, binding) in desc.bindings.iter().enumerate() {
            validator::check_nonzero(binding.count as u64, "descriptor binding count");
            if desc.bindings[..i].iter().any(|b| b.binding == binding.binding) {
                engine_fatal!(
                    SOURCE,
                    "duplicate descriptor binding index {}",
                    binding.binding
                );
            }
        }
        let native = self.driver.create_descriptor_set_layout(&desc)?;
        Ok(self
            .set_layouts
            .insert(DescriptorSetLayoutEntry { native, desc }))
    }

    /// Look up a live descriptor set layout; fatal if the handle is invalid
    pub fn descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> &DescriptorSetLayoutEntry {
        match self.set_layouts.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(
                SOURCE,
                "dereferenced invalid descriptor set layout handle {:?}",
                id
            ),
        }
    }

    /// Destroy a descriptor set layout and reclaim its slot
    pub fn destroy_descriptor_set_layout(&mut self, id: DescriptorSetLayoutId) {
        match self.set_layouts.remove(id) {
            Some(entry) => self.driver.release_descriptor_set_layout(entry.native),
            None => engine_fatal!(
                SOURCE,
                "destroyed invalid descriptor set layout handle {:?}",
                id
            ),
        }
    }

    // ----- Descriptor sets -----

    /// Allocate a descriptor set against a layout; all bindings start empty
    pub fn create_descriptor_set(&mut self, desc: DescriptorSetDesc) -> Result<DescriptorSetId> {
        let layout = self.descriptor_set_layout(desc.layout);
        let bindings = layout
            .desc
            .bindings
            .iter()
            .map(|b| DescriptorSetBinding {
                ty: b.ty,
                resources: Vec::new(),
            })
            .collect();
        let native = self.driver.create_descriptor_set(layout.native)?;
        Ok(self.descriptor_sets.insert(DescriptorSetEntry {
            native,
            layout: desc.layout,
            bindings,
        }))
    }

    /// Look up a live descriptor set; fatal if the handle is invalid
    pub fn descriptor_set(&self, id: DescriptorSetId) -> &DescriptorSetEntry {
        match self.descriptor_sets.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(SOURCE, "dereferenced invalid descriptor set handle {:?}", id),
        }
    }

    /// Write resources into a descriptor set's bindings.
    ///
    /// Validates every written resource against the layout's declared
    /// descriptor type and the resource's usage flags, records the bindings
    /// for later synchronization walks, and forwards the resolved native
    /// handles to the driver.
    pub fn update_descriptor_set(&mut self, id: DescriptorSetId, writes: &[DescriptorWrite]) {
        let layout_id = self.descriptor_set(id).layout;
        let layout_bindings = self.descriptor_set_layout(layout_id).desc.bindings.clone();

        let mut native_writes = Vec::with_capacity(writes.len());
        let mut stored = Vec::with_capacity(writes.len());
        for write in writes {
            let Some(slot) = layout_bindings.iter().position(|b| b.binding == write.binding)
            else {
                engine_fatal!(
                    SOURCE,
                    "descriptor write targets unknown binding {}",
                    write.binding
                )
            };
            let binding_desc = &layout_bindings[slot];
            validator::check_count(
                write.resources.len(),
                binding_desc.count as usize,
                "descriptor write element",
            );

            let mut resources = Vec::with_capacity(write.resources.len());
            for resource in &write.resources {
                resources.push(self.resolve_descriptor_resource(binding_desc.ty, resource));
            }
            native_writes.push(NativeDescriptorWrite {
                binding: write.binding,
                ty: binding_desc.ty,
                resources,
            });
            stored.push((slot, write.resources.clone()));
        }

        let native = self.descriptor_set(id).native;
        self.driver.update_descriptor_set(native, &native_writes);

        match self.descriptor_sets.get_mut(id) {
            Some(entry) => {
                for (slot, resources) in stored {
                    entry.bindings[slot].resources = resources;
                }
            }
            None => engine_fatal!(SOURCE, "dereferenced invalid descriptor set handle {:?}", id),
        }
    }

    /// Flattened (type, resource) list of everything bound in a set
    pub fn descriptor_set_resources(
        &self,
        id: DescriptorSetId,
    ) -> Vec<(DescriptorType, DescriptorResource)> {
        let entry = self.descriptor_set(id);
        let mut out = Vec::new();
        for binding in &entry.bindings {
            for resource in &binding.resources {
                out.push((binding.ty, *resource));
            }
        }
        out
    }

    /// Destroy a descriptor set and reclaim its slot
    pub fn destroy_descriptor_set(&mut self, id: DescriptorSetId) {
        match self.descriptor_sets.remove(id) {
            Some(entry) => self.driver.release_descriptor_set(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid descriptor set handle {:?}", id),
        }
    }

    fn resolve_descriptor_resource(
        &self,
        ty: DescriptorType,
        resource: &DescriptorResource,
    ) -> NativeDescriptorResource {
        match (ty, resource) {
            (
                DescriptorType::UniformBuffer | DescriptorType::DynamicUniformBuffer,
                DescriptorResource::Buffer { buffer, offset, size },
            ) => {
                let entry = self.buffer(*buffer);
                validator::check_buffer_usage(&entry.desc, BufferUsage::UNIFORM, "uniform binding");
                validator::check_buffer_range(&entry.desc, *offset, *size, "uniform binding range");
                NativeDescriptorResource::Buffer {
                    buffer: entry.native,
                    offset: *offset,
                    size: *size,
                }
            }
            (
                DescriptorType::StorageBuffer | DescriptorType::DynamicStorageBuffer,
                DescriptorResource::Buffer { buffer, offset, size },
            ) => {
                let entry = self.buffer(*buffer);
                validator::check_buffer_usage(&entry.desc, BufferUsage::STORAGE, "storage binding");
                validator::check_buffer_range(&entry.desc, *offset, *size, "storage binding range");
                NativeDescriptorResource::Buffer {
                    buffer: entry.native,
                    offset: *offset,
                    size: *size,
                }
            }
            (
                DescriptorType::UniformTexelBuffer,
                DescriptorResource::TexelBuffer { view },
            ) => {
                let parent = self.buffer(self.buffer_view(*view).desc.buffer);
                validator::check_buffer_usage(
                    &parent.desc,
                    BufferUsage::UNIFORM_TEXEL,
                    "uniform texel binding",
                );
                NativeDescriptorResource::TexelBuffer {
                    view: self.buffer_view(*view).native,
                }
            }
            (
                DescriptorType::StorageTexelBuffer,
                DescriptorResource::TexelBuffer { view },
            ) => {
                let parent = self.buffer(self.buffer_view(*view).desc.buffer);
                validator::check_buffer_usage(
                    &parent.desc,
                    BufferUsage::STORAGE_TEXEL,
                    "storage texel binding",
                );
                NativeDescriptorResource::TexelBuffer {
                    view: self.buffer_view(*view).native,
                }
            }
            (DescriptorType::SampledImage, DescriptorResource::Image { view }) => {
                let view_entry = self.image_view(*view);
                validator::check_image_usage(
                    &self.image(view_entry.desc.image).desc,
                    ImageUsage::SAMPLED,
                    "sampled image binding",
                );
                NativeDescriptorResource::Image {
                    view: view_entry.native,
                    layout: ImageLayout::ShaderReadOnly,
                }
            }
            (DescriptorType::StorageImage, DescriptorResource::Image { view }) => {
                let view_entry = self.image_view(*view);
                validator::check_image_usage(
                    &self.image(view_entry.desc.image).desc,
                    ImageUsage::STORAGE,
                    "storage image binding",
                );
                NativeDescriptorResource::Image {
                    view: view_entry.native,
                    layout: ImageLayout::General,
                }
            }
            (
                DescriptorType::CombinedImageSampler,
                DescriptorResource::CombinedImageSampler { view, sampler },
            ) => {
                let view_entry = self.image_view(*view);
                validator::check_image_usage(
                    &self.image(view_entry.desc.image).desc,
                    ImageUsage::SAMPLED,
                    "combined image sampler binding",
                );
                NativeDescriptorResource::CombinedImageSampler {
                    view: view_entry.native,
                    sampler: self.sampler(*sampler).native,
                    layout: ImageLayout::ShaderReadOnly,
                }
            }
            (DescriptorType::Sampler, DescriptorResource::Sampler { sampler }) => {
                NativeDescriptorResource::Sampler {
                    sampler: self.sampler(*sampler).native,
                }
            }
            (ty, resource) => engine_fatal!(
                SOURCE,
                "descriptor resource {:?} does not match binding type {:?}",
                resource,
                ty
            ),
        }
    }

    // ----- Pipelines -----

    /// Create a compute pipeline
    pub fn create_compute_pipeline(
        &mut self,
        desc: ComputePipelineDesc,
    ) -> Result<ComputePipelineId> {
        self.check_pipeline_common(&desc.set_layouts, desc.push_constant_size);
        let shader = self.shader(desc.shader).native;
        let set_layouts: Vec<_> = desc
            .set_layouts
            .iter()
            .map(|&id| self.descriptor_set_layout(id).native)
            .collect();
        let native = self
            .driver
            .create_compute_pipeline(shader, &set_layouts, &desc)?;
        Ok(self
            .compute_pipelines
            .insert(ComputePipelineEntry { native, desc }))
    }

    /// Look up a live compute pipeline; fatal if the handle is invalid
    pub fn compute_pipeline(&self, id: ComputePipelineId) -> &ComputePipelineEntry {
        match self.compute_pipelines.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(
                SOURCE,
                "dereferenced invalid compute pipeline handle {:?}",
                id
            ),
        }
    }

    /// Destroy a compute pipeline and reclaim its slot
    pub fn destroy_compute_pipeline(&mut self, id: ComputePipelineId) {
        match self.compute_pipelines.remove(id) {
            Some(entry) => self.driver.release_pipeline(entry.native),
            None => engine_fatal!(SOURCE, "destroyed invalid compute pipeline handle {:?}", id),
        }
    }

    /// Create a graphics pipeline
    pub fn create_graphics_pipeline(
        &mut self,
        desc: GraphicsPipelineDesc,
    ) -> Result<GraphicsPipelineId> {
        self.check_pipeline_common(&desc.set_layouts, desc.push_constant_size);
        validator::check_count(
            desc.color_formats.len(),
            MAX_COLOR_ATTACHMENTS,
            "pipeline color attachment",
        );
        let vertex_shader = self.shader(desc.vertex_shader).native;
        let fragment_shader = self.shader(desc.fragment_shader).native;
        let set_layouts: Vec<_> = desc
            .set_layouts
            .iter()
            .map(|&id| self.descriptor_set_layout(id).native)
            .collect();
        let native =
            self.driver
                .create_graphics_pipeline(vertex_shader, fragment_shader, &set_layouts, &desc)?;
        Ok(self
            .graphics_pipelines
            .insert(GraphicsPipelineEntry { native, desc }))
    }

    /// Look up a live graphics pipeline; fatal if the handle is invalid
    pub fn graphics_pipeline(&self, id: GraphicsPipelineId) -> &GraphicsPipelineEntry {
        match self.graphics_pipelines.get(id) {
            Some(entry) => entry,
            None => engine_fatal!(
                SOURCE,
                "dereferenced invalid graphics pipeline handle {:?}",
                id
            ),
        }
    }

    /// Destroy a graphics pipeline and reclaim its slot
    pub fn destroy_graphics_pipeline(&mut self, id: GraphicsPipelineId) {
        match self.graphics_pipelines.remove(id) {
            Some(entry) => self.driver.release_pipeline(entry.native),
            None => engine_fatal!(
                SOURCE,
                "destroyed invalid graphics pipeline handle {:?}",
                id
            ),
        }
    }

    fn check_pipeline_common(
        &self,
        set_layouts: &[DescriptorSetLayoutId],
        push_constant_size: u32,
    ) {
        validator::check_count(set_layouts.len(), MAX_DESCRIPTOR_SETS, "pipeline set layout");
        validator::check_count(
            push_constant_size as usize,
            MAX_PUSH_CONSTANT_SIZE,
            "push constant byte",
        );
        validator::check_alignment(push_constant_size as u64, 4, "push constant size");
    }

    /// Driver the pool creates resources through
    pub fn driver(&self) -> &Arc<dyn DeviceDriver> {
        &self.driver
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
