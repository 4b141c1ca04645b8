//! Main renderer orchestration.
//!
//! [`Renderer`] owns every Vulkan object the course renderer creates and
//! exposes the small API the application drives: load a model, move it,
//! draw a frame.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ash::vk;
use glam::Mat4;
use tracing::{debug, error, info};

use course_core::Config;
use course_platform::{Surface, Window};
use course_resources::{ImageData, ModelData};
use course_rhi::command::CommandPool;
use course_rhi::device::Device;
use course_rhi::instance::Instance;
use course_rhi::physical_device::select_physical_device;
use course_rhi::render_pass::{AttachmentFormats, Framebuffer, RenderPass};
use course_rhi::swapchain::Swapchain;
use course_scene::Camera;

use crate::attachments::{Attachments, choose_formats};
use crate::descriptors::DescriptorManager;
use crate::draw::{PassTargets, plan_frame, record_frame};
use crate::error::{RendererError, RendererResult};
use crate::frame_manager::FrameManager;
use crate::mesh::Mesh;
use crate::mesh_model::{MeshModel, model_at, prepare_model, texture_for_image};
use crate::pipelines::Pipelines;
use crate::texture::TextureRegistry;
use crate::ubo::UboViewProjection;

/// Owns the whole Vulkan context for one window.
///
/// # Resource Destruction Order
///
/// Vulkan objects must be destroyed in reverse order of creation:
///
/// 1. Meshes and framebuffers
/// 2. Frame sync, pipelines, textures, descriptors
/// 3. Command pool, render pass, attachments, swapchain
/// 4. Device
/// 5. Surface
/// 6. Instance
///
/// ManuallyDrop is used to ensure correct destruction order.
pub struct Renderer {
    models: Vec<MeshModel>,
    framebuffers: Vec<Framebuffer>,

    frames: ManuallyDrop<FrameManager>,
    pipelines: ManuallyDrop<Pipelines>,
    textures: ManuallyDrop<TextureRegistry>,
    descriptors: ManuallyDrop<DescriptorManager>,
    command_pool: ManuallyDrop<CommandPool>,
    render_pass: ManuallyDrop<RenderPass>,
    attachments: ManuallyDrop<Attachments>,
    swapchain: ManuallyDrop<Swapchain>,
    device: ManuallyDrop<Arc<Device>>,
    surface: ManuallyDrop<Surface>,
    instance: ManuallyDrop<Instance>,

    camera: Camera,
    model_dir: PathBuf,
    texture_dir: PathBuf,
}

impl Renderer {
    /// Creates every Vulkan object needed to draw into `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails: missing extensions or layers, no
    /// suitable GPU, resource creation, or missing shader binaries. Objects
    /// created before the failure are released.
    pub fn new(window: &Window, config: &Config) -> RendererResult<Self> {
        let (width, height) = window.framebuffer_size();
        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let app_name = CString::new(config.window.title.as_str())
            .map_err(|e| course_core::Error::Config(format!("Invalid window title: {}", e)))?;
        let surface_extensions = window.required_extensions()?;
        let instance = Instance::new(&app_name, config.validation, &surface_extensions)?;

        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical_device =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device)?;

        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;
        let extent = swapchain.extent();
        let image_count = swapchain.image_count();

        let (color_format, depth_format) = choose_formats(&instance, &physical_device)?;
        let render_pass = RenderPass::new_composite(
            device.clone(),
            AttachmentFormats {
                swapchain: swapchain.format(),
                color: color_format,
                depth: depth_format,
            },
        )?;

        let attachments = Attachments::new(
            device.clone(),
            image_count,
            extent,
            color_format,
            depth_format,
        )?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .enumerate()
            .map(|(index, &view)| {
                Framebuffer::new(
                    device.clone(),
                    &render_pass,
                    &[view, attachments.color_view(index), attachments.depth_view(index)],
                    extent,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Created {} framebuffers", framebuffers.len());

        let command_pool = CommandPool::for_graphics(device.clone())?;

        let mut descriptors = DescriptorManager::new(device.clone(), &attachments)?;
        let textures = TextureRegistry::new(
            device.clone(),
            &command_pool,
            &mut descriptors,
            physical_device.properties.limits.max_sampler_anisotropy,
        )?;

        let pipelines = Pipelines::new(
            device.clone(),
            &render_pass,
            extent,
            &config.shader_dir,
            &descriptors,
        )?;

        let frames = FrameManager::new(device.clone(), &command_pool, image_count)?;

        let camera = Camera::for_extent(extent.width, extent.height);

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            image_count,
            frames.frames_in_flight()
        );

        Ok(Self {
            models: Vec::new(),
            framebuffers,
            frames: ManuallyDrop::new(frames),
            pipelines: ManuallyDrop::new(pipelines),
            textures: ManuallyDrop::new(textures),
            descriptors: ManuallyDrop::new(descriptors),
            command_pool: ManuallyDrop::new(command_pool),
            render_pass: ManuallyDrop::new(render_pass),
            attachments: ManuallyDrop::new(attachments),
            swapchain: ManuallyDrop::new(swapchain),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            instance: ManuallyDrop::new(instance),
            camera,
            model_dir: config.model_dir.clone(),
            texture_dir: config.texture_dir.clone(),
        })
    }

    /// Renders and presents one frame.
    ///
    /// # Errors
    ///
    /// [`RendererError::SwapchainOutOfDate`] when the surface no longer
    /// matches the swapchain; any other Vulkan failure is fatal.
    pub fn draw(&mut self) -> RendererResult<()> {
        self.frames.wait_for_frame()?;

        let image_index = self.frames.acquire(&self.swapchain)?;
        let image = image_index as usize;

        let ubo = UboViewProjection::new(
            self.camera.projection_matrix(),
            self.camera.view_matrix(),
        );
        self.descriptors.update_uniform(image, &ubo)?;

        let plan = plan_frame(
            &self.models,
            self.descriptors.ubo_sets()[image],
            self.descriptors.input_sets()[image],
            self.descriptors.sampler_sets(),
        )?;
        record_frame(
            self.frames.command_buffer(image_index),
            &self.pass_targets(image),
            &plan,
        )?;

        self.frames.submit(image_index)?;

        // The submission is in flight either way, so the slot still advances.
        let presented = self.frames.present(&self.swapchain, image_index);
        self.frames.next_frame();
        presented
    }

    fn pass_targets(&self, image: usize) -> PassTargets {
        PassTargets {
            render_pass: self.render_pass.handle(),
            framebuffer: self.framebuffers[image].handle(),
            extent: self.swapchain.extent(),
            main_pipeline: self.pipelines.main(),
            main_layout: self.pipelines.main_layout(),
            composite_pipeline: self.pipelines.composite(),
            composite_layout: self.pipelines.composite_layout(),
        }
    }

    /// Sets the transform of `model_id`; unknown ids are ignored.
    pub fn update_model(&mut self, model_id: usize, transform: Mat4) {
        match self.models.get_mut(model_id) {
            Some(model) => model.set_transform(transform),
            None => debug!("update_model ignored unknown model id {}", model_id),
        }
    }

    /// Loads an OBJ from the model directory and returns its model id.
    ///
    /// Diffuse textures named by its materials are loaded from the texture
    /// directory; every other mesh samples the default texture. All textures
    /// are decoded and all meshes validated before anything is uploaded.
    pub fn create_mesh_model(&mut self, file_name: impl AsRef<Path>) -> RendererResult<usize> {
        let path = self.model_dir.join(file_name);
        let data = ModelData::load(&path)?;

        let texture_dir = &self.texture_dir;
        let prepared = prepare_model(&data, self.textures.len(), |name| {
            Ok(ImageData::load(&texture_dir.join(name))?)
        })?;

        let device = Arc::clone(&self.device);
        let command_pool: &CommandPool = &self.command_pool;
        let textures: &mut TextureRegistry = &mut self.textures;
        let descriptors: &mut DescriptorManager = &mut self.descriptors;

        let image_textures = prepared
            .images
            .iter()
            .map(|image| textures.create(device.clone(), command_pool, descriptors, image))
            .collect::<RendererResult<Vec<_>>>()?;

        let meshes = prepared
            .meshes
            .iter()
            .map(|mesh| {
                Mesh::new(
                    device.clone(),
                    command_pool,
                    &mesh.vertices,
                    &mesh.indices,
                    texture_for_image(&image_textures, mesh.image),
                )
            })
            .collect::<RendererResult<Vec<_>>>()?;

        let model_id = self.models.len();
        info!(
            "Model {} loaded from {}: {} meshes, {} textures registered",
            model_id,
            path.display(),
            meshes.len(),
            self.textures.len()
        );
        self.models.push(MeshModel::new(meshes));

        Ok(model_id)
    }

    /// # Errors
    ///
    /// [`RendererError::InvalidModel`] or [`RendererError::InvalidMesh`] for
    /// out-of-range indices.
    pub fn get_mesh(&self, model_id: usize, mesh_index: usize) -> RendererResult<&Mesh> {
        model_at(&self.models, model_id)?
            .get_mesh(mesh_index)
            .ok_or(RendererError::InvalidMesh {
                model: model_id,
                mesh: mesh_index,
            })
    }

    pub fn get_model(&self, model_id: usize) -> RendererResult<&MeshModel> {
        model_at(&self.models, model_id)
    }

    #[inline]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying resources
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        self.models.clear();
        self.framebuffers.clear();

        unsafe {
            ManuallyDrop::drop(&mut self.frames);
            ManuallyDrop::drop(&mut self.pipelines);
            ManuallyDrop::drop(&mut self.textures);
            ManuallyDrop::drop(&mut self.descriptors);
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.attachments);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
