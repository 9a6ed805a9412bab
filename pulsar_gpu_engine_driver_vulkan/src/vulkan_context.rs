/// GpuContext - Vulkan instance, device and allocator setup

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use pulsar_gpu_engine::pulsar::{Result, Status};
use pulsar_gpu_engine::{engine_error, engine_info};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

#[cfg(feature = "vulkan-validation")]
use crate::vulkan_debug::DebugMessenger;

const SOURCE: &str = "pulsar::vulkan";

/// Driver configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation layers (requires the `vulkan-validation` feature
    /// to have any effect)
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Pulsar Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Shared Vulkan context: entry, instance, device, queue and allocator
///
/// Owns instance/device/surface destruction; everything the driver creates
/// hangs off this context.
pub struct GpuContext {
    pub(crate) _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) queue: vk::Queue,
    pub(crate) queue_family: u32,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    pub(crate) command_pool: vk::CommandPool,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<DebugMessenger>,
}

impl GpuContext {
    /// Create the Vulkan context for a window
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Status::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.clone()).map_err(|_| {
                Status::InitializationFailed("Application name contains NUL".to_string())
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Pulsar")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Required surface extensions for this display
            let display_handle = window.display_handle().map_err(|e| {
                engine_error!(SOURCE, "Failed to get display handle: {}", e);
                Status::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        engine_error!(SOURCE, "Failed to get required extensions: {}", e);
                        Status::InitializationFailed(format!(
                            "Failed to get required extensions: {}",
                            e
                        ))
                    })?
                    .to_vec();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let mut layer_names: Vec<*const std::ffi::c_char> = Vec::new();
            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                layer_names.push(crate::vulkan_debug::VALIDATION_LAYER_NAME.as_ptr());
            }

            let instance_create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_extension_names(&extension_names)
                .enabled_layer_names(&layer_names);

            let instance = entry
                .create_instance(&instance_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                    Status::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if config.enable_validation {
                Some(DebugMessenger::new(&entry, &instance)?)
            } else {
                None
            };

            // Window surface
            let window_handle = window.window_handle().map_err(|e| {
                Status::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create surface: {:?}", e);
                Status::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Physical device + graphics queue family with present support
            let (physical_device, queue_family) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let queue_priorities = [1.0f32];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_extensions = [ash::khr::swapchain::NAME.as_ptr()];

            // Dynamic rendering and the synchronization the engine emits are
            // core in 1.3
            let mut features13 =
                vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extensions)
                .push_next(&mut features13);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Status::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                Status::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let command_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&command_pool_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create command pool: {:?}", e);
                    Status::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            engine_info!(SOURCE, "Vulkan context initialized");

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                queue,
                queue_family,
                surface,
                surface_loader,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                command_pool,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            })
        }
    }

    /// Pick a physical device exposing a queue family with both graphics
    /// and present support, preferring discrete GPUs
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32)> {
        let devices = instance.enumerate_physical_devices().map_err(|e| {
            Status::InitializationFailed(format!("Failed to enumerate devices: {:?}", e))
        })?;

        let mut fallback = None;
        for device in devices {
            let families = instance.get_physical_device_queue_family_properties(device);
            for (index, family) in families.iter().enumerate() {
                if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                    continue;
                }
                let present = surface_loader
                    .get_physical_device_surface_support(device, index as u32, surface)
                    .unwrap_or(false);
                if !present {
                    continue;
                }
                let properties = instance.get_physical_device_properties(device);
                if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                    return Ok((device, index as u32));
                }
                if fallback.is_none() {
                    fallback = Some((device, index as u32));
                }
            }
        }

        fallback.ok_or_else(|| {
            engine_error!(SOURCE, "No suitable Vulkan device found");
            Status::InitializationFailed("No suitable Vulkan device found".to_string())
        })
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
            // The allocator must be dropped before the device it allocates on
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            #[cfg(feature = "vulkan-validation")]
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}
