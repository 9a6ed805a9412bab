/// Vulkan validation layer and debug messenger support
///
/// Everything here is compiled only with the `vulkan-validation` feature;
/// release builds without the feature carry none of this code.

#[cfg(feature = "vulkan-validation")]
pub use messenger::*;

#[cfg(feature = "vulkan-validation")]
mod messenger {
    use std::ffi::{c_void, CStr};

    use ash::vk;
    use pulsar_gpu_engine::pulsar::{Result, Status};
    use pulsar_gpu_engine::{engine_debug, engine_error, engine_info, engine_warn};

    const SOURCE: &str = "pulsar::vulkan::validation";

    /// Khronos validation layer name
    pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

    /// Debug-utils messenger forwarding validation messages to the engine log
    pub struct DebugMessenger {
        loader: ash::ext::debug_utils::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    }

    impl DebugMessenger {
        pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
            let loader = ash::ext::debug_utils::Instance::new(entry, instance);
            let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));

            let messenger = unsafe {
                loader
                    .create_debug_utils_messenger(&create_info, None)
                    .map_err(|e| {
                        engine_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        Status::InitializationFailed(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        ))
                    })?
            };

            engine_info!(SOURCE, "Validation layers enabled");
            Ok(Self { loader, messenger })
        }

        /// Destroy the messenger. Must happen before instance destruction.
        pub fn destroy(self) {
            unsafe {
                self.loader
                    .destroy_debug_utils_messenger(self.messenger, None);
            }
        }
    }

    unsafe extern "system" fn debug_callback(
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
        _user_data: *mut c_void,
    ) -> vk::Bool32 {
        if callback_data.is_null() {
            return vk::FALSE;
        }
        let p_message = (*callback_data).p_message;
        let message = if p_message.is_null() {
            String::new()
        } else {
            CStr::from_ptr(p_message).to_string_lossy().into_owned()
        };

        match severity {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
                engine_error!(SOURCE, "{}", message);
            }
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
                engine_warn!(SOURCE, "{}", message);
            }
            _ => {
                engine_debug!(SOURCE, "{}", message);
            }
        }
        vk::FALSE
    }
}
