/*!
# Pulsar GPU Engine

Device-agnostic render graph and synchronization core for the Pulsar
renderer.

Commands are recorded against logical resource handles; the engine tracks
each resource's last-known GPU access state and automatically inserts the
minimal pipeline barriers required for correct execution on an explicit,
no-implicit-synchronization graphics API. Backend implementations (Vulkan,
mocks) plug in through the `DeviceDriver` capability trait.

## Architecture

- **ResourcePool**: typed arenas mapping logical handles to native
  resources, descriptors and access states
- **Access state tracker**: per-resource stage/access/layout snapshots and
  the pure `sync_buffer`/`sync_image` barrier decision
- **BarrierBatch**: per-command barrier merging into one native insertion
- **CommandRecorder**: the recording API with eager transfer/compute
  synchronization and deferred two-pass render-pass synchronization
- **FrameContext**: fence-gated ring of in-flight frames, submission,
  presentation and deferred resource release

Backend crates implement the `DeviceDriver` trait (e.g.
`pulsar_gpu_engine_driver_vulkan`).
*/

// Internal modules
mod error;
pub mod log;
pub mod gpu;

// Main pulsar namespace module
pub mod pulsar {
    // Error types
    pub use crate::error::{Result, Status};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{
            reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
        // Note: engine_* macros are exported at the crate root
    }

    // GPU sub-module with all engine types
    pub mod gpu {
        pub use crate::gpu::*;
    }
}
