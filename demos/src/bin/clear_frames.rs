//! # Clear Frames Demo
//!
//! Creates a device from `VORTICE_BACKEND`, clears a headless surface for a
//! handful of frames and reports what happened.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p vortice-demos --bin clear_frames
//! VORTICE_BACKEND=wgpu cargo run -p vortice-demos --features wgpu-backend --bin clear_frames
//! ```

use vortice_demos::{FrameTarget, render_clear_frames};
use vortice_graphics::{DeviceParameters, GraphicsDevice, GraphicsObject, Surface};

const FRAMES: u64 = 8;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Vortice {} clear_frames demo", vortice_demos::VERSION);

    let params = DeviceParameters::from_env().with_label("Demo Device");
    let device = match GraphicsDevice::new(&params) {
        Ok(device) => device,
        Err(err) => {
            log::error!("Failed to create device: {err}");
            std::process::exit(1);
        }
    };

    let surface = Surface::headless(1280, 720);
    let result = FrameTarget::new(&device, &surface)
        .and_then(|target| render_clear_frames(&device, &target, FRAMES));
    match result {
        Ok(rendered) => log::info!(
            "Rendered {rendered}/{FRAMES} frames on {} ({})",
            device.adapter_info().name,
            device.backend_type()
        ),
        Err(err) => log::error!("Frame loop failed: {err}"),
    }

    device.dispose();
}
