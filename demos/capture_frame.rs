//! Capture one frame of the X screen and save it as a PNG
//!
//! Usage: cargo run --example capture_frame -- [output.png] [display]

use anyhow::bail;

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use std::time::Instant;
    use xshm_source::{
        DisplayServer, GraphicsContext, ShmConnection, SimpleEffect, SoftwareGraphics,
        SourceSettings, VideoSource, X11Display, XshmInput, XSHM_INPUT,
    };

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "capture.png".to_string());
    let mut settings = SourceSettings::default();
    if let Some(display) = args.next() {
        settings = settings.with_display(display);
    }

    println!("X11 Shared Memory Capture - {}", XSHM_INPUT.id);
    println!("==========================================\n");

    // Size the framebuffer to the screen before the source is created
    let screen = X11Display::default()
        .open(settings.display.as_deref())
        .context("failed to open display")?
        .screen();
    let (width, height) = (screen.width, screen.height);

    if width == 0 || height == 0 {
        bail!("screen reports an empty size");
    }
    println!("Screen: {}x{}", width, height);

    let graphics = SoftwareGraphics::new(width, height);
    let mut source: XshmInput<SoftwareGraphics> =
        VideoSource::create(&settings, graphics.clone())
            .context("failed to create screen capture source")?;

    let start = Instant::now();
    source.video_tick(1.0 / 60.0);
    println!("Tick completed in {:?}", start.elapsed());

    let mut effect = SimpleEffect::new();
    {
        let _ctx = GraphicsContext::enter(&graphics);
        source.video_render(&mut effect);
    }

    let stats = source.stats();
    println!(
        "Frames pulled: {}, failures: {}, average pull: {:?}",
        stats.frames_pulled,
        stats.pull_failures,
        stats.average_pull_time()
    );
    source.destroy();

    let mut rgba = graphics.framebuffer();
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    image::save_buffer(&output, &rgba, width, height, image::ColorType::Rgba8)
        .with_context(|| format!("failed to write {}", output))?;

    println!("Saved {}", output);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    bail!("MIT-SHM capture requires an X11 server on Linux")
}
