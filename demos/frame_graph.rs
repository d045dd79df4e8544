//! # Frame Graph Demo
//!
//! Demonstrates:
//! - A forward frame (shadow, skybox, geometry, post) built as a render graph
//! - Skybox culling until an asynchronously loaded HDR environment arrives
//! - A one-shot equirectangular to cubemap conversion into an application
//!   owned cubemap, whose source image the graph releases after one frame
//! - A one-shot BRDF look-up table that only reruns after a resize
//!
//! Runs headless on the dummy backend and prints what every frame recorded.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example frame_graph -- --frames 6 --hdr-ready-at 2
//! ```

use clap::Parser;

use lucy_render_graph::backend::{
    DummyBackend, GraphicsBackend, ImageDescriptor, ImageHandle, RecordingCommandList,
    RenderPassInfo,
};
use lucy_render_graph::{
    PassExecuteContext, QueueFamily, RenderGraph, RenderGraphConfig, RenderGraphImage,
    RenderGraphPassState, execute_fn,
};

/// Headless frame graph walkthrough.
#[derive(Parser, Debug)]
#[command(name = "frame_graph", about = "Render graph scheduling demo", version)]
struct Args {
    /// Number of frames to run.
    #[arg(long, default_value = "5")]
    frames: u32,

    /// Viewport width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Frame at which the HDR environment finishes loading.
    #[arg(long, default_value = "2")]
    hdr_ready_at: u32,

    /// Frame at which the window is resized to twice its size.
    #[arg(long)]
    resize_at: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    lucy_render_graph::init();

    let args = Args::parse();
    let mut backend = DummyBackend::new();
    let mut commands = RecordingCommandList::new();

    let config = RenderGraphConfig {
        viewport_width: args.width,
        viewport_height: args.height,
        ..Default::default()
    };
    let mut graph = RenderGraph::with_config(config);

    let color = backend.create_image(&image_2d(args.width, args.height))?;
    let depth = backend.create_image(&image_2d(args.width, args.height))?;
    let equirect = backend.create_image(&image_2d(4096, 2048))?;

    graph.import_external_resource("Swapchain", ImageHandle::INVALID);
    graph.import_external_resource("HdrEnvironment", ImageHandle::INVALID);
    let cube = backend.create_image(&image_2d(512, 512))?;
    graph.import_external_resource("EnvironmentCube", cube);
    graph.import_external_transient_resource("Equirect", equirect);
    build_frame(&mut graph, color, depth)?;
    graph.compile()?;

    log::info!("Execution order: {:?}", graph.execution_order());
    for (level, passes) in graph.dag().dependency_levels().iter().enumerate() {
        log::info!("Level {}: {:?}", level, passes);
    }

    let external = graph.external_resources();
    for frame in 0..args.frames {
        // A new swapchain image every frame.
        let swapchain = backend.create_image(&image_2d(args.width, args.height))?;
        external.replace(&"Swapchain".into(), swapchain);

        if frame == args.hdr_ready_at {
            let hdr = backend.create_image(&image_2d(2048, 1024))?;
            external.replace(&"HdrEnvironment".into(), hdr);
            log::info!("HDR environment loaded");
        }
        if args.resize_at == Some(frame) {
            graph.resize(args.width * 2, args.height * 2);
            log::info!("Resized to {}x{}", args.width * 2, args.height * 2);
        }
        graph.update()?;

        commands.clear();
        let executed = graph.execute(&mut commands)?;
        let released = graph.flush(&mut backend)?;

        let culled: Vec<&str> = graph
            .passes()
            .filter(|pass| pass.state() == RenderGraphPassState::Waiting)
            .map(|pass| pass.name())
            .collect();
        println!(
            "frame {frame}: ran {executed} {:?}, culled {:?}, released {released}, {} commands",
            commands.markers(),
            culled,
            commands.commands().len()
        );

        backend.enqueue_resource_destroy(swapchain.into());
        external.invalidate(&"Swapchain".into());
    }

    println!(
        "{} resources queued for destruction, {} still live",
        backend.destroy_queue().len(),
        backend.live_count()
    );
    Ok(())
}

fn image_2d(width: u32, height: u32) -> ImageDescriptor {
    ImageDescriptor {
        width,
        height,
        ..Default::default()
    }
}

fn build_frame(
    graph: &mut RenderGraph,
    color: ImageHandle,
    depth: ImageHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    graph.add_pass(QueueFamily::Compute, "EquirectToCube", |builder| {
        builder.set_in_flight(false);
        builder.read_image("Equirect");
        builder.write_image("EnvironmentCube");
        execute_fn(|ctx| ctx.commands().dispatch(64, 64, 6))
    })?;

    graph.add_pass(QueueFamily::Compute, "BrdfLut", |builder| {
        builder.set_in_flight(false);
        builder.write_image("BrdfLut");
        execute_fn(|ctx| ctx.commands().dispatch(32, 32, 1))
    })?;

    graph.add_pass(QueueFamily::Graphics, "Shadow", |builder| {
        builder.bind_render_target("ShadowMap");
        execute_fn(|ctx| render(ctx, 0..36))
    })?;

    graph.add_pass(QueueFamily::Graphics, "Skybox", |builder| {
        builder.read_image("HdrEnvironment");
        builder.bind_render_target("Sky");
        execute_fn(|ctx| render(ctx, 0..3))
    })?;

    graph.add_pass(QueueFamily::Graphics, "Geometry", move |builder| {
        builder.declare_image("ColorOutput", RenderGraphImage::color(color));
        builder.declare_image("Depth", RenderGraphImage::depth(depth));
        builder.read_image("ShadowMap");
        builder.read_image("BrdfLut");
        builder.bind_render_target("ColorOutput");
        builder.bind_render_target("Depth");
        execute_fn(|ctx| render(ctx, 0..36))
    })?;

    graph.add_pass(QueueFamily::Graphics, "Post", |builder| {
        builder.read_image("ColorOutput");
        builder.read_image("Sky");
        builder.bind_render_target("Swapchain");
        execute_fn(|ctx| render(ctx, 0..3))
    })?;

    Ok(())
}

fn render(ctx: &mut PassExecuteContext<'_>, vertices: std::ops::Range<u32>) {
    let attachments = ctx
        .render_targets()
        .iter()
        .filter(|target| ctx.registry().contains_image(target))
        .map(|target| ctx.registry().get_image(target).attachment())
        .collect();
    let viewport = ctx.viewport();
    let info = RenderPassInfo {
        label: ctx.pass_name().to_string(),
        attachments,
        clear_color: ctx.clear_color().to_array(),
        width: viewport.width,
        height: viewport.height,
    };

    let commands = ctx.commands();
    commands.begin_render_pass(&info);
    commands.set_viewport(0.0, 0.0, viewport.width as f32, viewport.height as f32);
    commands.draw(vertices, 0..1);
    commands.end_render_pass();
}
