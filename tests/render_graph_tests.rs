//! Integration tests for frame graph scheduling.
//!
//! Every test drives a [`RenderGraph`] against the dummy backend and inspects
//! what was recorded into a [`RecordingCommandList`].
//!
//! # Test Categories
//!
//! - **Ordering Tests**: Passes run in dependency order whatever the add order
//! - **Culling Tests**: Unavailable external resources cull whole chains
//! - **Transient Tests**: External transient resources are released once
//! - **Lifecycle Tests**: Recompilation, removal and one-shot passes

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec4;
use rstest::rstest;

use common::{TestContext, draw_fullscreen};
use lucy_render_graph::backend::{
    GraphicsBackend, ImageHandle, LoadOp, RecordedCommand, RenderResourceHandle,
};
use lucy_render_graph::{
    GraphError, QueueFamily, RenderGraphError, RenderGraphImage, RenderGraphPassCreateInfo,
    RenderGraphPassState, execute_fn,
};

/// Add one of the passes of a small forward frame.
fn add_frame_pass(ctx: &mut TestContext, name: &str) {
    let (reads, writes): (&[&str], &[&str]) = match name {
        "Shadow" => (&[], &["ShadowMap"]),
        "Geometry" => (&["ShadowMap"], &["ColorOutput"]),
        "Post" => (&["ColorOutput"], &["Swapchain"]),
        other => panic!("no frame pass named {other}"),
    };
    ctx.graph
        .add_pass(QueueFamily::Graphics, name, |builder| {
            for read in reads {
                builder.read_image(*read);
            }
            for write in writes {
                builder.bind_render_target(*write);
            }
            execute_fn(draw_fullscreen)
        })
        .unwrap();
}

fn state(ctx: &TestContext, name: &str) -> RenderGraphPassState {
    ctx.graph.pass_state(name).unwrap()
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[rstest]
#[case::dependency_order(["Shadow", "Geometry", "Post"])]
#[case::reversed(["Post", "Geometry", "Shadow"])]
#[case::shuffled(["Geometry", "Post", "Shadow"])]
fn test_passes_run_in_dependency_order(#[case] add_order: [&str; 3]) {
    let mut ctx = TestContext::new();
    for name in add_order {
        add_frame_pass(&mut ctx, name);
    }
    ctx.graph.compile().unwrap();

    assert_eq!(ctx.frame(), Ok(3));
    assert_eq!(ctx.markers(), vec!["Shadow", "Geometry", "Post"]);
    assert_eq!(
        ctx.commands.render_pass_labels(),
        vec!["Shadow", "Geometry", "Post"]
    );
    assert_eq!(ctx.graph.dag().dependency_level(&"Post".to_string()), Some(2));
}

#[test]
fn test_independent_passes_share_a_level() {
    let mut ctx = TestContext::new();
    for (name, output) in [("Shadow", "ShadowMap"), ("Ssao", "AoMap")] {
        ctx.graph
            .add_pass(QueueFamily::Compute, name, |builder| {
                builder.write_image(output);
                execute_fn(|ctx| ctx.commands().dispatch(8, 8, 1))
            })
            .unwrap();
    }
    ctx.graph
        .add_pass(QueueFamily::Graphics, "Lighting", |builder| {
            builder.read_image("ShadowMap");
            builder.read_image("AoMap");
            builder.bind_render_target("ColorOutput");
            execute_fn(draw_fullscreen)
        })
        .unwrap();
    ctx.graph.compile().unwrap();

    let levels = ctx.graph.dag().dependency_levels();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].len(), 2);
    assert_eq!(levels[1], vec![&"Lighting".to_string()]);

    assert_eq!(ctx.frame(), Ok(3));
    assert_eq!(ctx.markers().last(), Some(&"Lighting"));
    let dispatches = ctx
        .commands
        .commands()
        .iter()
        .filter(|command| matches!(command, RecordedCommand::Dispatch([8, 8, 1])))
        .count();
    assert_eq!(dispatches, 2);
}

#[test]
fn test_render_targets_resolve_to_declared_images() {
    let mut ctx = TestContext::new();
    let color = ctx.create_image(640, 480);
    let depth = ctx.create_image(640, 480);

    let info = RenderGraphPassCreateInfo::new("Geometry", QueueFamily::Graphics)
        .with_viewport(640, 480)
        .with_clear_color(Vec4::new(0.1, 0.2, 0.3, 1.0));
    ctx.graph
        .add_pass_with(info, |builder| {
            builder.declare_image("ColorOutput", RenderGraphImage::color(color));
            builder.declare_image(
                "Depth",
                RenderGraphImage::depth(depth).with_load_op(LoadOp::Load),
            );
            builder.bind_render_target("ColorOutput");
            builder.bind_render_target("Depth");
            execute_fn(draw_fullscreen)
        })
        .unwrap();
    ctx.graph.compile().unwrap();
    ctx.frame().unwrap();

    let Some(RecordedCommand::BeginRenderPass(pass)) = ctx.commands.commands().get(1) else {
        panic!("expected a render pass after the debug marker");
    };
    assert_eq!((pass.width, pass.height), (640, 480));
    assert_eq!(pass.clear_color, [0.1, 0.2, 0.3, 1.0]);
    assert_eq!(pass.attachments.len(), 2);
    assert_eq!(pass.attachments[0].image, color);
    assert!(!pass.attachments[0].is_depth);
    assert_eq!(pass.attachments[1].image, depth);
    assert!(pass.attachments[1].is_depth);
    assert_eq!(pass.attachments[1].load_op, LoadOp::Load);
}

// ============================================================================
// Culling Tests
// ============================================================================

/// Skybox reads an HDR environment that is loaded asynchronously. Until it
/// arrives the skybox and everything downstream of it is culled.
#[test]
fn test_skybox_waits_for_hdr_environment() {
    let mut ctx = TestContext::new();
    ctx.graph
        .import_external_resource("HdrEnvironment", ImageHandle::INVALID);
    ctx.graph
        .add_pass(QueueFamily::Graphics, "Skybox", |builder| {
            builder.read_image("HdrEnvironment");
            builder.bind_render_target("Sky");
            execute_fn(draw_fullscreen)
        })
        .unwrap();
    ctx.graph
        .add_pass(QueueFamily::Graphics, "Composite", |builder| {
            builder.read_image("Sky");
            builder.bind_render_target("Swapchain");
            execute_fn(draw_fullscreen)
        })
        .unwrap();
    ctx.graph
        .add_pass(QueueFamily::Graphics, "Ui", |builder| {
            builder.bind_render_target("UiLayer");
            execute_fn(draw_fullscreen)
        })
        .unwrap();
    ctx.graph.compile().unwrap();

    assert_eq!(state(&ctx, "Skybox"), RenderGraphPassState::Waiting);
    assert_eq!(state(&ctx, "Composite"), RenderGraphPassState::Waiting);
    assert_eq!(ctx.frame(), Ok(1));
    assert_eq!(ctx.markers(), vec!["Ui"]);

    // The loader hands the environment over between frames.
    let hdr = ctx.create_image(2048, 1024);
    let external = ctx.graph.external_resources();
    assert!(external.replace(&"HdrEnvironment".into(), hdr));
    ctx.graph.update().unwrap();

    assert_eq!(state(&ctx, "Skybox"), RenderGraphPassState::Runnable);
    assert_eq!(state(&ctx, "Composite"), RenderGraphPassState::Runnable);
    assert_eq!(ctx.frame(), Ok(3));
    let markers = ctx.markers();
    let position = |name: &str| markers.iter().position(|marker| *marker == name);
    assert!(position("Skybox") < position("Composite"));
    assert!(position("Ui").is_some());

    // And takes it back again.
    external.invalidate(&"HdrEnvironment".into());
    ctx.graph.update().unwrap();
    assert_eq!(ctx.frame(), Ok(1));
}

#[rstest]
#[case::first("A", &["A", "B", "C"])]
#[case::middle("B", &["B", "C"])]
#[case::last("C", &["C"])]
fn test_cull_propagates_downstream(#[case] gated: &str, #[case] culled: &[&str]) {
    let mut ctx = TestContext::new();
    ctx.graph.import_external_resource("Gate", ImageHandle::INVALID);

    let chain = [("A", None, "a"), ("B", Some("a"), "b"), ("C", Some("b"), "c")];
    for (name, input, output) in chain {
        let gate = name == gated;
        ctx.graph
            .add_pass(QueueFamily::Graphics, name, move |builder| {
                if let Some(input) = input {
                    builder.read_image(input);
                }
                if gate {
                    builder.read_image("Gate");
                }
                builder.write_image(output);
                execute_fn(|_| {})
            })
            .unwrap();
    }
    ctx.graph.compile().unwrap();

    for (name, _, _) in chain {
        let expected = if culled.contains(&name) {
            RenderGraphPassState::Waiting
        } else {
            RenderGraphPassState::Runnable
        };
        assert_eq!(state(&ctx, name), expected, "pass {name}");
    }
    assert_eq!(ctx.frame(), Ok(3 - culled.len()));
}

// ============================================================================
// Transient Tests
// ============================================================================

/// An equirectangular image is uploaded once, converted to a cube map and
/// then released at the end of the frame.
#[test]
fn test_transient_released_after_one_frame() {
    let mut ctx = TestContext::new();
    let equirect = ctx.create_image(4096, 2048);
    let live_before = ctx.backend.live_count();

    let conversions = Rc::new(Cell::new(0));
    let counter = conversions.clone();
    ctx.graph
        .import_external_transient_resource("Equirect", equirect);
    ctx.graph
        .add_pass(QueueFamily::Compute, "EquirectToCube", move |builder| {
            builder.read_image("Equirect");
            builder.write_image("EnvironmentCube");
            execute_fn(move |_| counter.set(counter.get() + 1))
        })
        .unwrap();
    ctx.graph.compile().unwrap();

    assert_eq!(ctx.frame(), Ok(1));
    assert_eq!(
        ctx.backend.destroy_queue(),
        &[RenderResourceHandle::Image(equirect)]
    );
    assert_eq!(ctx.backend.live_count(), live_before - 1);
    assert_eq!(
        ctx.graph.external_transient_resources().is_valid(&"Equirect".into()),
        Some(false)
    );

    // Nothing left to convert or to release.
    assert_eq!(ctx.frame(), Ok(0));
    assert_eq!(ctx.frame(), Ok(0));
    assert_eq!(conversions.get(), 1);
    assert_eq!(ctx.backend.destroy_queue().len(), 1);
    assert_eq!(state(&ctx, "EquirectToCube"), RenderGraphPassState::Waiting);
}

#[test]
fn test_flush_leaves_external_resources_alone() {
    let mut ctx = TestContext::new();
    let swapchain = ctx.create_image(1280, 720);
    ctx.graph.import_external_resource("Swapchain", swapchain);
    add_frame_pass(&mut ctx, "Shadow");
    add_frame_pass(&mut ctx, "Geometry");
    add_frame_pass(&mut ctx, "Post");
    ctx.graph.compile().unwrap();

    for _ in 0..3 {
        assert_eq!(ctx.frame(), Ok(3));
    }
    assert!(ctx.backend.destroy_queue().is_empty());
    assert!(ctx.backend.is_valid_render_resource(swapchain.into()));
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn test_graph_changes_require_compile() {
    let mut ctx = TestContext::new();
    add_frame_pass(&mut ctx, "Shadow");
    assert_eq!(ctx.frame(), Err(RenderGraphError::NotCompiled));

    ctx.graph.compile().unwrap();
    assert_eq!(ctx.frame(), Ok(1));

    add_frame_pass(&mut ctx, "Geometry");
    assert_eq!(ctx.frame(), Err(RenderGraphError::NotCompiled));
    ctx.graph.compile().unwrap();
    assert_eq!(ctx.frame(), Ok(2));

    ctx.graph.remove_pass("Geometry").unwrap();
    assert_eq!(ctx.frame(), Err(RenderGraphError::NotCompiled));
    ctx.graph.compile().unwrap();
    assert_eq!(ctx.frame(), Ok(1));
    assert_eq!(ctx.graph.execution_order(), vec!["Shadow"]);
}

#[test]
fn test_removing_producer_leaves_external_read() {
    let mut ctx = TestContext::new();
    add_frame_pass(&mut ctx, "Shadow");
    add_frame_pass(&mut ctx, "Geometry");
    ctx.graph.compile().unwrap();

    // Nothing writes the shadow map any more, so Geometry reads it as an
    // external resource and stays runnable.
    ctx.graph.remove_pass("Shadow").unwrap();
    ctx.graph.compile().unwrap();
    assert_eq!(state(&ctx, "Geometry"), RenderGraphPassState::Runnable);
    assert_eq!(ctx.graph.dag().find_output_pass(&"ShadowMap".into()), None);
}

#[test]
fn test_cycle_is_rejected() {
    let mut ctx = TestContext::new();
    for (name, read, write) in [("Blur", "Bloom", "Scratch"), ("Combine", "Scratch", "Bloom")] {
        ctx.graph
            .add_pass(QueueFamily::Graphics, name, |builder| {
                builder.read_image(read);
                builder.write_image(write);
                execute_fn(|_| {})
            })
            .unwrap();
    }

    let Err(RenderGraphError::Graph(GraphError::CyclicDependency(passes))) = ctx.graph.compile()
    else {
        panic!("expected a cycle");
    };
    assert_eq!(passes, vec!["Blur".to_string(), "Combine".to_string()]);
    assert!(!ctx.graph.is_compiled());
    assert_eq!(ctx.frame(), Err(RenderGraphError::NotCompiled));
}

#[test]
fn test_duplicate_pass_keeps_first() {
    let mut ctx = TestContext::new();
    add_frame_pass(&mut ctx, "Shadow");
    let result = ctx.graph.add_pass(QueueFamily::Compute, "Shadow", |builder| {
        builder.write_image("Other");
        execute_fn(|_| {})
    });

    assert_eq!(result, Err(RenderGraphError::DuplicatePass("Shadow".into())));
    assert_eq!(
        ctx.graph.pass("Shadow").unwrap().queue_family(),
        QueueFamily::Graphics
    );
    assert!(!ctx.graph.dag().contains_resource(&"Other".into()));
}

#[test]
fn test_one_shot_pass_reruns_on_resize() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    let info = RenderGraphPassCreateInfo::new("BrdfLut", QueueFamily::Compute).with_in_flight(false);
    ctx.graph
        .add_pass_with(info, move |builder| {
            builder.write_image("BrdfLut");
            execute_fn(move |ctx| sink.borrow_mut().push(ctx.viewport().width))
        })
        .unwrap();
    add_frame_pass(&mut ctx, "Shadow");
    ctx.graph.compile().unwrap();

    assert_eq!(ctx.frame(), Ok(2));
    assert_eq!(ctx.frame(), Ok(1));

    ctx.graph.resize(1920, 1080);
    assert_eq!(ctx.frame(), Ok(2));
    assert_eq!(ctx.frame(), Ok(1));

    ctx.graph.pass_mut("BrdfLut").unwrap().request_rerun();
    assert_eq!(ctx.frame(), Ok(2));
    assert_eq!(*log.borrow(), vec![1280, 1920, 1920]);
}

#[test]
fn test_pass_without_declarations_never_runs() {
    let mut ctx = TestContext::new();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    ctx.graph
        .add_pass(QueueFamily::Graphics, "Empty", move |_| {
            execute_fn(move |_| flag.set(true))
        })
        .unwrap();
    add_frame_pass(&mut ctx, "Shadow");
    ctx.graph.compile().unwrap();

    assert_eq!(ctx.frame(), Ok(1));
    assert!(!ran.get());
    assert_eq!(state(&ctx, "Empty"), RenderGraphPassState::New);
}
