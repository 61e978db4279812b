use criterion::{black_box, criterion_group, criterion_main, Criterion};

use helm_tui::context::TuiContext;
use helm_tui::gateway::ParamMap;
use helm_tui::layout::{self, LayoutProps, LayoutStrategy, TrackSize};
use helm_tui::terminal::HeadlessBackend;
use helm_tui::types::NodeKind;
use helm_tui::{render, router, tree, widgets};

/// 80x24 surface with a 4x4 grid of labels mounted via the router.
fn dashboard_ctx() -> TuiContext {
    let mut ctx = TuiContext::new(Box::new(HeadlessBackend::new(80, 24)));
    router::add_route(&mut ctx, "/bench", "Bench", false, |ctx, _| {
        let screen = tree::create_node(ctx, NodeKind::Screen)?;
        layout::set_layout(
            ctx,
            screen,
            LayoutStrategy::grid(vec![TrackSize::STAR; 4], vec![TrackSize::STAR; 4]),
        )?;
        for row in 0..4u16 {
            for col in 0..4u16 {
                let cell = widgets::label(ctx, "cell contents")?;
                tree::append_child(ctx, screen, cell)?;
                layout::set_layout_props(
                    ctx,
                    cell,
                    LayoutProps {
                        row,
                        col,
                        ..Default::default()
                    },
                )?;
            }
        }
        Ok(screen)
    })
    .unwrap();
    router::go_to(&mut ctx, "/bench", ParamMap::new()).unwrap();
    ctx
}

fn bench_full_frame(c: &mut Criterion) {
    let mut ctx = dashboard_ctx();
    render::render(&mut ctx).unwrap();
    let screen = ctx.nav.active_screen().unwrap();
    let label = ctx.nodes[&screen].children[0];

    let mut tick = 0u64;
    c.bench_function("full_frame_one_dirty_label", |b| {
        b.iter(|| {
            tick += 1;
            widgets::set_text(&mut ctx, label, &format!("tick {tick}")).unwrap();
            render::render(black_box(&mut ctx)).unwrap();
        })
    });
}

fn bench_present_idle(c: &mut Criterion) {
    let mut ctx = dashboard_ctx();
    render::render(&mut ctx).unwrap();

    c.bench_function("present_idle_diff_scan", |b| {
        b.iter(|| render::present(black_box(&mut ctx)).unwrap())
    });
}

fn bench_track_resolution(c: &mut Criterion) {
    let defs: Vec<TrackSize> = (0..64)
        .map(|i| {
            if i % 3 == 0 {
                TrackSize::Fixed(2)
            } else {
                TrackSize::Star((i % 5) as f32 + 0.5)
            }
        })
        .collect();

    c.bench_function("resolve_tracks_64", |b| {
        b.iter(|| layout::resolve_tracks(black_box(&defs), black_box(500)))
    });
}

criterion_group!(
    benches,
    bench_full_frame,
    bench_present_idle,
    bench_track_resolution
);
criterion_main!(benches);
