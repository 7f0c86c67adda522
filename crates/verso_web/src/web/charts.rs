//! Canvas painter for the fitness-history chart.

use verso::chart::{self, ChartLayout, ChartScene, SWATCH_SIZE};
use verso::types::HistoryEntry;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

const FONT: &str = "system-ui, -apple-system, Segoe UI, Roboto, sans-serif";

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, String> {
    canvas
        .get_context("2d")
        .map_err(|_| "canvas: get_context threw".to_string())?
        .ok_or("canvas: missing 2d context".to_string())?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| "canvas: context is not 2d".to_string())
}

/// Redraw the whole chart for `history` into `canvas`, sized to the element.
pub(super) fn draw_fitness_history(
    canvas: &HtmlCanvasElement,
    history: &[HistoryEntry],
    generation: u64,
) -> Result<(), String> {
    let layout = ChartLayout {
        width: canvas.width() as f64,
        height: canvas.height() as f64,
        ..ChartLayout::default()
    };
    let scene = chart::layout(history, generation, layout);
    paint(&context_2d(canvas)?, &scene)
}

fn paint(ctx: &CanvasRenderingContext2d, scene: &ChartScene) -> Result<(), String> {
    let l = scene.layout;

    ctx.set_fill_style_str(chart::BACKGROUND);
    ctx.fill_rect(0.0, 0.0, l.width, l.height);

    if let Some(text) = scene.placeholder {
        ctx.set_fill_style_str(chart::MUTED_TEXT_COLOR);
        ctx.set_font(&format!("14px {FONT}"));
        ctx.set_text_align("center");
        ctx.fill_text(text, l.width / 2.0, l.height / 2.0)
            .map_err(|_| "canvas: fill_text failed")?;
        return Ok(());
    }

    // Grid and percent labels
    ctx.set_line_width(1.0);
    ctx.set_font(&format!("11px {FONT}"));
    for line in &scene.grid {
        ctx.set_stroke_style_str(chart::GRID_COLOR);
        ctx.begin_path();
        ctx.move_to(l.left(), line.y);
        ctx.line_to(l.right(), line.y);
        ctx.stroke();

        ctx.set_fill_style_str(chart::MUTED_TEXT_COLOR);
        ctx.set_text_align("right");
        ctx.fill_text(&line.label, l.left() - 8.0, line.y + 4.0).ok();
    }

    ctx.set_stroke_style_str(chart::AXIS_COLOR);
    ctx.begin_path();
    ctx.move_to(l.left(), l.bottom());
    ctx.line_to(l.right(), l.bottom());
    ctx.stroke();

    ctx.set_text_align("center");
    for tick in &scene.x_ticks {
        ctx.fill_text(&tick.generation.to_string(), tick.x, l.bottom() + 18.0)
            .ok();
    }

    ctx.set_line_width(2.0);
    for series in &scene.series {
        ctx.set_stroke_style_str(series.color);
        ctx.begin_path();
        for (i, p) in series.points.iter().enumerate() {
            if i == 0 {
                ctx.move_to(p.x, p.y);
            } else {
                ctx.line_to(p.x, p.y);
            }
        }
        ctx.stroke();

        if let [p] = series.points.as_slice() {
            ctx.set_fill_style_str(series.color);
            ctx.begin_path();
            ctx.arc(p.x, p.y, 3.0, 0.0, std::f64::consts::PI * 2.0).ok();
            ctx.fill();
        }
    }

    // Legend
    ctx.set_font(&format!("12px {FONT}"));
    ctx.set_text_align("left");
    for entry in &scene.legend {
        ctx.set_fill_style_str(entry.color);
        ctx.fill_rect(entry.x, entry.y, SWATCH_SIZE, SWATCH_SIZE);
        ctx.set_fill_style_str(chart::TEXT_COLOR);
        ctx.fill_text(entry.label, entry.x + SWATCH_SIZE + 6.0, entry.y + SWATCH_SIZE - 2.0)
            .ok();
    }

    ctx.set_font(&format!("13px {FONT}"));
    ctx.fill_text(
        &scene.caption,
        l.left(),
        (l.padding + SWATCH_SIZE) / 2.0 - 2.0,
    )
    .ok();

    Ok(())
}
