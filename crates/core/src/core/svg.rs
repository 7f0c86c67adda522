//! SVG painter for [`ChartScene`], used for chart export from the CLI.

use std::fmt::Write as _;

use crate::chart::{self, ChartScene, SWATCH_SIZE};

const FONT: &str = "system-ui, -apple-system, Segoe UI, Roboto, sans-serif";

pub fn render(scene: &ChartScene) -> String {
    let l = scene.layout;
    let mut out = String::with_capacity(4096);

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{FONT}">"#,
        w = l.width,
        h = l.height,
    );
    let _ = writeln!(
        out,
        r#"  <rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
        l.width,
        l.height,
        chart::BACKGROUND
    );

    if let Some(text) = scene.placeholder {
        let _ = writeln!(
            out,
            r#"  <text x="{}" y="{}" fill="{}" font-size="14" text-anchor="middle">{}</text>"#,
            l.width / 2.0,
            l.height / 2.0,
            chart::MUTED_TEXT_COLOR,
            escape(text)
        );
        out.push_str("</svg>\n");
        return out;
    }

    for line in &scene.grid {
        let _ = writeln!(
            out,
            r#"  <line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{}" stroke-width="1"/>"#,
            l.left(),
            l.right(),
            chart::GRID_COLOR,
            y = line.y,
        );
        let _ = writeln!(
            out,
            r#"  <text x="{:.2}" y="{:.2}" fill="{}" font-size="11" text-anchor="end">{}</text>"#,
            l.left() - 8.0,
            line.y + 4.0,
            chart::MUTED_TEXT_COLOR,
            escape(&line.label)
        );
    }

    let _ = writeln!(
        out,
        r#"  <line x1="{:.2}" y1="{b:.2}" x2="{:.2}" y2="{b:.2}" stroke="{}" stroke-width="1"/>"#,
        l.left(),
        l.right(),
        chart::AXIS_COLOR,
        b = l.bottom(),
    );
    for tick in &scene.x_ticks {
        let _ = writeln!(
            out,
            r#"  <text x="{:.2}" y="{:.2}" fill="{}" font-size="11" text-anchor="middle">{}</text>"#,
            tick.x,
            l.bottom() + 18.0,
            chart::MUTED_TEXT_COLOR,
            tick.generation
        );
    }

    for series in &scene.series {
        let points = series
            .points
            .iter()
            .map(|p| format!("{:.2},{:.2}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            r#"  <polyline points="{points}" fill="none" stroke="{}" stroke-width="2"/>"#,
            series.color
        );
        // A lone point has no segment to stroke.
        if let [p] = series.points.as_slice() {
            let _ = writeln!(
                out,
                r#"  <circle cx="{:.2}" cy="{:.2}" r="3" fill="{}"/>"#,
                p.x, p.y, series.color
            );
        }
    }

    for entry in &scene.legend {
        let _ = writeln!(
            out,
            r#"  <rect x="{:.2}" y="{:.2}" width="{SWATCH_SIZE}" height="{SWATCH_SIZE}" fill="{}"/>"#,
            entry.x, entry.y, entry.color
        );
        let _ = writeln!(
            out,
            r#"  <text x="{:.2}" y="{:.2}" fill="{}" font-size="12">{}</text>"#,
            entry.x + SWATCH_SIZE + 6.0,
            entry.y + SWATCH_SIZE - 2.0,
            chart::TEXT_COLOR,
            escape(entry.label)
        );
    }

    let _ = writeln!(
        out,
        r#"  <text x="{:.2}" y="{:.2}" fill="{}" font-size="13">{}</text>"#,
        l.left(),
        (l.padding + SWATCH_SIZE) / 2.0 - 2.0,
        chart::TEXT_COLOR,
        escape(&scene.caption)
    );

    out.push_str("</svg>\n");
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{layout, ChartLayout};
    use crate::types::HistoryEntry;

    #[test]
    fn empty_scene_renders_placeholder() {
        let svg = render(&layout(&[], 0, ChartLayout::default()));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(chart::PLACEHOLDER));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn renders_both_series_and_legend() {
        let history: Vec<HistoryEntry> = (0..5)
            .map(|g| HistoryEntry {
                generation: g,
                best_fitness: 0.2 * g as f64,
                avg_fitness: 0.1 * g as f64,
            })
            .collect();
        let svg = render(&layout(&history, 4, ChartLayout::default()));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains(chart::BEST_LABEL));
        assert!(svg.contains(chart::AVG_LABEL));
        assert!(svg.contains("100%"));
        assert!(svg.contains("Generation 4"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn single_point_gets_a_marker() {
        let history = [HistoryEntry {
            generation: 0,
            best_fitness: 0.5,
            avg_fitness: 0.2,
        }];
        let svg = render(&layout(&history, 0, ChartLayout::default()));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains(r#"cx="50.00""#));
    }
}
