//! Fitness-history chart layout.
//!
//! [`layout`] turns a history into a [`ChartScene`]: pixel-space grid lines,
//! axis ticks, the two polylines and the legend. Painting is left to a backend
//! (`svg` here, a canvas painter in `verso_web`), so every backend draws the
//! same picture and the geometry can be tested without a browser.

use std::borrow::Cow;

use crate::types::HistoryEntry;

pub const BACKGROUND: &str = "#0a0f1a";
pub const GRID_COLOR: &str = "rgba(122, 162, 255, 0.15)";
pub const AXIS_COLOR: &str = "rgba(122, 162, 255, 0.45)";
pub const TEXT_COLOR: &str = "rgba(232, 236, 255, 0.9)";
pub const MUTED_TEXT_COLOR: &str = "rgba(170, 180, 230, 0.8)";

pub const BEST_LABEL: &str = "Best Fitness";
pub const BEST_COLOR: &str = "#4ade80"; // green
pub const AVG_LABEL: &str = "Average Fitness";
pub const AVG_COLOR: &str = "#7aa2ff"; // blue

pub const PLACEHOLDER: &str = "No generations yet";

/// Horizontal bands between the 0% and 100% lines.
pub const GRID_BANDS: u32 = 10;
/// Labelled positions along the generation axis, both ends included.
pub const X_TICKS: u32 = 6;

pub const SWATCH_SIZE: f64 = 12.0;
const LEGEND_SPACING: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    /// Margin on every side; the plot area is the rectangle inside it.
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            padding: 50.0,
        }
    }
}

impl ChartLayout {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    pub fn plot_width(&self) -> f64 {
        (self.width - 2.0 * self.padding).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.height - 2.0 * self.padding).max(0.0)
    }

    pub fn left(&self) -> f64 {
        self.padding
    }

    pub fn right(&self) -> f64 {
        self.padding + self.plot_width()
    }

    pub fn top(&self) -> f64 {
        self.padding
    }

    pub fn bottom(&self) -> f64 {
        self.padding + self.plot_height()
    }

    /// Fitness 1.0 sits on the top margin, 0.0 on the bottom one.
    pub fn y_for(&self, fitness: f64) -> f64 {
        let f = if fitness.is_finite() {
            fitness.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.bottom() - f * self.plot_height()
    }

    /// `max_generation` is already clamped to at least 1.
    pub fn x_for(&self, generation: u64, max_generation: u64) -> f64 {
        self.left() + (generation as f64 / max_generation as f64) * self.plot_width()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTick {
    pub x: f64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: &'static str,
    pub color: &'static str,
    pub points: Vec<Point>,
}

/// Swatch square at (`x`, `y`) top-left, label to its right.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartScene {
    pub layout: ChartLayout,
    pub caption: String,
    pub grid: Vec<GridLine>,
    pub x_ticks: Vec<AxisTick>,
    pub series: Vec<Series>,
    pub legend: Vec<LegendEntry>,
    /// Set instead of everything else when there is nothing to plot.
    pub placeholder: Option<&'static str>,
}

impl ChartScene {
    pub fn is_empty(&self) -> bool {
        self.placeholder.is_some()
    }
}

/// Lay out `history` (best and average fitness per generation).
pub fn layout(history: &[HistoryEntry], generation: u64, layout: ChartLayout) -> ChartScene {
    if history.is_empty() {
        return ChartScene {
            layout,
            caption: String::new(),
            grid: Vec::new(),
            x_ticks: Vec::new(),
            series: Vec::new(),
            legend: Vec::new(),
            placeholder: Some(PLACEHOLDER),
        };
    }

    let history: Cow<'_, [HistoryEntry]> =
        if history.windows(2).all(|w| w[0].generation <= w[1].generation) {
            Cow::Borrowed(history)
        } else {
            let mut sorted = history.to_vec();
            sorted.sort_by_key(|e| e.generation);
            Cow::Owned(sorted)
        };

    let max_generation = history
        .iter()
        .map(|e| e.generation)
        .max()
        .unwrap_or(0)
        .max(1);

    let grid = (0..=GRID_BANDS)
        .map(|i| GridLine {
            y: layout.top() + (i as f64 / GRID_BANDS as f64) * layout.plot_height(),
            label: format!("{}%", 100 - i * (100 / GRID_BANDS)),
        })
        .collect();

    let last = (X_TICKS - 1) as u64;
    let x_ticks = (0..X_TICKS as u64)
        .map(|i| AxisTick {
            x: layout.left() + (i as f64 / last as f64) * layout.plot_width(),
            generation: ((i * max_generation) as f64 / last as f64) as u64,
        })
        .collect();

    let points = |fitness: fn(&HistoryEntry) -> f64| -> Vec<Point> {
        history
            .iter()
            .map(|e| Point {
                x: layout.x_for(e.generation, max_generation),
                y: layout.y_for(fitness(e)),
            })
            .collect()
    };
    let series = vec![
        Series {
            label: BEST_LABEL,
            color: BEST_COLOR,
            points: points(|e| e.best_fitness),
        },
        Series {
            label: AVG_LABEL,
            color: AVG_COLOR,
            points: points(|e| e.avg_fitness),
        },
    ];

    let legend_y = (layout.padding - SWATCH_SIZE) / 2.0;
    let legend_x = layout.right() - 2.0 * LEGEND_SPACING;
    let legend = series
        .iter()
        .enumerate()
        .map(|(i, s)| LegendEntry {
            label: s.label,
            color: s.color,
            x: legend_x + i as f64 * LEGEND_SPACING,
            y: legend_y,
        })
        .collect();

    ChartScene {
        layout,
        caption: format!("Generation {generation}"),
        grid,
        x_ticks,
        series,
        legend,
        placeholder: None,
    }
}
