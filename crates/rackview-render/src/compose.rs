//! Dashboard composer.
//!
//! Assembles classifier output, cluster metrics, and the rack layout into
//! a `DrawPlan`: one rack column per node group, plus the header, the
//! last-updated stamp, the aggregate stats block, and the health block.
//! The composer only formats values computed upstream; it never
//! classifies nodes or derives metrics itself.

use chrono::{Local, TimeZone};
use tracing::debug;

use rackview_core::{NodeStatus, ReportConfig};
use rackview_layout::{NodeGroup, core_grid};
use rackview_report::{ClassifiedNode, ClassifiedNodes, ClusterMetrics};

use crate::plan::{Color, DrawItem, DrawPlan, HAlign, TextBlock, VAlign};

// Figure-fraction margins of the rack area; the band above RACK_TOP
// belongs to the text panels.
const MARGIN_LEFT: f64 = 0.005;
const MARGIN_RIGHT: f64 = 0.995;
const MARGIN_BOTTOM: f64 = 0.005;
const RACK_TOP: f64 = 0.82;
/// Gap between rack columns, as a fraction of one column's width.
const COLUMN_GAP: f64 = 0.05;
/// Empty rows kept above the tallest column so the frame clears the text.
const HEADROOM_ROWS: f64 = 1.0;

/// Matplotlib-style points to output pixels at 100 dpi.
const PT_TO_PX: f64 = 100.0 / 72.0;

/// Column-local x positions for the per-node decorations.
const DOT_X: f64 = 0.14;
const NAME_X: f64 = 0.02;
const LOAD_TEXT_X: f64 = 0.495;
const OWNER_TEXT_X: f64 = 0.635;

const OWNER_MAX_CHARS: usize = 16;

/// Display color per status. The display precedence (down over allocated
/// over idle over unknown) coincides with the classifier's data
/// precedence, but it is a separate layering choice.
pub fn status_color(status: NodeStatus) -> Color {
    match status {
        NodeStatus::Down => Color::RED,
        NodeStatus::Allocated => Color::GREEN,
        NodeStatus::Idle => Color::ORANGE,
        NodeStatus::Unclassified => Color::GRAY,
    }
}

/// Queue pressure for the health panel: two decimals, or the literal
/// "inf" sentinel when nothing is running.
pub fn format_pressure(pressure: f64) -> String {
    if pressure.is_infinite() {
        "inf".to_string()
    } else {
        format!("{pressure:.2}")
    }
}

/// Wait time for the health panel: whole minutes below one hour, hours to
/// one decimal above, "n/a" when undefined.
pub fn format_wait(p90_secs: Option<u64>) -> String {
    match p90_secs {
        None => "n/a".to_string(),
        Some(secs) if secs < 3_600 => format!("{}m", secs / 60),
        Some(secs) => format!("{:.1}h", secs as f64 / 3_600.0),
    }
}

/// Build the full draw plan for one cycle.
pub fn compose(
    classified: &ClassifiedNodes,
    metrics: &ClusterMetrics,
    groups: &[NodeGroup],
    config: &ReportConfig,
    now: u64,
) -> DrawPlan {
    let mut plan = DrawPlan::new(config.image_width, config.image_height);

    let max_rows = groups.iter().map(|g| g.nodes.len()).max().unwrap_or(0);
    if !groups.is_empty() {
        let span = MARGIN_RIGHT - MARGIN_LEFT;
        let count = groups.len() as f64;
        let col_width = span / (count + (count - 1.0) * COLUMN_GAP);
        let gap = col_width * COLUMN_GAP;

        for (index, group) in groups.iter().enumerate() {
            let column = Column {
                x_offset: MARGIN_LEFT + index as f64 * (col_width + gap),
                width: col_width,
                max_rows,
            };
            compose_rack_column(&mut plan, group, classified, metrics, config, &column);
        }
    }

    compose_panels(&mut plan, metrics, config, now);
    plan
}

/// Figure-space placement of one rack column.
struct Column {
    x_offset: f64,
    width: f64,
    max_rows: usize,
}

impl Column {
    fn x(&self, local_x: f64) -> f64 {
        self.x_offset + local_x * self.width
    }

    /// Rows occupy local y in [-1, max_rows + headroom], mapped onto the
    /// rack band of the figure.
    fn y(&self, local_y: f64) -> f64 {
        let rows_span = self.max_rows as f64 + HEADROOM_ROWS + 1.0;
        MARGIN_BOTTOM + (local_y + 1.0) / rows_span * (RACK_TOP - MARGIN_BOTTOM)
    }
}

fn compose_rack_column(
    plan: &mut DrawPlan,
    group: &NodeGroup,
    classified: &ClassifiedNodes,
    metrics: &ClusterMetrics,
    config: &ReportConfig,
    column: &Column,
) {
    // Rack frame: heavier rails than shelves, top shelf at the column's
    // own node count so short columns close early.
    let bottom = column.y(-1.0);
    let top = column.y(group.nodes.len() as f64);
    let (left, right) = (column.x(0.0), column.x(1.0));
    for (x0, y0, x1, y1, width_pt) in [
        (left, bottom, right, bottom, 1.5),
        (left, top, right, top, 1.5),
        (left, bottom, left, top, 2.0),
        (right, bottom, right, top, 2.5),
    ] {
        plan.items.push(DrawItem::Line {
            x0,
            y0,
            x1,
            y1,
            width_px: width_pt * PT_TO_PX,
            color: Color::BLACK,
        });
    }

    for (row, name) in group.nodes.iter().enumerate() {
        let node = classified.get(name);
        if node.is_none() {
            debug!(node = %name, "drawing placeholder row for unreported node");
        }
        compose_node_row(plan, name, node, metrics, config, column, row as f64);
    }
}

fn compose_node_row(
    plan: &mut DrawPlan,
    name: &str,
    node: Option<&ClassifiedNode>,
    metrics: &ClusterMetrics,
    config: &ReportConfig,
    column: &Column,
    row: f64,
) {
    let status = node.map_or(NodeStatus::Unclassified, |n| n.status);
    let load_pct = node.map_or(0.0, |n| n.load_pct);
    let color = status_color(status);

    plan.items.push(DrawItem::Marker {
        x: column.x(DOT_X),
        y: column.y(row),
        radius_px: 5.0 * PT_TO_PX,
        color,
    });

    // Core cells: filled ones wear the status color, the rest gray, both
    // translucent so the frame shows through.
    for cell in core_grid(metrics.cores_per_node, metrics.sockets_per_node, load_pct) {
        let cell_color = if cell.filled { color } else { Color::GRAY };
        plan.items.push(DrawItem::Rect {
            x0: column.x(cell.x0),
            y0: column.y(row + cell.y0),
            x1: column.x(cell.x1),
            y1: column.y(row + cell.y1),
            color: cell_color.with_alpha(0.3),
        });
    }

    plan.items.push(DrawItem::Text(row_text(
        column.x(LOAD_TEXT_X),
        column.y(row),
        format!("{load_pct:.0}%"),
        Color::INK,
    )));

    plan.items.push(DrawItem::Text(row_text(
        column.x(NAME_X),
        column.y(row),
        display_name(name, config).to_string(),
        Color::INK_DARK,
    )));

    if let Some(current) = node.and_then(|n| n.current_job.as_ref()) {
        plan.items.push(DrawItem::Text(row_text(
            column.x(OWNER_TEXT_X),
            column.y(row),
            truncate(&current.owner, OWNER_MAX_CHARS),
            Color::INK,
        )));
    }
}

fn row_text(x: f64, y: f64, text: String, color: Color) -> TextBlock {
    TextBlock {
        x,
        y,
        text,
        size_pt: 8.0,
        color,
        halign: HAlign::Left,
        valign: VAlign::Center,
        line_spacing: 1.0,
        boxed: false,
    }
}

fn compose_panels(plan: &mut DrawPlan, metrics: &ClusterMetrics, config: &ReportConfig, now: u64) {
    let panel = |x, y, text: String, size_pt, halign, color, line_spacing| {
        DrawItem::Text(TextBlock {
            x,
            y,
            text,
            size_pt,
            color,
            halign,
            valign: VAlign::Top,
            line_spacing,
            boxed: true,
        })
    };

    plan.items.push(panel(
        0.006,
        0.99,
        config.title.clone(),
        34.0,
        HAlign::Left,
        Color::BLACK,
        1.0,
    ));

    let (date_line, time_line) = match Local.timestamp_opt(now as i64, 0).single() {
        Some(stamp) => (
            stamp.format("%a %d %b").to_string(),
            stamp.format("%H:%M").to_string(),
        ),
        None => ("?".to_string(), "?".to_string()),
    };
    plan.items.push(panel(
        0.995,
        0.995,
        format!("Last Updated\n{date_line}\n{time_line}"),
        12.0,
        HAlign::Right,
        Color::GREEN,
        1.0,
    ));

    let stats_text = [
        format!(
            "nodes: {} total, {} idle, {} allocated, {} down",
            metrics.nodes_total, metrics.nodes_idle, metrics.nodes_alloc, metrics.nodes_down
        ),
        format!(
            "cores: {} total, {} allocated, {} idle/unavailable",
            metrics.cores_total, metrics.cores_alloc as i64, metrics.cores_idle as i64
        ),
        format!(
            "load: {:.1}% cluster, {:.1}% mean node CPU",
            metrics.cluster_load_pct, metrics.mean_load_alloc_pct
        ),
        format!(
            "jobs: {} running, {} waiting, {} userheld, {} dependent",
            metrics.jobs_running,
            metrics.pending.priority + metrics.pending.resources,
            metrics.pending.user_held,
            metrics.pending.dependency
        ),
    ]
    .join("\n");
    plan.items.push(panel(
        0.006,
        0.91,
        stats_text,
        16.5,
        HAlign::Left,
        Color::BLACK,
        1.35,
    ));

    let health_text = [
        "Health Panel (quick guide)".to_string(),
        format!(
            "queue pressure (pending/running): {}",
            format_pressure(metrics.queue_pressure)
        ),
        format!(
            "p90 wait (90% start sooner): {}",
            format_wait(metrics.p90_wait_secs)
        ),
        format!(
            "top user by running cores: {} ({})",
            metrics.top_user, metrics.top_user_cores as i64
        ),
    ]
    .join("\n");
    plan.items.push(panel(
        0.8,
        0.88,
        health_text,
        12.0,
        HAlign::Left,
        Color::BLACK,
        1.3,
    ));
}

/// Strip the configured hostname prefix for the in-column node label.
pub fn display_name<'a>(name: &'a str, config: &ReportConfig) -> &'a str {
    if config.strip_prefix.is_empty() {
        name
    } else {
        name.strip_prefix(&config.strip_prefix).unwrap_or(name)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    } else {
        text.to_string()
    }
}
