//! Plain-text rendering of the viewer state for terminals.

use layers::MapView;

use crate::controller::ViewSnapshot;

pub const TITLE: &str = "GDB Viewer";

/// Renders the three panels: layer selection, map view and layer
/// information. An unresolved error replaces all of them.
pub fn render(snapshot: &ViewSnapshot, view: &MapView) -> String {
    if let Some(error) = &snapshot.error {
        return format!("{error}\n");
    }

    let mut out = String::new();
    out.push_str(&format!("{TITLE}\n\n"));

    out.push_str("Layer Selection\n");
    if snapshot.layers.is_empty() {
        out.push_str("  (no layers)\n");
    }
    for name in &snapshot.layers {
        let mark = if snapshot.selected.as_deref() == Some(name.as_str()) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(" {mark} {name}\n"));
    }

    out.push_str("\nMap View\n");
    out.push_str(&format!(
        "  center {:.4}, {:.4} zoom {}\n",
        view.center.lat_deg, view.center.lon_deg, view.zoom
    ));
    if snapshot.selected.is_some() {
        out.push_str(&format!("  {} features drawn", snapshot.rendered_features));
        if snapshot.undrawn_features > 0 {
            out.push_str(&format!(", {} skipped", snapshot.undrawn_features));
        }
        out.push('\n');
    }
    if let Some(summary) = &snapshot.summary {
        for (kind, count) in &summary.kinds {
            out.push_str(&format!("  {kind}: {count}\n"));
        }
    }

    out.push_str("\nLayer Information\n");
    match &snapshot.schema {
        Some(schema) => {
            out.push_str(&format!("  {}\n  Properties: {}\n", schema.name, schema.properties.join(", ")));
        }
        None if snapshot.busy => out.push_str("  loading\n"),
        None => out.push_str("  (none)\n"),
    }
    out
}
