//! Plotly-shaped scatter geometry for the 3D embedding view.
//!
//! The client hands `plot_data` straight to `Plotly.newPlot`, so the
//! structs here serialize to exactly the keys Plotly expects. Everything
//! is built fresh per request from the normalized coordinates.

use projection::{axis_ranges, Point3};
use serde::{Deserialize, Serialize};

const MARKER_SIZE: u32 = 8;
const MARKER_OPACITY: f64 = 0.8;
const DEFAULT_COLORSCALE: &str = "Viridis";
const FIGURE_WIDTH: u32 = 1000;
const FIGURE_HEIGHT: u32 = 800;
const CAMERA_EYE: f64 = 1.5;

/// Colorscale names the client may swap in without a new request.
/// The default comes first.
pub const AVAILABLE_COLORSCALES: [&str; 10] = [
    "Viridis", "Plasma", "Inferno", "Magma", "Cividis", "Blues", "Greens", "Reds", "YlOrRd",
    "Rainbow",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotData {
    pub data: Vec<ScatterTrace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterTrace {
    #[serde(rename = "type")]
    pub trace_type: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub mode: String,
    pub text: Vec<String>,
    pub textposition: String,
    pub hoverinfo: String,
    pub hovertemplate: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub size: u32,
    /// Positional color index per point, mapped through the colorscale.
    pub color: Vec<usize>,
    pub colorscale: String,
    pub opacity: f64,
    pub line: MarkerLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerLine {
    pub color: String,
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub scene: Scene,
    pub margin: Margin,
    pub showlegend: bool,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub zaxis: Axis,
    pub camera: Camera,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub title: String,
    pub range: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub up: CameraVector,
    pub center: CameraVector,
    pub eye: CameraVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
}

/// Build the scatter trace and layout for one request. `labels` is the
/// full token sequence (boundary markers included) so hover works on
/// every point; axis ranges come from the already-normalized coordinates.
pub fn build_plot(coords: &[Point3], labels: &[String]) -> PlotData {
    let ranges = axis_ranges(coords);

    let trace = ScatterTrace {
        trace_type: "scatter3d".to_string(),
        x: coords.iter().map(|p| p[0]).collect(),
        y: coords.iter().map(|p| p[1]).collect(),
        z: coords.iter().map(|p| p[2]).collect(),
        mode: "markers+text".to_string(),
        text: labels.to_vec(),
        textposition: "top center".to_string(),
        hoverinfo: "text".to_string(),
        hovertemplate: "<b>Token:</b> %{text}<br>\
                        <b>Position:</b> %{marker.color}<br>\
                        <b>X:</b> %{x:.3f}<br>\
                        <b>Y:</b> %{y:.3f}<br>\
                        <b>Z:</b> %{z:.3f}<br>\
                        <extra></extra>"
            .to_string(),
        marker: Marker {
            size: MARKER_SIZE,
            color: (0..coords.len()).collect(),
            colorscale: DEFAULT_COLORSCALE.to_string(),
            opacity: MARKER_OPACITY,
            line: MarkerLine {
                color: "black".to_string(),
                width: 1,
            },
        },
    };

    let layout = Layout {
        scene: Scene {
            xaxis: Axis {
                title: "X".to_string(),
                range: ranges[0],
            },
            yaxis: Axis {
                title: "Y".to_string(),
                range: ranges[1],
            },
            zaxis: Axis {
                title: "Z".to_string(),
                range: ranges[2],
            },
            camera: Camera {
                up: CameraVector {
                    x: 0.0,
                    y: 0.0,
                    z: 1.0,
                },
                center: CameraVector {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                eye: CameraVector {
                    x: CAMERA_EYE,
                    y: CAMERA_EYE,
                    z: CAMERA_EYE,
                },
            },
        },
        margin: Margin {
            l: 0,
            r: 0,
            b: 0,
            t: 0,
        },
        showlegend: false,
        title: format!("Token Embeddings ({} tokens)", coords.len()),
        width: FIGURE_WIDTH,
        height: FIGURE_HEIGHT,
    };

    PlotData {
        data: vec![trace],
        layout,
    }
}
